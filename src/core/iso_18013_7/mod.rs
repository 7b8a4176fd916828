//! ISO/IEC 18013-7 bindings for OpenID4VP.

use anyhow::{Context, Result};
use ciborium::Value as Cbor;
use sha2::{Digest, Sha256};

use super::authorization_request::AuthorizationRequestObject;

/// The fixed identifier string for OpenID4VPHandover (redirect flow).
pub const HANDOVER_TYPE_IDENTIFIER: &str = "OpenID4VPHandover";

/// OpenID4VPHandover, bound into the mdoc SessionTranscript so the device signature
/// covers the verifier's client identifier, nonce and response endpoint.
///
/// See [OID4VP 1.0 §B.2.6.1](https://openid.net/specs/openid-4-verifiable-presentations-1_0.html#appendix-B.2.6)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handover {
    /// SHA-256 hash of CBOR-encoded OpenID4VPHandoverInfo
    handover_info_hash: Vec<u8>,
}

impl Handover {
    /// Creates a new Handover from the authorization request parameters.
    ///
    /// `jwk_thumbprint` is the SHA-256 JWK thumbprint of the verifier's encryption key, or
    /// `None` when the response is not encrypted.
    pub fn new(
        client_id: &str,
        nonce: &str,
        jwk_thumbprint: Option<&[u8]>,
        response_uri: &str,
    ) -> Result<Self> {
        let jwk_thumbprint = match jwk_thumbprint {
            Some(bytes) => Cbor::Bytes(bytes.to_vec()),
            None => Cbor::Null,
        };

        // OpenID4VPHandoverInfo = [clientId, nonce, jwkThumbprint, responseUri]
        let handover_info = Cbor::Array(vec![
            Cbor::Text(client_id.to_string()),
            Cbor::Text(nonce.to_string()),
            jwk_thumbprint,
            Cbor::Text(response_uri.to_string()),
        ]);

        let handover_info_bytes =
            cbor_to_bytes(&handover_info).context("failed to encode OpenID4VPHandoverInfo CBOR")?;

        Ok(Self {
            handover_info_hash: Sha256::digest(&handover_info_bytes).to_vec(),
        })
    }

    /// Handover for an unencrypted (`direct_post`) response to `request`.
    pub fn for_request(request: &AuthorizationRequestObject) -> Result<Self> {
        Self::new(
            &request.client_id().0,
            &request.nonce().0,
            None,
            request.return_uri().as_str(),
        )
    }

    pub fn handover_info_hash(&self) -> &[u8] {
        &self.handover_info_hash
    }

    /// Serializes the Handover to CBOR bytes: `["OpenID4VPHandover", bstr(32)]`.
    pub fn to_cbor_bytes(&self) -> Result<Vec<u8>> {
        let cbor_value = Cbor::Array(vec![
            Cbor::Text(HANDOVER_TYPE_IDENTIFIER.to_string()),
            Cbor::Bytes(self.handover_info_hash.clone()),
        ]);
        cbor_to_bytes(&cbor_value).context("failed to serialize Handover to CBOR")
    }
}

fn cbor_to_bytes(value: &Cbor) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)?;
    Ok(bytes)
}
