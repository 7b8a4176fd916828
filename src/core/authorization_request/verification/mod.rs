use anyhow::{bail, Context, Result};
use base64::prelude::*;
use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::{
    core::{metadata::WalletMetadata, object::UntypedObject},
    holder::trust::TrustEvaluator,
};

use super::{parameters::ClientIdScheme, AuthorizationRequestObject};

pub mod x509_san_dns;

/// A request object after its signature (if any) has been looked at.
#[derive(Debug, Clone)]
pub enum VerifiedRequest {
    /// The request object was unsigned (`alg: none`) or passed as plain parameters.
    Unsecured(AuthorizationRequestObject),
    /// The request object signature and client identifier were verified.
    Secured(AuthorizationRequestObject),
}

/// The three segments of a compact JWS, with the header and claims decoded.
pub(crate) struct DecodedJws<'a> {
    pub header_b64: &'a str,
    pub payload_b64: &'a str,
    pub signature_b64: &'a str,
    pub header: Map<String, Json>,
    pub claims: UntypedObject,
}

pub(crate) fn decode_jws(jwt: &str) -> Result<DecodedJws<'_>> {
    let mut segments = jwt.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        bail!("request object is not a compact JWS")
    };

    let header = BASE64_URL_SAFE_NO_PAD
        .decode(header_b64)
        .context("jwt headers were not valid base64url")?;
    let header = serde_json::from_slice::<Map<String, Json>>(&header)
        .context("jwt headers were not valid json")?;

    let claims = BASE64_URL_SAFE_NO_PAD
        .decode(payload_b64)
        .context("jwt payload was not valid base64url")?;
    let claims = serde_json::from_slice::<Json>(&claims)
        .context("jwt payload was not valid json")?
        .try_into()
        .context("jwt payload was not a JSON object")?;

    Ok(DecodedJws {
        header_b64,
        payload_b64,
        signature_b64,
        header,
        claims,
    })
}

/// Decode and verify an Authorization Request Object JWT.
///
/// Unsigned request objects are not an error at this layer, they are reported as
/// [VerifiedRequest::Unsecured] so the caller can decide how to treat them.
pub(crate) fn verify_request(
    wallet_metadata: &WalletMetadata,
    jwt: &str,
    trust: &TrustEvaluator,
) -> Result<VerifiedRequest> {
    let jws = decode_jws(jwt).context("unable to decode Authorization Request Object JWT")?;

    let request: AuthorizationRequestObject = jws
        .claims
        .clone()
        .try_into()
        .context("unable to parse Authorization Request Object")?;

    let alg = jws.header.get("alg").and_then(Json::as_str);
    if alg.is_none() || alg == Some("none") || jws.signature_b64.is_empty() {
        debug!(client_id = %request.client_id().0, "request object is not signed");
        return Ok(VerifiedRequest::Unsecured(request));
    }

    validate_request_against_metadata(wallet_metadata, &request)?;

    match request.client_id_scheme() {
        ClientIdScheme::X509SanDns => {
            x509_san_dns::validate(wallet_metadata, &request, &jws, trust)?
        }
        scheme => bail!("no verification is available for client_id_scheme '{scheme}'"),
    }

    Ok(VerifiedRequest::Secured(request))
}

pub(crate) fn validate_request_against_metadata(
    wallet_metadata: &WalletMetadata,
    request: &AuthorizationRequestObject,
) -> Result<()> {
    let client_id_scheme = request.client_id_scheme();
    if !wallet_metadata
        .client_id_schemes_supported()
        .contains(client_id_scheme)
    {
        bail!("wallet does not support client_id_scheme '{client_id_scheme}'")
    }
    Ok(())
}
