use anyhow::{bail, Context, Error, Result};
use base64::prelude::*;
use p256::ecdsa::{signature::Verifier as _, Signature, VerifyingKey};
use serde_json::Value as Json;
use tracing::debug;
use x509_cert::{
    der::{referenced::OwnedToRef, Decode},
    ext::pkix::{name::GeneralName, SubjectAltName},
    Certificate,
};

use crate::{
    core::{
        authorization_request::AuthorizationRequestObject,
        metadata::WalletMetadata,
    },
    holder::trust::TrustEvaluator,
};

use super::DecodedJws;

/// Request validation for `client_id_scheme` `x509_san_dns`.
///
/// The leaf certificate of the `x5c` header must carry a DNS Subject Alternative Name
/// equal to the client identifier, the whole chain must satisfy the [TrustEvaluator],
/// and the JWS must verify under the leaf certificate's key.
pub(crate) fn validate(
    wallet_metadata: &WalletMetadata,
    request_object: &AuthorizationRequestObject,
    jws: &DecodedJws<'_>,
    trust: &TrustEvaluator,
) -> Result<()> {
    let (_, client_id) = request_object.client_id().split_scheme();

    let Some(Json::String(alg)) = jws.header.get("alg") else {
        bail!("'alg' header was missing or not a string")
    };

    if !wallet_metadata.supports_signing_alg(alg) {
        bail!("request was signed with unsupported algorithm: {alg}")
    }

    let Some(Json::Array(x5chain)) = jws.header.get("x5c") else {
        bail!("'x5c' header was missing or not an array")
    };

    let chain = x5chain
        .iter()
        .map(|entry| {
            let Json::String(b64_x509) = entry else {
                bail!("'x5c' header was not an array of strings");
            };
            let der = BASE64_STANDARD_NO_PAD
                .decode(b64_x509.trim_end_matches('='))
                .context("certificate in 'x5c' was not valid base64")?;
            Certificate::from_der(&der).context("certificate in 'x5c' was not valid DER")
        })
        .collect::<Result<Vec<_>>>()?;

    let leaf_cert = chain.first().context("'x5c' was an empty array")?;

    debug!(subject = %leaf_cert.tbs_certificate.subject, "verifying request object signer");

    if !leaf_cert
        .tbs_certificate
        .filter::<SubjectAltName>()
        .filter_map(|r| match r {
            Ok((_crit, san)) => Some(san.0.into_iter()),
            Err(e) => {
                debug!("unable to parse SubjectAlternativeName from DER: {e}");
                None
            }
        })
        .flatten()
        .filter_map(|gn| match gn {
            GeneralName::DnsName(dns) => Some(dns.to_string()),
            gn => {
                debug!("found non-DNS SAN: {gn:?}");
                None
            }
        })
        .any(|dns| {
            debug!("comparing SAN '{dns}' to client_id '{client_id}'");
            dns == client_id
        })
    {
        bail!("client_id does not match any DNS Subject Alternative Name")
    }

    if !trust.is_trusted(&chain) {
        bail!("verifier certificate chain is not trusted")
    }

    verify_es256(leaf_cert, alg, jws)
}

/// Verify the JWS under the leaf certificate's P-256 key.
///
/// JWS carries ECDSA signatures as fixed-size `r || s`, not DER.
fn verify_es256(leaf_cert: &Certificate, alg: &str, jws: &DecodedJws<'_>) -> Result<()> {
    if alg != "ES256" {
        bail!("requests signed with '{alg}' cannot be verified, only ES256 is implemented")
    }

    let key: VerifyingKey = leaf_cert
        .tbs_certificate
        .subject_public_key_info
        .owned_to_ref()
        .try_into()
        .map_err(Error::msg)
        .context("leaf certificate key is not a P-256 public key")?;

    let payload = [jws.header_b64.as_bytes(), b".", jws.payload_b64.as_bytes()].concat();
    let signature = BASE64_URL_SAFE_NO_PAD
        .decode(jws.signature_b64)
        .context("could not decode base64url encoded jwt signature")?;
    let signature =
        Signature::from_slice(&signature).context("jwt signature is not a P-256 signature")?;

    key.verify(&payload, &signature)
        .context("request signature could not be verified")
}
