use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{bail, Context, Error, Result};
use p256::ecdsa::{signature::Verifier as _, Signature, VerifyingKey};
use tracing::debug;
use x509_cert::{
    der::{oid::ObjectIdentifier, referenced::OwnedToRef, Decode, Encode},
    Certificate,
};

/// ecdsa-with-SHA256
const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");

/// Decides whether a certificate chain (leaf first) leads to one of the trust anchors.
pub trait ChainVerifier: Send + Sync {
    fn verify(&self, chain: &[Certificate], anchors: &[Certificate]) -> Result<()>;
}

/// Evaluates verifier certificate chains against the configured IACA trust anchors.
///
/// Every call re-runs the [ChainVerifier]; nothing is cached between requests.
#[derive(Clone)]
pub struct TrustEvaluator {
    anchors: Vec<Certificate>,
    verifier: Arc<dyn ChainVerifier>,
}

impl std::fmt::Debug for TrustEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustEvaluator")
            .field("anchors", &self.anchors.len())
            .finish_non_exhaustive()
    }
}

impl TrustEvaluator {
    pub fn new(anchors: Vec<Certificate>, verifier: impl ChainVerifier + 'static) -> Self {
        Self {
            anchors,
            verifier: Arc::new(verifier),
        }
    }

    /// Trust anchors are parsed from `pem` and chains are checked with [X509ChainVerifier].
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        Ok(Self::new(load_anchors(pem)?, X509ChainVerifier))
    }

    pub fn anchors(&self) -> &[Certificate] {
        &self.anchors
    }

    /// `true` only if `chain` verifies up to a trust anchor.
    pub fn is_trusted(&self, chain: &[Certificate]) -> bool {
        if chain.is_empty() {
            debug!("empty certificate chain is never trusted");
            return false;
        }
        match self.verifier.verify(chain, &self.anchors) {
            Ok(()) => true,
            Err(e) => {
                debug!("certificate chain is not trusted: {e:#}");
                false
            }
        }
    }
}

/// Load trust anchors from a PEM bundle, or from a single DER certificate.
pub fn load_anchors(bytes: &[u8]) -> Result<Vec<Certificate>> {
    if bytes.starts_with(b"-----BEGIN") {
        let anchors =
            Certificate::load_pem_chain(bytes).context("unable to parse PEM trust anchors")?;
        if anchors.is_empty() {
            bail!("no certificate found in PEM trust anchors")
        }
        return Ok(anchors);
    }
    Certificate::from_der(bytes)
        .map(|anchor| vec![anchor])
        .context("unable to parse DER trust anchor")
}

/// ECDSA P-256 certificate path validation.
///
/// Each certificate must be currently valid and signed by the next one in the chain. The
/// last certificate must either be a trust anchor itself, or be signed by an anchor whose
/// subject matches its issuer.
#[derive(Debug, Clone, Copy, Default)]
pub struct X509ChainVerifier;

impl ChainVerifier for X509ChainVerifier {
    fn verify(&self, chain: &[Certificate], anchors: &[Certificate]) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock is before the unix epoch")?;

        for (position, cert) in chain.iter().enumerate() {
            check_validity(cert, now).with_context(|| format!("certificate {position}"))?;
        }

        for (position, (subject, issuer)) in chain.iter().zip(chain.iter().skip(1)).enumerate() {
            check_issued_by(subject, issuer)
                .with_context(|| format!("certificate {position} is not issued by the next"))?;
        }

        let Some(last) = chain.last() else {
            bail!("empty certificate chain")
        };

        if anchors.contains(last) {
            return Ok(());
        }

        let anchor = anchors
            .iter()
            .find(|anchor| anchor.tbs_certificate.subject == last.tbs_certificate.issuer)
            .with_context(|| {
                format!(
                    "no trust anchor for issuer '{}'",
                    last.tbs_certificate.issuer
                )
            })?;

        check_validity(anchor, now).context("trust anchor")?;
        check_issued_by(last, anchor).context("chain is not issued by the trust anchor")
    }
}

fn check_validity(cert: &Certificate, now: std::time::Duration) -> Result<()> {
    let validity = &cert.tbs_certificate.validity;
    if now < validity.not_before.to_unix_duration() {
        bail!("not yet valid (not before {:?})", validity.not_before)
    }
    if now > validity.not_after.to_unix_duration() {
        bail!("expired (not after {:?})", validity.not_after)
    }
    Ok(())
}

fn check_issued_by(subject: &Certificate, issuer: &Certificate) -> Result<()> {
    if subject.tbs_certificate.issuer != issuer.tbs_certificate.subject {
        bail!(
            "issuer '{}' does not match subject '{}'",
            subject.tbs_certificate.issuer,
            issuer.tbs_certificate.subject
        )
    }

    if subject.signature_algorithm.oid != ECDSA_WITH_SHA256 {
        bail!(
            "unsupported certificate signature algorithm: {}",
            subject.signature_algorithm.oid
        )
    }

    let key: VerifyingKey = issuer
        .tbs_certificate
        .subject_public_key_info
        .owned_to_ref()
        .try_into()
        .map_err(Error::msg)
        .context("issuer key is not a P-256 public key")?;

    let tbs = subject
        .tbs_certificate
        .to_der()
        .context("unable to encode tbsCertificate")?;

    let signature = Signature::from_der(subject.signature.raw_bytes())
        .context("certificate signature is not a DER encoded ECDSA signature")?;

    key.verify(&tbs, &signature)
        .context("certificate signature does not verify")
}
