use anyhow::Result;
use base64::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::{
    iso_18013_7::Handover,
    presentation_definition::PresentationDefinition,
    presentation_submission::PresentationSubmission,
    response::{parameters::VpToken, Consent},
};

use super::{
    error::PresentmentError,
    items_request::{DocType, Selection},
};

/// Reason sent to the verifier when the holder declines.
pub const REJECTED: &str = "Rejected";

/// How the device proves possession of the credential in the device response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceAuthentication {
    #[default]
    Signature,
    Mac,
}

/// A credential document held by the wallet, in the encoder's own representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialDocument {
    pub doc_type: DocType,
    pub encoded: Vec<u8>,
}

/// Everything needed to produce a device response for the selected data elements.
pub struct EncodingRequest<'a> {
    /// All documents the holder has, not only those selected.
    pub documents: &'a [CredentialDocument],
    pub selection: &'a Selection,
    pub device_authentication: DeviceAuthentication,
    pub signing_key: &'a p256::SecretKey,
    /// Binds the device signature to this verifier and request.
    pub handover: &'a Handover,
}

/// Produces the binary device response for a selection.
pub trait DocumentEncoder: Send + Sync {
    /// `Ok(None)` means the selection could not be satisfied from the documents.
    fn encode(&self, request: EncodingRequest<'_>) -> Result<Option<Vec<u8>>>;
}

/// A holder that did not accept, or accepted without selecting anything, declines.
pub fn is_declined(accepted: bool, selection: &Selection) -> bool {
    !accepted || selection.is_empty()
}

pub fn declined() -> Consent {
    Consent::Negative {
        reason: REJECTED.into(),
    }
}

/// Encode the selected data elements into a positive [Consent].
///
/// The presentation submission names the presentation definition it answers but carries
/// an empty `descriptor_map`.
pub fn encode(
    encoder: &dyn DocumentEncoder,
    definition: &PresentationDefinition,
    request: EncodingRequest<'_>,
) -> Result<Consent, PresentmentError> {
    let device_response = match encoder.encode(request) {
        Ok(Some(device_response)) => device_response,
        Ok(None) => {
            warn!("document encoder produced no device response");
            return Err(PresentmentError::DocumentEncodingError);
        }
        Err(e) => {
            warn!("document encoding failed: {e:#}");
            return Err(PresentmentError::DocumentEncodingError);
        }
    };

    debug!(len = device_response.len(), "device response encoded");

    Ok(Consent::Positive {
        vp_token: VpToken(BASE64_URL_SAFE_NO_PAD.encode(device_response)),
        presentation_submission: PresentationSubmission::new(
            Uuid::new_v4(),
            definition.id().clone(),
            vec![],
        ),
    })
}
