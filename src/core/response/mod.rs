use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use self::parameters::{ErrorCode, ErrorDescription, PresentationSubmission, VpToken};

use super::{
    authorization_request::{parameters::ResponseMode, AuthorizationRequestObject},
    object::UntypedObject,
};

pub mod parameters;

/// The holder's disclosure decision, as carried by the protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Consent {
    /// The holder agreed to share the data encoded in `vp_token`.
    Positive {
        vp_token: VpToken,
        presentation_submission: PresentationSubmission,
    },
    /// The holder declined.
    Negative { reason: String },
}

/// An Authorization Response ready to be sent to the verifier.
#[derive(Debug, Clone)]
pub struct AuthorizationResponse {
    return_uri: Url,
    parameters: UntypedObject,
}

impl AuthorizationResponse {
    /// Build the response to `request` expressing `consent`.
    ///
    /// A positive consent yields `vp_token` and `presentation_submission`, a negative one an
    /// `access_denied` error response. `state` is echoed back in both cases.
    pub fn new(request: &AuthorizationRequestObject, consent: Consent) -> Result<Self> {
        match request.response_mode() {
            ResponseMode::DirectPost => {}
            // TODO: encrypt the response (JARM) once verifier encryption keys are resolved from client_metadata.
            mode => bail!("cannot build a response for response_mode '{mode}'"),
        }

        let mut parameters = UntypedObject::default();
        match consent {
            Consent::Positive {
                vp_token,
                presentation_submission,
            } => {
                parameters.insert(vp_token).insert(presentation_submission);
            }
            Consent::Negative { reason } => {
                parameters
                    .insert(ErrorCode(ErrorCode::ACCESS_DENIED.to_string()))
                    .insert(ErrorDescription(reason));
            }
        }

        if let Some(state) = request.state() {
            parameters.insert(state.context("'state' could not be parsed")?);
        }

        Ok(Self {
            return_uri: request.return_uri().clone(),
            parameters,
        })
    }

    /// Where the response is to be posted.
    pub fn return_uri(&self) -> &Url {
        &self.return_uri
    }

    pub fn parameters(&self) -> &UntypedObject {
        &self.parameters
    }

    pub fn into_x_www_form_urlencoded(self) -> Result<String> {
        let pairs = self.parameters.to_form_pairs()?;
        serde_urlencoded::to_string(pairs).context("failed to encode authorization response")
    }
}

/// Body the verifier may return after a successful `direct_post`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRedirection {
    pub redirect_uri: Url,
}

/// How the verifier answered a dispatched response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Accepted { redirect: Option<Url> },
    Rejected { reason: String },
}
