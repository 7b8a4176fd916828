use tracing::{info, warn};

use crate::core::{
    authorization_request::AuthorizationRequestObject,
    response::{AuthorizationResponse, DispatchOutcome},
};

use super::{engine::AuthorizationEngine, error::PresentmentError};

/// Send `response` through the engine and report how the verifier answered.
///
/// A transport failure is returned as [PresentmentError::Dispatch], it is never turned
/// into a [DispatchOutcome::Rejected].
pub async fn dispatch(
    engine: &dyn AuthorizationEngine,
    request: &AuthorizationRequestObject,
    response: AuthorizationResponse,
) -> Result<DispatchOutcome, PresentmentError> {
    let outcome = engine
        .dispatch(request, response)
        .await
        .map_err(PresentmentError::Dispatch)?;

    let client_id = &request.client_id().0;
    match &outcome {
        DispatchOutcome::Accepted {
            redirect: Some(redirect),
        } => info!(%client_id, %redirect, "response accepted, verifier requested a redirect"),
        DispatchOutcome::Accepted { redirect: None } => {
            info!(%client_id, "response accepted without redirect")
        }
        DispatchOutcome::Rejected { reason } => {
            warn!(%client_id, %reason, "response rejected by verifier")
        }
    }

    Ok(outcome)
}
