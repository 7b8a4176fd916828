use std::{fmt, sync::Arc};

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::{
    authorization_request::AuthorizationRequestObject, iso_18013_7::Handover,
    presentation_definition::PresentationDefinition, response::DispatchOutcome,
};

use super::{
    consent::{self, CredentialDocument, DeviceAuthentication, DocumentEncoder, EncodingRequest},
    dispatch::dispatch,
    engine::{AuthorizationEngine, RequestKind, ResolvedRequest},
    error::PresentmentError,
    items_request::{ItemsRequested, Selection, ValidItemsRequested},
};

/// The credential material a session presents from.
#[derive(Clone, Default)]
pub struct WalletParameters {
    pub documents: Vec<CredentialDocument>,
    /// The device key, as a P-256 private JWK.
    pub signing_key_jwk: String,
}

impl fmt::Debug for WalletParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletParameters")
            .field("documents", &self.documents.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Waiting for [Session::receive_request].
    Initialized,
    /// The request was verified, waiting for [Session::send_response].
    RequestReceived,
    /// The verifier accepted the response.
    ResponseSent,
    /// A failure occurred, the session must be discarded.
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Initialized => "initialized",
            Status::RequestReceived => "request_received",
            Status::ResponseSent => "response_sent",
            Status::Error => "error",
        }
        .fmt(f)
    }
}

#[derive(Debug)]
struct ReceivedRequest {
    request: AuthorizationRequestObject,
    presentation_definition: PresentationDefinition,
}

#[derive(Debug)]
enum Stage {
    Initialized,
    RequestReceived(Box<ReceivedRequest>),
    ResponseSent,
    Error,
}

/// A one-shot presentment of mdoc data elements to a single verifier.
///
/// ```ignore
/// let mut session = Session::builder()
///     .with_wallet_parameters(parameters)
///     .with_request_payload(link.as_bytes())
///     .with_engine(engine)
///     .with_encoder(encoder)
///     .build()?;
///
/// let requested = session.receive_request().await?;
/// // Ask the holder what to share.
/// let redirect = session.send_response(true, requested.valid_items_requested.into()).await?;
/// ```
pub struct Session {
    stage: Stage,
    link: Url,
    documents: Vec<CredentialDocument>,
    signing_key: p256::SecretKey,
    device_authentication: DeviceAuthentication,
    engine: Arc<dyn AuthorizationEngine>,
    encoder: Arc<dyn DocumentEncoder>,
    redirect: Option<Url>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("stage", &self.stage)
            .field("link", &self.link.as_str())
            .field("documents", &self.documents.len())
            .field("device_authentication", &self.device_authentication)
            .field("redirect", &self.redirect)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn status(&self) -> Status {
        match self.stage {
            Stage::Initialized => Status::Initialized,
            Stage::RequestReceived(_) => Status::RequestReceived,
            Stage::ResponseSent => Status::ResponseSent,
            Stage::Error => Status::Error,
        }
    }

    /// The request link this session answers.
    pub fn link(&self) -> &Url {
        &self.link
    }

    /// The verified request, once received.
    pub fn request(&self) -> Option<&AuthorizationRequestObject> {
        match &self.stage {
            Stage::RequestReceived(received) => Some(&received.request),
            _ => None,
        }
    }

    pub fn presentation_definition(&self) -> Option<&PresentationDefinition> {
        match &self.stage {
            Stage::RequestReceived(received) => Some(&received.presentation_definition),
            _ => None,
        }
    }

    /// Where the verifier asked the holder to be sent after an accepted response.
    ///
    /// Presenting it is up to the caller.
    pub fn redirect(&self) -> Option<&Url> {
        self.redirect.as_ref()
    }

    /// Resolve and verify the request, and report which data elements it asks for.
    ///
    /// Calling this again before [Session::send_response] resolves the request anew and
    /// replaces the one previously received.
    pub async fn receive_request(&mut self) -> Result<ValidItemsRequested, PresentmentError> {
        let status = self.status();
        if !matches!(status, Status::Initialized | Status::RequestReceived) {
            return Err(self.fail(PresentmentError::SessionNotReady(status.to_string())));
        }

        match self.resolve().await {
            Ok((received, valid_items_requested)) => {
                info!(
                    client_id = %received.request.client_id().0,
                    definition = %received.presentation_definition.id(),
                    "authorization request received"
                );
                self.stage = Stage::RequestReceived(Box::new(received));
                Ok(ValidItemsRequested {
                    valid_items_requested,
                })
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Answer the received request with the holder's decision.
    ///
    /// The holder declines when `accepted` is false or `selection` is empty. Returns the
    /// redirect the verifier asked for, if any.
    pub async fn send_response(
        &mut self,
        accepted: bool,
        selection: Selection,
    ) -> Result<Option<Url>, PresentmentError> {
        let status = self.status();
        let Stage::RequestReceived(received) = std::mem::replace(&mut self.stage, Stage::Error)
        else {
            return Err(self.fail(PresentmentError::SessionNotReady(status.to_string())));
        };

        match self.respond(&received, accepted, &selection).await {
            Ok(redirect) => {
                self.stage = Stage::ResponseSent;
                self.redirect.clone_from(&redirect);
                Ok(redirect)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn resolve(&self) -> Result<(ReceivedRequest, ItemsRequested), PresentmentError> {
        let resolved = self
            .engine
            .resolve_request(self.link.clone())
            .await
            .map_err(PresentmentError::RequestResolution)?;

        let (request, presentation_definition) = match resolved {
            ResolvedRequest::Unsecured(request) => {
                warn!(client_id = %request.client_id().0, "refusing unsecured request");
                return Err(PresentmentError::InsecureRequest);
            }
            ResolvedRequest::Secured(RequestKind::Presentation {
                request,
                presentation_definition,
            }) => (request, presentation_definition),
            ResolvedRequest::Secured(RequestKind::Authentication(_)) => {
                return Err(PresentmentError::UnsupportedRequestKind(
                    "authentication".into(),
                ))
            }
            ResolvedRequest::Secured(RequestKind::PresentationAndAuthentication(_)) => {
                return Err(PresentmentError::UnsupportedRequestKind(
                    "presentation with authentication".into(),
                ))
            }
        };

        let items = ItemsRequested::from_presentation_definition(&presentation_definition)
            .ok_or(PresentmentError::InvalidPresentationDefinition)?;

        Ok((
            ReceivedRequest {
                request,
                presentation_definition,
            },
            items,
        ))
    }

    async fn respond(
        &self,
        received: &ReceivedRequest,
        accepted: bool,
        selection: &Selection,
    ) -> Result<Option<Url>, PresentmentError> {
        let consent = if consent::is_declined(accepted, selection) {
            debug!("holder declined");
            consent::declined()
        } else {
            let handover = Handover::for_request(&received.request)
                .map_err(PresentmentError::ResponseConstruction)?;
            consent::encode(
                self.encoder.as_ref(),
                &received.presentation_definition,
                EncodingRequest {
                    documents: &self.documents,
                    selection,
                    device_authentication: self.device_authentication,
                    signing_key: &self.signing_key,
                    handover: &handover,
                },
            )?
        };

        let response = self
            .engine
            .build_response(&received.request, consent)
            .map_err(PresentmentError::ResponseConstruction)?;

        match dispatch(self.engine.as_ref(), &received.request, response).await? {
            DispatchOutcome::Accepted { redirect } => Ok(redirect),
            DispatchOutcome::Rejected { reason } => Err(PresentmentError::DispatchRejected(reason)),
        }
    }

    fn fail(&mut self, error: PresentmentError) -> PresentmentError {
        warn!("presentment failed: {error}");
        self.stage = Stage::Error;
        error
    }
}

/// Builder struct for [Session].
#[derive(Clone, Default)]
pub struct SessionBuilder {
    wallet_parameters: Option<WalletParameters>,
    request_payload: Option<Vec<u8>>,
    engine: Option<Arc<dyn AuthorizationEngine>>,
    encoder: Option<Arc<dyn DocumentEncoder>>,
    device_authentication: DeviceAuthentication,
}

impl SessionBuilder {
    /// Build the session, validating every input up front.
    pub fn build(self) -> Result<Session, PresentmentError> {
        let Self {
            wallet_parameters,
            request_payload,
            engine,
            encoder,
            device_authentication,
        } = self;

        let Some(request_payload) = request_payload else {
            return Err(PresentmentError::MalformedRequestLink(
                "request payload is required, see `with_request_payload`".into(),
            ));
        };
        let link = std::str::from_utf8(&request_payload)
            .map_err(|e| PresentmentError::MalformedRequestLink(e.to_string()))?;
        let link = Url::parse(link.trim())
            .map_err(|e| PresentmentError::MalformedRequestLink(e.to_string()))?;

        let Some(WalletParameters {
            documents,
            signing_key_jwk,
        }) = wallet_parameters
        else {
            return Err(PresentmentError::CredentialDataUnavailable(
                "wallet parameters are required, see `with_wallet_parameters`".into(),
            ));
        };
        if documents.is_empty() {
            return Err(PresentmentError::CredentialDataUnavailable(
                "no credential documents".into(),
            ));
        }
        if signing_key_jwk.trim().is_empty() {
            return Err(PresentmentError::CredentialDataUnavailable(
                "no signing key".into(),
            ));
        }
        let signing_key = p256::SecretKey::from_jwk_str(&signing_key_jwk).map_err(|_| {
            PresentmentError::InvalidWalletConfiguration(
                "signing key is not a P-256 private JWK".into(),
            )
        })?;

        let Some(engine) = engine else {
            return Err(PresentmentError::InvalidWalletConfiguration(
                "authorization engine is required, see `with_engine`".into(),
            ));
        };
        let Some(encoder) = encoder else {
            return Err(PresentmentError::InvalidWalletConfiguration(
                "document encoder is required, see `with_encoder`".into(),
            ));
        };

        Ok(Session {
            stage: Stage::Initialized,
            link,
            documents,
            signing_key,
            device_authentication,
            engine,
            encoder,
            redirect: None,
        })
    }

    pub fn with_wallet_parameters(mut self, wallet_parameters: WalletParameters) -> Self {
        self.wallet_parameters = Some(wallet_parameters);
        self
    }

    /// The raw request link, as scanned or received through a deep link.
    pub fn with_request_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.request_payload = Some(payload.into());
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn AuthorizationEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn DocumentEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Defaults to [DeviceAuthentication::Signature].
    pub fn with_device_authentication(mut self, device_authentication: DeviceAuthentication) -> Self {
        self.device_authentication = device_authentication;
        self
    }
}
