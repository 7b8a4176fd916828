/// Errors surfaced by a presentment [Session](super::session::Session).
///
/// Any error returned from a session operation leaves the session in the
/// [Error](super::session::Status::Error) state.
#[derive(Debug, thiserror::Error)]
pub enum PresentmentError {
    /// The signing key could not be parsed, or a collaborator is missing.
    #[error("invalid wallet configuration: {0}")]
    InvalidWalletConfiguration(String),

    /// No credential documents or no signing key were supplied.
    #[error("credential data unavailable: {0}")]
    CredentialDataUnavailable(String),

    /// The request payload is not a UTF-8 URL.
    #[error("malformed request link: {0}")]
    MalformedRequestLink(String),

    /// The verifier's request object was not signed.
    #[error("the authorization request is not secured")]
    InsecureRequest,

    /// The verifier asked for authentication, which is not supported.
    #[error("unsupported request kind: {0}")]
    UnsupportedRequestKind(String),

    /// The presentation definition does not describe a single mdoc document.
    #[error("the presentation definition does not name a document type and namespace")]
    InvalidPresentationDefinition,

    /// The operation is not allowed in the current session state.
    #[error("session is not ready for this operation (status: {0})")]
    SessionNotReady(String),

    /// The document encoder produced no device response.
    #[error("unable to encode the selected documents")]
    DocumentEncodingError,

    /// The verifier answered the dispatched response with a rejection.
    #[error("the verifier rejected the response: {0}")]
    DispatchRejected(String),

    #[error("unable to resolve the authorization request: {0:#}")]
    RequestResolution(anyhow::Error),

    #[error("unable to construct the authorization response: {0:#}")]
    ResponseConstruction(anyhow::Error),

    #[error("unable to dispatch the authorization response: {0:#}")]
    Dispatch(anyhow::Error),
}
