pub use crate::core::authorization_request::parameters::State;
pub use crate::core::presentation_submission::PresentationSubmission;

use crate::core::object::TypedParameter;

use anyhow::Error;
use serde_json::Value as Json;

/// `vp_token` carrying a single base64url encoded mdoc device response.
///
/// See: [OpenID.VP#section-6.1-2.2](https://openid.net/specs/openid-4-verifiable-presentations-1_0.html#section-6.1-2.2)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpToken(pub String);

impl TypedParameter for VpToken {
    const KEY: &'static str = "vp_token";
}

impl TryFrom<Json> for VpToken {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<VpToken> for Json {
    fn from(value: VpToken) -> Self {
        Json::String(value.0)
    }
}

/// OAuth 2.0 `error` code of an error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode(pub String);

impl ErrorCode {
    /// The holder declined to share the requested data.
    pub const ACCESS_DENIED: &'static str = "access_denied";
}

impl TypedParameter for ErrorCode {
    const KEY: &'static str = "error";
}

impl TryFrom<Json> for ErrorCode {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<ErrorCode> for Json {
    fn from(value: ErrorCode) -> Self {
        Json::String(value.0)
    }
}

/// Human-readable `error_description` of an error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescription(pub String);

impl TypedParameter for ErrorDescription {
    const KEY: &'static str = "error_description";
}

impl TryFrom<Json> for ErrorDescription {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<ErrorDescription> for Json {
    fn from(value: ErrorDescription) -> Self {
        Json::String(value.0)
    }
}
