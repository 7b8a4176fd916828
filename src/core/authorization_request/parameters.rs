use std::fmt;

use crate::core::{
    object::TypedParameter,
    presentation_definition::PresentationDefinition as PresentationDefinitionParsed,
};
use anyhow::{bail, Error};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use url::Url;

const DID: &str = "did";
const PREREGISTERED: &str = "pre-registered";
const REDIRECT_URI: &str = "redirect_uri";
const X509_SAN_DNS: &str = "x509_san_dns";
const X509_SAN_URI: &str = "x509_san_uri";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
    /// Split a prefixed client identifier (`x509_san_dns:verifier.example.com`) into its
    /// scheme and the remaining identifier.
    ///
    /// Identifiers without a known prefix are returned unchanged with no scheme.
    pub fn split_scheme(&self) -> (Option<ClientIdScheme>, &str) {
        let Some((prefix, rest)) = self.0.split_once(':') else {
            return (None, &self.0);
        };
        match ClientIdScheme::from(prefix.to_string()) {
            ClientIdScheme::Other(_) => (None, &self.0),
            scheme => (Some(scheme), rest),
        }
    }
}

impl TypedParameter for ClientId {
    const KEY: &'static str = "client_id";
}

impl TryFrom<Json> for ClientId {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<ClientId> for Json {
    fn from(value: ClientId) -> Self {
        Json::String(value.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIdScheme {
    Did,
    PreRegistered,
    RedirectUri,
    X509SanDns,
    X509SanUri,
    Other(String),
}

impl TypedParameter for ClientIdScheme {
    const KEY: &'static str = "client_id_scheme";
}

impl From<String> for ClientIdScheme {
    fn from(s: String) -> Self {
        match s.as_str() {
            DID => ClientIdScheme::Did,
            PREREGISTERED => ClientIdScheme::PreRegistered,
            REDIRECT_URI => ClientIdScheme::RedirectUri,
            X509_SAN_DNS => ClientIdScheme::X509SanDns,
            X509_SAN_URI => ClientIdScheme::X509SanUri,
            _ => ClientIdScheme::Other(s),
        }
    }
}

impl From<ClientIdScheme> for String {
    fn from(cis: ClientIdScheme) -> Self {
        match cis {
            ClientIdScheme::Other(u) => u,
            known => known.to_string(),
        }
    }
}

impl TryFrom<Json> for ClientIdScheme {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
            .map(String::into)
            .map_err(Error::from)
    }
}

impl From<ClientIdScheme> for Json {
    fn from(value: ClientIdScheme) -> Self {
        Json::String(value.into())
    }
}

impl fmt::Display for ClientIdScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientIdScheme::Did => DID,
            ClientIdScheme::PreRegistered => PREREGISTERED,
            ClientIdScheme::RedirectUri => REDIRECT_URI,
            ClientIdScheme::X509SanDns => X509_SAN_DNS,
            ClientIdScheme::X509SanUri => X509_SAN_URI,
            ClientIdScheme::Other(o) => o.as_str(),
        }
        .fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonce(pub String);

impl TypedParameter for Nonce {
    const KEY: &'static str = "nonce";
}

impl TryFrom<Json> for Nonce {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<Nonce> for Json {
    fn from(value: Nonce) -> Self {
        Json::String(value.0)
    }
}

/// `redirect_uri` field in the Authorization Request.
#[derive(Debug, Clone)]
pub struct RedirectUri(pub Url);

impl TypedParameter for RedirectUri {
    const KEY: &'static str = "redirect_uri";
}

impl From<RedirectUri> for Json {
    fn from(value: RedirectUri) -> Self {
        value.0.to_string().into()
    }
}

impl TryFrom<Json> for RedirectUri {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(serde_json::from_value(value).map(RedirectUri)?)
    }
}

/// `response_uri` field in the Authorization Request.
#[derive(Debug, Clone)]
pub struct ResponseUri(pub Url);

impl TypedParameter for ResponseUri {
    const KEY: &'static str = "response_uri";
}

impl From<ResponseUri> for Json {
    fn from(value: ResponseUri) -> Self {
        value.0.to_string().into()
    }
}

impl TryFrom<Json> for ResponseUri {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(serde_json::from_value(value).map(ResponseUri)?)
    }
}

const DIRECT_POST: &str = "direct_post";
const DIRECT_POST_JWT: &str = "direct_post.jwt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseMode {
    /// The `direct_post` response mode as defined in OID4VP.
    DirectPost,
    /// The `direct_post.jwt` response mode as defined in OID4VP.
    DirectPostJwt,
    /// A ResponseMode that is unsupported by this library.
    Unsupported(String),
}

impl TypedParameter for ResponseMode {
    const KEY: &'static str = "response_mode";
}

impl From<String> for ResponseMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            DIRECT_POST => ResponseMode::DirectPost,
            DIRECT_POST_JWT => ResponseMode::DirectPostJwt,
            _ => ResponseMode::Unsupported(s),
        }
    }
}

impl From<ResponseMode> for String {
    fn from(s: ResponseMode) -> Self {
        match s {
            ResponseMode::DirectPost => DIRECT_POST.into(),
            ResponseMode::DirectPostJwt => DIRECT_POST_JWT.into(),
            ResponseMode::Unsupported(u) => u,
        }
    }
}

impl TryFrom<Json> for ResponseMode {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        let s: String = serde_json::from_value(value)?;
        Ok(s.into())
    }
}

impl From<ResponseMode> for Json {
    fn from(rm: ResponseMode) -> Self {
        String::from(rm).into()
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseMode::DirectPost => DIRECT_POST,
            ResponseMode::DirectPostJwt => DIRECT_POST_JWT,
            ResponseMode::Unsupported(u) => u.as_str(),
        }
        .fmt(f)
    }
}

impl Default for ResponseMode {
    fn default() -> Self {
        Self::Unsupported("fragment".into())
    }
}

const VP_TOKEN: &str = "vp_token";
const ID_TOKEN: &str = "id_token";
const VP_TOKEN_ID_TOKEN: &str = "vp_token id_token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseType {
    VpToken,
    IdToken,
    VpTokenIdToken,
    Unsupported(String),
}

impl From<ResponseType> for String {
    fn from(rt: ResponseType) -> Self {
        match rt {
            ResponseType::VpToken => VP_TOKEN.into(),
            ResponseType::IdToken => ID_TOKEN.into(),
            ResponseType::VpTokenIdToken => VP_TOKEN_ID_TOKEN.into(),
            ResponseType::Unsupported(s) => s,
        }
    }
}

impl From<String> for ResponseType {
    fn from(s: String) -> Self {
        match s.as_str() {
            VP_TOKEN => ResponseType::VpToken,
            ID_TOKEN => ResponseType::IdToken,
            // Response types are a space-delimited set, order is irrelevant.
            VP_TOKEN_ID_TOKEN | "id_token vp_token" => ResponseType::VpTokenIdToken,
            _ => ResponseType::Unsupported(s),
        }
    }
}

impl TypedParameter for ResponseType {
    const KEY: &'static str = "response_type";
}

impl TryFrom<Json> for ResponseType {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        let s: String = serde_json::from_value(value)?;
        Ok(s.into())
    }
}

impl From<ResponseType> for Json {
    fn from(rt: ResponseType) -> Self {
        Json::String(rt.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State(pub String);

impl TypedParameter for State {
    const KEY: &'static str = "state";
}

impl TryFrom<Json> for State {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<State> for Json {
    fn from(value: State) -> Self {
        Json::String(value.0)
    }
}

/// `presentation_definition` passed by value.
///
/// Plain-parameter requests carry the definition as a JSON string, so both encodings
/// are accepted.
#[derive(Debug, Clone)]
pub struct PresentationDefinition(pub PresentationDefinitionParsed);

impl TypedParameter for PresentationDefinition {
    const KEY: &'static str = "presentation_definition";
}

impl TryFrom<Json> for PresentationDefinition {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        let parsed = match value {
            Json::String(s) => serde_json::from_str(&s)?,
            value @ Json::Object(_) => serde_json::from_value(value)?,
            _ => bail!("expected a JSON object"),
        };
        Ok(Self(parsed))
    }
}

impl From<PresentationDefinition> for Json {
    fn from(value: PresentationDefinition) -> Self {
        serde_json::to_value(value.0).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct PresentationDefinitionUri(pub Url);

impl TypedParameter for PresentationDefinitionUri {
    const KEY: &'static str = "presentation_definition_uri";
}

impl TryFrom<Json> for PresentationDefinitionUri {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(serde_json::from_value(value).map(Self)?)
    }
}

impl From<PresentationDefinitionUri> for Json {
    fn from(value: PresentationDefinitionUri) -> Self {
        value.0.to_string().into()
    }
}
