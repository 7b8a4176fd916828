use crate::core::{
    authorization_request::parameters::{ClientIdScheme, ResponseType},
    object::TypedParameter,
};

use anyhow::{bail, Error, Result};
use serde_json::{Map, Value as Json};
use url::Url;

/// Claim format designation for ISO/IEC 18013-5 mobile documents.
pub const MSO_MDOC: &str = "mso_mdoc";

#[derive(Debug, Clone)]
pub struct Issuer(pub String);

impl TypedParameter for Issuer {
    const KEY: &'static str = "issuer";
}

impl TryFrom<Json> for Issuer {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<Issuer> for Json {
    fn from(value: Issuer) -> Json {
        Json::String(value.0)
    }
}

#[derive(Debug, Clone)]
pub struct AuthorizationEndpoint(pub Url);

impl TypedParameter for AuthorizationEndpoint {
    const KEY: &'static str = "authorization_endpoint";
}

impl TryFrom<Json> for AuthorizationEndpoint {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<AuthorizationEndpoint> for Json {
    fn from(value: AuthorizationEndpoint) -> Json {
        Json::String(value.0.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ResponseTypesSupported(pub Vec<ResponseType>);

impl TypedParameter for ResponseTypesSupported {
    const KEY: &'static str = "response_types_supported";
}

impl TryFrom<Json> for ResponseTypesSupported {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        let xs: Vec<String> = serde_json::from_value(value)?;
        Ok(Self(xs.into_iter().map(ResponseType::from).collect()))
    }
}

impl From<ResponseTypesSupported> for Json {
    fn from(value: ResponseTypesSupported) -> Json {
        Json::Array(value.0.into_iter().map(Json::from).collect())
    }
}

#[derive(Debug, Clone)]
pub struct ClientIdSchemesSupported(pub Vec<ClientIdScheme>);

impl TypedParameter for ClientIdSchemesSupported {
    const KEY: &'static str = "client_id_schemes_supported";
}

impl TryFrom<Json> for ClientIdSchemesSupported {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        let Json::Array(xs) = value else {
            bail!("expected JSON array")
        };
        xs.into_iter()
            .map(Json::try_into)
            .collect::<Result<Vec<ClientIdScheme>>>()
            .map(Self)
    }
}

impl From<ClientIdSchemesSupported> for Json {
    fn from(value: ClientIdSchemesSupported) -> Json {
        Json::Array(value.0.into_iter().map(Json::from).collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestObjectSigningAlgValuesSupported(pub Vec<String>);

impl TypedParameter for RequestObjectSigningAlgValuesSupported {
    const KEY: &'static str = "request_object_signing_alg_values_supported";
}

impl TryFrom<Json> for RequestObjectSigningAlgValuesSupported {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<RequestObjectSigningAlgValuesSupported> for Json {
    fn from(value: RequestObjectSigningAlgValuesSupported) -> Json {
        Json::Array(value.0.into_iter().map(Json::from).collect())
    }
}

/// Claim formats the wallet can present, keyed by designation (e.g. [MSO_MDOC]).
#[derive(Debug, Clone, Default)]
pub struct VpFormatsSupported(pub Map<String, Json>);

impl TypedParameter for VpFormatsSupported {
    const KEY: &'static str = "vp_formats_supported";
}

impl TryFrom<Json> for VpFormatsSupported {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        serde_json::from_value(value).map(Self).map_err(Into::into)
    }
}

impl From<VpFormatsSupported> for Json {
    fn from(value: VpFormatsSupported) -> Json {
        Json::Object(value.0)
    }
}

impl VpFormatsSupported {
    pub fn is_claim_format_supported(&self, designation: &str) -> bool {
        self.0.contains_key(designation)
    }
}
