use std::ops::Deref;

use anyhow::{anyhow, bail, Context, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use url::Url;

use self::parameters::{
    ClientId, ClientIdScheme, Nonce, PresentationDefinition, PresentationDefinitionUri,
    RedirectUri, ResponseMode, ResponseType, ResponseUri, State,
};

use super::{
    object::{ParsingErrorContext, TypedParameter, UntypedObject},
    presentation_definition::PresentationDefinition as PresentationDefinitionParsed,
    util::{fetch_text, AsyncHttpClient},
};

pub mod parameters;
pub mod verification;

/// A decoded Authorization Request Object.
///
/// The members the holder relies on are parsed eagerly, everything else stays available
/// through [Deref] to the underlying [UntypedObject].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "UntypedObject", into = "UntypedObject")]
pub struct AuthorizationRequestObject(
    UntypedObject,
    ClientId,
    ClientIdScheme,
    ResponseMode,
    ResponseType,
    Option<PresentationDefinitionIndirection>,
    Url,
    Nonce,
);

/// An Authorization Request as received by the wallet, before the request object is resolved.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub client_id: Option<String>,
    pub request_indirection: RequestIndirection,
}

/// Where the request object lives.
#[derive(Debug, Clone)]
pub enum RequestIndirection {
    /// `request`: a JWT passed by value.
    ByValue(String),
    /// `request_uri`: a JWT to be fetched.
    ByReference(Url),
    /// No request object at all; the parameters are carried directly in the URL.
    ///
    /// Such requests are never signed.
    Plain(UntypedObject),
}

/// A PresentationDefinition, passed by value or by reference
#[derive(Debug, Clone)]
pub enum PresentationDefinitionIndirection {
    ByValue(PresentationDefinitionParsed),
    ByReference(Url),
}

/// Parameters carried as JSON strings when a request is passed as plain URL parameters.
const JSON_VALUED_PARAMETERS: [&str; 2] = [PresentationDefinition::KEY, "client_metadata"];

impl AuthorizationRequest {
    /// Parse from [Url], validating it against the wallet's `authorization_endpoint`.
    /// ```
    /// # use openid4vp_mdl_presentment::core::authorization_request::AuthorizationRequest;
    /// # use openid4vp_mdl_presentment::core::authorization_request::RequestIndirection;
    /// # use url::Url;
    /// let url: Url = "mdoc-openid4vp://?client_id=xyz&request_uri=https%3A%2F%2Fexample.com%2Fr"
    ///     .parse()
    ///     .unwrap();
    /// let authorization_endpoint: Url = "mdoc-openid4vp://".parse().unwrap();
    ///
    /// let authorization_request = AuthorizationRequest::from_url(
    ///     url,
    ///     &authorization_endpoint
    /// ).unwrap();
    ///
    /// assert_eq!(authorization_request.client_id.as_deref(), Some("xyz"));
    ///
    /// let RequestIndirection::ByReference(request_uri) =
    ///     authorization_request.request_indirection
    /// else {
    ///     panic!("expected request-by-reference")
    /// };
    ///
    /// assert_eq!(request_uri.as_str(), "https://example.com/r");
    /// ```
    pub fn from_url(url: Url, authorization_endpoint: &Url) -> Result<Self> {
        if url.scheme() != authorization_endpoint.scheme() {
            bail!(
                "unexpected authorization_endpoint scheme, expected '{}', received '{}'",
                authorization_endpoint.scheme(),
                url.scheme()
            )
        }
        let fnd = url.authority();
        let exp = authorization_endpoint.authority();
        if fnd != exp {
            bail!("unexpected authorization_endpoint authority, expected '{exp}', received '{fnd}'")
        }
        let query = url
            .query()
            .ok_or(anyhow!("missing query params in Authorization Request uri"))?;
        Self::from_query_params(query)
    }

    /// Parse from urlencoded query parameters.
    pub fn from_query_params(query_params: &str) -> Result<Self> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query_params)
            .context("unable to parse Authorization Request from query params")?;

        let mut params = Map::new();
        for (key, value) in pairs {
            let value = if JSON_VALUED_PARAMETERS.contains(&key.as_str()) {
                serde_json::from_str(&value)
                    .with_context(|| format!("'{key}' is not valid JSON"))?
            } else {
                Json::String(value)
            };
            params.insert(key, value);
        }

        let client_id = params
            .get(ClientId::KEY)
            .and_then(Json::as_str)
            .map(ToOwned::to_owned);

        let request_indirection = match (params.remove("request"), params.remove("request_uri")) {
            (Some(_), Some(_)) => bail!("'request' and 'request_uri' are mutually exclusive"),
            (Some(Json::String(jwt)), None) => RequestIndirection::ByValue(jwt),
            (None, Some(Json::String(uri))) => RequestIndirection::ByReference(
                uri.parse().context("'request_uri' is not a valid URL")?,
            ),
            (None, None) => RequestIndirection::Plain(params.into()),
            _ => bail!("'request' and 'request_uri' must be strings"),
        };

        Ok(Self {
            client_id,
            request_indirection,
        })
    }
}

impl AuthorizationRequestObject {
    /// The full client identifier, including any scheme prefix.
    pub fn client_id(&self) -> &ClientId {
        &self.1
    }

    pub fn client_id_scheme(&self) -> &ClientIdScheme {
        &self.2
    }

    pub fn response_mode(&self) -> &ResponseMode {
        &self.3
    }

    pub fn response_type(&self) -> &ResponseType {
        &self.4
    }

    /// The `response_uri` the response is posted to.
    ///
    /// Only `direct_post` style response modes are accepted, so a request carrying
    /// `redirect_uri` instead is rejected at parse time.
    pub fn return_uri(&self) -> &Url {
        &self.6
    }

    pub fn nonce(&self) -> &Nonce {
        &self.7
    }

    /// `state`, echoed back in the response when present.
    pub fn state(&self) -> Option<Result<State>> {
        self.0.get()
    }

    pub fn presentation_definition_indirection(&self) -> Option<&PresentationDefinitionIndirection> {
        self.5.as_ref()
    }

    /// Resolve the presentation definition, fetching it when passed by reference.
    pub async fn resolve_presentation_definition<H: AsyncHttpClient + ?Sized>(
        &self,
        http_client: &H,
    ) -> Result<PresentationDefinitionParsed> {
        match &self.5 {
            None => bail!("request does not carry a presentation definition"),
            Some(PresentationDefinitionIndirection::ByValue(by_value)) => Ok(by_value.clone()),
            Some(PresentationDefinitionIndirection::ByReference(by_reference)) => {
                let body = fetch_text(http_client, by_reference, "presentation definition").await?;
                serde_json::from_str::<Json>(&body)
                    .context(format!(
                        "failed to parse presentation definition response as JSON from {by_reference}"
                    ))?
                    .try_into()
                    .context("failed to parse presentation definition from JSON")
            }
        }
    }
}

impl From<AuthorizationRequestObject> for UntypedObject {
    fn from(value: AuthorizationRequestObject) -> Self {
        value.0
    }
}

impl TryFrom<UntypedObject> for AuthorizationRequestObject {
    type Error = Error;

    fn try_from(value: UntypedObject) -> std::result::Result<Self, Self::Error> {
        let client_id: ClientId = value.get().parsing_error()?;

        let client_id_scheme = match value.get::<ClientIdScheme>() {
            Some(scheme) => scheme.parsing_error()?,
            None => client_id
                .split_scheme()
                .0
                .unwrap_or(ClientIdScheme::PreRegistered),
        };

        let redirect_uri = value.get::<RedirectUri>();
        let response_uri = value.get::<ResponseUri>();

        let (return_uri, response_mode) = match (
            redirect_uri,
            response_uri,
            value.get_or_default::<ResponseMode>().parsing_error()?,
        ) {
            (_, _, ResponseMode::Unsupported(m)) => {
                bail!("this 'response_mode' ({m}) is not currently supported")
            }
            (Some(_), Some(_), _) => {
                bail!("'response_uri' and 'redirect_uri' are mutually exclusive")
            }
            (_, None, response_mode) => {
                bail!("'response_uri' is required for this 'response_mode' ({response_mode})")
            }
            (_, Some(uri), response_mode) => (uri.parsing_error()?.0, response_mode),
        };

        let response_type: ResponseType = value.get().parsing_error()?;

        let pd_indirection = match (
            value.get::<PresentationDefinition>(),
            value.get::<PresentationDefinitionUri>(),
        ) {
            (Some(_), Some(_)) => {
                bail!("'presentation_definition' and 'presentation_definition_uri' are mutually exclusive")
            }
            (Some(by_value), None) => Some(PresentationDefinitionIndirection::ByValue(
                by_value.parsing_error()?.0,
            )),
            (None, Some(by_reference)) => Some(PresentationDefinitionIndirection::ByReference(
                by_reference.parsing_error()?.0,
            )),
            (None, None) => match response_type {
                ResponseType::IdToken => None,
                _ => bail!(
                    "one of 'presentation_definition' and 'presentation_definition_uri' are required"
                ),
            },
        };

        let nonce = value.get().parsing_error()?;

        Ok(Self(
            value,
            client_id,
            client_id_scheme,
            response_mode,
            response_type,
            pd_indirection,
            return_uri,
            nonce,
        ))
    }
}

impl Deref for AuthorizationRequestObject {
    type Target = UntypedObject;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn request_object() -> Json {
        json!({
            "client_id": "x509_san_dns:verifier.example.com",
            "response_type": "vp_token",
            "response_mode": "direct_post",
            "response_uri": "https://verifier.example.com/response",
            "nonce": "n-0S6_WzA2Mj",
            "state": "af0ifjsldkj",
            "presentation_definition": {
                "id": "mDL-sample-req",
                "input_descriptors": []
            }
        })
    }

    #[test]
    fn scheme_is_taken_from_client_id_prefix() {
        let request: AuthorizationRequestObject =
            serde_json::from_value(request_object()).unwrap();

        assert_eq!(request.client_id_scheme(), &ClientIdScheme::X509SanDns);
        assert_eq!(request.response_mode(), &ResponseMode::DirectPost);
        assert_eq!(
            request.return_uri().as_str(),
            "https://verifier.example.com/response"
        );
        assert_eq!(request.state().unwrap().unwrap(), State("af0ifjsldkj".into()));
        assert!(matches!(
            request.presentation_definition_indirection(),
            Some(PresentationDefinitionIndirection::ByValue(_))
        ));
    }

    #[test]
    fn response_uri_is_required() {
        let mut value = request_object();
        value.as_object_mut().unwrap().remove("response_uri");
        let err = serde_json::from_value::<AuthorizationRequestObject>(value).unwrap_err();
        assert!(err.to_string().contains("'response_uri' is required"));
    }

    #[test]
    fn redirect_uri_is_not_a_return_uri() {
        let mut value = request_object();
        let object = value.as_object_mut().unwrap();
        object.remove("response_uri");
        object.insert("redirect_uri".into(), json!("https://verifier.example.com/cb"));
        let err = serde_json::from_value::<AuthorizationRequestObject>(value).unwrap_err();
        assert!(err.to_string().contains("'response_uri' is required"));

        let mut value = request_object();
        value["redirect_uri"] = json!("https://verifier.example.com/cb");
        let err = serde_json::from_value::<AuthorizationRequestObject>(value).unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn plain_parameters_parse_json_members() {
        let query = serde_urlencoded::to_string([
            ("client_id", "verifier.example.com"),
            ("response_type", "vp_token"),
            ("presentation_definition", r#"{"id":"pd","input_descriptors":[]}"#),
        ])
        .unwrap();

        let request = AuthorizationRequest::from_query_params(&query).unwrap();
        let RequestIndirection::Plain(params) = request.request_indirection else {
            panic!("expected plain parameters")
        };
        assert_eq!(
            params.get_raw("presentation_definition"),
            Some(&json!({ "id": "pd", "input_descriptors": [] }))
        );
    }

    #[test]
    fn authorization_endpoint_must_match() {
        let url: Url = "openid4vp://?client_id=xyz&request=abc".parse().unwrap();
        let endpoint: Url = "mdoc-openid4vp://".parse().unwrap();
        assert!(AuthorizationRequest::from_url(url, &endpoint).is_err());
    }
}
