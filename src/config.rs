use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::core::{
    authorization_request::parameters::{ClientIdScheme, ResponseType},
    metadata::{
        parameters::wallet::{Issuer, ResponseTypesSupported, VpFormatsSupported, MSO_MDOC},
        WalletMetadata,
    },
    object::UntypedObject,
};

const DEFAULT_VERIFIER_API: &str = "http://127.0.0.1:3000/";
const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "mdoc-openid4vp://";

/// Holder wallet configuration.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WalletConfig {
    /// Base of the verifier API, advertised as the wallet metadata `issuer`.
    pub verifier_api: BaseUrl,
    /// Scheme (and authority) that request links must be addressed to.
    pub authorization_endpoint: Url,
    pub request_object_signing_algs: Vec<String>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            verifier_api: BaseUrl(
                Url::parse(DEFAULT_VERIFIER_API).expect("default verifier API is a valid URL"),
            ),
            authorization_endpoint: Url::parse(DEFAULT_AUTHORIZATION_ENDPOINT)
                .expect("default authorization endpoint is a valid URL"),
            request_object_signing_algs: vec!["ES256".into()],
        }
    }
}

impl WalletConfig {
    /// Wallet metadata the request object is validated against.
    pub fn metadata(&self) -> WalletMetadata {
        let mut vp_formats = serde_json::Map::new();
        vp_formats.insert(
            MSO_MDOC.into(),
            json!({ "alg": self.request_object_signing_algs }),
        );

        let mut document = UntypedObject::default();
        document
            .insert(Issuer(self.verifier_api.to_string()))
            .insert(ResponseTypesSupported(vec![ResponseType::VpToken]))
            .insert(VpFormatsSupported(vp_formats));

        WalletMetadata::new(
            self.authorization_endpoint.clone(),
            vec![ClientIdScheme::X509SanDns],
            self.request_object_signing_algs.clone(),
            document,
        )
    }
}

/// A url that is always a base (can be safely join()'ed with further path elements without
/// mangling).
#[derive(Deserialize, Debug, Clone, Hash, PartialEq, Eq)]
#[serde(try_from = "String")]
pub struct BaseUrl(Url);

impl std::ops::Deref for BaseUrl {
    type Target = Url;

    fn deref(&self) -> &Url {
        &self.0
    }
}

impl TryFrom<String> for BaseUrl {
    type Error = url::ParseError;

    fn try_from(mut url: String) -> Result<Self, Self::Error> {
        // Make URL a base.
        if !url.ends_with('/') {
            url += "/"
        }
        url.parse().map(Self)
    }
}
