use anyhow::Result;
use url::Url;

use self::parameters::wallet::{
    AuthorizationEndpoint, ClientIdSchemesSupported, RequestObjectSigningAlgValuesSupported,
};

use super::{
    authorization_request::parameters::ClientIdScheme,
    object::{TypedParameter, UntypedObject},
};

pub mod parameters;

/// What the wallet advertises to verifiers, and holds their request objects to.
///
/// The advertised document carries every parameter; the ones request validation relies on
/// are also kept typed.
#[derive(Debug, Clone)]
pub struct WalletMetadata {
    document: UntypedObject,
    authorization_endpoint: Url,
    client_id_schemes_supported: Vec<ClientIdScheme>,
    request_object_signing_algs: Vec<String>,
}

impl WalletMetadata {
    /// `document` holds the remaining advertised parameters, e.g. `issuer` and
    /// `vp_formats_supported`.
    pub fn new(
        authorization_endpoint: Url,
        client_id_schemes_supported: Vec<ClientIdScheme>,
        request_object_signing_algs: Vec<String>,
        mut document: UntypedObject,
    ) -> Self {
        document
            .insert(AuthorizationEndpoint(authorization_endpoint.clone()))
            .insert(ClientIdSchemesSupported(client_id_schemes_supported.clone()))
            .insert(RequestObjectSigningAlgValuesSupported(
                request_object_signing_algs.clone(),
            ));

        Self {
            document,
            authorization_endpoint,
            client_id_schemes_supported,
            request_object_signing_algs,
        }
    }

    /// Request links must be addressed to this endpoint's scheme and authority.
    pub fn authorization_endpoint(&self) -> &Url {
        &self.authorization_endpoint
    }

    pub fn client_id_schemes_supported(&self) -> &[ClientIdScheme] {
        &self.client_id_schemes_supported
    }

    pub fn supports_signing_alg(&self, alg: &str) -> bool {
        self.request_object_signing_algs.iter().any(|a| a == alg)
    }

    pub fn get<T: TypedParameter>(&self) -> Option<Result<T>> {
        self.document.get()
    }

    /// The metadata as advertised.
    pub fn document(&self) -> &UntypedObject {
        &self.document
    }
}
