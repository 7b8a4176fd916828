use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use serde_json::Value as Json;
use tracing::debug;
use url::Url;

use crate::{
    config::WalletConfig,
    core::{
        authorization_request::{
            parameters::ResponseType,
            verification::{verify_request, VerifiedRequest},
            AuthorizationRequest, AuthorizationRequestObject, RequestIndirection,
        },
        metadata::WalletMetadata,
        presentation_definition::PresentationDefinition,
        response::{AuthorizationResponse, Consent, DispatchOutcome, PostRedirection},
        util::{base_request, fetch_text, AsyncHttpClient},
    },
};

use super::trust::TrustEvaluator;

/// What a verified request asks of the holder.
#[derive(Debug, Clone)]
pub enum RequestKind {
    /// `vp_token`: present mdoc data elements.
    Presentation {
        request: AuthorizationRequestObject,
        presentation_definition: PresentationDefinition,
    },
    /// `id_token`
    Authentication(AuthorizationRequestObject),
    /// `vp_token id_token`
    PresentationAndAuthentication(AuthorizationRequestObject),
}

#[derive(Debug, Clone)]
pub enum ResolvedRequest {
    /// The request could not be attributed to the verifier.
    Unsecured(AuthorizationRequestObject),
    Secured(RequestKind),
}

/// OpenID4VP request resolution and response dispatch.
#[async_trait]
pub trait AuthorizationEngine: Send + Sync {
    /// Resolve a request link into a verified, classified request.
    async fn resolve_request(&self, link: Url) -> Result<ResolvedRequest>;

    fn build_response(
        &self,
        request: &AuthorizationRequestObject,
        consent: Consent,
    ) -> Result<AuthorizationResponse>;

    /// Send `response` to the verifier.
    ///
    /// Transport failures are errors, a verifier refusing the response is
    /// [DispatchOutcome::Rejected].
    async fn dispatch(
        &self,
        request: &AuthorizationRequestObject,
        response: AuthorizationResponse,
    ) -> Result<DispatchOutcome>;
}

/// [AuthorizationEngine] speaking OpenID4VP over HTTP.
#[derive(Debug, Clone)]
pub struct OpenId4VpEngine<H> {
    metadata: WalletMetadata,
    http_client: H,
    trust: Arc<TrustEvaluator>,
}

impl<H: AsyncHttpClient + Send + Sync> OpenId4VpEngine<H> {
    pub fn new(config: &WalletConfig, http_client: H, trust: Arc<TrustEvaluator>) -> Self {
        Self {
            metadata: config.metadata(),
            http_client,
            trust,
        }
    }

    pub fn metadata(&self) -> &WalletMetadata {
        &self.metadata
    }

    async fn classify(&self, request: AuthorizationRequestObject) -> Result<RequestKind> {
        match request.response_type() {
            ResponseType::VpToken => {
                let presentation_definition = request
                    .resolve_presentation_definition(&self.http_client)
                    .await?;
                Ok(RequestKind::Presentation {
                    request,
                    presentation_definition,
                })
            }
            ResponseType::IdToken => Ok(RequestKind::Authentication(request)),
            ResponseType::VpTokenIdToken => Ok(RequestKind::PresentationAndAuthentication(request)),
            ResponseType::Unsupported(rt) => bail!("unsupported response_type '{rt}'"),
        }
    }
}

#[async_trait]
impl<H: AsyncHttpClient + Send + Sync> AuthorizationEngine for OpenId4VpEngine<H> {
    async fn resolve_request(&self, link: Url) -> Result<ResolvedRequest> {
        let authorization_request =
            AuthorizationRequest::from_url(link, self.metadata.authorization_endpoint())
                .context("unable to parse authorization request")?;

        let jwt = match authorization_request.request_indirection {
            RequestIndirection::ByValue(jwt) => jwt,
            RequestIndirection::ByReference(request_uri) => {
                fetch_text(&self.http_client, &request_uri, "request object")
                    .await?
                    .trim()
                    .to_owned()
            }
            RequestIndirection::Plain(parameters) => {
                let request: AuthorizationRequestObject = parameters
                    .try_into()
                    .context("unable to parse authorization request parameters")?;
                debug!(client_id = %request.client_id().0, "request was passed as plain parameters");
                return Ok(ResolvedRequest::Unsecured(request));
            }
        };

        let request = match verify_request(&self.metadata, &jwt, &self.trust)
            .context("unable to verify request object")?
        {
            VerifiedRequest::Unsecured(request) => return Ok(ResolvedRequest::Unsecured(request)),
            VerifiedRequest::Secured(request) => request,
        };

        if let Some(client_id) = &authorization_request.client_id {
            if client_id != &request.client_id().0 {
                bail!(
                    "mismatch between client_id in authorization request ('{client_id}') and request object ('{}')",
                    request.client_id().0
                )
            }
        }

        debug!(client_id = %request.client_id().0, "request object verified");

        self.classify(request).await.map(ResolvedRequest::Secured)
    }

    fn build_response(
        &self,
        request: &AuthorizationRequestObject,
        consent: Consent,
    ) -> Result<AuthorizationResponse> {
        AuthorizationResponse::new(request, consent)
    }

    async fn dispatch(
        &self,
        request: &AuthorizationRequestObject,
        response: AuthorizationResponse,
    ) -> Result<DispatchOutcome> {
        let return_uri = response.return_uri().clone();
        let body = response.into_x_www_form_urlencoded()?;

        let http_request = base_request()
            .method("POST")
            .uri(return_uri.as_str())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body.into_bytes())
            .context("failed to construct authorization response request")?;

        debug!(client_id = %request.client_id().0, %return_uri, "posting authorization response");

        let http_response = self
            .http_client
            .execute(http_request)
            .await
            .context("failed to make authorization response request")?;

        let status = http_response.status();
        let body = String::from_utf8_lossy(http_response.body());

        if status.is_success() {
            let redirect = serde_json::from_str::<PostRedirection>(&body)
                .ok()
                .map(|PostRedirection { redirect_uri }| redirect_uri);
            return Ok(DispatchOutcome::Accepted { redirect });
        }

        let reason = serde_json::from_str::<Json>(&body)
            .ok()
            .and_then(|body| body.get("error")?.as_str().map(ToOwned::to_owned))
            .unwrap_or_else(|| format!("authorization response was refused (status: {status})"));

        Ok(DispatchOutcome::Rejected { reason })
    }
}
