use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use http::{Request, Response};
use url::Url;

/// Generic HTTP client.
///
/// A trait is used here so that mobile hosts can supply their native HTTP/TLS stack.
#[async_trait]
pub trait AsyncHttpClient {
    async fn execute(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>>;
}

pub(crate) fn base_request() -> http::request::Builder {
    Request::builder().header(http::header::USER_AGENT, "openid4vp-mdl-presentment")
}

/// GET `url` and return the body as UTF-8, failing on any non-success status.
///
/// `what` names the resource in error messages.
pub(crate) async fn fetch_text<H: AsyncHttpClient + ?Sized>(
    http_client: &H,
    url: &Url,
    what: &str,
) -> Result<String> {
    let request = base_request()
        .method("GET")
        .uri(url.as_str())
        .body(vec![])
        .with_context(|| format!("failed to build {what} request"))?;

    let response = http_client
        .execute(request)
        .await
        .with_context(|| format!("failed to make {what} request at {url}"))?;

    let status = response.status();
    let Ok(body) = String::from_utf8(response.into_body()) else {
        bail!("failed to parse {what} response as UTF-8 from {url} (status: {status})")
    };

    if !status.is_success() {
        bail!("{what} request was unsuccessful (status: {status}): {body}")
    }

    Ok(body)
}

#[derive(Debug)]
pub struct ReqwestClient(reqwest::Client);

impl AsRef<reqwest::Client> for ReqwestClient {
    fn as_ref(&self) -> &reqwest::Client {
        &self.0
    }
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .context("unable to build http_client")
            .map(Self)
    }
}

#[async_trait]
impl AsyncHttpClient for ReqwestClient {
    async fn execute(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        let response = self
            .0
            .execute(request.try_into().context("unable to convert request")?)
            .await
            .context("http request failed")?;

        let mut builder = Response::builder()
            .status(response.status())
            .version(response.version());

        builder
            .headers_mut()
            .context("unable to set headers")?
            .extend(response.headers().clone());

        builder
            .body(
                response
                    .bytes()
                    .await
                    .context("failed to extract response body")?
                    .to_vec(),
            )
            .context("unable to construct response")
    }
}
