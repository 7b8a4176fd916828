//! This library implements the holder side of an [OID4VP] presentment of ISO/IEC 18013-5
//! mobile documents (mdoc), such as a mobile driving licence.
//!
//! [OID4VP]: <https://openid.net/specs/openid-4-verifiable-presentations-1_0.html>
//!
//! # Usage
//!
//! A [`Session`] answers a single authorization request:
//!
//! ```ignore
//! use std::sync::Arc;
//! use openid4vp_mdl_presentment::config::WalletConfig;
//! use openid4vp_mdl_presentment::core::util::ReqwestClient;
//! use openid4vp_mdl_presentment::holder::{
//!     engine::OpenId4VpEngine, trust::TrustEvaluator, Session, WalletParameters,
//! };
//!
//! let config = WalletConfig::default();
//! let trust = Arc::new(TrustEvaluator::from_pem(iaca_pem)?);
//! let engine = Arc::new(OpenId4VpEngine::new(&config, ReqwestClient::new()?, trust));
//!
//! let mut session = Session::builder()
//!     .with_wallet_parameters(WalletParameters { documents, signing_key_jwk })
//!     .with_request_payload(scanned_qr_code)
//!     .with_engine(engine)
//!     .with_encoder(Arc::new(my_device_response_encoder))
//!     .build()?;
//!
//! // Resolve the request and verify the verifier's certificate chain.
//! let requested = session.receive_request().await?;
//!
//! // Show `requested.valid_items_requested` to the holder, and send what they agreed to.
//! if let Some(redirect) = session.send_response(true, selection).await? {
//!     open_in_browser(redirect);
//! }
//! ```
//!
//! # Protocol Overview
//!
//! 1. *Request resolution*: the request link is parsed against the wallet's
//!    `authorization_endpoint`, the request object is fetched and its signature verified
//!    for the `x509_san_dns` client identifier scheme, see [`core::authorization_request`].
//! 2. *Presentation definition*: the first input descriptor names the document type and
//!    namespace, and the fields the verifier intends to retain, see
//!    [`holder::items_request`].
//! 3. *Consent*: the selected data elements are encoded into a device response by a
//!    [`DocumentEncoder`], or an `access_denied` error is prepared when the holder declines.
//! 4. *Dispatch*: the response is posted to the verifier's `response_uri`, see
//!    [`core::response`].
//!
//! The network and cryptographic collaborators are traits so that hosts can provide their
//! own: [`AuthorizationEngine`], [`DocumentEncoder`], [`ChainVerifier`] and
//! [`AsyncHttpClient`].
//!
//! [`Session`]: crate::holder::Session
//! [`DocumentEncoder`]: crate::holder::consent::DocumentEncoder
//! [`AuthorizationEngine`]: crate::holder::engine::AuthorizationEngine
//! [`ChainVerifier`]: crate::holder::trust::ChainVerifier
//! [`AsyncHttpClient`]: crate::core::util::AsyncHttpClient

pub mod config;
pub mod core;
pub mod holder;
