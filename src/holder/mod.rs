//! Holder side of an OpenID4VP mdoc presentment.

pub mod consent;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod items_request;
pub mod session;
pub mod trust;

pub use error::PresentmentError;
pub use session::{Session, SessionBuilder, Status, WalletParameters};
