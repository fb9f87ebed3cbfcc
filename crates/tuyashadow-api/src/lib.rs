// tuyashadow-api: Async Rust client for the Tuya OpenAPI device shadow
// endpoints, with request signing and access token caching.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod shadow;
pub mod signing;
pub mod token;
pub mod transport;

pub use auth::{Clock, Credentials, SystemClock};
pub use client::TuyaClient;
pub use error::Error;
pub use models::ShadowProperty;
pub use signing::{SignatureRequest, build_string_to_sign, canonical_url, hmac_sign};
pub use token::{AccessToken, REFRESH_MARGIN_MS, TokenManager};
pub use transport::{TlsMode, TransportConfig};
