use std::sync::Arc;

use secrecy::SecretString;
use url::Url;

use crate::error::Error;

/// Project credentials for the Tuya cloud (IoT Platform > Cloud > Project).
///
/// Immutable for the lifetime of a client. The region selects the
/// data centre host: `eu` → `https://openapi.tuyaeu.com`.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub region: String,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            region: region.into(),
        }
    }

    /// Base endpoint derived from the region.
    pub fn base_url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&format!("https://openapi.tuya{}.com", self.region))?)
    }
}

/// Source of "now" in epoch milliseconds.
///
/// The token cache decides freshness against this clock, so tests can
/// pin it to the expiry boundary.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

pub(crate) fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}
