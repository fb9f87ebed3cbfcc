// ── Core error types ──
//
// User-facing errors from tuyashadow-core. Consumers never see HTTP
// statuses or envelope parsing directly; the `From<tuyashadow_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the Tuya cloud at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Per-device errors ────────────────────────────────────────────
    #[error("Fetching device {device_id} failed: {reason}")]
    Fetch { device_id: String, reason: String },

    #[error("Device not tracked: {device_id}")]
    DeviceNotFound { device_id: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Platform error code (e.g. 1010 for an invalid token).
        code: Option<i64>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Attribute an API failure to the device it was fetched for.
    ///
    /// Credential rejections stay authentication failures, since they are
    /// not specific to the device; everything else becomes [`CoreError::Fetch`].
    pub fn for_device(device_id: &str, err: tuyashadow_api::Error) -> Self {
        match err {
            tuyashadow_api::Error::Authentication { .. } => err.into(),
            other => CoreError::Fetch {
                device_id: device_id.to_owned(),
                reason: other.to_string(),
            },
        }
    }

    /// Returns `true` if re-checking credentials is the likely fix.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tuyashadow_api::Error> for CoreError {
    fn from(err: tuyashadow_api::Error) -> Self {
        match err {
            tuyashadow_api::Error::Authentication { message, code, .. } => {
                CoreError::AuthenticationFailed {
                    message: match code {
                        Some(code) => format!("{message} [platform code {code}]"),
                        None => message,
                    },
                }
            }
            tuyashadow_api::Error::Shadow {
                device_id, message, ..
            } => CoreError::Fetch {
                device_id,
                reason: message,
            },
            tuyashadow_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                    }
                }
            }
            tuyashadow_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            tuyashadow_api::Error::Timeout { timeout_ms } => CoreError::Timeout {
                timeout_secs: timeout_ms.div_ceil(1000),
            },
            tuyashadow_api::Error::InvalidHeader { name, reason } => CoreError::Config {
                message: format!("credential not usable as header {name}: {reason}"),
            },
            tuyashadow_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
        }
    }
}
