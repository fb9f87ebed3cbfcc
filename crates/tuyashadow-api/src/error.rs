use thiserror::Error;

/// Top-level error type for the `tuyashadow-api` crate.
///
/// Token endpoint failures surface as [`Error::Authentication`]; everything
/// that goes wrong while reading a device shadow (platform rejection,
/// transport failure, timeout, malformed payload) is a fetch failure for
/// that device. `tuyashadow-core` maps these into per-device diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The token endpoint rejected the credentials or returned a payload
    /// without the expected fields.
    #[error("Authentication failed: {message}")]
    Authentication {
        message: String,
        /// Platform error code (`code` in the envelope), if any.
        code: Option<i64>,
        /// Raw response body, kept for diagnostics.
        body: String,
    },

    // ── Shadow ──────────────────────────────────────────────────────
    /// The shadow endpoint rejected the request or returned a payload
    /// without `result.properties`.
    #[error("Shadow request for device {device_id} failed: {message}")]
    Shadow {
        device_id: String,
        message: String,
        code: Option<i64>,
        body: String,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// A credential or signed value cannot be sent as an HTTP header.
    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// TLS setup error (unreadable or invalid CA certificate).
    #[error("TLS error: {0}")]
    Tls(String),
}

impl Error {
    /// Returns `true` if this error came from the token endpoint.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if the platform reported the access token as invalid.
    pub fn is_token_invalid(&self) -> bool {
        matches!(
            self,
            Self::Shadow {
                code: Some(crate::models::TOKEN_INVALID_CODE),
                ..
            }
        )
    }

    /// Returns `true` if this is a transient error that the next poll
    /// may not hit again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// The raw response body attached to this error, if any.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            Self::Authentication { body, .. } | Self::Shadow { body, .. } => Some(body),
            _ => None,
        }
    }
}
