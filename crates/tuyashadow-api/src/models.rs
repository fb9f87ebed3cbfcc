// Tuya OpenAPI response types
//
// Every endpoint wraps its payload in the same envelope. Fields use
// `#[serde(default)]` liberally because failure envelopes omit `result`
// and shadow properties carry optional metadata.

use serde::{Deserialize, Serialize};

/// Platform code reported when the access token is no longer accepted.
pub const TOKEN_INVALID_CODE: i64 = 1010;

// ── Response Envelope ────────────────────────────────────────────────

/// Standard Tuya OpenAPI response envelope.
///
/// ```json
/// { "success": true, "result": { ... }, "t": 1700000000000 }
/// { "success": false, "code": 1010, "msg": "token invalid", "t": 1700000000000 }
/// ```
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
    /// Server timestamp (epoch ms).
    #[serde(default)]
    pub t: Option<i64>,
}

impl<T> ApiResponse<T> {
    /// Human-readable reason for a failed envelope.
    pub fn failure_message(&self) -> String {
        match (&self.msg, self.code) {
            (Some(msg), Some(code)) => format!("{msg} (code {code})"),
            (Some(msg), None) => msg.clone(),
            (None, Some(code)) => format!("code {code}"),
            (None, None) if self.success => "response has no result".into(),
            (None, None) => "request was not successful".into(),
        }
    }
}

// ── Token ────────────────────────────────────────────────────────────

/// `result` of `GET /v1.0/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResult {
    pub access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expire_time: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
}

// ── Shadow ───────────────────────────────────────────────────────────

/// `result` of `GET /v2.0/cloud/thing/{id}/shadow/properties`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShadowResult {
    pub properties: Vec<ShadowProperty>,
}

/// One reported property. `value` is whatever JSON the device reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowProperty {
    pub code: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub dp_id: Option<u32>,
    /// Report time (epoch ms).
    #[serde(default)]
    pub time: Option<i64>,
    /// Data point type as declared by the product (`value`, `bool`, `enum`, ...).
    #[serde(default, rename = "type")]
    pub dp_type: Option<String>,
    #[serde(default)]
    pub custom_name: Option<String>,
}
