// Tuya OpenAPI request signing
//
// Pure functions only: the string-to-sign, the two signing payload
// layouts, and the HMAC itself. Nothing here touches the clock, the
// network, or shared state.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use hmac::{Hmac, Mac};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Value of the `sign_method` header on every signed request.
pub const SIGN_METHOD: &str = "HMAC-SHA256";

/// Everything that feeds the canonical string-to-sign of one request.
///
/// Custom headers keep insertion order: the platform hashes them in the
/// order they are declared, so sorting them would break verification.
/// Query parameters are sorted by key when the canonical URL is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureRequest {
    pub method: String,
    pub body: String,
    pub headers: IndexMap<String, String>,
    pub path: String,
    pub query: BTreeMap<String, String>,
}

impl SignatureRequest {
    /// A bodiless `GET` for `path` with no custom headers.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: "GET".into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(key.into(), value.to_string());
        self
    }

    /// Append a custom header that participates in the signature.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// The path plus sorted query string, as signed and as requested.
    pub fn canonical_url(&self) -> String {
        canonical_url(&self.path, &self.query)
    }

    /// Canonical string-to-sign for this request.
    pub fn string_to_sign(&self) -> String {
        build_string_to_sign(
            &self.method,
            &self.body,
            &self.headers,
            &self.path,
            &self.query,
        )
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// `"<key>:<value>\n"` for every header, in insertion order.
pub fn headers_block(headers: &IndexMap<String, String>) -> String {
    headers.iter().fold(String::new(), |mut block, (k, v)| {
        let _ = writeln!(block, "{k}:{v}");
        block
    })
}

/// `path` unchanged when `query` is empty, otherwise `path?k=v&...`
/// with keys in ascending order.
pub fn canonical_url(path: &str, query: &BTreeMap<String, String>) -> String {
    if query.is_empty() {
        return path.to_owned();
    }
    let qs = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{qs}")
}

/// `METHOD\n<sha256(body)>\n<headers block>\n<canonical url>`.
pub fn build_string_to_sign(
    method: &str,
    body: &str,
    headers: &IndexMap<String, String>,
    path: &str,
    query: &BTreeMap<String, String>,
) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        method.to_uppercase(),
        sha256_hex(body.as_bytes()),
        headers_block(headers),
        canonical_url(path, query),
    )
}

/// Uppercase hex HMAC-SHA256 of `message` keyed with `secret`.
pub fn hmac_sign(secret: &str, message: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(message.as_bytes());
    hex::encode_upper(mac.finalize().into_bytes())
}

/// Payload signed on the token request: `clientId + t + nonce + stringToSign`.
pub fn token_payload(client_id: &str, t: i64, nonce: &str, string_to_sign: &str) -> String {
    format!("{client_id}{t}{nonce}{string_to_sign}")
}

/// Payload signed on token-bearing calls:
/// `clientId + accessToken + t + nonce + stringToSign`.
pub fn business_payload(
    client_id: &str,
    access_token: &str,
    t: i64,
    nonce: &str,
    string_to_sign: &str,
) -> String {
    format!("{client_id}{access_token}{t}{nonce}{string_to_sign}")
}
