// Tuya OpenAPI HTTP client
//
// Wraps `reqwest::Client` with request signing and envelope unwrapping.
// Endpoint operations (token, shadow) are inherent methods implemented
// in their own modules; this one only deals with transport mechanics.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use secrecy::ExposeSecret;
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

use crate::auth::{Clock, Credentials, system_clock};
use crate::error::Error;
use crate::models::ApiResponse;
use crate::signing::{self, SIGN_METHOD, SignatureRequest};
use crate::token::TokenManager;
use crate::transport::TransportConfig;

/// Signed HTTP client for the Tuya cloud.
///
/// Holds the project credentials, the shared `reqwest::Client`, and the
/// token cache. Cheap to share behind an `Arc`; all methods take `&self`.
pub struct TuyaClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    tokens: TokenManager,
    timeout: Duration,
}

impl TuyaClient {
    /// Create a client for the region's public endpoint.
    pub fn new(credentials: Credentials, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = credentials.base_url()?;
        Self::with_base_url(credentials, base_url, transport)
    }

    /// Create a client against an explicit endpoint (regional data
    /// centres such as `https://openapi-ueaz.tuyaus.com`).
    pub fn with_base_url(
        credentials: Credentials,
        base_url: Url,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            credentials,
            tokens: TokenManager::new(system_clock()),
            timeout: transport.timeout,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`. `timeout` is
    /// the bound `http` was built with; it is only reported in errors.
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            credentials,
            tokens: TokenManager::new(system_clock()),
            timeout,
        })
    }

    /// Replace the clock used for token freshness and request timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.tokens = TokenManager::new(clock);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Sign and send a GET, returning the status and raw body.
    ///
    /// Without `access_token` the request is signed as a token request
    /// (`clientId + t + nonce + stringToSign`); with one, as a business
    /// request (`clientId + accessToken + t + nonce + stringToSign`).
    pub(crate) async fn signed_get(
        &self,
        request: &SignatureRequest,
        access_token: Option<&str>,
    ) -> Result<(StatusCode, String), Error> {
        let url = self.base_url.join(&request.canonical_url())?;
        let headers = self.sign_headers(request, access_token)?;

        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        trace!(%status, body = %body, "response");

        Ok((status, body))
    }

    fn sign_headers(
        &self,
        request: &SignatureRequest,
        access_token: Option<&str>,
    ) -> Result<HeaderMap, Error> {
        let client_id = self.credentials.client_id.as_str();
        let nonce = Uuid::new_v4().simple().to_string();
        let t = self.tokens.now_millis();
        let string_to_sign = request.string_to_sign();

        let payload = match access_token {
            Some(token) => signing::business_payload(client_id, token, t, &nonce, &string_to_sign),
            None => signing::token_payload(client_id, t, &nonce, &string_to_sign),
        };
        let sign = signing::hmac_sign(self.credentials.client_secret.expose_secret(), &payload);

        let mut pairs: Vec<(HeaderName, String)> = vec![(
            HeaderName::from_static("client_id"),
            client_id.to_owned(),
        )];
        if let Some(token) = access_token {
            pairs.push((HeaderName::from_static("access_token"), token.to_owned()));
        }
        pairs.push((HeaderName::from_static("t"), t.to_string()));
        pairs.push((HeaderName::from_static("sign_method"), SIGN_METHOD.to_owned()));
        pairs.push((HeaderName::from_static("nonce"), nonce));
        pairs.push((HeaderName::from_static("sign"), sign));
        if access_token.is_none() {
            pairs.push((HeaderName::from_static("mode"), "cors".to_owned()));
        }
        if !request.headers.is_empty() {
            let names = request.headers.keys().map(String::as_str).collect::<Vec<_>>();
            pairs.push((
                HeaderName::from_static("signature-headers"),
                names.join(":"),
            ));
        }
        for (key, value) in &request.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| Error::InvalidHeader {
                name: key.clone(),
                reason: e.to_string(),
            })?;
            pairs.push((name, value.clone()));
        }

        let mut headers = HeaderMap::with_capacity(pairs.len());
        for (name, value) in pairs {
            let value = HeaderValue::from_str(&value).map_err(|e| Error::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            Error::Transport(err)
        }
    }
}

/// Why an envelope did not yield a usable `result`.
#[derive(Debug)]
pub(crate) struct Rejection {
    pub message: String,
    pub code: Option<i64>,
}

/// Parse the `{success, result, code, msg}` envelope and decode `result`.
///
/// Non-JSON bodies, `success: false`, a missing `result`, and a `result`
/// lacking required fields are all rejections; the caller decides which
/// error variant that becomes.
pub(crate) fn unwrap_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<T, Rejection> {
    let envelope: ApiResponse<serde_json::Value> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            return Err(Rejection {
                message: format!("HTTP {status}"),
                code: None,
            });
        }
        Err(e) => {
            let preview: String = body.chars().take(200).collect();
            return Err(Rejection {
                message: format!("invalid JSON: {e} (body preview: {preview:?})"),
                code: None,
            });
        }
    };

    let code = envelope.code;
    if !envelope.success {
        return Err(Rejection {
            message: envelope.failure_message(),
            code,
        });
    }
    let Some(result) = envelope.result else {
        return Err(Rejection {
            message: "response has no result".into(),
            code,
        });
    };

    serde_json::from_value(result).map_err(|e| Rejection {
        message: format!("malformed result: {e}"),
        code,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> TuyaClient {
        TuyaClient::from_reqwest(
            "https://openapi.tuyaeu.com",
            reqwest::Client::new(),
            Credentials::new("cid", "secret", "eu"),
            Duration::from_secs(10),
        )
        .unwrap()
    }

    #[test]
    fn custom_headers_are_declared_in_order() {
        let request = SignatureRequest::get("/v1.0/devices")
            .header("area_id", "29a33e8796834b1efa6")
            .header("call_id", "8afdb70ab2ed11eb85290242ac130003");
        let headers = client().sign_headers(&request, Some("T1")).unwrap();

        assert_eq!(headers["signature-headers"], "area_id:call_id");
        assert_eq!(headers["area_id"], "29a33e8796834b1efa6");
        assert_eq!(headers["call_id"], "8afdb70ab2ed11eb85290242ac130003");
    }

    #[test]
    fn plain_requests_declare_no_signature_headers() {
        let request = SignatureRequest::get("/v1.0/token").query("grant_type", 1);
        let headers = client().sign_headers(&request, None).unwrap();

        assert!(headers.get("signature-headers").is_none());
        assert_eq!(headers["mode"], "cors");
    }
}
