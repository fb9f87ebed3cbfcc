// Access token lifecycle
//
// `GET /v1.0/token?grant_type=1` is signed with the client secret alone.
// The resulting bearer token is cached behind an async mutex and reused
// until it is within one minute of expiry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::auth::Clock;
use crate::client::{TuyaClient, unwrap_envelope};
use crate::error::Error;
use crate::models::TokenResult;
use crate::signing::SignatureRequest;

/// A cached token is only handed out while `now < expires_at - margin`.
pub const REFRESH_MARGIN_MS: i64 = 60_000;

/// Lifetime assumed when the platform omits `expire_time` (seconds).
pub const DEFAULT_EXPIRE_SECS: i64 = 7_200;

pub(crate) const TOKEN_PATH: &str = "/v1.0/token";

/// A bearer token and the instant (epoch ms) it stops being valid.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: i64,
    pub refresh_token: Option<String>,
    pub uid: Option<String>,
}

impl AccessToken {
    /// Whether the token may still be used at `now` (epoch ms).
    ///
    /// Exactly `expires_at - REFRESH_MARGIN_MS` already counts as stale.
    pub fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_at - REFRESH_MARGIN_MS
    }

    fn from_result(result: TokenResult, issued_at: i64) -> Result<Self, String> {
        let secs = result.expire_time.unwrap_or(DEFAULT_EXPIRE_SECS);
        if secs <= 0 {
            return Err(format!("non-positive expire_time {secs}"));
        }
        if result.access_token.is_empty() {
            return Err("empty access_token".into());
        }
        Ok(Self {
            token: result.access_token,
            expires_at: issued_at.saturating_add(secs.saturating_mul(1_000)),
            refresh_token: result.refresh_token,
            uid: result.uid,
        })
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("uid", &self.uid)
            .finish_non_exhaustive()
    }
}

/// Owns the cached [`AccessToken`].
///
/// The mutex is held across a refresh, so callers racing on a stale token
/// wait for one fetch instead of each issuing their own. The cached value
/// is only ever replaced whole.
pub struct TokenManager {
    cache: Mutex<Option<AccessToken>>,
    clock: Arc<dyn Clock>,
}

impl TokenManager {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: Mutex::new(None),
            clock,
        }
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Return the cached token if fresh, otherwise run `refresh` with the
    /// current time and cache what it returns.
    ///
    /// A failed refresh leaves the previous value untouched.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<AccessToken, Error>
    where
        F: FnOnce(i64) -> Fut,
        Fut: Future<Output = Result<AccessToken, Error>>,
    {
        let mut guard = self.cache.lock().await;
        let now = self.clock.now_millis();

        if let Some(token) = guard.as_ref() {
            if token.is_fresh(now) {
                debug!(expires_at = token.expires_at, "using cached access token");
                return Ok(token.clone());
            }
            debug!(expires_at = token.expires_at, now, "access token stale, refreshing");
        }

        let fresh = refresh(now).await?;
        *guard = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drop the cached token so the next caller fetches a new one.
    pub async fn invalidate(&self) {
        if self.cache.lock().await.take().is_some() {
            debug!("access token invalidated");
        }
    }

    /// The cached token, fresh or not.
    pub async fn current(&self) -> Option<AccessToken> {
        self.cache.lock().await.clone()
    }
}

impl TuyaClient {
    /// A valid access token, fetching a new one if the cache is empty or
    /// within [`REFRESH_MARGIN_MS`] of expiry.
    pub async fn access_token(&self) -> Result<String, Error> {
        self.tokens()
            .get_or_refresh(|now| self.request_token(now))
            .await
            .map(|t| t.token)
    }

    async fn request_token(&self, now: i64) -> Result<AccessToken, Error> {
        let request = SignatureRequest::get(TOKEN_PATH).query("grant_type", 1);
        let (status, body) = self.signed_get(&request, None).await?;

        let rejected = |message: String, code: Option<i64>| Error::Authentication {
            message,
            code,
            body: body.clone(),
        };

        let result = unwrap_envelope::<TokenResult>(status, &body)
            .map_err(|r| rejected(r.message, r.code))?;
        let token = AccessToken::from_result(result, now).map_err(|m| rejected(m, None))?;

        info!(expires_at = token.expires_at, "obtained access token");
        Ok(token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    use super::*;

    struct FixedClock(AtomicI64);

    impl Clock for FixedClock {
        fn now_millis(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn token(expires_at: i64) -> AccessToken {
        AccessToken {
            token: format!("tok-{expires_at}"),
            expires_at,
            refresh_token: None,
            uid: None,
        }
    }

    #[test]
    fn freshness_boundary_is_exclusive() {
        let t = token(1_000_000);
        assert!(t.is_fresh(1_000_000 - REFRESH_MARGIN_MS - 1));
        assert!(!t.is_fresh(1_000_000 - REFRESH_MARGIN_MS));
        assert!(!t.is_fresh(1_000_000));
    }

    #[test]
    fn expiry_defaults_to_two_hours() {
        let result = TokenResult {
            access_token: "T1".into(),
            expire_time: None,
            refresh_token: None,
            uid: None,
        };
        let t = AccessToken::from_result(result, 5_000).unwrap();
        assert_eq!(t.expires_at, 5_000 + 7_200_000);
    }

    #[test]
    fn non_positive_expiry_is_rejected() {
        let result = TokenResult {
            access_token: "T1".into(),
            expire_time: Some(0),
            refresh_token: None,
            uid: None,
        };
        assert!(AccessToken::from_result(result, 5_000).is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let t = token(42);
        assert!(!format!("{t:?}").contains("tok-42"));
    }

    #[tokio::test]
    async fn refreshes_only_when_stale() {
        let clock = Arc::new(FixedClock(AtomicI64::new(0)));
        let manager = TokenManager::new(clock.clone());
        let calls = AtomicUsize::new(0);

        let refresh = |now: i64| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(token(now + 120_000)) }
        };

        manager.get_or_refresh(refresh).await.unwrap();
        clock.0.store(59_999, Ordering::SeqCst);
        manager.get_or_refresh(refresh).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.0.store(60_000, Ordering::SeqCst);
        let refreshed = manager.get_or_refresh(refresh).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshed.expires_at, 180_000);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_token() {
        let clock = Arc::new(FixedClock(AtomicI64::new(0)));
        let manager = TokenManager::new(clock.clone());

        manager
            .get_or_refresh(|now| async move { Ok(token(now + 61_000)) })
            .await
            .unwrap();
        clock.0.store(1_000, Ordering::SeqCst);

        let err = manager
            .get_or_refresh(|_| async {
                Err(Error::Authentication {
                    message: "sign invalid".into(),
                    code: Some(1004),
                    body: String::new(),
                })
            })
            .await
            .unwrap_err();
        assert!(err.is_auth());
        assert_eq!(manager.current().await, Some(token(61_000)));

        manager.invalidate().await;
        assert_eq!(manager.current().await, None);
    }
}
