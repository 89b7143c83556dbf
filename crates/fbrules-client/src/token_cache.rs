//! Access tokens for service account credentials.
//!
//! [`TokenCache`] keeps the last token issued by a [`TokenSource`] and hands
//! it out until it gets within [`TOKEN_REFRESH_MARGIN`] of expiry. Concurrent
//! callers that find the token stale wait on a single refresh. If the refresh
//! fails while the old token has not expired yet, the old token is used.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gcp_auth::TokenProvider;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::credential::Credential;
use crate::error::TransportError;

/// Refresh the token this long before it expires.
pub const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// OAuth scopes required by the Firebase Rules and Realtime Database APIs.
pub const FIREBASE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/firebase.database",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// An access token and the instant it stops being accepted.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(TOKEN_REFRESH_MARGIN) {
            Ok(margin) => now + margin < self.expires_at,
            Err(_) => false,
        }
    }

    fn is_unexpired(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Issues access tokens carrying [`FIREBASE_SCOPES`].
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn issue_token(&self) -> Result<IssuedToken, TransportError>;
}

/// Token source backed by a `gcp_auth` provider.
pub struct GcpTokenSource {
    provider: Arc<dyn TokenProvider>,
}

impl GcpTokenSource {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TokenSource for GcpTokenSource {
    async fn issue_token(&self) -> Result<IssuedToken, TransportError> {
        let token = self
            .provider
            .token(FIREBASE_SCOPES)
            .await
            .map_err(|e| TransportError::auth(format!("Failed to obtain access token: {}", e)))?;
        Ok(IssuedToken {
            access_token: token.as_str().to_string(),
            expires_at: token.expires_at(),
        })
    }
}

/// Caches the token of one [`TokenSource`].
pub struct TokenCache {
    source: Arc<dyn TokenSource>,
    current: RwLock<Option<IssuedToken>>,
}

impl TokenCache {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            current: RwLock::new(None),
        }
    }

    /// Cache for a `gcp_auth` provider.
    pub fn for_provider(provider: Arc<dyn TokenProvider>) -> Self {
        Self::new(Arc::new(GcpTokenSource::new(provider)))
    }

    /// A token that is not within the refresh margin of expiry.
    pub async fn get_token(&self) -> Result<String, TransportError> {
        if let Some(token) = self.current.read().await.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.access_token.clone());
            }
        }

        let mut current = self.current.write().await;

        // Refreshed by another caller while we waited for the write lock.
        if let Some(token) = current.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.access_token.clone());
            }
        }

        match self.source.issue_token().await {
            Ok(token) => {
                debug!(expires_at = %token.expires_at, "Issued rules access token");
                let access_token = token.access_token.clone();
                *current = Some(token);
                Ok(access_token)
            }
            Err(e) => match current.as_ref() {
                Some(token) if token.is_unexpired(Utc::now()) => {
                    warn!(
                        expires_at = %token.expires_at,
                        "Token refresh failed, reusing unexpired token: {}",
                        e
                    );
                    Ok(token.access_token.clone())
                }
                _ => Err(e),
            },
        }
    }
}

#[async_trait]
impl Credential for TokenCache {
    async fn access_token(&self) -> Result<String, TransportError> {
        self.get_token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Hands out scripted results, counting how often it was asked.
    struct ScriptedSource {
        results: Mutex<VecDeque<Result<IssuedToken, String>>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedSource {
        fn new(results: Vec<Result<IssuedToken, String>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenSource for ScriptedSource {
        async fn issue_token(&self) -> Result<IssuedToken, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("no more tokens".to_string()))
                .map_err(TransportError::auth)
        }
    }

    fn token(value: &str, expires_in_secs: i64) -> Result<IssuedToken, String> {
        Ok(IssuedToken {
            access_token: value.to_string(),
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in_secs),
        })
    }

    #[tokio::test]
    async fn test_fresh_token_is_reused() {
        let source = ScriptedSource::new(vec![token("t1", 3600)]);
        let cache = TokenCache::new(source.clone());

        assert_eq!(cache.get_token().await.unwrap(), "t1");
        assert_eq!(cache.get_token().await.unwrap(), "t1");
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_token_inside_margin_is_refreshed() {
        let source = ScriptedSource::new(vec![token("t1", 30), token("t2", 3600)]);
        let cache = TokenCache::new(source.clone());

        assert_eq!(cache.get_token().await.unwrap(), "t1");
        assert_eq!(cache.get_token().await.unwrap(), "t2");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_reuses_unexpired_token() {
        let source = ScriptedSource::new(vec![token("t1", 30), Err("backend down".to_string())]);
        let cache = TokenCache::new(source.clone());

        assert_eq!(cache.get_token().await.unwrap(), "t1");
        assert_eq!(cache.get_token().await.unwrap(), "t1");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_without_usable_token() {
        let source = ScriptedSource::new(vec![token("t1", -5), Err("backend down".to_string())]);
        let cache = TokenCache::new(source.clone());

        // An already expired token is returned once but never reused.
        assert_eq!(cache.get_token().await.unwrap(), "t1");
        let err = cache.get_token().await.unwrap_err();
        assert!(matches!(err, TransportError::Auth(ref msg) if msg == "backend down"));
        assert_eq!(err.to_string(), "Authentication failed: backend down");
    }

    #[tokio::test]
    async fn test_first_fetch_failure_is_auth_error() {
        let cache = TokenCache::new(ScriptedSource::new(vec![Err("no key".to_string())]));
        assert!(matches!(
            cache.access_token().await,
            Err(TransportError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let source = Arc::new(ScriptedSource {
            results: Mutex::new(vec![token("t1", 3600)].into()),
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(20),
        });
        let cache = TokenCache::new(source.clone());

        let (a, b, c) = tokio::join!(cache.get_token(), cache.get_token(), cache.get_token());
        assert_eq!(a.unwrap(), "t1");
        assert_eq!(b.unwrap(), "t1");
        assert_eq!(c.unwrap(), "t1");
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_freshness_window() {
        let now = Utc::now();
        let issued = IssuedToken {
            access_token: "t".to_string(),
            expires_at: now + chrono::Duration::seconds(30),
        };
        assert!(!issued.is_fresh(now));
        assert!(issued.is_unexpired(now));
        assert!(!issued.is_unexpired(now + chrono::Duration::seconds(31)));
    }

    #[test]
    fn test_firebase_scopes() {
        assert!(FIREBASE_SCOPES.iter().any(|s| s.ends_with("cloud-platform")));
        assert!(FIREBASE_SCOPES.iter().any(|s| s.ends_with("firebase.database")));
    }
}
