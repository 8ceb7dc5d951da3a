//! Authentication state derived from the cached token
//!
//! # Token validity
//! ```text
//! Absent → (login) → Present → (decode) → Valid | Invalid
//! Invalid → (forced removal) → Absent
//! ```
//! There is no way back from `Invalid` short of a new login. The session is
//! never stored on its own; every check recomputes it from the token.
//!
//! A token is only evicted if it is still the one that was evaluated, so a
//! login landing mid-check keeps its fresh token.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::auth::cache::TokenCache;
use crate::auth::claims::Claims;
use crate::auth::decoder::TokenDecoder;

/// Read-time projection of the cached token
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub is_authenticated: bool,
    pub user: Option<Claims>,
}

enum TokenState {
    Absent,
    Valid { claims: Claims, token: String },
    Invalid { token: String, reason: String },
}

/// Computes and caches the session for route guards and interceptors
pub struct AuthSessionManager {
    cache: Arc<dyn TokenCache>,
    decoder: Arc<dyn TokenDecoder>,
    session: RwLock<Session>,
}

impl AuthSessionManager {
    pub fn new(cache: Arc<dyn TokenCache>, decoder: Arc<dyn TokenDecoder>) -> Self {
        Self {
            cache,
            decoder,
            session: RwLock::new(Session::default()),
        }
    }

    /// Re-derive the session from the cache.
    ///
    /// A bad or expired token is removed from the cache on the spot.
    pub async fn refresh_from_cache(&self) {
        let authenticated = self.sync().await;
        tracing::debug!(authenticated, "Session refreshed from cache");
    }

    /// Whether the cached token is present, decodable and unexpired.
    ///
    /// Same transitions as [`refresh_from_cache`](Self::refresh_from_cache);
    /// decode failures are reported as `false`, never as errors.
    pub async fn check_authenticated(&self) -> bool {
        self.sync().await
    }

    /// Snapshot of the last computed session
    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    async fn sync(&self) -> bool {
        match self.evaluate().await {
            TokenState::Absent => {
                *self.session.write().await = Session::default();
                false
            }
            TokenState::Invalid { token, reason } => {
                if self.cache.remove_token_if(&token).await {
                    tracing::info!(reason = %reason, "Discarded cached token");
                } else {
                    tracing::debug!(reason = %reason, "Cached token replaced during check, keeping it");
                }
                *self.session.write().await = Session::default();
                false
            }
            TokenState::Valid { claims, token } => {
                self.cache.set_current_user(claims.clone(), token).await;
                *self.session.write().await = Session {
                    is_authenticated: true,
                    user: Some(claims),
                };
                true
            }
        }
    }

    async fn evaluate(&self) -> TokenState {
        let Some(token) = self.cache.get_token().await else {
            return TokenState::Absent;
        };

        let claims = match self.decoder.decode(&token) {
            Ok(claims) => claims,
            Err(e) => {
                return TokenState::Invalid {
                    token,
                    reason: e.to_string(),
                }
            }
        };

        if self.decoder.is_expired(&token) {
            return TokenState::Invalid {
                token,
                reason: "token expired".to_string(),
            };
        }

        TokenState::Valid { claims, token }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::cache::MemoryTokenCache;
    use crate::error::DecodeError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Cache that answers `get_token` from a script and counts mutations
    #[derive(Default)]
    struct CountingCache {
        tokens: Mutex<VecDeque<Option<String>>>,
        removes: AtomicUsize,
        sets: AtomicUsize,
    }

    impl CountingCache {
        fn serving(tokens: &[Option<&str>]) -> Arc<Self> {
            Arc::new(Self {
                tokens: Mutex::new(tokens.iter().map(|t| t.map(str::to_string)).collect()),
                ..Default::default()
            })
        }

        fn removes(&self) -> usize {
            self.removes.load(Ordering::SeqCst)
        }

        fn sets(&self) -> usize {
            self.sets.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenCache for CountingCache {
        async fn get_token(&self) -> Option<String> {
            let mut tokens = self.tokens.lock().unwrap();
            if tokens.len() > 1 {
                tokens.pop_front().flatten()
            } else {
                tokens.front().cloned().flatten()
            }
        }

        async fn set_current_user(&self, _claims: Claims, _token: String) {
            self.sets.fetch_add(1, Ordering::SeqCst);
        }

        async fn remove_token(&self) {
            self.removes.fetch_add(1, Ordering::SeqCst);
        }

        async fn current_user(&self) -> Option<Claims> {
            None
        }
    }

    /// Decoder driven by token prefixes: `ok-`, `old-`, anything else fails
    struct PrefixDecoder;

    impl TokenDecoder for PrefixDecoder {
        fn decode(&self, token: &str) -> Result<Claims, DecodeError> {
            if token.starts_with("ok-") || token.starts_with("old-") {
                Ok(Claims::from_value(json!({"sub": token})).unwrap())
            } else {
                Err(DecodeError::Malformed)
            }
        }

        fn is_expired(&self, token: &str) -> bool {
            token.starts_with("old-")
        }
    }

    fn manager(cache: Arc<MemoryTokenCache>) -> AuthSessionManager {
        AuthSessionManager::new(cache, Arc::new(PrefixDecoder))
    }

    #[tokio::test]
    async fn test_valid_token_authenticates() {
        let cache = Arc::new(MemoryTokenCache::with_token("ok-1"));
        let manager = manager(cache.clone());

        assert!(manager.check_authenticated().await);
        assert_eq!(cache.get_token().await.as_deref(), Some("ok-1"));

        let session = manager.session().await;
        assert!(session.is_authenticated);
        assert_eq!(session.user.unwrap().subject(), Some("ok-1"));
        assert_eq!(cache.current_user().await.unwrap().subject(), Some("ok-1"));
    }

    #[tokio::test]
    async fn test_expired_token_is_removed() {
        let cache = Arc::new(MemoryTokenCache::with_token("old-1"));
        let manager = manager(cache.clone());

        assert!(!manager.check_authenticated().await);
        assert_eq!(cache.get_token().await, None);
        assert_eq!(manager.session().await, Session::default());
    }

    #[tokio::test]
    async fn test_undecodable_token_is_removed() {
        let cache = Arc::new(MemoryTokenCache::with_token("garbage"));
        let manager = manager(cache.clone());

        manager.refresh_from_cache().await;
        assert_eq!(cache.get_token().await, None);
        assert!(!manager.session().await.is_authenticated);
    }

    #[tokio::test]
    async fn test_logout_resets_session() {
        let cache = Arc::new(MemoryTokenCache::with_token("ok-2"));
        let manager = manager(cache.clone());
        manager.refresh_from_cache().await;
        assert!(manager.session().await.is_authenticated);

        cache.remove_token().await;
        manager.refresh_from_cache().await;
        assert_eq!(manager.session().await, Session::default());
    }

    #[tokio::test]
    async fn test_absent_token_leaves_cache_alone() {
        let cache = CountingCache::serving(&[None]);
        let manager = AuthSessionManager::new(cache.clone(), Arc::new(PrefixDecoder));

        assert!(!manager.check_authenticated().await);
        manager.refresh_from_cache().await;

        assert_eq!(cache.removes(), 0);
        assert_eq!(cache.sets(), 0);
    }

    #[tokio::test]
    async fn test_valid_token_is_never_removed() {
        let cache = CountingCache::serving(&[Some("ok-3")]);
        let manager = AuthSessionManager::new(cache.clone(), Arc::new(PrefixDecoder));

        assert!(manager.check_authenticated().await);

        assert_eq!(cache.removes(), 0);
        assert_eq!(cache.sets(), 1);
    }

    #[tokio::test]
    async fn test_expired_and_malformed_tokens_removed_once() {
        for token in ["old-4", "garbage"] {
            let cache = CountingCache::serving(&[Some(token)]);
            let manager = AuthSessionManager::new(cache.clone(), Arc::new(PrefixDecoder));

            assert!(!manager.check_authenticated().await);

            assert_eq!(cache.removes(), 1, "token {}", token);
            assert_eq!(cache.sets(), 0, "token {}", token);
        }
    }

    #[tokio::test]
    async fn test_login_during_check_keeps_fresh_token() {
        // the expired token is read for evaluation, a login lands before removal
        let cache = CountingCache::serving(&[Some("old-5"), Some("ok-6")]);
        let manager = AuthSessionManager::new(cache.clone(), Arc::new(PrefixDecoder));

        assert!(!manager.check_authenticated().await);
        assert_eq!(cache.removes(), 0);

        assert!(manager.check_authenticated().await);
        assert_eq!(cache.sets(), 1);
    }
}
