//! Token cache seam and an in-memory implementation
//!
//! The cache is the only state shared between concurrent calls. Reads may
//! run concurrently; writes and removals are last-writer-wins.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::auth::claims::Claims;

/// Key-value storage for the current token and the user decoded from it
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// The current token, if one is stored
    async fn get_token(&self) -> Option<String>;

    /// Store the token together with the identity decoded from it
    async fn set_current_user(&self, claims: Claims, token: String);

    /// Drop the token and the identity derived from it
    async fn remove_token(&self);

    /// The identity stored alongside the token
    async fn current_user(&self) -> Option<Claims>;

    /// Remove the token only if it is still `expected`; returns whether it
    /// was removed.
    ///
    /// The default re-reads before removing, which leaves a window between
    /// the two calls. Implementations that can compare and remove under one
    /// lock should override it.
    async fn remove_token_if(&self, expected: &str) -> bool {
        if self.get_token().await.as_deref() != Some(expected) {
            return false;
        }
        self.remove_token().await;
        true
    }
}

#[derive(Debug, Default)]
struct CacheState {
    token: Option<String>,
    user: Option<Claims>,
}

/// Process-local `TokenCache`
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    state: RwLock<CacheState>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that already holds `token`, as after a login
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(CacheState {
                token: Some(token.into()),
                user: None,
            }),
        }
    }

    /// Store a token without an identity, as the login flow does before the
    /// first session check
    pub async fn set_token(&self, token: impl Into<String>) {
        let mut state = self.state.write().await;
        state.token = Some(token.into());
        state.user = None;
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn get_token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    async fn set_current_user(&self, claims: Claims, token: String) {
        let mut state = self.state.write().await;
        state.token = Some(token);
        state.user = Some(claims);
    }

    async fn remove_token(&self) {
        let mut state = self.state.write().await;
        state.token = None;
        state.user = None;
    }

    async fn current_user(&self) -> Option<Claims> {
        self.state.read().await.user.clone()
    }

    async fn remove_token_if(&self, expected: &str) -> bool {
        let mut state = self.state.write().await;
        if state.token.as_deref() != Some(expected) {
            return false;
        }
        state.token = None;
        state.user = None;
        true
    }
}
