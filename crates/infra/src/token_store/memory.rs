//! In-memory token store
//!
//! Process-local [`TokenStore`] for tests and short-lived tools where
//! keychain durability is not wanted.

use async_trait::async_trait;
use courier_core::ports::TokenStore;
use courier_domain::{Result, TokenState};
use tokio::sync::RwLock;

/// Token store holding the state in memory only.
#[derive(Default)]
pub struct MemoryTokenStore {
    state: RwLock<Option<TokenState>>,
}

impl MemoryTokenStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with the given state.
    #[must_use]
    pub fn with_state(state: TokenState) -> Self {
        Self { state: RwLock::new(Some(state)) }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<TokenState>> {
        Ok(self.state.read().await.clone())
    }

    async fn store(&self, state: &TokenState) -> Result<()> {
        *self.state.write().await = Some(state.clone());
        Ok(())
    }

    async fn reset_access_token(&self) -> Result<()> {
        if let Some(state) = self.state.write().await.as_mut() {
            state.reset_access_token();
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.state.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_and_load_round_trip() {
        let store = MemoryTokenStore::new();
        assert!(store.load().await.unwrap().is_none());

        let state = TokenState::new("access", Some("refresh".to_string()), 3600);
        store.store(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn reset_clears_only_the_access_token() {
        let store =
            MemoryTokenStore::with_state(TokenState::new("access", Some("refresh".into()), 3600));
        store.reset_access_token().await.unwrap();

        let state = store.load().await.unwrap().unwrap();
        assert!(state.access_token.is_empty());
        assert_eq!(state.refresh_token.as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn clear_removes_the_state() {
        let store = MemoryTokenStore::with_state(TokenState::new("access", None, 3600));
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
