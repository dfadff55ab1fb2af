//! System-keychain token store
//!
//! Persists the serialized [`TokenState`] as a single keychain credential so
//! tokens survive process restarts without touching the filesystem. Keychain
//! access is blocking; every call goes through `spawn_blocking`.

use async_trait::async_trait;
use courier_core::ports::TokenStore;
use courier_domain::{DataError, Result, TokenState};
use keyring::Entry;
use tokio::task;
use tracing::debug;

/// Token store backed by the operating system keychain.
pub struct KeyringTokenStore {
    service: String,
    account: String,
}

impl KeyringTokenStore {
    /// Store under the given keychain service and account names.
    #[must_use]
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self { service: service.into(), account: account.into() }
    }

    fn entry(service: &str, account: &str) -> Result<Entry> {
        Entry::new(service, account)
            .map_err(|err| DataError::Storage(format!("keychain entry: {err}")))
    }
}

#[async_trait]
impl TokenStore for KeyringTokenStore {
    async fn load(&self) -> Result<Option<TokenState>> {
        let (service, account) = (self.service.clone(), self.account.clone());
        task::spawn_blocking(move || {
            let entry = Self::entry(&service, &account)?;
            match entry.get_password() {
                Ok(json) => serde_json::from_str(&json)
                    .map(Some)
                    .map_err(|err| DataError::Storage(format!("stored state is corrupt: {err}"))),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(err) => Err(DataError::Storage(format!("keychain read: {err}"))),
            }
        })
        .await
        .map_err(|err| DataError::Storage(format!("keychain task failed: {err}")))?
    }

    async fn store(&self, state: &TokenState) -> Result<()> {
        let (service, account) = (self.service.clone(), self.account.clone());
        let json = serde_json::to_string(state)
            .map_err(|err| DataError::Storage(format!("state is not serializable: {err}")))?;
        task::spawn_blocking(move || {
            let entry = Self::entry(&service, &account)?;
            entry
                .set_password(&json)
                .map_err(|err| DataError::Storage(format!("keychain write: {err}")))
        })
        .await
        .map_err(|err| DataError::Storage(format!("keychain task failed: {err}")))??;
        debug!("token state persisted to keychain");
        Ok(())
    }

    async fn reset_access_token(&self) -> Result<()> {
        match self.load().await? {
            Some(mut state) => {
                state.reset_access_token();
                self.store(&state).await
            }
            None => Ok(()),
        }
    }

    async fn clear(&self) -> Result<()> {
        let (service, account) = (self.service.clone(), self.account.clone());
        task::spawn_blocking(move || {
            let entry = Self::entry(&service, &account)?;
            match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(err) => Err(DataError::Storage(format!("keychain delete: {err}"))),
            }
        })
        .await
        .map_err(|err| DataError::Storage(format!("keychain task failed: {err}")))?
    }
}
