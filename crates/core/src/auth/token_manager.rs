//! Token manager
//!
//! Manages the authentication token lifecycle:
//! - Loads persisted state from the durable token store on startup
//! - Serves the current bearer token to the request decorator
//! - Performs the refresh call and persists the new state
//! - Resets credentials when a refresh fails

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use courier_domain::{DataError, HeaderAware, Result, TokenState};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::decorator::{DeviceIdentity, RequestDecorator};
use crate::operation::remote::RemoteOperationBuilder;
use crate::ports::{BearerTokenSource, Method, TokenStore, Transport};

/// Fixed path of the token refresh endpoint.
pub const REFRESH_TOKEN_PATH: &str = "auth/refresh-token";

/// Response header carrying the new access token.
pub const HEADER_ACCESS_TOKEN: &str = "Access-Token";
/// Response header carrying the new refresh token.
pub const HEADER_REFRESH_TOKEN: &str = "Refresh-Token";
/// Response header carrying the new lifetime in seconds.
pub const HEADER_EXPIRES_IN: &str = "Expires-In";

const MSG_REFRESH_TOKEN_MISSING: &str = "could not find the refresh token";
const MSG_REFRESH_FAILED: &str = "refreshing the token failed";

/// Refresh call response; the whole payload arrives via response headers,
/// merged into the envelope body by the header-aware pipeline.
#[derive(Debug, Deserialize)]
pub struct TokenRefreshResponse {
    /// Response headers merged under `header_parameters`.
    pub header_parameters: HashMap<String, String>,
}

impl HeaderAware for TokenRefreshResponse {}

#[derive(Debug, Serialize)]
struct TokenRefreshRequest {
    refresh_token: String,
}

/// Owns the persisted [`TokenState`]: an in-memory cache over the durable
/// [`TokenStore`], plus the refresh call itself.
///
/// The refresh operation is built on the pipeline without a retry
/// coordinator, so a 401 from the refresh endpoint can never re-enter the
/// coordinator.
pub struct TokenManager {
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    identity: DeviceIdentity,
    current: RwLock<Option<TokenState>>,
}

impl TokenManager {
    /// Create a manager over the given transport and durable store.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
        identity: DeviceIdentity,
    ) -> Self {
        Self { transport, store, identity, current: RwLock::new(None) }
    }

    /// Load persisted state into memory. Call once on startup.
    ///
    /// # Returns
    /// `true` when persisted state existed.
    ///
    /// # Errors
    /// Returns [`DataError::Storage`] if the store cannot be read.
    pub async fn initialize(&self) -> Result<bool> {
        match self.store.load().await? {
            Some(state) => {
                *self.current.write().await = Some(state);
                info!("token manager initialized with persisted state");
                Ok(true)
            }
            None => {
                debug!("no persisted token state found");
                Ok(false)
            }
        }
    }

    /// Persist and cache a new token state (after login or refresh).
    ///
    /// # Errors
    /// Returns [`DataError::Storage`] if persistence fails.
    pub async fn set_tokens(&self, state: TokenState) -> Result<()> {
        self.store.store(&state).await?;
        *self.current.write().await = Some(state);
        Ok(())
    }

    /// Snapshot of the current state.
    pub async fn current(&self) -> Option<TokenState> {
        self.current.read().await.clone()
    }

    /// Whether the access token is past its expiry window. Missing state
    /// counts as expired.
    pub async fn has_expired(&self) -> bool {
        match self.current.read().await.as_ref() {
            Some(state) => state.has_expired(),
            None => true,
        }
    }

    /// Post the refresh token to the refresh endpoint and persist the new
    /// access/refresh tokens and expiry read from the response headers.
    ///
    /// # Errors
    /// Returns [`DataError::Auth`] when no refresh token is available, when
    /// the call fails, or when the response lacks the expected headers.
    pub async fn refresh(&self) -> Result<()> {
        let refresh_token = self
            .current
            .read()
            .await
            .as_ref()
            .and_then(|state| state.refresh_token.clone())
            .ok_or_else(|| {
                warn!("refresh requested without a stored refresh token");
                DataError::Auth(MSG_REFRESH_TOKEN_MISSING.to_string())
            })?;

        let operation =
            RemoteOperationBuilder::new(Arc::clone(&self.transport), Method::Post, REFRESH_TOKEN_PATH)
                .decorator(RequestDecorator::new(self.identity.clone()))
                .enveloped_with_headers::<TokenRefreshResponse>();

        let response =
            operation.call(TokenRefreshRequest { refresh_token }).await.map_err(|err| {
                debug!(error = %err, "refresh call failed");
                DataError::Auth(MSG_REFRESH_FAILED.to_string())
            })?;

        let headers = response.header_parameters;
        let access_token = header_value(&headers, HEADER_ACCESS_TOKEN)
            .ok_or_else(|| DataError::Auth(MSG_REFRESH_FAILED.to_string()))?;
        let refresh_token = header_value(&headers, HEADER_REFRESH_TOKEN);
        let expires_in_secs = header_value(&headers, HEADER_EXPIRES_IN)
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(0);

        self.set_tokens(TokenState::new(access_token, refresh_token, expires_in_secs)).await?;
        info!("access token refreshed");
        Ok(())
    }

    /// Clear only the stored access token (refresh-failure path); the
    /// refresh token is kept so a later attempt remains possible.
    ///
    /// # Errors
    /// Returns [`DataError::Storage`] if the store cannot be updated.
    pub async fn reset_access_token(&self) -> Result<()> {
        self.store.reset_access_token().await?;
        if let Some(state) = self.current.write().await.as_mut() {
            state.reset_access_token();
        }
        Ok(())
    }

    /// Wipe the whole state (logout).
    ///
    /// # Errors
    /// Returns [`DataError::Storage`] if the store cannot be cleared.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await?;
        *self.current.write().await = None;
        info!("token state cleared");
        Ok(())
    }
}

#[async_trait]
impl BearerTokenSource for TokenManager {
    async fn bearer_token(&self) -> Option<String> {
        self.current.read().await.as_ref().and_then(|state| state.bearer().map(str::to_string))
    }
}

/// Case-insensitive header lookup; transports typically lower-case names.
fn header_value(headers: &HashMap<String, String>, name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.clone())
}
