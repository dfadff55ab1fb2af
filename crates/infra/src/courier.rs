//! Courier facade
//!
//! Assembles the operation pipeline: one transport, one token manager, one
//! retry coordinator, all explicitly constructed and privately owned, so
//! independent pipelines (and their tests) never share state. Hands out
//! operation builders pre-wired with the decorator and coordinator.

use std::sync::Arc;

use courier_core::auth::TokenManager;
use courier_core::decorator::{DeviceIdentity, RequestDecorator};
use courier_core::operation::remote::RemoteOperationBuilder;
use courier_core::operation::storage::{StorageOperationBuilder, StorageOperationKind};
use courier_core::operation::Operation;
use courier_core::ports::{BearerTokenSource, Method, Record, RecordStore, TokenStore, Transport};
use courier_core::retry::{RetryCoordinator, RetryPolicy};
use courier_domain::{CourierConfig, Result};
use tracing::instrument;

use crate::http::ReqwestTransport;
use crate::token_store::KeyringTokenStore;

/// Default keychain service name for the durable token store.
const KEYCHAIN_SERVICE: &str = "Courier";
/// Default keychain account name for the durable token store.
const KEYCHAIN_ACCOUNT: &str = "tokens";

/// Entry point of the SDK: owns the shared collaborators and builds typed
/// operations.
pub struct Courier {
    transport: Arc<dyn Transport>,
    tokens: Arc<TokenManager>,
    coordinator: Arc<RetryCoordinator>,
    decorator: RequestDecorator,
}

impl Courier {
    /// Start building a Courier instance.
    #[must_use]
    pub fn builder() -> CourierBuilder {
        CourierBuilder::default()
    }

    /// Load persisted token state. Call once on startup.
    ///
    /// # Returns
    /// `true` when persisted state existed.
    ///
    /// # Errors
    /// Returns [`courier_domain::DataError::Storage`] when the token store
    /// cannot be read.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<bool> {
        self.tokens.initialize().await
    }

    /// Builder for a remote operation on the given endpoint, pre-wired with
    /// the request decorator and the retry coordinator.
    #[must_use]
    pub fn remote<I>(&self, method: Method, path: &str) -> RemoteOperationBuilder<I>
    where
        I: Send + Sync + 'static,
    {
        RemoteOperationBuilder::new(Arc::clone(&self.transport), method, path)
            .decorator(self.decorator.clone())
            .retry(Arc::clone(&self.coordinator))
    }

    /// Storage operation over the given record store.
    #[must_use]
    pub fn storage<R: Record>(
        &self,
        kind: StorageOperationKind,
        store: Arc<dyn RecordStore<R>>,
    ) -> Operation<R, R> {
        StorageOperationBuilder::new(kind, store).build()
    }

    /// The token manager (login flows store their tokens through this).
    #[must_use]
    pub fn tokens(&self) -> Arc<TokenManager> {
        Arc::clone(&self.tokens)
    }
}

/// Builder for [`Courier`].
#[derive(Default)]
pub struct CourierBuilder {
    config: CourierConfig,
    token_store: Option<Arc<dyn TokenStore>>,
    transport: Option<Arc<dyn Transport>>,
}

impl CourierBuilder {
    /// Use the given configuration.
    #[must_use]
    pub fn config(mut self, config: CourierConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the durable token store (defaults to the system keychain).
    #[must_use]
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    /// Override the transport (defaults to [`ReqwestTransport`] built from
    /// the configuration).
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Assemble the pipeline.
    ///
    /// # Errors
    /// Returns [`courier_domain::DataError::BadUrl`] when no transport
    /// override is given and the configured base URL is missing or invalid.
    pub fn build(self) -> Result<Courier> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&self.config.api)?),
        };

        let token_store: Arc<dyn TokenStore> = self
            .token_store
            .unwrap_or_else(|| Arc::new(KeyringTokenStore::new(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT)));

        let identity = DeviceIdentity::from_config(&self.config.device);
        let tokens =
            Arc::new(TokenManager::new(Arc::clone(&transport), token_store, identity.clone()));
        let coordinator = Arc::new(RetryCoordinator::new(
            Arc::clone(&tokens),
            RetryPolicy::from_config(&self.config.retry),
        ));
        let decorator = RequestDecorator::new(identity)
            .with_bearer_source(Arc::clone(&tokens) as Arc<dyn BearerTokenSource>);

        Ok(Courier { transport, tokens, coordinator, decorator })
    }
}
