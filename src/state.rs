use std::sync::Arc;

use crate::config::AppConfig;
use crate::provider::{ProviderClient, ProviderError};
use crate::store::{DocumentStore, SharedStore};
use crate::sync::KeyedLocks;

/// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub locks: Arc<KeyedLocks>,
    pub config: Arc<AppConfig>,
    pub provider: ProviderClient,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(store: SharedStore, config: AppConfig) -> Result<Self, ProviderError> {
        let provider = ProviderClient::new(&config.provider)?;
        Ok(Self {
            store,
            locks: Arc::new(KeyedLocks::new()),
            config: Arc::new(config),
            provider,
            http: reqwest::Client::new(),
        })
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }
}
