use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use drover_model::{CloudStatus, Host};

use crate::error::CloudError;

/// Provider-side view of one host's instance.
#[async_trait]
pub trait CloudHost: Send + Sync {
    /// Instance state as the provider reports it.
    async fn instance_status(&self) -> Result<CloudStatus, CloudError>;

    /// Whether the host's control channel can be opened right now.
    async fn is_reachable(&self) -> Result<bool, CloudError>;
}

/// Binds host records to their provider adapter.
pub trait CloudProvider: Send + Sync + 'static {
    fn cloud_host(&self, host: &Host) -> Result<Arc<dyn CloudHost>, CloudError>;
}

/// Provider lookup keyed by [`Host::provider`].
#[derive(Default, Clone)]
pub struct CloudProviders {
    providers: HashMap<String, Arc<dyn CloudProvider>>,
}

impl CloudProviders {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn register(&mut self, key: impl Into<String>, provider: Arc<dyn CloudProvider>) {
        self.providers.insert(key.into(), provider);
    }

    #[inline]
    pub fn with(mut self, key: impl Into<String>, provider: Arc<dyn CloudProvider>) -> Self {
        self.register(key, provider);
        self
    }
}

impl CloudProvider for CloudProviders {
    fn cloud_host(&self, host: &Host) -> Result<Arc<dyn CloudHost>, CloudError> {
        let provider = self
            .providers
            .get(&host.provider)
            .ok_or_else(|| CloudError::UnknownProvider(host.provider.clone()))?;
        provider.cloud_host(host)
    }
}
