//! Shared collaborators for a run.

use std::sync::Arc;

use crate::connectors::ResourceLimiter;
use crate::error::{ConnectorError, ConnectorResult};
use crate::plugins::Registry;
use crate::references::RefStore;
use crate::settings::Settings;

/// Everything connectors and the engine share: the reference store, the
/// plugin registry, the HTTP client and the request limiter.
///
/// Cheap to clone; clones share the same collaborators.
#[derive(Debug, Clone)]
pub struct Context {
    references: Arc<RefStore>,
    registry: Arc<Registry>,
    client: reqwest::Client,
    limiter: Arc<ResourceLimiter>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            references: Arc::new(RefStore::new()),
            registry: Arc::new(Registry::new()),
            client: reqwest::Client::new(),
            limiter: Arc::new(ResourceLimiter::default()),
        }
    }
}

impl Context {
    /// Build a context with an HTTP client and limiter configured from settings.
    pub fn from_settings(settings: &Settings) -> ConnectorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.http_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| ConnectorError::Http(Box::new(e)))?;

        let mut limiter = ResourceLimiter::new(settings.max_concurrent_requests);
        if let Some(rps) = settings.requests_per_second {
            limiter = limiter.with_requests_per_second(rps);
        }

        Ok(Self {
            client,
            limiter: Arc::new(limiter),
            ..Self::default()
        })
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Share an existing reference store.
    pub fn with_references(mut self, references: Arc<RefStore>) -> Self {
        self.references = references;
        self
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_limiter(mut self, limiter: ResourceLimiter) -> Self {
        self.limiter = Arc::new(limiter);
        self
    }

    pub fn references(&self) -> &RefStore {
        &self.references
    }

    /// Owned handle to the reference store, for connectors that outlive a borrow.
    pub fn shared_references(&self) -> Arc<RefStore> {
        Arc::clone(&self.references)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn limiter(&self) -> &Arc<ResourceLimiter> {
        &self.limiter
    }
}
