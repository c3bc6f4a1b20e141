pub mod claude;
pub mod deepseek;
pub mod generic;
pub(crate) mod http;
pub mod ollama;
pub mod openai;
pub mod traits;

#[cfg(test)]
pub(crate) mod mock;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::{
    config::{HttpConfig, Provider},
    error::Result,
};

pub use claude::ClaudeAdapter;
pub use deepseek::DeepSeekAdapter;
pub use generic::GenericOpenAiAdapter;
pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;
pub use traits::ProviderAdapter;

/// Enum-keyed table of the adapters the dispatch service may route to.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// One adapter per supported backend, sharing the given timeouts.
    pub fn new(http: &HttpConfig) -> Result<Self> {
        let registry = Self::empty()
            .register(Arc::new(OpenAiAdapter::new(http)?))
            .register(Arc::new(DeepSeekAdapter::new(http)?))
            .register(Arc::new(ClaudeAdapter::new(http)?))
            .register(Arc::new(OllamaAdapter::new(http)?))
            .register(Arc::new(GenericOpenAiAdapter::new(http)?));
        Ok(registry)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds or replaces the adapter for `adapter.provider()`.
    pub fn register(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.insert(adapter);
        self
    }

    pub fn insert(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    pub fn get(&self, provider: Provider) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider)
    }

    pub fn contains(&self, provider: Provider) -> bool {
        self.adapters.contains_key(&provider)
    }

    pub fn providers(&self) -> BTreeSet<Provider> {
        self.adapters.keys().copied().collect()
    }
}
