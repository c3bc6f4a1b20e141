use crate::{
    config::{Provider, ProviderConfig},
    error::Result,
    models::{ChatMessage, Completion},
};
use async_trait::async_trait;

/// Two-way translation between the normalized chat shapes and one backend's wire format.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    /// Whether `config` carries every field this backend needs. No I/O.
    fn validate(&self, config: &ProviderConfig) -> bool;

    /// Exactly one outbound call. `config` must already have passed [`validate`].
    ///
    /// [`validate`]: ProviderAdapter::validate
    async fn send(&self, messages: &[ChatMessage], config: &ProviderConfig) -> Result<Completion>;
}
