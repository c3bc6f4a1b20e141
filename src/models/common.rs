use serde::{Deserialize, Serialize};

use crate::config::Provider;

/// Descriptor shown in provider pickers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub display_name: String,
    pub requires_api_key: bool,
    pub requires_base_url: bool,
    pub local: bool,
    pub models: Vec<String>,
}

impl From<Provider> for ProviderInfo {
    fn from(provider: Provider) -> Self {
        Self {
            id: provider.as_str().to_string(),
            display_name: provider.display_name().to_string(),
            requires_api_key: provider.requires_api_key(),
            requires_base_url: provider.requires_base_url(),
            local: provider.is_local(),
            models: provider
                .supported_models()
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}
