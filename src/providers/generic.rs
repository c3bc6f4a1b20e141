use crate::{
    config::{HttpConfig, Provider, ProviderConfig},
    error::{AiError, Result},
    models::{ChatMessage, Completion},
    providers::{http, traits::ProviderAdapter},
};
use async_trait::async_trait;
use reqwest::Client;

/// Any server speaking the OpenAI chat-completions protocol at `<base_url>/v1/chat/completions`.
pub struct GenericOpenAiAdapter {
    client: Client,
}

impl GenericOpenAiAdapter {
    pub fn new(http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(http, Provider::GenericOpenAi)?,
        })
    }

    fn endpoint_for(config: &ProviderConfig) -> Result<String> {
        let base = config
            .base_url()
            .ok_or_else(|| AiError::Config("Base URL is required for the generic provider".into()))?;
        Ok(http::join_url(base, "/v1/chat/completions"))
    }
}

#[async_trait]
impl ProviderAdapter for GenericOpenAiAdapter {
    fn provider(&self) -> Provider {
        Provider::GenericOpenAi
    }

    fn validate(&self, config: &ProviderConfig) -> bool {
        config.has_api_key() && !config.model.trim().is_empty() && config.base_url().is_some()
    }

    async fn send(&self, messages: &[ChatMessage], config: &ProviderConfig) -> Result<Completion> {
        let request = self
            .client
            .post(Self::endpoint_for(config)?)
            .bearer_auth(&config.api_key);
        let body = http::post_json(request, &http::openai_payload(messages, config)).await?;
        http::extract_openai_completion(&body)
    }
}
