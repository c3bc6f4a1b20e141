use crate::{
    config::{HttpConfig, Provider, ProviderConfig},
    error::Result,
    models::{ChatMessage, Completion},
    providers::{http, traits::ProviderAdapter},
};
use async_trait::async_trait;
use reqwest::Client;

pub const DEEPSEEK_ENDPOINT: &str = "https://api.deepseek.com/v1/chat/completions";

/// OpenAI-shaped requests against DeepSeek. A configured `base_url` replaces the whole endpoint.
pub struct DeepSeekAdapter {
    client: Client,
    endpoint: String,
}

impl DeepSeekAdapter {
    pub fn new(http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(http, Provider::DeepSeek)?,
            endpoint: DEEPSEEK_ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn endpoint_for<'a>(&'a self, config: &'a ProviderConfig) -> &'a str {
        config.base_url().unwrap_or(&self.endpoint)
    }
}

#[async_trait]
impl ProviderAdapter for DeepSeekAdapter {
    fn provider(&self) -> Provider {
        Provider::DeepSeek
    }

    fn validate(&self, config: &ProviderConfig) -> bool {
        config.has_api_key() && !config.model.trim().is_empty()
    }

    async fn send(&self, messages: &[ChatMessage], config: &ProviderConfig) -> Result<Completion> {
        let request = self
            .client
            .post(self.endpoint_for(config))
            .bearer_auth(&config.api_key);
        let body = http::post_json(request, &http::openai_payload(messages, config)).await?;
        http::extract_openai_completion(&body)
    }
}
