use crate::{
    config::{HttpConfig, Provider, ProviderConfig},
    error::Result,
    models::{ChatMessage, Completion},
    providers::{http, traits::ProviderAdapter},
};
use async_trait::async_trait;
use reqwest::Client;

pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiAdapter {
    client: Client,
    endpoint: String,
}

impl OpenAiAdapter {
    pub fn new(http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(http, Provider::OpenAi)?,
            endpoint: OPENAI_ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn validate(&self, config: &ProviderConfig) -> bool {
        config.has_api_key() && !config.model.trim().is_empty()
    }

    async fn send(&self, messages: &[ChatMessage], config: &ProviderConfig) -> Result<Completion> {
        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&config.api_key);
        let body = http::post_json(request, &http::openai_payload(messages, config)).await?;
        http::extract_openai_completion(&body)
    }
}
