use crate::{
    config::{HttpConfig, Provider, ProviderConfig},
    error::Result,
    models::{ChatMessage, Completion},
    providers::{http, traits::ProviderAdapter},
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Self-hosted runtime. No credentials, no token accounting, longer timeout.
pub struct OllamaAdapter {
    client: Client,
    default_base_url: String,
}

impl OllamaAdapter {
    pub fn new(http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(http, Provider::Ollama)?,
            default_base_url: OLLAMA_BASE_URL.to_string(),
        })
    }

    fn endpoint_for(&self, config: &ProviderConfig) -> String {
        let base = config.base_url().unwrap_or(&self.default_base_url);
        http::join_url(base, "/api/chat")
    }
}

pub(crate) fn ollama_payload(messages: &[ChatMessage], config: &ProviderConfig) -> Value {
    json!({
        "model": config.model,
        "messages": messages,
        "stream": false,
        "options": {
            "temperature": config.temperature
        }
    })
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn provider(&self) -> Provider {
        Provider::Ollama
    }

    fn validate(&self, config: &ProviderConfig) -> bool {
        !config.model.trim().is_empty()
    }

    async fn send(&self, messages: &[ChatMessage], config: &ProviderConfig) -> Result<Completion> {
        let request = self.client.post(self.endpoint_for(config));
        let body = http::post_json(request, &ollama_payload(messages, config)).await?;
        let content = http::str_at(&body, "/message/content")?;
        Ok(Completion {
            content: content.to_string(),
            tokens_used: None,
        })
    }
}
