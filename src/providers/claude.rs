use crate::{
    config::{HttpConfig, Provider, ProviderConfig},
    error::Result,
    models::{ChatMessage, Completion, Role},
    providers::{http, traits::ProviderAdapter},
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

pub const CLAUDE_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct ClaudeAdapter {
    client: Client,
    endpoint: String,
}

impl ClaudeAdapter {
    pub fn new(http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(http, Provider::Claude)?,
            endpoint: CLAUDE_ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Lifts system turns into the top-level `system` field and renames `user` to `human`.
/// The remaining turns keep their original order.
pub(crate) fn claude_payload(messages: &[ChatMessage], config: &ProviderConfig) -> Value {
    let mut system_prompt = String::new();
    let mut turns = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role {
            Role::System => {
                if !system_prompt.is_empty() {
                    system_prompt.push_str("\n\n");
                }
                system_prompt.push_str(&msg.content);
            }
            Role::User => turns.push(json!({"role": "human", "content": msg.content})),
            Role::Assistant => turns.push(json!({"role": "assistant", "content": msg.content})),
        }
    }

    let mut payload = json!({
        "model": config.model,
        "max_tokens": config.max_tokens,
        "temperature": config.temperature,
        "messages": turns,
    });
    if !system_prompt.is_empty() {
        payload["system"] = json!(system_prompt);
    }
    payload
}

fn extract_completion(body: &Value) -> Result<Completion> {
    let content = http::str_at(body, "/content/0/text")?;
    let tokens_used = body.get("usage").map(|_| {
        http::u32_at(body, "/usage/input_tokens")
            .unwrap_or(0)
            .saturating_add(http::u32_at(body, "/usage/output_tokens").unwrap_or(0))
    });
    Ok(Completion {
        content: content.to_string(),
        tokens_used,
    })
}

#[async_trait]
impl ProviderAdapter for ClaudeAdapter {
    fn provider(&self) -> Provider {
        Provider::Claude
    }

    fn validate(&self, config: &ProviderConfig) -> bool {
        config.has_api_key() && !config.model.trim().is_empty()
    }

    async fn send(&self, messages: &[ChatMessage], config: &ProviderConfig) -> Result<Completion> {
        let request = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let body = http::post_json(request, &claude_payload(messages, config)).await?;
        extract_completion(&body)
    }
}
