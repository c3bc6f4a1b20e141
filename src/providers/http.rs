//! Outbound call plumbing shared by every adapter.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use crate::{
    config::{HttpConfig, Provider, ProviderConfig},
    error::{AiError, Result},
    models::{ChatMessage, Completion},
};

pub(crate) fn build_client(http: &HttpConfig, provider: Provider) -> Result<Client> {
    client_with_timeout(http.timeout_for(provider), &http.user_agent)
}

pub(crate) fn client_with_timeout(timeout: Duration, user_agent: &str) -> Result<Client> {
    let builder = Client::builder().timeout(timeout).user_agent(user_agent);
    // Mock backends live on loopback; proxy env vars must not reroute them.
    #[cfg(test)]
    let builder = builder.no_proxy();
    builder
        .build()
        .map_err(|e| AiError::Client(format!("Failed to construct HTTP client: {}", e)))
}

/// Sends `payload` and returns the decoded JSON body of a successful response.
pub(crate) async fn post_json(request: RequestBuilder, payload: &Value) -> Result<Value> {
    let response = request.json(payload).send().await?;
    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        log::debug!(
            "Backend rejected request with {}: {}",
            status,
            truncate(&error_text, 300)
        );
        return Err(AiError::Backend {
            status: status.as_u16(),
        });
    }

    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// `{model, messages[], max_tokens, temperature}`, the shape every OpenAI-style endpoint accepts.
pub(crate) fn openai_payload(messages: &[ChatMessage], config: &ProviderConfig) -> Value {
    json!({
        "model": config.model,
        "messages": messages,
        "max_tokens": config.max_tokens,
        "temperature": config.temperature,
    })
}

pub(crate) fn extract_openai_completion(body: &Value) -> Result<Completion> {
    let content = str_at(body, "/choices/0/message/content")?;
    Ok(Completion {
        content: content.to_string(),
        tokens_used: u32_at(body, "/usage/total_tokens"),
    })
}

pub(crate) fn str_at<'a>(body: &'a Value, pointer: &str) -> Result<&'a str> {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| AiError::missing_field(pointer))
}

pub(crate) fn u32_at(body: &Value, pointer: &str) -> Option<u32> {
    body.pointer(pointer)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim().trim_end_matches('/'), path)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
