use serde::{Deserialize, Serialize};

use crate::error::AiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation. Order within a conversation is significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// What an adapter hands back after a successful call.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub tokens_used: Option<u32>,
}

/// Normalized outcome of a chat call, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResult {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: Option<u32>,
    pub success: bool,
    pub error: Option<String>,
}

impl ChatResult {
    pub fn success(
        completion: Completion,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            content: completion.content,
            provider: provider.into(),
            model: model.into(),
            tokens_used: completion.tokens_used,
            success: true,
            error: None,
        }
    }

    pub fn failure(error: &AiError, provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            provider: provider.into(),
            model: model.into(),
            tokens_used: None,
            success: false,
            error: Some(error.to_string()),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
