use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Unsupported AI provider: {0}")]
    UnknownProvider(String),
    #[error("AI not configured or enabled")]
    Disabled,
    #[error("No messages to send")]
    EmptyConversation,
    #[error("API Error: {status}")]
    Backend { status: u16 },
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Parse(String),
    #[error("Client error: {0}")]
    Client(String),
}

/// Coarse classification used when logging failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Disabled,
    Backend,
    Transport,
    Parse,
}

impl AiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AiError::Config(_) | AiError::UnknownProvider(_) | AiError::Client(_) => {
                ErrorKind::Config
            }
            AiError::Disabled | AiError::EmptyConversation => ErrorKind::Disabled,
            AiError::Backend { .. } => ErrorKind::Backend,
            AiError::Transport(_) => ErrorKind::Transport,
            AiError::Parse(_) => ErrorKind::Parse,
        }
    }

    pub fn is_config_error(&self) -> bool {
        self.kind() == ErrorKind::Config
    }

    pub(crate) fn missing_field(path: &str) -> Self {
        AiError::Parse(format!("Malformed response: missing field '{}'", path))
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AiError::Transport(format!("Request timed out: {}", err))
        } else if err.is_builder() {
            AiError::Client(err.to_string())
        } else {
            AiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AiError {
    fn from(err: serde_json::Error) -> Self {
        AiError::Parse(format!("Malformed response: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AiError>;
