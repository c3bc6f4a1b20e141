use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};

pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const MAX_TOKENS_LIMIT: u32 = 32000;
pub const MAX_TEMPERATURE: f64 = 2.0;

/// The closed set of chat backends the dispatch service can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "deepseek")]
    DeepSeek,
    Claude,
    Ollama,
    #[serde(rename = "generic_openai")]
    GenericOpenAi,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::OpenAi,
        Provider::DeepSeek,
        Provider::Claude,
        Provider::Ollama,
        Provider::GenericOpenAi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::DeepSeek => "deepseek",
            Provider::Claude => "claude",
            Provider::Ollama => "ollama",
            Provider::GenericOpenAi => "generic_openai",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::DeepSeek => "DeepSeek",
            Provider::Claude => "Anthropic Claude",
            Provider::Ollama => "Ollama (Local)",
            Provider::GenericOpenAi => "Generic OpenAI-compatible",
        }
    }

    /// Local runtimes are reached without credentials.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Provider::Ollama)
    }

    pub fn requires_base_url(&self) -> bool {
        matches!(self, Provider::GenericOpenAi)
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Provider::Ollama)
    }

    /// Known model identifiers. Informational only, never checked against the backend.
    pub fn supported_models(&self) -> &'static [&'static str] {
        match self {
            Provider::OpenAi => &["gpt-4", "gpt-4-turbo", "gpt-3.5-turbo", "gpt-3.5-turbo-16k"],
            Provider::DeepSeek => &["deepseek-chat", "deepseek-coder"],
            Provider::Claude => &[
                "claude-3-sonnet-20240229",
                "claude-3-haiku-20240307",
                "claude-3-opus-20240229",
            ],
            Provider::Ollama => &["llama2", "mistral", "codellama", "neural-chat"],
            Provider::GenericOpenAi => &[],
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| AiError::UnknownProvider(s.trim().to_string()))
    }
}

/// Raw settings as they come out of a settings store or an admin form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub provider: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// How to reach one backend.
///
/// Fields are plain data for building and editing a configuration. Once handed
/// to `AiService` it is frozen behind an `Arc`: callers only ever get shared
/// snapshots, and a new `set_config` replaces the snapshot instead of mutating it.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: Provider,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_enabled() -> bool {
    true
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &mask_secret(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("enabled", &self.enabled)
            .finish()
    }
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        format!("***({} chars)", secret.chars().count())
    }
}

impl ProviderConfig {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: String::new(),
            model: model.into(),
            base_url: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            enabled: true,
        }
    }

    pub fn from_env() -> Result<Self> {
        let settings = ProviderSettings {
            provider: env::var("AI_PROVIDER")
                .map_err(|_| AiError::Config("AI_PROVIDER is not set".into()))?,
            api_key: env::var("AI_API_KEY").ok(),
            model: env::var("AI_MODEL").unwrap_or_default(),
            base_url: env::var("AI_BASE_URL").ok(),
            max_tokens: parse_env("AI_MAX_TOKENS")?,
            temperature: parse_env("AI_TEMPERATURE")?,
            enabled: env::var("AI_ENABLED")
                .ok()
                .map(|val| !matches!(val.trim(), "false" | "0" | "no" | "off")),
        };
        Self::try_from(settings)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Non-empty, trimmed base URL if one was supplied.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Provider-independent checks: model presence and numeric ranges.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(AiError::Config("Model is required".into()));
        }
        if self.max_tokens < 1 || self.max_tokens > MAX_TOKENS_LIMIT {
            return Err(AiError::Config(format!(
                "Max tokens must be between 1 and {} (got {})",
                MAX_TOKENS_LIMIT, self.max_tokens
            )));
        }
        if !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(AiError::Config(format!(
                "Temperature must be between 0.0 and {:.1} (got {})",
                MAX_TEMPERATURE, self.temperature
            )));
        }
        Ok(())
    }

    /// Every problem with this configuration, suitable for showing next to a form.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.model.trim().is_empty() {
            errors.push("Model is required".to_string());
        }
        if self.provider.requires_api_key() && !self.has_api_key() {
            errors.push(format!("API key is required for {}", self.provider));
        }
        if self.provider.requires_base_url() && self.base_url().is_none() {
            errors.push("Base URL is required for the generic provider".to_string());
        }
        if self.max_tokens < 1 || self.max_tokens > MAX_TOKENS_LIMIT {
            errors.push(format!("Max tokens must be between 1 and {}", MAX_TOKENS_LIMIT));
        }
        if !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            errors.push(format!("Temperature must be between 0.0 and {:.1}", MAX_TEMPERATURE));
        }
        errors
    }
}

impl TryFrom<ProviderSettings> for ProviderConfig {
    type Error = AiError;

    fn try_from(settings: ProviderSettings) -> Result<Self> {
        let provider: Provider = settings.provider.parse()?;
        let config = ProviderConfig {
            provider,
            api_key: settings.api_key.unwrap_or_default().trim().to_string(),
            model: settings.model.trim().to_string(),
            base_url: settings
                .base_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            max_tokens: settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: settings.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            enabled: settings.enabled.unwrap_or(true),
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AiError::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(None),
    }
}

/// Per-call timeouts for outbound requests.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub remote_timeout: Duration,
    pub local_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            remote_timeout: Duration::from_secs(30),
            local_timeout: Duration::from_secs(60),
            user_agent: format!("ai-dispatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `AI_HTTP_TIMEOUT_SECS` and `AI_LOCAL_TIMEOUT_SECS`; unset keeps the default.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let remote_timeout = parse_env::<u64>("AI_HTTP_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.remote_timeout);
        let local_timeout = parse_env::<u64>("AI_LOCAL_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.local_timeout);

        Ok(HttpConfig {
            remote_timeout,
            local_timeout,
            ..defaults
        })
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn with_local_timeout(mut self, timeout: Duration) -> Self {
        self.local_timeout = timeout;
        self
    }

    pub fn timeout_for(&self, provider: Provider) -> Duration {
        if provider.is_local() {
            self.local_timeout
        } else {
            self.remote_timeout
        }
    }
}
