//! Single entry point for chat requests: owns the active provider configuration
//! and routes each call to the matching adapter.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    config::{HttpConfig, Provider, ProviderConfig, ProviderSettings},
    error::{AiError, Result},
    logger::Timer,
    models::{ChatMessage, ChatResult, Completion, ProviderInfo},
    providers::AdapterRegistry,
};

const CONNECTION_PROBE: &str = "You are the AI assistant of the ERP system. \
Reply briefly (50 words at most) confirming that: \
1. you received this message correctly, \
2. you are ready to help with ERP questions, \
3. which model/provider you are.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: Option<String>,
    pub ai_response: Option<String>,
    pub provider: String,
    pub model: String,
    pub tokens_used: Option<u32>,
    pub error: Option<String>,
}

pub struct AiService {
    registry: AdapterRegistry,
    active: RwLock<Option<Arc<ProviderConfig>>>,
}

impl AiService {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self {
            registry,
            active: RwLock::new(None),
        }
    }

    /// Service backed by the built-in adapters for every provider.
    pub fn with_http_config(http: &HttpConfig) -> Result<Self> {
        Ok(Self::new(AdapterRegistry::new(http)?))
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Installs `config` as the active configuration. On rejection the previous
    /// configuration stays in place and `false` is returned.
    pub fn set_config(&self, config: ProviderConfig) -> bool {
        match self.try_set_config(config) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Rejected AI configuration: {}", e);
                false
            }
        }
    }

    pub fn try_set_config(&self, config: ProviderConfig) -> Result<()> {
        if !config.enabled {
            self.disable();
            return Ok(());
        }

        config.validate()?;

        let adapter = self
            .registry
            .get(config.provider)
            .ok_or_else(|| AiError::UnknownProvider(config.provider.to_string()))?;
        if !adapter.validate(&config) {
            return Err(AiError::Config(format!(
                "Invalid configuration for {}: {}",
                config.provider,
                config.validation_errors().join("; ")
            )));
        }

        log::info!(
            "AI configuration set: {} - {}",
            config.provider,
            config.model
        );
        self.replace_active(Some(Arc::new(config)));
        Ok(())
    }

    /// Parses raw settings (provider given by name) and installs them.
    /// A disabled form turns the service off whatever else it holds.
    pub fn apply_settings(&self, settings: ProviderSettings) -> bool {
        if settings.enabled == Some(false) {
            self.disable();
            return true;
        }
        match ProviderConfig::try_from(settings) {
            Ok(config) => self.set_config(config),
            Err(e) => {
                log::error!("Rejected AI settings: {}", e);
                false
            }
        }
    }

    pub fn disable(&self) {
        if self.replace_active(None).is_some() {
            log::info!("AI service disabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.current_config().map_or(false, |config| config.enabled)
    }

    /// Snapshot of the active configuration. Later swaps never alter it.
    pub fn current_config(&self) -> Option<Arc<ProviderConfig>> {
        match self.active.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn replace_active(&self, next: Option<Arc<ProviderConfig>>) -> Option<Arc<ProviderConfig>> {
        let mut guard = match self.active.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }

    /// Sends `messages` to the active backend. Every failure is folded into the result.
    pub async fn chat(&self, messages: &[ChatMessage]) -> ChatResult {
        let config = match self.enabled_config() {
            Ok(config) => config,
            Err(e) => return ChatResult::failure(&e, "none", "none"),
        };

        match self.dispatch(&config, messages).await {
            Ok(completion) => {
                ChatResult::success(completion, config.provider.as_str(), config.model.clone())
            }
            Err(e) => ChatResult::failure(&e, config.provider.as_str(), config.model.clone()),
        }
    }

    /// Like [`chat`](Self::chat) but keeps the error kind.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion> {
        let config = self.enabled_config()?;
        self.dispatch(&config, messages).await
    }

    fn enabled_config(&self) -> Result<Arc<ProviderConfig>> {
        self.current_config()
            .filter(|config| config.enabled)
            .ok_or(AiError::Disabled)
    }

    async fn dispatch(&self, config: &ProviderConfig, messages: &[ChatMessage]) -> Result<Completion> {
        if messages.is_empty() {
            return Err(AiError::EmptyConversation);
        }
        let adapter = self
            .registry
            .get(config.provider)
            .ok_or_else(|| AiError::UnknownProvider(config.provider.to_string()))?;

        let request_id = Uuid::new_v4();
        let timer = Timer::new(&format!("chat {} [{}]", config.provider, request_id));
        let outcome = adapter.send(messages, config).await;

        match &outcome {
            Ok(completion) => log::info!(
                "Chat {} via {}/{} completed in {}ms (tokens: {})",
                request_id,
                config.provider,
                config.model,
                timer.elapsed().as_millis(),
                completion
                    .tokens_used
                    .map_or_else(|| "n/a".to_string(), |t| t.to_string())
            ),
            Err(e) => log::error!(
                "Chat {} via {}/{} failed ({:?}): {}",
                request_id,
                config.provider,
                config.model,
                e.kind(),
                e
            ),
        }
        outcome
    }

    pub fn list_providers(&self) -> Vec<&'static str> {
        self.registry
            .providers()
            .into_iter()
            .map(|p| p.as_str())
            .collect()
    }

    /// Static catalog; unknown provider names yield an empty list.
    pub fn list_models(&self, provider: &str) -> Vec<&'static str> {
        provider
            .parse::<Provider>()
            .map(|p| p.supported_models().to_vec())
            .unwrap_or_default()
    }

    pub fn provider_info(&self) -> Vec<ProviderInfo> {
        self.registry
            .providers()
            .into_iter()
            .map(ProviderInfo::from)
            .collect()
    }

    /// Sends a short fixed probe through the active backend.
    pub async fn test_connection(&self) -> ConnectionReport {
        if !self.is_enabled() {
            return ConnectionReport {
                success: false,
                message: None,
                ai_response: None,
                provider: "none".to_string(),
                model: "none".to_string(),
                tokens_used: None,
                error: Some(AiError::Disabled.to_string()),
            };
        }

        let result = self.chat(&[ChatMessage::user(CONNECTION_PROBE)]).await;
        if result.success {
            ConnectionReport {
                success: true,
                message: Some("AI connection successful".to_string()),
                ai_response: Some(result.content),
                provider: result.provider,
                model: result.model,
                tokens_used: result.tokens_used,
                error: None,
            }
        } else {
            ConnectionReport {
                success: false,
                message: None,
                ai_response: None,
                provider: result.provider,
                model: result.model,
                tokens_used: None,
                error: Some(format!(
                    "AI response error: {}",
                    result.error.unwrap_or_default()
                )),
            }
        }
    }

    /// One-shot question, optionally grounded in `context`.
    pub async fn ask(&self, question: &str, context: &str) -> ChatResult {
        let mut messages = Vec::with_capacity(2);
        if !context.trim().is_empty() {
            messages.push(ChatMessage::system(format!(
                "You are the ERP AI assistant. Context: {}",
                context
            )));
        }
        messages.push(ChatMessage::user(question));
        self.chat(&messages).await
    }

    pub async fn ask_about_client(
        &self,
        client_id: &str,
        question: &str,
        client_data: &Value,
    ) -> ChatResult {
        let record = serde_json::to_string_pretty(client_data).unwrap_or_default();
        let context = format!(
            "Data for client ID {}:\n{}\n\n\
             Answer questions about this client based on the data provided. \
             Be specific and cite concrete figures when relevant.",
            client_id, record
        );
        self.ask(question, &context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{mock::MockBackend, OpenAiAdapter, ProviderAdapter};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    enum Reply {
        EchoModel,
        Status(u16),
        Slow(Duration),
    }

    struct CountingAdapter {
        provider: Provider,
        reply: Reply,
        validations: AtomicUsize,
        sends: AtomicUsize,
        last_messages: Mutex<Vec<ChatMessage>>,
    }

    impl CountingAdapter {
        fn new(provider: Provider, reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                provider,
                reply,
                validations: AtomicUsize::new(0),
                sends: AtomicUsize::new(0),
                last_messages: Mutex::new(Vec::new()),
            })
        }

        fn sends(&self) -> usize {
            self.sends.load(Ordering::SeqCst)
        }

        fn validations(&self) -> usize {
            self.validations.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProviderAdapter for CountingAdapter {
        fn provider(&self) -> Provider {
            self.provider
        }

        fn validate(&self, config: &ProviderConfig) -> bool {
            self.validations.fetch_add(1, Ordering::SeqCst);
            (!self.provider.requires_api_key() || config.has_api_key())
                && !config.model.is_empty()
        }

        async fn send(&self, messages: &[ChatMessage], config: &ProviderConfig) -> Result<Completion> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            *self.last_messages.lock().unwrap() = messages.to_vec();
            match self.reply {
                Reply::EchoModel => {}
                Reply::Status(status) => return Err(AiError::Backend { status }),
                Reply::Slow(delay) => tokio::time::sleep(delay).await,
            }
            Ok(Completion {
                content: format!("answered by {}", config.model),
                tokens_used: Some(1),
            })
        }
    }

    fn openai(model: &str) -> ProviderConfig {
        ProviderConfig::new(Provider::OpenAi, model).with_api_key("sk-test")
    }

    fn service_with(adapter: Arc<CountingAdapter>) -> AiService {
        AiService::new(AdapterRegistry::empty().register(adapter))
    }

    #[tokio::test]
    async fn test_chat_without_config_makes_no_call() {
        let adapter = CountingAdapter::new(Provider::OpenAi, Reply::EchoModel);
        let service = service_with(adapter.clone());

        assert!(!service.is_enabled());
        let result = service.chat(&[ChatMessage::user("hi")]).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("AI not configured or enabled"));
        assert_eq!(result.provider, "none");
        assert_eq!(adapter.sends(), 0);
    }

    #[tokio::test]
    async fn test_chat_routes_to_active_adapter() {
        let adapter = CountingAdapter::new(Provider::OpenAi, Reply::EchoModel);
        let service = service_with(adapter.clone());

        assert!(service.set_config(openai("gpt-4")));
        assert!(service.is_enabled());

        let result = service.chat(&[ChatMessage::user("hi")]).await;
        assert!(result.success);
        assert_eq!(result.content, "answered by gpt-4");
        assert_eq!(result.provider, "openai");
        assert_eq!(result.model, "gpt-4");
        assert_eq!(result.tokens_used, Some(1));
        assert_eq!(result.error, None);
        assert_eq!(adapter.sends(), 1);
    }

    #[tokio::test]
    async fn test_disabling_config_deactivates_service() {
        let adapter = CountingAdapter::new(Provider::OpenAi, Reply::EchoModel);
        let service = service_with(adapter.clone());
        assert!(service.set_config(openai("gpt-4")));

        assert!(service.set_config(openai("gpt-4").with_enabled(false)));
        assert!(!service.is_enabled());
        assert!(service.current_config().is_none());

        let result = service.chat(&[ChatMessage::user("hi")]).await;
        assert!(!result.success);
        assert_eq!(adapter.sends(), 0);
    }

    #[tokio::test]
    async fn test_disabled_settings_form_skips_validation() {
        let adapter = CountingAdapter::new(Provider::Ollama, Reply::EchoModel);
        let service = service_with(adapter.clone());
        assert!(service.set_config(ProviderConfig::new(Provider::Ollama, "llama2")));

        let applied = service.apply_settings(ProviderSettings {
            provider: "ollama".into(),
            model: String::new(),
            temperature: Some(9.0),
            enabled: Some(false),
            ..Default::default()
        });
        assert!(applied);
        assert!(!service.is_enabled());
        assert!(service.current_config().is_none());

        let result = service.chat(&[ChatMessage::user("hi")]).await;
        assert!(!result.success);
        assert_eq!(adapter.sends(), 0);
        assert_eq!(adapter.validations(), 1);
    }

    #[tokio::test]
    async fn test_unknown_provider_keeps_previous_config() {
        let adapter = CountingAdapter::new(Provider::OpenAi, Reply::EchoModel);
        let service = service_with(adapter.clone());
        assert!(service.set_config(openai("gpt-4")));

        let rejected = service.apply_settings(ProviderSettings {
            provider: "gemini".into(),
            api_key: Some("key".into()),
            model: "gemini-pro".into(),
            ..Default::default()
        });
        assert!(!rejected);

        let result = service.chat(&[ChatMessage::user("still there?")]).await;
        assert!(result.success);
        assert_eq!(result.model, "gpt-4");
    }

    #[tokio::test]
    async fn test_provider_without_adapter_is_rejected() {
        let adapter = CountingAdapter::new(Provider::OpenAi, Reply::EchoModel);
        let service = service_with(adapter.clone());
        assert!(service.set_config(openai("gpt-4")));

        let claude = ProviderConfig::new(Provider::Claude, "claude-3-haiku-20240307").with_api_key("k");
        assert!(matches!(
            service.try_set_config(claude),
            Err(AiError::UnknownProvider(_))
        ));
        assert_eq!(service.current_config().unwrap().model, "gpt-4");
    }

    #[test]
    fn test_out_of_range_values_never_reach_adapter() {
        let adapter = CountingAdapter::new(Provider::OpenAi, Reply::EchoModel);
        let service = service_with(adapter.clone());

        assert!(!service.set_config(openai("gpt-4").with_temperature(2.5)));
        assert!(!service.set_config(openai("gpt-4").with_max_tokens(0)));
        assert_eq!(adapter.validations(), 0);
        assert!(!service.is_enabled());
    }

    #[test]
    fn test_adapter_validation_failure_keeps_previous() {
        let adapter = CountingAdapter::new(Provider::OpenAi, Reply::EchoModel);
        let service = service_with(adapter.clone());
        assert!(service.set_config(openai("gpt-4")));

        let keyless = ProviderConfig::new(Provider::OpenAi, "gpt-3.5-turbo");
        let err = service.try_set_config(keyless).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("API key is required"));
        assert_eq!(service.current_config().unwrap().model, "gpt-4");
    }

    #[tokio::test]
    async fn test_backend_failure_is_folded_into_result() {
        let adapter = CountingAdapter::new(Provider::OpenAi, Reply::Status(503));
        let service = service_with(adapter.clone());
        assert!(service.set_config(openai("gpt-4")));

        let result = service.chat(&[ChatMessage::user("hi")]).await;
        assert!(!result.success);
        assert!(result.content.is_empty());
        assert_eq!(result.error.as_deref(), Some("API Error: 503"));
        assert_eq!(result.provider, "openai");

        let err = service.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, AiError::Backend { status: 503 }));
        assert_eq!(adapter.sends(), 2);
    }

    #[tokio::test]
    async fn test_empty_conversation_is_rejected_locally() {
        let adapter = CountingAdapter::new(Provider::OpenAi, Reply::EchoModel);
        let service = service_with(adapter.clone());
        assert!(service.set_config(openai("gpt-4")));

        let result = service.chat(&[]).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No messages to send"));
        assert_eq!(adapter.sends(), 0);
    }

    #[tokio::test]
    async fn test_in_flight_chat_keeps_its_config() {
        let adapter = CountingAdapter::new(Provider::OpenAi, Reply::Slow(Duration::from_millis(50)));
        let service = service_with(adapter.clone());
        assert!(service.set_config(openai("model-a")));

        let messages = [ChatMessage::user("hi")];
        let (result, swapped) = tokio::join!(service.chat(&messages), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            service.set_config(openai("model-b"))
        });

        assert!(swapped);
        assert_eq!(result.model, "model-a");
        assert_eq!(result.content, "answered by model-a");
        assert_eq!(service.current_config().unwrap().model, "model-b");
    }

    #[tokio::test]
    async fn test_concurrent_chats_share_one_config() {
        let adapter = CountingAdapter::new(Provider::OpenAi, Reply::EchoModel);
        let service = service_with(adapter.clone());
        assert!(service.set_config(openai("gpt-4")));

        let messages = [ChatMessage::user("hi")];
        let results = futures::future::join_all((0..8).map(|_| service.chat(&messages))).await;
        assert!(results.iter().all(|r| r.success && r.model == "gpt-4"));
        assert_eq!(adapter.sends(), 8);
    }

    #[tokio::test]
    async fn test_ask_adds_context_as_system_turn() {
        let adapter = CountingAdapter::new(Provider::Ollama, Reply::EchoModel);
        let service = service_with(adapter.clone());
        assert!(service.set_config(ProviderConfig::new(Provider::Ollama, "llama2")));

        service.ask("How many open tickets?", "").await;
        assert_eq!(
            *adapter.last_messages.lock().unwrap(),
            vec![ChatMessage::user("How many open tickets?")]
        );

        service
            .ask_about_client("42", "Is this client active?", &json!({"name": "ACME", "active": true}))
            .await;
        let sent = adapter.last_messages.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].role, crate::models::Role::System);
        assert!(sent[0].content.contains("client ID 42"));
        assert!(sent[0].content.contains("\"name\": \"ACME\""));
        assert_eq!(sent[1], ChatMessage::user("Is this client active?"));
    }

    #[tokio::test]
    async fn test_connection_report() {
        let adapter = CountingAdapter::new(Provider::OpenAi, Reply::EchoModel);
        let service = service_with(adapter.clone());

        let report = service.test_connection().await;
        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some("AI not configured or enabled"));
        assert_eq!(adapter.sends(), 0);

        assert!(service.set_config(openai("gpt-4")));
        let report = service.test_connection().await;
        assert!(report.success);
        assert_eq!(report.ai_response.as_deref(), Some("answered by gpt-4"));
        assert_eq!(report.provider, "openai");
    }

    #[tokio::test]
    async fn test_failed_connection_report() {
        let adapter = CountingAdapter::new(Provider::OpenAi, Reply::Status(401));
        let service = service_with(adapter);
        assert!(service.set_config(openai("gpt-4")));

        let report = service.test_connection().await;
        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some("AI response error: API Error: 401"));
    }

    #[test]
    fn test_catalog_queries() {
        let service = AiService::with_http_config(&HttpConfig::default()).unwrap();
        assert_eq!(
            service.list_providers(),
            vec!["openai", "deepseek", "claude", "ollama", "generic_openai"]
        );
        assert_eq!(
            service.list_models("claude"),
            vec![
                "claude-3-sonnet-20240229",
                "claude-3-haiku-20240307",
                "claude-3-opus-20240229"
            ]
        );
        assert!(service.list_models("generic_openai").is_empty());
        assert!(service.list_models("unknown").is_empty());

        let info = service.provider_info();
        let ollama = info.iter().find(|p| p.id == "ollama").unwrap();
        assert!(!ollama.requires_api_key);
        assert!(ollama.local);
    }

    #[test]
    fn test_builtin_adapter_rules_through_service() {
        let service = AiService::with_http_config(&HttpConfig::default()).unwrap();

        assert!(service.set_config(ProviderConfig::new(Provider::Ollama, "llama2")));
        assert!(!service.set_config(ProviderConfig::new(Provider::Claude, "claude-3-opus-20240229")));
        assert!(!service.set_config(
            ProviderConfig::new(Provider::GenericOpenAi, "qwen2").with_api_key("k")
        ));
        assert_eq!(
            service.current_config().unwrap().provider,
            Provider::Ollama
        );
    }

    #[tokio::test]
    async fn test_end_to_end_backend_error() {
        let backend = MockBackend::json(500, json!({"error": "internal"})).await;
        let adapter = OpenAiAdapter::new(&HttpConfig::default())
            .unwrap()
            .with_endpoint(backend.url("/v1/chat/completions"));
        let service = AiService::new(AdapterRegistry::empty().register(Arc::new(adapter)));
        assert!(service.set_config(openai("gpt-4")));

        let result = service.chat(&[ChatMessage::user("hi")]).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("500"));
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_end_to_end_missing_content() {
        let backend = MockBackend::json(200, json!({"choices": []})).await;
        let adapter = OpenAiAdapter::new(&HttpConfig::default())
            .unwrap()
            .with_endpoint(backend.url("/v1/chat/completions"));
        let service = AiService::new(AdapterRegistry::empty().register(Arc::new(adapter)));
        assert!(service.set_config(openai("gpt-4")));

        let result = service.chat(&[ChatMessage::user("hi")]).await;
        assert!(!result.success);
        assert!(result.content.is_empty());
        assert!(result.error.is_some());
    }
}
