use ai_dispatch::{AiService, ChatMessage, HttpConfig, ProviderConfig};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    ai_dispatch::logger::init_with_config(
        ai_dispatch::logger::LoggerConfig::development()
            .with_level(ai_dispatch::logger::LogLevel::Info),
    )?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let service = AiService::with_http_config(&HttpConfig::from_env()?)?;

    log::info!("📚 Available providers:");
    for info in service.provider_info() {
        let models = if info.models.is_empty() {
            "configure manually".to_string()
        } else {
            info.models.join(", ")
        };
        log::info!("  {} - {} [{}]", info.id, info.display_name, models);
    }

    let config = match ProviderConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Could not read AI settings from the environment: {}", e);
            log::warn!("💡 Set AI_PROVIDER, AI_MODEL and (except for ollama) AI_API_KEY");
            return Err(e.into());
        }
    };
    ai_dispatch::logger::log_config_info(&config);

    for problem in config.validation_errors() {
        log::warn!("⚠️  {}", problem);
    }
    if !service.set_config(config) {
        return Err("AI configuration was rejected".into());
    }

    log::info!("🔄 Testing AI connection...");
    let report = service.test_connection().await;
    if report.success {
        log::info!(
            "✅ {} ({}/{})",
            report.message.unwrap_or_default(),
            report.provider,
            report.model
        );
        log::info!("📝 {}", report.ai_response.unwrap_or_default());
    } else {
        log::error!("❌ {}", report.error.unwrap_or_default());
        return Ok(());
    }

    let prompt: Vec<String> = env::args().skip(1).collect();
    if !prompt.is_empty() {
        let result = service
            .chat(&[
                ChatMessage::system("You are a concise assistant for a CRM/ERP back office."),
                ChatMessage::user(prompt.join(" ")),
            ])
            .await;
        if result.success {
            println!("{}", result.content);
            if let Some(tokens) = result.tokens_used {
                log::info!("🔢 Tokens used: {}", tokens);
            }
        } else {
            log::error!("❌ Chat failed: {}", result.error.unwrap_or_default());
        }
    }

    Ok(())
}
