use sma_assistant::config::AssistantConfig;
use sma_assistant::services::metrics::init_metrics;
use sma_assistant::startup::Application;

use service_core::config::{get_env, is_production};
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let log_level = get_env("LOG_LEVEL", Some("info"), is_production()).map_err(|e| {
        eprintln!("Failed to read LOG_LEVEL: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;
    let otlp_endpoint = std::env::var("OTLP_ENDPOINT").ok();
    init_tracing(
        "sma-assistant",
        &log_level.to_lowercase(),
        otlp_endpoint.as_deref(),
    );

    init_metrics().map_err(|e| {
        tracing::error!("Failed to initialize metrics: {}", e);
        std::io::Error::other(format!("Metrics error: {}", e))
    })?;

    let config = AssistantConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    application.run_until_stopped().await
}
