//! Integration tests against a running server.
//!
//! The server binds a random port; no model calls are made.
//! Run with: cargo test -p sma-assistant --test health_check

use reqwest::Client;
use sma_assistant::config::AssistantConfig;
use sma_assistant::services::providers::mock::MockTextProvider;
use sma_assistant::startup::Application;
use std::sync::Arc;
use std::time::Duration;

fn test_config() -> AssistantConfig {
    std::env::set_var("ENVIRONMENT", "test");
    std::env::set_var("API_HOST", "127.0.0.1");
    std::env::set_var("API_PORT", "0"); // Random port
    std::env::set_var("GOOGLE_API_KEY", "test-api-key");

    AssistantConfig::load().expect("Failed to load config")
}

async fn spawn(app: Application) -> u16 {
    let port = app.port();

    // Spawn the server in the background
    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    port
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = Application::build(test_config())
        .await
        .expect("Failed to build application");
    let port = spawn(app).await;

    let response = Client::new()
        .get(format!("http://127.0.0.1:{}/api/health", port))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn chat_round_trip_over_tcp() {
    let provider = Arc::new(MockTextProvider::replying(
        r#"{"answer": "SMA is a genetic disorder affecting motor neurons", "confidence": 0.9}"#,
    ));
    let app = Application::build_with_provider(test_config(), provider.clone())
        .await
        .expect("Failed to build application");
    let port = spawn(app).await;

    let response = Client::new()
        .post(format!("http://127.0.0.1:{}/api/chat", port))
        .header("User-Agent", "integration-test")
        .json(&serde_json::json!({ "message": "What is SMA?" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(
        body["answer"],
        "SMA is a genetic disorder affecting motor neurons"
    );
    assert_eq!(body["confidence"], 0.9);
    assert_eq!(provider.calls(), 1);
}
