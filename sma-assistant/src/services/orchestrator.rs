//! Per-request chat flow: ask the model, then post-process its reply.

use crate::models::{ChatRequest, ChatResponse};
use crate::services::gateway::LlmGateway;
use crate::services::metrics::{self, Outcome};
use crate::services::response::{fallback_response, process_llm_response};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// Turns a validated question into a reply. Never fails.
pub struct ChatOrchestrator {
    gateway: LlmGateway,
}

impl ChatOrchestrator {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }

    /// Answer one question.
    ///
    /// Gateway failures, empty model output and panics inside the flow all
    /// produce the default fallback reply.
    pub async fn handle(&self, request: &ChatRequest) -> ChatResponse {
        match AssertUnwindSafe(self.answer(request.message()))
            .catch_unwind()
            .await
        {
            Ok(response) => response,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(error = %reason, "Error processing chat request");
                metrics::record_chat_outcome(Outcome::Fallback);
                fallback_response(None)
            }
        }
    }

    async fn answer(&self, message: &str) -> ChatResponse {
        let result = self.gateway.send(message).await;

        let text = match result.text {
            Some(text) if result.succeeded && !text.is_empty() => text,
            _ => {
                tracing::error!(
                    error = result.failure_reason.as_deref().unwrap_or("empty response"),
                    "LLM returned no usable text"
                );
                metrics::record_chat_outcome(Outcome::Fallback);
                return fallback_response(None);
            }
        };

        process_llm_response(&text, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gateway::GatewaySettings;
    use crate::services::providers::mock::{MockReply, MockTextProvider};
    use crate::services::providers::ProviderError;
    use service_core::retry::RetryConfig;
    use std::sync::Arc;
    use std::time::Duration;

    fn orchestrator(provider: Arc<MockTextProvider>) -> ChatOrchestrator {
        let settings = GatewaySettings {
            call_timeout: Duration::from_millis(200),
            retry: RetryConfig {
                max_retries: 2,
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(5),
                backoff_multiplier: 2.0,
                add_jitter: false,
            },
            ..Default::default()
        };
        ChatOrchestrator::new(LlmGateway::new(provider, "SYSTEM", settings))
    }

    fn request(message: &str) -> ChatRequest {
        ChatRequest::new(message).unwrap()
    }

    #[tokio::test]
    async fn test_valid_answer_passes_through() {
        let provider = Arc::new(MockTextProvider::replying(
            r#"{"answer": "SMA is caused by loss of the SMN1 gene.", "confidence": 0.95}"#,
        ));
        let response = orchestrator(provider).handle(&request("What causes SMA?")).await;

        assert_eq!(response.answer(), "SMA is caused by loss of the SMN1 gene.");
        assert_eq!(response.confidence(), 0.95);
    }

    #[tokio::test]
    async fn test_fenced_answer_is_extracted() {
        let provider = Arc::new(MockTextProvider::replying(
            "Here you go:\n```json\n{\"answer\": \"Spinraza treats SMA.\", \"confidence\": 0.8}\n```",
        ));
        let response = orchestrator(provider).handle(&request("Treatments?")).await;
        assert_eq!(response.answer(), "Spinraza treats SMA.");
    }

    #[tokio::test]
    async fn test_gateway_failure_returns_default_fallback() {
        let provider = Arc::new(MockTextProvider::failing(ProviderError::NetworkError(
            "connection refused".into(),
        )));
        let response = orchestrator(provider.clone())
            .handle(&request("What is SMA?"))
            .await;

        assert_eq!(provider.calls(), 3);
        assert_eq!(response.confidence(), 0.0);
        assert!(response.answer().contains("trouble processing"));
    }

    #[tokio::test]
    async fn test_empty_model_output_returns_default_fallback() {
        let provider = Arc::new(MockTextProvider::new(vec![MockReply::Empty]));
        let response = orchestrator(provider).handle(&request("What is SMA?")).await;

        assert_eq!(response.confidence(), 0.0);
        assert!(response.answer().contains("trouble processing"));
    }

    #[tokio::test]
    async fn test_whitespace_model_output_is_processed_as_text() {
        let provider = Arc::new(MockTextProvider::replying("   \n "));
        let response = orchestrator(provider).handle(&request("What is SMA?")).await;

        assert_eq!(response.confidence(), 0.0);
        assert!(response.answer().contains("invalid response format"));
    }

    #[tokio::test]
    async fn test_panic_in_flow_returns_default_fallback() {
        let provider = Arc::new(MockTextProvider::new(vec![MockReply::Panic]));
        let response = orchestrator(provider).handle(&request("What is SMA?")).await;

        assert_eq!(response.confidence(), 0.0);
        assert!(response.answer().contains("trouble processing"));
    }

    #[tokio::test]
    async fn test_prose_reply_gets_invalid_format_fallback() {
        let provider = Arc::new(MockTextProvider::replying("SMA is a disease."));
        let response = orchestrator(provider).handle(&request("What is SMA?")).await;
        assert!(response.answer().starts_with("I received an invalid response format."));
    }

    #[tokio::test]
    async fn test_off_topic_answer_is_redirected() {
        let provider = Arc::new(MockTextProvider::replying(
            r#"{"answer": "The capital of France is Paris.", "confidence": 0.99}"#,
        ));
        let response = orchestrator(provider).handle(&request("Capital of France?")).await;

        assert!(response.answer().starts_with("I can only provide information"));
        assert_eq!(response.confidence(), 0.9);
    }
}
