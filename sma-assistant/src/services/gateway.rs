//! Gateway to the external language model.
//!
//! Wraps the user's question in the system instruction, calls the provider
//! with a per-attempt timeout, and retries transient failures with
//! exponential backoff. Failures are reported in the result, never raised.

use crate::config::{
    ModelConfig, DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE,
};
use crate::services::metrics;
use crate::services::providers::{GenerationParams, ProviderError, TextProvider};
use service_core::retry::{retry_with_backoff, RetryConfig};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Instruction used when the system prompt file is missing.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a medical assistant for SMA. Respond only in JSON format:
{"answer": "your response", "confidence": 0.95}"#;

/// Characters of prompt/reply text written to the log.
const LOG_PREVIEW_CHARS: usize = 100;

/// Outcome of one gateway call, after all retries.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmCallResult {
    pub text: Option<String>,
    pub succeeded: bool,
    pub failure_reason: Option<String>,
}

impl LlmCallResult {
    pub fn success(text: Option<String>) -> Self {
        Self {
            text,
            succeeded: true,
            failure_reason: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            text: None,
            succeeded: false,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Fixed call settings.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub params: GenerationParams,
    pub call_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            params: GenerationParams {
                temperature: Some(DEFAULT_TEMPERATURE),
                max_tokens: Some(DEFAULT_MAX_OUTPUT_TOKENS),
            },
            call_timeout: DEFAULT_CALL_TIMEOUT,
            // 3 attempts, waiting 2s then 4s, never more than 10s
            retry: RetryConfig {
                max_retries: 2,
                initial_backoff: Duration::from_secs(2),
                max_backoff: Duration::from_secs(10),
                backoff_multiplier: 2.0,
                add_jitter: false,
            },
        }
    }
}

impl From<&ModelConfig> for GatewaySettings {
    fn from(model: &ModelConfig) -> Self {
        Self {
            params: GenerationParams {
                temperature: Some(model.temperature),
                max_tokens: Some(model.max_output_tokens),
            },
            call_timeout: model.call_timeout,
            ..Default::default()
        }
    }
}

/// Read the system instruction, falling back to [`DEFAULT_SYSTEM_PROMPT`].
pub fn load_system_prompt(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(contents) if !contents.trim().is_empty() => contents.trim().to_string(),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "System prompt file is empty, using default prompt");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "System prompt file not found, using default prompt"
            );
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(LOG_PREVIEW_CHARS).collect()
}

/// Client for the external model. Read-only after construction.
pub struct LlmGateway {
    provider: Arc<dyn TextProvider>,
    system_prompt: String,
    settings: GatewaySettings,
}

impl LlmGateway {
    pub fn new(
        provider: Arc<dyn TextProvider>,
        system_prompt: impl Into<String>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
            settings,
        }
    }

    /// The single prompt sent to the model.
    pub fn compose_prompt(&self, user_message: &str) -> String {
        format!("{}\n\nUser Question: {}", self.system_prompt, user_message)
    }

    /// Send a question to the model.
    pub async fn send(&self, user_message: &str) -> LlmCallResult {
        let provider_name = self.provider.name();
        let prompt = self.compose_prompt(user_message);
        let timeout = self.settings.call_timeout;
        let attempts = AtomicU64::new(0);
        let start = Instant::now();

        tracing::info!(
            provider = provider_name,
            message = %preview(user_message),
            "Sending request to LLM"
        );

        let provider = self.provider.as_ref();
        let params = &self.settings.params;
        let (prompt_ref, attempts_ref) = (prompt.as_str(), &attempts);

        let result = retry_with_backoff(
            &self.settings.retry,
            "generate_content",
            ProviderError::is_transient,
            move || async move {
                attempts_ref.fetch_add(1, Ordering::SeqCst);
                match tokio::time::timeout(timeout, provider.generate(prompt_ref, params)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(timeout)),
                }
            },
        )
        .await;

        metrics::record_llm_retries(attempts.load(Ordering::SeqCst).saturating_sub(1));

        match result {
            Ok(response) => {
                metrics::record_llm_request(
                    provider_name,
                    "success",
                    start.elapsed().as_secs_f64(),
                );
                tracing::info!(
                    provider = provider_name,
                    finish_reason = response.finish_reason.as_str(),
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    reply = %response.text.as_deref().map(preview).unwrap_or_default(),
                    "Received response from LLM"
                );
                LlmCallResult::success(response.text)
            }
            Err(e) => {
                metrics::record_llm_request(provider_name, e.kind(), start.elapsed().as_secs_f64());
                let reason = format!("Error calling {}: {}", provider_name, e);
                tracing::error!(error = %reason, "LLM call failed");
                LlmCallResult::failure(reason)
            }
        }
    }
}
