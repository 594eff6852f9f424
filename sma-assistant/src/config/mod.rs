use serde::Deserialize;
use service_core::config::{self as core_config, get_env, is_production};
use service_core::error::AppError;
use std::path::PathBuf;
use std::time::Duration;

/// Value shipped in `.env.example`; a key still set to it has not been filled in.
pub const PLACEHOLDER_API_KEY: &str = "your_google_api_key_here";

/// Sampling temperature, kept low for consistent medical answers.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Maximum number of output tokens per reply.
pub const DEFAULT_MAX_OUTPUT_TOKENS: i32 = 1000;

/// Per-attempt timeout for the model call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub cors_origins: Vec<String>,
    pub google: GoogleConfig,
    pub model: ModelConfig,
    pub system_prompt_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Model identifier passed to the provider (e.g., gemini-2.0-flash)
    pub name: String,
    pub temperature: f32,
    pub max_output_tokens: i32,
    #[serde(skip, default = "default_call_timeout")]
    pub call_timeout: Duration,
}

fn default_call_timeout() -> Duration {
    DEFAULT_CALL_TIMEOUT
}

impl AssistantConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = is_production();

        let api_key = get_env("GOOGLE_API_KEY", None, is_prod)?;
        if api_key.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GOOGLE_API_KEY is set but empty"
            )));
        }
        if api_key == PLACEHOLDER_API_KEY {
            tracing::warn!("GOOGLE_API_KEY is still the placeholder value; model calls will fail");
        }

        Ok(AssistantConfig {
            common: common_config,
            cors_origins: parse_origins(&get_env(
                "CORS_ORIGINS",
                Some("http://localhost:4200"),
                is_prod,
            )?),
            google: GoogleConfig { api_key },
            model: ModelConfig {
                name: get_env("GEMMA_MODEL_NAME", Some("gemini-2.0-flash"), is_prod)?,
                temperature: DEFAULT_TEMPERATURE,
                max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
                call_timeout: DEFAULT_CALL_TIMEOUT,
            },
            system_prompt_path: get_env(
                "SYSTEM_PROMPT_PATH",
                Some("sma-assistant/system_prompt.txt"),
                is_prod,
            )?
            .into(),
        })
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("http://localhost:4200, https://example.org ,,"),
            vec!["http://localhost:4200", "https://example.org"]
        );
    }

    #[test]
    fn test_parse_origins_empty() {
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        std::env::remove_var("GOOGLE_API_KEY");

        let err = AssistantConfig::load().unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }
}
