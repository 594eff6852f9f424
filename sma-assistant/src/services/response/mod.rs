//! Model output processing.
//!
//! Raw text flows through extraction, validation and the topical check.
//! Each stage returns its own result type; any failure ends in a fallback
//! reply, so processing never fails.

pub mod domain;
pub mod extractor;
pub mod fallback;
pub mod validator;

pub use domain::{is_sma_related, off_topic_response};
pub use extractor::{extract_json, JsonObject};
pub use fallback::{fallback_response, INVALID_FORMAT_MESSAGE};
pub use validator::{validate_response, ValidationFailure};

use crate::models::ChatResponse;
use crate::services::metrics::{self, Outcome};

/// Convert raw model output into the reply sent to the user.
///
/// `user_message` is available for context; the topical check currently
/// looks only at the answer.
pub fn process_llm_response(raw_response: &str, user_message: &str) -> ChatResponse {
    let Some(data) = extract_json(raw_response) else {
        tracing::warn!("Could not extract JSON from LLM response");
        metrics::record_chat_outcome(Outcome::Fallback);
        return fallback_response(Some(INVALID_FORMAT_MESSAGE));
    };

    let response = match validate_response(&data) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "ChatResponse validation failed");
            metrics::record_chat_outcome(Outcome::Fallback);
            return fallback_response(None);
        }
    };

    if !is_sma_related(response.answer()) {
        tracing::warn!(
            question_len = user_message.chars().count(),
            "Response doesn't appear to be SMA-related"
        );
        metrics::record_chat_outcome(Outcome::OffTopic);
        return off_topic_response();
    }

    metrics::record_chat_outcome(Outcome::Answered);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_valid_response() {
        let raw = r#"{"answer": "SMA is a genetic disorder affecting motor neurons", "confidence": 0.9}"#;
        let response = process_llm_response(raw, "What is SMA?");

        assert_eq!(
            response.answer(),
            "SMA is a genetic disorder affecting motor neurons"
        );
        assert_eq!(response.confidence(), 0.9);
    }

    #[test]
    fn test_process_invalid_json() {
        let response = process_llm_response("This is not valid JSON", "What is SMA?");

        assert_eq!(response.confidence(), 0.0);
        assert!(response.answer().contains("invalid response format"));
    }

    #[test]
    fn test_process_non_sma_response() {
        let raw = r#"{"answer": "I like talking about weather", "confidence": 0.9}"#;
        let response = process_llm_response(raw, "Tell me about weather");

        assert_eq!(response.answer(), domain::OFF_TOPIC_ANSWER);
        assert_eq!(response.confidence(), 0.9);
    }

    #[test]
    fn test_process_low_confidence_off_topic_still_redirects_at_fixed_confidence() {
        let raw = r#"{"answer": "Pizza is tasty", "confidence": 0.1}"#;
        let response = process_llm_response(raw, "Food?");
        assert_eq!(response.confidence(), 0.9);
    }

    #[test]
    fn test_process_validation_failure_uses_default_fallback() {
        let raw = r#"{"answer": "SMA info"}"#;
        let response = process_llm_response(raw, "What is SMA?");

        assert_eq!(response.confidence(), 0.0);
        assert!(response.answer().contains("trouble processing"));
    }

    #[test]
    fn test_process_out_of_range_confidence_falls_back() {
        let raw = r#"{"answer": "SMA info", "confidence": 7}"#;
        let response = process_llm_response(raw, "What is SMA?");
        assert_eq!(response.confidence(), 0.0);
    }

    #[test]
    fn test_process_empty_text() {
        let response = process_llm_response("", "What is SMA?");
        assert!(response.answer().contains("invalid response format"));
    }

    #[test]
    fn test_on_topic_question_with_off_topic_answer_is_redirected() {
        let raw = r#"{"answer": "Let's talk about football instead", "confidence": 0.8}"#;
        let response = process_llm_response(raw, "What is SMA type 1?");
        assert_eq!(response.answer(), domain::OFF_TOPIC_ANSWER);
    }
}
