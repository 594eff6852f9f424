//! Chat request/response models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

/// Longest question accepted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// A question about SMA.
///
/// The message is trimmed on construction and is never blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(try_from = "ChatRequestPayload")]
pub struct ChatRequest {
    #[schema(example = "What is SMA?", min_length = 1, max_length = 2000)]
    #[validate(length(
        min = 1,
        max = 2000,
        message = "Message must be between 1 and 2000 characters and not only whitespace"
    ))]
    message: String,
}

/// Wire shape of a chat request before trimming and validation.
#[derive(Debug, Deserialize)]
pub struct ChatRequestPayload {
    pub message: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Result<Self, ValidationErrors> {
        let request = Self {
            message: message.into().trim().to_string(),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl TryFrom<ChatRequestPayload> for ChatRequest {
    type Error = ValidationErrors;

    fn try_from(payload: ChatRequestPayload) -> Result<Self, Self::Error> {
        Self::new(payload.message)
    }
}

/// Reasons a [`ChatResponse`] cannot be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResponseError {
    #[error("answer cannot be empty")]
    EmptyAnswer,

    #[error("confidence must be between 0.0 and 1.0, got {0}")]
    ConfidenceOutOfRange(f64),
}

/// An answer returned to the caller.
///
/// `answer` is trimmed and non-empty; `confidence` lies in `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChatResponse {
    #[schema(example = "SMA is a genetic disorder affecting motor neurons")]
    answer: String,
    #[schema(example = 0.9, minimum = 0.0, maximum = 1.0)]
    confidence: f64,
    timestamp: DateTime<Utc>,
}

impl ChatResponse {
    /// Build a response stamped with the current time.
    pub fn new(answer: impl Into<String>, confidence: f64) -> Result<Self, ResponseError> {
        Self::with_timestamp(answer, confidence, None)
    }

    /// Build a response, stamping it with the current time when `timestamp` is unset.
    pub fn with_timestamp(
        answer: impl Into<String>,
        confidence: f64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Self, ResponseError> {
        let answer = answer.into().trim().to_string();
        if answer.is_empty() {
            return Err(ResponseError::EmptyAnswer);
        }
        // NaN fails this check too
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ResponseError::ConfidenceOutOfRange(confidence));
        }

        Ok(Self {
            answer,
            confidence,
            timestamp: timestamp.unwrap_or_else(Utc::now),
        })
    }

    /// Build a response from text known to satisfy the invariants.
    pub(crate) fn trusted(answer: impl Into<String>, confidence: f64) -> Self {
        let answer = answer.into().trim().to_string();
        debug_assert!(!answer.is_empty());
        debug_assert!((0.0..=1.0).contains(&confidence));
        Self {
            answer,
            confidence,
            timestamp: Utc::now(),
        }
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Health check response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            timestamp: Utc::now(),
        }
    }
}
