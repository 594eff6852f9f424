//! Turn an extracted JSON object into a [`ChatResponse`].

use super::extractor::JsonObject;
use crate::models::{ChatResponse, ResponseError};
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationFailure {
    #[error("Missing 'answer' field in response")]
    MissingAnswer,

    #[error("Missing 'confidence' field in response")]
    MissingConfidence,

    #[error("Invalid ChatResponse format: {field} {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Invalid ChatResponse format: {0}")]
    Invalid(#[from] ResponseError),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationFailure {
    ValidationFailure::InvalidField {
        field,
        reason: reason.into(),
    }
}

fn answer_field(value: &Value) -> Result<&str, ValidationFailure> {
    value
        .as_str()
        .ok_or_else(|| invalid("answer", "must be a string"))
}

/// Numbers are taken as-is; numeric strings such as `"0.9"` are accepted too.
fn confidence_field(value: &Value) -> Result<f64, ValidationFailure> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid("confidence", "is not representable as a float")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid("confidence", format!("'{}' is not a number", s))),
        _ => Err(invalid("confidence", "must be a number")),
    }
}

fn timestamp_field(value: Option<&Value>) -> Result<Option<DateTime<Utc>>, ValidationFailure> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(|e| invalid("timestamp", e.to_string())),
        Some(_) => Err(invalid("timestamp", "must be an ISO-8601 string")),
    }
}

/// Validate an extracted object and build the response it describes.
///
/// Unknown keys are ignored.
pub fn validate_response(data: &JsonObject) -> Result<ChatResponse, ValidationFailure> {
    let answer = data.get("answer").ok_or(ValidationFailure::MissingAnswer)?;
    let confidence = data
        .get("confidence")
        .ok_or(ValidationFailure::MissingConfidence)?;

    let answer = answer_field(answer)?;
    let confidence = confidence_field(confidence)?;
    let timestamp = timestamp_field(data.get("timestamp"))?;

    Ok(ChatResponse::with_timestamp(answer, confidence, timestamp)?)
}
