//! Safe replies for when no trustworthy answer can be produced.

use crate::models::ChatResponse;

pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "I apologize, but I'm having trouble processing your request right now.";

pub const INVALID_FORMAT_MESSAGE: &str = "I received an invalid response format.";

pub const UNEXPECTED_ERROR_MESSAGE: &str =
    "An unexpected error occurred while processing your request.";

const FALLBACK_SUFFIX: &str = "Please try rephrasing your question about Spinal Muscular Atrophy (SMA), or contact a healthcare professional for immediate assistance.";

/// Build a zero-confidence reply, using the default apology when `message` is `None`.
pub fn fallback_response(message: Option<&str>) -> ChatResponse {
    let message = message.unwrap_or(DEFAULT_FALLBACK_MESSAGE);
    ChatResponse::trusted(format!("{} {}", message, FALLBACK_SUFFIX), 0.0)
}
