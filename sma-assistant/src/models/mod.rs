//! Domain models for the assistant.

pub mod chat;

pub use chat::{ChatRequest, ChatResponse, HealthResponse, ResponseError};
