pub mod gateway;
pub mod metrics;
pub mod orchestrator;
pub mod providers;
pub mod response;

pub use gateway::{GatewaySettings, LlmCallResult, LlmGateway};
pub use orchestrator::ChatOrchestrator;
