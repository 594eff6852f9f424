use axum::{response::IntoResponse, Json};
use serde_json::json;

use crate::models::HealthResponse;

/// Service description
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service name, version and entry points")
    ),
    tag = "Observability"
)]
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "SMA Medical Assistant API",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/docs",
        "health": "/api/health",
        "chat": "/api/chat"
    }))
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "Observability"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
