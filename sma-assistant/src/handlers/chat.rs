use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap},
    Json,
};
use service_core::extract::ValidatedJson;
use std::net::SocketAddr;

use crate::models::{ChatRequest, ChatResponse};
use crate::startup::AppState;

const USER_AGENT_PREVIEW_CHARS: usize = 50;
const MESSAGE_PREVIEW_CHARS: usize = 100;

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Answer a question about SMA.
///
/// Body validation failures are rejected with 422 before this runs; past
/// that point the reply is always a well-formed [`ChatResponse`].
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Answer, off-topic redirect or fallback reply", body = ChatResponse),
        (status = 422, description = "Message missing, blank or longer than 2000 characters"),
        (status = 500, description = "Unexpected server fault", body = ChatResponse)
    ),
    tag = "Chat"
)]
#[tracing::instrument(skip_all)]
pub async fn chat(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<ChatRequest>,
) -> Json<ChatResponse> {
    let client_ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::info!(
        client_ip = %client_ip,
        host = header_str(&headers, header::HOST),
        user_agent = %truncate(header_str(&headers, header::USER_AGENT), USER_AGENT_PREVIEW_CHARS),
        message = %truncate(request.message(), MESSAGE_PREVIEW_CHARS),
        "Chat request received"
    );

    let response = state.orchestrator.handle(&request).await;

    tracing::info!(
        confidence = response.confidence(),
        answer_len = response.answer().chars().count(),
        "Chat request completed"
    );

    Json(response)
}
