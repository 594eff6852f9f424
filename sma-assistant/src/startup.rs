//! Application startup and lifecycle management.

use crate::config::AssistantConfig;
use crate::handlers::{
    self,
    chat::chat,
    health::{health_check, root},
    metrics::metrics,
    not_found,
};
use crate::models::{ChatRequest, ChatResponse, HealthResponse};
use crate::services::gateway::{load_system_prompt, GatewaySettings, LlmGateway};
use crate::services::metrics::{record_chat_outcome, Outcome};
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider, GEMINI_API_BASE};
use crate::services::providers::TextProvider;
use crate::services::response::fallback::{fallback_response, UNEXPECTED_ERROR_MESSAGE};
use crate::services::ChatOrchestrator;
use axum::{
    http::{Method, StatusCode},
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, REQUEST_ID_HEADER};
use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Path of the generated OpenAPI document.
pub const OPENAPI_PATH: &str = "/openapi.json";

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::root,
        handlers::health::health_check,
        handlers::chat::chat,
    ),
    components(schemas(ChatRequest, ChatResponse, HealthResponse)),
    tags(
        (name = "Chat", description = "Questions about Spinal Muscular Atrophy"),
        (name = "Observability", description = "Service health and description"),
    ),
    info(
        title = "SMA Medical Assistant API",
        description = "Answers questions about Spinal Muscular Atrophy using a hosted language model"
    )
)]
pub struct ApiDoc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: ChatOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}

/// 500 reply for a panic outside the orchestrator.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = err
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| err.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(error = %details, "Unhandled exception while serving request");
    record_chat_outcome(Outcome::Fallback);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(fallback_response(Some(UNEXPECTED_ERROR_MESSAGE))),
    )
        .into_response()
}

/// Every origin is accepted. Origins and request headers are mirrored
/// because tower-http rejects wildcards combined with credentials.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        .route("/api/chat", post(chat))
        .route("/metrics", get(metrics))
        .merge(SwaggerUi::new("/docs").url(OPENAPI_PATH, ApiDoc::openapi()))
        .fallback(not_found)
        .layer(cors_layer())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application against the Gemini API.
    pub async fn build(config: AssistantConfig) -> Result<Self, AppError> {
        let gemini_config = GeminiConfig {
            api_key: config.google.api_key.clone(),
            model: config.model.name.clone(),
            base_url: GEMINI_API_BASE.to_string(),
            timeout: config.model.call_timeout,
        };
        let provider = GeminiTextProvider::new(gemini_config).map_err(|e| {
            tracing::error!("Failed to initialize Gemini provider: {}", e);
            AppError::ConfigError(anyhow::anyhow!(e))
        })?;

        tracing::info!(model = %config.model.name, "Initialized Gemini text provider");

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application with an explicit model provider.
    pub async fn build_with_provider(
        config: AssistantConfig,
        provider: Arc<dyn TextProvider>,
    ) -> Result<Self, AppError> {
        let system_prompt = load_system_prompt(&config.system_prompt_path);
        let gateway = LlmGateway::new(
            provider,
            system_prompt,
            GatewaySettings::from(&config.model),
        );
        let state = AppState::new(ChatOrchestrator::new(gateway));

        tracing::info!(
            cors_origins = ?config.cors_origins,
            "Configured CORS origins are superseded by the allow-all policy"
        );

        // Port 0 = random port for testing
        let addr = format!("{}:{}", config.common.host, config.common.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("SMA assistant listening on {}:{}", config.common.host, port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until Ctrl+C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.run_with_shutdown(shutdown_signal()).await
    }

    /// Run until `shutdown` resolves, letting in-flight requests finish.
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = build_router(self.state);

        axum::serve(
            self.listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| {
            tracing::error!("HTTP server error: {}", e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn exploding() -> &'static str {
        panic!("handler exploded")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_panic_outside_orchestrator_returns_500_fallback() {
        let app = Router::new()
            .route("/boom", get(exploding))
            .layer(CatchPanicLayer::custom(handle_panic));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/boom")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["answer"]
            .as_str()
            .unwrap()
            .starts_with("An unexpected error occurred while processing your request."));
        assert_eq!(body["confidence"], 0.0);
        assert!(body["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_panic_with_owned_message_returns_500() {
        let response = handle_panic(Box::new(String::from("owned panic message")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(response).await["answer"]
            .as_str()
            .unwrap()
            .contains("unexpected error"));
    }
}
