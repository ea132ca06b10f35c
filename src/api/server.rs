//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use super::{
    handlers,
    models::{AnalyzeRequest, AnalyzeResponse, GenerateRequest, GenerateResponse},
};
use crate::analyzer::VideoAnalyzer;
use crate::generator::VideoGenerator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<VideoAnalyzer>,
    pub generator: Arc<VideoGenerator>,
    pub max_body_bytes: usize,
}

/// Build the router with all routes and layers
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);

    Router::new()
        .route("/health", get(health_handler))
        .route("/analyze", post(analyze_handler))
        .route("/generate", post(generate_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(body_limit),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    info!("🌐 API server listening on http://{}:{}", host, port);
    info!("🔗 Endpoints: POST /analyze, POST /generate, GET /health");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Answer a body the extractor refused with the usual `{success:false}` envelope
fn rejection_response<T: Serialize>(rejection: JsonRejection, envelope: impl FnOnce(String) -> T) -> Response {
    warn!("Rejected request body: {}", rejection.body_text());
    let status = match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(envelope(rejection.body_text()))).into_response()
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::health_check().await))
}

/// Video analysis handler
async fn analyze_handler(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => return rejection_response(rejection, AnalyzeResponse::error),
    };

    let (status, response) = handlers::analyze_video(&state.analyzer, request).await;
    (status, Json(response)).into_response()
}

/// Video generation handler
async fn generate_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => return rejection_response(rejection, GenerateResponse::error),
    };

    let (status, response) = handlers::generate_video(&state.generator, request).await;
    (status, Json(response)).into_response()
}
