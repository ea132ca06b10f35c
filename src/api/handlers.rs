//! API request handlers

use axum::http::StatusCode;
use serde_json::Value;

use super::models::{AnalyzeRequest, AnalyzeResponse, GenerateRequest, GenerateResponse};
use crate::analyzer::VideoAnalyzer;
use crate::generator::VideoGenerator;

/// Handle health check requests
pub async fn health_check() -> Value {
    serde_json::json!({
        "status": "healthy",
        "service": "video-analyzer",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })
}

/// Handle video analysis requests
pub async fn analyze_video(analyzer: &VideoAnalyzer, request: AnalyzeRequest) -> (StatusCode, AnalyzeResponse) {
    match analyzer.run(request).await {
        Ok(analysis) => (StatusCode::OK, analysis.into()),
        Err(failure) => (failure.error.status_code(), AnalyzeResponse::from(&failure)),
    }
}

/// Handle video generation requests
pub async fn generate_video(generator: &VideoGenerator, request: GenerateRequest) -> (StatusCode, GenerateResponse) {
    match generator.run(request).await {
        Ok(video) => (StatusCode::OK, GenerateResponse::success(video.video_url)),
        Err(error) => (
            error.status_code(),
            GenerateResponse::error(VideoGenerator::failure_message(&error)),
        ),
    }
}
