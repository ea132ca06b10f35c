//! API module for the video analyzer
//!
//! Exposes analysis and generation over HTTP.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::analyzer::VideoAnalyzer;
use crate::config::Config;
use crate::generator::VideoGenerator;

pub mod handlers;
pub mod models;
pub mod server;

pub use server::{build_router, AppState};

/// API server wrapping the analyzer and generator
pub struct ApiServer {
    state: AppState,
    host: String,
    port: u16,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(analyzer: Arc<VideoAnalyzer>, generator: Arc<VideoGenerator>, config: &Config) -> Self {
        Self {
            state: AppState {
                analyzer,
                generator,
                max_body_bytes: config.server.max_body_bytes,
            },
            host: config.server.host.clone(),
            port: config.server.port,
        }
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        info!("🚀 Starting API server on {}:{}", self.host, self.port);
        server::start_http_server(self.state, &self.host, self.port).await
    }
}
