//! Video Analyzer
//!
//! HTTP gateway that forwards videos to Gemini for analysis and reference
//! images to fal.ai for video generation.

pub mod analyzer;
pub mod api;
pub mod config;
pub mod error;
pub mod gemini;
pub mod generation;
pub mod generator;
pub mod prompts;
pub mod video;

// Re-export main types for easy access
pub use crate::analyzer::{Analysis, AnalysisFailure, VideoAnalyzer};
pub use crate::api::models::{AnalyzeRequest, AnalyzeResponse, GenerateRequest, GenerateResponse};
pub use crate::api::{build_router, ApiServer, AppState};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{AnalyzerError, AnalyzerResult};
pub use crate::gemini::{GeminiClient, VideoUnderstanding};
pub use crate::generation::{FalClient, GenerationArguments, Resolution, VideoDuration, VideoGeneration};
pub use crate::generator::VideoGenerator;
pub use crate::prompts::PromptStyle;
pub use crate::video::{ClipRange, SourceFetcher, VideoFetcher, VideoPayload, VideoSource};
