//! Video analysis orchestration
//!
//! Turns an analysis request into Gemini content parts. YouTube links are
//! handed to the model by URL; everything else becomes raw bytes, sent
//! inline below the size threshold and through the File API above it.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::models::{AnalyzeRequest, AnalyzeResponse};
use crate::error::AnalyzerError;
use crate::gemini::{ContentPart, VideoUnderstanding};
use crate::video::{size_mb, ClipRange, VideoFetcher, VideoPayload, VideoSource};

pub const MISSING_SOURCE: &str = "Either video_url, video_data, or youtube_url must be provided";

/// A successful analysis
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub text: String,
    pub model: String,
    pub video_size_mb: Option<f64>,
    pub youtube_url: Option<String>,
}

/// A failed analysis, with whatever was known before it failed
#[derive(Debug)]
pub struct AnalysisFailure {
    pub error: AnalyzerError,
    pub video_size_mb: Option<f64>,
    pub youtube_url: Option<String>,
}

impl AnalysisFailure {
    fn new(error: AnalyzerError) -> Self {
        Self {
            error,
            video_size_mb: None,
            youtube_url: None,
        }
    }

    /// Client mistakes are reported as-is; anything past validation is an analysis failure
    pub fn message(&self) -> String {
        if self.error.is_client_error() {
            self.error.to_string()
        } else {
            format!("Analysis failed: {}", self.error)
        }
    }
}

impl std::fmt::Display for AnalysisFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for AnalysisFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<AnalyzerError> for AnalysisFailure {
    fn from(error: AnalyzerError) -> Self {
        Self::new(error)
    }
}

impl From<Analysis> for AnalyzeResponse {
    fn from(analysis: Analysis) -> Self {
        Self {
            success: true,
            analysis: Some(analysis.text),
            model: Some(analysis.model),
            video_size_mb: analysis.video_size_mb,
            youtube_url: analysis.youtube_url,
            error: None,
        }
    }
}

impl From<&AnalysisFailure> for AnalyzeResponse {
    fn from(failure: &AnalysisFailure) -> Self {
        Self {
            video_size_mb: failure.video_size_mb,
            youtube_url: failure.youtube_url.clone(),
            ..AnalyzeResponse::error(failure.message())
        }
    }
}

pub struct VideoAnalyzer {
    understanding: Arc<dyn VideoUnderstanding>,
    fetcher: Arc<dyn VideoFetcher>,
    default_model: String,
    default_prompt: String,
    inline_threshold_mb: f64,
}

impl VideoAnalyzer {
    pub fn new(
        understanding: Arc<dyn VideoUnderstanding>,
        fetcher: Arc<dyn VideoFetcher>,
        default_model: impl Into<String>,
        default_prompt: impl Into<String>,
        inline_threshold_mb: f64,
    ) -> Self {
        Self {
            understanding,
            fetcher,
            default_model: default_model.into(),
            default_prompt: default_prompt.into(),
            inline_threshold_mb,
        }
    }

    /// Answer an analysis request. Failures are folded into the response.
    pub async fn analyze(&self, request: AnalyzeRequest) -> AnalyzeResponse {
        match self.run(request).await {
            Ok(analysis) => analysis.into(),
            Err(failure) => AnalyzeResponse::from(&failure),
        }
    }

    /// Resolve the request's source and analyze it
    pub async fn run(&self, request: AnalyzeRequest) -> Result<Analysis, AnalysisFailure> {
        let source = Self::source_from_request(&request)?;
        self.analyze_source(source, request.prompt.as_deref(), request.model.as_deref())
            .await
    }

    /// `youtube_url` wins over `video_data`, which wins over `video_url`
    fn source_from_request(request: &AnalyzeRequest) -> Result<VideoSource, AnalyzerError> {
        if let Some(url) = non_blank(&request.youtube_url) {
            let clip = ClipRange::new(request.start_offset.clone(), request.end_offset.clone());
            return Ok(VideoSource::YouTube {
                url: url.to_string(),
                clip,
            });
        }

        if let Some(data) = non_blank(&request.video_data) {
            // Wrapped base64 (MIME, `base64` CLI) carries line breaks
            let compact: Vec<u8> = data.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
            let bytes = STANDARD
                .decode(&compact)
                .map_err(|e| AnalyzerError::invalid_request(format!("Invalid base64 video_data: {}", e)))?;
            return Ok(VideoSource::Inline(bytes));
        }

        if let Some(url) = non_blank(&request.video_url) {
            let clip = ClipRange::new(request.start_offset.clone(), request.end_offset.clone());
            return Ok(VideoSource::from_url(url, clip));
        }

        Err(AnalyzerError::invalid_request(MISSING_SOURCE))
    }

    /// Analyze any source; shared by the HTTP endpoint and the CLI
    pub async fn analyze_source(
        &self,
        source: VideoSource,
        prompt: Option<&str>,
        model: Option<&str>,
    ) -> Result<Analysis, AnalysisFailure> {
        let prompt = prompt
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(&self.default_prompt)
            .to_string();
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.default_model)
            .to_string();

        info!("🎥 Analyzing {} with {}", source.describe(), model);

        let (bytes, extension) = match source {
            VideoSource::YouTube { url, clip } => return self.analyze_youtube(url, clip, prompt, model).await,
            VideoSource::Inline(bytes) => (bytes, None),
            VideoSource::Social(url) | VideoSource::Remote(url) => {
                let bytes = self.fetcher.fetch(&url).await?;
                (bytes, url_extension(&url))
            }
            VideoSource::LocalFile(path) => {
                let bytes = VideoPayload::read_file(&path).await?;
                let extension = path.extension().and_then(|e| e.to_str()).map(str::to_string);
                (bytes, extension)
            }
        };

        let video_size_mb = size_mb(bytes.len());
        let known_size = (!bytes.is_empty()).then_some(video_size_mb);
        let payload = VideoPayload::new(bytes, extension.as_deref()).map_err(|error| {
            warn!("Rejected {:.2} MB video: {}", video_size_mb, error);
            AnalysisFailure {
                video_size_mb: known_size,
                ..AnalysisFailure::new(error)
            }
        })?;
        self.analyze_payload(payload, prompt, model.clone())
            .await
            .map(|text| Analysis {
                text,
                model,
                video_size_mb: Some(video_size_mb),
                youtube_url: None,
            })
            .map_err(|error| {
                warn!("Analysis of {:.2} MB video failed: {}", video_size_mb, error);
                AnalysisFailure {
                    video_size_mb: Some(video_size_mb),
                    ..AnalysisFailure::new(error)
                }
            })
    }

    async fn analyze_youtube(
        &self,
        url: String,
        clip: ClipRange,
        prompt: String,
        model: String,
    ) -> Result<Analysis, AnalysisFailure> {
        if !clip.is_empty() {
            info!(
                "✂️ Clipping {} to {:?}..{:?}",
                url, clip.start_offset, clip.end_offset
            );
        }

        let parts = vec![ContentPart::youtube(&url, &clip), ContentPart::text(prompt)];
        match self.understanding.generate_content(&model, parts).await {
            Ok(text) => Ok(Analysis {
                text,
                model,
                video_size_mb: None,
                youtube_url: Some(url),
            }),
            Err(error) => {
                warn!("Analysis of {} failed: {}", url, error);
                Err(AnalysisFailure {
                    youtube_url: Some(url),
                    ..AnalysisFailure::new(error)
                })
            }
        }
    }

    async fn analyze_payload(
        &self,
        payload: VideoPayload,
        prompt: String,
        model: String,
    ) -> Result<String, AnalyzerError> {
        let size_mb = payload.size_mb();

        let video_part = if size_mb < self.inline_threshold_mb {
            info!("📦 Processing video inline ({:.2} MB)", size_mb);
            ContentPart::inline(&payload)
        } else {
            info!("📤 Uploading video to File API ({:.2} MB)", size_mb);
            let display_name = format!("video-analyzer-{}", chrono::Utc::now().timestamp_millis());
            let file = self.understanding.upload_file(&payload, &display_name).await?;
            ContentPart::uploaded(&file)
        };

        let text = self
            .understanding
            .generate_content(&model, vec![video_part, ContentPart::text(prompt)])
            .await?;
        info!("✅ Analysis complete ({} characters)", text.len());
        Ok(text)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn url_extension(url: &str) -> Option<String> {
    let path = url::Url::parse(url).ok()?.path().to_string();
    let name = path.rsplit('/').next()?;
    let (_, extension) = name.rsplit_once('.')?;
    Some(extension.to_string())
}
