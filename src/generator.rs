//! Reference-to-video generation orchestration

use std::sync::Arc;
use tracing::{info, warn};

use crate::api::models::{GenerateRequest, GenerateResponse};
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::generation::{GeneratedVideo, GenerationArguments, VideoGeneration};

pub struct VideoGenerator {
    generation: Arc<dyn VideoGeneration>,
    generate_audio_default: bool,
}

impl VideoGenerator {
    pub fn new(generation: Arc<dyn VideoGeneration>, generate_audio_default: bool) -> Self {
        Self {
            generation,
            generate_audio_default,
        }
    }

    /// Answer a generation request. Failures are folded into the response.
    pub async fn generate(&self, request: GenerateRequest) -> GenerateResponse {
        match self.run(request).await {
            Ok(video) => GenerateResponse::success(video.video_url),
            Err(error) => GenerateResponse::error(Self::failure_message(&error)),
        }
    }

    pub fn failure_message(error: &AnalyzerError) -> String {
        if error.is_client_error() {
            error.to_string()
        } else {
            format!("Video generation failed: {}", error)
        }
    }

    /// Validate the request and run the generation
    pub async fn run(&self, request: GenerateRequest) -> AnalyzerResult<GeneratedVideo> {
        let arguments = self.arguments(request)?;
        self.generation.generate(&arguments).await.map_err(|error| {
            warn!("Video generation failed: {}", error);
            error
        })
    }

    fn arguments(&self, request: GenerateRequest) -> AnalyzerResult<GenerationArguments> {
        let image_urls: Vec<String> = request
            .image_urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .collect();

        if image_urls.is_empty() {
            return Err(AnalyzerError::invalid_request("At least one image URL must be provided"));
        }
        if image_urls.iter().any(|url| url.is_empty()) {
            return Err(AnalyzerError::invalid_request("Image URLs must not be blank"));
        }
        if request.prompt.trim().is_empty() {
            return Err(AnalyzerError::invalid_request("A prompt must be provided"));
        }

        let generate_audio = request.generate_audio.unwrap_or(self.generate_audio_default);
        info!(
            "🎞️ Generation request: {} image(s), {}, {}, audio={}",
            image_urls.len(),
            request.resolution,
            request.duration,
            generate_audio
        );

        Ok(GenerationArguments {
            image_urls,
            prompt: request.prompt,
            duration: request.duration,
            resolution: request.resolution,
            generate_audio,
        })
    }
}
