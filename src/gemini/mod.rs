//! Video understanding through the Gemini API

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AnalyzerResult;
use crate::video::{ClipRange, VideoPayload};

pub use client::GeminiClient;

/// Clip window attached to a file part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<String>,
}

impl VideoMetadata {
    /// `None` when neither offset is set, so no metadata is sent at all
    pub fn from_clip(clip: &ClipRange) -> Option<Self> {
        if clip.is_empty() {
            return None;
        }
        Some(Self {
            start_offset: clip.start_offset.clone(),
            end_offset: clip.end_offset.clone(),
        })
    }
}

/// One part of a multimodal request
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    InlineData {
        mime_type: String,
        data: Vec<u8>,
    },
    FileData {
        file_uri: String,
        mime_type: Option<String>,
        video_metadata: Option<VideoMetadata>,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text(text.into())
    }

    pub fn inline(payload: &VideoPayload) -> Self {
        ContentPart::InlineData {
            mime_type: payload.mime_type.to_string(),
            data: payload.bytes.clone(),
        }
    }

    pub fn uploaded(file: &UploadedFile) -> Self {
        ContentPart::FileData {
            file_uri: file.uri.clone(),
            mime_type: Some(file.mime_type.clone()),
            video_metadata: None,
        }
    }

    pub fn youtube(url: &str, clip: &ClipRange) -> Self {
        ContentPart::FileData {
            file_uri: url.to_string(),
            mime_type: None,
            video_metadata: VideoMetadata::from_clip(clip),
        }
    }
}

/// Handle to a video staged in the File API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Resource name, e.g. `files/abc123`
    pub name: String,
    pub uri: String,
    pub mime_type: String,
}

/// The video-understanding service as seen by the analyzer
#[async_trait]
pub trait VideoUnderstanding: Send + Sync {
    /// Stage a large video and wait until it can be referenced
    async fn upload_file(&self, payload: &VideoPayload, display_name: &str) -> AnalyzerResult<UploadedFile>;

    /// Run the model over the given parts and return its text
    async fn generate_content(&self, model: &str, parts: Vec<ContentPart>) -> AnalyzerResult<String>;
}
