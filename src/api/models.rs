//! API data models

use serde::{Deserialize, Serialize};

use crate::generation::{Resolution, VideoDuration};

/// Body of `POST /analyze`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Direct or social-media video URL
    pub video_url: Option<String>,
    /// Base64 encoded video bytes
    pub video_data: Option<String>,
    pub youtube_url: Option<String>,
    pub prompt: Option<String>,
    pub model: Option<String>,
    /// Clip start, YouTube only ("10s", "1m30s")
    pub start_offset: Option<String>,
    /// Clip end, YouTube only
    pub end_offset: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyzeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_size_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `POST /generate`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub image_urls: Vec<String>,
    pub prompt: String,
    #[serde(default)]
    pub duration: VideoDuration,
    #[serde(default)]
    pub resolution: Resolution,
    /// Falls back to the configured default when omitted
    pub generate_audio: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateResponse {
    pub fn success(video_url: String) -> Self {
        Self {
            success: true,
            video_url: Some(video_url),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            video_url: None,
            error: Some(message),
        }
    }
}

impl AnalyzeResponse {
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            error: Some(message),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_request_defaults() {
        let request: GenerateRequest = serde_json::from_value(json!({
            "image_urls": ["https://img/a.png"],
            "prompt": "wave"
        }))
        .unwrap();

        assert_eq!(request.resolution, Resolution::P720);
        assert_eq!(request.duration, VideoDuration::Seconds8);
        assert_eq!(request.generate_audio, None);
    }

    #[test]
    fn test_generate_request_rejects_bad_resolution() {
        let result = serde_json::from_value::<GenerateRequest>(json!({
            "image_urls": ["https://img/a.png"],
            "prompt": "wave",
            "resolution": "4k"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let value = serde_json::to_value(GenerateResponse::success("https://v/out.mp4".into())).unwrap();
        assert_eq!(value, json!({ "success": true, "video_url": "https://v/out.mp4" }));

        let value = serde_json::to_value(AnalyzeResponse::error("nope".into())).unwrap();
        assert_eq!(value, json!({ "success": false, "error": "nope" }));
    }
}
