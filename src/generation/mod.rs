//! Reference-to-video generation

pub mod fal;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AnalyzerResult;

pub use fal::FalClient;

/// Output resolution of a generated video
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

/// Length of a generated video; the model only offers eight seconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum VideoDuration {
    #[default]
    #[serde(rename = "8s")]
    Seconds8,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::P720 => "720p",
            Resolution::P1080 => "1080p",
        }
    }
}

impl VideoDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoDuration::Seconds8 => "8s",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for VideoDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "720p" => Ok(Resolution::P720),
            "1080p" => Ok(Resolution::P1080),
            other => Err(format!("unsupported resolution '{}' (expected 720p or 1080p)", other)),
        }
    }
}

impl std::str::FromStr for VideoDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "8s" => Ok(VideoDuration::Seconds8),
            other => Err(format!("unsupported duration '{}' (expected 8s)", other)),
        }
    }
}

/// Arguments sent to the generation model, in its own field names
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationArguments {
    pub image_urls: Vec<String>,
    pub prompt: String,
    pub duration: VideoDuration,
    pub resolution: Resolution,
    pub generate_audio: bool,
}

/// A finished generation
#[derive(Debug, Clone)]
pub struct GeneratedVideo {
    pub video_url: String,
    /// Full model output, saved by `generate --output`
    pub raw: serde_json::Value,
}

/// The video-generation service as seen by the generator
#[async_trait]
pub trait VideoGeneration: Send + Sync {
    async fn generate(&self, arguments: &GenerationArguments) -> AnalyzerResult<GeneratedVideo>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_value(Resolution::P1080).unwrap(), json!("1080p"));
        assert_eq!(serde_json::to_value(VideoDuration::default()).unwrap(), json!("8s"));
        assert_eq!(serde_json::from_value::<Resolution>(json!("720p")).unwrap(), Resolution::P720);
        assert!(serde_json::from_value::<Resolution>(json!("4k")).is_err());
        assert!("10s".parse::<VideoDuration>().is_err());
    }

    #[test]
    fn test_arguments_json() {
        let arguments = GenerationArguments {
            image_urls: vec!["https://img/a.png".into(), "https://img/b.png".into()],
            prompt: "The dog runs".into(),
            duration: VideoDuration::Seconds8,
            resolution: Resolution::P1080,
            generate_audio: false,
        };

        assert_eq!(
            serde_json::to_value(&arguments).unwrap(),
            json!({
                "image_urls": ["https://img/a.png", "https://img/b.png"],
                "prompt": "The dog runs",
                "duration": "8s",
                "resolution": "1080p",
                "generate_audio": false
            })
        );
    }
}
