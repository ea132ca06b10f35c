//! REST client for the Generative Language API (generateContent + File API)

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{ContentPart, UploadedFile, VideoMetadata, VideoUnderstanding};
use crate::config::GeminiConfig;
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::video::VideoPayload;

const SERVICE: &str = "Gemini";

/// Gemini API client
pub struct GeminiClient {
    api_key: Option<String>,
    base_url: String,
    poll_interval: Duration,
    poll_attempts: u32,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_metadata: Option<VideoMetadata>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    file_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    file: FileResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    uri: String,
    mime_type: Option<String>,
    state: Option<String>,
    error: Option<FileError>,
}

#[derive(Debug, Deserialize)]
struct FileError {
    message: Option<String>,
}

impl From<ContentPart> for Part {
    fn from(part: ContentPart) -> Self {
        match part {
            ContentPart::Text(text) => Part {
                text: Some(text),
                ..Part::default()
            },
            ContentPart::InlineData { mime_type, data } => Part {
                inline_data: Some(Blob {
                    mime_type,
                    data: BASE64.encode(data),
                }),
                ..Part::default()
            },
            ContentPart::FileData {
                file_uri,
                mime_type,
                video_metadata,
            } => Part {
                file_data: Some(FileData { file_uri, mime_type }),
                video_metadata,
                ..Part::default()
            },
        }
    }
}

fn build_request(parts: Vec<ContentPart>) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts: parts.into_iter().map(Part::from).collect(),
        }],
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GenerateContentResponse) -> AnalyzerResult<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(AnalyzerError::upstream(SERVICE, format!("prompt blocked: {}", reason)));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AnalyzerError::upstream(SERVICE, "No candidates in Gemini response"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(AnalyzerError::upstream(
            SERVICE,
            format!("No content in Gemini response (finish reason: {})", reason),
        ));
    }

    Ok(text)
}

/// Accept both `gemini-2.5-flash` and `models/gemini-2.5-flash`
fn model_path(model: &str) -> String {
    format!("models/{}", model.strip_prefix("models/").unwrap_or(model))
}

async fn ensure_success(response: reqwest::Response) -> AnalyzerResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    Err(AnalyzerError::from_status(SERVICE, status, text))
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> AnalyzerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(config.file_poll_interval_ms),
            poll_attempts: config.file_poll_attempts,
            client,
        })
    }

    fn api_key(&self) -> AnalyzerResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AnalyzerError::Configuration("GOOGLE_API_KEY is not set".to_string()))
    }

    /// Poll a freshly uploaded file until processing finishes
    async fn wait_until_active(&self, mut file: FileResource) -> AnalyzerResult<FileResource> {
        let api_key = self.api_key()?;
        let mut checks = 0;

        loop {
            let state = file.state.clone();
            match state.as_deref() {
                None | Some("ACTIVE") => return Ok(file),
                Some("FAILED") => {
                    let message = file
                        .error
                        .and_then(|e| e.message)
                        .unwrap_or_else(|| "file processing failed".to_string());
                    return Err(AnalyzerError::upstream(SERVICE, message));
                }
                Some(state) => {
                    debug!("File {} is {} (check {}/{})", file.name, state, checks, self.poll_attempts);
                }
            }

            if checks >= self.poll_attempts {
                let waited = self.poll_interval.as_millis() as u64 * u64::from(self.poll_attempts) / 1000;
                return Err(AnalyzerError::Timeout(waited));
            }
            checks += 1;

            tokio::time::sleep(self.poll_interval).await;

            let url = format!("{}/v1beta/{}", self.base_url, file.name);
            let response = self
                .client
                .get(&url)
                .header("x-goog-api-key", api_key)
                .send()
                .await?;
            file = ensure_success(response).await?.json().await?;
        }
    }
}

#[async_trait]
impl VideoUnderstanding for GeminiClient {
    async fn upload_file(&self, payload: &VideoPayload, display_name: &str) -> AnalyzerResult<UploadedFile> {
        let api_key = self.api_key()?;
        info!("☁️  Uploading video to Gemini File API ({:.2} MB)", payload.size_mb());

        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header("x-goog-api-key", api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", payload.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", payload.mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;
        let start = ensure_success(start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AnalyzerError::upstream(SERVICE, "upload session did not return an upload URL"))?;

        let finished = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(payload.bytes.clone())
            .send()
            .await?;
        let envelope: FileEnvelope = ensure_success(finished).await?.json().await?;

        let file = self.wait_until_active(envelope.file).await?;
        info!("✅ Upload complete: {}", file.name);

        Ok(UploadedFile {
            mime_type: file.mime_type.unwrap_or_else(|| payload.mime_type.to_string()),
            name: file.name,
            uri: file.uri,
        })
    }

    async fn generate_content(&self, model: &str, parts: Vec<ContentPart>) -> AnalyzerResult<String> {
        let api_key = self.api_key()?;
        let url = format!("{}/v1beta/{}:generateContent", self.base_url, model_path(model));

        debug!("Sending request to Gemini API ({})", model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&build_request(parts))
            .send()
            .await?;

        let response: GenerateContentResponse = ensure_success(response).await?.json().await?;
        extract_text(response)
    }
}
