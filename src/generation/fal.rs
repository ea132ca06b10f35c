//! fal.ai queue client
//!
//! Jobs are submitted to the queue, polled until `COMPLETED`, then the
//! result is fetched from the response URL the queue hands back.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{GeneratedVideo, GenerationArguments, VideoGeneration};
use crate::config::FalConfig;
use crate::error::{AnalyzerError, AnalyzerResult};

const SERVICE: &str = "fal.ai";

pub struct FalClient {
    api_key: Option<String>,
    queue_url: String,
    model_id: String,
    poll_interval: Duration,
    deadline: Duration,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct QueueSubmission {
    request_id: String,
    status_url: Option<String>,
    response_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    status: String,
    queue_position: Option<u32>,
    #[serde(default)]
    logs: Option<Vec<QueueLog>>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueueLog {
    message: String,
}

/// Pull `video.url` out of the model output
fn extract_video_url(result: &serde_json::Value) -> AnalyzerResult<String> {
    result
        .get("video")
        .and_then(|video| video.get("url"))
        .and_then(|url| url.as_str())
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AnalyzerError::upstream(SERVICE, "response did not contain video.url"))
}

async fn ensure_success(response: reqwest::Response) -> AnalyzerResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    Err(AnalyzerError::from_status(SERVICE, status, text))
}

impl FalClient {
    pub fn new(config: &FalConfig) -> AnalyzerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            api_key: config.api_key.clone(),
            queue_url: config.queue_url.trim_end_matches('/').to_string(),
            model_id: config.model_id.trim_matches('/').to_string(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            deadline: Duration::from_secs(config.timeout_seconds),
            client,
        })
    }

    fn auth_header(&self) -> AnalyzerResult<String> {
        self.api_key
            .as_deref()
            .map(|key| format!("Key {}", key))
            .ok_or_else(|| AnalyzerError::Configuration("FAL_KEY is not set".to_string()))
    }

    /// Request URLs live under the app id (owner/name), not the full endpoint path
    fn request_base(&self, request_id: &str) -> String {
        let app_id = self.model_id.splitn(3, '/').take(2).collect::<Vec<_>>().join("/");
        format!("{}/{}/requests/{}", self.queue_url, app_id, request_id)
    }

    async fn submit(&self, auth: &str, arguments: &GenerationArguments) -> AnalyzerResult<QueueSubmission> {
        let url = format!("{}/{}", self.queue_url, self.model_id);
        debug!("Submitting generation to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", auth)
            .json(arguments)
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    async fn wait_for_completion(&self, auth: &str, status_url: &str) -> AnalyzerResult<()> {
        let mut logs_seen = 0;

        loop {
            let response = self
                .client
                .get(status_url)
                .query(&[("logs", "1")])
                .header("Authorization", auth)
                .send()
                .await?;
            let status: QueueStatus = ensure_success(response).await?.json().await?;

            let logs = status.logs.unwrap_or_default();
            for log in logs.iter().skip(logs_seen) {
                debug!("fal: {}", log.message);
            }
            logs_seen = logs_seen.max(logs.len());

            match status.status.as_str() {
                "COMPLETED" => {
                    return match status.error {
                        Some(error) => Err(AnalyzerError::upstream(SERVICE, error)),
                        None => Ok(()),
                    };
                }
                "IN_QUEUE" => {
                    debug!("Generation queued (position {:?})", status.queue_position);
                }
                "IN_PROGRESS" => {}
                other => {
                    return Err(AnalyzerError::upstream(SERVICE, format!("unexpected queue status {}", other)));
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl VideoGeneration for FalClient {
    async fn generate(&self, arguments: &GenerationArguments) -> AnalyzerResult<GeneratedVideo> {
        let auth = self.auth_header()?;
        info!(
            "🎬 Generating {} video from {} reference image(s)",
            arguments.resolution,
            arguments.image_urls.len()
        );

        let submission = self.submit(&auth, arguments).await?;
        let base = self.request_base(&submission.request_id);
        let status_url = submission.status_url.unwrap_or_else(|| format!("{}/status", base));
        let response_url = submission.response_url.unwrap_or(base);

        tokio::time::timeout(self.deadline, self.wait_for_completion(&auth, &status_url))
            .await
            .map_err(|_| AnalyzerError::Timeout(self.deadline.as_secs()))??;

        let response = self
            .client
            .get(&response_url)
            .header("Authorization", &auth)
            .send()
            .await?;
        let raw: serde_json::Value = ensure_success(response).await?.json().await?;
        let video_url = extract_video_url(&raw)?;

        info!("✅ Generated video: {}", video_url);
        Ok(GeneratedVideo { video_url, raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{Resolution, VideoDuration};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(queue_url: &str) -> FalClient {
        let config = FalConfig {
            api_key: Some("fal-test".to_string()),
            queue_url: queue_url.to_string(),
            poll_interval_ms: 1,
            timeout_seconds: 5,
            ..FalConfig::default()
        };
        FalClient::new(&config).unwrap()
    }

    fn arguments() -> GenerationArguments {
        GenerationArguments {
            image_urls: vec!["https://img.example/ref.png".into()],
            prompt: "The figure waves".into(),
            duration: VideoDuration::Seconds8,
            resolution: Resolution::P1080,
            generate_audio: false,
        }
    }

    #[test]
    fn test_request_base_uses_app_id() {
        let client = test_client("https://queue.fal.run");
        assert_eq!(
            client.request_base("req-1"),
            "https://queue.fal.run/fal-ai/veo3.1/requests/req-1"
        );
    }

    #[test]
    fn test_extract_video_url() {
        let raw = json!({ "video": { "url": "https://v3.fal.media/out.mp4", "content_type": "video/mp4" } });
        assert_eq!(extract_video_url(&raw).unwrap(), "https://v3.fal.media/out.mp4");
        assert!(extract_video_url(&json!({ "video": {} })).is_err());
        assert!(extract_video_url(&json!({ "video": { "url": "" } })).is_err());
    }

    #[tokio::test]
    async fn test_missing_key() {
        let client = FalClient::new(&FalConfig::default()).unwrap();
        let err = client.generate(&arguments()).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_queue_flow() {
        let server = MockServer::start().await;
        let status_url = format!("{}/fal-ai/veo3.1/requests/req-9/status", server.uri());
        let response_url = format!("{}/fal-ai/veo3.1/requests/req-9", server.uri());

        Mock::given(method("POST"))
            .and(path("/fal-ai/veo3.1/reference-to-video"))
            .and(header("Authorization", "Key fal-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "request_id": "req-9",
                "status_url": status_url,
                "response_url": response_url
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/fal-ai/veo3.1/requests/req-9/status"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "status": "IN_PROGRESS",
                "logs": [{ "message": "rendering" }]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/fal-ai/veo3.1/requests/req-9/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "COMPLETED" })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/fal-ai/veo3.1/requests/req-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "video": { "url": "https://v3.fal.media/files/out.mp4" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let video = test_client(&server.uri()).generate(&arguments()).await.unwrap();
        assert_eq!(video.video_url, "https://v3.fal.media/files/out.mp4");
        assert_eq!(video.raw["video"]["url"], "https://v3.fal.media/files/out.mp4");
    }

    #[tokio::test]
    async fn test_submit_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fal-ai/veo3.1/reference-to-video"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid key"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).generate(&arguments()).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::Unauthorized { .. }));
    }
}
