//! Remote video retrieval: plain HTTP for direct links, yt-dlp for social platforms.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{is_social_media_url, size_mb};
use crate::config::DownloadConfig;
use crate::error::{AnalyzerError, AnalyzerResult};

/// Anything that can turn a URL into video bytes
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> AnalyzerResult<Vec<u8>>;
}

/// Direct download of a video file over HTTP
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &DownloadConfig) -> AnalyzerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl VideoFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> AnalyzerResult<Vec<u8>> {
        info!("📥 Downloading video from URL: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            AnalyzerError::download_failed(format!("request to {} failed: {}", url, e))
        })?;

        if !response.status().is_success() {
            return Err(AnalyzerError::download_failed(format!(
                "{} returned HTTP {}",
                url,
                response.status()
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            AnalyzerError::download_failed(format!("reading body from {} failed: {}", url, e))
        })?;

        info!("✅ Downloaded video ({:.2} MB)", size_mb(bytes.len()));
        Ok(bytes.to_vec())
    }
}

/// Extracts videos from TikTok, Instagram, X and similar pages with yt-dlp
pub struct YtDlpDownloader {
    binary: Option<PathBuf>,
    timeout: Duration,
    user_agent: String,
}

impl YtDlpDownloader {
    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            binary: config.ytdlp_path.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
            user_agent: config.user_agent.clone(),
        }
    }

    fn resolve_binary(&self) -> AnalyzerResult<PathBuf> {
        match &self.binary {
            Some(path) => Ok(path.clone()),
            None => which::which("yt-dlp")
                .map_err(|_| AnalyzerError::download_failed("yt-dlp not found in PATH")),
        }
    }

    /// Command-line arguments for one download into `output_template`
    fn build_args(&self, output_template: &str, url: &str) -> Vec<String> {
        let args = [
            "-f", "best[ext=mp4]/best", // prefer mp4
            "-o", output_template,
            "--quiet",
            "--no-warnings",
            "--no-progress",
            "--no-playlist",
            // TikTok pages are slow to respond
            "--extractor-args", "tiktok:webpage_download_timeout=30",
            "--user-agent", self.user_agent.as_str(),
            "--add-header", "Accept:text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            "--add-header", "Accept-Language:en-us,en;q=0.5",
            "--add-header", "Sec-Fetch-Mode:navigate",
            url,
        ];
        args.iter().map(|s| s.to_string()).collect()
    }
}

/// Locate the finished download inside a scratch directory
async fn find_downloaded_file(dir: &Path) -> AnalyzerResult<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with("video.") && !name.ends_with(".part") && !name.ends_with(".ytdl") {
            return Ok(path);
        }
    }

    Err(AnalyzerError::download_failed("yt-dlp did not produce an output file"))
}

#[async_trait]
impl VideoFetcher for YtDlpDownloader {
    async fn fetch(&self, url: &str) -> AnalyzerResult<Vec<u8>> {
        let binary = self.resolve_binary()?;
        info!("📥 Downloading video with yt-dlp: {}", url);

        // Removed on drop, whatever happens below
        let temp_dir = tempfile::tempdir()?;
        let template = temp_dir.path().join("video.%(ext)s");
        let args = self.build_args(&template.to_string_lossy(), url);

        let child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| AnalyzerError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| AnalyzerError::download_failed(format!("failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);
            let error_msg = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("Unknown error");
            warn!(url = %url, "yt-dlp exited with {}", output.status);
            return Err(AnalyzerError::download_failed(format!("yt-dlp failed: {}", error_msg)));
        }

        let downloaded = find_downloaded_file(temp_dir.path()).await?;
        let bytes = tokio::fs::read(&downloaded).await?;

        info!("✅ Downloaded video ({:.2} MB)", size_mb(bytes.len()));
        Ok(bytes)
    }
}

/// Routes social-media URLs to yt-dlp and everything else to HTTP
pub struct SourceFetcher {
    http: HttpFetcher,
    ytdlp: YtDlpDownloader,
}

impl SourceFetcher {
    pub fn new(config: &DownloadConfig) -> AnalyzerResult<Self> {
        Ok(Self {
            http: HttpFetcher::new(config)?,
            ytdlp: YtDlpDownloader::new(config),
        })
    }
}

#[async_trait]
impl VideoFetcher for SourceFetcher {
    async fn fetch(&self, url: &str) -> AnalyzerResult<Vec<u8>> {
        if is_social_media_url(url) {
            info!("Detected social media URL, using yt-dlp to download");
            self.ytdlp.fetch(url).await
        } else {
            self.http.fetch(url).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ytdlp_args() {
        let downloader = YtDlpDownloader::new(&DownloadConfig::default());
        let args = downloader.build_args("/tmp/x/video.%(ext)s", "https://www.tiktok.com/@a/video/1");

        assert_eq!(args.last().map(String::as_str), Some("https://www.tiktok.com/@a/video/1"));
        let format_pos = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[format_pos + 1], "best[ext=mp4]/best");
        let output_pos = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[output_pos + 1], "/tmp/x/video.%(ext)s");
        assert!(args.iter().any(|a| a == "tiktok:webpage_download_timeout=30"));
        assert!(args.iter().any(|a| a.starts_with("Mozilla/5.0")));
    }

    #[test]
    fn test_explicit_binary_skips_path_lookup() {
        let config = DownloadConfig {
            ytdlp_path: Some(PathBuf::from("/opt/bin/yt-dlp")),
            ..DownloadConfig::default()
        };
        let downloader = YtDlpDownloader::new(&config);
        assert_eq!(downloader.resolve_binary().unwrap(), PathBuf::from("/opt/bin/yt-dlp"));
    }

    #[tokio::test]
    async fn test_find_downloaded_file_skips_partials() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("video.mp4.part"), b"partial").await.unwrap();
        tokio::fs::write(dir.path().join("video.mp4"), b"done").await.unwrap();

        let found = find_downloaded_file(dir.path()).await.unwrap();
        assert_eq!(found.file_name().unwrap(), "video.mp4");
    }

    #[tokio::test]
    async fn test_find_downloaded_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_downloaded_file(dir.path()).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::Download(_)));
    }

    #[tokio::test]
    async fn test_missing_ytdlp_binary() {
        let config = DownloadConfig {
            ytdlp_path: Some(PathBuf::from("/nonexistent/yt-dlp")),
            ..DownloadConfig::default()
        };
        let err = YtDlpDownloader::new(&config)
            .fetch("https://www.tiktok.com/@a/video/1")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Download(_)));
    }
}
