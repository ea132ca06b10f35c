//! Video sources and payloads
//!
//! Decides how an incoming video reaches the understanding API: YouTube links
//! go by URL, social-media links are extracted with yt-dlp, other URLs are
//! fetched directly, and base64 data or local files are used as raw bytes.

pub mod download;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use url::Url;

use crate::error::{AnalyzerError, AnalyzerResult};

pub use download::{HttpFetcher, SourceFetcher, VideoFetcher, YtDlpDownloader};

/// Platforms whose pages need yt-dlp to get at the actual video file
pub const SOCIAL_PLATFORMS: &[&str] = &[
    "tiktok.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "facebook.com",
    "reddit.com",
    "snapchat.com",
    "vimeo.com",
];

const YOUTUBE_DOMAINS: &[&str] = &["youtube.com", "youtu.be"];

/// Extensions accepted for local files, with the MIME type sent upstream
pub const SUPPORTED_EXTENSIONS: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("mov", "video/mov"),
    ("webm", "video/webm"),
    ("avi", "video/avi"),
    ("flv", "video/x-flv"),
    ("mpeg", "video/mpeg"),
    ("mpg", "video/mpg"),
    ("3gp", "video/3gpp"),
    ("wmv", "video/wmv"),
    ("ts", "video/mp2t"),
];

const TS_PACKET_LEN: usize = 188;

/// MIME type used when nothing better is known
pub const DEFAULT_MIME_TYPE: &str = "video/mp4";

/// Optional clip window for YouTube analysis ("10s", "1m30s", ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipRange {
    pub start_offset: Option<String>,
    pub end_offset: Option<String>,
}

impl ClipRange {
    /// Blank offsets count as absent; everything else is kept verbatim.
    pub fn new(start_offset: Option<String>, end_offset: Option<String>) -> Self {
        Self {
            start_offset: start_offset.filter(|s| !s.trim().is_empty()),
            end_offset: end_offset.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_offset.is_none() && self.end_offset.is_none()
    }
}

/// Where a video comes from
#[derive(Clone)]
pub enum VideoSource {
    YouTube { url: String, clip: ClipRange },
    Social(String),
    Remote(String),
    Inline(Vec<u8>),
    LocalFile(PathBuf),
}

impl VideoSource {
    /// Classify a URL. The clip window only applies to YouTube.
    pub fn from_url(url: &str, clip: ClipRange) -> Self {
        if is_youtube_url(url) {
            VideoSource::YouTube {
                url: url.to_string(),
                clip,
            }
        } else if is_social_media_url(url) {
            VideoSource::Social(url.to_string())
        } else {
            VideoSource::Remote(url.to_string())
        }
    }

    /// Interpret a command-line argument as a URL or a local path
    pub fn from_cli_arg(arg: &str, clip: ClipRange) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            Self::from_url(arg, clip)
        } else {
            VideoSource::LocalFile(PathBuf::from(arg))
        }
    }

    /// Short human-readable description for logs
    pub fn describe(&self) -> String {
        match self {
            VideoSource::YouTube { url, .. } => format!("YouTube video {}", url),
            VideoSource::Social(url) => format!("social media video {}", url),
            VideoSource::Remote(url) => format!("video URL {}", url),
            VideoSource::Inline(bytes) => format!("inline video ({} bytes)", bytes.len()),
            VideoSource::LocalFile(path) => format!("video file {}", path.display()),
        }
    }
}

impl std::fmt::Debug for VideoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Raw video bytes with the MIME type they will be sent as
#[derive(Debug, Clone)]
pub struct VideoPayload {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

impl VideoPayload {
    /// Wrap bytes, detecting the container format
    pub fn new(bytes: Vec<u8>, extension: Option<&str>) -> AnalyzerResult<Self> {
        let mime_type = detect_mime_type(&bytes, extension)?;
        Ok(Self { bytes, mime_type })
    }

    /// Raw bytes of a local video file
    pub async fn read_file(path: &Path) -> AnalyzerResult<Vec<u8>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AnalyzerError::invalid_request(format!(
                "Video file not found: {}",
                path.display()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Read a local video file
    pub async fn from_file(path: &Path) -> AnalyzerResult<Self> {
        let bytes = Self::read_file(path).await?;
        let extension = path.extension().and_then(|e| e.to_str());
        Self::new(bytes, extension)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Size in MiB, as reported back to clients
    pub fn size_mb(&self) -> f64 {
        size_mb(self.bytes.len())
    }
}

pub fn size_mb(len: usize) -> f64 {
    len as f64 / (1024.0 * 1024.0)
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|host| host.to_ascii_lowercase())
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn youtube_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(?:https?://)?(?:www\.|m\.|music\.)?(?:youtube\.com|youtu\.be)(?:/|$)")
            .expect("valid regex")
    })
}

/// Whether a URL points at YouTube
pub fn is_youtube_url(url: &str) -> bool {
    match host_of(url) {
        Some(host) => YOUTUBE_DOMAINS.iter().any(|domain| host_matches(&host, domain)),
        None => youtube_pattern().is_match(url.trim()),
    }
}

/// Whether a URL is on a platform that needs yt-dlp
pub fn is_social_media_url(url: &str) -> bool {
    match host_of(url) {
        Some(host) => SOCIAL_PLATFORMS.iter().any(|domain| host_matches(&host, domain)),
        None => {
            let lower = url.to_lowercase();
            SOCIAL_PLATFORMS.iter().any(|platform| lower.contains(platform))
        }
    }
}

enum Sniffed {
    Video(&'static str),
    NotVideo(&'static str),
    Unknown,
}

/// MPEG-TS: sync byte 0x47 at the start of each of the first packets
fn is_transport_stream(bytes: &[u8]) -> bool {
    if bytes.len() <= TS_PACKET_LEN {
        return false;
    }
    (0..3)
        .map(|packet| packet * TS_PACKET_LEN)
        .take_while(|&offset| offset < bytes.len())
        .all(|offset| bytes[offset] == 0x47)
}

fn sniff(bytes: &[u8]) -> Sniffed {
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        let brand = &bytes[8..12];
        return if brand == b"qt  " {
            Sniffed::Video("video/mov")
        } else if brand.starts_with(b"3g") {
            Sniffed::Video("video/3gpp")
        } else {
            Sniffed::Video("video/mp4")
        };
    }

    if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        let head = &bytes[..bytes.len().min(64)];
        return if head.windows(4).any(|w| w == b"webm") {
            Sniffed::Video("video/webm")
        } else {
            Sniffed::NotVideo("Matroska (mkv) container")
        };
    }

    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"AVI " {
        return Sniffed::Video("video/avi");
    }
    if bytes.starts_with(b"FLV") {
        return Sniffed::Video("video/x-flv");
    }
    if bytes.starts_with(&[0x00, 0x00, 0x01, 0xBA]) || bytes.starts_with(&[0x00, 0x00, 0x01, 0xB3]) {
        return Sniffed::Video("video/mpeg");
    }
    if bytes.starts_with(&[0x30, 0x26, 0xB2, 0x75]) {
        return Sniffed::Video("video/wmv");
    }

    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        return Sniffed::NotVideo("PNG image");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Sniffed::NotVideo("JPEG image");
    }
    if bytes.starts_with(b"GIF8") {
        return Sniffed::NotVideo("GIF image");
    }
    if bytes.starts_with(b"%PDF") {
        return Sniffed::NotVideo("PDF document");
    }
    // after GIF, whose "G" is also 0x47
    if is_transport_stream(bytes) {
        return Sniffed::Video("video/mp2t");
    }

    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let text = &bytes[start..bytes.len().min(start + 16)];
    let lowered = text.to_ascii_lowercase();
    if lowered.starts_with(b"<!doctype") || lowered.starts_with(b"<html") {
        return Sniffed::NotVideo("HTML document");
    }
    if text.starts_with(b"{") || text.starts_with(b"[") {
        return Sniffed::NotVideo("JSON document");
    }

    Sniffed::Unknown
}

/// Work out the MIME type to send for a payload.
///
/// Container magic wins; a file extension is only consulted when the bytes
/// are not recognised. Unrecognised bytes with no extension are sent as MP4.
pub fn detect_mime_type(bytes: &[u8], extension: Option<&str>) -> AnalyzerResult<&'static str> {
    if bytes.is_empty() {
        return Err(AnalyzerError::invalid_request("No video data provided"));
    }

    match sniff(bytes) {
        Sniffed::Video(mime) => Ok(mime),
        Sniffed::NotVideo(kind) => Err(AnalyzerError::UnsupportedFormat(kind.to_string())),
        Sniffed::Unknown => match extension {
            Some(ext) => {
                let ext = ext.to_ascii_lowercase();
                SUPPORTED_EXTENSIONS
                    .iter()
                    .find(|(candidate, _)| *candidate == ext)
                    .map(|(_, mime)| *mime)
                    .ok_or_else(|| AnalyzerError::UnsupportedFormat(format!(".{} files", ext)))
            }
            None => Ok(DEFAULT_MIME_TYPE),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mp4_header() -> Vec<u8> {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x18];
        bytes.extend_from_slice(b"ftypisom");
        bytes.extend_from_slice(&[0u8; 32]);
        bytes
    }

    #[test]
    fn test_youtube_detection() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=9hE5-98ZeCg"));
        assert!(is_youtube_url("https://youtu.be/9hE5-98ZeCg"));
        assert!(is_youtube_url("https://m.youtube.com/shorts/abc"));
        assert!(is_youtube_url("youtube.com/watch?v=abc"));
        assert!(!is_youtube_url("https://notyoutube.com/watch?v=abc"));
        assert!(!is_youtube_url("https://example.com/youtube.com.mp4"));
    }

    #[test]
    fn test_social_media_detection() {
        assert!(is_social_media_url("https://www.tiktok.com/@user/video/123"));
        assert!(is_social_media_url("https://X.com/user/status/1"));
        assert!(is_social_media_url("https://vm.tiktok.com/ZM123/"));
        assert!(is_social_media_url("https://vimeo.com/76979871"));
        assert!(!is_social_media_url("https://www.dropbox.com/s/clip.mp4"));
        assert!(!is_social_media_url("https://cdn.example.com/video.mp4"));
        // unparsable input falls back to substring matching
        assert!(is_social_media_url("instagram.com/reel/abc"));
    }

    #[test]
    fn test_source_classification() {
        let clip = ClipRange::new(Some("1m30s".into()), Some("3m45s".into()));
        match VideoSource::from_url("https://www.youtube.com/watch?v=abc", clip.clone()) {
            VideoSource::YouTube { url, clip: got } => {
                assert_eq!(url, "https://www.youtube.com/watch?v=abc");
                assert_eq!(got, clip);
            }
            other => panic!("unexpected source {:?}", other),
        }

        assert!(matches!(
            VideoSource::from_url("https://www.instagram.com/reel/xyz", ClipRange::default()),
            VideoSource::Social(_)
        ));
        assert!(matches!(
            VideoSource::from_url("https://cdn.example.com/a.mp4", ClipRange::default()),
            VideoSource::Remote(_)
        ));
        assert!(matches!(
            VideoSource::from_cli_arg("./clips/a.mp4", ClipRange::default()),
            VideoSource::LocalFile(_)
        ));
    }

    #[test]
    fn test_clip_range_blank_offsets() {
        let clip = ClipRange::new(Some("".into()), Some("  ".into()));
        assert!(clip.is_empty());

        let clip = ClipRange::new(Some("10s".into()), None);
        assert_eq!(clip.start_offset.as_deref(), Some("10s"));
        assert!(!clip.is_empty());
    }

    #[test]
    fn test_detect_mime_from_magic() {
        assert_eq!(detect_mime_type(&mp4_header(), None).unwrap(), "video/mp4");

        let mut mov = vec![0, 0, 0, 0x14];
        mov.extend_from_slice(b"ftypqt  ");
        assert_eq!(detect_mime_type(&mov, Some("mp4")).unwrap(), "video/mov");

        let mut avi = b"RIFF".to_vec();
        avi.extend_from_slice(&[0, 0, 0, 0]);
        avi.extend_from_slice(b"AVI LIST");
        assert_eq!(detect_mime_type(&avi, None).unwrap(), "video/avi");

        let mut webm = vec![0x1A, 0x45, 0xDF, 0xA3, 0x9F, 0x42, 0x82, 0x84];
        webm.extend_from_slice(b"webm");
        assert_eq!(detect_mime_type(&webm, None).unwrap(), "video/webm");
    }

    #[test]
    fn test_detect_mime_rejects_non_video() {
        let err = detect_mime_type(b"  <!DOCTYPE html><html>", None).unwrap_err();
        assert!(matches!(err, AnalyzerError::UnsupportedFormat(_)));

        let err = detect_mime_type(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A], None).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported video format: PNG image");

        let mkv = [0x1A, 0x45, 0xDF, 0xA3, 0x42, 0x82, 0x88, b'm', b'a', b't', b'r'];
        assert!(detect_mime_type(&mkv, Some("mkv")).is_err());
    }

    #[test]
    fn test_detect_mime_falls_back_to_extension() {
        let unknown = [0x12u8, 0x34, 0x56, 0x78, 0x9A];
        assert_eq!(detect_mime_type(&unknown, Some("MPG")).unwrap(), "video/mpg");
        assert_eq!(detect_mime_type(&unknown, None).unwrap(), DEFAULT_MIME_TYPE);
        assert!(matches!(
            detect_mime_type(&unknown, Some("txt")),
            Err(AnalyzerError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_detect_transport_stream() {
        let mut ts = vec![0u8; TS_PACKET_LEN * 3];
        for packet in 0..3 {
            ts[packet * TS_PACKET_LEN] = 0x47;
        }
        assert_eq!(detect_mime_type(&ts, None).unwrap(), "video/mp2t");
        assert_eq!(detect_mime_type(&ts, Some("ts")).unwrap(), "video/mp2t");

        // a lone 0x47 byte is not a stream
        let mut stray = vec![0u8; TS_PACKET_LEN * 3];
        stray[0] = 0x47;
        assert_eq!(detect_mime_type(&stray, None).unwrap(), DEFAULT_MIME_TYPE);

        assert_eq!(detect_mime_type(&[0x12, 0x34], Some("ts")).unwrap(), "video/mp2t");
    }

    #[test]
    fn test_empty_payload() {
        let err = detect_mime_type(&[], None).unwrap_err();
        assert_eq!(err.to_string(), "No video data provided");
    }

    #[test]
    fn test_payload_size() {
        let payload = VideoPayload::new(vec![0u8; 3 * 1024 * 1024], Some("mp4")).unwrap();
        assert_eq!(payload.size_mb(), 3.0);
        assert_eq!(payload.mime_type, "video/mp4");
    }

    #[tokio::test]
    async fn test_payload_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = VideoPayload::from_file(&dir.path().join("missing.mp4"))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().starts_with("Video file not found"));
    }

    #[tokio::test]
    async fn test_payload_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        tokio::fs::write(&path, mp4_header()).await.unwrap();

        let payload = VideoPayload::from_file(&path).await.unwrap();
        assert_eq!(payload.len(), mp4_header().len());
        assert_eq!(payload.mime_type, "video/mp4");
    }
}
