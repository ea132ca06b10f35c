use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::prompts::PromptStyle;

/// Configuration for the video analyzer service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Gemini video-understanding settings
    pub gemini: GeminiConfig,

    /// fal.ai video generation settings
    pub fal: FalConfig,

    /// Remote video download settings
    pub download: DownloadConfig,

    /// Analysis defaults
    pub analysis: AnalysisConfig,

    /// Output and logging settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Maximum accepted request body in bytes (base64 video payloads are large)
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key (GOOGLE_API_KEY)
    pub api_key: Option<String>,

    /// Base URL of the Generative Language API
    pub base_url: String,

    /// Model used when a request does not name one
    pub default_model: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Payloads at or above this size (MB) go through the File API
    pub inline_threshold_mb: f64,

    /// Delay between File API state checks
    pub file_poll_interval_ms: u64,

    /// Maximum File API state checks before giving up
    pub file_poll_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FalConfig {
    /// API key (FAL_KEY)
    pub api_key: Option<String>,

    /// Base URL of the fal queue API
    pub queue_url: String,

    /// Model endpoint id
    pub model_id: String,

    /// Overall deadline for one generation, in seconds
    pub timeout_seconds: u64,

    /// Delay between queue status checks
    pub poll_interval_ms: u64,

    /// Value of `generate_audio` when a request omits it
    pub generate_audio_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Explicit yt-dlp binary; looked up on PATH when unset
    pub ytdlp_path: Option<PathBuf>,

    /// Timeout for a single download, in seconds
    pub timeout_seconds: u64,

    /// Browser User-Agent sent by both downloaders
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Built-in prompt used when a request has none
    pub default_prompt: PromptStyle,

    /// Custom prompt file that replaces the built-in default
    pub prompt_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where the CLI saves analysis results
    pub results_file: PathBuf,

    /// Log level
    pub log_level: String,
}

impl AnalysisConfig {
    /// Resolve the default prompt, reading the prompt file if one is configured
    pub async fn load_default_prompt(&self) -> Result<String> {
        match &self.prompt_file {
            Some(path) => match tokio::fs::read_to_string(path).await {
                Ok(content) => Ok(content.trim().to_string()),
                Err(e) => Err(anyhow!("Failed to load prompt from {}: {}", path.display(), e)),
            },
            None => Ok(self.default_prompt.text().to_string()),
        }
    }
}

impl Config {
    /// Load configuration from file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config_paths = [
            "video-analyzer.toml",
            "config/video-analyzer.toml",
            "/etc/video-analyzer/config.toml",
        ];

        let mut config = None;
        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(parsed) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config = Some(parsed);
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        let mut config = config.unwrap_or_default();
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config file {}: {}", path, e))?;
        let mut config: Config = toml::from_str(&config_str)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override values with environment variables
    fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var("GOOGLE_API_KEY").or_else(|_| std::env::var("GEMINI_API_KEY")) {
            self.gemini.api_key = Some(api_key);
        }

        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            self.gemini.default_model = model;
        }

        if let Ok(api_key) = std::env::var("FAL_KEY") {
            self.fal.api_key = Some(api_key);
        }

        if let Ok(host) = std::env::var("VIDEO_ANALYZER_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("VIDEO_ANALYZER_PORT") {
            self.server.port = port.parse().unwrap_or(self.server.port);
        }

        if let Ok(log_level) = std::env::var("VIDEO_ANALYZER_LOG_LEVEL") {
            self.output.log_level = log_level;
        }

        if let Ok(results_file) = std::env::var("OUTPUT_RESULTS_FILE") {
            self.output.results_file = PathBuf::from(results_file);
        }

        if let Ok(ytdlp) = std::env::var("YTDLP_PATH") {
            self.download.ytdlp_path = Some(PathBuf::from(ytdlp));
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("server.port must be greater than 0"));
        }

        if self.gemini.inline_threshold_mb <= 0.0 {
            return Err(anyhow!("gemini.inline_threshold_mb must be positive"));
        }

        if self.gemini.timeout_seconds == 0 || self.fal.timeout_seconds == 0 {
            return Err(anyhow!("API timeouts must be greater than 0"));
        }

        if self.gemini.file_poll_attempts == 0 {
            return Err(anyhow!("gemini.file_poll_attempts must be greater than 0"));
        }

        if self.gemini.default_model.trim().is_empty() {
            return Err(anyhow!("gemini.default_model must not be empty"));
        }

        if self.fal.model_id.trim().is_empty() {
            return Err(anyhow!("fal.model_id must not be empty"));
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Video Analyzer Configuration:\n\
            - Listen: {}:{}\n\
            - Gemini model: {}\n\
            - Inline threshold: {} MB\n\
            - Gemini key: {}\n\
            - Generation model: {}\n\
            - fal key: {}\n\
            - Default prompt: {:?}",
            self.server.host,
            self.server.port,
            self.gemini.default_model,
            self.gemini.inline_threshold_mb,
            mask_key(self.gemini.api_key.as_deref()),
            self.fal.model_id,
            mask_key(self.fal.api_key.as_deref()),
            self.analysis.default_prompt,
        )
    }
}

/// Show only the last four characters of a secret
pub fn mask_key(key: Option<&str>) -> String {
    match key {
        Some(key) if key.len() > 4 => format!("{}{}", "*".repeat(20), &key[key.len() - 4..]),
        Some(_) => "*".repeat(20),
        None => "not set".to_string(),
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_body_bytes: 256 * 1024 * 1024,
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            default_model: "gemini-2.5-flash".to_string(),
            timeout_seconds: 600, // video analysis can take minutes
            inline_threshold_mb: 20.0,
            file_poll_interval_ms: 2000,
            file_poll_attempts: 90,
        }
    }
}

impl Default for FalConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            queue_url: "https://queue.fal.run".to_string(),
            model_id: "fal-ai/veo3.1/reference-to-video".to_string(),
            timeout_seconds: 600,
            poll_interval_ms: 3000,
            generate_audio_default: true,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            timeout_seconds: 300,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_prompt: PromptStyle::Recreation,
            prompt_file: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_file: PathBuf::from("local_analysis_result.json"),
            log_level: "info".to_string(),
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_gemini_key(mut self, api_key: String) -> Self {
        self.config.gemini.api_key = Some(api_key);
        self
    }

    pub fn with_fal_key(mut self, api_key: String) -> Self {
        self.config.fal.api_key = Some(api_key);
        self
    }

    pub fn with_default_model(mut self, model: String) -> Self {
        self.config.gemini.default_model = model;
        self
    }

    pub fn with_inline_threshold_mb(mut self, threshold: f64) -> Self {
        self.config.gemini.inline_threshold_mb = threshold;
        self
    }

    pub fn with_generate_audio_default(mut self, enabled: bool) -> Self {
        self.config.fal.generate_audio_default = enabled;
        self
    }

    pub fn with_default_prompt(mut self, style: PromptStyle) -> Self {
        self.config.analysis.default_prompt = style;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.gemini.default_model, "gemini-2.5-flash");
        assert_eq!(config.gemini.inline_threshold_mb, 20.0);
        assert_eq!(config.fal.model_id, "fal-ai/veo3.1/reference-to-video");
        assert!(config.fal.generate_audio_default);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_port(9000)
            .with_default_model("gemini-2.5-pro".to_string())
            .with_generate_audio_default(false)
            .build();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.gemini.default_model, "gemini-2.5-pro");
        assert!(!config.fal.generate_audio_default);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());

        let config = ConfigBuilder::new().with_inline_threshold_mb(0.0).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9100

            [analysis]
            default_prompt = "comprehensive"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.analysis.default_prompt, PromptStyle::Comprehensive);
        assert_eq!(config.gemini.base_url, "https://generativelanguage.googleapis.com");
    }

    #[test]
    fn test_example_config_is_valid() {
        let config: Config = toml::from_str(include_str!("../config/video-analyzer.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.max_body_bytes, ServerConfig::default().max_body_bytes);
        assert_eq!(config.analysis.default_prompt, PromptStyle::Recreation);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video-analyzer.toml");
        let path = path.to_str().unwrap();

        let config = ConfigBuilder::new()
            .with_port(8123)
            .with_default_prompt(PromptStyle::Comprehensive)
            .build();
        config.save(path).unwrap();

        let reloaded: Config = toml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(reloaded.server.port, 8123);
        assert_eq!(reloaded.analysis.default_prompt, PromptStyle::Comprehensive);
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key(None), "not set");
        assert!(mask_key(Some("abcdefgh")).ends_with("efgh"));
        assert!(!mask_key(Some("abc")).contains("abc"));
    }

    #[tokio::test]
    async fn test_prompt_file_overrides_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  Describe every cut.  ").unwrap();

        let analysis = AnalysisConfig {
            default_prompt: PromptStyle::Recreation,
            prompt_file: Some(file.path().to_path_buf()),
        };
        assert_eq!(analysis.load_default_prompt().await.unwrap(), "Describe every cut.");

        let builtin = AnalysisConfig::default().load_default_prompt().await.unwrap();
        assert!(builtin.starts_with("Analyze this TikTok video"));
    }
}
