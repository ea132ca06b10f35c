//! Error types shared by the analysis and generation paths.

use axum::http::StatusCode;
use thiserror::Error;

/// Result type for analyzer operations.
pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

/// Errors that can occur while serving an analysis or generation request.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Unsupported video format: {0}")]
    UnsupportedFormat(String),

    #[error("{service} rate limit exceeded: {message}")]
    RateLimited { service: &'static str, message: String },

    #[error("{service} rejected the credentials: {message}")]
    Unauthorized { service: &'static str, message: String },

    #[error("{service} API error{}: {message}", status_suffix(.status))]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn status_suffix(status: &u16) -> String {
    match status {
        0 => String::new(),
        status => format!(" {}", status),
    }
}

impl AnalyzerError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::Download(message.into())
    }

    /// Upstream failure with no HTTP status (malformed or empty payload).
    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            service,
            status: 0,
            message: message.into(),
        }
    }

    /// Classify a non-2xx response from an external service.
    pub fn from_status(service: &'static str, status: u16, body: String) -> Self {
        match status {
            429 => Self::RateLimited {
                service,
                message: body,
            },
            401 | 403 => Self::Unauthorized {
                service,
                message: body,
            },
            _ => Self::Upstream {
                service,
                status,
                message: body,
            },
        }
    }

    /// Whether the caller, not an upstream service, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_) | Self::UnsupportedFormat(_))
    }

    /// HTTP status used when this error is returned from an endpoint.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Unauthorized { .. }
            | Self::Upstream { .. }
            | Self::Network(_)
            | Self::Download(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Configuration(_) | Self::Io(_) | Self::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = AnalyzerError::from_status("Gemini", 429, "quota".to_string());
        assert!(matches!(err, AnalyzerError::RateLimited { .. }));
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);

        let err = AnalyzerError::from_status("fal.ai", 401, "bad key".to_string());
        assert!(matches!(err, AnalyzerError::Unauthorized { .. }));

        let err = AnalyzerError::from_status("Gemini", 500, "boom".to_string());
        assert_eq!(err.to_string(), "Gemini API error 500: boom");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err = AnalyzerError::upstream("Gemini", "empty response");
        assert_eq!(err.to_string(), "Gemini API error: empty response");
    }

    #[test]
    fn test_client_errors() {
        assert!(AnalyzerError::invalid_request("missing").is_client_error());
        assert!(AnalyzerError::UnsupportedFormat("text/html".into()).is_client_error());
        assert!(!AnalyzerError::download_failed("yt-dlp").is_client_error());
    }
}
