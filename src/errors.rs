//! Error types for the skillsync-notify crate
//!
//! Structured errors with source chains, organized by functional domain.
//! Note that the poller's broadcast path never surfaces these to subscribers;
//! they exist for the one-shot API calls, configuration, and the CLI edge.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    // Configuration errors
    #[error("configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("unknown configuration key: {key}")]
    UnknownConfigKey { key: String },

    #[error("invalid configuration value for '{key}': {value}")]
    InvalidConfigValue { key: String, value: String },

    // Network and HTTP errors
    #[error("invalid API base URL: {url}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("HTTP request failed: {method} {url}")]
    HttpRequest {
        method: String,
        url: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("HTTP {status_code}: {reason}")]
    HttpStatus { status_code: u16, reason: String },

    #[error("network timeout")]
    NetworkTimeout,

    // Serialization errors
    #[error("response parsing failed: {context}")]
    ResponseParse {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("TOML parsing error: {context}")]
    TomlParsing {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // I/O errors
    #[error("file I/O error for '{path}': {operation}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Convenience alias for results using [`SyncError`].
pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn io(path: impl Into<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source: None,
        }
    }

    pub fn io_with_source(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn response_parse(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ResponseParse {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether a later attempt could plausibly succeed. The poller treats
    /// every fetch failure the same way (degrade and wait for the next tick),
    /// but callers of the one-shot operations may want to distinguish.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkTimeout => true,
            Self::HttpRequest { .. } => true,
            Self::HttpStatus { status_code, .. } => {
                *status_code >= 500 || *status_code == 408 || *status_code == 429
            }
            _ => false,
        }
    }

    /// Error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } | Self::UnknownConfigKey { .. } | Self::InvalidConfigValue { .. } => {
                "config"
            }
            Self::InvalidBaseUrl { .. }
            | Self::HttpRequest { .. }
            | Self::HttpStatus { .. }
            | Self::NetworkTimeout => "network",
            Self::ResponseParse { .. } | Self::TomlParsing { .. } => "serialization",
            Self::Io { .. } => "io",
            Self::Internal { .. } => "internal",
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        let operation = match err.kind() {
            std::io::ErrorKind::NotFound => "file not found",
            std::io::ErrorKind::PermissionDenied => "permission denied",
            std::io::ErrorKind::TimedOut => "timeout",
            _ => "I/O operation",
        }
        .to_string();

        Self::Io {
            path: PathBuf::from("unknown"),
            operation,
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        let context = if err.is_syntax() {
            format!("JSON syntax error at line {} column {}", err.line(), err.column())
        } else if err.is_eof() {
            "unexpected end of JSON input".to_string()
        } else {
            "JSON data error".to_string()
        };
        Self::ResponseParse {
            context,
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        Self::TomlParsing {
            context: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        Self::TomlParsing {
            context: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::NetworkTimeout
        } else if let Some(status) = err.status() {
            Self::HttpStatus {
                status_code: status.as_u16(),
                reason: err.to_string(),
            }
        } else {
            Self::HttpRequest {
                method: "UNKNOWN".to_string(),
                url: err
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                source: Some(Box::new(err)),
            }
        }
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidBaseUrl {
            url: "unknown".to_string(),
            source: Some(Box::new(err)),
        }
    }
}
