// src/errors/mod.rs
use thiserror::Error;

/// Main error type for chargetap operations
#[derive(Error, Debug)]
pub enum ChargetapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    #[error("Invalid header name: {0}")]
    HeaderName(#[from] reqwest::header::InvalidHeaderName),

    #[error("Invalid header value: {0}")]
    HeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    #[error("JSON serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("Template error: {0}")]
    Minijinja(#[from] minijinja::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Pagination error: {0}")]
    PaginationError(String),

    #[error("HTTP status {status} from {url}: {body}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Record is missing field: {0}")]
    MissingField(String),

    #[error("Unknown stream: {0}")]
    UnknownStream(String),

    #[error("Unsupported sync mode {mode} for stream {stream}")]
    UnsupportedSyncMode { stream: String, mode: String },

    #[error("Writer error: {0}")]
    WriterError(String),
}

impl ChargetapError {
    /// Status code of a failed HTTP response, if that is what this error is.
    pub fn status(&self) -> Option<u16> {
        match self {
            ChargetapError::HttpStatus { status, .. } => Some(*status),
            ChargetapError::Reqwest(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Convenience Result type that uses ChargetapError
pub type Result<T> = std::result::Result<T, ChargetapError>;
