//! Error types for the Web Risk client.

use thiserror::Error;

use webrisk_core::ThreatTypeError;
use webrisk_storage::StorageError;

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid configuration.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Transport-level HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error: status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, trimmed.
        message: String,
    },

    /// Invalid API URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Verdict cache error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API key was provided.
    #[error("no API key specified")]
    MissingApiKey,

    /// A duration string could not be parsed.
    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    /// The threat type subscription is invalid.
    #[error(transparent)]
    ThreatTypes(#[from] ThreatTypeError),

    /// No threat types are subscribed.
    #[error("no threat types specified")]
    NoThreatTypes,

    /// The outbound proxy URL is invalid.
    #[error("invalid proxy URL: {0}")]
    InvalidProxy(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
