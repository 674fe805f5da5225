//! Error types for snapshot-archiver
//!
//! This module provides the error surface of the library:
//! - [`Error`], the crate-wide error returned by the pool, resolver and builder
//! - [`FetchError`], the failure of a single resource fetch (HTTP status or transport)
//! - Machine-readable error codes for consumers that report failures elsewhere

use thiserror::Error;

/// Result type alias for snapshot-archiver operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP status a server uses to say a resource is permanently gone
pub const HTTP_GONE: u16 = 410;

/// Main error type for snapshot-archiver
///
/// A build either returns a complete archive or exactly one of these.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_fetches")
        key: Option<String>,
    },

    /// The task never started because its batch was interrupted
    #[error("task interrupted")]
    Interrupted,

    /// The task's result was dropped before it settled (the operation panicked)
    #[error("task abandoned before producing a result")]
    TaskAbandoned,

    /// A resource could not be fetched from any tier
    #[error("resource fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The document URL could not be parsed as an absolute URL
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        /// The URL as supplied by the caller
        url: String,
        /// The underlying parse failure
        #[source]
        source: url::ParseError,
    },

    /// HTTP client construction or configuration failed
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Interrupted => "interrupted",
            Error::TaskAbandoned => "task_abandoned",
            Error::Fetch(FetchError::Status { status, .. }) if *status == HTTP_GONE => {
                "resource_gone"
            }
            Error::Fetch(FetchError::Status { .. }) => "resource_http_error",
            Error::Fetch(FetchError::Transport { .. }) => "resource_transport_error",
            Error::InvalidUrl { .. } => "invalid_url",
            Error::Network(_) => "network_error",
        }
    }
}

/// Failure of a single resource fetch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    Status {
        /// URL that was requested
        url: String,
        /// HTTP status code returned
        status: u16,
    },

    /// The request could not be completed (connect, timeout, body read)
    #[error("failed to fetch {url}: {message}")]
    Transport {
        /// URL that was requested
        url: String,
        /// Description of the transport failure
        message: String,
    },
}

impl FetchError {
    /// URL whose fetch failed
    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. } | FetchError::Transport { url, .. } => url,
        }
    }

    /// True if the server reported the resource as permanently gone (HTTP 410)
    pub fn is_gone(&self) -> bool {
        matches!(self, FetchError::Status { status, .. } if *status == HTTP_GONE)
    }
}
