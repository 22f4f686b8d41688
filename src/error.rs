// src/error.rs

//! Unified error handling for the collector.
//!
//! Run-level failures are [`AppError`]s and abort the run. Per-community
//! failures are [`CommunityFetchError`]s; they never abort anything and end
//! up in the `error` field of the affected record instead.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Result type alias for collector operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// The community directory could not be fetched or parsed
    #[error("Directory fetch failed for {url}: {message}")]
    DirectoryFetch { url: String, message: String },

    /// The previous summary cache exists but could not be read
    #[error("Cannot load summary cache {}: {message}", path.display())]
    CacheLoad { path: PathBuf, message: String },

    /// Copying the previous cache into history failed
    #[error("Snapshot to {} failed: {source}", path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The summary cache could not be written
    #[error("Cannot persist summary cache {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client setup failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a directory fetch error.
    pub fn directory(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::DirectoryFetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a cache load error.
    pub fn cache_load(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Self::CacheLoad {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Create a persistence error.
    pub fn persistence(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// A body that is not valid in the charset it was decoded with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("body is not valid {charset} at byte {offset}")]
pub struct DecodeError {
    pub charset: &'static str,
    pub offset: usize,
}

/// Why a single community endpoint could not be harvested.
#[derive(Error, Debug)]
pub enum CommunityFetchError {
    /// Connection, TLS or protocol failure
    #[error("{0}")]
    Http(reqwest::Error),

    /// No response within the per-request timeout
    #[error("no response from {url} within {}s", timeout.as_secs_f32())]
    Timeout { url: String, timeout: Duration },

    /// Endpoint answered with a non-success status
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    /// Body undecodable even after the fallback charset retry
    #[error("{0}")]
    Decode(#[from] DecodeError),

    /// Body is not a JSON community document
    #[error("{0}")]
    Parse(#[from] serde_json::Error),

    /// The run deadline expired before the fetch completed
    #[error("run deadline expired before {url} was fetched")]
    Cancelled { url: String },
}

impl CommunityFetchError {
    /// Stable name of the failure kind, written into cached records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "HttpError",
            Self::Timeout { .. } => "TimeoutError",
            Self::Status { .. } => "StatusError",
            Self::Decode(_) => "DecodeError",
            Self::Parse(_) => "ParseError",
            Self::Cancelled { .. } => "CancelledError",
        }
    }

    /// `"<kind> <message>"` as stored in a record's `error` field.
    pub fn describe(&self) -> String {
        format!("{} {}", self.kind(), self)
    }

    /// Classify a transport error, separating timeouts from the rest.
    pub fn from_reqwest(url: &str, timeout: Duration, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else if let Some(status) = error.status() {
            Self::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            Self::Http(error)
        }
    }
}
