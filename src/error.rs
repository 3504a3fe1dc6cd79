//! Error taxonomy for a harvest run.
//!
//! Missing markup (no title, no link, no content block) is never an error:
//! the listing and extraction code fall back locally. Everything that ends up
//! here aborts the run before the store is rewritten.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for harvest operations.
pub type Result<T> = std::result::Result<T, HarvestError>;

#[derive(Error, Debug)]
pub enum HarvestError {
    /// Reading or writing the store failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the collection failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The settings file could not be decoded
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Transport-level failure (DNS, TLS, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("GET {url} returned {status}")]
    Status { url: String, status: u16 },

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The store exists but does not hold a JSON array of records
    #[error("store at {} is not a valid record collection: {source}", .path.display())]
    CorruptStore {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl HarvestError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
