//! Error taxonomy for the map core.
//!
//! Transient feed errors (`Fetch`, `Malformed`, `Upstream`) are recovered by
//! the poller, `Persistence` is surfaced by the style store, and
//! `Configuration` is fatal to map initialisation.

use thiserror::Error;

/// Result type for map core operations.
pub type Result<T> = std::result::Result<T, MapError>;

#[derive(Error, Debug)]
pub enum MapError {
    /// Invalid camera, zoom limits, viewer settings or static network config.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The transport could not complete the request.
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Body was not JSON or did not have the expected shape.
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// The collaborator answered with an error envelope or error status.
    #[error("Upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    /// Style document could not be loaded or saved.
    #[error("Style persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MapError {
    pub fn config(msg: impl Into<String>) -> Self {
        MapError::Configuration(msg.into())
    }

    /// Transient errors are retried on the next scheduled poll.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MapError::Fetch { .. } | MapError::Malformed(_) | MapError::Upstream { .. }
        )
    }
}
