// Error taxonomy for the synchronizer

use thiserror::Error;

/// Errors surfaced by the API client and cache store.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Transport failure or a non-2xx response.
    #[error("connectivity failure: {0}")]
    Connectivity(String),

    /// Well-formed response with `success: false`.
    #[error("server reported failure: {message}")]
    Application { message: String },

    /// Body or stream message that does not decode.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Logical endpoint key with no mapping (configuration error, never a network error).
    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// Invalid base URL in configuration.
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),

    /// Durable cache read/write failure.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl SyncError {
    /// Configuration errors are developer-facing only.
    pub fn is_configuration(&self) -> bool {
        matches!(self, SyncError::UnknownEndpoint(_) | SyncError::InvalidUrl(_))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Connectivity(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
