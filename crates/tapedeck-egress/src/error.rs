//! Egress errors

use tapedeck_core::Provider;
use tapedeck_sanitize::SanitizeError;
use tapedeck_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EgressError {
    #[error("no usable {provider} credentials")]
    MissingCredentials { provider: Provider },

    #[error("invalid cassette name {0:?}")]
    InvalidCassetteName(String),

    #[error("cassette {cassette} is already being recorded or exists on disk")]
    RecordingConflict { cassette: String },

    #[error("upstream call failed: {0}")]
    UpstreamCallFailed(#[from] reqwest::Error),

    #[error("invalid upstream URL {0:?}")]
    InvalidUpstreamUrl(String),

    #[error("sanitize recorded interaction: {0}")]
    SanitizationFailed(#[from] SanitizeError),

    /// The cassette directory could not be prepared before calling upstream
    #[error("prepare cassette directory: {0}")]
    Storage(StorageError),

    /// Upstream answered but the cassette could not be written
    #[error("persist cassette: {0}")]
    PersistFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StorageError> for EgressError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidName(name) => Self::InvalidCassetteName(name),
            other => Self::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EgressError>;
