//! Storage errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed cassette {file}: {reason}")]
    MalformedCassetteAsset { file: String, reason: String },

    #[error("Cassette already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Invalid cassette name {0:?}")]
    InvalidName(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
