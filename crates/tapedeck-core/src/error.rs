//! Error types for Tapedeck Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Cannot extract model from request body: {0}")]
    ModelExtraction(String),

    #[error("Model {0:?} cannot be used as a deployment path segment")]
    InvalidDeploymentModel(String),

    #[error("Invalid cassette: {0}")]
    InvalidCassette(String),
}

pub type Result<T> = std::result::Result<T, Error>;
