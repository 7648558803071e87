//! Client errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request body error: {0}")]
    Body(#[from] tapedeck_core::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] http::Error),

    #[error("Event stream error: {0}")]
    Stream(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
