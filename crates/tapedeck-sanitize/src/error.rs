//! Sanitization errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("decompress response body: {0}")]
    Decompression(#[source] std::io::Error),

    #[error("cannot scrub deployment URL {url}: {source}")]
    UrlScrub {
        url: String,
        #[source]
        source: tapedeck_core::Error,
    },
}

pub type SanitizeResult<T> = Result<T, SanitizeError>;
