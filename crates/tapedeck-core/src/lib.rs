//! Tapedeck Core Types
//!
//! This crate provides the fundamental types used throughout Tapedeck:
//! - Cassette / interaction data model and its YAML representation
//! - Header multimaps plus the redaction and match-ignore header sets
//! - JSON normalization helpers (pretty printing, semantic equality)
//! - Provider URL normalization and model extraction
//! - Core error types

pub mod duration;
pub mod error;
pub mod headers;
pub mod interaction;
pub mod json;
pub mod provider;
pub mod request;

pub use error::{Error, Result};
pub use headers::{
    CASSETTE_NAME_HEADER, ERROR_MARKER_HEADER, ERROR_TAG, HeaderSet, Headers, canonical_name,
};
pub use interaction::{Body, Cassette, Interaction, RecordedRequest, RecordedResponse};
pub use provider::Provider;
pub use request::{RequestBody, extract_model};
