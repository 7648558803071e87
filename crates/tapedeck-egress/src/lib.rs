//! Tapedeck Egress
//!
//! This crate makes the live upstream calls behind a cassette miss:
//! - Shared HTTP client configuration
//! - Upstream credentials and target URLs for OpenAI and Azure OpenAI
//! - A capturing transport that turns a round trip into an interaction
//! - The recorder that sanitizes and persists new cassettes

pub mod client;
pub mod credentials;
pub mod error;
pub mod recorder;
pub mod transport;

pub use client::{HttpClientConfig, create_client};
pub use credentials::{AzureTarget, OpenAITarget, UpstreamCredentials, UpstreamTarget};
pub use error::{EgressError, Result};
pub use recorder::{Recorder, RecordingOutcome};
pub use transport::{CapturedExchange, CapturingTransport, UpstreamResponse};
