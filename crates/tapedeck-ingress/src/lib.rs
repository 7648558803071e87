//! Tapedeck Ingress
//!
//! The HTTP face of the harness:
//! - Replay of recorded interactions, scoped by `X-Cassette-Name` or open
//! - Paced server-sent event emission for streamed responses
//! - Delegation to the recorder on a cache miss
//! - Harness diagnostics marked apart from genuine upstream errors

pub mod details;
pub mod error;
pub mod replay;
pub mod sse;

pub use error::{ReplayError, ReplayResult};
pub use replay::{DEFAULT_MAX_BODY_BYTES, ReplayConfig, ReplayState, router};
pub use sse::{paced_events, split_sse_events};
