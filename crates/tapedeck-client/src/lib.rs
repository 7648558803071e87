//! Tapedeck Client
//!
//! Helpers for tests that talk to a running tapedeck server:
//! - Building cassette-addressed requests for each request kind
//! - Reading streamed chat completions back into chunks and text

pub mod error;
pub mod request;
pub mod stream;

pub use error::{ClientError, Result};
pub use request::CassetteRequest;
pub use stream::{
    ChatCompletionChunk, TokenUsage, extract_token_usage, read_chat_completion_events,
    read_chat_completion_response, read_chat_completion_stream,
};
