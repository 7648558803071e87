//! Reading streamed chat completions

use crate::{ClientError, Result};
use bytes::Bytes;
use eventsource_stream::EventStream;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::debug;

const DONE: &str = "[DONE]";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Collect chat completion chunks from an event stream
///
/// Stops at `data: [DONE]`; chunks that are not valid JSON are skipped.
/// Returns the chunks and the concatenated content of each chunk's first choice.
pub async fn read_chat_completion_events<S, B, E>(stream: S) -> Result<(Vec<ChatCompletionChunk>, String)>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut events = EventStream::new(stream);
    let mut chunks = Vec::new();
    let mut content = String::new();

    while let Some(event) = events.next().await {
        let event = event.map_err(|e| ClientError::Stream(e.to_string()))?;
        if event.data.is_empty() {
            continue;
        }
        if event.data == DONE {
            break;
        }

        match serde_json::from_str::<ChatCompletionChunk>(&event.data) {
            Ok(chunk) => {
                if let Some(text) = chunk.choices.first().and_then(|c| c.delta.content.as_deref()) {
                    content.push_str(text);
                }
                chunks.push(chunk);
            }
            Err(e) => debug!("Skipping malformed chunk {:?}: {}", event.data, e),
        }
    }

    Ok((chunks, content))
}

/// Collect chat completion chunks from a fully buffered event stream body
pub fn read_chat_completion_stream(body: &[u8]) -> (Vec<ChatCompletionChunk>, String) {
    let stream = futures::stream::iter([Ok::<_, Infallible>(Bytes::copy_from_slice(body))]);
    match futures::executor::block_on(read_chat_completion_events(stream)) {
        Ok(read) => read,
        Err(e) => {
            debug!("In-memory event stream failed: {}", e);
            (Vec::new(), String::new())
        }
    }
}

/// Collect chat completion chunks from a live streamed response
pub async fn read_chat_completion_response(
    response: reqwest::Response,
) -> Result<(Vec<ChatCompletionChunk>, String)> {
    read_chat_completion_events(Box::pin(response.bytes_stream())).await
}

/// Usage from the last chunk that reports it, or zeros
pub fn extract_token_usage(chunks: &[ChatCompletionChunk]) -> TokenUsage {
    chunks
        .iter()
        .rev()
        .find_map(|chunk| chunk.usage)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n\
data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hello\"}}]}\n\n\
data: not json\n\n\
data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" world\"},\"finish_reason\":\"stop\"}]}\n\n\
data: {\"id\":\"c1\",\"choices\":[],\"usage\":{\"prompt_tokens\":9,\"completion_tokens\":2,\"total_tokens\":11}}\n\n\
data: [DONE]\n\n\
data: {\"id\":\"after-done\",\"choices\":[]}\n\n";

    #[test]
    fn test_read_stream() {
        let (chunks, content) = read_chat_completion_stream(STREAM.as_bytes());

        assert_eq!(chunks.len(), 4);
        assert_eq!(content, "Hello world");
        assert_eq!(chunks[2].choices[0].finish_reason.as_deref(), Some("stop"));
        assert!(chunks.iter().all(|c| c.id == "c1"));
    }

    #[test]
    fn test_extract_token_usage() {
        let (chunks, _) = read_chat_completion_stream(STREAM.as_bytes());
        assert_eq!(
            extract_token_usage(&chunks),
            TokenUsage {
                prompt_tokens: 9,
                completion_tokens: 2,
                total_tokens: 11,
            }
        );
        assert_eq!(extract_token_usage(&[]), TokenUsage::default());
    }

    #[tokio::test]
    async fn test_read_split_across_chunks() {
        let parts: Vec<std::result::Result<Bytes, Infallible>> = vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"con")),
            Ok(Bytes::from_static(b"tent\":\"Hi\"}}]}\n")),
            Ok(Bytes::from_static(b"\ndata: [DONE]\n\n")),
        ];
        let (chunks, content) = read_chat_completion_events(futures::stream::iter(parts))
            .await
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(content, "Hi");
    }
}
