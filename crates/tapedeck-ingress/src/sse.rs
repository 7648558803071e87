//! Server-sent event splitting and paced emission
//!
//! A recorded event stream is stored as one text body. On replay it is cut
//! back into events and written one at a time with a short delay before the
//! first event and between events, so that time-to-first-token and
//! inter-token latency measured by the caller are non-zero.

use bytes::Bytes;
use futures::Stream;
use std::convert::Infallible;
use std::time::Duration;

/// Event separator
pub const EVENT_SEPARATOR: &str = "\n\n";

/// Split a recorded stream body into events
///
/// Empty events are skipped; a trailing event without a separator is kept.
pub fn split_sse_events(body: &str) -> Vec<String> {
    body.split(EVENT_SEPARATOR)
        .filter(|event| !event.is_empty())
        .map(str::to_string)
        .collect()
}

/// Emit `events` in order, each followed by a blank line
///
/// Waits `ttft` before the first event and `itl` between events.
pub fn paced_events(
    events: Vec<String>,
    ttft: Duration,
    itl: Duration,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    futures::stream::unfold((events.into_iter(), true), move |(mut events, first)| async move {
        let event = events.next()?;
        tokio::time::sleep(if first { ttft } else { itl }).await;
        let chunk = Bytes::from(format!("{}{}", event, EVENT_SEPARATOR));
        Some((Ok(chunk), (events, false)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Instant;

    #[test]
    fn test_split_events() {
        let body = "data: {\"a\":1}\n\ndata: {\"a\":2}\n\ndata: [DONE]\n\n";
        assert_eq!(
            split_sse_events(body),
            vec!["data: {\"a\":1}", "data: {\"a\":2}", "data: [DONE]"]
        );
    }

    #[test]
    fn test_split_keeps_trailing_partial_event() {
        assert_eq!(
            split_sse_events("data: 1\n\ndata: 2"),
            vec!["data: 1", "data: 2"]
        );
        assert_eq!(split_sse_events("data: 1\n"), vec!["data: 1\n"]);
    }

    #[test]
    fn test_split_skips_empty_events() {
        assert_eq!(
            split_sse_events("\n\ndata: 1\n\n\n\nevent: done\ndata: 2\n\n"),
            vec!["data: 1", "event: done\ndata: 2"]
        );
        assert!(split_sse_events("").is_empty());
    }

    #[tokio::test]
    async fn test_paced_events_in_order() {
        let events = split_sse_events("data: a\n\ndata: b\n\ndata: c\n\n");
        let chunks: Vec<Bytes> = paced_events(events, Duration::ZERO, Duration::ZERO)
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        assert_eq!(
            chunks,
            vec![
                Bytes::from("data: a\n\n"),
                Bytes::from("data: b\n\n"),
                Bytes::from("data: c\n\n"),
            ]
        );
    }

    #[tokio::test]
    async fn test_paced_events_wait() {
        let started = Instant::now();
        let events = vec!["data: a".to_string(), "data: b".to_string()];
        let count = paced_events(events, Duration::from_millis(20), Duration::from_millis(10))
            .count()
            .await;

        assert_eq!(count, 2);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
