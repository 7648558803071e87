//! Replay engine
//!
//! Every request that reaches the fallback handler goes through the same
//! sequence: buffer the body, then either look inside the cassette named by
//! `X-Cassette-Name` or scan every loaded cassette, and replay the first
//! recorded interaction that matches. A named cassette that does not exist
//! yet is recorded from the live upstream, and replayed from then on.

use crate::details::request_details;
use crate::error::{ReplayError, ReplayResult};
use crate::sse::{paced_events, split_sse_events};
use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::sync::Arc;
use std::time::Duration;
use tapedeck_core::{CASSETTE_NAME_HEADER, HeaderSet, Headers, Interaction, Provider};
use tapedeck_egress::{Recorder, UpstreamCredentials, UpstreamResponse};
use tapedeck_matching::{LiveRequest, Matcher};
use tapedeck_observability::Metrics;
use tapedeck_storage::CassetteStore;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Response headers never copied onto a replayed or proxied response
fn unreplayed_headers() -> HeaderSet {
    HeaderSet::new([
        "content-length",
        "connection",
        "keep-alive",
        "proxy-authenticate",
        "proxy-authorization",
        "te",
        "trailers",
        "transfer-encoding",
        "upgrade",
    ])
}

/// Default cap on a buffered request body (32 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Simulated streaming latency and request limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Delay before the first byte of any replayed body
    pub ttft: Duration,
    /// Delay between streamed events
    pub itl: Duration,
    /// Largest request body accepted
    pub max_body_bytes: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            ttft: Duration::from_millis(2),
            itl: Duration::from_millis(1),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Clone)]
pub struct ReplayState {
    pub store: Arc<CassetteStore>,
    pub matcher: Arc<Matcher>,
    pub recorder: Arc<Recorder>,
    pub config: ReplayConfig,
    pub metrics: Option<Arc<Metrics>>,
}

impl ReplayState {
    pub fn new(store: Arc<CassetteStore>, recorder: Arc<Recorder>) -> Self {
        Self {
            store,
            matcher: Arc::new(Matcher::default()),
            recorder,
            config: ReplayConfig::default(),
            metrics: None,
        }
    }

    pub fn with_config(mut self, config: ReplayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = Arc::new(matcher);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Router answering every path from cassettes
pub fn router(state: ReplayState) -> Router {
    Router::new()
        .fallback(replay_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn replay_handler(State(state): State<ReplayState>, request: Request) -> Response {
    match handle(&state, request).await {
        Ok(response) => response,
        Err(err) => {
            match err.status_code() {
                StatusCode::CONFLICT => warn!("{}", err),
                _ => error!("{}", err),
            }
            if let Some(metrics) = &state.metrics {
                metrics.record_miss(err.kind());
            }
            err.into_response()
        }
    }
}

async fn handle(state: &ReplayState, request: Request) -> ReplayResult<Response> {
    let (parts, body) = request.into_parts();
    let limit = state.config.max_body_bytes;
    let body = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                ReplayError::BodyTooLarge { limit }
            } else {
                ReplayError::BodyRead(e.to_string())
            }
        })?
        .to_bytes();
    let live = LiveRequest::from_parts(&parts, body);

    let cassette_name = live
        .header(CASSETTE_NAME_HEADER)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    match cassette_name {
        Some(name) => scoped_lookup(state, &live, &name).await,
        None => open_lookup(state, &live).await,
    }
}

async fn scoped_lookup(state: &ReplayState, live: &LiveRequest, name: &str) -> ReplayResult<Response> {
    let recorded = state.recorder.recorded(name);
    let Some(cassette) = state.store.get(name).or(recorded.as_deref()) else {
        debug!("Cassette {} is not loaded, recording", name);
        return record(state, live, name).await;
    };

    if let Some(interaction) = state.matcher.first_match(live, &cassette.interactions) {
        info!(
            "Replaying {} {} from cassette {} (interaction {})",
            live.method,
            live.path(),
            name,
            interaction.id
        );
        return replay(state, name, interaction).await;
    }

    let provider = Provider::for_cassette(name);
    Err(ReplayError::InteractionOutOfDate {
        method: live.method.to_string(),
        path: live.path().to_string(),
        cassette_file: format!(
            "{}/{}.yaml",
            state.recorder.writer().root().display(),
            name
        ),
        api_key_env: UpstreamCredentials::api_key_env(provider),
    })
}

async fn open_lookup(state: &ReplayState, live: &LiveRequest) -> ReplayResult<Response> {
    // Loaded cassettes first, then ones recorded since startup
    let recorded = state.recorder.recorded_cassettes();
    for cassette in state.store.cassettes().chain(recorded.iter().map(Arc::as_ref)) {
        if let Some(interaction) = state.matcher.first_match(live, &cassette.interactions) {
            info!(
                "Replaying {} {} from cassette {} (interaction {})",
                live.method,
                live.path(),
                cassette.name,
                interaction.id
            );
            return replay(state, &cassette.name, interaction).await;
        }
    }

    Err(ReplayError::NoCassetteMatch {
        method: live.method.to_string(),
        path: live.path().to_string(),
        details: request_details(live, HeaderSet::request_redactions()),
    })
}

async fn record(state: &ReplayState, live: &LiveRequest, name: &str) -> ReplayResult<Response> {
    let provider = Provider::for_cassette(name);
    let method = live.method.to_string();

    match state.recorder.record(live, name).await {
        Ok(outcome) => {
            info!(
                "Recorded cassette {} to {} in {:?}",
                name,
                outcome.path.display(),
                outcome.elapsed
            );
            if let Some(metrics) = &state.metrics {
                metrics.record_recording(provider.name(), "recorded");
                metrics.observe_recording_latency(provider.name(), outcome.elapsed.as_secs_f64());
            }
            Ok(upstream_response(outcome.response))
        }
        Err(err) => {
            if let Some(metrics) = &state.metrics {
                metrics.record_recording(provider.name(), "failed");
            }
            Err(ReplayError::from_recording(err, &method, live.path()))
        }
    }
}

/// Write a recorded response back, pacing event streams
async fn replay(state: &ReplayState, cassette: &str, interaction: &Interaction) -> ReplayResult<Response> {
    let recorded = &interaction.response;
    let status = StatusCode::from_u16(recorded.code).map_err(|_| ReplayError::InvalidRecording {
        cassette: cassette.to_string(),
        reason: format!("status code {}", recorded.code),
    })?;
    let headers = replayed_headers(&recorded.headers);
    let streamed = recorded.is_event_stream();

    let body = if streamed {
        let events = split_sse_events(&recorded.body.to_text());
        debug!("Streaming {} events from cassette {}", events.len(), cassette);
        Body::from_stream(paced_events(events, state.config.ttft, state.config.itl))
    } else {
        tokio::time::sleep(state.config.ttft).await;
        Body::from(recorded.body.as_bytes().to_vec())
    };

    if let Some(metrics) = &state.metrics {
        metrics.record_replay(streamed);
    }

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

fn replayed_headers(recorded: &Headers) -> HeaderMap {
    let skipped = unreplayed_headers();
    let mut headers = HeaderMap::new();
    for (name, values) in recorded.iter() {
        if skipped.contains(name) {
            continue;
        }
        let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
            warn!("Skipping recorded header with invalid name: {}", name);
            continue;
        };
        for value in values {
            match HeaderValue::from_str(value) {
                Ok(v) => {
                    headers.append(header_name.clone(), v);
                }
                Err(_) => warn!("Skipping invalid value of recorded header {}", name),
            }
        }
    }
    headers
}

/// The live upstream response, minus hop-by-hop headers
fn upstream_response(upstream: UpstreamResponse) -> Response {
    let skipped = unreplayed_headers();
    let mut headers = HeaderMap::new();
    for (name, value) in upstream.headers.iter() {
        if !skipped.contains(name.as_str()) {
            headers.append(name.clone(), value.clone());
        }
    }

    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = upstream.status;
    *response.headers_mut() = headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replayed_headers_drop_transport_headers() {
        let recorded: Headers = [
            ("Content-Type", "application/json"),
            ("Content-Length", "17"),
            ("Transfer-Encoding", "chunked"),
            ("X-Request-Id", "req_1"),
        ]
        .into_iter()
        .collect();

        let headers = replayed_headers(&recorded);
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["x-request-id"], "req_1");
        assert!(!headers.contains_key("content-length"));
        assert!(!headers.contains_key("transfer-encoding"));
    }

    #[test]
    fn test_replayed_headers_keep_multiple_values() {
        let mut recorded = Headers::new();
        recorded.append("Vary", "Origin");
        recorded.append("Vary", "Accept-Encoding");

        let headers = replayed_headers(&recorded);
        let values: Vec<_> = headers.get_all("vary").iter().collect();
        assert_eq!(values, vec!["Origin", "Accept-Encoding"]);
    }

    #[test]
    fn test_replay_config_defaults() {
        let config = ReplayConfig::default();
        assert_eq!(config.ttft, Duration::from_millis(2));
        assert_eq!(config.itl, Duration::from_millis(1));
    }
}
