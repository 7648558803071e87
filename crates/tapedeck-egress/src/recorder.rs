//! Cache-miss recording
//!
//! A recording proxies the live request upstream, sanitizes the captured
//! exchange and writes it as a brand-new cassette before the upstream
//! response is handed back to the caller. Cassettes recorded by this
//! process are kept in memory so a repeated request replays them.

use crate::credentials::UpstreamCredentials;
use crate::transport::{CapturingTransport, UpstreamResponse};
use crate::{EgressError, Result};
use dashmap::{DashMap, DashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tapedeck_core::{CASSETTE_NAME_HEADER, Cassette, HeaderSet, Headers, Provider};
use tapedeck_matching::LiveRequest;
use tapedeck_sanitize::InteractionSanitizer;
use tapedeck_storage::{CassetteWriter, StorageError};
use tracing::{error, info};

/// Request headers never forwarded upstream
fn unforwarded_headers() -> HeaderSet {
    HeaderSet::new([
        CASSETTE_NAME_HEADER,
        "host",
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

/// A completed recording
#[derive(Debug, Clone)]
pub struct RecordingOutcome {
    pub provider: Provider,
    pub response: UpstreamResponse,
    pub path: PathBuf,
    pub elapsed: Duration,
}

pub struct Recorder {
    transport: CapturingTransport,
    credentials: UpstreamCredentials,
    sanitizer: Arc<dyn InteractionSanitizer>,
    writer: CassetteWriter,
    in_flight: DashSet<String>,
    recorded: DashMap<String, Arc<Cassette>>,
}

/// Releases a cassette name when a recording ends, however it ends
struct InFlightGuard<'a> {
    set: &'a DashSet<String>,
    name: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.name);
    }
}

impl Recorder {
    pub fn new(
        transport: CapturingTransport,
        credentials: UpstreamCredentials,
        sanitizer: Arc<dyn InteractionSanitizer>,
        writer: CassetteWriter,
    ) -> Self {
        Self {
            transport,
            credentials,
            sanitizer,
            writer,
            in_flight: DashSet::new(),
            recorded: DashMap::new(),
        }
    }

    pub fn credentials(&self) -> &UpstreamCredentials {
        &self.credentials
    }

    pub fn writer(&self) -> &CassetteWriter {
        &self.writer
    }

    /// A cassette recorded by this process since startup
    pub fn recorded(&self, name: &str) -> Option<Arc<Cassette>> {
        self.recorded.get(name).map(|entry| entry.value().clone())
    }

    /// Every cassette recorded by this process, sorted by name
    pub fn recorded_cassettes(&self) -> Vec<Arc<Cassette>> {
        let mut cassettes: Vec<Arc<Cassette>> =
            self.recorded.iter().map(|entry| entry.value().clone()).collect();
        cassettes.sort_by(|a, b| a.name.cmp(&b.name));
        cassettes
    }

    /// Whether a recording for `provider` could be attempted
    pub fn can_record(&self, provider: Provider) -> bool {
        self.credentials.has(provider)
    }

    fn claim(&self, name: &str) -> Result<InFlightGuard<'_>> {
        if !self.in_flight.insert(name.to_string()) {
            return Err(EgressError::RecordingConflict {
                cassette: name.to_string(),
            });
        }
        Ok(InFlightGuard {
            set: &self.in_flight,
            name: name.to_string(),
        })
    }

    /// Record `live` as the single interaction of a new cassette named `cassette_name`
    pub async fn record(&self, live: &LiveRequest, cassette_name: &str) -> Result<RecordingOutcome> {
        self.writer.path_for(cassette_name)?;
        let provider = Provider::for_cassette(cassette_name);
        let target = self
            .credentials
            .target(provider)
            .ok_or(EgressError::MissingCredentials { provider })?;

        let _guard = self.claim(cassette_name)?;
        if self.writer.exists(cassette_name)? {
            return Err(EgressError::RecordingConflict {
                cassette: cassette_name.to_string(),
            });
        }
        self.writer.ensure_root()?;

        let url = target.build_url(live.path(), live.query())?;

        let mut headers: Headers = live.headers.clone();
        headers.remove_all(&unforwarded_headers());
        let (auth_name, auth_value) = target.auth_header();
        headers.insert(auth_name, auth_value);

        info!(
            "Recording cassette {} via {}: {} {}",
            cassette_name,
            provider,
            live.method,
            live.path()
        );
        let captured = self
            .transport
            .round_trip(live.method.clone(), &url, &headers, live.body.clone())
            .await?;

        let sanitized = self.sanitizer.sanitize(captured.interaction).map_err(|e| {
            error!("Sanitizing recording for {} failed: {}", cassette_name, e);
            EgressError::from(e)
        })?;

        let mut cassette = Cassette::new(cassette_name);
        cassette.push(sanitized);
        let cassette = Arc::new(cassette);

        let writer = self.writer.clone();
        let to_write = cassette.clone();
        let path = tokio::task::spawn_blocking(move || writer.write_new(&to_write))
            .await
            .map_err(|e| EgressError::PersistFailed(format!("cassette writer task failed: {}", e)))?
            .map_err(|e| match e {
                StorageError::AlreadyExists(_) => EgressError::RecordingConflict {
                    cassette: cassette_name.to_string(),
                },
                other => {
                    error!("Persisting cassette {} failed: {}", cassette_name, other);
                    EgressError::PersistFailed(other.to_string())
                }
            })?;
        self.recorded.insert(cassette_name.to_string(), cassette);

        Ok(RecordingOutcome {
            provider,
            response: captured.response,
            path,
            elapsed: captured.elapsed,
        })
    }
}
