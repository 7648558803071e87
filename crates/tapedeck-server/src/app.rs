//! Application assembly
//!
//! Loads the cassette directory once, builds the recorder from the
//! resolved credentials, and serves the health routes next to the replay
//! fallback.

use crate::config::ServerConfig;
use anyhow::Context;
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tapedeck_egress::{CapturingTransport, Recorder, UpstreamCredentials, create_client};
use tapedeck_ingress::{ReplayState, router};
use tapedeck_observability::{HealthState, Metrics, ReadinessChecker, health_router};
use tapedeck_sanitize::StandardSanitizer;
use tapedeck_storage::{CassetteStore, CassetteWriter, DirSource};

/// Readiness backed by the loaded cassette store
pub struct StoreReadiness {
    store: Arc<CassetteStore>,
}

impl StoreReadiness {
    pub fn new(store: Arc<CassetteStore>) -> Self {
        Self { store }
    }
}

impl ReadinessChecker for StoreReadiness {
    fn is_ready(&self) -> bool {
        true
    }

    fn cassette_count(&self) -> usize {
        self.store.len()
    }
}

pub struct App {
    pub router: Router,
    pub store: Arc<CassetteStore>,
    pub metrics: Arc<Metrics>,
}

/// Load every cassette under `dir`; a missing directory yields an empty store
pub fn load_store(dir: &Path) -> anyhow::Result<CassetteStore> {
    CassetteStore::load(&DirSource::new(dir))
        .with_context(|| format!("failed to load cassettes from {}", dir.display()))
}

pub fn build_app(config: &ServerConfig, credentials: UpstreamCredentials) -> anyhow::Result<App> {
    let store = Arc::new(load_store(&config.cassettes_dir)?);

    let client = create_client(&config.http_client_config())?;
    let recorder = Recorder::new(
        CapturingTransport::new(client),
        credentials,
        Arc::new(StandardSanitizer::default()),
        CassetteWriter::new(&config.cassettes_dir),
    );

    let metrics = Arc::new(Metrics::new().context("failed to register metrics")?);
    let state = ReplayState::new(store.clone(), Arc::new(recorder))
        .with_config(config.replay_config())
        .with_metrics(metrics.clone());

    let health_state = HealthState::with_readiness_checker(
        metrics.clone(),
        Arc::new(StoreReadiness::new(store.clone())),
    );

    let router = health_router(health_state).merge(router(state));

    Ok(App {
        router,
        store,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const CASSETTE: &str = r#"---
version: 2
interactions:
    - id: 0
      request:
        body: '{"model":"m","input":"hi"}'
        headers:
            Content-Type:
                - application/json
        url: https://api.openai.com/v1/embeddings
        method: POST
      response:
        body: '{"data":[]}'
        headers:
            Content-Type:
                - application/json
        status: 200 OK
        code: 200
"#;

    fn config_for(dir: &Path) -> ServerConfig {
        ServerConfig {
            cassettes_dir: dir.to_path_buf(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_missing_directory_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = load_store(&dir.path().join("absent")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_malformed_cassette_aborts_startup() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("good.yaml"), CASSETTE).unwrap();
        std::fs::write(dir.path().join("broken.yaml"), "interactions: [{").unwrap();

        let err = build_app(&config_for(dir.path()), UpstreamCredentials::none())
            .err()
            .unwrap();
        assert!(format!("{:#}", err).contains("broken"));
    }

    #[tokio::test]
    async fn test_readyz_reports_loaded_cassettes() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("embeddings.yaml"), CASSETTE).unwrap();
        std::fs::write(dir.path().join("nested/embeddings.yaml"), CASSETTE).unwrap();

        let app = build_app(&config_for(dir.path()), UpstreamCredentials::none()).unwrap();
        assert_eq!(app.store.len(), 2);
        assert!(app.store.contains("nested/embeddings"));

        let response = app
            .router
            .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("\"cassettes\":2"), "{}", body);
    }

    #[tokio::test]
    async fn test_health_routes_do_not_reach_replay() {
        let dir = TempDir::new().unwrap();
        let app = build_app(&config_for(dir.path()), UpstreamCredentials::none()).unwrap();

        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-tapedeck-error"));

        let response = app
            .router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/embeddings")
                    .body(Body::from(r#"{"model":"m","input":"hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["x-tapedeck-error"], "true");
    }
}
