//! Health endpoints
//!
//! - `/healthz` - Liveness check
//! - `/readyz` - Readiness check, reporting the number of loaded cassettes
//! - `/metrics` - Prometheus metrics endpoint

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::TextEncoder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::metrics::Metrics;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    /// Number of cassettes available for replay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cassettes: Option<usize>,
}

/// Readiness checker trait
pub trait ReadinessChecker: Send + Sync {
    fn is_ready(&self) -> bool;

    fn cassette_count(&self) -> usize;
}

#[derive(Clone)]
pub struct HealthState {
    pub metrics: Arc<Metrics>,
    pub readiness_checker: Option<Arc<dyn ReadinessChecker>>,
}

impl HealthState {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            readiness_checker: None,
        }
    }

    pub fn with_readiness_checker(
        metrics: Arc<Metrics>,
        readiness_checker: Arc<dyn ReadinessChecker>,
    ) -> Self {
        Self {
            metrics,
            readiness_checker: Some(readiness_checker),
        }
    }
}

/// Create health check router
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn readyz(State(state): State<HealthState>) -> Response {
    match &state.readiness_checker {
        Some(checker) if !checker.is_ready() => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                cassettes: Some(checker.cassette_count()),
            }),
        )
            .into_response(),
        Some(checker) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                cassettes: Some(checker.cassette_count()),
            }),
        )
            .into_response(),
        None => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                cassettes: None,
            }),
        )
            .into_response(),
    }
}

async fn metrics_handler(State(state): State<HealthState>) -> Response {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();

    match encoder.encode_to_string(&metric_families) {
        Ok(body) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", err),
        )
            .into_response(),
    }
}
