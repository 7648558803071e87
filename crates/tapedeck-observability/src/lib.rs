//! Tapedeck Observability
//!
//! This crate provides observability features:
//! - Metrics collection (Prometheus)
//! - Health endpoints
//! - Normalized comparison of recorded telemetry spans

pub mod health;
pub mod metrics;
pub mod span_compare;

pub use health::{HealthState, ReadinessChecker, health_router};
pub use metrics::Metrics;
pub use span_compare::{Span, normalize_span, spans_equivalent};
