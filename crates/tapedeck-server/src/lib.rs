//! Tapedeck Server
//!
//! Start-up wiring for the replay server: configuration layering and the
//! assembled application router. The binary in `main.rs` adds the CLI,
//! logging and the listener on top.

pub mod app;
pub mod config;

pub use app::{App, StoreReadiness, build_app, load_store};
pub use config::{LoggingConfig, ReplaySettings, ServerConfig, UpstreamSettings};
