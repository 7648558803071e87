//! End-to-end test support for Tapedeck
//!
//! Each test gets its own cassette directory and a real server bound to a
//! random local port, assembled the same way the binary assembles it.

use std::net::SocketAddr;
use std::path::Path;
use tapedeck_egress::{OpenAITarget, UpstreamCredentials};
use tapedeck_server::{ReplaySettings, ServerConfig, build_app};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub mod fixtures;

/// A running server; stopped when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Config for a server over `cassettes_dir` without replay pacing
pub fn test_config(cassettes_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        cassettes_dir: cassettes_dir.to_path_buf(),
        replay: ReplaySettings {
            ttft_ms: 0,
            itl_ms: 0,
            ..ReplaySettings::default()
        },
        ..ServerConfig::default()
    }
}

/// Load `cassettes_dir` and serve it on a random port
pub async fn spawn_server(cassettes_dir: &Path, credentials: UpstreamCredentials) -> TestServer {
    let app = build_app(&test_config(cassettes_dir), credentials).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        axum::serve(listener, app.router).await.unwrap();
    });

    TestServer {
        addr,
        base_url: format!("http://{}", addr),
        handle,
    }
}

/// Write `yaml` as cassette `name` under `dir`
pub fn write_cassette(dir: &Path, name: &str, yaml: &str) {
    let path = dir.join(format!("{}.yaml", name));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, yaml).unwrap();
}

/// A fresh cassette directory holding the given cassettes
pub fn cassette_dir(cassettes: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, yaml) in cassettes {
        write_cassette(dir.path(), name, yaml);
    }
    dir
}

/// OpenAI credentials pointed at a fake upstream
pub fn openai_credentials(upstream_uri: &str, api_key: &str) -> UpstreamCredentials {
    UpstreamCredentials {
        openai: Some(OpenAITarget::new(
            api_key,
            Some(&format!("{}/v1", upstream_uri)),
        )),
        azure: None,
    }
}
