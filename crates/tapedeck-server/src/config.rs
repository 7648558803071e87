use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tapedeck_egress::HttpClientConfig;
use tapedeck_ingress::{DEFAULT_MAX_BODY_BYTES, ReplayConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// `0` binds a random free port
    #[serde(default)]
    pub port: u16,

    /// Cassettes are loaded from and recorded into this directory
    #[serde(default = "default_cassettes_dir")]
    pub cassettes_dir: PathBuf,

    #[serde(default)]
    pub replay: ReplaySettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub upstream: UpstreamSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySettings {
    #[serde(default = "default_ttft_ms")]
    pub ttft_ms: u64,

    #[serde(default = "default_itl_ms")]
    pub itl_ms: u64,

    /// Requests with larger bodies are rejected with 413
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_false")]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
            cassettes_dir: default_cassettes_dir(),
            replay: ReplaySettings::default(),
            logging: LoggingConfig::default(),
            upstream: UpstreamSettings::default(),
        }
    }
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            ttft_ms: default_ttft_ms(),
            itl_ms: default_itl_ms(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .with_context(|| format!("invalid TOML in {}", path.display()))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .with_context(|| format!("invalid YAML in {}", path.display()))?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        self.merge_from(|key| std::env::var(key).ok());
    }

    /// Merge `TAPEDECK_*` settings resolved through `lookup`
    ///
    /// Values that fail to parse are reported and ignored.
    pub fn merge_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("TAPEDECK_HOST") {
            self.host = val;
        }

        if let Some(val) = lookup("TAPEDECK_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => eprintln!("Warning: Invalid TAPEDECK_PORT '{}', ignoring", val),
            }
        }

        if let Some(val) = lookup("TAPEDECK_CASSETTES_DIR") {
            self.cassettes_dir = PathBuf::from(val);
        }

        // Logging settings
        if let Some(val) = lookup("TAPEDECK_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Some(val) = lookup("TAPEDECK_LOG_JSON")
            && let Ok(json) = val.parse::<bool>()
        {
            self.logging.json = json;
        }

        // Replay pacing
        if let Some(val) = lookup("TAPEDECK_TTFT_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            self.replay.ttft_ms = ms;
        }

        if let Some(val) = lookup("TAPEDECK_ITL_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            self.replay.itl_ms = ms;
        }

        if let Some(val) = lookup("TAPEDECK_MAX_BODY_BYTES")
            && let Ok(bytes) = val.parse::<usize>()
        {
            self.replay.max_body_bytes = bytes;
        }

        if let Some(val) = lookup("TAPEDECK_UPSTREAM_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            self.upstream.timeout_secs = secs;
        }
    }

    pub fn replay_config(&self) -> ReplayConfig {
        ReplayConfig {
            ttft: Duration::from_millis(self.replay.ttft_ms),
            itl: Duration::from_millis(self.replay.itl_ms),
            max_body_bytes: self.replay.max_body_bytes,
        }
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout_secs: self.upstream.timeout_secs,
            connect_timeout_secs: self.upstream.connect_timeout_secs,
            ..HttpClientConfig::default()
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_cassettes_dir() -> PathBuf {
    PathBuf::from("./cassettes")
}

fn default_ttft_ms() -> u64 {
    2
}

fn default_itl_ms() -> u64 {
    1
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_false() -> bool {
    false
}
