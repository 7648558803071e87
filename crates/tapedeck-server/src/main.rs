//! Tapedeck replay server
//!
//! Answers OpenAI and Azure OpenAI API calls from recorded cassettes, and
//! records a new cassette from the live upstream when a request names one
//! that does not exist yet.
//!
//! Usage:
//! ```bash
//! # Replay from ./cassettes on a random port
//! tapedeck-server
//!
//! # With a config file and a fixed port
//! tapedeck-server --config tapedeck.yaml --port 8089
//!
//! # Record new cassettes (credentials come from the environment)
//! OPENAI_API_KEY=sk-... tapedeck-server --cassettes-dir tests/cassettes
//!
//! # Show what would be served
//! tapedeck-server list
//! ```
//!
//! Test with:
//! ```bash
//! curl http://localhost:8089/v1/chat/completions \
//!   -H "Content-Type: application/json" \
//!   -H "X-Cassette-Name: chat-basic" \
//!   -d '{"model": "gpt-4o-mini", "messages": [{"role": "user", "content": "Hello!"}]}'
//! ```

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tapedeck_egress::UpstreamCredentials;
use tapedeck_server::{LoggingConfig, ServerConfig, build_app, load_store};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Tapedeck Server - record/replay harness for LLM APIs
#[derive(Parser)]
#[command(name = "tapedeck-server")]
#[command(about = "Replays recorded LLM API interactions from cassette files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (YAML or TOML)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "TAPEDECK_CONFIG",
        global = true
    )]
    config: Option<String>,

    /// Directory cassettes are loaded from and recorded into
    #[arg(long, value_name = "DIR", global = true)]
    cassettes_dir: Option<PathBuf>,

    /// Address to bind
    #[arg(long, global = true)]
    host: Option<String>,

    /// Port to bind (0 picks a free port)
    #[arg(short, long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the replay server (default if no command specified)
    Serve,
    /// Print loaded cassettes with their interaction counts
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };

    // Merge environment variables (they override config file)
    config.merge_env();

    // CLI flags have the highest precedence
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(dir) = cli.cassettes_dir {
        config.cassettes_dir = dir;
    }

    init_tracing(&config.logging)?;

    if let Some(path) = &cli.config {
        info!("Loaded configuration from {}", path);
    }

    match cli.command {
        Some(Commands::List) => list(&config),
        Some(Commands::Serve) | None => serve(config).await,
    }
}

/// Install the global subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if logging.json {
        let subscriber = FmtSubscriber::builder()
            .json()
            .with_env_filter(filter)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

fn list(config: &ServerConfig) -> anyhow::Result<()> {
    let store = load_store(&config.cassettes_dir)?;
    for cassette in store.cassettes() {
        println!("{}\t{}", cassette.name, cassette.interactions.len());
    }
    Ok(())
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    info!("Initializing Tapedeck replay server");

    let credentials = UpstreamCredentials::from_env();
    if credentials.openai.is_none() && credentials.azure.is_none() {
        warn!("No upstream credentials set; requests for new cassettes will fail");
    }

    let app = build_app(&config, credentials)?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    let bound = listener.local_addr()?;

    info!("");
    info!("Tapedeck listening on http://{}", bound);
    info!("   Cassettes: {}", config.cassettes_dir.display());
    info!("   Loaded: {} cassettes", app.store.len());
    info!("   Observability:");
    info!("   - Health check:       http://{}/healthz", bound);
    info!("   - Readiness check:    http://{}/readyz", bound);
    info!("   - Prometheus metrics: http://{}/metrics", bound);
    info!("");

    axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
