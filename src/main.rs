//! chaos-proxy
//!
//! Sidecar that sits in front of a development service and degrades it on
//! purpose: random latency and synthetic 4xx/5xx responses, per policy.
//!
//! ```text
//!   client ──▶ chaos-proxy ──(maybe delay, maybe fail)──▶ upstream
//!                  │
//!                  └── GET /_chaos/policy  (active policy, never degraded)
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use chaos_proxy::config::{load_config, validate_config, ChaosConfig, ConfigError, ConfigWatcher};
use chaos_proxy::lifecycle::signals::spawn_signal_handler;
use chaos_proxy::observability::init_logging;
use chaos_proxy::{ChaosPolicy, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "chaos-proxy")]
#[command(about = "Inject latency and failures into HTTP traffic during development", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chaos sidecar
    Serve {
        /// Policy file (TOML). Watched for changes.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override server.bind_address
        #[arg(short, long)]
        bind: Option<String>,

        /// Override server.upstream
        #[arg(short, long)]
        upstream: Option<String>,
    },
    /// Validate a policy file and print the effective policy
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            bind,
            upstream,
        } => serve(config, bind, upstream).await,
        Commands::Check { config } => check(config),
    }
}

async fn serve(
    path: Option<PathBuf>,
    bind: Option<String>,
    upstream: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &path {
        Some(path) => load_config(path)?,
        None => ChaosConfig::default(),
    };
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }
    if upstream.is_some() {
        config.server.upstream = upstream;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.observability);
    tracing::info!("chaos-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let policy = ChaosPolicy::compile(&config)?;
    tracing::info!(
        environment = %policy.environment,
        environment_active = policy.is_active_environment(),
        enabled = policy.enabled,
        probability = policy.probability,
        "Chaos policy loaded"
    );
    if !policy.is_active_environment() {
        tracing::warn!(
            environment = %policy.environment,
            allowed = ?policy.allowed_environments,
            "Environment not allowed, all requests will pass through"
        );
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match &path {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), rx)
        }
        None => (None, mpsc::unbounded_channel().1),
    };

    let shutdown = Shutdown::new();
    spawn_signal_handler(&shutdown);

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn check(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&path)?;
    let policy = ChaosPolicy::compile(&config)?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "valid": true,
            "environment": policy.environment,
            "environment_active": policy.is_active_environment(),
            "policy": config,
        }))?
    );
    Ok(())
}
