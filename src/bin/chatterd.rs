//! chatter daemon - TCP broadcast chat server
//!
//! Clients connect with any raw TCP tool, type, and see everyone else's
//! completed messages plus a replay of recent history.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the port from the environment
//! TCP_PORT=:8080 chatterd
//!
//! # Explicit port and a config file
//! chatterd --port 9000 --config /etc/chatter.toml
//!
//! # Enable debug logging
//! RUST_LOG=chatterd=debug chatterd --port 8080
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: Graceful shutdown

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chatterd::config::ServerConfig;
use chatterd::coordinator::spawn_coordinator;
use chatterd::server::ChatServer;

/// chatter - TCP broadcast chat server
#[derive(Parser, Debug)]
#[command(name = "chatterd", version, about)]
struct Args {
    /// Port to listen on (`8080`, `:8080` or `host:8080`)
    #[arg(short, long, env = "TCP_PORT")]
    port: Option<String>,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("chatterd=info".parse()?)
                .add_directive("chatter_core=info".parse()?),
        )
        .init();

    let config = load_config(&args)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        listen = %config.listen,
        "chatter daemon starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let coordinator = spawn_coordinator(&config).context("Invalid server configuration")?;

    let server = ChatServer::bind(config, coordinator, cancel_token)
        .await
        .context("Failed to start listener")?;

    server.run().await?;

    info!("chatter daemon stopped");
    Ok(())
}

/// Layers the config file and the port override over the defaults.
fn load_config(args: &Args) -> Result<ServerConfig> {
    let config = match &args.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ServerConfig::default(),
    };

    let config = match &args.port {
        Some(port) => config.with_port(port).context("Invalid listen port")?,
        None => config,
    };

    config.validate()?;
    Ok(config)
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
