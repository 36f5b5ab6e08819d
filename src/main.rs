//! # quattro
//!
//! Four-in-a-row game server binary: resolves configuration, installs
//! logging and serves games until ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use quattro_server::{load_config, QuattroServer};
use quattro_telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use tracing::Level;

/// Quattro game server.
#[derive(Parser, Debug)]
#[command(name = "quattro", about = "Live four-in-a-row games over WebSocket")]
struct Cli {
    /// Host to bind (overrides config and QUATTRO_HOST).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides config and QUATTRO_PORT).
    #[arg(long)]
    port: Option<u16>,

    /// JSON config file merged over the defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Default log level. RUST_LOG takes precedence when set.
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Log output: json or pretty.
    #[arg(long, default_value = "json")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    init_telemetry(&TelemetryConfig {
        log_level: args.log_level,
        module_levels: Vec::new(),
        format: args.log_format,
    })
    .context("Failed to initialize logging")?;

    let mut config = load_config(args.config.as_deref()).context("Failed to load config")?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config.validate().context("Invalid configuration")?;

    let server = QuattroServer::new(config);
    let (addr, handle) = server
        .listen()
        .await
        .with_context(|| format!("Failed to bind {}", server.config().bind_addr()))?;
    tracing::info!(%addr, "quattro server ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!(
        connections = server.connection_count(),
        sessions = server.registry().session_count(),
        "shutting down"
    );
    server.shutdown().graceful_shutdown(vec![handle]).await;
    Ok(())
}
