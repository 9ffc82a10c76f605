//! waypoint-relay: local realtime relay for presence channel clients.

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use waypoint_config::WaypointConfig;
use waypoint_relay::{RelayOptions, RelayServer};

#[derive(Parser)]
#[command(name = "waypoint-relay", version, about = "Phoenix-channels relay for waypoint presence clients")]
struct Args {
    /// Address to listen on (overrides `relay.bind`).
    #[arg(short, long)]
    bind: Option<String>,

    /// Accepted API key. Repeat for several; none accepts every client.
    #[arg(long = "api-key")]
    api_keys: Vec<String>,

    /// Largest broadcast payload in bytes (overrides `relay.max_payload_bytes`).
    #[arg(long)]
    max_payload_bytes: Option<usize>,

    /// Config file path override.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

fn load_config(path: Option<&PathBuf>) -> WaypointConfig {
    let loaded = match path {
        Some(path) => waypoint_config::load_config_from(path),
        None => waypoint_config::load_config(),
    };
    loaded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        WaypointConfig::default()
    })
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = match args.log_level.as_deref() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("waypoint_relay=info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config(args.config.as_ref());
    let bind = args.bind.unwrap_or(config.relay.bind);
    let api_keys = if args.api_keys.is_empty() {
        config.relay.api_keys
    } else {
        args.api_keys
    };
    let options = RelayOptions {
        api_keys,
        max_payload_bytes: args
            .max_payload_bytes
            .unwrap_or(config.relay.max_payload_bytes as usize),
    };

    let server = match RelayServer::bind(bind.as_str(), options.clone()).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(bind = %bind, error = %e, "Failed to bind TCP listener");
            std::process::exit(1);
        }
    };

    match server.local_addr() {
        Ok(addr) => tracing::info!(addr = %addr, options = ?options, "waypoint-relay listening"),
        Err(e) => tracing::warn!(error = %e, "Listening on unknown address"),
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down");
        }
        shutdown.cancel();
    });

    server.run(cancel).await;
}
