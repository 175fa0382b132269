//! VPN Control Daemon (vpnctld)
//!
//! Serves the connection and profile registries over HTTP/JSON with a
//! WebSocket event stream.
//!
//! # Usage
//!
//! ```bash
//! # Start with built-in defaults (127.0.0.1:8080)
//! vpnctld
//!
//! # Start from a config file, overriding the listen address
//! vpnctld --config /etc/vpnctl/vpnctld.toml --listen 0.0.0.0:8080
//!
//! # Start with verbose logging
//! vpnctld --verbose
//! ```

use anyhow::Context;
use clap::Parser;
use libvpnctl::api::{self, AppState};
use libvpnctl::config::DaemonConfig;
use libvpnctl::connection::{ConnectionRegistry, SimulatedDriver};
use libvpnctl::error::VpnctlResult;
use libvpnctl::events::EventBus;
use libvpnctl::profile::{ProfileStore, TunnelType};
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// VPN Control Daemon
#[derive(Parser, Debug)]
#[command(name = "vpnctld")]
#[command(author = "vpnctl contributors")]
#[command(version)]
#[command(about = "VPN Control Daemon - HTTP/WebSocket API for VPN profiles and connections", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides server.listen)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    log_level: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = DaemonConfig::load_or_default(args.config.as_deref())
        .await
        .context("failed to load configuration")?;
    config
        .apply_overrides(args.listen, args.log_level.as_deref())
        .context("invalid configuration")?;

    init_logging(&args, &config);

    info!("Starting VPN Control Daemon (vpnctld)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let events = EventBus::new(config.server.event_buffer);
    let profiles = ProfileStore::new(events.clone());
    let mut connections =
        ConnectionRegistry::new(profiles.clone(), events.clone(), config.registry_settings());

    let delay = config.handshake_delay();
    connections.register_driver(
        TunnelType::WireGuard,
        Arc::new(SimulatedDriver::new("wireguard-sim", delay)),
    );
    connections.register_driver(
        TunnelType::OpenVpn,
        Arc::new(SimulatedDriver::new("openvpn-sim", delay)),
    );

    let state = AppState {
        connections: connections.clone(),
        profiles,
        events,
    };
    let app = api::router(state);

    let shutdown = shutdown_signal().context("failed to install signal handlers")?;

    let listener = tokio::net::TcpListener::bind(config.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen))?;
    info!("Listening on http://{}/api/v1", config.server.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    info!("Shutting down VPN Control Daemon...");
    if let Err(e) = connections.disconnect_all().await {
        error!("Error during shutdown: {}", e);
    }

    info!("VPN Control Daemon stopped");
    Ok(())
}

/// Initialize logging based on command-line arguments and configuration
fn init_logging(args: &Args, config: &DaemonConfig) {
    let log_level = if args.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "vpnctld={0},libvpnctl={0},tower_http={0}",
            log_level
        ))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(atty::is(atty::Stream::Stdout))
        .init();
}

/// Resolve once SIGTERM or SIGINT arrives
#[cfg(unix)]
fn shutdown_signal() -> VpnctlResult<impl Future<Output = ()>> {
    use libvpnctl::error::VpnctlError;
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
        VpnctlError::ServiceError(format!("Failed to register SIGTERM handler: {}", e))
    })?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| {
        VpnctlError::ServiceError(format!("Failed to register SIGINT handler: {}", e))
    })?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
            }
        }
    })
}

/// Resolve once Ctrl+C arrives
#[cfg(not(unix))]
fn shutdown_signal() -> VpnctlResult<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
            Err(e) => tracing::warn!("Failed to listen for Ctrl+C: {}", e),
        }
    })
}
