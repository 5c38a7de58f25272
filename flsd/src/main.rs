//! Fleet Load Stress - Instance Daemon
//!
//! Runs the per-instance stress worker pool and serves the status API
//! consumed by the operator console through the fleet load balancer.

#![forbid(unsafe_code)]

mod discovery;
mod http_api;
mod identity;
mod report;
mod stress;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use fls_common::FlsConfig;

#[derive(Parser)]
#[command(name = "flsd")]
#[command(author, version, about = "FLS daemon - per-instance stress controller")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides configuration)
    #[arg(short, long)]
    port: Option<u16>,

    /// Disable fleet discovery even if configured
    #[arg(long)]
    no_discovery: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("Starting FLS daemon...");

    let config = FlsConfig::load(cli.config.as_deref())?;
    let port = cli.port.unwrap_or(config.server.port);

    let pool = Arc::new(stress::StressPool::new(config.stress.shutdown_grace()));
    let identity = Arc::new(identity::IdentityResolver::new()?);
    let reporter = report::StatusReporter::new(pool.clone(), identity);

    let discovery = if cli.no_discovery || !config.discovery.enabled {
        info!("fleet discovery disabled");
        None
    } else {
        Some(discovery::FleetDiscovery::new(&config.discovery).await)
    };

    let default_workers = config
        .stress
        .default_workers
        .map(|n| n as usize)
        .unwrap_or_else(|| fls_telemetry::num_cores() as usize);
    info!(default_workers, "stress pool configured");

    let state = Arc::new(http_api::HttpState {
        pool: pool.clone(),
        reporter,
        discovery,
        default_workers,
        version: env!("CARGO_PKG_VERSION"),
        started_at: Instant::now(),
        pid: std::process::id(),
    });

    let router = http_api::create_router(state);
    let addr = format!("{}:{}", config.server.bind, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if matches!(pool.stop().await, stress::StopOutcome::Stopped) {
        info!("stress pool stopped on shutdown");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to install ctrl-c handler: {}", e);
    }
}
