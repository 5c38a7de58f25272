//! Fleet Load Stress - Operator Console
//!
//! Polls the fleet's shared endpoint, merges whichever instances answer
//! into a converging view, and drives start/stop actions. With no sticky
//! sessions, actions land on whichever instance the balancer picks.

#![forbid(unsafe_code)]

mod fleet;
mod render;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use fleet::{FleetPoller, FleetView};
use fls_common::FlsConfig;

#[derive(Parser)]
#[command(name = "fls")]
#[command(author, version, about = "FLS console - fleet stress control and status")]
struct Cli {
    /// Fleet endpoint (the load balancer URL)
    #[arg(short, long, env = "FLS_ENDPOINT")]
    endpoint: Option<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the fleet once and print the merged status table
    Status {
        /// Number of independent polls in the burst
        #[arg(short, long)]
        burst: Option<usize>,
    },

    /// Poll the fleet on a fixed cadence and keep the table refreshed
    Watch {
        /// Number of independent polls in the burst
        #[arg(short, long)]
        burst: Option<usize>,

        /// Refresh interval (e.g. "3s")
        #[arg(short, long)]
        interval: Option<String>,
    },

    /// Start the stress pool on whichever instance answers
    Start {
        /// Worker count (defaults to the answering instance's core count)
        #[arg(short, long)]
        workers: Option<u32>,
    },

    /// Stop the stress pool on whichever instance answers
    Stop,

    /// List fleet instances via best-effort discovery
    Instances,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the table stays clean on stdout.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = FlsConfig::load(cli.config.as_deref())?;
    let endpoint = cli
        .endpoint
        .unwrap_or_else(|| config.console.endpoint.clone());

    match cli.command {
        Commands::Status { burst } => {
            let poller = FleetPoller::new(&endpoint, burst.unwrap_or(config.console.burst))?;
            let mut view = FleetView::new();
            let merged = poller.poll_burst(&mut view).await;

            print!("{}", render::fleet_table(&view));
            if merged == 0 {
                bail!("no instance answered at {endpoint}");
            }
            Ok(())
        }

        Commands::Watch { burst, interval } => {
            let interval = match interval {
                Some(raw) => humantime::parse_duration(&raw)
                    .with_context(|| format!("invalid interval {raw:?}"))?,
                None => config.console.interval()?,
            };
            let burst = burst.unwrap_or(config.console.burst);
            let poller = FleetPoller::new(&endpoint, burst)?;

            watch(&poller, &endpoint, burst, interval).await
        }

        Commands::Start { workers } => {
            let poller = FleetPoller::new(&endpoint, config.console.burst)?;
            let response = poller.start(workers).await?;
            println!("{} ({} workers)", response.message, response.workers);
            Ok(())
        }

        Commands::Stop => {
            let poller = FleetPoller::new(&endpoint, config.console.burst)?;
            let response = poller.stop().await?;
            println!("{}", response.message);
            Ok(())
        }

        Commands::Instances => {
            let poller = FleetPoller::new(&endpoint, config.console.burst)?;
            let response = poller.instances().await?;

            if let Some(error) = response.error {
                println!("{} {}", "discovery unavailable:".yellow(), error);
            }
            if response.instances.is_empty() {
                println!("(no instances discovered)");
            } else {
                print!("{}", render::instances_table(&response.instances));
            }
            Ok(())
        }
    }
}

/// Refresh loop for `fls watch`. Runs until interrupted.
async fn watch(
    poller: &FleetPoller,
    endpoint: &str,
    burst: usize,
    interval: Duration,
) -> Result<()> {
    let mut view = FleetView::new();
    loop {
        let merged = poller.poll_burst(&mut view).await;

        // Clear the screen and home the cursor before redrawing.
        print!("\x1b[2J\x1b[H");
        println!(
            "fleet {} (burst {}, every {})",
            endpoint,
            burst,
            humantime::format_duration(interval)
        );
        println!();
        print!("{}", render::fleet_table(&view));
        println!();
        println!(
            "{} instances seen, {}/{} polls answered; ctrl-c to exit",
            view.len(),
            merged,
            burst
        );

        tokio::time::sleep(interval).await;
    }
}
