//! # Solver operator - entry point
//!
//! ## Startup
//!
//! 1. **Config** - defaults, then the config file, then `SOLVER_OPERATOR_*`
//!    environment variables, then flags
//! 2. **Scheme** - Solver and Job are registered; a missing kind aborts startup
//! 3. **Controller** - watches Solvers and Jobs and runs the reconcile workers
//! 4. **Garbage collector** - deletes Jobs whose Solver is gone
//!
//! ## Shutdown
//!
//! Ctrl+C stops the event sources; workers finish their current key and exit.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use solver_operator::cli::{Cli, Commands};
use solver_operator::{Operator, OperatorConfig, Overrides};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let flags = Overrides {
        workers: cli.workers,
        ..Overrides::default()
    };
    let config = OperatorConfig::resolve(cli.config.as_deref(), flags)
        .context("Invalid operator configuration")?;

    match cli.command.unwrap_or_default() {
        Commands::PrintConfig => print_config(&config),
        Commands::Run => run(&config).await,
    }
}

fn print_config(config: &OperatorConfig) -> Result<()> {
    let rendered = config.to_toml().context("Failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}

async fn run(config: &OperatorConfig) -> Result<()> {
    let start_time = Instant::now();
    info!(
        workers = config.controller.workers,
        image = %config.job.image,
        solver = %config.job.solver_name,
        "Solver operator starting"
    );

    let operator = Operator::new(config).context("Operator initialization failed")?;

    info!(startup = ?start_time.elapsed(), "Solver operator running. Press Ctrl+C to stop.");
    operator.run(wait_for_shutdown()).await?;

    info!("Solver operator stopped gracefully");
    Ok(())
}

/// Initialize tracing; `RUST_LOG` wins over `--log-level`.
fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for shutdown signal (Ctrl+C).
async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(err) => error!("Failed to listen for shutdown signal: {}", err),
    }
}
