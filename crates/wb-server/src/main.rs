//! wb-rules daemon
//!
//! Runs the rule engine on the in-memory host: loads the configuration,
//! registers configured aliases, then dispatches cell changes and advances
//! timers until interrupted.

mod args;
mod config;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wb_host::{MemoryHost, SystemProcesses};
use wb_rules::RuleEngine;

use args::Args;
use config::ServerConfig;

fn init_tracing(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .with_context(|| format!("invalid log level '{default_level}'"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let path = args.config;
    let config = ServerConfig::load(&path)?;
    init_tracing(&config.log_level)?;

    info!(config = %path.display(), "Starting wb-rules");

    let host = MemoryHost::new();
    let processes = Arc::new(SystemProcesses::current()?);
    let engine = RuleEngine::new(host.host(processes), config.engine.clone());

    for (alias, cell) in &config.aliases {
        engine
            .define_alias(alias, cell)
            .with_context(|| format!("invalid alias '{alias}'"))?;
    }
    info!(aliases = engine.aliases().len(), "Aliases registered");

    let mut changes = host.cells().subscribe();
    host.set_ready();

    let tick = Duration::from_millis(config.tick_ms.max(1));
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("wb-rules is running");

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            _ = ticker.tick() => {
                host.advance(tick);
            }
            change = changes.recv() => match change {
                Ok(change) => {
                    host.dispatch_change(&change);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Cell change stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!("Shutting down...");
    Ok(())
}
