//! # NebulaSwap Runtime
//!
//! Runs a batch of HTLC swaps against simulated Ethereum and Cosmos ledgers
//! and prints the swap history and metrics.

use anyhow::{Context, Result};
use nebula_runtime::{record_metrics, run_swaps, RuntimeConfig, SimulatedWorld};
use nebula_swap::CompletionKind;
use nebula_telemetry::{encode_metrics, init_telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("Failed to load runtime configuration")?;
    init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;
    config.validate().context("Invalid runtime configuration")?;

    info!("===========================================");
    info!("  NebulaSwap Runtime v{}", nebula_swap::VERSION);
    info!("  Network: {}", config.telemetry.network);
    info!("===========================================");
    info!(
        swaps = config.swap_count,
        amount = %config.amount,
        relayer = ?config.relayer,
        "[nebula-runtime] starting swap batch"
    );

    let world = SimulatedWorld::new(&config);
    world.start();
    let reports = run_swaps(&world, &config).await;
    world.shutdown().await;

    let history = world.history();
    record_metrics(history, &reports);
    info!(
        exchanged = history.count_outcome(CompletionKind::Exchanged),
        refunded = history.count_outcome(CompletionKind::Refunded),
        total = reports.len(),
        "[nebula-runtime] batch finished"
    );

    println!("{}", history.to_json().context("Failed to encode swap history")?);
    println!("{}", encode_metrics().context("Failed to encode metrics")?);
    Ok(())
}
