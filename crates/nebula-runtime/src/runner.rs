//! Concurrent swap batch and metric recording.

use crate::config::RuntimeConfig;
use crate::world::{Direction, SimulatedWorld};
use nebula_swap::{
    Amount, QuoteService, SwapApi, SwapContext, SwapCoordinator, SwapError, SwapHistory,
    SwapParams, SwapStep,
};
use nebula_telemetry::{metric_inc, record_swap_finished};
use nebula_telemetry::{SWAPS_FAILED, SWAPS_STARTED};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

/// How one swap of the batch ended.
#[derive(Clone, Debug, Serialize)]
pub struct SwapReport {
    /// Position in the batch.
    pub index: usize,
    /// Which way value moved.
    pub direction: Direction,
    /// Swap id; `None` when the request was rejected before a swap existed.
    pub swap_id: Option<Uuid>,
    /// Final step.
    pub step: Option<SwapStep>,
    /// Error category of the failure, if any.
    pub failure_kind: Option<&'static str>,
    /// Error message when `run` itself returned an error.
    pub error: Option<String>,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

impl SwapReport {
    fn rejected(index: usize, direction: Direction, err: &SwapError, elapsed: Duration) -> Self {
        Self {
            index,
            direction,
            swap_id: None,
            step: None,
            failure_kind: Some(err.category().as_str()),
            error: Some(err.to_string()),
            elapsed,
        }
    }
}

/// Build the request for swap `index`, quoting the receive amount at the
/// fixed rate.
pub async fn swap_params(
    world: &SimulatedWorld,
    config: &RuntimeConfig,
    direction: Direction,
) -> Result<SwapParams, SwapError> {
    let amount = Amount::parse(direction.from_token(), &config.amount)?;
    let quote = QuoteService::offline()
        .quote(&amount, direction.to_token())
        .await;
    let mut params = world.params(direction, &amount.decimal(), &quote.to_amount().decimal());
    params.timelock_hours = config.timelock_hours;
    Ok(params)
}

async fn run_one(
    index: usize,
    direction: Direction,
    ctx: SwapContext,
    params: SwapParams,
) -> SwapReport {
    let started = Instant::now();
    let mut coordinator = match SwapCoordinator::new(ctx, params).await {
        Ok(coordinator) => coordinator,
        Err(err) => {
            warn!(index, error = %err, "[nebula-runtime] swap rejected");
            return SwapReport::rejected(index, direction, &err, started.elapsed());
        }
    };

    let result = coordinator.run().await;
    let swap = coordinator.swap();
    let mut report = SwapReport {
        index,
        direction,
        swap_id: Some(swap.id),
        step: Some(swap.step),
        failure_kind: swap
            .failure
            .as_ref()
            .map(|failure| failure.error.category().as_str()),
        error: None,
        elapsed: started.elapsed(),
    };
    match result {
        Ok(view) => info!(index, %view, "[nebula-runtime] swap finished"),
        Err(err) => {
            error!(index, swap_id = %swap.id, error = %err, "[nebula-runtime] swap stopped");
            report.failure_kind = report.failure_kind.or(Some(err.category().as_str()));
            report.error = Some(err.to_string());
        }
    }
    report
}

/// Start `config.swap_count` swaps concurrently and wait for all of them.
pub async fn run_swaps(world: &SimulatedWorld, config: &RuntimeConfig) -> Vec<SwapReport> {
    let mut handles = Vec::with_capacity(config.swap_count);
    for index in 0..config.swap_count {
        let direction = Direction::for_index(index, config.alternate_directions);
        let ctx = world.context(direction);
        let params = swap_params(world, config, direction).await;
        handles.push((
            index,
            direction,
            tokio::spawn(async move {
                match params {
                    Ok(params) => run_one(index, direction, ctx, params).await,
                    Err(err) => SwapReport::rejected(index, direction, &err, Duration::ZERO),
                }
            }),
        ));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for (index, direction, handle) in handles {
        match handle.await {
            Ok(report) => reports.push(report),
            Err(join_error) => {
                error!(index, error = %join_error, "[nebula-runtime] swap task aborted");
                let err = SwapError::Contract(format!("swap task aborted: {join_error}"));
                reports.push(SwapReport::rejected(index, direction, &err, Duration::ZERO));
            }
        }
    }
    reports
}

/// Record swap outcome metrics from the history and the batch reports.
///
/// Chain calls are counted as they happen by the world's metered adapters.
pub fn record_metrics(history: &SwapHistory, reports: &[SwapReport]) {
    for report in reports {
        metric_inc!(SWAPS_STARTED);
        if report.swap_id.is_none() {
            if let Some(kind) = report.failure_kind {
                metric_inc!(SWAPS_FAILED, &[kind]);
            }
        }
    }

    for record in history.records() {
        let report = reports.iter().find(|r| r.swap_id == Some(record.id));
        let failure_kind = report.and_then(|r| r.failure_kind);
        match record.outcome {
            Some(outcome) => record_swap_finished(
                outcome.as_str(),
                failure_kind,
                report.map_or(0.0, |r| r.elapsed.as_secs_f64()),
            ),
            None => {
                if let Some(kind) = failure_kind {
                    metric_inc!(SWAPS_FAILED, &[kind]);
                }
            }
        }
    }
}
