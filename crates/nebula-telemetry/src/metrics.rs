//! Prometheus metrics for swap coordination.
//!
//! All metrics follow the naming convention: `nebula_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, Histogram, HistogramOpts, IntCounter, Opts,
    Registry, TextEncoder,
};
use std::sync::Once;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Swaps that reached `Setup`
    pub static ref SWAPS_STARTED: IntCounter = IntCounter::new(
        "nebula_swaps_started_total",
        "Total number of swaps created"
    ).expect("metric creation failed");

    /// Swaps that reached a final step, by outcome
    pub static ref SWAPS_FINISHED: CounterVec = CounterVec::new(
        Opts::new("nebula_swaps_finished_total", "Swaps reaching a final step"),
        &["outcome"]  // exchanged / refunded / failed
    ).expect("metric creation failed");

    /// Failures by error category
    pub static ref SWAPS_FAILED: CounterVec = CounterVec::new(
        Opts::new("nebula_swaps_failed_total", "Swap failures by error category"),
        &["kind"]
    ).expect("metric creation failed");

    /// Chain calls by ledger, operation and result
    pub static ref CHAIN_CALLS: CounterVec = CounterVec::new(
        Opts::new("nebula_chain_calls_total", "Ledger calls issued by the coordinator"),
        &["ledger", "op", "result"]
    ).expect("metric creation failed");

    /// Wall-clock time from creation to final step
    pub static ref SWAP_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "nebula_swap_duration_seconds",
            "Time from swap creation to its final step"
        ).buckets(exponential_buckets(0.01, 2.0, 16).expect("valid buckets"))
    ).expect("metric creation failed");
}

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let mut result = Ok(());
    REGISTER.call_once(|| {
        let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(SWAPS_STARTED.clone()),
            Box::new(SWAPS_FINISHED.clone()),
            Box::new(SWAPS_FAILED.clone()),
            Box::new(CHAIN_CALLS.clone()),
            Box::new(SWAP_DURATION.clone()),
        ];
        for metric in metrics {
            if let Err(e) = REGISTRY.register(metric) {
                result = Err(TelemetryError::MetricsInit(e.to_string()));
                return;
            }
        }
    });
    result
}

/// Count one finished swap and its duration.
pub fn record_swap_finished(outcome: &str, failure_kind: Option<&str>, duration_secs: f64) {
    SWAPS_FINISHED.with_label_values(&[outcome]).inc();
    if let Some(kind) = failure_kind {
        SWAPS_FAILED.with_label_values(&[kind]).inc();
    }
    SWAP_DURATION.observe(duration_secs.max(0.0));
}

/// Count one ledger call.
pub fn record_chain_call(ledger: &str, op: &str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    CHAIN_CALLS.with_label_values(&[ledger, op, result]).inc();
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_recorded_outcomes_are_encoded() {
        register_metrics().unwrap();
        SWAPS_STARTED.inc();
        record_swap_finished("refunded", Some("timeout"), 1.5);
        record_chain_call("ethereum", "create_escrow", true);

        let text = encode_metrics().unwrap();
        assert!(text.contains("nebula_swaps_started_total"));
        assert!(text.contains("nebula_swaps_finished_total{outcome=\"refunded\"}"));
        assert!(text.contains("nebula_swaps_failed_total{kind=\"timeout\"}"));
        assert!(text.contains("result=\"ok\""));
    }
}
