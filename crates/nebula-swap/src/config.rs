//! # Swap Configuration
//!
//! Timelock policy, read retry budget, observer cadence and per-ledger
//! adapter settings.

use crate::domain::{SwapError, DEFAULT_SAFETY_MARGIN_SECS, SECS_PER_HOUR};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard bounds on the user-selectable timelock.
pub const MIN_TIMELOCK_HOURS: u64 = 1;
/// Upper bound (one week).
pub const MAX_TIMELOCK_HOURS: u64 = 168;
/// Default timelock when the user picks none.
pub const DEFAULT_TIMELOCK_HOURS: u64 = 24;

/// Timelock bounds and the source/target safety margin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockPolicy {
    /// Hours used when the request leaves the timelock unset.
    pub default_hours: u64,
    /// Smallest accepted value.
    pub min_hours: u64,
    /// Largest accepted value.
    pub max_hours: u64,
    /// Required gap between source and target timelocks.
    pub safety_margin_secs: u64,
}

impl Default for TimelockPolicy {
    fn default() -> Self {
        Self {
            default_hours: DEFAULT_TIMELOCK_HOURS,
            min_hours: MIN_TIMELOCK_HOURS,
            max_hours: MAX_TIMELOCK_HOURS,
            safety_margin_secs: DEFAULT_SAFETY_MARGIN_SECS,
        }
    }
}

/// Backoff for read-only chain queries. Writes are never retried blindly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// First backoff delay in milliseconds, doubled per attempt.
    pub base_delay_ms: u64,
    /// Backoff cap in milliseconds.
    pub max_delay_ms: u64,
    /// Random jitter added to each delay.
    pub jitter_ms: u64,
    /// Per-attempt timeout in milliseconds.
    pub attempt_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 250,
            max_delay_ms: 5_000,
            jitter_ms: 250,
            attempt_timeout_ms: 6_000,
        }
    }
}

impl RetryPolicy {
    /// First backoff delay.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Backoff cap.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Per-attempt timeout.
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

/// How the relayer observer polls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverPolicy {
    /// Delay between polls in milliseconds.
    pub poll_interval_ms: u64,
    /// How long one watch call waits before reporting a timeout.
    pub watch_window_ms: u64,
}

impl Default for ObserverPolicy {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            watch_window_ms: 10 * 60 * 1_000,
        }
    }
}

impl ObserverPolicy {
    /// Poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Watch window.
    pub fn watch_window(&self) -> Duration {
        Duration::from_millis(self.watch_window_ms)
    }
}

/// Confirmation depth a write must reach before it counts as done.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationPolicy {
    /// Blocks on top of the inclusion block, inclusive.
    pub required: u64,
    /// Delay between receipt polls in milliseconds.
    pub poll_interval_ms: u64,
    /// Give up (and report a network error) after this long.
    pub timeout_ms: u64,
}

impl ConfirmationPolicy {
    /// Poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Ethereum adapter settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthereumConfig {
    /// HTLC contract address.
    pub contract: String,
    /// Confirmation depth for writes.
    pub confirmations: ConfirmationPolicy,
}

impl Default for EthereumConfig {
    fn default() -> Self {
        Self {
            contract: "0x5fbdb2315678afecb367f032d93f642f64180aa3".to_string(),
            confirmations: ConfirmationPolicy {
                required: 2,
                poll_interval_ms: 2_000,
                timeout_ms: 180_000,
            },
        }
    }
}

/// Cosmos adapter settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmosConfig {
    /// CosmWasm HTLC contract address.
    pub contract: String,
    /// Native denomination attached as funds.
    pub denom: String,
    /// Bech32 human-readable prefix.
    pub address_prefix: String,
    /// Confirmation depth for writes.
    pub confirmations: ConfirmationPolicy,
}

impl Default for CosmosConfig {
    fn default() -> Self {
        Self {
            contract: "cosmos14hj2tavq8fpesdwxxcu44rty3hh90vhujrvcmstl4zr3txmfvw9s4hmalr"
                .to_string(),
            denom: "uatom".to_string(),
            address_prefix: "cosmos".to_string(),
            confirmations: ConfirmationPolicy {
                required: 1,
                poll_interval_ms: 1_000,
                timeout_ms: 60_000,
            },
        }
    }
}

/// Coordinator configuration shared by every swap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapConfig {
    /// Timelock bounds and margin.
    pub timelock: TimelockPolicy,
    /// Read retry budget.
    pub retry: RetryPolicy,
    /// Relayer observer cadence.
    pub observer: ObserverPolicy,
    /// Number of past swaps kept for display.
    pub history_capacity: usize,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            timelock: TimelockPolicy::default(),
            retry: RetryPolicy::default(),
            observer: ObserverPolicy::default(),
            history_capacity: 50,
        }
    }
}

impl SwapConfig {
    /// Create a config for testing (millisecond cadences, no jitter).
    pub fn for_testing() -> Self {
        Self {
            timelock: TimelockPolicy::default(),
            retry: RetryPolicy {
                max_retries: 3,
                base_delay_ms: 1,
                max_delay_ms: 4,
                jitter_ms: 0,
                attempt_timeout_ms: 1_000,
            },
            observer: ObserverPolicy {
                poll_interval_ms: 2,
                watch_window_ms: 60,
            },
            history_capacity: 50,
        }
    }

    /// Read overrides from `NEBULA_*` environment variables.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            timelock: TimelockPolicy {
                default_hours: read_env_u64(
                    "NEBULA_DEFAULT_TIMELOCK_HOURS",
                    default.timelock.default_hours,
                ),
                min_hours: default.timelock.min_hours,
                max_hours: default.timelock.max_hours,
                safety_margin_secs: read_env_u64(
                    "NEBULA_SAFETY_MARGIN_SECS",
                    default.timelock.safety_margin_secs,
                ),
            },
            retry: RetryPolicy {
                max_retries: read_env_u64(
                    "NEBULA_READ_MAX_RETRIES",
                    u64::from(default.retry.max_retries),
                ) as u32,
                base_delay_ms: read_env_u64("NEBULA_READ_BASE_DELAY_MS", default.retry.base_delay_ms),
                max_delay_ms: read_env_u64("NEBULA_READ_MAX_DELAY_MS", default.retry.max_delay_ms),
                jitter_ms: read_env_u64("NEBULA_READ_JITTER_MS", default.retry.jitter_ms),
                attempt_timeout_ms: read_env_u64(
                    "NEBULA_READ_TIMEOUT_MS",
                    default.retry.attempt_timeout_ms,
                ),
            },
            observer: ObserverPolicy {
                poll_interval_ms: read_env_u64(
                    "NEBULA_OBSERVER_POLL_MS",
                    default.observer.poll_interval_ms,
                ),
                watch_window_ms: read_env_u64(
                    "NEBULA_WATCH_WINDOW_MS",
                    default.observer.watch_window_ms,
                ),
            },
            history_capacity: read_env_u64(
                "NEBULA_HISTORY_CAPACITY",
                default.history_capacity as u64,
            ) as usize,
        }
    }

    /// Reject settings that would make every swap fail or spin.
    pub fn validate(&self) -> Result<(), SwapError> {
        let t = &self.timelock;
        if t.min_hours < MIN_TIMELOCK_HOURS || t.max_hours > MAX_TIMELOCK_HOURS {
            return Err(SwapError::Config(format!(
                "timelock bounds must stay within [{MIN_TIMELOCK_HOURS}, {MAX_TIMELOCK_HOURS}] hours"
            )));
        }
        if !(t.min_hours <= t.default_hours && t.default_hours <= t.max_hours) {
            return Err(SwapError::Config(format!(
                "default timelock {}h outside [{}, {}]",
                t.default_hours, t.min_hours, t.max_hours
            )));
        }
        if t.safety_margin_secs >= t.default_hours * SECS_PER_HOUR {
            return Err(SwapError::Config(
                "safety margin must be shorter than the default timelock".to_string(),
            ));
        }
        if self.observer.poll_interval_ms == 0
            || self.observer.watch_window_ms < self.observer.poll_interval_ms
        {
            return Err(SwapError::Config(
                "observer watch window must cover at least one poll".to_string(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(SwapError::Config("history capacity must be positive".to_string()));
        }
        Ok(())
    }
}

impl EthereumConfig {
    /// Read overrides from `NEBULA_ETH_*` environment variables.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            contract: std::env::var("NEBULA_ETH_CONTRACT").unwrap_or(default.contract),
            confirmations: ConfirmationPolicy {
                required: read_env_u64("NEBULA_ETH_CONFIRMATIONS", default.confirmations.required),
                ..default.confirmations
            },
        }
    }

    /// Settings for simulated ledgers: one confirmation, fast polling.
    pub fn for_testing() -> Self {
        Self {
            confirmations: ConfirmationPolicy {
                required: 1,
                poll_interval_ms: 1,
                timeout_ms: 200,
            },
            ..Self::default()
        }
    }
}

impl CosmosConfig {
    /// Read overrides from `NEBULA_COSMOS_*` environment variables.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            contract: std::env::var("NEBULA_COSMOS_CONTRACT").unwrap_or(default.contract),
            denom: std::env::var("NEBULA_COSMOS_DENOM").unwrap_or(default.denom),
            address_prefix: std::env::var("NEBULA_COSMOS_PREFIX")
                .unwrap_or(default.address_prefix),
            confirmations: ConfirmationPolicy {
                required: read_env_u64(
                    "NEBULA_COSMOS_CONFIRMATIONS",
                    default.confirmations.required,
                ),
                ..default.confirmations
            },
        }
    }

    /// Settings for simulated ledgers: one confirmation, fast polling.
    pub fn for_testing() -> Self {
        Self {
            confirmations: ConfirmationPolicy {
                required: 1,
                poll_interval_ms: 1,
                timeout_ms: 200,
            },
            ..Self::default()
        }
    }
}

fn read_env_u64(key: &str, fallback: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(fallback)
}
