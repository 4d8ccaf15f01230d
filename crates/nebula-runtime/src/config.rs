//! Runtime configuration.
//!
//! Everything is read from `NEBULA_*` environment variables on top of the
//! library defaults. Malformed values are rejected instead of silently
//! falling back.

use nebula_swap::adapters::simulated::RelayerBehavior;
use nebula_swap::{Amount, CosmosConfig, EthereumConfig, SwapConfig, SwapError, Token};
use nebula_telemetry::TelemetryConfig;
use std::str::FromStr;
use std::time::Duration;

/// Demo run settings.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Swaps started concurrently.
    pub swap_count: usize,
    /// Decimal amount locked by each swap, in the source token.
    pub amount: String,
    /// Source timelock override; the swap config default when `None`.
    pub timelock_hours: Option<u64>,
    /// How the simulated counterparty behaves.
    pub relayer: RelayerBehavior,
    /// Alternate swap direction (ETH→ATOM, ATOM→ETH, ...).
    pub alternate_directions: bool,
    /// Simulated seconds added to both ledgers per clock tick.
    pub clock_step_secs: u64,
    /// Real milliseconds between clock ticks.
    pub clock_tick_ms: u64,
    /// Real milliseconds between relayer passes.
    pub relayer_tick_ms: u64,
    /// Use millisecond polling cadences suited to simulated ledgers.
    pub fast_cadence: bool,
    /// Logging settings.
    pub telemetry: TelemetryConfig,
    /// Coordinator policy.
    pub swap: SwapConfig,
    /// Ethereum adapter settings.
    pub ethereum: EthereumConfig,
    /// Cosmos adapter settings.
    pub cosmos: CosmosConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            swap_count: 3,
            amount: "1.5".to_string(),
            timelock_hours: None,
            relayer: RelayerBehavior::Honest,
            alternate_directions: false,
            clock_step_secs: 300,
            clock_tick_ms: 10,
            relayer_tick_ms: 25,
            fast_cadence: true,
            telemetry: TelemetryConfig::default(),
            swap: SwapConfig::default(),
            ethereum: EthereumConfig::default(),
            cosmos: CosmosConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load from the environment.
    pub fn from_env() -> Result<Self, SwapError> {
        let default = Self::default();
        let config = Self {
            swap_count: env_or("NEBULA_SWAP_COUNT", default.swap_count)?,
            amount: std::env::var("NEBULA_SWAP_AMOUNT").unwrap_or(default.amount),
            timelock_hours: match std::env::var("NEBULA_TIMELOCK_HOURS") {
                Ok(value) => Some(parse_value("NEBULA_TIMELOCK_HOURS", &value)?),
                Err(_) => default.timelock_hours,
            },
            relayer: env_or("NEBULA_RELAYER_BEHAVIOR", default.relayer)?,
            alternate_directions: env_or("NEBULA_ALTERNATE_DIRECTIONS", default.alternate_directions)?,
            clock_step_secs: env_or("NEBULA_CLOCK_STEP_SECS", default.clock_step_secs)?,
            clock_tick_ms: env_or("NEBULA_CLOCK_TICK_MS", default.clock_tick_ms)?,
            relayer_tick_ms: env_or("NEBULA_RELAYER_TICK_MS", default.relayer_tick_ms)?,
            fast_cadence: env_or("NEBULA_FAST_CADENCE", default.fast_cadence)?,
            telemetry: TelemetryConfig::from_env(),
            swap: SwapConfig::from_env(),
            ethereum: EthereumConfig::from_env(),
            cosmos: CosmosConfig::from_env(),
        };
        Ok(if config.fast_cadence {
            config.with_fast_cadence()
        } else {
            config
        })
    }

    /// Settings for tests: two swaps, fast clock and cadences.
    pub fn for_testing() -> Self {
        Self {
            swap_count: 2,
            clock_tick_ms: 5,
            relayer_tick_ms: 5,
            telemetry: TelemetryConfig::for_testing(),
            ..Self::default()
        }
        .with_fast_cadence()
    }

    /// Replace polling cadences with millisecond values.
    ///
    /// Timelock policy is untouched; only how often the simulated ledgers
    /// are polled changes.
    pub fn with_fast_cadence(mut self) -> Self {
        let fast = SwapConfig::for_testing();
        self.swap.retry = fast.retry;
        self.swap.observer = fast.observer;
        self.ethereum.confirmations = EthereumConfig::for_testing().confirmations;
        self.cosmos.confirmations = CosmosConfig::for_testing().confirmations;
        self
    }

    /// Reject settings the demo cannot run with.
    pub fn validate(&self) -> Result<(), SwapError> {
        if self.swap_count == 0 {
            return Err(SwapError::Config("swap count must be positive".to_string()));
        }
        if self.clock_tick_ms == 0 || self.relayer_tick_ms == 0 {
            return Err(SwapError::Config("tick intervals must be positive".to_string()));
        }
        if self.clock_step_secs == 0 {
            return Err(SwapError::Config(
                "clock step must be positive or timelocks never expire".to_string(),
            ));
        }
        let directions: &[Token] = if self.alternate_directions {
            &[Token::Eth, Token::Atom]
        } else {
            &[Token::Eth]
        };
        for token in directions {
            Amount::parse(*token, &self.amount)?;
        }
        self.swap.validate()
    }

    /// Clock tick interval.
    pub fn clock_tick(&self) -> Duration {
        Duration::from_millis(self.clock_tick_ms)
    }

    /// Relayer tick interval.
    pub fn relayer_tick(&self) -> Duration {
        Duration::from_millis(self.relayer_tick_ms)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, SwapError> {
    value
        .trim()
        .parse()
        .map_err(|_| SwapError::Config(format!("{key}: cannot parse '{value}'")))
}

fn env_or<T: FromStr>(key: &str, fallback: T) -> Result<T, SwapError> {
    match std::env::var(key) {
        Ok(value) => parse_value(key, &value),
        Err(_) => Ok(fallback),
    }
}
