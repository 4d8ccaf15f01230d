//! # Nebula Runtime
//!
//! Demo runtime for NebulaSwap: a batch of concurrent swaps against two
//! simulated ledgers and a simulated relayer.
//!
//! ## Startup Sequence
//!
//! 1. Load [`RuntimeConfig`] from the environment and validate it
//! 2. Initialise logging and metrics (`nebula-telemetry`)
//! 3. Build the [`SimulatedWorld`] and start its relayer and clock tasks
//! 4. Run the swaps with `tokio::spawn`, one task per swap
//! 5. Record outcome metrics from the swap history and print it as JSON
//!
//! Every ledger call goes through a [`MeteredAdapter`], so chain-call
//! counters include rejected, dropped and failed calls.
//!
//! The clock driver advances both ledgers by `clock_step_secs` every tick,
//! so a 24 hour timelock expires in a few seconds of real time.

pub mod config;
pub mod metered;
pub mod runner;
pub mod world;

pub use config::RuntimeConfig;
pub use metered::MeteredAdapter;
pub use runner::{record_metrics, run_swaps, swap_params, SwapReport};
pub use world::{Direction, SimulatedWorld};
