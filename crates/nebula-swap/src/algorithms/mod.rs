//! # Algorithms Module
//!
//! Commitment generation, the swap transition function and read retry.

pub mod commitment;
pub mod retry;
pub mod state_machine;

pub use commitment::{derive_timelocks, generate_commitment, generate_secret, validate_timelock_hours};
pub use retry::{backoff_delay, retry_read};
pub use state_machine::{apply_event, next_step, SwapEvent};
