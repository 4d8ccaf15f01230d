//! # Application Layer
//!
//! Per-swap coordinator and the shared swap history.

mod coordinator;
mod history;

pub use coordinator::{SwapContext, SwapCoordinator};
pub use history::{SwapHistory, SwapRecord};
