//! In-memory ledgers, node transports and a counterparty relayer.
//!
//! The transports speak the same wire formats as real nodes, so the
//! Ethereum and Cosmos adapters run unmodified against them.

mod evm;
mod ledger;
mod relayer;
mod wasm;

pub use evm::SimulatedEvm;
pub use ledger::{EscrowRecord, SimulatedLedger, SubmitFault, GENESIS_TIME};
pub use relayer::{RelayerBehavior, RelayerSide, SimulatedRelayer};
pub use wasm::SimulatedWasm;
