//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound ports: chain adapters for the Ethereum and
//! Cosmos HTLC contracts, the polling relayer observer, wallet sessions,
//! quotes and the simulated ledgers used by the runtime and tests.

pub mod abi;
mod confirm;
pub mod cosmos;
mod ethereum;
mod quote;
mod relayer_observer;
pub mod simulated;
mod wallet;

pub use confirm::await_confirmations;
pub use cosmos::CosmosAdapter;
pub use ethereum::EthereumAdapter;
pub use quote::{convert_fixed_rate, Quote, QuoteService, ATOM_PER_ETH};
pub use relayer_observer::PollingRelayerObserver;
pub use wallet::{AutoApprove, ScriptedSigner, WalletSession};
