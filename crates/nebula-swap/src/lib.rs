//! # Nebula Swap
//!
//! Client-side coordination of HTLC atomic swaps between an Ethereum ledger
//! and a Cosmos ledger.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Lock funds on the source ledger under a hashlock, verify the relayer's
//! mirrored escrow on the target ledger, claim it by revealing the secret,
//! and refund the source escrow if the exchange never completes.
//!
//! ## Safety Properties
//!
//! | Property | Enforced by |
//! |----------|-------------|
//! | Hashlock binding | `keccak256(secret) == hashlock` checked before any claim |
//! | Timelock ordering | Source timelock > counterparty timelock + safety margin |
//! | Claim gating | Counterparty escrow verified against the agreed terms first |
//! | Refund gating | Chain time strictly past the source timelock |
//! | Secret hygiene | Zeroized on drop, redacted in `Debug`, never in views |
//!
//! ## Module Structure
//!
//! ```text
//! nebula-swap/
//! ├── domain/        # Swap, EscrowView, SwapStep, SwapError, invariants
//! ├── algorithms/    # Commitment generation, transition function, read retry
//! ├── ports/         # SwapApi, ChainAdapter, RelayerObserver, Signer, transports
//! ├── adapters/      # Ethereum + Cosmos adapters, observer, quotes, simulators
//! ├── application/   # SwapCoordinator, SwapHistory
//! └── config.rs      # SwapConfig and per-ledger settings
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{
    CosmosAdapter, EthereumAdapter, PollingRelayerObserver, Quote, QuoteService, WalletSession,
};
pub use algorithms::{derive_timelocks, generate_commitment, next_step, SwapEvent};
pub use application::{SwapContext, SwapCoordinator, SwapHistory, SwapRecord};
pub use config::{CosmosConfig, EthereumConfig, SwapConfig};
pub use domain::{
    Amount, CompletionKind, EscrowStatus, EscrowView, ErrorCategory, LedgerId, SecureSecret, Swap,
    SwapError, SwapParams, SwapStep, SwapView, Token, TxKind, TxRef,
};
pub use ports::{ChainAdapter, RelayerObserver, Signer, SwapApi};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    #[allow(clippy::const_is_empty)]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
