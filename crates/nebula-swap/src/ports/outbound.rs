//! # Outbound Ports
//!
//! Traits for everything the coordinator depends on: per-ledger escrow
//! adapters, the relayer observer, wallet signers, quote sources, and the raw
//! RPC transports the concrete adapters are built on.

use crate::domain::{
    Amount, EscrowView, Hash, LedgerId, SecureSecret, SwapError, Token, TransportError, TxKind,
    TxRef,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Escrow operations on one ledger.
///
/// Every call is parameterised by hashlock so one adapter can serve many
/// concurrent swaps. Writes return only after the configured confirmation
/// depth is reached.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Ledger this adapter talks to.
    fn ledger(&self) -> LedgerId;

    /// Address of the connected wallet, `None` when disconnected.
    fn address(&self) -> Option<String>;

    /// Check an address is well-formed for this ledger.
    fn validate_address(&self, address: &str) -> Result<(), SwapError>;

    /// Lock `amount` base units for `recipient` under `hashlock` until `timelock`.
    async fn create_escrow(
        &self,
        hashlock: Hash,
        timelock: u64,
        recipient: &str,
        amount: u128,
    ) -> Result<TxRef, SwapError>;

    /// Claim by revealing `secret`. Checked against the on-chain hashlock
    /// before anything is broadcast.
    async fn claim_escrow(&self, hashlock: Hash, secret: &SecureSecret)
        -> Result<TxRef, SwapError>;

    /// Refund to the sender after the timelock.
    async fn refund_escrow(&self, hashlock: Hash) -> Result<TxRef, SwapError>;

    /// Read-only escrow lookup. Idempotent.
    async fn query_escrow(&self, hashlock: Hash) -> Result<Option<EscrowView>, SwapError>;

    /// Timestamp of the latest block.
    async fn chain_time(&self) -> Result<u64, SwapError>;

    /// Secret published by a claim on this ledger, if any.
    async fn revealed_secret(&self, hashlock: Hash) -> Result<Option<SecureSecret>, SwapError>;
}

/// Watches ledgers for relayer-driven escrow changes. Never writes.
#[async_trait]
pub trait RelayerObserver: Send + Sync {
    /// Wait up to `window` for an escrow with `hashlock` on `ledger`.
    /// Returns `TimeoutExceeded` when the window elapses.
    async fn watch_for_escrow(
        &self,
        hashlock: Hash,
        ledger: LedgerId,
        window: Duration,
    ) -> Result<EscrowView, SwapError>;

    /// Wait up to `window` for a claim on `ledger` and return its secret.
    async fn watch_for_claim(
        &self,
        hashlock: Hash,
        ledger: LedgerId,
        window: Duration,
    ) -> Result<SecureSecret, SwapError>;
}

/// What the wallet is asked to sign.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningRequest {
    /// Ledger the transaction goes to.
    pub ledger: LedgerId,
    /// Operation.
    pub kind: TxKind,
    /// Escrow hashlock.
    pub hashlock: Hash,
    /// Value attached, in base units.
    pub value: u128,
    /// Human-readable prompt.
    pub summary: String,
}

/// Wallet signing capability.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Approve or decline (`RejectedByUser`) a transaction.
    async fn approve(&self, request: &SigningRequest) -> Result<(), SwapError>;
}

/// Live quote from an external aggregator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveQuote {
    /// Estimated output.
    pub to_amount: Amount,
    /// Estimated gas units for the lock.
    pub estimated_gas: u64,
    /// Aggregator name.
    pub source: String,
}

/// External price/routing source.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Quote `amount` of one token in another.
    async fn quote(&self, amount: &Amount, to: Token) -> Result<LiveQuote, SwapError>;
}

/// Transaction for an EVM ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvmTransaction {
    /// Sender.
    pub from: String,
    /// Contract address.
    pub to: String,
    /// Attached wei.
    pub value: u128,
    /// ABI-encoded calldata.
    pub data: Vec<u8>,
}

/// Event log entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvmLog {
    /// Indexed topics, topic0 is the event signature.
    pub topics: Vec<Hash>,
    /// ABI-encoded non-indexed data.
    pub data: Vec<u8>,
}

/// JSON-RPC surface of an EVM node the Ethereum adapter needs.
#[async_trait]
pub trait EvmRpc: Send + Sync {
    /// Broadcast a signed transaction, returning its hash.
    async fn send_transaction(&self, tx: EvmTransaction) -> Result<String, TransportError>;

    /// `eth_call` against latest state.
    async fn call(&self, to: &str, data: Vec<u8>) -> Result<Vec<u8>, TransportError>;

    /// Confirmation count, `None` while pending or unknown.
    async fn confirmations(&self, tx_hash: &str) -> Result<Option<u64>, TransportError>;

    /// Latest block timestamp.
    async fn block_timestamp(&self) -> Result<u64, TransportError>;

    /// Logs emitted by `address` matching all `topics` positionally.
    async fn logs(&self, address: &str, topics: Vec<Hash>) -> Result<Vec<EvmLog>, TransportError>;
}

/// Native funds attached to a CosmWasm execute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination.
    pub denom: String,
    /// Integer amount as a decimal string.
    pub amount: String,
}

/// RPC surface of a Cosmos node the Cosmos adapter needs.
#[async_trait]
pub trait WasmRpc: Send + Sync {
    /// Broadcast `MsgExecuteContract`, returning the tx hash.
    async fn execute(
        &self,
        sender: &str,
        contract: &str,
        msg: serde_json::Value,
        funds: Vec<Coin>,
    ) -> Result<String, TransportError>;

    /// Smart query against latest state.
    async fn query_smart(
        &self,
        contract: &str,
        msg: serde_json::Value,
    ) -> Result<serde_json::Value, TransportError>;

    /// Confirmation count, `None` while pending or unknown.
    async fn confirmations(&self, tx_hash: &str) -> Result<Option<u64>, TransportError>;

    /// Latest block time.
    async fn block_time(&self) -> Result<u64, TransportError>;
}
