//! # Domain Entities
//!
//! Commitment, escrow views and the swap aggregate.

use super::errors::{short_hex, Hash, SwapError};
use super::secure_secret::SecureSecret;
use super::value_objects::{
    Amount, CompletionKind, EscrowStatus, LedgerId, SwapStep, Token, TxKind, TxRef,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Absolute timelocks for both escrows of one swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockPair {
    /// Timelock on the initiator's (source) escrow.
    pub source: u64,
    /// Latest timelock accepted on the counterparty's (target) escrow.
    pub target: u64,
}

/// Secret, hashlock and timelock anchoring both escrows.
///
/// `hashlock == keccak256(secret)` holds by construction.
#[derive(Debug)]
pub struct Commitment {
    secret: SecureSecret,
    hashlock: Hash,
    timelocks: TimelockPair,
}

impl Commitment {
    /// Bind a secret to its timelocks. The hashlock is derived, never supplied.
    pub fn new(secret: SecureSecret, timelocks: TimelockPair) -> Self {
        let hashlock = secret.hashlock();
        Self {
            secret,
            hashlock,
            timelocks,
        }
    }

    /// The preimage.
    pub fn secret(&self) -> &SecureSecret {
        &self.secret
    }

    /// Keccak-256 of the secret.
    pub fn hashlock(&self) -> Hash {
        self.hashlock
    }

    /// Source escrow timelock (absolute UNIX seconds).
    pub fn timelock(&self) -> u64 {
        self.timelocks.source
    }

    /// Both timelocks.
    pub fn timelocks(&self) -> TimelockPair {
        self.timelocks
    }
}

/// Read-only snapshot of an on-chain escrow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowView {
    /// Ledger holding the escrow.
    pub ledger: LedgerId,
    /// Shared hashlock.
    pub hashlock: Hash,
    /// Funding address.
    pub sender: String,
    /// Address that receives funds on claim.
    pub recipient: String,
    /// Locked amount in base units.
    pub amount: u128,
    /// Absolute refund timelock.
    pub timelock: u64,
    /// Current status.
    pub status: EscrowStatus,
}

/// User request to start a swap.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwapParams {
    /// Token locked on the source ledger.
    pub from_token: Token,
    /// Token received on the target ledger.
    pub to_token: Token,
    /// Decimal amount of `from_token` to lock.
    pub amount: String,
    /// Decimal amount of `to_token` agreed with the counterparty.
    pub receive_amount: String,
    /// Source-ledger address allowed to claim the source escrow.
    pub recipient: String,
    /// Source timelock in hours; the configured default when `None`.
    pub timelock_hours: Option<u64>,
}

/// Terms the counterparty escrow must satisfy before we claim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterpartyExpectation {
    /// Hashlock shared with the source escrow.
    pub hashlock: Hash,
    /// Our address on the target ledger.
    pub beneficiary: String,
    /// Minimum amount in target base units.
    pub min_amount: u128,
    /// Source escrow timelock.
    pub source_timelock: u64,
    /// Required gap between source and target timelocks.
    pub safety_margin_secs: u64,
}

/// A transaction in a swap's audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    /// What the transaction did.
    pub kind: TxKind,
    /// Where to find it.
    pub tx: TxRef,
}

/// Why a swap failed and whether the source escrow can be refunded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapFailure {
    /// Recorded cause.
    pub error: SwapError,
    /// Step the swap was in when it failed.
    pub failed_at: SwapStep,
    /// Source escrow is open and past its timelock, per chain state.
    pub can_refund: bool,
}

/// One bilateral swap, owned by its coordinator.
#[derive(Debug)]
pub struct Swap {
    /// Unique identifier.
    pub id: Uuid,
    /// Locked amount on the source ledger.
    pub amount: Amount,
    /// Agreed amount on the target ledger.
    pub receive_amount: Amount,
    /// Source escrow recipient.
    pub recipient: String,
    /// Our source-ledger address (escrow sender).
    pub initiator: String,
    /// Our target-ledger address (counterparty escrow recipient).
    pub beneficiary: String,
    /// Cryptographic anchor shared by both escrows.
    pub commitment: Commitment,
    /// Verified counterparty escrow.
    pub counterparty_escrow: Option<EscrowView>,
    /// Current step.
    pub step: SwapStep,
    /// Ordered transactions submitted for this swap.
    pub transactions: Vec<TxRecord>,
    /// Set when `step == Failed`, kept after a refund.
    pub failure: Option<SwapFailure>,
    /// Creation time (local wall clock).
    pub created_at: u64,
    /// Last transition time.
    pub updated_at: u64,
}

impl Swap {
    /// Source ledger.
    pub fn source_ledger(&self) -> LedgerId {
        self.amount.token.ledger()
    }

    /// Target ledger.
    pub fn target_ledger(&self) -> LedgerId {
        self.receive_amount.token.ledger()
    }

    /// Shared hashlock.
    pub fn hashlock(&self) -> Hash {
        self.commitment.hashlock()
    }

    /// Reference to the confirmed source lock, if known.
    pub fn lock_tx(&self) -> Option<&TxRef> {
        self.transactions
            .iter()
            .find(|record| record.kind == TxKind::Lock)
            .map(|record| &record.tx)
    }

    /// Terms used to verify the counterparty escrow.
    pub fn expectation(&self, safety_margin_secs: u64) -> CounterpartyExpectation {
        CounterpartyExpectation {
            hashlock: self.hashlock(),
            beneficiary: self.beneficiary.clone(),
            min_amount: self.receive_amount.base_units,
            source_timelock: self.commitment.timelock(),
            safety_margin_secs,
        }
    }

    /// Outcome for terminal swaps.
    pub fn outcome(&self) -> Option<CompletionKind> {
        match self.step {
            SwapStep::Completed(kind) => Some(kind),
            _ => None,
        }
    }

    /// Read-only projection for display. Never contains the secret.
    pub fn view(&self) -> SwapView {
        SwapView {
            id: self.id,
            step: self.step,
            amount: self.amount.to_string(),
            receive_amount: self.receive_amount.to_string(),
            hashlock: format!("0x{}", hex::encode(self.hashlock())),
            source_timelock: self.commitment.timelock(),
            transactions: self.transactions.clone(),
            error: self.failure.as_ref().map(|f| f.error.to_string()),
            can_refund: self.failure.as_ref().is_some_and(|f| f.can_refund),
        }
    }
}

/// Display projection of a swap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapView {
    /// Swap id.
    pub id: Uuid,
    /// Current step.
    pub step: SwapStep,
    /// Locked amount, human readable.
    pub amount: String,
    /// Expected amount, human readable.
    pub receive_amount: String,
    /// Hashlock hex.
    pub hashlock: String,
    /// Source timelock.
    pub source_timelock: u64,
    /// Transactions so far.
    pub transactions: Vec<TxRecord>,
    /// Human-readable failure cause.
    pub error: Option<String>,
    /// Whether a refund action should be offered.
    pub can_refund: bool,
}

impl std::fmt::Display for SwapView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "swap {} [{}] {} -> {}", self.id, self.step, self.amount, self.receive_amount)
    }
}

impl std::fmt::Display for EscrowView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} escrow {} {:?} amount={} timelock={}",
            self.ledger,
            short_hex(&self.hashlock),
            self.status,
            self.amount,
            self.timelock
        )
    }
}
