//! # Domain Errors
//!
//! Error taxonomy for swap coordination.
//!
//! Every failure the coordinator can observe maps to one `SwapError` variant,
//! and every variant maps to one `ErrorCategory`. The category, not the
//! variant, decides whether a step is retried, reverted or failed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::value_objects::LedgerId;

/// Hash type (32-byte Keccak-256).
pub type Hash = [u8; 32];

/// Secret type (32-byte preimage).
pub type Secret = [u8; 32];

/// Short hex rendering used in logs and error messages.
pub fn short_hex(hash: &Hash) -> String {
    format!("0x{}..", hex::encode(&hash[..4]))
}

/// Swap coordination error types.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SwapError {
    /// Timelock outside the configured policy bounds.
    #[error("Invalid timelock: {0}")]
    InvalidTimelock(String),

    /// Bad user input, caught before any chain call.
    #[error("Invalid swap parameters: {0}")]
    InvalidSwapParams(String),

    /// Sender balance does not cover the escrow amount.
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Amount the escrow needs (base units).
        required: u128,
        /// Amount the sender holds (base units).
        available: u128,
    },

    /// Transient transport failure.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The wallet declined to sign.
    #[error("Signing rejected by user")]
    RejectedByUser,

    /// No connected wallet session for the ledger.
    #[error("Wallet disconnected on {0}")]
    WalletDisconnected(LedgerId),

    /// No escrow exists for the hashlock.
    #[error("Escrow not found for hashlock {}", short_hex(.0))]
    EscrowNotFound(Hash),

    /// Escrow was already claimed.
    #[error("Escrow already claimed")]
    AlreadyClaimed,

    /// Escrow was already refunded.
    #[error("Escrow already refunded")]
    AlreadyRefunded,

    /// Secret does not hash to the escrow's hashlock.
    #[error("Secret does not hash to the expected hashlock")]
    HashMismatch,

    /// Refund attempted before the timelock elapsed.
    #[error("Timelock not expired: chain time {now}, timelock {timelock}")]
    TimelockNotExpired {
        /// Chain time at the check.
        now: u64,
        /// Escrow timelock.
        timelock: u64,
    },

    /// Observed counterparty escrow does not match the agreed terms.
    #[error("Counterparty escrow mismatch: {0}")]
    CounterpartyEscrowMismatch(String),

    /// Waiting for an on-chain event exceeded the relevant timelock.
    #[error("Timed out waiting for {0}")]
    TimeoutExceeded(String),

    /// Operation not valid for the swap's current step.
    #[error("Invalid swap transition: {from} on {event}")]
    InvalidTransition {
        /// Current step.
        from: String,
        /// Rejected event.
        event: String,
    },

    /// Contract reverted for a reason not covered above.
    #[error("Contract rejected call: {0}")]
    Contract(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Error taxonomy driving propagation policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Bad input; nothing was submitted.
    Validation,
    /// User declined or wallet unavailable; retry the same step.
    SigningRejected,
    /// Transient; retried for reads, surfaced for writes.
    Network,
    /// On-chain state forbids the step.
    ContractState,
    /// Counterparty escrow failed verification. Never claim.
    CounterpartyMismatch,
    /// Waited past a timelock; refund path.
    Timeout,
    /// Programming or configuration error.
    Internal,
}

impl ErrorCategory {
    /// Label used in metrics and history records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::SigningRejected => "signing_rejected",
            Self::Network => "network",
            Self::ContractState => "contract_state",
            Self::CounterpartyMismatch => "counterparty_mismatch",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }
}

impl SwapError {
    /// Category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidTimelock(_)
            | Self::InvalidSwapParams(_)
            | Self::InsufficientFunds { .. } => ErrorCategory::Validation,
            Self::RejectedByUser | Self::WalletDisconnected(_) => ErrorCategory::SigningRejected,
            Self::NetworkError(_) => ErrorCategory::Network,
            Self::EscrowNotFound(_)
            | Self::AlreadyClaimed
            | Self::AlreadyRefunded
            | Self::HashMismatch
            | Self::TimelockNotExpired { .. }
            | Self::Contract(_) => ErrorCategory::ContractState,
            Self::CounterpartyEscrowMismatch(_) => ErrorCategory::CounterpartyMismatch,
            Self::TimeoutExceeded(_) => ErrorCategory::Timeout,
            Self::InvalidTransition { .. } | Self::Config(_) => ErrorCategory::Internal,
        }
    }

    /// Safe to retry automatically (read paths only).
    pub fn is_transient(&self) -> bool {
        self.category() == ErrorCategory::Network
    }

    /// A write that failed this way leaves the swap at its prior stable step.
    pub fn keeps_step(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Validation | ErrorCategory::SigningRejected | ErrorCategory::Network
        )
    }
}

/// Contract revert reasons reported by a ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevertReason {
    /// An escrow with this hashlock already exists.
    EscrowExists,
    /// No escrow for the hashlock.
    EscrowNotFound,
    /// Escrow already claimed.
    AlreadyClaimed,
    /// Escrow already refunded.
    AlreadyRefunded,
    /// Preimage does not match.
    HashMismatch,
    /// Refund before expiry.
    TimelockNotExpired {
        /// Chain time.
        now: u64,
        /// Escrow timelock.
        timelock: u64,
    },
    /// Claim after expiry.
    TimelockExpired,
    /// Refund caller is not the sender.
    NotSender,
    /// Zero value or unsupported funds.
    InvalidAmount,
    /// Timelock not in the future.
    InvalidTimelock,
    /// Anything else.
    Other(String),
}

impl std::fmt::Display for RevertReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EscrowExists => f.write_str("escrow exists"),
            Self::EscrowNotFound => f.write_str("escrow not found"),
            Self::AlreadyClaimed => f.write_str("already claimed"),
            Self::AlreadyRefunded => f.write_str("already refunded"),
            Self::HashMismatch => f.write_str("hash mismatch"),
            Self::TimelockNotExpired { now, timelock } => {
                write!(f, "timelock not expired ({now} <= {timelock})")
            }
            Self::TimelockExpired => f.write_str("timelock expired"),
            Self::NotSender => f.write_str("caller is not sender"),
            Self::InvalidAmount => f.write_str("invalid amount"),
            Self::InvalidTimelock => f.write_str("invalid timelock"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

/// Transport-level error from an RPC client.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection, timeout or node error.
    #[error("transport: {0}")]
    Network(String),

    /// Transaction or call reverted.
    #[error("reverted: {0}")]
    Reverted(RevertReason),

    /// Sender cannot pay for the transaction.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Required amount.
        required: u128,
        /// Available amount.
        available: u128,
    },

    /// Response could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl SwapError {
    /// Map a transport error for the escrow identified by `hashlock`.
    pub fn from_transport(err: TransportError, hashlock: Hash) -> Self {
        match err {
            TransportError::Network(msg) => Self::NetworkError(msg),
            TransportError::InsufficientFunds {
                required,
                available,
            } => Self::InsufficientFunds {
                required,
                available,
            },
            TransportError::Malformed(msg) => Self::NetworkError(format!("malformed response: {msg}")),
            TransportError::Reverted(reason) => match reason {
                RevertReason::EscrowNotFound => Self::EscrowNotFound(hashlock),
                RevertReason::AlreadyClaimed => Self::AlreadyClaimed,
                RevertReason::AlreadyRefunded => Self::AlreadyRefunded,
                RevertReason::HashMismatch => Self::HashMismatch,
                RevertReason::TimelockNotExpired { now, timelock } => {
                    Self::TimelockNotExpired { now, timelock }
                }
                other => Self::Contract(other.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            SwapError::InvalidTimelock("0h".into()).category(),
            ErrorCategory::Validation
        );
        assert_eq!(SwapError::RejectedByUser.category(), ErrorCategory::SigningRejected);
        assert_eq!(
            SwapError::WalletDisconnected(LedgerId::Cosmos).category(),
            ErrorCategory::SigningRejected
        );
        assert_eq!(SwapError::HashMismatch.category(), ErrorCategory::ContractState);
        assert_eq!(
            SwapError::CounterpartyEscrowMismatch("amount".into()).category(),
            ErrorCategory::CounterpartyMismatch
        );
        assert_eq!(
            SwapError::TimeoutExceeded("escrow".into()).category(),
            ErrorCategory::Timeout
        );
    }

    #[test]
    fn test_only_network_is_transient() {
        assert!(SwapError::NetworkError("reset".into()).is_transient());
        assert!(!SwapError::RejectedByUser.is_transient());
        assert!(!SwapError::AlreadyClaimed.is_transient());
    }

    #[test]
    fn test_keeps_step() {
        assert!(SwapError::RejectedByUser.keeps_step());
        assert!(SwapError::NetworkError("x".into()).keeps_step());
        assert!(!SwapError::AlreadyRefunded.keeps_step());
        assert!(!SwapError::CounterpartyEscrowMismatch("x".into()).keeps_step());
    }

    #[test]
    fn test_escrow_not_found_message_has_short_hash() {
        let err = SwapError::EscrowNotFound([0xAB; 32]);
        assert!(err.to_string().contains("0xabababab.."));
    }

    #[test]
    fn test_from_transport_maps_reverts() {
        let h = [1u8; 32];
        assert_eq!(
            SwapError::from_transport(TransportError::Reverted(RevertReason::EscrowNotFound), h),
            SwapError::EscrowNotFound(h)
        );
        assert_eq!(
            SwapError::from_transport(
                TransportError::Reverted(RevertReason::TimelockNotExpired { now: 1, timelock: 2 }),
                h
            ),
            SwapError::TimelockNotExpired { now: 1, timelock: 2 }
        );
        assert!(matches!(
            SwapError::from_transport(TransportError::Reverted(RevertReason::EscrowExists), h),
            SwapError::Contract(_)
        ));
        assert!(SwapError::from_transport(TransportError::Network("down".into()), h).is_transient());
    }
}
