//! # Swap State Machine
//!
//! Pure transition function plus the single place that mutates a `Swap`.
//!
//! ```text
//! Setup ──LockRequested──→ Locking ──LockConfirmed──→ AwaitingCounterpartyEscrow
//!   ↑                         │
//!   └───────LockAborted───────┘
//!
//! AwaitingCounterpartyEscrow ──CounterpartyEscrowVerified──→ ReadyToClaim
//! ReadyToClaim ──ClaimRequested──→ Claiming ──ClaimConfirmed──→ AwaitingFinalUnlock
//!      ↑                              │
//!      └─────────ClaimAborted─────────┘
//! AwaitingFinalUnlock ──FinalUnlockObserved(both Claimed)──→ Completed(Exchanged)
//!
//! any non-final ──Failed──→ Failed ──RefundConfirmed──→ Completed(Refunded)
//! ```

use crate::domain::{
    invariant_fully_exchanged, CompletionKind, EscrowStatus, EscrowView, Swap, SwapError,
    SwapFailure, SwapStep, TxKind, TxRecord, TxRef,
};

/// Inputs to the transition function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwapEvent {
    /// User asked to lock; parameters already validated.
    LockRequested,
    /// Source escrow confirmed. `tx` is `None` when an earlier submission was
    /// adopted from chain state.
    LockConfirmed {
        /// Confirmed lock transaction.
        tx: Option<TxRef>,
    },
    /// Lock submission failed recoverably; back to `Setup`.
    LockAborted,
    /// Counterparty escrow passed verification.
    CounterpartyEscrowVerified {
        /// Verified escrow.
        escrow: EscrowView,
    },
    /// Claim about to be submitted.
    ClaimRequested,
    /// Target escrow claim confirmed.
    ClaimConfirmed {
        /// Confirmed claim transaction.
        tx: Option<TxRef>,
    },
    /// Claim submission failed recoverably; back to `ReadyToClaim`.
    ClaimAborted,
    /// Observed disposition of both escrows after our claim.
    FinalUnlockObserved {
        /// Source escrow status.
        source: EscrowStatus,
        /// Target escrow status.
        target: EscrowStatus,
    },
    /// Unrecoverable error.
    Failed {
        /// Recorded cause.
        error: SwapError,
        /// Source escrow is refundable per chain state.
        can_refund: bool,
    },
    /// Source escrow refunded. `tx` is `None` when adopted from chain state.
    RefundConfirmed {
        /// Confirmed refund transaction.
        tx: Option<TxRef>,
    },
}

impl SwapEvent {
    /// Short label for logs and errors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LockRequested => "lock_requested",
            Self::LockConfirmed { .. } => "lock_confirmed",
            Self::LockAborted => "lock_aborted",
            Self::CounterpartyEscrowVerified { .. } => "counterparty_escrow_verified",
            Self::ClaimRequested => "claim_requested",
            Self::ClaimConfirmed { .. } => "claim_confirmed",
            Self::ClaimAborted => "claim_aborted",
            Self::FinalUnlockObserved { .. } => "final_unlock_observed",
            Self::Failed { .. } => "failed",
            Self::RefundConfirmed { .. } => "refund_confirmed",
        }
    }
}

/// Compute the next step. Pure; rejects anything not in the table.
pub fn next_step(step: SwapStep, event: &SwapEvent) -> Result<SwapStep, SwapError> {
    use SwapEvent as E;
    use SwapStep as S;

    let next = match (step, event) {
        (S::Setup, E::LockRequested) => S::Locking,
        (S::Locking, E::LockConfirmed { .. }) => S::AwaitingCounterpartyEscrow,
        (S::Locking, E::LockAborted) => S::Setup,
        (S::AwaitingCounterpartyEscrow, E::CounterpartyEscrowVerified { .. }) => S::ReadyToClaim,
        (S::ReadyToClaim, E::ClaimRequested) => S::Claiming,
        (S::Claiming, E::ClaimConfirmed { .. }) => S::AwaitingFinalUnlock,
        (S::Claiming, E::ClaimAborted) => S::ReadyToClaim,
        (S::AwaitingFinalUnlock, E::FinalUnlockObserved { source, target })
            if invariant_fully_exchanged(*source, *target) =>
        {
            S::Completed(CompletionKind::Exchanged)
        }
        (from, E::Failed { .. }) if !from.is_final() => S::Failed,
        (S::Failed, E::RefundConfirmed { .. }) => S::Completed(CompletionKind::Refunded),
        (from, event) => {
            return Err(SwapError::InvalidTransition {
                from: from.label().to_string(),
                event: event.label().to_string(),
            })
        }
    };
    Ok(next)
}

/// Apply an event to the swap, recording its side data.
pub fn apply_event(swap: &mut Swap, event: SwapEvent, now: u64) -> Result<SwapStep, SwapError> {
    let prior = swap.step;
    let next = next_step(prior, &event)?;

    match event {
        SwapEvent::LockConfirmed { tx: Some(tx) } => record(swap, TxKind::Lock, tx),
        SwapEvent::ClaimConfirmed { tx: Some(tx) } => record(swap, TxKind::Claim, tx),
        SwapEvent::RefundConfirmed { tx } => {
            if let Some(tx) = tx {
                record(swap, TxKind::Refund, tx);
            }
            if let Some(failure) = swap.failure.as_mut() {
                failure.can_refund = false;
            }
        }
        SwapEvent::CounterpartyEscrowVerified { escrow } => {
            swap.counterparty_escrow = Some(escrow);
        }
        SwapEvent::Failed { error, can_refund } => {
            swap.failure = Some(SwapFailure {
                error,
                failed_at: prior,
                can_refund,
            });
        }
        _ => {}
    }

    swap.step = next;
    swap.updated_at = now;
    Ok(next)
}

fn record(swap: &mut Swap, kind: TxKind, tx: TxRef) {
    swap.transactions.push(TxRecord { kind, tx });
}
