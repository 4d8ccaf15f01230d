//! # Domain Invariants
//!
//! Safety rules that make the swap atomic.

use super::entities::{CounterpartyExpectation, EscrowView};
use super::errors::{short_hex, Hash, Secret, SwapError};
use super::value_objects::EscrowStatus;
use sha3::{Digest, Keccak256};

/// Seconds per hour.
pub const SECS_PER_HOUR: u64 = 3600;

/// Default gap between source and target timelocks (2 hours).
pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 2 * SECS_PER_HOUR;

/// Invariant: Timelock ordering.
///
/// Source escrow MUST expire after the target escrow plus the margin, so the
/// initiator can still refund after the counterparty's last chance to claim.
pub fn invariant_timelock_ordering(
    source_timelock: u64,
    target_timelock: u64,
    min_margin_secs: u64,
) -> Result<(), SwapError> {
    let floor = target_timelock.saturating_add(min_margin_secs);
    if source_timelock <= floor {
        return Err(SwapError::InvalidTimelock(format!(
            "source timelock {source_timelock} must exceed target {target_timelock} + margin {min_margin_secs}"
        )));
    }
    Ok(())
}

/// Invariant: Hashlock match. Both escrows use the same hashlock.
pub fn invariant_hashlock_match(source_hashlock: &Hash, target_hashlock: &Hash) -> bool {
    source_hashlock == target_hashlock
}

/// Invariant: keccak256(secret) equals the hashlock.
pub fn invariant_secret_matches(secret: &Secret, hashlock: &Hash) -> bool {
    let digest: Hash = Keccak256::digest(secret).into();
    digest == *hashlock
}

/// Invariant: An escrow can be refunded only while open and strictly past its
/// timelock, measured in chain time.
pub fn invariant_refundable(escrow: &EscrowView, chain_now: u64) -> bool {
    escrow.status == EscrowStatus::Open && chain_now > escrow.timelock
}

/// Invariant: A swap is exchanged only when both escrows are claimed.
pub fn invariant_fully_exchanged(source: EscrowStatus, target: EscrowStatus) -> bool {
    source == EscrowStatus::Claimed && target == EscrowStatus::Claimed
}

/// Invariant: Transaction reached the required confirmation depth.
pub fn invariant_sufficient_confirmations(confirmations: u64, required: u64) -> bool {
    confirmations >= required
}

/// Invariant: Counterparty escrow matches the agreed terms.
///
/// Any failure is `CounterpartyEscrowMismatch`; the caller must not claim.
pub fn invariant_counterparty_escrow(
    escrow: &EscrowView,
    expected: &CounterpartyExpectation,
    target_now: u64,
) -> Result<(), SwapError> {
    let mismatch = |why: String| Err(SwapError::CounterpartyEscrowMismatch(why));

    if !invariant_hashlock_match(&escrow.hashlock, &expected.hashlock) {
        return mismatch(format!(
            "hashlock {} != {}",
            short_hex(&escrow.hashlock),
            short_hex(&expected.hashlock)
        ));
    }
    if escrow.status != EscrowStatus::Open {
        return mismatch(format!("escrow is {:?}, expected Open", escrow.status));
    }
    if escrow.recipient != expected.beneficiary {
        return mismatch(format!(
            "recipient {} != {}",
            escrow.recipient, expected.beneficiary
        ));
    }
    if escrow.amount < expected.min_amount {
        return mismatch(format!(
            "amount {} < agreed {}",
            escrow.amount, expected.min_amount
        ));
    }
    if escrow.timelock <= target_now {
        return mismatch(format!(
            "timelock {} already expired at {}",
            escrow.timelock, target_now
        ));
    }
    if invariant_timelock_ordering(
        expected.source_timelock,
        escrow.timelock,
        expected.safety_margin_secs,
    )
    .is_err()
    {
        return mismatch(format!(
            "timelock {} too close to source timelock {}",
            escrow.timelock, expected.source_timelock
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LedgerId;

    fn expectation() -> CounterpartyExpectation {
        CounterpartyExpectation {
            hashlock: [0xAB; 32],
            beneficiary: "cosmos1me".into(),
            min_amount: 15_000_000,
            source_timelock: 100_000,
            safety_margin_secs: DEFAULT_SAFETY_MARGIN_SECS,
        }
    }

    fn good_escrow() -> EscrowView {
        EscrowView {
            ledger: LedgerId::Cosmos,
            hashlock: [0xAB; 32],
            sender: "cosmos1relayer".into(),
            recipient: "cosmos1me".into(),
            amount: 15_000_000,
            timelock: 50_000,
            status: EscrowStatus::Open,
        }
    }

    #[test]
    fn test_timelock_ordering_valid() {
        assert!(invariant_timelock_ordering(50_000, 20_000, 21_600).is_ok());
    }

    #[test]
    fn test_timelock_ordering_boundary_fails() {
        // equal to target + margin is not strictly greater
        assert!(invariant_timelock_ordering(41_600, 20_000, 21_600).is_err());
        assert!(invariant_timelock_ordering(10_000, 10_000, 0).is_err());
    }

    #[test]
    fn test_secret_matches_keccak() {
        let secret = [0xABu8; 32];
        let hash: Hash = Keccak256::digest(secret).into();
        assert!(invariant_secret_matches(&secret, &hash));
        assert!(!invariant_secret_matches(&[0xCDu8; 32], &hash));
    }

    #[test]
    fn test_refundable_requires_open_and_expired() {
        let mut escrow = good_escrow();
        assert!(!invariant_refundable(&escrow, 50_000));
        assert!(invariant_refundable(&escrow, 50_001));
        escrow.status = EscrowStatus::Claimed;
        assert!(!invariant_refundable(&escrow, 60_000));
    }

    #[test]
    fn test_fully_exchanged() {
        assert!(invariant_fully_exchanged(EscrowStatus::Claimed, EscrowStatus::Claimed));
        assert!(!invariant_fully_exchanged(EscrowStatus::Open, EscrowStatus::Claimed));
        assert!(!invariant_fully_exchanged(EscrowStatus::Claimed, EscrowStatus::Refunded));
    }

    #[test]
    fn test_counterparty_escrow_accepted() {
        assert!(invariant_counterparty_escrow(&good_escrow(), &expectation(), 1_000).is_ok());
    }

    #[test]
    fn test_counterparty_escrow_rejections() {
        let cases: Vec<(&str, Box<dyn Fn(&mut EscrowView)>)> = vec![
            ("hashlock", Box::new(|e| e.hashlock = [0xCD; 32])),
            ("recipient", Box::new(|e| e.recipient = "cosmos1other".into())),
            ("amount", Box::new(|e| e.amount = 14_999_999)),
            ("expired", Box::new(|e| e.timelock = 900)),
            ("margin", Box::new(|e| e.timelock = 95_000)),
            ("status", Box::new(|e| e.status = EscrowStatus::Refunded)),
        ];
        for (name, mutate) in cases {
            let mut escrow = good_escrow();
            mutate(&mut escrow);
            let result = invariant_counterparty_escrow(&escrow, &expectation(), 1_000);
            assert!(
                matches!(result, Err(SwapError::CounterpartyEscrowMismatch(_))),
                "case {name} accepted"
            );
        }
    }

    #[test]
    fn test_sufficient_confirmations() {
        assert!(invariant_sufficient_confirmations(6, 6));
        assert!(!invariant_sufficient_confirmations(3, 6));
    }
}
