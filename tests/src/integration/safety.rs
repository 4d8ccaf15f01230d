//! # Safety Scenarios
//!
//! The user never claims against an escrow that fails verification, never
//! reveals a secret that does not match, and can always recover a locked
//! source escrow once its timelock passes.

#[cfg(test)]
mod tests {
    use super::super::harness::{Harness, HOUR};
    use nebula_runtime::world::{RELAYER_COSMOS, USER_COSMOS, USER_ETH};
    use nebula_runtime::Direction;
    use nebula_swap::adapters::simulated::{RelayerBehavior, GENESIS_TIME};
    use nebula_swap::{
        CompletionKind, EscrowStatus, SecureSecret, SwapApi, SwapError, SwapStep, TxKind,
    };

    const ATOM: u128 = 1_000_000;

    // =========================================================================
    // SECRET HANDLING
    // =========================================================================

    #[tokio::test]
    async fn test_wrong_secret_never_broadcasts() {
        let h = Harness::new(RelayerBehavior::Honest);
        let mut c = h.coordinator(Direction::EthToCosmos).await;
        let hashlock = c.swap().hashlock();
        c.lock().await.unwrap();
        h.relay();

        let target = h.world.context(Direction::EthToCosmos).target;
        let submitted = h.world.cosmos.submitted_count();
        assert_eq!(
            target.claim_escrow(hashlock, &SecureSecret::new([9; 32])).await,
            Err(SwapError::HashMismatch)
        );
        assert_eq!(h.world.cosmos.submitted_count(), submitted);
        assert_eq!(h.world.cosmos.escrow(&hashlock).unwrap().status, EscrowStatus::Open);
        assert!(h.world.cosmos.revealed_secret(&hashlock).is_none());
    }

    // =========================================================================
    // COUNTERPARTY VERIFICATION
    // =========================================================================

    /// Relayer mirrors 13.5 ATOM against an agreed 15: fail, never claim, refund later.
    #[tokio::test]
    async fn test_short_change_fails_then_refunds() {
        let h = Harness::new(RelayerBehavior::ShortChange);
        let user_eth_before = h.world.eth.balance(USER_ETH);
        let mut c = h.coordinator(Direction::EthToCosmos).await;
        let hashlock = c.swap().hashlock();
        c.lock().await.unwrap();
        h.relay();
        assert_eq!(h.world.cosmos.escrow(&hashlock).unwrap().amount, 27 * ATOM / 2);

        let submitted = h.world.cosmos.submitted_count();
        assert!(matches!(
            c.poll_counterparty().await,
            Err(SwapError::CounterpartyEscrowMismatch(_))
        ));
        assert_eq!(c.swap().step, SwapStep::Failed);
        assert!(!c.view().can_refund);
        assert_eq!(h.world.cosmos.submitted_count(), submitted);
        assert!(h.world.cosmos.revealed_secret(&hashlock).is_none());

        // Refund is refused while the source timelock is still ahead.
        assert!(matches!(
            c.refund().await,
            Err(SwapError::TimelockNotExpired { .. })
        ));
        assert_eq!(c.swap().step, SwapStep::Failed);

        h.advance(24 * HOUR + 1);
        assert!(c.refresh_refund_eligibility().await.unwrap());
        assert!(c.view().can_refund);
        assert_eq!(
            c.refund().await.unwrap(),
            SwapStep::Completed(CompletionKind::Refunded)
        );
        assert_eq!(h.world.eth.balance(USER_ETH), user_eth_before);

        let record = h.world.history().get(c.swap().id).unwrap();
        assert_eq!(record.outcome, Some(CompletionKind::Refunded));
        assert!(record.error.unwrap().contains("amount"));
    }

    /// An escrow whose timelock leaves no safety margin is refused.
    #[tokio::test]
    async fn test_late_counterparty_timelock_is_refused() {
        let h = Harness::new(RelayerBehavior::Absent);
        let mut c = h.coordinator(Direction::EthToCosmos).await;
        let hashlock = c.swap().hashlock();
        c.lock().await.unwrap();

        h.world
            .cosmos
            .create_escrow(RELAYER_COSMOS, hashlock, GENESIS_TIME + 23 * HOUR, USER_COSMOS, 15 * ATOM)
            .unwrap();

        assert!(matches!(
            c.poll_counterparty().await,
            Err(SwapError::CounterpartyEscrowMismatch(_))
        ));
        assert_eq!(c.swap().step, SwapStep::Failed);
        assert!(c.swap().transactions.iter().all(|tx| tx.kind == TxKind::Lock));
    }

    // =========================================================================
    // TIMEOUTS
    // =========================================================================

    #[tokio::test]
    async fn test_absent_relayer_times_out_and_refunds() {
        let h = Harness::new(RelayerBehavior::Absent);
        let user_eth_before = h.world.eth.balance(USER_ETH);
        let mut c = h.coordinator(Direction::EthToCosmos).await;
        c.lock().await.unwrap();
        h.relay();

        assert_eq!(c.poll_counterparty().await.unwrap(), SwapStep::AwaitingCounterpartyEscrow);
        h.advance(25 * HOUR);
        assert!(matches!(
            c.poll_counterparty().await,
            Err(SwapError::TimeoutExceeded(_))
        ));
        assert_eq!(c.swap().step, SwapStep::Failed);
        assert!(c.view().can_refund);

        assert_eq!(
            c.refund().await.unwrap(),
            SwapStep::Completed(CompletionKind::Refunded)
        );
        assert_eq!(h.world.eth.balance(USER_ETH), user_eth_before);
        let kinds: Vec<TxKind> = c.swap().transactions.iter().map(|tx| tx.kind).collect();
        assert_eq!(kinds, vec![TxKind::Lock, TxKind::Refund]);
    }

    /// Relayer never reuses the secret: once the source timelock passes the
    /// user takes the source escrow back.
    #[tokio::test]
    async fn test_relayer_that_never_unlocks_leaves_refund() {
        let h = Harness::new(RelayerBehavior::NeverUnlock);
        let user_eth_before = h.world.eth.balance(USER_ETH);
        let mut c = h.coordinator(Direction::EthToCosmos).await;
        c.lock().await.unwrap();
        h.relay();
        c.poll_counterparty().await.unwrap();
        assert_eq!(c.claim().await.unwrap(), SwapStep::AwaitingFinalUnlock);
        h.relay();
        assert_eq!(c.poll_final_unlock().await.unwrap(), SwapStep::AwaitingFinalUnlock);

        h.advance(25 * HOUR);
        assert!(matches!(
            c.poll_final_unlock().await,
            Err(SwapError::TimeoutExceeded(_))
        ));
        assert_eq!(
            c.refund().await.unwrap(),
            SwapStep::Completed(CompletionKind::Refunded)
        );
        assert_eq!(h.world.eth.balance(USER_ETH), user_eth_before);
        assert_eq!(h.world.cosmos.balance(USER_COSMOS), 1_000 * ATOM + 15 * ATOM);
    }

    #[tokio::test]
    async fn test_completed_swap_rejects_refund() {
        let h = Harness::new(RelayerBehavior::Honest);
        let mut c = h.coordinator(Direction::EthToCosmos).await;
        c.lock().await.unwrap();
        h.relay();
        c.poll_counterparty().await.unwrap();
        c.claim().await.unwrap();
        h.relay();
        c.poll_final_unlock().await.unwrap();

        assert!(matches!(
            c.refund().await,
            Err(SwapError::InvalidTransition { .. })
        ));
    }
}
