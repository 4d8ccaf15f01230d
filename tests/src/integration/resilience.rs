//! # Resilience
//!
//! Signing rejections, wallet disconnects and flaky transports. A write
//! that did not change chain state returns the swap to its prior step; a
//! write that did is adopted on retry instead of being sent twice.

#[cfg(test)]
mod tests {
    use super::super::harness::Harness;
    use nebula_runtime::Direction;
    use nebula_swap::adapters::simulated::{RelayerBehavior, SubmitFault};
    use nebula_swap::adapters::{AutoApprove, ScriptedSigner};
    use nebula_swap::{CompletionKind, EscrowStatus, SwapApi, SwapError, SwapStep, TxKind};
    use std::sync::Arc;

    // =========================================================================
    // WALLET
    // =========================================================================

    #[tokio::test]
    async fn test_rejected_lock_keeps_setup() {
        let signer = Arc::new(ScriptedSigner::new([false]));
        let h = Harness::with_signer(RelayerBehavior::Honest, signer.clone());
        let mut c = h.coordinator(Direction::EthToCosmos).await;
        let hashlock = c.swap().hashlock();

        assert_eq!(c.lock().await, Err(SwapError::RejectedByUser));
        assert_eq!(c.swap().step, SwapStep::Setup);
        assert!(c.swap().failure.is_none());
        assert!(h.world.eth.escrow(&hashlock).is_none());

        assert_eq!(c.lock().await.unwrap(), SwapStep::AwaitingCounterpartyEscrow);
        assert_eq!(signer.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_claim_keeps_ready_to_claim() {
        let cosmos_signer = Arc::new(ScriptedSigner::new([false]));
        let h = Harness::with_signers(
            RelayerBehavior::Honest,
            Arc::new(AutoApprove),
            cosmos_signer.clone(),
        );
        let mut c = h.coordinator(Direction::EthToCosmos).await;
        let hashlock = c.swap().hashlock();
        c.lock().await.unwrap();
        h.relay();
        c.poll_counterparty().await.unwrap();

        assert_eq!(c.claim().await, Err(SwapError::RejectedByUser));
        assert_eq!(c.swap().step, SwapStep::ReadyToClaim);
        assert!(h.world.cosmos.revealed_secret(&hashlock).is_none());

        assert_eq!(c.claim().await.unwrap(), SwapStep::AwaitingFinalUnlock);
        assert_eq!(cosmos_signer.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_disconnected_wallet_keeps_step_until_reconnect() {
        let h = Harness::new(RelayerBehavior::Honest);
        let mut c = h.coordinator(Direction::EthToCosmos).await;

        h.world.eth_session.disconnect();
        assert!(matches!(
            c.lock().await,
            Err(SwapError::WalletDisconnected(_))
        ));
        assert_eq!(c.swap().step, SwapStep::Setup);
        assert_eq!(h.world.eth.submitted_count(), 0);

        h.world.eth_session.reconnect();
        assert_eq!(c.lock().await.unwrap(), SwapStep::AwaitingCounterpartyEscrow);
    }

    // =========================================================================
    // TRANSPORT
    // =========================================================================

    /// The claim landed but its receipt was lost: the retry adopts it.
    #[tokio::test]
    async fn test_lost_claim_receipt_is_adopted() {
        let h = Harness::new(RelayerBehavior::Honest);
        let mut c = h.coordinator(Direction::EthToCosmos).await;
        let hashlock = c.swap().hashlock();
        c.lock().await.unwrap();
        h.relay();
        c.poll_counterparty().await.unwrap();

        h.world.cosmos.inject_submit_faults([SubmitFault::LoseAck]);
        assert!(matches!(c.claim().await, Err(SwapError::NetworkError(_))));
        assert_eq!(c.swap().step, SwapStep::ReadyToClaim);
        assert_eq!(h.world.cosmos.escrow(&hashlock).unwrap().status, EscrowStatus::Claimed);

        let submitted = h.world.cosmos.submitted_count();
        assert_eq!(c.claim().await.unwrap(), SwapStep::AwaitingFinalUnlock);
        assert_eq!(h.world.cosmos.submitted_count(), submitted);
        let kinds: Vec<TxKind> = c.swap().transactions.iter().map(|tx| tx.kind).collect();
        assert_eq!(kinds, vec![TxKind::Lock]);
    }

    /// A dropped lock never confirms; nothing is on chain, so the retry resubmits.
    #[tokio::test]
    async fn test_dropped_lock_is_resubmitted() {
        let h = Harness::new(RelayerBehavior::Honest);
        let mut c = h.coordinator(Direction::EthToCosmos).await;
        let hashlock = c.swap().hashlock();

        h.world.eth.inject_submit_faults([SubmitFault::Drop]);
        assert!(matches!(c.lock().await, Err(SwapError::NetworkError(_))));
        assert_eq!(c.swap().step, SwapStep::Setup);
        assert!(h.world.eth.escrow(&hashlock).is_none());

        assert_eq!(c.lock().await.unwrap(), SwapStep::AwaitingCounterpartyEscrow);
        assert!(h.world.eth.escrow(&hashlock).is_some());
    }

    #[tokio::test]
    async fn test_transient_read_failures_are_retried() {
        let h = Harness::new(RelayerBehavior::Honest);
        let mut c = h.coordinator(Direction::EthToCosmos).await;
        c.lock().await.unwrap();
        h.relay();

        h.world.cosmos.inject_read_failures(2);
        assert_eq!(c.poll_counterparty().await.unwrap(), SwapStep::ReadyToClaim);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_recovers_from_lost_lock_receipt() {
        let h = Harness::new(RelayerBehavior::Honest);
        h.world.eth.inject_submit_faults([SubmitFault::LoseAck]);
        h.world.start();

        let mut c = h.coordinator(Direction::EthToCosmos).await;
        let view = c.run().await.unwrap();
        h.world.shutdown().await;

        assert_eq!(view.step, SwapStep::Completed(CompletionKind::Exchanged));
        assert_eq!(h.world.eth.escrows().len(), 1);
        // The adopted lock has no receipt of its own.
        let kinds: Vec<TxKind> = view.transactions.iter().map(|tx| tx.kind).collect();
        assert_eq!(kinds, vec![TxKind::Claim]);
    }
}
