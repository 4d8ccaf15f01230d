//! # Swap Flows
//!
//! End-to-end exchanges through the coordinator, the chain adapters, the
//! simulated ledgers and the simulated relayer.
//!
//! ## Flow Tested
//!
//! 1. **Lock**: user escrow on the source ledger, recipient = relayer
//! 2. **Mirror**: relayer escrow on the target ledger, verified before claim
//! 3. **Claim**: user claims on the target ledger, revealing the secret
//! 4. **Unlock**: relayer reuses the secret on the source ledger

#[cfg(test)]
mod tests {
    use super::super::harness::{Harness, HOUR};
    use nebula_runtime::world::{RELAYER_COSMOS, RELAYER_ETH, USER_COSMOS, USER_ETH};
    use nebula_runtime::{record_metrics, run_swaps, Direction, RuntimeConfig, SimulatedWorld};
    use nebula_swap::adapters::simulated::{RelayerBehavior, GENESIS_TIME};
    use nebula_swap::domain::TxRecord;
    use nebula_swap::{CompletionKind, EscrowStatus, SwapApi, SwapStep, TxKind};
    use sha3::{Digest, Keccak256};
    use std::collections::HashSet;

    const ETH: u128 = 1_000_000_000_000_000_000;
    const ATOM: u128 = 1_000_000;

    fn kinds(transactions: &[TxRecord]) -> Vec<TxKind> {
        transactions.iter().map(|tx| tx.kind).collect()
    }

    // =========================================================================
    // HAPPY PATHS
    // =========================================================================

    /// 1.5 ETH for 15 ATOM with the default 24h timelock, one step at a time.
    #[tokio::test]
    async fn test_eth_to_cosmos_exchange() {
        let h = Harness::new(RelayerBehavior::Honest);
        let user_eth_before = h.world.eth.balance(USER_ETH);
        let user_atom_before = h.world.cosmos.balance(USER_COSMOS);

        let mut c = h.coordinator(Direction::EthToCosmos).await;
        let hashlock = c.swap().hashlock();
        let timelocks = c.swap().commitment.timelocks();
        assert_eq!(timelocks.source, GENESIS_TIME + 24 * HOUR);
        assert_eq!(timelocks.target, GENESIS_TIME + 11 * HOUR);

        assert_eq!(c.lock().await.unwrap(), SwapStep::AwaitingCounterpartyEscrow);
        let source = h.world.eth.escrow(&hashlock).unwrap();
        assert_eq!(source.amount, 3 * ETH / 2);
        assert_eq!(source.recipient, RELAYER_ETH);

        // Nothing mirrored yet: polling leaves the step alone.
        assert_eq!(c.poll_counterparty().await.unwrap(), SwapStep::AwaitingCounterpartyEscrow);

        h.relay();
        assert_eq!(c.poll_counterparty().await.unwrap(), SwapStep::ReadyToClaim);
        assert_eq!(c.claim().await.unwrap(), SwapStep::AwaitingFinalUnlock);

        let secret = h.world.cosmos.revealed_secret(&hashlock).unwrap();
        let digest: [u8; 32] = Keccak256::digest(secret).into();
        assert_eq!(digest, hashlock);

        // Relayer has not unlocked yet.
        assert_eq!(c.poll_final_unlock().await.unwrap(), SwapStep::AwaitingFinalUnlock);
        h.relay();
        assert_eq!(
            c.poll_final_unlock().await.unwrap(),
            SwapStep::Completed(CompletionKind::Exchanged)
        );

        assert_eq!(h.world.eth.balance(USER_ETH), user_eth_before - 3 * ETH / 2);
        assert_eq!(h.world.eth.balance(RELAYER_ETH), 1_000_000 * ETH + 3 * ETH / 2);
        assert_eq!(h.world.cosmos.balance(USER_COSMOS), user_atom_before + 15 * ATOM);
        assert_eq!(kinds(&c.swap().transactions), vec![TxKind::Lock, TxKind::Claim]);

        let record = h.world.history().get(c.swap().id).unwrap();
        assert_eq!(record.outcome, Some(CompletionKind::Exchanged));
        assert_eq!(record.amount, "1.5 ETH");
        assert_eq!(record.receive_amount, "15 ATOM");
    }

    #[tokio::test]
    async fn test_cosmos_to_eth_exchange() {
        let h = Harness::new(RelayerBehavior::Honest);
        let user_eth_before = h.world.eth.balance(USER_ETH);

        let mut c = h.coordinator(Direction::CosmosToEth).await;
        let hashlock = c.swap().hashlock();
        c.lock().await.unwrap();
        assert_eq!(h.world.cosmos.escrow(&hashlock).unwrap().recipient, RELAYER_COSMOS);

        h.relay();
        assert_eq!(h.world.eth.escrow(&hashlock).unwrap().recipient, USER_ETH);
        assert_eq!(c.poll_counterparty().await.unwrap(), SwapStep::ReadyToClaim);
        c.claim().await.unwrap();
        h.relay();
        assert_eq!(
            c.poll_final_unlock().await.unwrap(),
            SwapStep::Completed(CompletionKind::Exchanged)
        );

        assert_eq!(h.world.eth.balance(USER_ETH), user_eth_before + 15 * ETH / 100);
        assert_eq!(h.world.cosmos.escrow(&hashlock).unwrap().status, EscrowStatus::Claimed);
    }

    // =========================================================================
    // CONCURRENCY
    // =========================================================================

    /// Two swaps in flight at once never share a hashlock or a history entry.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_swaps_are_independent() {
        let config = RuntimeConfig::for_testing();
        let world = SimulatedWorld::new(&config);
        world.start();
        let reports = run_swaps(&world, &config).await;
        world.shutdown().await;

        assert_eq!(reports.len(), 2);
        let records = world.history().records();
        assert_eq!(records.len(), 2);
        let hashlocks: HashSet<_> = records.iter().map(|r| r.hashlock.clone()).collect();
        assert_eq!(hashlocks.len(), 2);
        for record in &records {
            assert_eq!(record.outcome, Some(CompletionKind::Exchanged));
            assert_eq!(record.transactions.len(), 2);
        }
        assert_eq!(world.eth.escrows().len(), 2);

        nebula_telemetry::register_metrics().unwrap();
        record_metrics(world.history(), &reports);
        let text = nebula_telemetry::encode_metrics().unwrap();
        assert!(text.contains("nebula_swaps_finished_total{outcome=\"exchanged\"}"));
        assert!(text.contains("nebula_chain_calls_total"));
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Reads never submit anything and return the same view every time.
    #[tokio::test]
    async fn test_queries_are_idempotent() {
        let h = Harness::new(RelayerBehavior::Honest);
        let mut c = h.coordinator(Direction::EthToCosmos).await;
        let hashlock = c.swap().hashlock();
        c.lock().await.unwrap();

        let ctx = h.world.context(Direction::EthToCosmos);
        let submitted = h.world.eth.submitted_count();
        let first = ctx.source.query_escrow(hashlock).await.unwrap();
        let second = ctx.source.query_escrow(hashlock).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.unwrap().status, EscrowStatus::Open);
        assert_eq!(ctx.target.query_escrow(hashlock).await.unwrap(), None);
        assert_eq!(h.world.eth.submitted_count(), submitted);

        let view = c.view();
        assert_eq!(view, c.view());
        assert!(!view.can_refund);
    }
}
