//! Chain adapter wrapper that counts every ledger call as it returns.

use async_trait::async_trait;
use nebula_swap::domain::Hash;
use nebula_swap::{ChainAdapter, EscrowView, LedgerId, SecureSecret, SwapError, TxRef};
use nebula_telemetry::record_chain_call;
use std::sync::Arc;

/// Records `nebula_chain_calls_total{ledger, op, result}` around an inner adapter.
pub struct MeteredAdapter {
    inner: Arc<dyn ChainAdapter>,
    ledger: String,
}

impl MeteredAdapter {
    pub fn new(inner: Arc<dyn ChainAdapter>) -> Self {
        let ledger = inner.ledger().to_string();
        Self { inner, ledger }
    }

    fn record<T>(&self, op: &str, result: Result<T, SwapError>) -> Result<T, SwapError> {
        record_chain_call(&self.ledger, op, result.is_ok());
        result
    }
}

#[async_trait]
impl ChainAdapter for MeteredAdapter {
    fn ledger(&self) -> LedgerId {
        self.inner.ledger()
    }

    fn address(&self) -> Option<String> {
        self.inner.address()
    }

    fn validate_address(&self, address: &str) -> Result<(), SwapError> {
        self.inner.validate_address(address)
    }

    async fn create_escrow(
        &self,
        hashlock: Hash,
        timelock: u64,
        recipient: &str,
        amount: u128,
    ) -> Result<TxRef, SwapError> {
        let result = self
            .inner
            .create_escrow(hashlock, timelock, recipient, amount)
            .await;
        self.record("create_escrow", result)
    }

    async fn claim_escrow(
        &self,
        hashlock: Hash,
        secret: &SecureSecret,
    ) -> Result<TxRef, SwapError> {
        let result = self.inner.claim_escrow(hashlock, secret).await;
        self.record("claim_escrow", result)
    }

    async fn refund_escrow(&self, hashlock: Hash) -> Result<TxRef, SwapError> {
        let result = self.inner.refund_escrow(hashlock).await;
        self.record("refund_escrow", result)
    }

    async fn query_escrow(&self, hashlock: Hash) -> Result<Option<EscrowView>, SwapError> {
        let result = self.inner.query_escrow(hashlock).await;
        self.record("query_escrow", result)
    }

    async fn chain_time(&self) -> Result<u64, SwapError> {
        let result = self.inner.chain_time().await;
        self.record("chain_time", result)
    }

    async fn revealed_secret(&self, hashlock: Hash) -> Result<Option<SecureSecret>, SwapError> {
        let result = self.inner.revealed_secret(hashlock).await;
        self.record("revealed_secret", result)
    }
}
