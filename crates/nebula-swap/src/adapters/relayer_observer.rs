//! Polling Relayer Observer
//!
//! Implements `RelayerObserver` by polling the chain adapters. A push-based
//! observer (event subscription) can replace it behind the same port.

use crate::domain::{short_hex, EscrowView, Hash, LedgerId, SecureSecret, SwapError};
use crate::ports::outbound::{ChainAdapter, RelayerObserver};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Observer that polls `query_escrow` / `revealed_secret` on an interval.
pub struct PollingRelayerObserver {
    adapters: HashMap<LedgerId, Arc<dyn ChainAdapter>>,
    poll_interval: Duration,
}

impl PollingRelayerObserver {
    /// Observe the ledgers served by `adapters`.
    pub fn new(adapters: Vec<Arc<dyn ChainAdapter>>, poll_interval: Duration) -> Self {
        Self {
            adapters: adapters
                .into_iter()
                .map(|adapter| (adapter.ledger(), adapter))
                .collect(),
            poll_interval,
        }
    }

    fn adapter(&self, ledger: LedgerId) -> Result<&Arc<dyn ChainAdapter>, SwapError> {
        self.adapters
            .get(&ledger)
            .ok_or_else(|| SwapError::Config(format!("no adapter registered for {ledger}")))
    }

    async fn poll_until<T, F, Fut>(
        &self,
        what: String,
        window: Duration,
        mut probe: F,
    ) -> Result<T, SwapError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, SwapError>>,
    {
        let deadline = Instant::now() + window;
        loop {
            match probe().await {
                Ok(Some(found)) => return Ok(found),
                Ok(None) => {}
                Err(err) if err.is_transient() => {
                    warn!(error = %err, "[nebula-swap] observer poll failed for {what}");
                }
                Err(err) => return Err(err),
            }
            if Instant::now() >= deadline {
                debug!("[nebula-swap] observer window elapsed for {what}");
                return Err(SwapError::TimeoutExceeded(what));
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl RelayerObserver for PollingRelayerObserver {
    async fn watch_for_escrow(
        &self,
        hashlock: Hash,
        ledger: LedgerId,
        window: Duration,
    ) -> Result<EscrowView, SwapError> {
        let adapter = self.adapter(ledger)?.clone();
        self.poll_until(
            format!("{ledger} escrow {}", short_hex(&hashlock)),
            window,
            move || {
                let adapter = adapter.clone();
                async move { adapter.query_escrow(hashlock).await }
            },
        )
        .await
    }

    async fn watch_for_claim(
        &self,
        hashlock: Hash,
        ledger: LedgerId,
        window: Duration,
    ) -> Result<SecureSecret, SwapError> {
        let adapter = self.adapter(ledger)?.clone();
        self.poll_until(
            format!("{ledger} claim {}", short_hex(&hashlock)),
            window,
            move || {
                let adapter = adapter.clone();
                async move { adapter.revealed_secret(hashlock).await }
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::simulated::{SimulatedEvm, SimulatedLedger, GENESIS_TIME};
    use crate::adapters::{AutoApprove, EthereumAdapter, WalletSession};
    use crate::config::EthereumConfig;

    const USER: &str = "0x1111111111111111111111111111111111111111";
    const RELAYER: &str = "0x2222222222222222222222222222222222222222";

    fn observer() -> (Arc<SimulatedLedger>, PollingRelayerObserver) {
        let ledger = Arc::new(SimulatedLedger::new(LedgerId::Ethereum));
        ledger.fund(RELAYER, 5_000);
        let config = EthereumConfig::for_testing();
        let rpc = Arc::new(SimulatedEvm::new(ledger.clone(), config.contract.clone()));
        let session = Arc::new(WalletSession::connected(
            LedgerId::Ethereum,
            USER,
            Arc::new(AutoApprove),
        ));
        let adapter: Arc<dyn ChainAdapter> = Arc::new(EthereumAdapter::new(rpc, session, config));
        (
            ledger,
            PollingRelayerObserver::new(vec![adapter], Duration::from_millis(1)),
        )
    }

    #[tokio::test]
    async fn test_watch_window_elapses_with_timeout() {
        let (_, observer) = observer();
        let result = observer
            .watch_for_escrow([3; 32], LedgerId::Ethereum, Duration::from_millis(5))
            .await;
        assert!(matches!(result, Err(SwapError::TimeoutExceeded(_))));

        let result = observer
            .watch_for_claim([3; 32], LedgerId::Ethereum, Duration::from_millis(5))
            .await;
        assert!(matches!(result, Err(SwapError::TimeoutExceeded(_))));
    }

    #[tokio::test]
    async fn test_watch_returns_existing_escrow() {
        let (ledger, observer) = observer();
        let hashlock = SecureSecret::new([4; 32]).hashlock();
        ledger
            .create_escrow(RELAYER, hashlock, GENESIS_TIME + 100, USER, 1_000)
            .unwrap();

        let escrow = observer
            .watch_for_escrow(hashlock, LedgerId::Ethereum, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(escrow.amount, 1_000);
    }

    #[tokio::test]
    async fn test_unknown_ledger_is_config_error() {
        let (_, observer) = observer();
        let result = observer
            .watch_for_escrow([3; 32], LedgerId::Cosmos, Duration::from_millis(5))
            .await;
        assert!(matches!(result, Err(SwapError::Config(_))));
    }
}
