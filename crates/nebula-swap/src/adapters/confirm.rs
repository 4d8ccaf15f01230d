//! Confirmation Waiter
//!
//! Polls a transaction until it reaches the configured depth.

use crate::config::ConfirmationPolicy;
use crate::domain::{
    invariant_sufficient_confirmations, Hash, LedgerId, SwapError, TransportError, TxRef,
};
use std::future::Future;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Wait until `poll` reports at least `policy.required` confirmations.
///
/// A transaction that never confirms within `policy.timeout` (dropped or
/// stuck) is reported as `NetworkError`. Reverts surface as contract errors.
pub async fn await_confirmations<F, Fut>(
    ledger: LedgerId,
    tx_hash: String,
    hashlock: Hash,
    policy: &ConfirmationPolicy,
    mut poll: F,
) -> Result<TxRef, SwapError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<u64>, TransportError>>,
{
    let deadline = Instant::now() + policy.timeout();
    loop {
        match poll().await {
            Ok(Some(depth)) if invariant_sufficient_confirmations(depth, policy.required) => {
                debug!(%ledger, tx = %tx_hash, depth, "[nebula-swap] transaction confirmed");
                return Ok(TxRef::new(ledger, tx_hash));
            }
            Ok(_) => {}
            Err(TransportError::Network(msg)) => {
                warn!(%ledger, tx = %tx_hash, "[nebula-swap] receipt poll failed: {msg}");
            }
            Err(other) => return Err(SwapError::from_transport(other, hashlock)),
        }

        if Instant::now() >= deadline {
            return Err(SwapError::NetworkError(format!(
                "{ledger} transaction {tx_hash} not confirmed within {}ms",
                policy.timeout_ms
            )));
        }
        sleep(policy.poll_interval()).await;
    }
}
