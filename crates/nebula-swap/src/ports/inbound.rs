//! # Inbound Ports
//!
//! What a driver (UI, CLI, runtime) can ask of one swap.

use crate::domain::{Swap, SwapError, SwapStep, SwapView};
use async_trait::async_trait;

/// Per-swap coordination API - inbound port.
///
/// Each step operation returns the step the swap is in afterwards. On error
/// the swap is either back at its prior stable step (validation, signing and
/// network errors) or `Failed` with the error recorded.
#[async_trait]
pub trait SwapApi: Send {
    /// Submit the source escrow and wait for confirmation.
    async fn lock(&mut self) -> Result<SwapStep, SwapError>;

    /// Check once for the counterparty escrow.
    async fn poll_counterparty(&mut self) -> Result<SwapStep, SwapError>;

    /// Wait for the counterparty escrow until the source timelock expires.
    async fn await_counterparty(&mut self) -> Result<SwapStep, SwapError>;

    /// Claim the counterparty escrow, revealing the secret.
    async fn claim(&mut self) -> Result<SwapStep, SwapError>;

    /// Check once whether both escrows are claimed.
    async fn poll_final_unlock(&mut self) -> Result<SwapStep, SwapError>;

    /// Wait for the relayer to claim the source escrow.
    async fn await_final_unlock(&mut self) -> Result<SwapStep, SwapError>;

    /// Re-check refundability of a failed swap against chain state.
    async fn refresh_refund_eligibility(&mut self) -> Result<bool, SwapError>;

    /// Refund the source escrow of a failed swap.
    async fn refund(&mut self) -> Result<SwapStep, SwapError>;

    /// Drive the swap to a final step.
    async fn run(&mut self) -> Result<SwapView, SwapError>;

    /// The swap aggregate, read-only.
    fn swap(&self) -> &Swap;

    /// Display projection.
    fn view(&self) -> SwapView;
}
