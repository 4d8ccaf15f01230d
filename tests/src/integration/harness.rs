//! Shared fixtures for the integration flows.

use nebula_runtime::{swap_params, Direction, RuntimeConfig, SimulatedWorld};
use nebula_swap::adapters::simulated::RelayerBehavior;
use nebula_swap::adapters::AutoApprove;
use nebula_swap::{Signer, SwapCoordinator};
use std::sync::Arc;

pub const HOUR: u64 = 3600;

/// A simulated world whose clock only moves when a test moves it.
pub struct Harness {
    pub config: RuntimeConfig,
    pub world: SimulatedWorld,
}

impl Harness {
    pub fn new(behavior: RelayerBehavior) -> Self {
        Self::with_signer(behavior, Arc::new(AutoApprove))
    }

    /// User's Ethereum wallet answers prompts through `signer`.
    pub fn with_signer(behavior: RelayerBehavior, signer: Arc<dyn Signer>) -> Self {
        Self::with_signers(behavior, signer, Arc::new(AutoApprove))
    }

    pub fn with_signers(
        behavior: RelayerBehavior,
        eth_signer: Arc<dyn Signer>,
        cosmos_signer: Arc<dyn Signer>,
    ) -> Self {
        let mut config = RuntimeConfig::for_testing();
        config.relayer = behavior;
        let world = SimulatedWorld::with_signers(&config, eth_signer, cosmos_signer);
        Self { config, world }
    }

    /// Fresh coordinator for a quoted swap of `config.amount`.
    pub async fn coordinator(&self, direction: Direction) -> SwapCoordinator {
        let params = swap_params(&self.world, &self.config, direction)
            .await
            .expect("valid params");
        SwapCoordinator::new(self.world.context(direction), params)
            .await
            .expect("coordinator")
    }

    /// Move both ledgers' clocks forward.
    pub fn advance(&self, secs: u64) {
        self.world.eth.advance_time(secs);
        self.world.cosmos.advance_time(secs);
    }

    pub fn relay(&self) {
        self.world.relayer.tick();
    }
}
