//! # Simulated World
//!
//! Two simulated ledgers, their adapters, one relayer and a clock driver.
//!
//! ## Accounts
//!
//! | Role | Ethereum | Cosmos |
//! |------|----------|--------|
//! | User | [`USER_ETH`] | [`USER_COSMOS`] |
//! | Relayer | [`RELAYER_ETH`] | [`RELAYER_COSMOS`] |
//!
//! Escrows the user locks to the relayer are mirrored to the user's address
//! on the other ledger, in both directions.

use crate::config::RuntimeConfig;
use crate::metered::MeteredAdapter;
use nebula_swap::adapters::simulated::{
    RelayerSide, SimulatedEvm, SimulatedLedger, SimulatedRelayer, SimulatedWasm,
};
use nebula_swap::adapters::AutoApprove;
use nebula_swap::{
    ChainAdapter, CosmosAdapter, EthereumAdapter, LedgerId, PollingRelayerObserver, SwapContext,
    Signer, SwapHistory, SwapParams, Token, WalletSession,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// User account on Ethereum.
pub const USER_ETH: &str = "0x1111111111111111111111111111111111111111";
/// Relayer account on Ethereum.
pub const RELAYER_ETH: &str = "0x2222222222222222222222222222222222222222";
/// User account on Cosmos.
pub const USER_COSMOS: &str = "cosmos1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqq";
/// Relayer account on Cosmos.
pub const RELAYER_COSMOS: &str = "cosmos1pppppppppppppppppppppppppppppppppppppp";

const USER_FUNDS: u128 = 1_000;
const RELAYER_FUNDS: u128 = 1_000_000;

/// Which way a swap moves value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Direction {
    /// Lock ETH, receive ATOM.
    EthToCosmos,
    /// Lock ATOM, receive ETH.
    CosmosToEth,
}

impl Direction {
    /// Direction of the `index`-th swap.
    pub fn for_index(index: usize, alternate: bool) -> Self {
        if alternate && index % 2 == 1 {
            Self::CosmosToEth
        } else {
            Self::EthToCosmos
        }
    }

    /// Token locked on the source ledger.
    pub fn from_token(self) -> Token {
        match self {
            Self::EthToCosmos => Token::Eth,
            Self::CosmosToEth => Token::Atom,
        }
    }

    /// Token received on the target ledger.
    pub fn to_token(self) -> Token {
        match self {
            Self::EthToCosmos => Token::Atom,
            Self::CosmosToEth => Token::Eth,
        }
    }

    /// Relayer address on the source ledger; it may claim the source escrow.
    pub fn recipient(self) -> &'static str {
        match self {
            Self::EthToCosmos => RELAYER_ETH,
            Self::CosmosToEth => RELAYER_COSMOS,
        }
    }
}

fn whole(token: Token, units: u128) -> u128 {
    units * 10u128.pow(token.decimals())
}

/// Ledgers, relayer and swap contexts for one demo run.
pub struct SimulatedWorld {
    /// Ethereum ledger state.
    pub eth: Arc<SimulatedLedger>,
    /// Cosmos ledger state.
    pub cosmos: Arc<SimulatedLedger>,
    /// Counterparty.
    pub relayer: Arc<SimulatedRelayer>,
    /// User's Ethereum wallet.
    pub eth_session: Arc<WalletSession>,
    /// User's Cosmos wallet.
    pub cosmos_session: Arc<WalletSession>,
    forward: SwapContext,
    clock_step_secs: u64,
    clock_tick: Duration,
    relayer_tick: Duration,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SimulatedWorld {
    /// Build funded ledgers and adapters. Nothing runs until [`start`](Self::start).
    pub fn new(config: &RuntimeConfig) -> Self {
        Self::with_signers(config, Arc::new(AutoApprove), Arc::new(AutoApprove))
    }

    /// Like [`new`](Self::new), with the user's wallets prompting through the given signers.
    pub fn with_signers(
        config: &RuntimeConfig,
        eth_signer: Arc<dyn Signer>,
        cosmos_signer: Arc<dyn Signer>,
    ) -> Self {
        let eth = Arc::new(SimulatedLedger::new(LedgerId::Ethereum));
        let cosmos = Arc::new(SimulatedLedger::new(LedgerId::Cosmos));
        eth.fund(USER_ETH, whole(Token::Eth, USER_FUNDS));
        eth.fund(RELAYER_ETH, whole(Token::Eth, RELAYER_FUNDS));
        cosmos.fund(USER_COSMOS, whole(Token::Atom, USER_FUNDS));
        cosmos.fund(RELAYER_COSMOS, whole(Token::Atom, RELAYER_FUNDS));

        let eth_session = Arc::new(WalletSession::connected(
            LedgerId::Ethereum,
            USER_ETH,
            eth_signer,
        ));
        let cosmos_session = Arc::new(WalletSession::connected(
            LedgerId::Cosmos,
            USER_COSMOS,
            cosmos_signer,
        ));

        let eth_adapter: Arc<dyn ChainAdapter> = Arc::new(MeteredAdapter::new(Arc::new(
            EthereumAdapter::new(
                Arc::new(SimulatedEvm::new(eth.clone(), config.ethereum.contract.clone())),
                eth_session.clone(),
                config.ethereum.clone(),
            ),
        )));
        let cosmos_adapter: Arc<dyn ChainAdapter> = Arc::new(MeteredAdapter::new(Arc::new(
            CosmosAdapter::new(
                Arc::new(SimulatedWasm::new(
                    cosmos.clone(),
                    config.cosmos.contract.clone(),
                    config.cosmos.denom.clone(),
                )),
                cosmos_session.clone(),
                config.cosmos.clone(),
            ),
        )));

        let swap_config = Arc::new(config.swap.clone());
        let observer = Arc::new(PollingRelayerObserver::new(
            vec![eth_adapter.clone(), cosmos_adapter.clone()],
            swap_config.observer.poll_interval(),
        ));

        let relayer = SimulatedRelayer::new(
            RelayerSide {
                ledger: eth.clone(),
                address: RELAYER_ETH.to_string(),
            },
            RelayerSide {
                ledger: cosmos.clone(),
                address: RELAYER_COSMOS.to_string(),
            },
            config.relayer,
            swap_config.timelock.safety_margin_secs,
        );
        relayer.register_beneficiary(LedgerId::Ethereum, USER_ETH, USER_COSMOS);
        relayer.register_beneficiary(LedgerId::Cosmos, USER_COSMOS, USER_ETH);

        let (shutdown_tx, _) = watch::channel(false);
        Self {
            eth,
            cosmos,
            relayer: Arc::new(relayer),
            eth_session,
            cosmos_session,
            forward: SwapContext::new(eth_adapter, cosmos_adapter, observer, swap_config),
            clock_step_secs: config.clock_step_secs,
            clock_tick: config.clock_tick(),
            relayer_tick: config.relayer_tick(),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Context for swaps in `direction`. Both directions share one history.
    pub fn context(&self, direction: Direction) -> SwapContext {
        match direction {
            Direction::EthToCosmos => self.forward.clone(),
            Direction::CosmosToEth => self.forward.reversed(),
        }
    }

    /// Audit list shared by every swap in this world.
    pub fn history(&self) -> &SwapHistory {
        &self.forward.history
    }

    /// Swap request in `direction` for the given decimal amounts.
    pub fn params(&self, direction: Direction, amount: &str, receive_amount: &str) -> SwapParams {
        SwapParams {
            from_token: direction.from_token(),
            to_token: direction.to_token(),
            amount: amount.to_string(),
            receive_amount: receive_amount.to_string(),
            recipient: direction.recipient().to_string(),
            timelock_hours: None,
        }
    }

    /// Spawn the relayer and the clock driver.
    pub fn start(&self) {
        let relayer = self
            .relayer
            .clone()
            .spawn(self.relayer_tick, self.shutdown_tx.subscribe());
        let clock = spawn_clock(
            vec![self.eth.clone(), self.cosmos.clone()],
            self.clock_step_secs,
            self.clock_tick,
            self.shutdown_tx.subscribe(),
        );
        self.tasks.lock().extend([relayer, clock]);
        info!(
            clock_step_secs = self.clock_step_secs,
            tick_ms = self.clock_tick.as_millis() as u64,
            "[nebula-runtime] simulated world started"
        );
    }

    /// Stop background tasks and wait for them.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }
        info!("[nebula-runtime] simulated world stopped");
    }
}

/// Advance every ledger by `step_secs` each `tick` until shutdown.
fn spawn_clock(
    ledgers: Vec<Arc<SimulatedLedger>>,
    step_secs: u64,
    tick: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    for ledger in &ledgers {
                        ledger.advance_time(step_secs);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("[nebula-runtime] clock stopped");
    })
}
