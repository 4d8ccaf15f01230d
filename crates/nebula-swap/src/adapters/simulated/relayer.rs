//! Simulated counterparty relayer.
//!
//! Watches both ledgers directly. For every escrow locked to its address it
//! opens a mirrored escrow on the other ledger for the registered
//! beneficiary, and once the beneficiary claims it reuses the revealed
//! secret to unlock the escrow it mirrored.

use super::ledger::SimulatedLedger;
use crate::adapters::quote::convert_fixed_rate;
use crate::domain::{short_hex, Amount, EscrowStatus, Hash, LedgerId, SwapError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How the relayer behaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayerBehavior {
    /// Mirrors at the fixed rate and unlocks.
    Honest,
    /// Never mirrors.
    Absent,
    /// Mirrors 90% of the quoted amount.
    ShortChange,
    /// Mirrors but never unlocks the mirrored escrow.
    NeverUnlock,
}

impl std::str::FromStr for RelayerBehavior {
    type Err = SwapError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().replace('_', "-").as_str() {
            "honest" => Ok(Self::Honest),
            "absent" => Ok(Self::Absent),
            "short-change" => Ok(Self::ShortChange),
            "never-unlock" => Ok(Self::NeverUnlock),
            other => Err(SwapError::Config(format!("unknown relayer behavior '{other}'"))),
        }
    }
}

/// One ledger the relayer operates on.
#[derive(Clone)]
pub struct RelayerSide {
    /// Ledger state.
    pub ledger: Arc<SimulatedLedger>,
    /// Relayer account on that ledger.
    pub address: String,
}

struct Mirror {
    origin: LedgerId,
    unlocked: bool,
}

/// Counterparty relayer over two simulated ledgers.
pub struct SimulatedRelayer {
    sides: HashMap<LedgerId, RelayerSide>,
    behavior: Mutex<RelayerBehavior>,
    safety_margin_secs: u64,
    beneficiaries: Mutex<HashMap<(LedgerId, String), String>>,
    mirrors: Mutex<HashMap<Hash, Mirror>>,
}

impl SimulatedRelayer {
    /// Relay between `a` and `b`, keeping `safety_margin_secs` between timelocks.
    pub fn new(
        a: RelayerSide,
        b: RelayerSide,
        behavior: RelayerBehavior,
        safety_margin_secs: u64,
    ) -> Self {
        let sides = [a, b]
            .into_iter()
            .map(|side| (side.ledger.ledger(), side))
            .collect();
        Self {
            sides,
            behavior: Mutex::new(behavior),
            safety_margin_secs,
            beneficiaries: Mutex::new(HashMap::new()),
            mirrors: Mutex::new(HashMap::new()),
        }
    }

    /// Relayer account on `ledger`.
    pub fn address(&self, ledger: LedgerId) -> Option<&str> {
        self.sides.get(&ledger).map(|side| side.address.as_str())
    }

    /// Change behavior mid-run.
    pub fn set_behavior(&self, behavior: RelayerBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Route escrows funded by `sender` on `ledger` to `beneficiary` on the other ledger.
    pub fn register_beneficiary(
        &self,
        ledger: LedgerId,
        sender: impl Into<String>,
        beneficiary: impl Into<String>,
    ) {
        self.beneficiaries
            .lock()
            .insert((ledger, sender.into()), beneficiary.into());
    }

    fn other(&self, ledger: LedgerId) -> Option<&RelayerSide> {
        self.sides
            .iter()
            .find(|(id, _)| **id != ledger)
            .map(|(_, side)| side)
    }

    /// One relay pass: mirror new escrows, then unlock claimed mirrors.
    pub fn tick(&self) {
        let behavior = *self.behavior.lock();
        if behavior != RelayerBehavior::Absent {
            for side in self.sides.values() {
                self.mirror_new(side, behavior);
            }
        }
        if behavior != RelayerBehavior::NeverUnlock {
            self.unlock_claimed();
        }
    }

    fn mirror_new(&self, origin: &RelayerSide, behavior: RelayerBehavior) {
        let Some(target) = self.other(origin.ledger.ledger()) else {
            return;
        };
        let origin_id = origin.ledger.ledger();
        for (hashlock, escrow) in origin.ledger.escrows() {
            if escrow.status != EscrowStatus::Open
                || escrow.recipient != origin.address
                || self.mirrors.lock().contains_key(&hashlock)
            {
                continue;
            }
            let Some(beneficiary) = self
                .beneficiaries
                .lock()
                .get(&(origin_id, escrow.sender.clone()))
                .cloned()
            else {
                debug!(hashlock = %short_hex(&hashlock), "[nebula-relayer] no beneficiary registered");
                continue;
            };

            let remaining = escrow.timelock.saturating_sub(origin.ledger.time());
            if remaining <= self.safety_margin_secs {
                debug!(hashlock = %short_hex(&hashlock), "[nebula-relayer] escrow too close to expiry");
                continue;
            }
            let timelock = target.ledger.time() + (remaining - self.safety_margin_secs) / 2;

            let quoted = convert_fixed_rate(
                &Amount::from_base_units(origin_id.native_token(), escrow.amount),
                target.ledger.ledger().native_token(),
            );
            let amount = match behavior {
                RelayerBehavior::ShortChange => quoted.base_units - quoted.base_units / 10,
                _ => quoted.base_units,
            };

            match target
                .ledger
                .create_escrow(&target.address, hashlock, timelock, &beneficiary, amount)
            {
                Ok(tx) => {
                    info!(
                        hashlock = %short_hex(&hashlock),
                        ledger = %target.ledger.ledger(),
                        tx = %tx,
                        amount,
                        "[nebula-relayer] counterparty escrow opened"
                    );
                    self.mirrors.lock().insert(
                        hashlock,
                        Mirror {
                            origin: origin_id,
                            unlocked: false,
                        },
                    );
                }
                Err(err) => {
                    warn!(hashlock = %short_hex(&hashlock), error = %err, "[nebula-relayer] mirror failed")
                }
            }
        }
    }

    fn unlock_claimed(&self) {
        let pending: Vec<(Hash, LedgerId)> = self
            .mirrors
            .lock()
            .iter()
            .filter(|(_, mirror)| !mirror.unlocked)
            .map(|(hashlock, mirror)| (*hashlock, mirror.origin))
            .collect();

        for (hashlock, origin_id) in pending {
            let (Some(origin), Some(target)) = (self.sides.get(&origin_id), self.other(origin_id))
            else {
                continue;
            };
            let Some(secret) = target.ledger.revealed_secret(&hashlock) else {
                continue;
            };
            match origin.ledger.claim_escrow(hashlock, secret) {
                Ok(tx) => {
                    info!(
                        hashlock = %short_hex(&hashlock),
                        ledger = %origin_id,
                        tx = %tx,
                        "[nebula-relayer] mirrored escrow unlocked"
                    );
                    if let Some(mirror) = self.mirrors.lock().get_mut(&hashlock) {
                        mirror.unlocked = true;
                    }
                }
                Err(err) => {
                    warn!(hashlock = %short_hex(&hashlock), error = %err, "[nebula-relayer] unlock failed")
                }
            }
        }
    }

    /// Tick every `interval` until `shutdown` flips to true.
    pub fn spawn(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => self.tick(),
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("[nebula-relayer] stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::simulated::ledger::GENESIS_TIME;
    use sha3::{Digest, Keccak256};

    const HOUR: u64 = 3600;

    fn setup(behavior: RelayerBehavior) -> (Arc<SimulatedLedger>, Arc<SimulatedLedger>, SimulatedRelayer) {
        let eth = Arc::new(SimulatedLedger::new(LedgerId::Ethereum));
        let cosmos = Arc::new(SimulatedLedger::new(LedgerId::Cosmos));
        eth.fund("user-eth", 2_000_000_000_000_000_000);
        cosmos.fund("relayer-cosmos", 1_000_000_000);
        let relayer = SimulatedRelayer::new(
            RelayerSide {
                ledger: eth.clone(),
                address: "relayer-eth".into(),
            },
            RelayerSide {
                ledger: cosmos.clone(),
                address: "relayer-cosmos".into(),
            },
            behavior,
            2 * HOUR,
        );
        relayer.register_beneficiary(LedgerId::Ethereum, "user-eth", "user-cosmos");
        (eth, cosmos, relayer)
    }

    fn lock(eth: &SimulatedLedger) -> ([u8; 32], Hash) {
        let secret = [3u8; 32];
        let hashlock: Hash = Keccak256::digest(secret).into();
        eth.create_escrow(
            "user-eth",
            hashlock,
            GENESIS_TIME + 24 * HOUR,
            "relayer-eth",
            1_000_000_000_000_000_000,
        )
        .unwrap();
        (secret, hashlock)
    }

    #[test]
    fn test_honest_relayer_mirrors_and_unlocks() {
        let (eth, cosmos, relayer) = setup(RelayerBehavior::Honest);
        let (secret, hashlock) = lock(&eth);

        relayer.tick();
        let mirror = cosmos.escrow(&hashlock).unwrap();
        assert_eq!(mirror.recipient, "user-cosmos");
        assert_eq!(mirror.amount, 10_000_000);
        assert_eq!(mirror.timelock, GENESIS_TIME + 11 * HOUR);

        cosmos.claim_escrow(hashlock, secret).unwrap();
        relayer.tick();
        assert_eq!(eth.escrow(&hashlock).unwrap().status, EscrowStatus::Claimed);
        assert_eq!(eth.balance("relayer-eth"), 1_000_000_000_000_000_000);
    }

    #[test]
    fn test_absent_relayer_does_nothing() {
        let (eth, cosmos, relayer) = setup(RelayerBehavior::Absent);
        let (_, hashlock) = lock(&eth);
        relayer.tick();
        assert!(cosmos.escrow(&hashlock).is_none());
    }

    #[test]
    fn test_short_change_underfunds() {
        let (eth, cosmos, relayer) = setup(RelayerBehavior::ShortChange);
        let (_, hashlock) = lock(&eth);
        relayer.tick();
        assert_eq!(cosmos.escrow(&hashlock).unwrap().amount, 9_000_000);
    }

    #[test]
    fn test_behavior_from_str() {
        assert_eq!("honest".parse::<RelayerBehavior>(), Ok(RelayerBehavior::Honest));
        assert_eq!("short_change".parse::<RelayerBehavior>(), Ok(RelayerBehavior::ShortChange));
        assert_eq!("Never-Unlock".parse::<RelayerBehavior>(), Ok(RelayerBehavior::NeverUnlock));
        assert!(matches!("greedy".parse::<RelayerBehavior>(), Err(SwapError::Config(_))));
    }

    #[test]
    fn test_unregistered_sender_is_ignored() {
        let (eth, cosmos, relayer) = setup(RelayerBehavior::Honest);
        eth.fund("stranger", 10);
        let hashlock = [7u8; 32];
        eth.create_escrow("stranger", hashlock, GENESIS_TIME + 24 * HOUR, "relayer-eth", 10)
            .unwrap();
        relayer.tick();
        assert!(cosmos.escrow(&hashlock).is_none());
    }
}
