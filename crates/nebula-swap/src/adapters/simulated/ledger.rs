//! Simulated HTLC ledger.
//!
//! One in-memory HTLC contract with balances, a manual clock, block heights
//! and fault injection. Wire-format wrappers (`SimulatedEvm`,
//! `SimulatedWasm`) expose it to the real adapters.

use crate::domain::{
    invariant_secret_matches, short_hex, EscrowStatus, Hash, LedgerId, RevertReason, Secret,
    TransportError,
};
use parking_lot::RwLock;
use sha3::{Digest, Keccak256};
use std::collections::HashMap;
use tracing::debug;

/// Default genesis time for simulated ledgers.
pub const GENESIS_TIME: u64 = 1_700_000_000;

/// Stored escrow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EscrowRecord {
    /// Funding address.
    pub sender: String,
    /// Claim beneficiary.
    pub recipient: String,
    /// Locked base units.
    pub amount: u128,
    /// Refund timelock.
    pub timelock: u64,
    /// Current status.
    pub status: EscrowStatus,
    /// Preimage once claimed.
    pub secret: Option<Secret>,
}

/// Outcome of the next submission, consumed in FIFO order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitFault {
    /// Rejected by the node before execution.
    Reject,
    /// Executed, but the client sees a network error.
    LoseAck,
    /// Accepted into the mempool, never included.
    Drop,
}

#[derive(Debug, Default)]
struct LedgerState {
    time: u64,
    height: u64,
    nonce: u64,
    escrows: HashMap<Hash, EscrowRecord>,
    balances: HashMap<String, u128>,
    /// tx hash -> inclusion height (`None` for dropped transactions).
    txs: HashMap<String, Option<u64>>,
    submit_faults: Vec<SubmitFault>,
    read_faults: u32,
    submitted: u64,
}

/// In-memory HTLC contract.
#[derive(Debug)]
pub struct SimulatedLedger {
    ledger: LedgerId,
    state: RwLock<LedgerState>,
}

impl SimulatedLedger {
    /// Create at `GENESIS_TIME`.
    pub fn new(ledger: LedgerId) -> Self {
        Self {
            ledger,
            state: RwLock::new(LedgerState {
                time: GENESIS_TIME,
                height: 1,
                ..LedgerState::default()
            }),
        }
    }

    /// Ledger identity.
    pub fn ledger(&self) -> LedgerId {
        self.ledger
    }

    /// Set current block time.
    pub fn set_time(&self, time: u64) {
        self.state.write().time = time;
    }

    /// Advance block time.
    pub fn advance_time(&self, secs: u64) {
        self.state.write().time += secs;
    }

    /// Current block time.
    pub fn time(&self) -> u64 {
        self.state.read().time
    }

    /// Current height.
    pub fn height(&self) -> u64 {
        self.state.read().height
    }

    /// Credit `amount` to `address`.
    pub fn fund(&self, address: &str, amount: u128) {
        *self
            .state
            .write()
            .balances
            .entry(address.to_string())
            .or_default() += amount;
    }

    /// Balance of `address`.
    pub fn balance(&self, address: &str) -> u128 {
        self.state.read().balances.get(address).copied().unwrap_or(0)
    }

    /// Queue faults for the next client submissions.
    pub fn inject_submit_faults(&self, faults: impl IntoIterator<Item = SubmitFault>) {
        self.state.write().submit_faults.extend(faults);
    }

    /// Fail the next `count` client reads with a network error.
    pub fn inject_read_failures(&self, count: u32) {
        self.state.write().read_faults += count;
    }

    /// Client submissions that reached the node, including faulted ones.
    pub fn submitted_count(&self) -> u64 {
        self.state.read().submitted
    }

    /// Pop the next submission fault, counting the submission.
    pub fn take_submit_fault(&self) -> Option<SubmitFault> {
        let mut state = self.state.write();
        state.submitted += 1;
        if state.submit_faults.is_empty() {
            None
        } else {
            Some(state.submit_faults.remove(0))
        }
    }

    /// Consume one read fault, if any is pending.
    pub fn check_read(&self) -> Result<(), TransportError> {
        let mut state = self.state.write();
        if state.read_faults > 0 {
            state.read_faults -= 1;
            return Err(TransportError::Network("simulated read failure".into()));
        }
        Ok(())
    }

    /// Run a client submission through the fault queue.
    pub(crate) fn submit(
        &self,
        seed: &Hash,
        execute: impl FnOnce() -> Result<String, TransportError>,
    ) -> Result<String, TransportError> {
        match self.take_submit_fault() {
            None => execute(),
            Some(SubmitFault::Reject) => {
                Err(TransportError::Network("simulated connection reset".into()))
            }
            Some(SubmitFault::LoseAck) => {
                execute()?;
                Err(TransportError::Network("simulated receipt lost".into()))
            }
            Some(SubmitFault::Drop) => Ok(self.dropped_tx(seed)),
        }
    }

    /// Record a transaction that will never be included.
    pub fn dropped_tx(&self, seed: &Hash) -> String {
        let mut state = self.state.write();
        let hash = self.next_tx_hash(&mut state, seed);
        state.txs.insert(hash.clone(), None);
        hash
    }

    fn next_tx_hash(&self, state: &mut LedgerState, seed: &Hash) -> String {
        state.nonce += 1;
        let mut hasher = Keccak256::new();
        hasher.update(self.ledger.to_string().as_bytes());
        hasher.update(state.nonce.to_be_bytes());
        hasher.update(seed);
        let digest = hasher.finalize();
        match self.ledger {
            LedgerId::Ethereum => format!("0x{}", hex::encode(digest)),
            LedgerId::Cosmos => hex::encode_upper(digest),
        }
    }

    fn include(&self, state: &mut LedgerState, seed: &Hash) -> String {
        let hash = self.next_tx_hash(state, seed);
        let height = state.height;
        state.txs.insert(hash.clone(), Some(height));
        hash
    }

    /// Confirmations of `tx_hash`. Each poll mines one block.
    pub fn confirmations(&self, tx_hash: &str) -> Option<u64> {
        let mut state = self.state.write();
        state.height += 1;
        let included = (*state.txs.get(tx_hash)?)?;
        Some(state.height - included + 1)
    }

    /// Escrow by hashlock.
    pub fn escrow(&self, hashlock: &Hash) -> Option<EscrowRecord> {
        self.state.read().escrows.get(hashlock).cloned()
    }

    /// All escrows, for relayer discovery.
    pub fn escrows(&self) -> Vec<(Hash, EscrowRecord)> {
        self.state
            .read()
            .escrows
            .iter()
            .map(|(hashlock, record)| (*hashlock, record.clone()))
            .collect()
    }

    /// Preimage published by a claim.
    pub fn revealed_secret(&self, hashlock: &Hash) -> Option<Secret> {
        self.state.read().escrows.get(hashlock)?.secret
    }

    /// `createEscrow`.
    pub fn create_escrow(
        &self,
        sender: &str,
        hashlock: Hash,
        timelock: u64,
        recipient: &str,
        amount: u128,
    ) -> Result<String, TransportError> {
        let mut state = self.state.write();
        if amount == 0 {
            return Err(TransportError::Reverted(RevertReason::InvalidAmount));
        }
        if state.escrows.contains_key(&hashlock) {
            return Err(TransportError::Reverted(RevertReason::EscrowExists));
        }
        if timelock <= state.time {
            return Err(TransportError::Reverted(RevertReason::InvalidTimelock));
        }
        let available = state.balances.get(sender).copied().unwrap_or(0);
        if available < amount {
            return Err(TransportError::InsufficientFunds {
                required: amount,
                available,
            });
        }

        state.balances.insert(sender.to_string(), available - amount);
        state.escrows.insert(
            hashlock,
            EscrowRecord {
                sender: sender.to_string(),
                recipient: recipient.to_string(),
                amount,
                timelock,
                status: EscrowStatus::Open,
                secret: None,
            },
        );
        debug!(ledger = %self.ledger, hashlock = %short_hex(&hashlock), amount, "[nebula-sim] escrow created");
        Ok(self.include(&mut state, &hashlock))
    }

    /// `claimEscrow`. Anyone holding the secret may claim; funds go to the recipient.
    pub fn claim_escrow(&self, hashlock: Hash, secret: Secret) -> Result<String, TransportError> {
        let mut state = self.state.write();
        let now = state.time;
        let escrow = state
            .escrows
            .get_mut(&hashlock)
            .ok_or(TransportError::Reverted(RevertReason::EscrowNotFound))?;
        match escrow.status {
            EscrowStatus::Open => {}
            EscrowStatus::Claimed => return Err(TransportError::Reverted(RevertReason::AlreadyClaimed)),
            EscrowStatus::Refunded => {
                return Err(TransportError::Reverted(RevertReason::AlreadyRefunded))
            }
        }
        if !invariant_secret_matches(&secret, &hashlock) {
            return Err(TransportError::Reverted(RevertReason::HashMismatch));
        }
        if now > escrow.timelock {
            return Err(TransportError::Reverted(RevertReason::TimelockExpired));
        }

        escrow.status = EscrowStatus::Claimed;
        escrow.secret = Some(secret);
        let (recipient, amount) = (escrow.recipient.clone(), escrow.amount);
        *state.balances.entry(recipient).or_default() += amount;
        debug!(ledger = %self.ledger, hashlock = %short_hex(&hashlock), "[nebula-sim] escrow claimed");
        Ok(self.include(&mut state, &hashlock))
    }

    /// `refundEscrow`. Sender only, strictly after the timelock.
    pub fn refund_escrow(&self, caller: &str, hashlock: Hash) -> Result<String, TransportError> {
        let mut state = self.state.write();
        let now = state.time;
        let escrow = state
            .escrows
            .get_mut(&hashlock)
            .ok_or(TransportError::Reverted(RevertReason::EscrowNotFound))?;
        match escrow.status {
            EscrowStatus::Open => {}
            EscrowStatus::Claimed => return Err(TransportError::Reverted(RevertReason::AlreadyClaimed)),
            EscrowStatus::Refunded => {
                return Err(TransportError::Reverted(RevertReason::AlreadyRefunded))
            }
        }
        if now <= escrow.timelock {
            return Err(TransportError::Reverted(RevertReason::TimelockNotExpired {
                now,
                timelock: escrow.timelock,
            }));
        }
        if escrow.sender != caller {
            return Err(TransportError::Reverted(RevertReason::NotSender));
        }

        escrow.status = EscrowStatus::Refunded;
        let (sender, amount) = (escrow.sender.clone(), escrow.amount);
        *state.balances.entry(sender).or_default() += amount;
        debug!(ledger = %self.ledger, hashlock = %short_hex(&hashlock), "[nebula-sim] escrow refunded");
        Ok(self.include(&mut state, &hashlock))
    }
}
