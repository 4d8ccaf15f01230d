//! `EvmRpc` over a simulated ledger, speaking the escrow contract's ABI.

use super::ledger::SimulatedLedger;
use crate::adapters::abi::{self, EscrowCall, EscrowTuple};
use crate::domain::{EscrowStatus, Hash, RevertReason, TransportError};
use crate::ports::outbound::{EvmLog, EvmRpc, EvmTransaction};
use async_trait::async_trait;
use std::sync::Arc;

/// Simulated Ethereum node hosting one escrow contract.
pub struct SimulatedEvm {
    ledger: Arc<SimulatedLedger>,
    contract: String,
}

impl SimulatedEvm {
    /// Serve `ledger` at `contract`.
    pub fn new(ledger: Arc<SimulatedLedger>, contract: impl Into<String>) -> Self {
        Self {
            ledger,
            contract: contract.into().to_lowercase(),
        }
    }

    fn check_contract(&self, to: &str) -> Result<(), TransportError> {
        if to.to_lowercase() == self.contract {
            Ok(())
        } else {
            Err(TransportError::Reverted(RevertReason::Other(format!(
                "no contract at {to}"
            ))))
        }
    }
}

fn call_hashlock(call: &EscrowCall) -> Hash {
    match call {
        EscrowCall::Create { hashlock, .. }
        | EscrowCall::Claim { hashlock, .. }
        | EscrowCall::Refund { hashlock }
        | EscrowCall::Exists { hashlock }
        | EscrowCall::Get { hashlock } => *hashlock,
    }
}

fn tuple_address(address: &str) -> Result<[u8; 20], TransportError> {
    abi::parse_address(address)
        .ok_or_else(|| TransportError::Malformed(format!("stored address {address}")))
}

#[async_trait]
impl EvmRpc for SimulatedEvm {
    async fn send_transaction(&self, tx: EvmTransaction) -> Result<String, TransportError> {
        self.check_contract(&tx.to)?;
        let call = abi::decode_call(&tx.data)?;
        let hashlock = call_hashlock(&call);
        let from = tx.from.to_lowercase();
        self.ledger.submit(&hashlock, || match call {
            EscrowCall::Create {
                hashlock,
                timelock,
                recipient,
            } => self.ledger.create_escrow(
                &from,
                hashlock,
                timelock,
                &abi::format_address(&recipient),
                tx.value,
            ),
            EscrowCall::Claim { hashlock, secret } => self.ledger.claim_escrow(hashlock, secret),
            EscrowCall::Refund { hashlock } => self.ledger.refund_escrow(&from, hashlock),
            EscrowCall::Exists { .. } | EscrowCall::Get { .. } => Err(TransportError::Malformed(
                "view function sent as transaction".into(),
            )),
        })
    }

    async fn call(&self, to: &str, data: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        self.check_contract(to)?;
        self.ledger.check_read()?;
        match abi::decode_call(&data)? {
            EscrowCall::Exists { hashlock } => {
                Ok(abi::encode_bool(self.ledger.escrow(&hashlock).is_some()))
            }
            EscrowCall::Get { hashlock } => {
                let tuple = match self.ledger.escrow(&hashlock) {
                    Some(record) => EscrowTuple {
                        sender: tuple_address(&record.sender)?,
                        recipient: tuple_address(&record.recipient)?,
                        amount: record.amount,
                        timelock: record.timelock,
                        claimed: record.status == EscrowStatus::Claimed,
                        refunded: record.status == EscrowStatus::Refunded,
                    },
                    None => EscrowTuple::default(),
                };
                Ok(abi::encode_escrow_tuple(&tuple))
            }
            _ => Err(TransportError::Malformed(
                "state-changing function sent as call".into(),
            )),
        }
    }

    async fn confirmations(&self, tx_hash: &str) -> Result<Option<u64>, TransportError> {
        self.ledger.check_read()?;
        Ok(self.ledger.confirmations(tx_hash))
    }

    async fn block_timestamp(&self) -> Result<u64, TransportError> {
        self.ledger.check_read()?;
        Ok(self.ledger.time())
    }

    async fn logs(&self, address: &str, topics: Vec<Hash>) -> Result<Vec<EvmLog>, TransportError> {
        self.check_contract(address)?;
        self.ledger.check_read()?;
        let (Some(topic), Some(hashlock)) = (topics.first(), topics.get(1)) else {
            return Ok(Vec::new());
        };
        if *topic != abi::escrow_claimed_topic() {
            return Ok(Vec::new());
        }
        Ok(self
            .ledger
            .revealed_secret(hashlock)
            .map(|secret| EvmLog {
                topics: vec![*topic, *hashlock],
                data: secret.to_vec(),
            })
            .into_iter()
            .collect())
    }
}
