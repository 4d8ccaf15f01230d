//! `WasmRpc` over a simulated ledger, speaking the escrow contract's JSON messages.

use super::ledger::SimulatedLedger;
use crate::adapters::cosmos::{EscrowResponse, ExecuteMsg, ExistsResponse, QueryMsg};
use crate::domain::{EscrowStatus, Hash, RevertReason, TransportError};
use crate::ports::outbound::{Coin, WasmRpc};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Simulated Cosmos node hosting one escrow contract.
pub struct SimulatedWasm {
    ledger: Arc<SimulatedLedger>,
    contract: String,
    denom: String,
}

impl SimulatedWasm {
    /// Serve `ledger` at `contract`, accepting funds in `denom`.
    pub fn new(
        ledger: Arc<SimulatedLedger>,
        contract: impl Into<String>,
        denom: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            contract: contract.into(),
            denom: denom.into(),
        }
    }

    fn check_contract(&self, contract: &str) -> Result<(), TransportError> {
        if contract == self.contract {
            Ok(())
        } else {
            Err(TransportError::Reverted(RevertReason::Other(format!(
                "no contract at {contract}"
            ))))
        }
    }

    fn attached(&self, funds: &[Coin]) -> Result<u128, TransportError> {
        match funds {
            [coin] if coin.denom == self.denom => coin
                .amount
                .parse()
                .map_err(|_| TransportError::Malformed(format!("coin amount {}", coin.amount))),
            _ => Err(TransportError::Reverted(RevertReason::InvalidAmount)),
        }
    }
}

fn parse_word(value: &str) -> Result<Hash, TransportError> {
    let bytes = hex::decode(value).map_err(|err| TransportError::Malformed(err.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| TransportError::Malformed(format!("expected 32 bytes, got {value}")))
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, TransportError> {
    serde_json::to_value(value).map_err(|err| TransportError::Malformed(err.to_string()))
}

#[async_trait]
impl WasmRpc for SimulatedWasm {
    async fn execute(
        &self,
        sender: &str,
        contract: &str,
        msg: serde_json::Value,
        funds: Vec<Coin>,
    ) -> Result<String, TransportError> {
        self.check_contract(contract)?;
        let msg: ExecuteMsg =
            serde_json::from_value(msg).map_err(|err| TransportError::Malformed(err.to_string()))?;
        match msg {
            ExecuteMsg::CreateEscrow {
                hashlock,
                timelock,
                recipient,
            } => {
                let hashlock = parse_word(&hashlock)?;
                let amount = self.attached(&funds)?;
                self.ledger.submit(&hashlock, || {
                    self.ledger
                        .create_escrow(sender, hashlock, timelock, &recipient, amount)
                })
            }
            ExecuteMsg::ClaimEscrow { hashlock, secret } => {
                let hashlock = parse_word(&hashlock)?;
                let secret = parse_word(&secret)?;
                self.ledger
                    .submit(&hashlock, || self.ledger.claim_escrow(hashlock, secret))
            }
            ExecuteMsg::RefundEscrow { hashlock } => {
                let hashlock = parse_word(&hashlock)?;
                self.ledger
                    .submit(&hashlock, || self.ledger.refund_escrow(sender, hashlock))
            }
        }
    }

    async fn query_smart(
        &self,
        contract: &str,
        msg: serde_json::Value,
    ) -> Result<serde_json::Value, TransportError> {
        self.check_contract(contract)?;
        self.ledger.check_read()?;
        let msg: QueryMsg =
            serde_json::from_value(msg).map_err(|err| TransportError::Malformed(err.to_string()))?;
        match msg {
            QueryMsg::EscrowExists { hashlock } => {
                let hashlock = parse_word(&hashlock)?;
                to_json(&ExistsResponse {
                    exists: self.ledger.escrow(&hashlock).is_some(),
                })
            }
            QueryMsg::GetEscrow { hashlock } => {
                let key = parse_word(&hashlock)?;
                let record = self
                    .ledger
                    .escrow(&key)
                    .ok_or(TransportError::Reverted(RevertReason::EscrowNotFound))?;
                to_json(&EscrowResponse {
                    sender: record.sender,
                    recipient: record.recipient,
                    amount: record.amount.to_string(),
                    timelock: record.timelock,
                    claimed: record.status == EscrowStatus::Claimed,
                    refunded: record.status == EscrowStatus::Refunded,
                    secret: record.secret.map(hex::encode),
                })
            }
        }
    }

    async fn confirmations(&self, tx_hash: &str) -> Result<Option<u64>, TransportError> {
        self.ledger.check_read()?;
        Ok(self.ledger.confirmations(tx_hash))
    }

    async fn block_time(&self) -> Result<u64, TransportError> {
        self.ledger.check_read()?;
        Ok(self.ledger.time())
    }
}
