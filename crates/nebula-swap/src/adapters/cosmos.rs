//! Cosmos Chain Adapter
//!
//! Implements `ChainAdapter` over a `WasmRpc` transport using the CosmWasm
//! HTLC contract's JSON messages.

use super::confirm::await_confirmations;
use super::wallet::WalletSession;
use crate::config::CosmosConfig;
use crate::domain::{
    short_hex, EscrowStatus, EscrowView, Hash, LedgerId, SecureSecret, SwapError, TransportError,
    TxKind, TxRef,
};
use crate::ports::outbound::{ChainAdapter, Coin, SigningRequest, WasmRpc};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const BECH32_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Contract execute messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteMsg {
    /// Lock the attached funds.
    CreateEscrow {
        /// Hex hashlock.
        hashlock: String,
        /// Absolute refund time.
        timelock: u64,
        /// Claim beneficiary.
        recipient: String,
    },
    /// Claim with the hex preimage.
    ClaimEscrow {
        /// Hex hashlock.
        hashlock: String,
        /// Hex secret.
        secret: String,
    },
    /// Refund after the timelock.
    RefundEscrow {
        /// Hex hashlock.
        hashlock: String,
    },
}

/// Contract query messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMsg {
    /// `{"escrow_exists":{"hashlock":..}}`
    EscrowExists {
        /// Hex hashlock.
        hashlock: String,
    },
    /// `{"get_escrow":{"hashlock":..}}`
    GetEscrow {
        /// Hex hashlock.
        hashlock: String,
    },
}

/// `escrow_exists` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistsResponse {
    /// Whether an escrow is stored under the hashlock.
    pub exists: bool,
}

/// `get_escrow` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowResponse {
    /// Funding address.
    pub sender: String,
    /// Claim beneficiary.
    pub recipient: String,
    /// Locked amount (Uint128 as string).
    pub amount: String,
    /// Refund timelock.
    pub timelock: u64,
    /// Claimed flag.
    pub claimed: bool,
    /// Refunded flag.
    pub refunded: bool,
    /// Hex preimage once claimed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Check `prefix` + `1` + 38 or 58 bech32 data characters.
pub fn is_bech32_address(address: &str, prefix: &str) -> bool {
    let Some(data) = address
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('1'))
    else {
        return false;
    };
    matches!(data.len(), 38 | 58) && data.chars().all(|c| BECH32_CHARSET.contains(c))
}

fn transport(hashlock: Hash) -> impl Fn(TransportError) -> SwapError {
    move |err| SwapError::from_transport(err, hashlock)
}

fn to_msg<T: Serialize>(msg: &T) -> Result<serde_json::Value, SwapError> {
    serde_json::to_value(msg).map_err(|err| SwapError::Contract(format!("encode message: {err}")))
}

fn from_msg<T: for<'de> Deserialize<'de>>(
    value: serde_json::Value,
    hashlock: Hash,
) -> Result<T, SwapError> {
    serde_json::from_value(value).map_err(|err| {
        SwapError::from_transport(TransportError::Malformed(err.to_string()), hashlock)
    })
}

/// Cosmos HTLC adapter.
pub struct CosmosAdapter {
    rpc: Arc<dyn WasmRpc>,
    session: Arc<WalletSession>,
    config: CosmosConfig,
}

impl CosmosAdapter {
    /// Create an adapter for the contract in `config`.
    pub fn new(rpc: Arc<dyn WasmRpc>, session: Arc<WalletSession>, config: CosmosConfig) -> Self {
        Self {
            rpc,
            session,
            config,
        }
    }

    /// Wallet session used for writes.
    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    async fn raw_escrow(&self, hashlock: Hash) -> Result<Option<EscrowResponse>, SwapError> {
        let key = hex::encode(hashlock);
        let exists: ExistsResponse = from_msg(
            self.rpc
                .query_smart(
                    &self.config.contract,
                    to_msg(&QueryMsg::EscrowExists { hashlock: key.clone() })?,
                )
                .await
                .map_err(transport(hashlock))?,
            hashlock,
        )?;
        if !exists.exists {
            return Ok(None);
        }
        let escrow: EscrowResponse = from_msg(
            self.rpc
                .query_smart(
                    &self.config.contract,
                    to_msg(&QueryMsg::GetEscrow { hashlock: key })?,
                )
                .await
                .map_err(transport(hashlock))?,
            hashlock,
        )?;
        Ok(Some(escrow))
    }

    async fn existing(&self, hashlock: Hash) -> Result<EscrowView, SwapError> {
        self.query_escrow(hashlock)
            .await?
            .ok_or(SwapError::EscrowNotFound(hashlock))
    }

    async fn submit(
        &self,
        kind: TxKind,
        hashlock: Hash,
        msg: ExecuteMsg,
        funds: Vec<Coin>,
        summary: String,
    ) -> Result<TxRef, SwapError> {
        let sender = self.session.require_connected()?;
        let value: u128 = funds
            .iter()
            .filter_map(|coin| coin.amount.parse::<u128>().ok())
            .sum();
        self.session
            .approve(&SigningRequest {
                ledger: LedgerId::Cosmos,
                kind,
                hashlock,
                value,
                summary,
            })
            .await?;

        let tx_hash = self
            .rpc
            .execute(&sender, &self.config.contract, to_msg(&msg)?, funds)
            .await
            .map_err(transport(hashlock))?;
        info!(
            hashlock = %short_hex(&hashlock),
            tx = %tx_hash,
            "[nebula-swap] cosmos {kind:?} broadcast"
        );

        let rpc = self.rpc.clone();
        let poll_hash = tx_hash.clone();
        await_confirmations(
            LedgerId::Cosmos,
            tx_hash,
            hashlock,
            &self.config.confirmations,
            move || {
                let rpc = rpc.clone();
                let hash = poll_hash.clone();
                async move { rpc.confirmations(&hash).await }
            },
        )
        .await
    }
}

#[async_trait]
impl ChainAdapter for CosmosAdapter {
    fn ledger(&self) -> LedgerId {
        LedgerId::Cosmos
    }

    fn address(&self) -> Option<String> {
        self.session.address()
    }

    fn validate_address(&self, address: &str) -> Result<(), SwapError> {
        if is_bech32_address(address, &self.config.address_prefix) {
            Ok(())
        } else {
            Err(SwapError::InvalidSwapParams(format!(
                "'{address}' is not a {} address",
                self.config.address_prefix
            )))
        }
    }

    async fn create_escrow(
        &self,
        hashlock: Hash,
        timelock: u64,
        recipient: &str,
        amount: u128,
    ) -> Result<TxRef, SwapError> {
        self.validate_address(recipient)?;
        if amount == 0 {
            return Err(SwapError::InvalidSwapParams("escrow amount is zero".into()));
        }
        let msg = ExecuteMsg::CreateEscrow {
            hashlock: hex::encode(hashlock),
            timelock,
            recipient: recipient.to_string(),
        };
        let funds = vec![Coin {
            denom: self.config.denom.clone(),
            amount: amount.to_string(),
        }];
        self.submit(
            TxKind::Lock,
            hashlock,
            msg,
            funds,
            format!("Lock {amount}{} for {recipient} until {timelock}", self.config.denom),
        )
        .await
    }

    async fn claim_escrow(
        &self,
        hashlock: Hash,
        secret: &SecureSecret,
    ) -> Result<TxRef, SwapError> {
        if !secret.matches(&hashlock) {
            warn!(hashlock = %short_hex(&hashlock), "[nebula-swap] claim rejected: secret does not match");
            return Err(SwapError::HashMismatch);
        }
        self.session.require_connected()?;
        match self.existing(hashlock).await?.status {
            EscrowStatus::Open => {}
            EscrowStatus::Claimed => return Err(SwapError::AlreadyClaimed),
            EscrowStatus::Refunded => return Err(SwapError::AlreadyRefunded),
        }
        let msg = ExecuteMsg::ClaimEscrow {
            hashlock: hex::encode(hashlock),
            secret: hex::encode(secret.as_bytes()),
        };
        self.submit(
            TxKind::Claim,
            hashlock,
            msg,
            vec![],
            format!("Claim escrow {}", short_hex(&hashlock)),
        )
        .await
    }

    async fn refund_escrow(&self, hashlock: Hash) -> Result<TxRef, SwapError> {
        self.session.require_connected()?;
        let escrow = self.existing(hashlock).await?;
        match escrow.status {
            EscrowStatus::Open => {}
            EscrowStatus::Claimed => return Err(SwapError::AlreadyClaimed),
            EscrowStatus::Refunded => return Err(SwapError::AlreadyRefunded),
        }
        let now = self.chain_time().await?;
        if now <= escrow.timelock {
            return Err(SwapError::TimelockNotExpired {
                now,
                timelock: escrow.timelock,
            });
        }
        let msg = ExecuteMsg::RefundEscrow {
            hashlock: hex::encode(hashlock),
        };
        self.submit(
            TxKind::Refund,
            hashlock,
            msg,
            vec![],
            format!("Refund escrow {}", short_hex(&hashlock)),
        )
        .await
    }

    async fn query_escrow(&self, hashlock: Hash) -> Result<Option<EscrowView>, SwapError> {
        let Some(raw) = self.raw_escrow(hashlock).await? else {
            return Ok(None);
        };
        let amount = raw.amount.parse::<u128>().map_err(|_| {
            SwapError::from_transport(
                TransportError::Malformed(format!("amount '{}'", raw.amount)),
                hashlock,
            )
        })?;
        debug!(hashlock = %short_hex(&hashlock), "[nebula-swap] cosmos escrow read");
        Ok(Some(EscrowView {
            ledger: LedgerId::Cosmos,
            hashlock,
            sender: raw.sender,
            recipient: raw.recipient,
            amount,
            timelock: raw.timelock,
            status: EscrowStatus::from_flags(raw.claimed, raw.refunded),
        }))
    }

    async fn chain_time(&self) -> Result<u64, SwapError> {
        self.rpc
            .block_time()
            .await
            .map_err(|err| SwapError::from_transport(err, [0u8; 32]))
    }

    async fn revealed_secret(&self, hashlock: Hash) -> Result<Option<SecureSecret>, SwapError> {
        let Some(raw) = self.raw_escrow(hashlock).await? else {
            return Ok(None);
        };
        let Some(secret_hex) = raw.secret else {
            return Ok(None);
        };
        let bytes = hex::decode(&secret_hex).map_err(|_| {
            SwapError::from_transport(
                TransportError::Malformed(format!("secret '{secret_hex}' is not hex")),
                hashlock,
            )
        })?;
        Ok(SecureSecret::from_slice(&bytes).filter(|secret| secret.matches(&hashlock)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bech32_shape() {
        let valid = format!("cosmos1{}", "q".repeat(38));
        assert!(is_bech32_address(&valid, "cosmos"));
        assert!(is_bech32_address(&format!("cosmos1{}", "p".repeat(58)), "cosmos"));
        assert!(!is_bech32_address(&valid, "osmo"));
        assert!(!is_bech32_address(&format!("cosmos1{}", "b".repeat(38)), "cosmos"));
        assert!(!is_bech32_address(&format!("cosmos1{}", "q".repeat(39)), "cosmos"));
        assert!(!is_bech32_address("0x5fbdb2315678afecb367f032d93f642f64180aa3", "cosmos"));
    }

    #[test]
    fn test_execute_msg_wire_format() {
        let msg = ExecuteMsg::CreateEscrow {
            hashlock: "ab".repeat(32),
            timelock: 1_700_000_000,
            recipient: "cosmos1xyz".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["create_escrow"]["timelock"], 1_700_000_000u64);
        assert_eq!(json["create_escrow"]["recipient"], "cosmos1xyz");

        let query = serde_json::to_value(QueryMsg::EscrowExists { hashlock: "00".into() }).unwrap();
        assert_eq!(query, serde_json::json!({"escrow_exists": {"hashlock": "00"}}));
    }

    #[test]
    fn test_escrow_response_secret_is_optional() {
        let raw = serde_json::json!({
            "sender": "cosmos1a", "recipient": "cosmos1b", "amount": "15000000",
            "timelock": 10, "claimed": false, "refunded": false
        });
        let parsed: EscrowResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.secret, None);
        assert_eq!(parsed.amount, "15000000");
    }

    mod live {
        use super::*;
        use crate::adapters::simulated::{SimulatedLedger, SimulatedWasm, GENESIS_TIME};
        use crate::adapters::wallet::AutoApprove;

        fn user() -> String {
            format!("cosmos1{}", "q".repeat(38))
        }

        fn relayer() -> String {
            format!("cosmos1{}", "p".repeat(38))
        }

        fn adapter() -> (Arc<SimulatedLedger>, CosmosAdapter) {
            let ledger = Arc::new(SimulatedLedger::new(LedgerId::Cosmos));
            ledger.fund(&user(), 50_000_000);
            let config = CosmosConfig::for_testing();
            let rpc = Arc::new(SimulatedWasm::new(
                ledger.clone(),
                config.contract.clone(),
                config.denom.clone(),
            ));
            let session = Arc::new(WalletSession::connected(
                LedgerId::Cosmos,
                user(),
                Arc::new(AutoApprove),
            ));
            (ledger, CosmosAdapter::new(rpc, session, config))
        }

        #[tokio::test]
        async fn test_lock_and_claim_reveal_secret() {
            let (ledger, cosmos) = adapter();
            let secret = SecureSecret::new([4u8; 32]);
            let hashlock = secret.hashlock();

            let tx = cosmos
                .create_escrow(hashlock, GENESIS_TIME + 60, &relayer(), 15_000_000)
                .await
                .unwrap();
            assert_eq!(tx.hash, tx.hash.to_uppercase());
            assert_eq!(ledger.balance(&user()), 35_000_000);

            let view = cosmos.query_escrow(hashlock).await.unwrap().unwrap();
            assert_eq!(view.amount, 15_000_000);
            assert_eq!(view.recipient, relayer());

            cosmos.claim_escrow(hashlock, &secret).await.unwrap();
            let revealed = cosmos.revealed_secret(hashlock).await.unwrap().unwrap();
            assert!(revealed.matches(&hashlock));
            assert_eq!(ledger.balance(&relayer()), 15_000_000);
        }

        #[tokio::test]
        async fn test_rejects_foreign_recipient() {
            let (ledger, cosmos) = adapter();
            let hashlock = SecureSecret::new([4u8; 32]).hashlock();
            assert!(matches!(
                cosmos
                    .create_escrow(hashlock, GENESIS_TIME + 60, "0x5fbdb2315678afecb367f032d93f642f64180aa3", 1)
                    .await,
                Err(SwapError::InvalidSwapParams(_))
            ));
            assert_eq!(ledger.submitted_count(), 0);
        }

        #[tokio::test]
        async fn test_transient_read_failure_surfaces() {
            let (ledger, cosmos) = adapter();
            ledger.inject_read_failures(1);
            assert!(matches!(
                cosmos.chain_time().await,
                Err(SwapError::NetworkError(_))
            ));
            assert_eq!(cosmos.chain_time().await, Ok(GENESIS_TIME));
        }
    }
}
