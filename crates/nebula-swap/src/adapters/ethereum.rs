//! Ethereum Chain Adapter
//!
//! Implements `ChainAdapter` over an `EvmRpc` transport using the HTLC
//! contract's Solidity ABI.

use super::abi;
use super::confirm::await_confirmations;
use super::wallet::WalletSession;
use crate::config::EthereumConfig;
use crate::domain::{
    short_hex, EscrowStatus, EscrowView, Hash, LedgerId, SecureSecret, SwapError, TransportError,
    TxKind, TxRef,
};
use crate::ports::outbound::{ChainAdapter, EvmRpc, EvmTransaction, SigningRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

fn transport(hashlock: Hash) -> impl Fn(TransportError) -> SwapError {
    move |err| SwapError::from_transport(err, hashlock)
}

/// Ethereum HTLC adapter.
pub struct EthereumAdapter {
    rpc: Arc<dyn EvmRpc>,
    session: Arc<WalletSession>,
    config: EthereumConfig,
}

impl EthereumAdapter {
    /// Create an adapter for the contract in `config`.
    pub fn new(rpc: Arc<dyn EvmRpc>, session: Arc<WalletSession>, config: EthereumConfig) -> Self {
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

    async fn escrow_exists(&self, hashlock: Hash) -> Result<bool, SwapError> {
        let raw = self
            .rpc
            .call(&self.config.contract, abi::encode_escrow_exists(&hashlock))
            .await
            .map_err(transport(hashlock))?;
        abi::decode_bool(&raw).map_err(transport(hashlock))
    }

    /// Existing escrow or `EscrowNotFound`.
    async fn existing(&self, hashlock: Hash) -> Result<EscrowView, SwapError> {
        self.query_escrow(hashlock)
            .await?
            .ok_or(SwapError::EscrowNotFound(hashlock))
    }

    async fn submit(
        &self,
        kind: TxKind,
        hashlock: Hash,
        value: u128,
        data: Vec<u8>,
        summary: String,
    ) -> Result<TxRef, SwapError> {
        let from = self.session.require_connected()?;
        self.session
            .approve(&SigningRequest {
                ledger: LedgerId::Ethereum,
                kind,
                hashlock,
                value,
                summary,
            })
            .await?;

        let tx_hash = self
            .rpc
            .send_transaction(EvmTransaction {
                from,
                to: self.config.contract.clone(),
                value,
                data,
            })
            .await
            .map_err(transport(hashlock))?;
        info!(
            hashlock = %short_hex(&hashlock),
            tx = %tx_hash,
            "[nebula-swap] ethereum {kind:?} broadcast"
        );

        let rpc = self.rpc.clone();
        let poll_hash = tx_hash.clone();
        await_confirmations(
            LedgerId::Ethereum,
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
impl ChainAdapter for EthereumAdapter {
    fn ledger(&self) -> LedgerId {
        LedgerId::Ethereum
    }

    fn address(&self) -> Option<String> {
        self.session.address()
    }

    fn validate_address(&self, address: &str) -> Result<(), SwapError> {
        abi::parse_address(address).map(|_| ()).ok_or_else(|| {
            SwapError::InvalidSwapParams(format!("'{address}' is not an Ethereum address"))
        })
    }

    async fn create_escrow(
        &self,
        hashlock: Hash,
        timelock: u64,
        recipient: &str,
        amount: u128,
    ) -> Result<TxRef, SwapError> {
        let recipient_bytes = abi::parse_address(recipient).ok_or_else(|| {
            SwapError::InvalidSwapParams(format!("'{recipient}' is not an Ethereum address"))
        })?;
        if amount == 0 {
            return Err(SwapError::InvalidSwapParams("escrow amount is zero".into()));
        }
        let data = abi::encode_create_escrow(&hashlock, timelock, &recipient_bytes);
        self.submit(
            TxKind::Lock,
            hashlock,
            amount,
            data,
            format!("Lock {amount} wei for {recipient} until {timelock}"),
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
        let data = abi::encode_claim_escrow(&hashlock, secret.as_bytes());
        self.submit(
            TxKind::Claim,
            hashlock,
            0,
            data,
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
        self.submit(
            TxKind::Refund,
            hashlock,
            0,
            abi::encode_refund_escrow(&hashlock),
            format!("Refund escrow {}", short_hex(&hashlock)),
        )
        .await
    }

    async fn query_escrow(&self, hashlock: Hash) -> Result<Option<EscrowView>, SwapError> {
        if !self.escrow_exists(hashlock).await? {
            return Ok(None);
        }
        let raw = self
            .rpc
            .call(&self.config.contract, abi::encode_get_escrow(&hashlock))
            .await
            .map_err(transport(hashlock))?;
        let tuple = abi::decode_escrow_tuple(&raw).map_err(transport(hashlock))?;
        debug!(hashlock = %short_hex(&hashlock), "[nebula-swap] ethereum escrow read");
        Ok(Some(EscrowView {
            ledger: LedgerId::Ethereum,
            hashlock,
            sender: abi::format_address(&tuple.sender),
            recipient: abi::format_address(&tuple.recipient),
            amount: tuple.amount,
            timelock: tuple.timelock,
            status: EscrowStatus::from_flags(tuple.claimed, tuple.refunded),
        }))
    }

    async fn chain_time(&self) -> Result<u64, SwapError> {
        self.rpc
            .block_timestamp()
            .await
            .map_err(|err| SwapError::from_transport(err, [0u8; 32]))
    }

    async fn revealed_secret(&self, hashlock: Hash) -> Result<Option<SecureSecret>, SwapError> {
        let logs = self
            .rpc
            .logs(
                &self.config.contract,
                vec![abi::escrow_claimed_topic(), hashlock],
            )
            .await
            .map_err(transport(hashlock))?;
        for log in logs {
            let bytes = abi::decode_bytes32(&log.data).map_err(transport(hashlock))?;
            let secret = SecureSecret::new(bytes);
            if secret.matches(&hashlock) {
                return Ok(Some(secret));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::simulated::{SimulatedEvm, SimulatedLedger, SubmitFault, GENESIS_TIME};
    use crate::adapters::wallet::{AutoApprove, ScriptedSigner};
    use crate::ports::outbound::Signer;

    const USER: &str = "0x1111111111111111111111111111111111111111";
    const RELAYER: &str = "0x2222222222222222222222222222222222222222";

    fn adapter(signer: Arc<dyn Signer>) -> (Arc<SimulatedLedger>, EthereumAdapter) {
        let ledger = Arc::new(SimulatedLedger::new(LedgerId::Ethereum));
        ledger.fund(USER, 5_000);
        let config = EthereumConfig::for_testing();
        let rpc = Arc::new(SimulatedEvm::new(ledger.clone(), config.contract.clone()));
        let session = Arc::new(WalletSession::connected(LedgerId::Ethereum, USER, signer));
        (ledger, EthereumAdapter::new(rpc, session, config))
    }

    fn secret() -> SecureSecret {
        SecureSecret::new([5u8; 32])
    }

    #[tokio::test]
    async fn test_lock_query_claim_roundtrip() {
        let (ledger, eth) = adapter(Arc::new(AutoApprove));
        let secret = secret();
        let hashlock = secret.hashlock();

        let tx = eth
            .create_escrow(hashlock, GENESIS_TIME + 100, RELAYER, 1_000)
            .await
            .unwrap();
        assert_eq!(tx.ledger, LedgerId::Ethereum);
        assert!(tx.hash.starts_with("0x"));

        let view = eth.query_escrow(hashlock).await.unwrap().unwrap();
        assert_eq!(view.sender, USER);
        assert_eq!(view.recipient, RELAYER);
        assert_eq!(view.amount, 1_000);
        assert_eq!(view.status, EscrowStatus::Open);
        assert!(eth.revealed_secret(hashlock).await.unwrap().is_none());

        eth.claim_escrow(hashlock, &secret).await.unwrap();
        assert_eq!(ledger.balance(RELAYER), 1_000);
        let revealed = eth.revealed_secret(hashlock).await.unwrap().unwrap();
        assert_eq!(revealed.as_bytes(), secret.as_bytes());
        assert_eq!(
            eth.claim_escrow(hashlock, &secret).await,
            Err(SwapError::AlreadyClaimed)
        );
    }

    #[tokio::test]
    async fn test_wrong_secret_never_broadcasts() {
        let (ledger, eth) = adapter(Arc::new(AutoApprove));
        let hashlock = secret().hashlock();
        eth.create_escrow(hashlock, GENESIS_TIME + 100, RELAYER, 10)
            .await
            .unwrap();
        let before = ledger.submitted_count();

        let wrong = SecureSecret::new([6u8; 32]);
        assert_eq!(eth.claim_escrow(hashlock, &wrong).await, Err(SwapError::HashMismatch));
        assert_eq!(ledger.submitted_count(), before);
    }

    #[tokio::test]
    async fn test_refund_waits_for_timelock() {
        let (ledger, eth) = adapter(Arc::new(AutoApprove));
        let hashlock = secret().hashlock();
        eth.create_escrow(hashlock, GENESIS_TIME + 100, RELAYER, 10)
            .await
            .unwrap();

        assert!(matches!(
            eth.refund_escrow(hashlock).await,
            Err(SwapError::TimelockNotExpired { timelock, .. }) if timelock == GENESIS_TIME + 100
        ));
        ledger.advance_time(101);
        eth.refund_escrow(hashlock).await.unwrap();
        assert_eq!(ledger.balance(USER), 5_000);
        assert_eq!(
            eth.query_escrow(hashlock).await.unwrap().unwrap().status,
            EscrowStatus::Refunded
        );
    }

    #[tokio::test]
    async fn test_rejected_signature_and_disconnect() {
        let (ledger, eth) = adapter(Arc::new(ScriptedSigner::always_reject()));
        let hashlock = secret().hashlock();
        assert_eq!(
            eth.create_escrow(hashlock, GENESIS_TIME + 100, RELAYER, 10).await,
            Err(SwapError::RejectedByUser)
        );
        assert_eq!(ledger.submitted_count(), 0);

        eth.session().disconnect();
        assert_eq!(
            eth.create_escrow(hashlock, GENESIS_TIME + 100, RELAYER, 10).await,
            Err(SwapError::WalletDisconnected(LedgerId::Ethereum))
        );
    }

    #[tokio::test]
    async fn test_contract_reverts_map_to_swap_errors() {
        let (ledger, eth) = adapter(Arc::new(AutoApprove));
        let hashlock = secret().hashlock();
        assert!(matches!(
            eth.create_escrow(hashlock, GENESIS_TIME + 100, RELAYER, 10_000).await,
            Err(SwapError::InsufficientFunds { required: 10_000, available: 5_000 })
        ));
        assert!(matches!(
            eth.create_escrow(hashlock, GENESIS_TIME, RELAYER, 10).await,
            Err(SwapError::Contract(_))
        ));
        assert_eq!(
            eth.refund_escrow(hashlock).await,
            Err(SwapError::EscrowNotFound(hashlock))
        );
        assert_eq!(ledger.escrows().len(), 0);
    }

    #[tokio::test]
    async fn test_lost_ack_and_dropped_tx_surface_as_network_errors() {
        let (ledger, eth) = adapter(Arc::new(AutoApprove));
        let hashlock = secret().hashlock();
        ledger.inject_submit_faults([SubmitFault::LoseAck]);
        assert!(matches!(
            eth.create_escrow(hashlock, GENESIS_TIME + 100, RELAYER, 10).await,
            Err(SwapError::NetworkError(_))
        ));
        assert!(eth.query_escrow(hashlock).await.unwrap().is_some());

        let other = SecureSecret::new([8u8; 32]).hashlock();
        ledger.inject_submit_faults([SubmitFault::Drop]);
        assert!(matches!(
            eth.create_escrow(other, GENESIS_TIME + 100, RELAYER, 10).await,
            Err(SwapError::NetworkError(_))
        ));
        assert!(eth.query_escrow(other).await.unwrap().is_none());
    }

    #[test]
    fn test_address_validation() {
        let (_, eth) = adapter(Arc::new(AutoApprove));
        assert!(eth.validate_address(RELAYER).is_ok());
        assert!(eth.validate_address("cosmos1abc").is_err());
    }
}
