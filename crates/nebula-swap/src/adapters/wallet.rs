//! Wallet Sessions
//!
//! Per-ledger connection state and signing prompts.

use crate::domain::{LedgerId, SwapError};
use crate::ports::outbound::{Signer, SigningRequest};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone, Debug)]
struct SessionState {
    connected: bool,
    address: String,
}

/// A connected (or disconnected) wallet on one ledger.
///
/// Shared read-mostly across swaps; nothing swap-specific is stored here.
pub struct WalletSession {
    ledger: LedgerId,
    state: RwLock<SessionState>,
    signer: Arc<dyn Signer>,
}

impl WalletSession {
    /// Create a connected session.
    pub fn connected(ledger: LedgerId, address: impl Into<String>, signer: Arc<dyn Signer>) -> Self {
        Self {
            ledger,
            state: RwLock::new(SessionState {
                connected: true,
                address: address.into(),
            }),
            signer,
        }
    }

    /// Ledger of this session.
    pub fn ledger(&self) -> LedgerId {
        self.ledger
    }

    /// Whether transactions can be submitted.
    pub fn is_connected(&self) -> bool {
        self.state.read().connected
    }

    /// Address while connected.
    pub fn address(&self) -> Option<String> {
        let state = self.state.read();
        state.connected.then(|| state.address.clone())
    }

    /// Drop the connection.
    pub fn disconnect(&self) {
        self.state.write().connected = false;
        info!(ledger = %self.ledger, "[nebula-swap] wallet disconnected");
    }

    /// Restore the connection.
    pub fn reconnect(&self) {
        self.state.write().connected = true;
        info!(ledger = %self.ledger, "[nebula-swap] wallet reconnected");
    }

    /// Address, or `WalletDisconnected`.
    pub fn require_connected(&self) -> Result<String, SwapError> {
        self.address()
            .ok_or(SwapError::WalletDisconnected(self.ledger))
    }

    /// Ask the wallet to sign.
    pub async fn approve(&self, request: &SigningRequest) -> Result<(), SwapError> {
        self.require_connected()?;
        debug!(ledger = %self.ledger, kind = ?request.kind, "[nebula-swap] signing prompt: {}", request.summary);
        self.signer.approve(request).await
    }
}

/// Signer that approves everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoApprove;

#[async_trait]
impl Signer for AutoApprove {
    async fn approve(&self, _request: &SigningRequest) -> Result<(), SwapError> {
        Ok(())
    }
}

/// Signer that replays queued decisions, then falls back to a default.
#[derive(Debug)]
pub struct ScriptedSigner {
    decisions: Mutex<VecDeque<bool>>,
    fallback: bool,
    prompts: Mutex<Vec<SigningRequest>>,
}

impl ScriptedSigner {
    /// Approve by default once the script runs out.
    pub fn new(decisions: impl IntoIterator<Item = bool>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into_iter().collect()),
            fallback: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Reject every prompt.
    pub fn always_reject() -> Self {
        Self {
            decisions: Mutex::new(VecDeque::new()),
            fallback: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue another decision.
    pub fn push(&self, approve: bool) {
        self.decisions.lock().push_back(approve);
    }

    /// Prompts seen so far.
    pub fn prompts(&self) -> Vec<SigningRequest> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl Signer for ScriptedSigner {
    async fn approve(&self, request: &SigningRequest) -> Result<(), SwapError> {
        self.prompts.lock().push(request.clone());
        let approve = self.decisions.lock().pop_front().unwrap_or(self.fallback);
        if approve {
            Ok(())
        } else {
            Err(SwapError::RejectedByUser)
        }
    }
}
