//! # Swap Coordinator
//!
//! Application service that owns one swap and drives it through the
//! transition function. Every step reads chain state before writing, so a
//! retried operation adopts an earlier submission instead of repeating it.

use super::history::SwapHistory;
use crate::algorithms::{
    apply_event, backoff_delay, generate_commitment, retry_read, validate_timelock_hours,
    SwapEvent,
};
use crate::config::{RetryPolicy, SwapConfig};
use crate::domain::{
    invariant_counterparty_escrow, invariant_fully_exchanged, invariant_refundable, short_hex,
    Amount, EscrowStatus, EscrowView, Hash, Swap, SwapError, SwapParams, SwapStep, SwapView,
};
use crate::ports::inbound::SwapApi;
use crate::ports::outbound::{ChainAdapter, RelayerObserver};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Dependencies shared by every swap in one direction.
#[derive(Clone)]
pub struct SwapContext {
    /// Ledger where the user locks funds.
    pub source: Arc<dyn ChainAdapter>,
    /// Ledger where the user receives funds.
    pub target: Arc<dyn ChainAdapter>,
    /// Relayer activity watcher.
    pub observer: Arc<dyn RelayerObserver>,
    /// Swap policy.
    pub config: Arc<SwapConfig>,
    /// Audit list.
    pub history: SwapHistory,
}

impl SwapContext {
    /// Build a context with a fresh history sized from `config`.
    pub fn new(
        source: Arc<dyn ChainAdapter>,
        target: Arc<dyn ChainAdapter>,
        observer: Arc<dyn RelayerObserver>,
        config: Arc<SwapConfig>,
    ) -> Self {
        let history = SwapHistory::new(config.history_capacity);
        Self {
            source,
            target,
            observer,
            config,
            history,
        }
    }

    /// Same dependencies with source and target swapped. History is shared.
    pub fn reversed(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
            observer: self.observer.clone(),
            config: self.config.clone(),
            history: self.history.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RefundOutlook {
    /// Source escrow open and its timelock passed.
    Ready,
    /// Refund already landed; only adoption is left.
    AlreadyRefunded,
    /// Source escrow open, timelock not yet passed.
    Pending,
    /// No escrow, or it was claimed.
    Nothing,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

async fn read_escrow(
    policy: &RetryPolicy,
    adapter: &Arc<dyn ChainAdapter>,
    hashlock: Hash,
) -> Result<Option<EscrowView>, SwapError> {
    retry_read("query_escrow", policy, || {
        let adapter = adapter.clone();
        async move { adapter.query_escrow(hashlock).await }
    })
    .await
}

async fn read_chain_time(
    policy: &RetryPolicy,
    adapter: &Arc<dyn ChainAdapter>,
) -> Result<u64, SwapError> {
    retry_read("chain_time", policy, || {
        let adapter = adapter.clone();
        async move { adapter.chain_time().await }
    })
    .await
}

/// Coordinates one swap from commitment to a final step.
pub struct SwapCoordinator {
    ctx: SwapContext,
    swap: Swap,
}

impl SwapCoordinator {
    /// Validate `params`, generate the commitment and start at `Setup`.
    ///
    /// Timelocks are anchored on the source ledger's chain time.
    pub async fn new(ctx: SwapContext, params: SwapParams) -> Result<Self, SwapError> {
        if params.from_token == params.to_token {
            return Err(SwapError::InvalidSwapParams(format!(
                "cannot swap {} for itself",
                params.from_token
            )));
        }
        if params.from_token.ledger() != ctx.source.ledger()
            || params.to_token.ledger() != ctx.target.ledger()
        {
            return Err(SwapError::InvalidSwapParams(format!(
                "{} -> {} does not match {} -> {}",
                params.from_token,
                params.to_token,
                ctx.source.ledger(),
                ctx.target.ledger()
            )));
        }
        let amount = Amount::parse(params.from_token, &params.amount)?;
        let receive_amount = Amount::parse(params.to_token, &params.receive_amount)?;
        ctx.source.validate_address(&params.recipient)?;

        let policy = &ctx.config.timelock;
        let hours = params.timelock_hours.unwrap_or(policy.default_hours);
        validate_timelock_hours(hours, policy)?;

        let initiator = ctx
            .source
            .address()
            .ok_or(SwapError::WalletDisconnected(ctx.source.ledger()))?;
        let beneficiary = ctx
            .target
            .address()
            .ok_or(SwapError::WalletDisconnected(ctx.target.ledger()))?;

        let now = read_chain_time(&ctx.config.retry, &ctx.source).await?;
        let commitment = generate_commitment(now, hours, policy)?;
        let created = unix_now();

        let swap = Swap {
            id: Uuid::new_v4(),
            amount,
            receive_amount,
            recipient: params.recipient,
            initiator,
            beneficiary,
            commitment,
            counterparty_escrow: None,
            step: SwapStep::Setup,
            transactions: Vec::new(),
            failure: None,
            created_at: created,
            updated_at: created,
        };
        info!(
            swap_id = %swap.id,
            hashlock = %short_hex(&swap.hashlock()),
            amount = %swap.amount,
            receive = %swap.receive_amount,
            source_timelock = swap.commitment.timelock(),
            "[nebula-swap] swap created"
        );
        ctx.history.upsert(&swap);
        Ok(Self { ctx, swap })
    }

    /// Shared dependencies.
    pub fn context(&self) -> &SwapContext {
        &self.ctx
    }

    fn require_step(&self, expected: SwapStep, operation: &str) -> Result<(), SwapError> {
        if self.swap.step == expected {
            Ok(())
        } else {
            Err(SwapError::InvalidTransition {
                from: self.swap.step.label().to_string(),
                event: operation.to_string(),
            })
        }
    }

    fn transition(&mut self, event: SwapEvent) -> Result<SwapStep, SwapError> {
        let label = event.label();
        let from = self.swap.step;
        let to = apply_event(&mut self.swap, event, unix_now())?;
        debug!(swap_id = %self.swap.id, %from, %to, event = label, "[nebula-swap] transition");
        self.ctx.history.upsert(&self.swap);
        Ok(to)
    }

    /// Record an unrecoverable error, with a best-effort refund check.
    async fn fail(&mut self, err: SwapError) -> SwapError {
        let can_refund = matches!(self.refund_outlook_of_chain().await, Ok(RefundOutlook::Ready));
        if let Err(transition_err) = self.transition(SwapEvent::Failed {
            error: err.clone(),
            can_refund,
        }) {
            warn!(swap_id = %self.swap.id, error = %transition_err, "[nebula-swap] could not record failure");
        }
        error!(
            swap_id = %self.swap.id,
            hashlock = %short_hex(&self.swap.hashlock()),
            category = err.category().as_str(),
            can_refund,
            error = %err,
            "[nebula-swap] swap failed"
        );
        err
    }

    /// Abort a write that left chain state unchanged and return to the prior step.
    fn abort(&mut self, event: SwapEvent, err: SwapError) -> SwapError {
        warn!(swap_id = %self.swap.id, error = %err, "[nebula-swap] {} aborted", event.label());
        if let Err(transition_err) = self.transition(event) {
            return transition_err;
        }
        err
    }

    async fn refund_outlook_of_chain(&self) -> Result<RefundOutlook, SwapError> {
        let retry = &self.ctx.config.retry;
        let Some(escrow) = read_escrow(retry, &self.ctx.source, self.swap.hashlock()).await? else {
            return Ok(RefundOutlook::Nothing);
        };
        match escrow.status {
            EscrowStatus::Claimed => Ok(RefundOutlook::Nothing),
            EscrowStatus::Refunded => Ok(RefundOutlook::AlreadyRefunded),
            EscrowStatus::Open => {
                let now = read_chain_time(retry, &self.ctx.source).await?;
                Ok(if invariant_refundable(&escrow, now) {
                    RefundOutlook::Ready
                } else {
                    RefundOutlook::Pending
                })
            }
        }
    }

    async fn refund_outlook(&mut self) -> Result<RefundOutlook, SwapError> {
        let outlook = self.refund_outlook_of_chain().await?;
        if let Some(failure) = self.swap.failure.as_mut() {
            failure.can_refund = outlook == RefundOutlook::Ready;
        }
        self.ctx.history.upsert(&self.swap);
        Ok(outlook)
    }

    async fn source_expired(&self) -> Result<bool, SwapError> {
        let now = read_chain_time(&self.ctx.config.retry, &self.ctx.source).await?;
        Ok(now > self.swap.commitment.timelock())
    }

    async fn verify_counterparty(&mut self, escrow: EscrowView) -> Result<SwapStep, SwapError> {
        let target_now = read_chain_time(&self.ctx.config.retry, &self.ctx.target).await?;
        let expected = self
            .swap
            .expectation(self.ctx.config.timelock.safety_margin_secs);
        match invariant_counterparty_escrow(&escrow, &expected, target_now) {
            Ok(()) => {
                info!(
                    swap_id = %self.swap.id,
                    ledger = %escrow.ledger,
                    escrow = %escrow,
                    "[nebula-swap] counterparty escrow verified"
                );
                self.transition(SwapEvent::CounterpartyEscrowVerified { escrow })
            }
            Err(err) => {
                warn!(swap_id = %self.swap.id, escrow = %escrow, "[nebula-swap] counterparty escrow rejected");
                Err(self.fail(err).await)
            }
        }
    }

    async fn fail_if_source_expired(&mut self, waiting_for: &str) -> Result<(), SwapError> {
        if self.source_expired().await? {
            return Err(self
                .fail(SwapError::TimeoutExceeded(format!(
                    "{waiting_for} before source timelock {}",
                    self.swap.commitment.timelock()
                )))
                .await);
        }
        Ok(())
    }
}

#[async_trait]
impl SwapApi for SwapCoordinator {
    async fn lock(&mut self) -> Result<SwapStep, SwapError> {
        self.require_step(SwapStep::Setup, "lock")?;
        self.transition(SwapEvent::LockRequested)?;
        let hashlock = self.swap.hashlock();

        match read_escrow(&self.ctx.config.retry, &self.ctx.source, hashlock).await {
            Ok(Some(existing)) if existing.sender.eq_ignore_ascii_case(&self.swap.initiator) => {
                info!(swap_id = %self.swap.id, "[nebula-swap] source escrow already on chain, adopting");
                return self.transition(SwapEvent::LockConfirmed { tx: None });
            }
            Ok(Some(existing)) => {
                let err = SwapError::Contract(format!(
                    "hashlock {} already used by {}",
                    short_hex(&hashlock),
                    existing.sender
                ));
                return Err(self.fail(err).await);
            }
            Ok(None) => {}
            Err(err) if err.keeps_step() => return Err(self.abort(SwapEvent::LockAborted, err)),
            Err(err) => return Err(self.fail(err).await),
        }

        let result = self
            .ctx
            .source
            .create_escrow(
                hashlock,
                self.swap.commitment.timelock(),
                &self.swap.recipient,
                self.swap.amount.base_units,
            )
            .await;
        match result {
            Ok(tx) => {
                info!(
                    swap_id = %self.swap.id,
                    hashlock = %short_hex(&hashlock),
                    ledger = %tx.ledger,
                    tx = %tx.hash,
                    "[nebula-swap] source escrow locked"
                );
                self.transition(SwapEvent::LockConfirmed { tx: Some(tx) })
            }
            Err(err) if err.keeps_step() => Err(self.abort(SwapEvent::LockAborted, err)),
            Err(err) => Err(self.fail(err).await),
        }
    }

    async fn poll_counterparty(&mut self) -> Result<SwapStep, SwapError> {
        self.require_step(SwapStep::AwaitingCounterpartyEscrow, "poll_counterparty")?;
        let hashlock = self.swap.hashlock();
        match read_escrow(&self.ctx.config.retry, &self.ctx.target, hashlock).await? {
            Some(escrow) => self.verify_counterparty(escrow).await,
            None => {
                self.fail_if_source_expired("counterparty escrow").await?;
                Ok(self.swap.step)
            }
        }
    }

    async fn await_counterparty(&mut self) -> Result<SwapStep, SwapError> {
        self.require_step(SwapStep::AwaitingCounterpartyEscrow, "await_counterparty")?;
        let hashlock = self.swap.hashlock();
        let ledger = self.swap.target_ledger();
        let window = self.ctx.config.observer.watch_window();
        loop {
            match self.ctx.observer.watch_for_escrow(hashlock, ledger, window).await {
                Ok(escrow) => return self.verify_counterparty(escrow).await,
                Err(SwapError::TimeoutExceeded(_)) => {
                    self.fail_if_source_expired("counterparty escrow").await?;
                }
                Err(err) if err.is_transient() => {
                    warn!(swap_id = %self.swap.id, error = %err, "[nebula-swap] observer error");
                    sleep(self.ctx.config.observer.poll_interval()).await;
                }
                Err(err) => return Err(self.fail(err).await),
            }
        }
    }

    async fn claim(&mut self) -> Result<SwapStep, SwapError> {
        self.require_step(SwapStep::ReadyToClaim, "claim")?;
        let hashlock = self.swap.hashlock();
        if !self.swap.commitment.secret().matches(&hashlock) {
            return Err(self.fail(SwapError::HashMismatch).await);
        }
        self.transition(SwapEvent::ClaimRequested)?;

        match read_escrow(&self.ctx.config.retry, &self.ctx.target, hashlock).await {
            Ok(Some(escrow)) => match escrow.status {
                EscrowStatus::Open => {}
                EscrowStatus::Claimed => {
                    info!(swap_id = %self.swap.id, "[nebula-swap] counterparty escrow already claimed, adopting");
                    return self.transition(SwapEvent::ClaimConfirmed { tx: None });
                }
                EscrowStatus::Refunded => return Err(self.fail(SwapError::AlreadyRefunded).await),
            },
            Ok(None) => return Err(self.fail(SwapError::EscrowNotFound(hashlock)).await),
            Err(err) if err.keeps_step() => return Err(self.abort(SwapEvent::ClaimAborted, err)),
            Err(err) => return Err(self.fail(err).await),
        }

        let result = self
            .ctx
            .target
            .claim_escrow(hashlock, self.swap.commitment.secret())
            .await;
        match result {
            Ok(tx) => {
                info!(
                    swap_id = %self.swap.id,
                    hashlock = %short_hex(&hashlock),
                    ledger = %tx.ledger,
                    tx = %tx.hash,
                    "[nebula-swap] counterparty escrow claimed"
                );
                self.transition(SwapEvent::ClaimConfirmed { tx: Some(tx) })
            }
            Err(err) if err.keeps_step() => Err(self.abort(SwapEvent::ClaimAborted, err)),
            Err(err) => Err(self.fail(err).await),
        }
    }

    async fn poll_final_unlock(&mut self) -> Result<SwapStep, SwapError> {
        self.require_step(SwapStep::AwaitingFinalUnlock, "poll_final_unlock")?;
        let hashlock = self.swap.hashlock();
        let retry = &self.ctx.config.retry;
        let source = read_escrow(retry, &self.ctx.source, hashlock).await?;
        let target = read_escrow(retry, &self.ctx.target, hashlock).await?;

        let (Some(source), Some(target)) = (source, target) else {
            return Err(self.fail(SwapError::EscrowNotFound(hashlock)).await);
        };
        if invariant_fully_exchanged(source.status, target.status) {
            let step = self.transition(SwapEvent::FinalUnlockObserved {
                source: source.status,
                target: target.status,
            })?;
            info!(
                swap_id = %self.swap.id,
                hashlock = %short_hex(&hashlock),
                "[nebula-swap] swap completed"
            );
            return Ok(step);
        }
        if source.status == EscrowStatus::Open {
            self.fail_if_source_expired("relayer unlock").await?;
        }
        Ok(self.swap.step)
    }

    async fn await_final_unlock(&mut self) -> Result<SwapStep, SwapError> {
        self.require_step(SwapStep::AwaitingFinalUnlock, "await_final_unlock")?;
        let hashlock = self.swap.hashlock();
        let ledger = self.swap.source_ledger();
        let window = self.ctx.config.observer.watch_window();
        loop {
            match self.poll_final_unlock().await {
                Ok(SwapStep::AwaitingFinalUnlock) => {}
                Ok(step) => return Ok(step),
                Err(err) if err.is_transient() && !self.swap.step.is_final() => {
                    warn!(swap_id = %self.swap.id, error = %err, "[nebula-swap] unlock check failed");
                }
                Err(err) => return Err(err),
            }
            match self.ctx.observer.watch_for_claim(hashlock, ledger, window).await {
                Ok(_) | Err(SwapError::TimeoutExceeded(_)) => {}
                Err(err) if err.is_transient() => {
                    sleep(self.ctx.config.observer.poll_interval()).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn refresh_refund_eligibility(&mut self) -> Result<bool, SwapError> {
        self.require_step(SwapStep::Failed, "refresh_refund_eligibility")?;
        Ok(self.refund_outlook().await? == RefundOutlook::Ready)
    }

    async fn refund(&mut self) -> Result<SwapStep, SwapError> {
        self.require_step(SwapStep::Failed, "refund")?;
        let hashlock = self.swap.hashlock();
        let retry = self.ctx.config.retry.clone();
        let escrow = read_escrow(&retry, &self.ctx.source, hashlock)
            .await?
            .ok_or(SwapError::EscrowNotFound(hashlock))?;

        match escrow.status {
            EscrowStatus::Refunded => {
                info!(swap_id = %self.swap.id, "[nebula-swap] source escrow already refunded, adopting");
                return self.transition(SwapEvent::RefundConfirmed { tx: None });
            }
            EscrowStatus::Claimed => {
                if let Some(failure) = self.swap.failure.as_mut() {
                    failure.can_refund = false;
                }
                self.ctx.history.upsert(&self.swap);
                return Err(SwapError::AlreadyClaimed);
            }
            EscrowStatus::Open => {}
        }
        let now = read_chain_time(&retry, &self.ctx.source).await?;
        if !invariant_refundable(&escrow, now) {
            return Err(SwapError::TimelockNotExpired {
                now,
                timelock: escrow.timelock,
            });
        }

        match self.ctx.source.refund_escrow(hashlock).await {
            Ok(tx) => {
                info!(
                    swap_id = %self.swap.id,
                    hashlock = %short_hex(&hashlock),
                    ledger = %tx.ledger,
                    tx = %tx.hash,
                    "[nebula-swap] source escrow refunded"
                );
                self.transition(SwapEvent::RefundConfirmed { tx: Some(tx) })
            }
            Err(SwapError::AlreadyRefunded) => {
                self.transition(SwapEvent::RefundConfirmed { tx: None })
            }
            Err(err) => {
                warn!(swap_id = %self.swap.id, error = %err, "[nebula-swap] refund failed");
                Err(err)
            }
        }
    }

    /// Drive the swap to a terminal step.
    ///
    /// A transient `lock`/`claim` failure is retried up to the read retry
    /// budget. Each retry reconciles against the ledger first, so a write
    /// that already landed is adopted and only a write that left no trace is
    /// resubmitted. Callers that want every write error surfaced use the
    /// step operations directly.
    async fn run(&mut self) -> Result<SwapView, SwapError> {
        let retry = self.ctx.config.retry.clone();
        let poll = self.ctx.config.observer.poll_interval();
        let mut transient_failures = 0u32;

        loop {
            let before = self.swap.step;
            let outcome = match before {
                SwapStep::Completed(_) => return Ok(self.view()),
                SwapStep::Setup => self.lock().await,
                SwapStep::AwaitingCounterpartyEscrow => self.await_counterparty().await,
                SwapStep::ReadyToClaim => self.claim().await,
                SwapStep::AwaitingFinalUnlock => self.await_final_unlock().await,
                SwapStep::Failed => match self.refund_outlook().await {
                    Ok(RefundOutlook::Ready | RefundOutlook::AlreadyRefunded) => self.refund().await,
                    Ok(RefundOutlook::Pending) => {
                        sleep(poll).await;
                        continue;
                    }
                    Ok(RefundOutlook::Nothing) => return Ok(self.view()),
                    Err(err) => Err(err),
                },
                SwapStep::Locking | SwapStep::Claiming => {
                    return Err(SwapError::InvalidTransition {
                        from: before.label().to_string(),
                        event: "run".to_string(),
                    })
                }
            };

            match outcome {
                Ok(_) => transient_failures = 0,
                Err(_) if before != SwapStep::Failed && self.swap.step == SwapStep::Failed => {}
                Err(err) if err.is_transient() && transient_failures < retry.max_retries => {
                    sleep(backoff_delay(&retry, transient_failures)).await;
                    transient_failures += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn swap(&self) -> &Swap {
        &self.swap
    }

    fn view(&self) -> SwapView {
        self.swap.view()
    }
}
