//! # Domain Value Objects
//!
//! Immutable value types for swap coordination.

use super::errors::SwapError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two ledgers a swap spans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerId {
    /// Account-based EVM chain.
    Ethereum,
    /// Cosmos-SDK chain with a CosmWasm HTLC contract.
    Cosmos,
}

impl LedgerId {
    /// Native token of the ledger.
    pub fn native_token(&self) -> Token {
        match self {
            LedgerId::Ethereum => Token::Eth,
            LedgerId::Cosmos => Token::Atom,
        }
    }
}

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerId::Ethereum => f.write_str("ethereum"),
            LedgerId::Cosmos => f.write_str("cosmos"),
        }
    }
}

/// Tokens that can be swapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    /// Ether, 18 decimals.
    Eth,
    /// Atom, 6 decimals.
    Atom,
}

impl Token {
    /// Ledger the token is native to.
    pub fn ledger(&self) -> LedgerId {
        match self {
            Token::Eth => LedgerId::Ethereum,
            Token::Atom => LedgerId::Cosmos,
        }
    }

    /// Ticker symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Token::Eth => "ETH",
            Token::Atom => "ATOM",
        }
    }

    /// Base denomination.
    pub fn denom(&self) -> &'static str {
        match self {
            Token::Eth => "wei",
            Token::Atom => "uatom",
        }
    }

    /// Decimal places between display and base units.
    pub fn decimals(&self) -> u32 {
        match self {
            Token::Eth => 18,
            Token::Atom => 6,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A positive token amount held in integer base units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// Token the amount is denominated in.
    pub token: Token,
    /// Integer base units (wei, uatom).
    pub base_units: u128,
}

impl Amount {
    /// Wrap base units.
    pub fn from_base_units(token: Token, base_units: u128) -> Self {
        Self { token, base_units }
    }

    /// Parse a decimal string such as `"1.5"` into base units.
    ///
    /// Rejects zero, signs, exponents and more fractional digits than the
    /// token supports.
    pub fn parse(token: Token, input: &str) -> Result<Self, SwapError> {
        let invalid = |why: &str| SwapError::InvalidSwapParams(format!("amount '{input}': {why}"));
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty"));
        }

        let (int_part, frac_part) = match trimmed.split_once('.') {
            Some((i, f)) => (i, f),
            None => (trimmed, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("no digits"));
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("not a decimal number"));
        }

        let decimals = token.decimals();
        if frac_part.len() > decimals as usize {
            return Err(invalid("too many fractional digits"));
        }

        let scale = 10u128.pow(decimals);
        let int_value: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid("too large"))?
        };
        let frac_value: u128 = if frac_part.is_empty() {
            0
        } else {
            let digits: u128 = frac_part.parse().map_err(|_| invalid("too large"))?;
            digits * 10u128.pow(decimals - frac_part.len() as u32)
        };

        let base_units = int_value
            .checked_mul(scale)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(|| invalid("too large"))?;
        if base_units == 0 {
            return Err(invalid("must be greater than zero"));
        }

        Ok(Self { token, base_units })
    }
}

impl Amount {
    /// Decimal string without the symbol, accepted back by `parse`.
    pub fn decimal(&self) -> String {
        let scale = 10u128.pow(self.token.decimals());
        let int = self.base_units / scale;
        let frac = self.base_units % scale;
        if frac == 0 {
            return int.to_string();
        }
        let frac = format!("{:0width$}", frac, width = self.token.decimals() as usize);
        format!("{}.{}", int, frac.trim_end_matches('0'))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.decimal(), self.token)
    }
}

/// On-chain escrow status. `Claimed` and `Refunded` are terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowStatus {
    /// Funds locked.
    #[default]
    Open,
    /// Secret revealed, funds released to recipient.
    Claimed,
    /// Funds returned to sender after the timelock.
    Refunded,
}

impl EscrowStatus {
    /// Derive from the contract's `(claimed, refunded)` flags.
    pub fn from_flags(claimed: bool, refunded: bool) -> Self {
        match (claimed, refunded) {
            (true, _) => Self::Claimed,
            (false, true) => Self::Refunded,
            (false, false) => Self::Open,
        }
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Claimed | Self::Refunded)
    }
}

/// How a completed swap ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionKind {
    /// Both escrows claimed: the trade happened.
    Exchanged,
    /// Source escrow refunded: no trade, funds returned.
    Refunded,
}

impl CompletionKind {
    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exchanged => "exchanged",
            Self::Refunded => "refunded",
        }
    }
}

/// Swap lifecycle step.
///
/// ```text
/// Setup → Locking → AwaitingCounterpartyEscrow → ReadyToClaim → Claiming
///       → AwaitingFinalUnlock → Completed(Exchanged)
///
/// any non-terminal ──→ Failed ──refund──→ Completed(Refunded)
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapStep {
    /// Commitment generated, nothing submitted.
    #[default]
    Setup,
    /// Source lock submitted, awaiting confirmation.
    Locking,
    /// Source escrow confirmed; waiting for the relayer's mirrored escrow.
    AwaitingCounterpartyEscrow,
    /// Counterparty escrow verified; safe to claim.
    ReadyToClaim,
    /// Claim submitted on the target ledger.
    Claiming,
    /// Secret public; waiting for the source escrow to be claimed.
    AwaitingFinalUnlock,
    /// Terminal success, either exchanged or refunded.
    Completed(CompletionKind),
    /// Terminal failure; may offer a refund.
    Failed,
}

impl SwapStep {
    /// `Completed(_)` is terminal. `Failed` only moves on through a refund.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Step is finished for history purposes.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed)
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Locking => "locking",
            Self::AwaitingCounterpartyEscrow => "awaiting_counterparty_escrow",
            Self::ReadyToClaim => "ready_to_claim",
            Self::Claiming => "claiming",
            Self::AwaitingFinalUnlock => "awaiting_final_unlock",
            Self::Completed(CompletionKind::Exchanged) => "completed",
            Self::Completed(CompletionKind::Refunded) => "completed_refunded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SwapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of transaction the coordinator submitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxKind {
    /// Source escrow creation.
    Lock,
    /// Target escrow claim (reveals the secret).
    Claim,
    /// Source escrow refund.
    Refund,
}

/// Reference to a confirmed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxRef {
    /// Ledger the transaction lives on.
    pub ledger: LedgerId,
    /// Transaction hash as the ledger renders it.
    pub hash: String,
}

impl TxRef {
    /// Create a new reference.
    pub fn new(ledger: LedgerId, hash: impl Into<String>) -> Self {
        Self {
            ledger,
            hash: hash.into(),
        }
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ledger, self.hash)
    }
}
