//! Quote Service
//!
//! Display-only price estimates. A live aggregator quote when one is
//! reachable, otherwise the fixed fallback rate, and the two are never
//! interchangeable at the type level.

use crate::domain::{Amount, Token};
use crate::ports::outbound::{LiveQuote, QuoteSource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Fallback rate: ATOM per ETH.
pub const ATOM_PER_ETH: u128 = 10;

/// A display quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quote {
    /// From the aggregator.
    Live(LiveQuote),
    /// Fixed-rate estimate; the aggregator was unavailable.
    Estimated {
        /// Estimated output.
        to_amount: Amount,
        /// Rate label, e.g. `1 ETH = 10 ATOM`.
        rate: String,
    },
}

impl Quote {
    /// Output amount, live or estimated.
    pub fn to_amount(&self) -> &Amount {
        match self {
            Quote::Live(live) => &live.to_amount,
            Quote::Estimated { to_amount, .. } => to_amount,
        }
    }

    /// Whether the quote came from the aggregator.
    pub fn is_live(&self) -> bool {
        matches!(self, Quote::Live(_))
    }
}

/// Convert at the fixed fallback rate using integer base units.
pub fn convert_fixed_rate(amount: &Amount, to: Token) -> Amount {
    let from = amount.token;
    if from == to {
        return *amount;
    }
    // value in `to` base units = amount * rate * 10^to_dec / 10^from_dec
    let (num, den) = match (from, to) {
        (Token::Eth, Token::Atom) => (ATOM_PER_ETH, 1),
        (Token::Atom, Token::Eth) => (1, ATOM_PER_ETH),
        _ => (1, 1),
    };
    let to_scale = 10u128.pow(to.decimals());
    let from_scale = 10u128.pow(from.decimals());
    let converted = if to_scale >= from_scale {
        amount
            .base_units
            .saturating_mul(num)
            .saturating_mul(to_scale / from_scale)
            / den
    } else {
        amount.base_units.saturating_mul(num) / den / (from_scale / to_scale)
    };
    Amount::from_base_units(to, converted)
}

fn rate_label(from: Token, to: Token) -> String {
    match (from, to) {
        (Token::Eth, Token::Atom) => format!("1 ETH = {ATOM_PER_ETH} ATOM"),
        (Token::Atom, Token::Eth) => format!("1 ATOM = {} ETH", 1.0 / ATOM_PER_ETH as f64),
        _ => "1:1".to_string(),
    }
}

/// Quote service with fixed-rate fallback.
#[derive(Clone, Default)]
pub struct QuoteService {
    source: Option<Arc<dyn QuoteSource>>,
}

impl QuoteService {
    /// Use `source` when reachable.
    pub fn new(source: Arc<dyn QuoteSource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    /// Fixed-rate estimates only.
    pub fn offline() -> Self {
        Self { source: None }
    }

    /// Quote `amount` in `to`. Never fails: aggregator errors fall back.
    pub async fn quote(&self, amount: &Amount, to: Token) -> Quote {
        if let Some(source) = &self.source {
            match source.quote(amount, to).await {
                Ok(live) => return Quote::Live(live),
                Err(err) => warn!(error = %err, "[nebula-swap] live quote unavailable; using fixed rate"),
            }
        }
        Quote::Estimated {
            to_amount: convert_fixed_rate(amount, to),
            rate: rate_label(amount.token, to),
        }
    }
}
