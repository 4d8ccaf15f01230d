//! # Swap History
//!
//! Bounded, newest-first audit list of swaps. Display only: the escrows on
//! chain stay authoritative.

use crate::domain::{CompletionKind, Swap, SwapStep, TxRecord};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

/// One audit entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRecord {
    /// Swap id.
    pub id: Uuid,
    /// Hashlock hex.
    pub hashlock: String,
    /// Step when recorded.
    pub step: SwapStep,
    /// Terminal outcome, if completed.
    pub outcome: Option<CompletionKind>,
    /// Locked amount.
    pub amount: String,
    /// Agreed amount.
    pub receive_amount: String,
    /// Submitted transactions, in order.
    pub transactions: Vec<TxRecord>,
    /// Failure cause, kept after a refund.
    pub error: Option<String>,
    /// Creation time.
    pub created_at: u64,
    /// Last transition time.
    pub updated_at: u64,
}

impl From<&Swap> for SwapRecord {
    fn from(swap: &Swap) -> Self {
        let view = swap.view();
        Self {
            id: swap.id,
            hashlock: view.hashlock,
            step: swap.step,
            outcome: swap.outcome(),
            amount: view.amount,
            receive_amount: view.receive_amount,
            transactions: view.transactions,
            error: view.error,
            created_at: swap.created_at,
            updated_at: swap.updated_at,
        }
    }
}

/// Shared swap history. Clones share the same list.
#[derive(Clone, Debug)]
pub struct SwapHistory {
    records: Arc<RwLock<VecDeque<SwapRecord>>>,
    capacity: usize,
}

impl SwapHistory {
    /// Keep at most `capacity` records (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Insert or replace the record for `swap`, moving it to the front.
    pub fn upsert(&self, swap: &Swap) {
        let record = SwapRecord::from(swap);
        let mut records = self.records.write();
        records.retain(|existing| existing.id != record.id);
        records.push_front(record);
        records.truncate(self.capacity);
    }

    /// Record by id.
    pub fn get(&self, id: Uuid) -> Option<SwapRecord> {
        self.records.read().iter().find(|r| r.id == id).cloned()
    }

    /// All records, newest first.
    pub fn records(&self) -> Vec<SwapRecord> {
        self.records.read().iter().cloned().collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Count of records with the given outcome.
    pub fn count_outcome(&self, outcome: CompletionKind) -> usize {
        self.records
            .read()
            .iter()
            .filter(|r| r.outcome == Some(outcome))
            .count()
    }

    /// Pretty JSON of all records.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Amount, Commitment, SecureSecret, TimelockPair, Token};

    fn swap(step: SwapStep) -> Swap {
        Swap {
            id: Uuid::new_v4(),
            amount: Amount::parse(Token::Eth, "1").unwrap(),
            receive_amount: Amount::parse(Token::Atom, "10").unwrap(),
            recipient: "0x1111111111111111111111111111111111111111".into(),
            initiator: "0x2222222222222222222222222222222222222222".into(),
            beneficiary: "cosmos1me".into(),
            commitment: Commitment::new(
                SecureSecret::new([2; 32]),
                TimelockPair { source: 10_000, target: 1_000 },
            ),
            counterparty_escrow: None,
            step,
            transactions: vec![],
            failure: None,
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn test_newest_first_and_bounded() {
        let history = SwapHistory::new(2);
        let a = swap(SwapStep::Completed(CompletionKind::Exchanged));
        let b = swap(SwapStep::Completed(CompletionKind::Refunded));
        let c = swap(SwapStep::Failed);
        history.upsert(&a);
        history.upsert(&b);
        history.upsert(&c);

        let ids: Vec<Uuid> = history.records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![c.id, b.id]);
        assert!(history.get(a.id).is_none());
    }

    #[test]
    fn test_upsert_replaces_in_place_of_duplicate() {
        let history = SwapHistory::new(10);
        let mut s = swap(SwapStep::Failed);
        history.upsert(&s);
        s.step = SwapStep::Completed(CompletionKind::Refunded);
        history.upsert(&s);

        assert_eq!(history.len(), 1);
        let record = history.get(s.id).unwrap();
        assert_eq!(record.outcome, Some(CompletionKind::Refunded));
        assert_eq!(history.count_outcome(CompletionKind::Refunded), 1);
        assert_eq!(history.count_outcome(CompletionKind::Exchanged), 0);
    }

    #[test]
    fn test_json_never_contains_secret() {
        let history = SwapHistory::new(5);
        let s = swap(SwapStep::Completed(CompletionKind::Exchanged));
        history.upsert(&s);
        let json = history.to_json().unwrap();
        assert!(json.contains(&s.id.to_string()));
        assert!(!json.contains(&hex::encode([2u8; 32])));
    }
}
