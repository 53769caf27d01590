//! Pending transaction queue.
//!
//! Concurrent map from transaction id to transaction. Adding an id that is
//! already queued replaces the stored transaction, so rebroadcasts are
//! idempotent. Ordering is unspecified; miners take whatever series
//! [`TransactionQueue::transaction_series`] hands back.

use crate::core::transaction::Transaction;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct TransactionQueue {
    transactions: DashMap<String, Transaction>,
}

impl TransactionQueue {
    pub fn new() -> TransactionQueue {
        TransactionQueue::default()
    }

    /// Queues `transaction`, replacing any queued transaction with the same id.
    pub fn add(&self, transaction: Transaction) {
        self.transactions.insert(transaction.id.clone(), transaction);
    }

    /// Snapshot of every queued transaction, in no particular order.
    pub fn transaction_series(&self) -> Vec<Transaction> {
        self.transactions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Drops exactly the transactions that appear in `series`. Called after a
    /// block lands so its transactions stop being re-mined.
    pub fn clear_block_transactions(&self, series: &[Transaction]) {
        for transaction in series {
            self.transactions.remove(&transaction.id);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.transactions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
