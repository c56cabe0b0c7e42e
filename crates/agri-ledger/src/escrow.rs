//! # Escrow Transactions
//!
//! Two-phase value transfer over a batch. The current owner opens a pending
//! transaction naming a buyer and a price; the buyer completes it by
//! attaching a payment.
//!
//! ## Status Machine
//!
//! ```text
//! Pending ──complete──▶ Completed (terminal)
//! ```
//!
//! ## Security Invariant
//!
//! Completion is at-most-once. The completed flag and the batch's new owner
//! are written before any value moves, so any re-entrant or later call for
//! the same transaction observes `AlreadyCompleted`. The orchestration lives
//! in [`crate::LedgerState`]; this module owns the records and the flag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use agri_core::{BatchId, LedgerError, Principal, Timestamp, TransactionId};

use crate::registry::require_text;

/// An escrow agreement tied to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTransaction {
    pub id: TransactionId,
    pub batch_id: BatchId,
    /// Owner of the batch when the transaction was opened.
    pub seller: Principal,
    pub buyer: Principal,
    pub created_at: Timestamp,
    /// Agreed price in the smallest currency unit.
    pub price: u64,
    /// Free-form label such as `"wholesale"`.
    pub tx_type: String,
    completed: bool,
    completed_at: Option<Timestamp>,
}

impl EscrowTransaction {
    /// Whether the transaction has been settled.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// When the transaction was settled.
    pub fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }
}

/// Outcome of a completed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub transaction_id: TransactionId,
    pub batch_id: BatchId,
    pub seller: Principal,
    pub buyer: Principal,
    /// Amount credited to the seller.
    pub price: u64,
    /// Excess payment credited back to the buyer.
    pub refund: u64,
}

/// The transaction table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowBook {
    transactions: BTreeMap<TransactionId, EscrowTransaction>,
    next_id: TransactionId,
}

impl Default for EscrowBook {
    fn default() -> Self {
        Self {
            transactions: BTreeMap::new(),
            next_id: TransactionId::FIRST,
        }
    }
}

impl EscrowBook {
    /// Look up a transaction.
    pub fn get(&self, id: TransactionId) -> Result<&EscrowTransaction, LedgerError> {
        self.transactions
            .get(&id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }

    /// Transactions referencing `batch`, in id order.
    pub fn for_batch(&self, batch: BatchId) -> impl Iterator<Item = &EscrowTransaction> {
        self.transactions.values().filter(move |t| t.batch_id == batch)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Store a pending transaction. The seller's ownership and the buyer's
    /// standing are checked by the caller.
    pub(crate) fn open(
        &mut self,
        batch_id: BatchId,
        seller: Principal,
        buyer: Principal,
        price: u64,
        tx_type: String,
        now: Timestamp,
    ) -> Result<TransactionId, LedgerError> {
        if price == 0 {
            return Err(LedgerError::InvalidInput("price must be positive".to_string()));
        }
        require_text("transaction type", &tx_type)?;

        let id = self.next_id;
        self.transactions.insert(
            id,
            EscrowTransaction {
                id,
                batch_id,
                seller,
                buyer,
                created_at: now,
                price,
                tx_type,
                completed: false,
                completed_at: None,
            },
        );
        self.next_id = id.next();
        Ok(id)
    }

    /// Validate a completion request without mutating anything.
    pub(crate) fn check_completion(
        &self,
        id: TransactionId,
        caller: &Principal,
        payment: u64,
    ) -> Result<&EscrowTransaction, LedgerError> {
        let tx = self.get(id)?;
        if &tx.buyer != caller {
            return Err(LedgerError::NotBuyer {
                caller: caller.to_string(),
                transaction: id.to_string(),
            });
        }
        if tx.completed {
            return Err(LedgerError::AlreadyCompleted(id.to_string()));
        }
        if payment < tx.price {
            return Err(LedgerError::InsufficientPayment {
                offered: payment,
                price: tx.price,
            });
        }
        Ok(tx)
    }

    /// Flip the completed flag. Fails if it is already set.
    pub(crate) fn mark_completed(
        &mut self,
        id: TransactionId,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let tx = self
            .transactions
            .get_mut(&id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        if tx.completed {
            return Err(LedgerError::AlreadyCompleted(id.to_string()));
        }
        tx.completed = true;
        tx.completed_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agri_core::ErrorKind;

    fn p(key: &str) -> Principal {
        Principal::new(key).unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::parse("2026-04-03T09:00:00Z").unwrap()
    }

    fn book_with_tx(price: u64) -> (EscrowBook, TransactionId) {
        let mut book = EscrowBook::default();
        let id = book
            .open(BatchId(1), p("seller"), p("buyer"), price, "wholesale".into(), now())
            .unwrap();
        (book, id)
    }

    #[test]
    fn test_open_is_pending() {
        let (book, id) = book_with_tx(100);
        assert_eq!(id, TransactionId(1));
        let tx = book.get(id).unwrap();
        assert!(!tx.is_completed());
        assert_eq!(tx.completed_at(), None);
        assert_eq!(tx.price, 100);
    }

    #[test]
    fn test_open_validates_price_and_type() {
        let mut book = EscrowBook::default();
        assert_eq!(
            book.open(BatchId(1), p("s"), p("b"), 0, "x".into(), now())
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            book.open(BatchId(1), p("s"), p("b"), 5, "".into(), now())
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidInput
        );
        assert!(book.is_empty());
    }

    #[test]
    fn test_check_completion_order() {
        let (mut book, id) = book_with_tx(100);
        assert_eq!(
            book.check_completion(TransactionId(9), &p("buyer"), 100)
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            book.check_completion(id, &p("seller"), 100).unwrap_err().kind(),
            ErrorKind::NotBuyer
        );
        assert_eq!(
            book.check_completion(id, &p("buyer"), 99).unwrap_err().kind(),
            ErrorKind::InsufficientPayment
        );
        assert!(book.check_completion(id, &p("buyer"), 100).is_ok());

        book.mark_completed(id, now()).unwrap();
        // Completed wins over an insufficient payment.
        assert_eq!(
            book.check_completion(id, &p("buyer"), 1).unwrap_err().kind(),
            ErrorKind::AlreadyCompleted
        );
    }

    #[test]
    fn test_mark_completed_once() {
        let (mut book, id) = book_with_tx(100);
        book.mark_completed(id, now()).unwrap();
        assert!(book.get(id).unwrap().is_completed());
        assert_eq!(
            book.mark_completed(id, now()).unwrap_err().kind(),
            ErrorKind::AlreadyCompleted
        );
    }

    #[test]
    fn test_for_batch() {
        let (mut book, _) = book_with_tx(100);
        book.open(BatchId(2), p("s"), p("b"), 5, "retail".into(), now())
            .unwrap();
        book.open(BatchId(1), p("s"), p("b"), 7, "retail".into(), now())
            .unwrap();
        let ids: Vec<_> = book.for_batch(BatchId(1)).map(|t| t.id).collect();
        assert_eq!(ids, vec![TransactionId(1), TransactionId(3)]);
    }
}
