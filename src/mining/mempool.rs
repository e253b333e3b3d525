//! Fee-ordered pool of pending transactions
//!
//! Insertion keeps the pool sorted by descending fee; equal fees keep
//! arrival order. Selection for a block is deliberately lossy:
//! iterated entries leave the pool whether they make the block or not,
//! and are not restored if the block attempt is later discarded. That
//! policy is part of the observed protocol, not a convenience.

use crate::core::ledger::ChainParams;
use crate::core::transaction::Transaction;
use crate::core::utxo::UtxoSet;
use crate::core::validation::validate_transaction;
use crate::crypto::KeyRegistry;

/// Pending transactions, highest fee first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPool {
    entries: Vec<Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert before the first entry with a strictly lower fee; equal
    /// fees sort after what is already pooled.
    pub fn insert(&mut self, tx: Transaction) {
        let position = self
            .entries
            .iter()
            .position(|pooled| pooled.fee < tx.fee)
            .unwrap_or(self.entries.len());
        self.entries.insert(position, tx);
    }

    /// Seat a transaction at the very front, ahead of any fee ordering.
    /// Used for the reward transaction before block selection.
    pub fn push_front(&mut self, tx: Transaction) {
        self.entries.insert(0, tx);
    }

    /// Remove a pending transaction by its content hash
    pub fn remove(&mut self, hash: &str) -> Option<Transaction> {
        let position = self.entries.iter().position(|tx| tx.hash == hash)?;
        Some(self.entries.remove(position))
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.iter().any(|tx| tx.hash == hash)
    }

    pub fn front(&self) -> Option<&Transaction> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Select the transaction list for the next block.
    ///
    /// The head is taken unconditionally as the block's first entry —
    /// the caller guarantees it is the reward transaction. The rest is
    /// consumed from the front up to capacity, keeping entries that
    /// still validate and dropping the ones that no longer do. Every
    /// iterated entry leaves the pool.
    pub fn select_for_block(
        &mut self,
        utxo_set: &UtxoSet,
        keys: &KeyRegistry,
        params: &ChainParams,
    ) -> Vec<Transaction> {
        let mut selected = Vec::new();
        if self.entries.is_empty() {
            return selected;
        }
        selected.push(self.entries.remove(0));

        while selected.len() < params.block_capacity && !self.entries.is_empty() {
            let tx = self.entries.remove(0);
            match validate_transaction(&tx, utxo_set, keys, params) {
                Ok(()) => selected.push(tx),
                Err(reason) => {
                    log::debug!("dropping pooled transaction {}: {}", tx.hash, reason);
                }
            }
        }

        selected
    }
}
