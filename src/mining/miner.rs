//! Mining orchestration
//!
//! Block production splits into three steps so the CPU-bound nonce
//! search never runs under the ledger lock: `prepare` snapshots a block
//! template (seating the reward transaction and draining the pool
//! selection), `seal` performs the interruptible proof-of-work, and
//! `commit` re-checks the tail before appending — a block that lost the
//! race to an external append is discarded, never published.

use crate::core::block::{now_millis, Block};
use crate::core::ledger::{Ledger, LedgerError};
use crate::core::transaction::Transaction;
use crate::crypto::merkle::merkle_root;
use crate::mining::pow::{self, MineOutcome};

/// Everything the nonce search needs, snapshotted from the ledger
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub index: u64,
    pub previous_hash: String,
    pub timestamp: i64,
    pub merkle_root: String,
    pub difficulty: f64,
    pub transactions: Vec<Transaction>,
}

/// Produces blocks crediting a miner address
#[derive(Debug, Clone)]
pub struct Miner {
    pub address: String,
}

impl Miner {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
        }
    }

    /// Snapshot a template for the next block.
    ///
    /// Creates the reward transaction, seats it at the pool head, and
    /// runs block selection. The selection is lossy: if the sealed
    /// block is later discarded, the drained entries are not restored.
    pub fn prepare(&self, ledger: &mut Ledger) -> BlockTemplate {
        let reward = ledger.create_reward_transaction(&self.address);
        let transactions = ledger.select_block_transactions(reward);

        let tail = ledger.latest_block();
        BlockTemplate {
            index: tail.index + 1,
            previous_hash: tail.hash.clone(),
            timestamp: now_millis(),
            merkle_root: merkle_root(&transactions, ledger.params().block_capacity),
            difficulty: ledger.difficulty(),
            transactions,
        }
    }

    /// Run the proof-of-work search over a template.
    ///
    /// Returns `None` when the abort predicate fired; the caller must
    /// not publish anything from an aborted search.
    pub fn seal<F: Fn() -> bool>(&self, template: BlockTemplate, abort: F) -> Option<Block> {
        let outcome = pow::mine(
            template.index,
            &template.previous_hash,
            template.timestamp,
            &template.merkle_root,
            template.difficulty,
            abort,
        );

        match outcome {
            MineOutcome::Found { nonce, hash } => Some(Block::new(
                template.index,
                template.previous_hash,
                template.timestamp,
                template.merkle_root,
                nonce,
                hash,
                template.transactions,
            )),
            MineOutcome::Aborted => {
                log::info!("mining of block {} aborted", template.index);
                None
            }
        }
    }

    /// Append a sealed block unless the tail advanced past it while the
    /// search ran. Returns whether the block made it onto the chain.
    pub fn commit(&self, ledger: &mut Ledger, block: Block) -> Result<bool, LedgerError> {
        if ledger.height() >= block.index {
            log::info!(
                "discarding mined block {}: tail already at {}",
                block.index,
                ledger.height()
            );
            return Ok(false);
        }
        ledger.append_block(block)?;
        Ok(true)
    }

    /// Prepare, seal, and commit in one synchronous call, with no
    /// competing appends to abort for
    pub fn mine_once(&self, ledger: &mut Ledger) -> Result<Option<Block>, LedgerError> {
        let template = self.prepare(ledger);
        let Some(block) = self.seal(template, || false) else {
            return Ok(None);
        };
        if self.commit(ledger, block.clone())? {
            Ok(Some(block))
        } else {
            Ok(None)
        }
    }
}
