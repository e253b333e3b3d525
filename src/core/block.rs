//! Blocks and header hashing
//!
//! A block's hash is a digest of its header fields
//! `(index, previousHash, timestamp, merkleRoot, nonce)` over the
//! canonical JSON array encoding. The stored `hash` is the producing
//! node's claim, not part of the hashed header, and every receiver
//! re-derives it.

use crate::core::transaction::Transaction;
use crate::crypto::sha256_hex;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Sentinel previous-hash of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Sentinel merkle root of the empty genesis transaction list
pub const EMPTY_MERKLE_ROOT: &str = "0";

/// A block in the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block height
    pub index: u64,
    /// Hash of the previous block
    pub previous_hash: String,
    /// Creation time in Unix milliseconds
    pub timestamp: i64,
    /// Merkle commitment over the transaction list
    pub merkle_root: String,
    /// Winning proof-of-work nonce
    pub nonce: u64,
    /// Claimed header hash, re-derivable by every receiver
    pub hash: String,
    /// Ordered transaction list, reward transaction first
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(
        index: u64,
        previous_hash: String,
        timestamp: i64,
        merkle_root: String,
        nonce: u64,
        hash: String,
        transactions: Vec<Transaction>,
    ) -> Self {
        Self {
            index,
            previous_hash,
            timestamp,
            merkle_root,
            nonce,
            hash,
            transactions,
        }
    }

    /// Digest of the header fields over the canonical encoding
    pub fn header_hash(
        index: u64,
        previous_hash: &str,
        timestamp: i64,
        merkle_root: &str,
        nonce: u64,
    ) -> String {
        let data = serde_json::to_string(&(index, previous_hash, timestamp, merkle_root, nonce))
            .expect("block header serializes");
        sha256_hex(data.as_bytes())
    }

    /// Re-derive the header hash from this block's own fields
    pub fn compute_hash(&self) -> String {
        Self::header_hash(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.merkle_root,
            self.nonce,
        )
    }

    /// Check the claimed hash against the header
    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// The reward transaction, if the block carries one
    pub fn reward_transaction(&self) -> Option<&Transaction> {
        self.transactions.first().filter(|tx| tx.is_reward())
    }
}

/// Current wall-clock time in Unix milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_hash_matches_compute_hash() {
        let hash = Block::header_hash(1, "prev", 1_000, "root", 42);
        let block = Block::new(1, "prev".into(), 1_000, "root".into(), 42, hash, vec![]);
        assert!(block.verify_hash());
    }

    #[test]
    fn test_tampered_nonce_breaks_claim() {
        let hash = Block::header_hash(1, "prev", 1_000, "root", 42);
        let mut block = Block::new(1, "prev".into(), 1_000, "root".into(), 42, hash, vec![]);
        block.nonce += 1;
        assert!(!block.verify_hash());
    }

    #[test]
    fn test_header_hash_covers_every_field() {
        let base = Block::header_hash(1, "prev", 1_000, "root", 42);
        assert_ne!(base, Block::header_hash(2, "prev", 1_000, "root", 42));
        assert_ne!(base, Block::header_hash(1, "other", 1_000, "root", 42));
        assert_ne!(base, Block::header_hash(1, "prev", 1_001, "root", 42));
        assert_ne!(base, Block::header_hash(1, "prev", 1_000, "toor", 42));
        assert_ne!(base, Block::header_hash(1, "prev", 1_000, "root", 43));
    }

    #[test]
    fn test_wire_field_names_are_camel_case() {
        let hash = Block::header_hash(0, GENESIS_PREVIOUS_HASH, 0, EMPTY_MERKLE_ROOT, 0);
        let block = Block::new(
            0,
            GENESIS_PREVIOUS_HASH.into(),
            0,
            EMPTY_MERKLE_ROOT.into(),
            0,
            hash,
            vec![],
        );
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains("\"previousHash\""));
        assert!(json.contains("\"merkleRoot\""));
    }
}
