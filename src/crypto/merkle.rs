//! Capacity-bounded merkle commitment over a block's transactions
//!
//! The tree is shaped by the protocol block capacity, not by the number
//! of transactions present: slots fill left to right and an empty right
//! half is omitted from the digest entirely rather than padded with a
//! placeholder hash. Every node must reproduce this rule bit-exact or
//! roots diverge across the network.

use super::hash::sha256_hex;
use crate::core::transaction::Transaction;

/// Compute the merkle commitment over an ordered transaction list.
///
/// `capacity` is the protocol-wide transaction ceiling for a block and
/// must be a power of two. The list must be non-empty and fit within
/// the capacity; mined blocks always carry at least the reward
/// transaction.
pub fn merkle_root(transactions: &[Transaction], capacity: usize) -> String {
    debug_assert!(capacity.is_power_of_two(), "capacity must be a power of two");
    debug_assert!(!transactions.is_empty(), "commitment over an empty slot");
    debug_assert!(transactions.len() <= capacity, "transactions exceed capacity");

    if capacity == 1 {
        return sha256_hex(transactions[0].canonical_json().as_bytes());
    }

    let half = capacity / 2;
    let occupied = transactions.len().min(half);
    let left = merkle_root(&transactions[..occupied], half);

    if transactions.len() > half {
        let right = merkle_root(&transactions[half..], half);
        // Parents hash the concatenated hex digests, not raw bytes.
        sha256_hex(format!("{}{}", left, right).as_bytes())
    } else {
        left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: u64) -> Transaction {
        Transaction::new(id, vec![], vec![], 0)
    }

    fn leaf(transaction: &Transaction) -> String {
        sha256_hex(transaction.canonical_json().as_bytes())
    }

    #[test]
    fn test_single_slot_is_leaf_hash() {
        let t = tx(0);
        assert_eq!(merkle_root(&[t.clone()], 1), leaf(&t));
    }

    #[test]
    fn test_root_is_deterministic() {
        let txs = vec![tx(0), tx(1), tx(2)];
        assert_eq!(merkle_root(&txs, 4), merkle_root(&txs, 4));
    }

    #[test]
    fn test_root_is_order_sensitive() {
        let forward = vec![tx(0), tx(1)];
        let reversed = vec![tx(1), tx(0)];
        assert_ne!(merkle_root(&forward, 4), merkle_root(&reversed, 4));
    }

    #[test]
    fn test_empty_right_half_is_omitted() {
        // A single occupied slot collapses to its leaf at every level;
        // no placeholder hash is mixed in for the empty half.
        let t = tx(7);
        assert_eq!(merkle_root(&[t.clone()], 16), leaf(&t));
    }

    #[test]
    fn test_pruning_shape_capacity_four() {
        // capacity=4 with 3 transactions: root = H(H(l0+l1) + l2).
        let txs = vec![tx(0), tx(1), tx(2)];
        let l0 = leaf(&txs[0]);
        let l1 = leaf(&txs[1]);
        let l2 = leaf(&txs[2]);

        let left = sha256_hex(format!("{}{}", l0, l1).as_bytes());
        let expected = sha256_hex(format!("{}{}", left, l2).as_bytes());

        assert_eq!(merkle_root(&txs, 4), expected);
    }

    #[test]
    fn test_full_capacity() {
        let txs: Vec<Transaction> = (0..4).map(tx).collect();
        let left = sha256_hex(format!("{}{}", leaf(&txs[0]), leaf(&txs[1])).as_bytes());
        let right = sha256_hex(format!("{}{}", leaf(&txs[2]), leaf(&txs[3])).as_bytes());
        let expected = sha256_hex(format!("{}{}", left, right).as_bytes());

        assert_eq!(merkle_root(&txs, 4), expected);
    }
}
