//! Transactions and their outputs
//!
//! A UTXO-style model: a transaction consumes previously unspent
//! outputs (presented as its inputs, each carrying a spend signature)
//! and produces new outputs. The transaction digest covers
//! `(id, inputs, outputs)` over the canonical JSON encoding; the fee is
//! carried alongside but is not part of the hashed data.

use crate::crypto::sha256_hex;
use serde::{Deserialize, Serialize};

/// A spendable amount owed to an address.
///
/// `signature` stays empty while the output sits unspent; it is filled
/// by the owner's key over the spend payload when the output is used as
/// a transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Output {
    /// Address the amount is owed to
    pub address: String,
    /// Amount of coins
    pub value: u64,
    /// Hex-encoded spend signature, present only on inputs
    pub signature: Option<String>,
}

impl Output {
    /// Create a fresh, unsigned output
    pub fn new(address: &str, value: u64) -> Self {
        Self {
            address: address.to_string(),
            value,
            signature: None,
        }
    }

    /// Create an output carrying a spend signature (an input)
    pub fn signed(address: &str, value: u64, signature: String) -> Self {
        Self {
            address: address.to_string(),
            value,
            signature: Some(signature),
        }
    }

    /// The canonical string the owner signs to spend this output
    pub fn spend_payload(&self) -> String {
        format!("{},{}", self.address, self.value)
    }

    /// Check if this output belongs to the given address
    pub fn is_owned_by(&self, address: &str) -> bool {
        self.address == address
    }
}

/// A ledger transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Ledger-unique, monotonically increasing id
    pub id: u64,
    /// Content digest of `(id, inputs, outputs)`
    pub hash: String,
    /// Outputs being consumed, each carrying a spend signature
    pub inputs: Vec<Output>,
    /// Outputs being created
    pub outputs: Vec<Output>,
    /// Fee paid to the miner; excluded from the hashed data
    pub fee: u64,
}

impl Transaction {
    /// Create a new transaction, deriving its content digest
    pub fn new(id: u64, inputs: Vec<Output>, outputs: Vec<Output>, fee: u64) -> Self {
        let hash = Self::compute_hash(id, &inputs, &outputs);
        Self {
            id,
            hash,
            inputs,
            outputs,
            fee,
        }
    }

    /// Create a block-reward transaction: no inputs, zero fee, a single
    /// fixed-value output crediting the miner
    pub fn reward(id: u64, miner_address: &str, reward: u64) -> Self {
        Self::new(id, vec![], vec![Output::new(miner_address, reward)], 0)
    }

    /// Digest of `(id, inputs, outputs)` over the canonical encoding
    pub fn compute_hash(id: u64, inputs: &[Output], outputs: &[Output]) -> String {
        let data = serde_json::to_string(&(id, inputs, outputs))
            .expect("transaction content serializes");
        sha256_hex(data.as_bytes())
    }

    /// Canonical JSON form of the whole record, used as the merkle leaf
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).expect("transaction serializes")
    }

    /// A transaction with no inputs is a block-reward transaction
    pub fn is_reward(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Sum of input values
    pub fn total_input(&self) -> u64 {
        self.inputs.iter().map(|o| o.value).sum()
    }

    /// Sum of output values
    pub fn total_output(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_transaction_shape() {
        let tx = Transaction::reward(3, "miner", 25);
        assert!(tx.is_reward());
        assert_eq!(tx.fee, 0);
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.total_output(), 25);
        assert_eq!(tx.hash, Transaction::compute_hash(3, &[], &tx.outputs));
    }

    #[test]
    fn test_hash_covers_id_inputs_outputs() {
        let out = Output::new("addr", 10);
        let a = Transaction::new(0, vec![], vec![out.clone()], 0);
        let b = Transaction::new(1, vec![], vec![out.clone()], 0);
        assert_ne!(a.hash, b.hash);

        let c = Transaction::new(0, vec![], vec![Output::new("other", 10)], 0);
        assert_ne!(a.hash, c.hash);
    }

    #[test]
    fn test_hash_excludes_fee() {
        let out = Output::new("addr", 10);
        let a = Transaction::new(0, vec![], vec![out.clone()], 0);
        let b = Transaction::new(0, vec![], vec![out], 5);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_canonical_json_is_stable() {
        let tx = Transaction::new(7, vec![], vec![Output::new("addr", 4)], 1);
        let json = tx.canonical_json();
        assert_eq!(json, tx.clone().canonical_json());

        let decoded: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.canonical_json(), json);
    }

    #[test]
    fn test_spend_payload() {
        let out = Output::new("abc", 25);
        assert_eq!(out.spend_payload(), "abc,25");
    }

    #[test]
    fn test_unsigned_output_serializes_null_signature() {
        let out = Output::new("abc", 1);
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("\"signature\":null"));
    }
}
