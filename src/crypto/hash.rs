//! Cryptographic hashing utilities for the ledger
//!
//! SHA-256 based hashing used for block hashes, transaction digests,
//! and the merkle commitment. Digests travel as lowercase hex strings.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a lowercase hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}
