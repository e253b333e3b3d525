//! Cryptographic primitives for the ledger
//!
//! - SHA-256 hashing (hex digests)
//! - secp256k1 key pairs, signing and verification
//! - address derivation and the address -> public key registry
//! - the capacity-bounded merkle commitment

pub mod hash;
pub mod keys;
pub mod merkle;

pub use hash::{sha256, sha256_hex};
pub use keys::{
    address_for, public_key_from_hex, sign_message, verify_signature, KeyError, KeyPair,
    KeyRegistry,
};
pub use merkle::merkle_root;
