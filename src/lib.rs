//! Picochain: a minimal proof-of-work blockchain consensus and ledger
//! engine
//!
//! The crate maintains a replicated, append-only ledger of blocks
//! carrying UTXO-style transactions:
//! - Proof-of-work mining with adaptive difficulty and a cancellable
//!   nonce search
//! - A capacity-bounded merkle commitment over each block's
//!   transactions
//! - UTXO validation with secp256k1 spend signatures
//! - A fee-ordered transaction pool
//! - Longest-chain fork resolution with mempool reconciliation
//! - The peer-sync message vocabulary and reaction table that drive all
//!   of the above
//!
//! Transport, the operator command surface, key-file handling, and
//! persistence are external collaborators: the engine verifies
//! signatures but never produces them on the validation path, and the
//! ledger lives in memory.
//!
//! # Example
//!
//! ```rust
//! use picochain::core::{ChainParams, Ledger};
//! use picochain::mining::Miner;
//!
//! let mut ledger = Ledger::with_params(ChainParams::default());
//!
//! let miner = Miner::new("miner-address");
//! let block = miner.mine_once(&mut ledger).unwrap().unwrap();
//! println!("mined block {} with {} transactions", block.index, block.transactions.len());
//!
//! assert_eq!(ledger.balance("miner-address"), ledger.params().block_reward);
//! ```

pub mod core;
pub mod crypto;
pub mod mining;
pub mod network;

// Re-export commonly used types
pub use crate::core::{
    Block, ChainParams, ForkOutcome, Ledger, LedgerError, Output, Transaction, UtxoSet,
    ValidationError, BLOCK_CAPACITY, BLOCK_REWARD,
};
pub use crate::crypto::{KeyPair, KeyRegistry};
pub use crate::mining::{Miner, TransactionPool};
pub use crate::network::{Message, Node, ProtocolError};
