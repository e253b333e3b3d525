//! Core ledger components
//!
//! - Transactions and outputs (UTXO model, canonical-JSON hashing)
//! - Blocks (header hashing, genesis sentinels)
//! - The unspent-output multiset
//! - Pure validation of transactions, blocks, and candidate chains
//! - The ledger itself: chain, state transition, fork resolution

pub mod block;
pub mod ledger;
pub mod transaction;
pub mod utxo;
pub mod validation;

pub use block::{now_millis, Block, EMPTY_MERKLE_ROOT, GENESIS_PREVIOUS_HASH};
pub use ledger::{
    apply_block, ChainParams, ForkOutcome, ForkRejection, Ledger, LedgerError, BLOCK_CAPACITY,
    BLOCK_REWARD, INITIAL_DIFFICULTY, TARGET_RATE_SECS, UPDATE_INTERVAL,
};
pub use transaction::{Output, Transaction};
pub use utxo::UtxoSet;
pub use validation::{
    validate_block, validate_chain, validate_transaction, ChainSnapshot, ValidationError,
};
