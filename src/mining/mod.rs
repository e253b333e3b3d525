//! Block production
//!
//! The proof-of-work engine (nonce search, difficulty target,
//! retargeting), the fee-ordered transaction pool, and the miner that
//! assembles, seals, and commits blocks.

pub mod mempool;
pub mod miner;
pub mod pow;

pub use mempool::TransactionPool;
pub use miner::{BlockTemplate, Miner};
pub use pow::{difficulty_met, mine, retarget, MineOutcome};
