//! Proof-of-work nonce search and difficulty arithmetic
//!
//! Difficulty is a real number of leading-bit units: a header hash
//! qualifies when, read as a 256-bit integer, it is at most
//! ceil(2^(256 - difficulty)). The comparison runs in IEEE-754 doubles
//! so every node lands on the same target. The nonce search is
//! interruptible through a caller-supplied abort predicate, polled each
//! iteration, so locally mining a block loses cleanly to one arriving
//! from the network.

use crate::core::block::Block;

/// Result of a nonce search
#[derive(Debug, Clone, PartialEq)]
pub enum MineOutcome {
    /// A qualifying nonce, plus the header hash it produced so the
    /// caller can reuse the digest as the block's claim
    Found { nonce: u64, hash: String },
    /// The abort predicate fired; normal cancellation, not an error.
    /// A block must never be published from an aborted search.
    Aborted,
}

/// Check a header hash against the difficulty target
pub fn difficulty_met(hash_hex: &str, difficulty: f64) -> bool {
    let mut value = 0.0f64;
    for c in hash_hex.chars() {
        value = value * 16.0 + c.to_digit(16).unwrap_or(0) as f64;
    }
    let target = 2.0f64.powf(256.0 - difficulty).ceil();
    value <= target
}

/// Search for a nonce whose header hash meets the difficulty.
///
/// The abort predicate is consulted on every iteration after the first
/// failed target check; when it reports a competing block, the search
/// stops immediately with `Aborted`.
pub fn mine<F: Fn() -> bool>(
    index: u64,
    previous_hash: &str,
    timestamp: i64,
    merkle_root: &str,
    difficulty: f64,
    abort: F,
) -> MineOutcome {
    let mut nonce = 0u64;
    let mut hash = Block::header_hash(index, previous_hash, timestamp, merkle_root, nonce);

    while !difficulty_met(&hash, difficulty) {
        if abort() {
            return MineOutcome::Aborted;
        }
        nonce += 1;
        hash = Block::header_hash(index, previous_hash, timestamp, merkle_root, nonce);
    }

    MineOutcome::Found { nonce, hash }
}

/// Compute the retargeted difficulty from the observed block rate.
///
/// `average_rate` is seconds per block over the interval; dividing the
/// difficulty by `average_rate / target_rate` doubles it when blocks
/// arrive twice as fast as desired. The delta is clamped to a
/// millisecond so two same-instant timestamps cannot blow the ratio up.
pub fn retarget(
    difficulty: f64,
    delta_ms: i64,
    update_interval: u64,
    target_rate_secs: f64,
) -> f64 {
    let delta_secs = delta_ms.max(1) as f64 / 1000.0;
    let average_rate = delta_secs / update_interval as f64;
    let ratio = average_rate / target_rate_secs;
    difficulty / ratio
}
