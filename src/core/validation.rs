//! Pure validation of transactions, blocks, and whole chains
//!
//! Every check is named: a failed validation surfaces which rule broke
//! so callers can log the rejection and refuse the input without
//! touching the ledger.

use crate::core::block::Block;
use crate::core::ledger::{apply_block, ChainParams, LedgerError};
use crate::core::transaction::Transaction;
use crate::core::utxo::UtxoSet;
use crate::crypto::merkle::merkle_root;
use crate::crypto::{public_key_from_hex, sha256, verify_signature, KeyRegistry};
use crate::mining::mempool::TransactionPool;
use crate::mining::pow::difficulty_met;
use thiserror::Error;

/// A named validation check that failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("transaction {id}: input {address}:{value} is not unspent")]
    UnknownInput { id: u64, address: String, value: u64 },
    #[error("transaction {id}: no public key registered for {address}")]
    UnknownAddress { id: u64, address: String },
    #[error("transaction {id}: input for {address} carries no signature")]
    MissingSignature { id: u64, address: String },
    #[error("transaction {id}: signature for {address} does not verify")]
    BadSignature { id: u64, address: String },
    #[error("transaction {id}: inputs {input_total} != outputs {output_total} + fee {fee}")]
    ValueMismatch {
        id: u64,
        input_total: u64,
        output_total: u64,
        fee: u64,
    },
    #[error("transaction {id}: malformed reward transaction")]
    InvalidReward { id: u64 },
    #[error("block {index}: expected index {expected}")]
    IndexMismatch { index: u64, expected: u64 },
    #[error("block {index}: previous hash does not match the chain tail")]
    PreviousHashMismatch { index: u64 },
    #[error("block {index}: claimed hash does not match its header")]
    HashMismatch { index: u64 },
    #[error("block {index}: hash does not meet difficulty {difficulty}")]
    DifficultyNotMet { index: u64, difficulty: f64 },
    #[error("block {index}: merkle root does not match the transaction list")]
    MerkleMismatch { index: u64 },
}

/// Threaded end state of a validated candidate chain
#[derive(Debug, Clone)]
pub struct ChainSnapshot {
    pub utxo_set: UtxoSet,
    pub pool: TransactionPool,
    pub next_id: u64,
}

/// Validate a single transaction against the current unspent set.
///
/// Reward transactions are a distinct case: no inputs to check, but the
/// shape is pinned down (zero fee, one output of exactly the protocol
/// reward) so an input-less transaction cannot mint arbitrary value.
pub fn validate_transaction(
    tx: &Transaction,
    utxo_set: &UtxoSet,
    keys: &KeyRegistry,
    params: &ChainParams,
) -> Result<(), ValidationError> {
    if tx.is_reward() {
        if tx.fee == 0 && tx.outputs.len() == 1 && tx.outputs[0].value == params.block_reward {
            return Ok(());
        }
        return Err(ValidationError::InvalidReward { id: tx.id });
    }

    // Work on a copy so duplicate inputs inside one transaction cannot
    // pass the unspent check twice.
    let mut working = utxo_set.clone();
    let mut input_total = 0u64;

    for input in &tx.inputs {
        if !working.remove(input) {
            return Err(ValidationError::UnknownInput {
                id: tx.id,
                address: input.address.clone(),
                value: input.value,
            });
        }

        let public_key_hex =
            keys.get(&input.address)
                .ok_or_else(|| ValidationError::UnknownAddress {
                    id: tx.id,
                    address: input.address.clone(),
                })?;
        let signature_hex =
            input
                .signature
                .as_deref()
                .ok_or_else(|| ValidationError::MissingSignature {
                    id: tx.id,
                    address: input.address.clone(),
                })?;

        let bad_signature = || ValidationError::BadSignature {
            id: tx.id,
            address: input.address.clone(),
        };
        let public_key = public_key_from_hex(public_key_hex).map_err(|_| bad_signature())?;
        let signature = hex::decode(signature_hex).map_err(|_| bad_signature())?;
        let message = sha256(input.spend_payload().as_bytes());
        if !verify_signature(&public_key, &message, &signature).unwrap_or(false) {
            return Err(bad_signature());
        }

        input_total += input.value;
    }

    let output_total = tx.total_output();
    if input_total != output_total + tx.fee {
        return Err(ValidationError::ValueMismatch {
            id: tx.id,
            input_total,
            output_total,
            fee: tx.fee,
        });
    }

    Ok(())
}

/// Validate a block against its predecessor, in check order,
/// short-circuiting on the first failure.
///
/// Transactions are checked against the unspent set as it stands
/// *before* the block; the first (reward) transaction is exempt.
pub fn validate_block(
    prev_block: &Block,
    block: &Block,
    difficulty: f64,
    utxo_set: &UtxoSet,
    keys: &KeyRegistry,
    params: &ChainParams,
) -> Result<(), ValidationError> {
    if block.index != prev_block.index + 1 {
        return Err(ValidationError::IndexMismatch {
            index: block.index,
            expected: prev_block.index + 1,
        });
    }

    if block.previous_hash != prev_block.hash {
        return Err(ValidationError::PreviousHashMismatch { index: block.index });
    }

    let hash = block.compute_hash();
    if hash != block.hash {
        return Err(ValidationError::HashMismatch { index: block.index });
    }

    if !difficulty_met(&hash, difficulty) {
        return Err(ValidationError::DifficultyNotMet {
            index: block.index,
            difficulty,
        });
    }

    if block.transactions.is_empty()
        || block.transactions.len() > params.block_capacity
        || merkle_root(&block.transactions, params.block_capacity) != block.merkle_root
    {
        return Err(ValidationError::MerkleMismatch { index: block.index });
    }

    for tx in &block.transactions[1..] {
        validate_transaction(tx, utxo_set, keys, params)?;
    }

    Ok(())
}

/// Walk a candidate chain from index 1, validating each block against
/// its predecessor while threading the unspent set, pool, and next-id
/// forward exactly as committing each block would.
///
/// Double spends across blocks surface as `UnknownInput` from the
/// threaded set; conflicting spends inside one block surface as an
/// invariant violation from the state transition. Success returns the
/// end state, safe to adopt wholesale.
pub fn validate_chain(
    chain: &[Block],
    pool: TransactionPool,
    difficulty: f64,
    keys: &KeyRegistry,
    params: &ChainParams,
) -> Result<ChainSnapshot, LedgerError> {
    let mut snapshot = ChainSnapshot {
        utxo_set: UtxoSet::new(),
        pool,
        next_id: 0,
    };

    for i in 1..chain.len() {
        validate_block(
            &chain[i - 1],
            &chain[i],
            difficulty,
            &snapshot.utxo_set,
            keys,
            params,
        )?;
        let (utxo_set, pool, next_id) =
            apply_block(&chain[i], snapshot.utxo_set, snapshot.pool, snapshot.next_id)?;
        snapshot = ChainSnapshot {
            utxo_set,
            pool,
            next_id,
        };
    }

    Ok(snapshot)
}
