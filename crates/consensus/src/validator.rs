//! Block validation rules.
//!
//! These checks let any reader audit a stored block without trusting the
//! miner: the proof of work is recomputed, the stored hash compared, and
//! the link to the parent verified.

use crate::pow::{ConsensusError, ProofOfWork};
use powchain_core::{Block, CodecError, Hash, Transaction};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("proof of work does not meet the target")]
    InvalidProofOfWork,

    #[error("stored hash {stored} does not match recomputed hash {computed}")]
    HashMismatch { stored: Hash, computed: Hash },

    #[error("block prev_hash mismatch (expected {expected:?}, got {got:?})")]
    InvalidPrevHash {
        expected: Option<Hash>,
        got: Option<Hash>,
    },

    #[error("difficulty mismatch (expected {expected}, got {got})")]
    InvalidDifficulty { expected: u32, got: u32 },

    #[error("transaction id does not match its contents: {0}")]
    TransactionIdMismatch(Hash),

    #[error("duplicate transaction in block: {0}")]
    DuplicateTransaction(Hash),

    #[error("coinbase transaction is not the first in the block")]
    MisplacedCoinbase,
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Block validator.
pub struct BlockValidator;

impl BlockValidator {
    /// Recompute the proof of work and compare it with the stored hash.
    pub fn validate_pow(block: &Block) -> Result<()> {
        let pow = ProofOfWork::new(block)?;
        let computed = pow.hash_with_nonce(block.header.nonce);

        if computed != block.hash {
            return Err(ValidationError::HashMismatch {
                stored: block.hash,
                computed,
            });
        }
        if !pow.validate() {
            return Err(ValidationError::InvalidProofOfWork);
        }

        Ok(())
    }

    /// Validate block extends the parent correctly (None means genesis).
    pub fn validate_block_extends_parent(block: &Block, parent_hash: Option<Hash>) -> Result<()> {
        if block.header.prev_hash != parent_hash {
            return Err(ValidationError::InvalidPrevHash {
                expected: parent_hash,
                got: block.header.prev_hash,
            });
        }
        Ok(())
    }

    /// Validate the block was mined at the chain's difficulty.
    pub fn validate_difficulty(block: &Block, difficulty_bits: u32) -> Result<()> {
        if block.header.difficulty_bits != difficulty_bits {
            return Err(ValidationError::InvalidDifficulty {
                expected: difficulty_bits,
                got: block.header.difficulty_bits,
            });
        }
        Ok(())
    }

    /// Validate transaction ids, uniqueness and coinbase placement.
    pub fn validate_block_transactions(block: &Block) -> Result<()> {
        Self::validate_transactions(block.transactions())
    }

    /// Transaction checks for a payload that has not been sealed into a block yet.
    pub fn validate_transactions(transactions: &[Transaction]) -> Result<()> {
        let mut seen = HashSet::new();
        for (index, tx) in transactions.iter().enumerate() {
            if !tx.verify_id()? {
                return Err(ValidationError::TransactionIdMismatch(tx.id));
            }
            if !seen.insert(tx.id) {
                return Err(ValidationError::DuplicateTransaction(tx.id));
            }
            if index > 0 && tx.is_coinbase() {
                return Err(ValidationError::MisplacedCoinbase);
            }
        }
        Ok(())
    }

    /// Full validation of a block against its expected parent.
    pub fn validate_full(block: &Block, parent_hash: Option<Hash>) -> Result<()> {
        Self::validate_block_extends_parent(block, parent_hash)?;
        Self::validate_pow(block)?;
        Self::validate_block_transactions(block)?;
        Ok(())
    }
}
