//! Proof of Work (PoW) consensus implementation.
//!
//! A block is admissible when the SHA-256 of its header material, read as a
//! 256-bit big-endian integer, is strictly below `2^(256 - difficulty_bits)`.
//! Miners search nonces sequentially from zero, so the first valid nonce is
//! deterministic for a given block template.

use powchain_core::{hash, Block, Hash, Payload};
use thiserror::Error;
use tracing::debug;

/// Difficulty used when none is configured.
pub const DEFAULT_DIFFICULTY_BITS: u32 = 16;

/// Nonce ceiling: the largest signed 64-bit value.
pub const MAX_NONCE: u64 = i64::MAX as u64;

/// Errors that can occur during consensus operations.
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("nonce search exhausted: no valid hash below nonce {max_nonce}")]
    MiningExhausted { max_nonce: u64 },

    #[error("difficulty bits must be within 1..=255, got {0}")]
    InvalidDifficulty(u32),
}

pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Proof of Work configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowConfig {
    /// Number of leading zero bits required in a block hash.
    pub difficulty_bits: u32,
    /// Exclusive upper bound of the nonce search.
    pub max_nonce: u64,
}

impl Default for PowConfig {
    fn default() -> Self {
        Self {
            difficulty_bits: DEFAULT_DIFFICULTY_BITS,
            max_nonce: MAX_NONCE,
        }
    }
}

impl PowConfig {
    /// Create a configuration with the given difficulty and the default nonce ceiling.
    pub fn new(difficulty_bits: u32) -> Self {
        Self {
            difficulty_bits,
            max_nonce: MAX_NONCE,
        }
    }

    /// Override the nonce ceiling.
    pub fn with_max_nonce(mut self, max_nonce: u64) -> Self {
        self.max_nonce = max_nonce;
        self
    }

    /// The target hash for this configuration.
    pub fn target(&self) -> Result<Hash> {
        target_for(self.difficulty_bits)
    }
}

/// Compute `2^(256 - difficulty_bits)` as a big-endian 32-byte value.
pub fn target_for(difficulty_bits: u32) -> Result<Hash> {
    if !(1..=255).contains(&difficulty_bits) {
        return Err(ConsensusError::InvalidDifficulty(difficulty_bits));
    }
    let bit = (256 - difficulty_bits) as usize;
    let mut target = [0u8; 32];
    target[31 - bit / 8] = 1 << (bit % 8);
    Ok(Hash(target))
}

/// Lowercase hex without padding; negatives carry a leading '-'.
fn int_to_hex(n: i64) -> String {
    if n < 0 {
        format!("-{:x}", n.unsigned_abs())
    } else {
        format!("{:x}", n)
    }
}

/// A proof-of-work search over one block template.
pub struct ProofOfWork<'a> {
    block: &'a Block,
    target: Hash,
    /// Everything hashed before the nonce; identical for every candidate.
    prefix: Vec<u8>,
}

impl<'a> ProofOfWork<'a> {
    /// Prepare a search for `block` at the difficulty recorded in its header.
    pub fn new(block: &'a Block) -> Result<Self> {
        let header = &block.header;
        let target = target_for(header.difficulty_bits)?;

        let mut prefix = block.payload.pow_bytes();
        prefix.extend_from_slice(header.prev_hash_bytes());
        prefix.extend_from_slice(int_to_hex(header.timestamp).as_bytes());
        prefix.extend_from_slice(int_to_hex(header.difficulty_bits as i64).as_bytes());

        Ok(Self {
            block,
            target,
            prefix,
        })
    }

    /// The target this search must beat.
    pub fn target(&self) -> Hash {
        self.target
    }

    /// Bytes hashed for a candidate nonce:
    /// payload || prev_hash || hex(timestamp) || hex(difficulty_bits) || hex(nonce).
    pub fn prepare_data(&self, nonce: u64) -> Vec<u8> {
        let nonce_hex = format!("{:x}", nonce);
        let mut data = Vec::with_capacity(self.prefix.len() + nonce_hex.len());
        data.extend_from_slice(&self.prefix);
        data.extend_from_slice(nonce_hex.as_bytes());
        data
    }

    /// Hash of the header material for a candidate nonce.
    pub fn hash_with_nonce(&self, nonce: u64) -> Hash {
        hash(&self.prepare_data(nonce))
    }

    /// Search nonces `0..max_nonce` in ascending order for the first hash below target.
    pub fn run(&self, max_nonce: u64) -> Result<(u64, Hash)> {
        debug!(
            difficulty_bits = self.block.header.difficulty_bits,
            "mining block"
        );

        let found = (0..max_nonce)
            .map(|nonce| (nonce, self.hash_with_nonce(nonce)))
            .find(|(_, candidate)| *candidate < self.target);

        match found {
            Some((nonce, digest)) => {
                debug!(nonce, hash = %digest, "found proof of work");
                Ok((nonce, digest))
            }
            None => Err(ConsensusError::MiningExhausted { max_nonce }),
        }
    }

    /// Re-derive the hash for the block's recorded nonce and check it against the target.
    pub fn validate(&self) -> bool {
        self.hash_with_nonce(self.block.header.nonce) < self.target
    }
}

/// Builds sealed blocks by running the proof-of-work search.
pub struct BlockMiner {
    config: PowConfig,
}

impl BlockMiner {
    /// Create a new miner with the given config.
    pub fn new(config: PowConfig) -> Self {
        Self { config }
    }

    /// Mine a block on top of `prev_hash`. Blocks for the whole search.
    pub fn mine_block(&self, payload: Payload, prev_hash: Hash) -> Result<Block> {
        self.mine(payload, Some(prev_hash))
    }

    /// Mine the genesis block (no previous hash).
    pub fn mine_genesis(&self, payload: Payload) -> Result<Block> {
        self.mine(payload, None)
    }

    fn mine(&self, payload: Payload, prev_hash: Option<Hash>) -> Result<Block> {
        let block = Block::new(payload, prev_hash, self.config.difficulty_bits);
        let (nonce, digest) = ProofOfWork::new(&block)?.run(self.config.max_nonce)?;
        Ok(block.seal(nonce, digest))
    }
}
