//! Proof of Work consensus for powchain.
//!
//! This crate provides the proof-of-work admission rules:
//! - Target computation from a fixed difficulty
//! - Sequential nonce search and block sealing
//! - Block validation (proof of work, stored hash, parent links)
//!
//! # Example
//!
//! ```rust,no_run
//! use powchain_consensus::{BlockMiner, BlockValidator, PowConfig};
//! use powchain_core::Payload;
//!
//! let miner = BlockMiner::new(PowConfig::new(16));
//! let genesis = miner
//!     .mine_genesis(Payload::Data(b"Genesis Block".to_vec()))
//!     .unwrap();
//!
//! BlockValidator::validate_full(&genesis, None).unwrap();
//! ```

pub mod pow;
pub mod validator;

// Re-export commonly used types
pub use pow::{
    target_for, BlockMiner, ConsensusError, PowConfig, ProofOfWork, DEFAULT_DIFFICULTY_BITS,
    MAX_NONCE,
};
pub use validator::{BlockValidator, ValidationError};
