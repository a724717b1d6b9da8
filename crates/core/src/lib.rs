//! Core blockchain primitives for powchain.
//!
//! This crate provides the fundamental types used throughout the blockchain:
//! - SHA-256 hashing
//! - The canonical bincode codec
//! - Blocks, block headers and payloads
//! - Transactions in the unspent-output model

pub mod block;
pub mod codec;
pub mod hash;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use block::{hash_transactions, Block, BlockHeader, Payload};
pub use codec::CodecError;
pub use hash::{hash, hash_concat, Hash, H256};
pub use transaction::{Transaction, TxInput, TxOutput, COINBASE_VOUT, SUBSIDY};
