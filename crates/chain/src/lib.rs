//! Blockchain orchestration for powchain.
//!
//! This crate brings together all components to create a working ledger:
//! - **Consensus**: proof-of-work mining and block validation
//! - **Storage**: persisted blocks and an atomically advanced tip
//! - **UTXO**: unspent-output scans, balances and transfers
//!
//! # Example
//!
//! ```rust,no_run
//! use powchain_chain::{Blockchain, BlockchainConfig};
//! use powchain_storage::Storage;
//!
//! let storage = Storage::open("./blockchain_data").unwrap();
//! let blockchain =
//!     Blockchain::create(&storage, BlockchainConfig::with_difficulty(16), "alice").unwrap();
//!
//! blockchain.send("alice", "bob", 20).unwrap();
//! println!("bob has {}", blockchain.get_balance("bob").unwrap());
//!
//! for block in blockchain.iter() {
//!     let block = block.unwrap();
//!     println!("{} <- {:?}", block.hash, block.header.prev_hash);
//! }
//! ```

pub mod blockchain;
pub mod iterator;
pub mod utxo;

// Re-export commonly used types
pub use blockchain::{Blockchain, BlockchainConfig, BlockchainError, Result};
pub use iterator::ChainIterator;
pub use utxo::{scan_unspent, sum_values, UnspentTransaction};
