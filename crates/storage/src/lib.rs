//! Persistent storage layer for powchain.
//!
//! This crate provides the storage backend for the blockchain:
//! - Block storage keyed by block hash
//! - Tip tracking under a reserved key
//! - Atomic block admission (block write + tip update in one transaction)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Application Layer                     │
//! │          (Blockchain: mining, iteration, UTXO)           │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                   Storage Layer                          │
//! │  ┌──────────────────────────┐  ┌─────────────────────┐  │
//! │  │ ChainStore               │  │ Storage (DB)        │  │
//! │  │  - hash → block          │  │  - sled wrapper     │  │
//! │  │  - tip pointer           │  │  - named trees      │  │
//! │  │  - atomic append         │  │  - flush on commit  │  │
//! │  └──────────────────────────┘  └─────────────────────┘  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                    sled Database                         │
//! │              (Embedded Key-Value Store)                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use powchain_storage::{ChainStore, Storage, DEFAULT_NAMESPACE};
//!
//! let storage = Storage::open("./blockchain_data").unwrap();
//! let chain = ChainStore::new(&storage, DEFAULT_NAMESPACE).unwrap();
//!
//! if let Some(tip) = chain.get_tip().unwrap() {
//!     println!("tip: {}", tip);
//! }
//! ```

pub mod chain;
pub mod db;

// Re-export commonly used types
pub use chain::{ChainStore, DEFAULT_NAMESPACE};
pub use db::{Result, Storage, StorageError};
