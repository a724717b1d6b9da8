//! sled database wrapper.

use powchain_core::{CodecError, Hash};
use sled::transaction::TransactionError;
use sled::{Db, Tree};
use std::path::Path;
use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Codec(#[from] CodecError),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Tip moved: expected {expected:?}, found {actual:?}")]
    TipMismatch {
        expected: Option<Hash>,
        actual: Option<Hash>,
    },

    #[error("Invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("Corrupted store: {0}")]
    Corrupted(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

impl From<TransactionError<StorageError>> for StorageError {
    fn from(err: TransactionError<StorageError>) -> Self {
        match err {
            TransactionError::Abort(inner) => inner,
            TransactionError::Storage(inner) => StorageError::Database(inner),
        }
    }
}

/// Owning handle to the sled database.
///
/// The database is flushed and released when the handle is dropped.
pub struct Storage {
    db: Db,
}

impl Storage {
    /// Open a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Open an in-memory database (for testing).
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Open (creating if needed) a named keyspace.
    pub fn open_tree(&self, name: &str) -> Result<Tree> {
        Ok(self.db.open_tree(name)?)
    }

    /// Get the underlying sled database.
    pub fn inner(&self) -> &Db {
        &self.db
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
