//! Block storage and tip tracking.
//!
//! Layout inside the namespace tree:
//! - `{block hash}` (32 bytes) → encoded block
//! - `l` → hash of the current tip
//!
//! The tip only ever moves inside a sled transaction that also writes the
//! block it points to, so readers never see a tip whose block is missing.

use crate::db::{Result, Storage, StorageError};
use powchain_core::{Block, Hash};
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult};
use sled::Tree;
use tracing::warn;

/// Reserved key holding the current tip hash.
const TIP_KEY: &[u8] = b"l";

type TxResult<T> = ConflictableTransactionResult<T, StorageError>;

/// Default namespace for blocks.
pub const DEFAULT_NAMESPACE: &str = "blocks";

fn decode_tip(bytes: &[u8]) -> Result<Hash> {
    Hash::from_slice(bytes)
        .ok_or_else(|| StorageError::Corrupted(format!("tip has {} bytes", bytes.len())))
}

/// Manages block storage and the tip pointer.
pub struct ChainStore<'a> {
    storage: &'a Storage,
    blocks: Tree,
}

impl<'a> ChainStore<'a> {
    /// Open the block namespace inside the given storage.
    pub fn new(storage: &'a Storage, namespace: &str) -> Result<Self> {
        let blocks = storage.open_tree(namespace)?;
        Ok(Self { storage, blocks })
    }

    // =========================================================================
    // Block Storage
    // =========================================================================

    /// Get a block by its hash.
    pub fn get_block(&self, hash: &Hash) -> Result<Option<Block>> {
        match self.blocks.get(hash)? {
            Some(bytes) => Ok(Some(Block::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Get a block by its hash, returning error if not found.
    pub fn get_block_or_err(&self, hash: &Hash) -> Result<Block> {
        self.get_block(hash)?
            .ok_or_else(|| StorageError::NotFound(format!("block {}", hash)))
    }

    /// Check if a block exists by hash.
    pub fn has_block(&self, hash: &Hash) -> Result<bool> {
        Ok(self.blocks.contains_key(hash)?)
    }

    // =========================================================================
    // Tip Tracking
    // =========================================================================

    /// Get the current tip hash.
    pub fn get_tip(&self) -> Result<Option<Hash>> {
        match self.blocks.get(TIP_KEY)? {
            Some(bytes) => Ok(Some(decode_tip(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Check if the chain is initialized (has a tip).
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.blocks.contains_key(TIP_KEY)?)
    }

    /// Get the block the tip points to.
    pub fn get_latest_block(&self) -> Result<Option<Block>> {
        match self.get_tip()? {
            Some(hash) => self.get_block(&hash),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Chain Operations
    // =========================================================================

    /// Store the genesis block and point the tip at it, unless a tip exists.
    ///
    /// Returns the tip after the call: the new genesis hash, or the existing
    /// tip untouched when the chain was already initialized.
    pub fn init_genesis(&self, genesis: &Block) -> Result<Hash> {
        if !genesis.is_genesis() {
            return Err(StorageError::InvalidGenesis(
                "genesis block must not have a previous hash".into(),
            ));
        }

        let encoded = genesis.serialize()?;
        let hash = genesis.hash;

        let tip = self.blocks.transaction(|tx| -> TxResult<Hash> {
            if let Some(existing) = tx.get(TIP_KEY)? {
                return decode_tip(&existing).map_err(ConflictableTransactionError::Abort);
            }
            tx.insert(&hash.0[..], encoded.as_slice())?;
            tx.insert(TIP_KEY, &hash.0[..])?;
            Ok(hash)
        })?;

        self.storage.flush()?;
        Ok(tip)
    }

    /// Append a block whose prev_hash must equal the stored tip.
    ///
    /// The block write and the tip update commit together; on any failure
    /// the store still holds the old tip.
    pub fn append_block(&self, block: &Block) -> Result<()> {
        let expected = block.header.prev_hash.ok_or_else(|| {
            StorageError::InvalidGenesis("cannot append a block without a previous hash".into())
        })?;

        let encoded = block.serialize()?;
        let hash = block.hash;

        let result = self.blocks.transaction(|tx| -> TxResult<()> {
            let actual = match tx.get(TIP_KEY)? {
                Some(bytes) => {
                    Some(decode_tip(&bytes).map_err(ConflictableTransactionError::Abort)?)
                }
                None => None,
            };
            if actual != Some(expected) {
                return Err(ConflictableTransactionError::Abort(StorageError::TipMismatch {
                    expected: Some(expected),
                    actual,
                }));
            }
            tx.insert(&hash.0[..], encoded.as_slice())?;
            tx.insert(TIP_KEY, &hash.0[..])?;
            Ok(())
        });

        if let Err(err) = result {
            let err = StorageError::from(err);
            if let StorageError::TipMismatch { .. } = err {
                warn!(block = %hash, "rejected block: tip moved");
            }
            return Err(err);
        }

        self.storage.flush()?;
        Ok(())
    }
}
