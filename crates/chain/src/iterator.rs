//! Tip-to-genesis chain traversal.

use crate::blockchain::Result;
use powchain_core::{Block, Hash};
use powchain_storage::ChainStore;
use std::iter::FusedIterator;

/// Walks the chain backwards from the tip it was created at.
///
/// Each step loads one block and moves to its prev_hash; iteration ends
/// after the genesis block or after the first error. A new iterator is
/// needed to start again from the tip.
pub struct ChainIterator<'a> {
    store: &'a ChainStore<'a>,
    current: Option<Hash>,
}

impl<'a> ChainIterator<'a> {
    pub(crate) fn new(store: &'a ChainStore<'a>, tip: Hash) -> Self {
        Self {
            store,
            current: Some(tip),
        }
    }

    /// Hash of the block the next call will return, if any.
    pub fn current_hash(&self) -> Option<Hash> {
        self.current
    }
}

impl Iterator for ChainIterator<'_> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.current.take()?;
        match self.store.get_block_or_err(&hash) {
            Ok(block) => {
                self.current = block.header.prev_hash;
                Some(Ok(block))
            }
            Err(err) => Some(Err(err.into())),
        }
    }
}

impl FusedIterator for ChainIterator<'_> {}
