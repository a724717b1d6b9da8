//! Unspent-output scanning.
//!
//! The scan walks blocks newest to oldest. Spends are recorded as they are
//! seen, so by the time an output's defining transaction is reached every
//! later input that consumed it has already been recorded. Transactions
//! inside a block are visited in reverse for the same reason.

use crate::blockchain::{BlockchainError, Result};
use powchain_core::{Block, Hash, Transaction, TxOutput};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A transaction holding at least one unspent output for the scanned address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentTransaction {
    pub transaction: Transaction,
    /// Indices of the outputs that are unspent and owned by the address.
    pub output_indices: Vec<usize>,
}

impl UnspentTransaction {
    /// The unspent outputs, in index order.
    pub fn outputs(&self) -> impl Iterator<Item = (usize, &TxOutput)> + '_ {
        self.output_indices
            .iter()
            .map(move |&index| (index, &self.transaction.outputs[index]))
    }

    /// Total value of the unspent outputs.
    pub fn value(&self) -> Result<u64> {
        sum_values(self.outputs().map(|(_, output)| output))
    }
}

/// Sum output values, failing instead of wrapping past `u64::MAX`.
pub fn sum_values<'o>(outputs: impl IntoIterator<Item = &'o TxOutput>) -> Result<u64> {
    outputs.into_iter().try_fold(0u64, |total, output| {
        total
            .checked_add(output.value)
            .ok_or(BlockchainError::ValueOverflow)
    })
}

/// Collect the unspent outputs owned by `address` from blocks ordered tip to genesis.
pub fn scan_unspent<I>(blocks: I, address: &str) -> Result<Vec<UnspentTransaction>>
where
    I: IntoIterator<Item = Result<Block>>,
{
    let mut spent: HashMap<Hash, HashSet<usize>> = HashMap::new();
    let mut unspent = Vec::new();
    let mut scanned = 0usize;

    for block in blocks {
        let block = block?;
        scanned += 1;

        for tx in block.transactions().iter().rev() {
            let spent_here = spent.get(&tx.id);
            let output_indices: Vec<usize> = tx
                .outputs
                .iter()
                .enumerate()
                .filter(|(index, _)| !spent_here.is_some_and(|set| set.contains(index)))
                .filter(|(_, output)| output.can_be_unlocked_with(address))
                .map(|(index, _)| index)
                .collect();

            if !output_indices.is_empty() {
                unspent.push(UnspentTransaction {
                    transaction: tx.clone(),
                    output_indices,
                });
            }

            if tx.is_coinbase() {
                continue;
            }
            for input in &tx.inputs {
                if !input.can_unlock_output_with(address) {
                    continue;
                }
                if let Some((txid, vout)) = input.outpoint() {
                    spent.entry(txid).or_default().insert(vout);
                }
            }
        }
    }

    debug!(address, blocks = scanned, found = unspent.len(), "scanned for unspent outputs");
    Ok(unspent)
}
