//! Transactions in the unspent-output model.
//!
//! Ownership is a plain string match between an output's locking data and
//! an input's unlocking data. Nothing here verifies a signature: anyone who
//! knows an address can spend its outputs.

use crate::codec::{self, CodecError};
use crate::hash::{hash, Hash};
use serde::{Deserialize, Serialize};

/// Block reward paid by a coinbase transaction.
pub const SUBSIDY: u64 = 50;

/// Output index carried by the synthetic coinbase input.
pub const COINBASE_VOUT: i64 = -1;

/// A spendable amount locked to an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    /// Address allowed to spend this output.
    pub locking_data: String,
}

impl TxOutput {
    pub fn new(value: u64, address: impl Into<String>) -> Self {
        Self {
            value,
            locking_data: address.into(),
        }
    }

    /// Whether `address` owns this output. Exact string comparison.
    pub fn can_be_unlocked_with(&self, address: &str) -> bool {
        self.locking_data == address
    }
}

/// A reference to an output of an earlier transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Id of the transaction holding the referenced output; None for coinbase.
    pub txid: Option<Hash>,
    /// Index of the referenced output, or [`COINBASE_VOUT`].
    pub vout: i64,
    /// Address claiming the output (or free text for coinbase).
    pub unlocking_data: String,
}

impl TxInput {
    pub fn new(txid: Hash, vout: usize, address: impl Into<String>) -> Self {
        Self {
            txid: Some(txid),
            vout: vout as i64,
            unlocking_data: address.into(),
        }
    }

    /// Whether this input was made by `address`. Exact string comparison.
    pub fn can_unlock_output_with(&self, address: &str) -> bool {
        self.unlocking_data == address
    }

    /// The `(txid, output index)` this input spends, if it spends anything.
    pub fn outpoint(&self) -> Option<(Hash, usize)> {
        let txid = self.txid?;
        let vout = usize::try_from(self.vout).ok()?;
        Some((txid, vout))
    }
}

/// A transaction with a content-addressed id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// SHA-256 of the canonical encoding of inputs and outputs.
    pub id: Hash,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

/// The part of a transaction covered by its id.
#[derive(Serialize)]
struct TransactionBody<'a> {
    inputs: &'a [TxInput],
    outputs: &'a [TxOutput],
}

impl Transaction {
    /// Build a transaction and compute its id.
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Result<Self, CodecError> {
        let id = Self::compute_id(&inputs, &outputs)?;
        Ok(Self {
            id,
            inputs,
            outputs,
        })
    }

    /// Create a coinbase transaction paying [`SUBSIDY`] to `to`.
    ///
    /// An empty note defaults to `Reward to '<to>'`.
    pub fn coinbase(to: &str, note: &str) -> Result<Self, CodecError> {
        let note = if note.is_empty() {
            format!("Reward to '{}'", to)
        } else {
            note.to_string()
        };

        let input = TxInput {
            txid: None,
            vout: COINBASE_VOUT,
            unlocking_data: note,
        };
        Self::new(vec![input], vec![TxOutput::new(SUBSIDY, to)])
    }

    fn compute_id(inputs: &[TxInput], outputs: &[TxOutput]) -> Result<Hash, CodecError> {
        let encoded = codec::encode(&TransactionBody { inputs, outputs })?;
        Ok(hash(&encoded))
    }

    /// Check that the stored id matches the transaction contents.
    pub fn verify_id(&self) -> Result<bool, CodecError> {
        Ok(Self::compute_id(&self.inputs, &self.outputs)? == self.id)
    }

    /// True iff this is a coinbase: one input, no txid, index -1.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1
            && self.inputs[0].txid.is_none()
            && self.inputs[0].vout == COINBASE_VOUT
    }
}
