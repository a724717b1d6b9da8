//! Block and block header structures.

use crate::codec::{self, CodecError};
use crate::hash::{hash_concat, Hash};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// What a block carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Opaque bytes, hashed as-is.
    Data(Vec<u8>),
    /// Ordered transactions, hashed through their ids.
    Ledger(Vec<Transaction>),
}

impl Payload {
    /// The bytes proof-of-work commits to.
    pub fn pow_bytes(&self) -> Vec<u8> {
        match self {
            Payload::Data(data) => data.clone(),
            Payload::Ledger(transactions) => hash_transactions(transactions).0.to_vec(),
        }
    }

    /// Transactions carried by this payload (empty in data mode).
    pub fn transactions(&self) -> &[Transaction] {
        match self {
            Payload::Data(_) => &[],
            Payload::Ledger(transactions) => transactions,
        }
    }
}

impl From<Vec<Transaction>> for Payload {
    fn from(transactions: Vec<Transaction>) -> Self {
        Payload::Ledger(transactions)
    }
}

/// SHA-256 over the concatenated transaction ids, in stored order.
pub fn hash_transactions(transactions: &[Transaction]) -> Hash {
    let ids: Vec<&[u8]> = transactions.iter().map(|tx| tx.id.as_ref()).collect();
    hash_concat(&ids)
}

/// The header of a block containing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    /// Hash of the previous block; None only for genesis.
    pub prev_hash: Option<Hash>,
    /// Leading zero bits the block hash was mined against.
    pub difficulty_bits: u32,
    /// Nonce found by the proof-of-work search.
    pub nonce: u64,
}

impl BlockHeader {
    /// Get the current Unix timestamp.
    pub fn current_timestamp() -> i64 {
        // A clock before 1970 yields a negative offset rather than a panic.
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs() as i64,
            Err(err) => -(err.duration().as_secs() as i64),
        }
    }

    /// Previous hash as the raw bytes fed to proof-of-work (empty for genesis).
    pub fn prev_hash_bytes(&self) -> &[u8] {
        match &self.prev_hash {
            Some(hash) => hash.as_ref(),
            None => &[],
        }
    }
}

/// A block: header, payload and the proof-of-work hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub payload: Payload,
    /// Digest found by mining; ZERO until the block is sealed.
    pub hash: Hash,
}

impl Block {
    /// Create an unsealed block stamped with the current time.
    ///
    /// The block is not admissible until a miner seals it.
    pub fn new(payload: Payload, prev_hash: Option<Hash>, difficulty_bits: u32) -> Self {
        Self {
            header: BlockHeader {
                timestamp: BlockHeader::current_timestamp(),
                prev_hash,
                difficulty_bits,
                nonce: 0,
            },
            payload,
            hash: Hash::ZERO,
        }
    }

    /// Record the proof-of-work result.
    pub fn seal(mut self, nonce: u64, hash: Hash) -> Self {
        self.header.nonce = nonce;
        self.hash = hash;
        self
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.header.prev_hash.is_none()
    }

    /// Transactions in this block (empty in data mode).
    pub fn transactions(&self) -> &[Transaction] {
        self.payload.transactions()
    }

    /// Hash of the transaction ids (ledger mode).
    pub fn hash_transactions(&self) -> Hash {
        hash_transactions(self.transactions())
    }

    /// Encode the block for persistence.
    pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(self)
    }

    /// Decode a persisted block.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CodecError> {
        codec::decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash;

    #[test]
    fn test_unsealed_block() {
        let block = Block::new(Payload::Data(b"Genesis Block".to_vec()), None, 8);

        assert!(block.is_genesis());
        assert_eq!(block.header.nonce, 0);
        assert_eq!(block.hash, Hash::ZERO);
        assert!(block.header.prev_hash_bytes().is_empty());
    }

    #[test]
    fn test_seal_sets_nonce_and_hash() {
        let prev = hash(b"parent");
        let block = Block::new(Payload::Data(vec![1, 2, 3]), Some(prev), 8).seal(42, hash(b"x"));

        assert!(!block.is_genesis());
        assert_eq!(block.header.nonce, 42);
        assert_eq!(block.hash, hash(b"x"));
        assert_eq!(block.header.prev_hash_bytes(), prev.as_ref());
    }

    #[test]
    fn test_serialize_roundtrip_preserves_empty_fields() {
        let genesis = Block::new(Payload::Data(Vec::new()), None, 8).seal(7, hash(b"g"));
        let decoded = Block::deserialize(&genesis.serialize().unwrap()).unwrap();
        assert_eq!(decoded, genesis);
        assert!(decoded.header.prev_hash.is_none());

        let coinbase = Transaction::coinbase("alice", "").unwrap();
        let ledger = Block::new(vec![coinbase].into(), Some(genesis.hash), 8).seal(1, hash(b"l"));
        let decoded = Block::deserialize(&ledger.serialize().unwrap()).unwrap();
        assert_eq!(decoded, ledger);
    }

    #[test]
    fn test_deserialize_truncated_fails() {
        let block = Block::new(Payload::Data(b"data".to_vec()), None, 8);
        let bytes = block.serialize().unwrap();
        assert!(Block::deserialize(&bytes[..bytes.len() / 2]).is_err());
        assert!(Block::deserialize(&[]).is_err());
    }

    #[test]
    fn test_hash_transactions_is_order_sensitive() {
        let a = Transaction::coinbase("alice", "").unwrap();
        let b = Transaction::coinbase("bob", "").unwrap();

        let ab = hash_transactions(&[a.clone(), b.clone()]);
        let ba = hash_transactions(&[b.clone(), a.clone()]);
        assert_ne!(ab, ba);
        assert_eq!(ab, hash_concat(&[a.id.as_ref(), b.id.as_ref()]));
    }

    #[test]
    fn test_pow_bytes() {
        assert_eq!(Payload::Data(b"abc".to_vec()).pow_bytes(), b"abc".to_vec());

        let tx = Transaction::coinbase("alice", "").unwrap();
        let payload = Payload::Ledger(vec![tx.clone()]);
        assert_eq!(payload.pow_bytes(), hash(tx.id.as_ref()).0.to_vec());
        assert_eq!(payload.transactions().len(), 1);
    }
}
