//! Main blockchain orchestration.
//!
//! This module brings together storage, proof of work and the unspent-output
//! model. A `Blockchain` is the single writer for its namespace: admissions
//! are serialized behind the tip lock, and each one commits its block and
//! the new tip in a single storage transaction.

use crate::iterator::ChainIterator;
use crate::utxo::{scan_unspent, sum_values, UnspentTransaction};
use powchain_consensus::{BlockMiner, BlockValidator, PowConfig};
use powchain_core::{Block, CodecError, Hash, Payload, Transaction, TxInput, TxOutput};
use powchain_storage::{ChainStore, Storage, DEFAULT_NAMESPACE};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("storage error: {0}")]
    Storage(#[from] powchain_storage::StorageError),

    #[error("consensus error: {0}")]
    Consensus(#[from] powchain_consensus::ConsensusError),

    #[error("validation error: {0}")]
    Validation(#[from] powchain_consensus::ValidationError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("no existing blockchain found; create one first")]
    NotInitialized,

    #[error("block {found} stored under key {expected}")]
    MisplacedBlock { expected: Hash, found: Hash },

    #[error("insufficient funds for '{address}': available {available}, required {required}")]
    InsufficientFunds {
        address: String,
        available: u64,
        required: u64,
    },

    #[error("transfer amount must be positive")]
    InvalidAmount,

    #[error("output values overflow u64")]
    ValueOverflow,
}

pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Blockchain configuration.
#[derive(Debug, Clone)]
pub struct BlockchainConfig {
    /// Proof-of-work configuration.
    pub pow: PowConfig,
    /// Storage namespace holding blocks and the tip.
    pub namespace: String,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            pow: PowConfig::default(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl BlockchainConfig {
    /// Default namespace with the given difficulty.
    pub fn with_difficulty(difficulty_bits: u32) -> Self {
        Self {
            pow: PowConfig::new(difficulty_bits),
            ..Self::default()
        }
    }
}

/// Main blockchain struct that orchestrates all components.
pub struct Blockchain<'a> {
    /// Chain store for blocks and the tip.
    chain: ChainStore<'a>,
    /// Proof-of-work miner.
    miner: BlockMiner,
    /// Hash of the last admitted block. Held for the whole of an admission.
    tip: Mutex<Hash>,
    /// Configuration.
    config: BlockchainConfig,
}

impl<'a> Blockchain<'a> {
    /// Create a ledger whose genesis block pays the coinbase subsidy to `address`.
    ///
    /// Idempotent: an existing chain is loaded as-is.
    pub fn create(storage: &'a Storage, config: BlockchainConfig, address: &str) -> Result<Self> {
        let coinbase = Transaction::coinbase(address, "")?;
        Self::create_with_genesis(storage, config, Payload::Ledger(vec![coinbase]))
    }

    /// Create a chain with an arbitrary genesis payload, or load the existing one.
    pub fn create_with_genesis(
        storage: &'a Storage,
        config: BlockchainConfig,
        genesis_payload: Payload,
    ) -> Result<Self> {
        let chain = ChainStore::new(storage, &config.namespace)?;
        let miner = BlockMiner::new(config.pow.clone());

        let tip = match chain.get_tip()? {
            Some(tip) => {
                info!(%tip, "blockchain already exists, loading tip");
                tip
            }
            None => {
                let genesis = miner.mine_genesis(genesis_payload)?;
                let tip = chain.init_genesis(&genesis)?;
                info!(hash = %genesis.hash, nonce = genesis.header.nonce, "created genesis block");
                tip
            }
        };

        Ok(Self {
            chain,
            miner,
            tip: Mutex::new(tip),
            config,
        })
    }

    /// Open an existing chain.
    pub fn open(storage: &'a Storage, config: BlockchainConfig) -> Result<Self> {
        let chain = ChainStore::new(storage, &config.namespace)?;
        let tip = chain.get_tip()?.ok_or(BlockchainError::NotInitialized)?;
        debug!(%tip, "opened blockchain");

        Ok(Self {
            chain,
            miner: BlockMiner::new(config.pow.clone()),
            tip: Mutex::new(tip),
            config,
        })
    }

    fn lock_tip(&self) -> MutexGuard<'_, Hash> {
        // The guarded value is a plain hash that is only replaced after a commit.
        self.tip.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get the configuration.
    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    /// Hash of the most recently admitted block.
    pub fn tip(&self) -> Hash {
        *self.lock_tip()
    }

    /// Get the latest block.
    pub fn get_latest_block(&self) -> Result<Block> {
        let tip = self.tip();
        Ok(self.chain.get_block_or_err(&tip)?)
    }

    /// The first block of the chain.
    pub fn get_genesis_block(&self) -> Result<Block> {
        self.iter().last().ok_or(BlockchainError::NotInitialized)?
    }

    /// Mine a block on the current tip and admit it.
    ///
    /// Blocks the caller for the whole proof-of-work search. The block and
    /// the new tip are committed together; on failure the tip is unchanged.
    pub fn mine_block(&self, payload: Payload) -> Result<Block> {
        let mut tip = self.lock_tip();
        self.mine_on_tip(&mut tip, payload)
    }

    /// Mine `payload` on the locked tip, commit it and advance the tip.
    fn mine_on_tip(&self, tip: &mut MutexGuard<'_, Hash>, payload: Payload) -> Result<Block> {
        BlockValidator::validate_transactions(payload.transactions())?;

        let block = self.miner.mine_block(payload, **tip)?;
        self.chain.append_block(&block)?;
        **tip = block.hash;

        info!(
            hash = %block.hash,
            nonce = block.header.nonce,
            txs = block.transactions().len(),
            "admitted block"
        );
        Ok(block)
    }

    /// Mine a data-mode block carrying raw bytes.
    pub fn add_block(&self, data: impl Into<Vec<u8>>) -> Result<Block> {
        self.mine_block(Payload::Data(data.into()))
    }

    /// Iterate from the current tip back to genesis.
    pub fn iter(&self) -> ChainIterator<'_> {
        ChainIterator::new(&self.chain, self.tip())
    }

    /// Number of blocks above genesis.
    pub fn height(&self) -> Result<u64> {
        let mut count = 0u64;
        for block in self.iter() {
            block?;
            count += 1;
        }
        Ok(count.saturating_sub(1))
    }

    /// Re-validate every stored block from tip to genesis.
    ///
    /// Returns the number of blocks checked.
    pub fn verify(&self) -> Result<u64> {
        let tip = self.tip();
        let mut expected = Some(tip);
        let mut checked = 0u64;

        for block in ChainIterator::new(&self.chain, tip) {
            let block = block?;
            let key = expected.ok_or(BlockchainError::NotInitialized)?;
            if block.hash != key {
                warn!(expected = %key, found = %block.hash, "block stored under wrong key");
                return Err(BlockchainError::MisplacedBlock {
                    expected: key,
                    found: block.hash,
                });
            }

            BlockValidator::validate_pow(&block)?;
            BlockValidator::validate_difficulty(&block, self.config.pow.difficulty_bits)?;
            BlockValidator::validate_block_transactions(&block)?;

            expected = block.header.prev_hash;
            checked += 1;
        }

        info!(blocks = checked, "chain verified");
        Ok(checked)
    }

    // =========================================================================
    // Unspent Outputs
    // =========================================================================

    /// Transactions holding unspent outputs owned by `address`, newest first.
    pub fn find_unspent_transactions(&self, address: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .scan_unspent(address)?
            .into_iter()
            .map(|unspent| unspent.transaction)
            .collect())
    }

    /// Unspent outputs owned by `address`.
    pub fn find_utxo(&self, address: &str) -> Result<Vec<TxOutput>> {
        Ok(self
            .scan_unspent(address)?
            .iter()
            .flat_map(|unspent| unspent.outputs().map(|(_, output)| output.clone()))
            .collect())
    }

    /// Sum of the unspent outputs owned by `address`.
    pub fn get_balance(&self, address: &str) -> Result<u64> {
        sum_values(&self.find_utxo(address)?)
    }

    /// Pick unspent outputs of `address` until `amount` is covered.
    ///
    /// Returns the accumulated value and the chosen `(txid, output index)` pairs.
    /// The value may fall short of `amount` when the balance is too low.
    pub fn find_spendable_outputs(
        &self,
        address: &str,
        amount: u64,
    ) -> Result<(u64, Vec<(Hash, usize)>)> {
        self.spendable_outputs_at(self.tip(), address, amount)
    }

    fn spendable_outputs_at(
        &self,
        tip: Hash,
        address: &str,
        amount: u64,
    ) -> Result<(u64, Vec<(Hash, usize)>)> {
        let mut accumulated = 0u64;
        let mut chosen = Vec::new();

        'scan: for unspent in self.scan_unspent_at(tip, address)? {
            for (index, output) in unspent.outputs() {
                if accumulated >= amount {
                    break 'scan;
                }
                accumulated = accumulated
                    .checked_add(output.value)
                    .ok_or(BlockchainError::ValueOverflow)?;
                chosen.push((unspent.transaction.id, index));
            }
        }

        Ok((accumulated, chosen))
    }

    /// Build a transaction moving `amount` from `from` to `to`, with change back to `from`.
    ///
    /// The outputs are chosen against the current tip. Use [`Blockchain::send`]
    /// to build and mine in one step without another admission in between.
    pub fn new_transfer(&self, from: &str, to: &str, amount: u64) -> Result<Transaction> {
        self.transfer_at(self.tip(), from, to, amount)
    }

    fn transfer_at(&self, tip: Hash, from: &str, to: &str, amount: u64) -> Result<Transaction> {
        if amount == 0 {
            return Err(BlockchainError::InvalidAmount);
        }

        let (accumulated, chosen) = self.spendable_outputs_at(tip, from, amount)?;
        if accumulated < amount {
            return Err(BlockchainError::InsufficientFunds {
                address: from.to_string(),
                available: accumulated,
                required: amount,
            });
        }

        let inputs = chosen
            .into_iter()
            .map(|(txid, index)| TxInput::new(txid, index, from))
            .collect();

        let mut outputs = vec![TxOutput::new(amount, to)];
        if accumulated > amount {
            outputs.push(TxOutput::new(accumulated - amount, from));
        }

        Ok(Transaction::new(inputs, outputs)?)
    }

    /// Transfer `amount` from `from` to `to` and mine the transaction into a block.
    ///
    /// The tip lock is held from choosing the inputs until the block is
    /// committed, so concurrent sends never pick the same output.
    pub fn send(&self, from: &str, to: &str, amount: u64) -> Result<Block> {
        let mut tip = self.lock_tip();
        let tx = self.transfer_at(*tip, from, to, amount)?;
        self.mine_on_tip(&mut tip, Payload::Ledger(vec![tx]))
    }

    fn scan_unspent(&self, address: &str) -> Result<Vec<UnspentTransaction>> {
        self.scan_unspent_at(self.tip(), address)
    }

    // Must not touch `self.tip`: callers may already hold the lock.
    fn scan_unspent_at(&self, tip: Hash, address: &str) -> Result<Vec<UnspentTransaction>> {
        scan_unspent(ChainIterator::new(&self.chain, tip), address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powchain_core::SUBSIDY;

    fn setup() -> Storage {
        Storage::open_temporary().unwrap()
    }

    fn config() -> BlockchainConfig {
        BlockchainConfig::with_difficulty(8)
    }

    #[test]
    fn test_create_blockchain() {
        let storage = setup();
        let blockchain = Blockchain::create(&storage, config(), "alice").unwrap();

        let genesis = blockchain.get_latest_block().unwrap();
        assert!(genesis.is_genesis());
        assert_eq!(genesis.hash, blockchain.tip());
        assert_eq!(blockchain.height().unwrap(), 0);
        assert!(genesis.transactions()[0].is_coinbase());
    }

    #[test]
    fn test_create_is_idempotent() {
        let storage = setup();
        let first = Blockchain::create(&storage, config(), "alice").unwrap().tip();
        let second = Blockchain::create(&storage, config(), "bob").unwrap().tip();

        assert_eq!(first, second);
    }

    #[test]
    fn test_open_without_chain_fails() {
        let storage = setup();
        let result = Blockchain::open(&storage, config());
        assert!(matches!(result, Err(BlockchainError::NotInitialized)));
    }

    #[test]
    fn test_genesis_block_records_difficulty() {
        let storage = setup();
        let blockchain = Blockchain::create(&storage, config(), "alice").unwrap();
        blockchain.add_block("later").unwrap();

        let genesis = blockchain.get_genesis_block().unwrap();
        assert!(genesis.is_genesis());
        assert_eq!(genesis.header.difficulty_bits, 8);
    }

    #[test]
    fn test_open_existing_chain() {
        let storage = setup();
        let tip = Blockchain::create(&storage, config(), "alice").unwrap().tip();

        let blockchain = Blockchain::open(&storage, config()).unwrap();
        assert_eq!(blockchain.tip(), tip);
    }

    #[test]
    fn test_mine_block_advances_tip() {
        let storage = setup();
        let blockchain = Blockchain::create(&storage, config(), "alice").unwrap();
        let genesis_hash = blockchain.tip();

        let block = blockchain.add_block("Send 1 BTC to Ivan").unwrap();

        assert_eq!(block.header.prev_hash, Some(genesis_hash));
        assert_eq!(blockchain.tip(), block.hash);
        assert_eq!(blockchain.height().unwrap(), 1);
        assert!(BlockValidator::validate_pow(&block).is_ok());
    }

    #[test]
    fn test_mine_rejects_duplicate_transactions() {
        let storage = setup();
        let blockchain = Blockchain::create(&storage, config(), "alice").unwrap();
        let tip = blockchain.tip();

        let tx = blockchain.new_transfer("alice", "bob", 10).unwrap();
        let result = blockchain.mine_block(Payload::Ledger(vec![tx.clone(), tx]));

        assert!(matches!(result, Err(BlockchainError::Validation(_))));
        assert_eq!(blockchain.tip(), tip);
    }

    #[test]
    fn test_genesis_balance() {
        let storage = setup();
        let blockchain = Blockchain::create(&storage, config(), "alice").unwrap();

        assert_eq!(blockchain.get_balance("alice").unwrap(), SUBSIDY);
        assert_eq!(blockchain.get_balance("bob").unwrap(), 0);
        assert_eq!(blockchain.find_unspent_transactions("alice").unwrap().len(), 1);
    }

    #[test]
    fn test_send_full_balance() {
        let storage = setup();
        let blockchain = Blockchain::create(&storage, config(), "addr1").unwrap();

        blockchain.send("addr1", "addr2", 50).unwrap();

        assert!(blockchain.find_utxo("addr1").unwrap().is_empty());
        assert_eq!(
            blockchain.find_utxo("addr2").unwrap(),
            vec![TxOutput::new(50, "addr2")]
        );
    }

    #[test]
    fn test_send_with_change() {
        let storage = setup();
        let blockchain = Blockchain::create(&storage, config(), "alice").unwrap();

        let block = blockchain.send("alice", "bob", 20).unwrap();
        let tx = &block.transactions()[0];
        assert_eq!(tx.outputs.len(), 2);

        assert_eq!(blockchain.get_balance("alice").unwrap(), 30);
        assert_eq!(blockchain.get_balance("bob").unwrap(), 20);

        blockchain.send("bob", "carol", 5).unwrap();
        assert_eq!(blockchain.get_balance("bob").unwrap(), 15);
        assert_eq!(blockchain.get_balance("carol").unwrap(), 5);
        assert_eq!(blockchain.get_balance("alice").unwrap(), 30);
    }

    #[test]
    fn test_insufficient_funds() {
        let storage = setup();
        let blockchain = Blockchain::create(&storage, config(), "alice").unwrap();

        let result = blockchain.new_transfer("alice", "bob", 51);
        assert!(matches!(
            result,
            Err(BlockchainError::InsufficientFunds {
                available: 50,
                required: 51,
                ..
            })
        ));

        let result = blockchain.new_transfer("alice", "bob", 0);
        assert!(matches!(result, Err(BlockchainError::InvalidAmount)));
    }

    #[test]
    fn test_find_spendable_outputs_stops_when_covered() {
        let storage = setup();
        let blockchain = Blockchain::create(&storage, config(), "alice").unwrap();
        blockchain.send("alice", "alice", 10).unwrap();

        // alice now holds two outputs: 10 and 40 (change).
        let (accumulated, chosen) = blockchain.find_spendable_outputs("alice", 5).unwrap();
        assert_eq!(chosen.len(), 1);
        assert!(accumulated >= 5);

        let (accumulated, chosen) = blockchain.find_spendable_outputs("alice", 50).unwrap();
        assert_eq!(accumulated, 50);
        assert_eq!(chosen.len(), 2);
    }

    #[test]
    fn test_verify_chain() {
        let storage = setup();
        let blockchain = Blockchain::create(&storage, config(), "alice").unwrap();
        blockchain.send("alice", "bob", 10).unwrap();
        blockchain.send("bob", "carol", 10).unwrap();

        assert_eq!(blockchain.verify().unwrap(), 3);
    }

    #[test]
    fn test_verify_detects_difficulty_change() {
        let storage = setup();
        Blockchain::create(&storage, config(), "alice").unwrap();

        let stricter = BlockchainConfig::with_difficulty(9);
        let blockchain = Blockchain::open(&storage, stricter).unwrap();
        assert!(matches!(
            blockchain.verify(),
            Err(BlockchainError::Validation(_))
        ));
    }

    #[test]
    fn test_value_overflow_is_reported() {
        let storage = setup();
        let blockchain = Blockchain::create(&storage, config(), "alice").unwrap();

        let windfall = Transaction::new(vec![], vec![TxOutput::new(u64::MAX, "alice")]).unwrap();
        blockchain.mine_block(Payload::Ledger(vec![windfall])).unwrap();
        let topup = Transaction::new(vec![], vec![TxOutput::new(50, "alice")]).unwrap();
        blockchain.mine_block(Payload::Ledger(vec![topup])).unwrap();

        assert!(matches!(
            blockchain.get_balance("alice"),
            Err(BlockchainError::ValueOverflow)
        ));
        assert!(matches!(
            blockchain.find_spendable_outputs("alice", 100),
            Err(BlockchainError::ValueOverflow)
        ));
        assert_eq!(blockchain.get_balance("bob").unwrap(), 0);
    }
}
