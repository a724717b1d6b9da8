//! Chain inspection commands.

use super::load_config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use powchain_chain::Blockchain;
use powchain_consensus::BlockValidator;
use powchain_storage::Storage;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct ChainArgs {
    /// Directory to store blockchain data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,
}

fn with_blockchain<T>(data_dir: &Path, f: impl FnOnce(&Blockchain) -> Result<T>) -> Result<T> {
    let config = load_config(data_dir)?;
    let storage = Storage::open(data_dir)
        .context("Failed to open storage. Did you run 'powchain createblockchain'?")?;
    let blockchain = Blockchain::open(&storage, config)?;
    f(&blockchain)
}

pub fn print_chain(args: ChainArgs) -> Result<()> {
    with_blockchain(&args.data_dir, |blockchain| {
        for block in blockchain.iter() {
            let block = block?;
            let pow_valid = BlockValidator::validate_pow(&block).is_ok();

            println!("Prev. hash: {}", hex::encode(block.header.prev_hash_bytes()));
            println!("Hash: {}", block.hash);
            println!("PoW: {}", pow_valid);
            println!();
        }
        Ok(())
    })
}

pub fn verify_chain(args: ChainArgs) -> Result<()> {
    with_blockchain(&args.data_dir, |blockchain| {
        let checked = blockchain.verify().context("Chain verification failed")?;

        println!(
            "{}  Verified {} blocks",
            "✓".green().bold(),
            checked.to_string().bright_cyan()
        );
        println!("    Tip: {}", blockchain.tip().to_hex().bright_yellow());
        Ok(())
    })
}
