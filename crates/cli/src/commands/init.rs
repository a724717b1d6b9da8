//! Create blockchain command.

use super::{load_config, require, save_config};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use powchain_chain::{Blockchain, BlockchainConfig, BlockchainError};
use powchain_consensus::{PowConfig, DEFAULT_DIFFICULTY_BITS};
use powchain_storage::Storage;
use std::{fs, io};
use std::path::PathBuf;
use tracing::warn;

#[derive(Args)]
pub struct InitArgs {
    /// Address receiving the genesis block reward
    #[arg(long)]
    address: String,

    /// Directory to store blockchain data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Leading zero bits required in every block hash
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY_BITS)]
    difficulty: u32,
}

pub fn run(args: InitArgs) -> Result<()> {
    let address = require("address", &args.address)?;

    // Create data directory
    fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", args.data_dir))?;

    let requested = match load_config(&args.data_dir) {
        Ok(existing) => existing,
        Err(err) if is_not_found(&err) => BlockchainConfig::with_difficulty(args.difficulty),
        Err(err) => return Err(err),
    };

    let storage = Storage::open(&args.data_dir).context("Failed to open storage")?;

    // An existing chain keeps the difficulty its genesis block was mined with
    let config = match Blockchain::open(&storage, requested.clone()) {
        Ok(existing) => {
            let stored = existing.get_genesis_block()?.header.difficulty_bits;
            if stored != args.difficulty {
                warn!(
                    existing = stored,
                    requested = args.difficulty,
                    "keeping difficulty of existing chain"
                );
            }
            BlockchainConfig {
                pow: PowConfig::new(stored),
                ..requested
            }
        }
        Err(BlockchainError::NotInitialized) => requested,
        Err(err) => return Err(err.into()),
    };

    println!(
        "{}",
        format!("Mining genesis block (difficulty {})...", config.pow.difficulty_bits)
            .bold()
            .cyan()
    );

    let blockchain = Blockchain::create(&storage, config, address)
        .with_context(|| format!("Could not create blockchain with address: {}", address))?;
    save_config(&args.data_dir, blockchain.config())?;

    println!("{}  Blockchain created", "✓".green().bold());
    println!("    Tip: {}", blockchain.tip().to_hex().bright_yellow());

    Ok(())
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound)
}
