//! Balance and transfer commands.

use super::{load_config, require};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use powchain_chain::Blockchain;
use powchain_storage::Storage;
use std::path::PathBuf;

#[derive(Args)]
pub struct BalanceArgs {
    /// Address to sum unspent outputs for
    #[arg(long)]
    address: String,

    /// Directory to store blockchain data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,
}

#[derive(Args)]
pub struct SendArgs {
    /// Source address
    #[arg(long)]
    from: String,

    /// Destination address
    #[arg(long)]
    to: String,

    /// Amount to transfer
    #[arg(long)]
    amount: u64,

    /// Directory to store blockchain data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,
}

pub fn get_balance(args: BalanceArgs) -> Result<()> {
    let address = require("address", &args.address)?;

    let config = load_config(&args.data_dir)?;
    let storage = Storage::open(&args.data_dir)
        .context("Failed to open storage. Did you run 'powchain createblockchain'?")?;
    let blockchain = Blockchain::open(&storage, config)?;

    let balance = blockchain
        .get_balance(address)
        .with_context(|| format!("Could not get balance of address: {}", address))?;

    println!("Balance of '{}': {}", address, balance);
    Ok(())
}

pub fn send(args: SendArgs) -> Result<()> {
    let from = require("from", &args.from)?;
    let to = require("to", &args.to)?;

    let config = load_config(&args.data_dir)?;
    let storage = Storage::open(&args.data_dir)
        .context("Failed to open storage. Did you run 'powchain createblockchain'?")?;
    let blockchain = Blockchain::open(&storage, config)?;

    println!("{}", "Mining transfer...".bold().cyan());

    let block = blockchain
        .send(from, to, args.amount)
        .context("Failed to send")?;

    println!("{}  Success!", "✓".green().bold());
    println!("    Block: {}", block.hash.to_hex().bright_yellow());
    println!(
        "    Tx:    {}",
        block.transactions()[0].id.to_hex().bright_black()
    );

    Ok(())
}
