//! CLI commands module.

use anyhow::{Context, Result};
use clap::Subcommand;
use powchain_chain::BlockchainConfig;
use powchain_consensus::PowConfig;
use powchain_storage::DEFAULT_NAMESPACE;
use std::fs;
use std::path::Path;
use thiserror::Error;

mod account;
mod block;
mod init;

/// Long flags that may also be written with a single dash.
const LONG_FLAGS: &[&str] = &["address", "from", "to", "amount", "difficulty", "data-dir"];

const CONFIG_FILE: &str = "config.json";

#[derive(Subcommand)]
pub enum Commands {
    /// Create a blockchain and send the genesis block reward to ADDRESS
    #[command(name = "createblockchain")]
    CreateBlockchain(init::InitArgs),
    /// Get the balance of ADDRESS
    #[command(name = "getbalance")]
    GetBalance(account::BalanceArgs),
    /// Send AMOUNT of coins from FROM to TO
    Send(account::SendArgs),
    /// Print all the blocks of the blockchain
    #[command(name = "printchain")]
    PrintChain(block::ChainArgs),
    /// Re-validate every block of the blockchain
    #[command(name = "verifychain")]
    VerifyChain(block::ChainArgs),
}

/// A required argument was given but left empty.
#[derive(Debug, Error)]
#[error("missing required argument: -{0}")]
pub struct UsageError(pub &'static str);

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::CreateBlockchain(args) => init::run(args),
        Commands::GetBalance(args) => account::get_balance(args),
        Commands::Send(args) => account::send(args),
        Commands::PrintChain(args) => block::print_chain(args),
        Commands::VerifyChain(args) => block::verify_chain(args),
    }
}

pub fn print_usage() {
    println!("Usage:");
    println!("  createblockchain -address ADDRESS - Create a blockchain and send genesis block reward to ADDRESS");
    println!("  getbalance -address ADDRESS - Get balance of ADDRESS");
    println!("  send -from FROM -to TO -amount AMOUNT - Send AMOUNT of coins from FROM address to TO");
    println!("  printchain - Print all the blocks of the blockchain");
    println!("  verifychain - Re-validate proof of work and links of every block");
}

/// Rewrite `-address` style flags to `--address` so clap accepts them.
///
/// A token right after a flag is that flag's value and is left alone.
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut expects_value = false;
    args.into_iter()
        .map(|arg| {
            if std::mem::take(&mut expects_value) {
                return arg;
            }
            let Some(flag) = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) else {
                return arg;
            };
            let (name, inline_value) = match flag.split_once('=') {
                Some((name, _)) => (name, true),
                None => (flag, false),
            };
            if !LONG_FLAGS.contains(&name) {
                return arg;
            }
            expects_value = !inline_value;
            if arg.starts_with("--") {
                arg
            } else {
                format!("-{}", arg)
            }
        })
        .collect()
}

/// Reject an empty value for a required flag.
fn require<'v>(flag: &'static str, value: &'v str) -> Result<&'v str> {
    if value.is_empty() {
        return Err(UsageError(flag).into());
    }
    Ok(value)
}

// Helper function to save blockchain config
fn save_config(data_dir: &Path, config: &BlockchainConfig) -> Result<()> {
    let config_file = data_dir.join(CONFIG_FILE);
    let config_json = serde_json::json!({
        "difficulty_bits": config.pow.difficulty_bits,
        "namespace": config.namespace,
    });
    fs::write(&config_file, serde_json::to_string_pretty(&config_json)?)
        .with_context(|| format!("Failed to write {}", config_file.display()))?;
    Ok(())
}

// Helper function to load blockchain config
fn load_config(data_dir: &Path) -> Result<BlockchainConfig> {
    let config_file = data_dir.join(CONFIG_FILE);
    let contents = fs::read_to_string(&config_file)
        .context("No existing blockchain found. Run 'powchain createblockchain' first.")?;

    let json: serde_json::Value = serde_json::from_str(&contents)?;

    let difficulty_bits = json
        .get("difficulty_bits")
        .and_then(|v| v.as_u64())
        .context("Missing difficulty_bits in config")?;

    let namespace = json
        .get("namespace")
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_NAMESPACE)
        .to_string();

    Ok(BlockchainConfig {
        pow: PowConfig::new(u32::try_from(difficulty_bits).context("Invalid difficulty_bits")?),
        namespace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_single_dash_flags() {
        let normalized = normalize_args(args(&[
            "powchain",
            "send",
            "-from",
            "alice",
            "-to",
            "bob",
            "-amount=5",
        ]));
        assert_eq!(
            normalized,
            args(&["powchain", "send", "--from", "alice", "--to", "bob", "--amount=5"])
        );
    }

    #[test]
    fn test_normalize_leaves_other_args() {
        let original = args(&["powchain", "getbalance", "--address", "-x", "-5", "-h"]);
        assert_eq!(normalize_args(original.clone()), original);
    }

    #[test]
    fn test_normalize_keeps_flag_values() {
        let normalized = normalize_args(args(&[
            "powchain",
            "send",
            "-from",
            "-to",
            "--to",
            "-amount",
            "-address=x",
            "-amount",
            "5",
        ]));
        assert_eq!(
            normalized,
            args(&[
                "powchain",
                "send",
                "--from",
                "-to",
                "--to",
                "-amount",
                "--address=x",
                "--amount",
                "5",
            ])
        );
    }

    #[test]
    fn test_require_rejects_empty() {
        assert!(require("address", "").is_err());
        assert_eq!(require("address", "alice").unwrap(), "alice");
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config = BlockchainConfig::with_difficulty(12);

        save_config(dir.path(), &config).unwrap();
        let loaded = load_config(dir.path()).unwrap();

        assert_eq!(loaded.pow, config.pow);
        assert_eq!(loaded.namespace, config.namespace);
    }

    #[test]
    fn test_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(dir.path()).is_err());
    }
}
