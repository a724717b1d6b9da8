//! powchain CLI entry point.

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "powchain")]
#[command(about = "A single-node proof-of-work ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<commands::Commands>,
}

fn init_tracing() {
    // Logs go to stderr so command output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let args = commands::normalize_args(std::env::args());
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(_) => {
            commands::print_usage();
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(cmd) => {
            if let Err(e) = commands::run(cmd) {
                if e.downcast_ref::<commands::UsageError>().is_some() {
                    commands::print_usage();
                } else {
                    eprintln!("Error: {:#}", e);
                }
                std::process::exit(1);
            }
        }
        None => {
            commands::print_usage();
            std::process::exit(1);
        }
    }
}
