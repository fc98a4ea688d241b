//! # nftb CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use nftb_cli::config::{run_config, ConfigArgs};
use nftb_cli::demo::{run_demo, DemoArgs};
use nftb_cli::keys::{run_keygen, KeygenArgs};
use nftb_cli::serve::{run_serve, ServeArgs};

/// nftb: commit-reveal NFT bridge agents.
#[derive(Parser, Debug)]
#[command(name = "nftb", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Path to the YAML configuration file.
    #[arg(long, global = true, env = "NFTB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a secp256k1 key for a bridge role.
    Keygen(KeygenArgs),

    /// Inspect the effective configuration.
    Config(ConfigArgs),

    /// Run the validator HTTP service over in-memory ledgers.
    Serve(ServeArgs),

    /// Bridge one token end to end on in-memory ledgers.
    Demo(DemoArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    nftb_cli::init_tracing(cli.verbose, cli.json_logs);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "nftb starting");

    let config = cli.config.as_deref();
    let result = match &cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::Config(args) => run_config(args, config),
        Commands::Serve(args) => run_serve(args, config).await,
        Commands::Demo(args) => run_demo(args, config).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
