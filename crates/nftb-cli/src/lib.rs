//! # nftb-cli: Command-Line Tool for the nftb Bridge
//!
//! Provides the `nftb` binary.
//!
//! ## Subcommands
//!
//! - `nftb keygen`: generate a secp256k1 key for one of the bridge roles.
//! - `nftb config show`: print the effective configuration.
//! - `nftb serve`: run the validator HTTP service over in-memory ledgers.
//! - `nftb demo`: bridge one token end to end on in-memory ledgers.
//!
//! ```bash
//! nftb keygen --role validator
//! NFTB_PROFILE=staging nftb config show
//! nftb serve --listen 127.0.0.1:8080 --block-time-ms 500
//! nftb demo --finality-blocks 2
//! ```

pub mod config;
pub mod demo;
pub mod keys;
pub mod local;
pub mod serve;

use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use nftb_protocol::BridgeConfig;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the verbosity count.
pub fn init_tracing(verbose: u8, json: bool) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load the configuration file, or profile defaults when none is given,
/// then apply environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    let mut config = match path {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("invalid environment override")?;
    Ok(config)
}
