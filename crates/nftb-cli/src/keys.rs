//! # Key Generation
//!
//! Generates secp256k1 keys in the format the agents read from
//! `<ROLE>_PRIVATE_KEY`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use nftb_crypto::SigningKey;
use nftb_protocol::Role;

/// Arguments for `nftb keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Role the key is for; selects the environment variable name printed.
    #[arg(long, value_enum, default_value = "owner")]
    pub role: RoleArg,

    /// Write the hex key to this file instead of printing it.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Deployer,
    Validator,
    Denier,
    Owner,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Deployer => Role::Deployer,
            RoleArg::Validator => Role::Validator,
            RoleArg::Denier => Role::Denier,
            RoleArg::Owner => Role::Owner,
        }
    }
}

/// Execute `nftb keygen`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let role = Role::from(args.role);
    let key = SigningKey::generate();

    match &args.output {
        Some(path) => {
            write_key(&key, path)?;
            println!("OK: generated {} key", role.env_var());
            println!("  Address: {}", key.address());
            println!("  Key file: {}", path.display());
        }
        None => {
            println!("# address {}", key.address());
            println!("{}={}", role.env_var(), key.secret_hex().as_str());
        }
    }
    Ok(0)
}

fn write_key(key: &SigningKey, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, key.secret_hex().as_bytes())
        .with_context(|| format!("failed to write key: {}", path.display()))
}
