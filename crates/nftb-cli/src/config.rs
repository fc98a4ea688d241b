//! # Config Subcommand
//!
//! Prints the effective configuration: file (or profile defaults), then
//! environment overrides, with the built-in networks merged in. RPC URL
//! paths are redacted and private keys are reported only as present or
//! absent.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;

use nftb_core::ChainId;
use nftb_protocol::{
    BridgeConfig, DenierSettings, OwnerSettings, Profile, RetryPolicy, Role, ValidatorSettings,
};

/// Arguments for `nftb config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration.
    Show {
        #[arg(long, value_enum, default_value = "yaml")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Debug, Serialize)]
struct NetworkView {
    name: String,
    chain_id: ChainId,
    rpc_url: String,
    gas_price_wei: u64,
}

#[derive(Debug, Serialize)]
struct EffectiveConfig<'a> {
    profile: Profile,
    networks: Vec<NetworkView>,
    owner: &'a OwnerSettings,
    validator: &'a ValidatorSettings,
    denier: &'a DenierSettings,
    retry: &'a RetryPolicy,
    keys: BTreeMap<&'static str, &'static str>,
}

/// Execute `nftb config`.
pub fn run_config(args: &ConfigArgs, config_path: Option<&Path>) -> Result<u8> {
    let config = crate::load_config(config_path)?;
    match &args.command {
        ConfigCommand::Show { format } => {
            let rendered = render(&config, *format, |var| std::env::var_os(var).is_some())?;
            println!("{rendered}");
        }
    }
    Ok(0)
}

fn render(
    config: &BridgeConfig,
    format: OutputFormat,
    key_present: impl Fn(&str) -> bool,
) -> Result<String> {
    let networks = config
        .registry()
        .context("invalid network configuration")?
        .iter()
        .map(|n| NetworkView {
            name: n.name.clone(),
            chain_id: n.chain_id,
            rpc_url: n.redacted_endpoint(),
            gas_price_wei: n.gas_price_wei,
        })
        .collect();
    let keys = [Role::Deployer, Role::Validator, Role::Denier, Role::Owner]
        .into_iter()
        .map(|role| {
            let var = role.env_var();
            (var, if key_present(var) { "set" } else { "unset" })
        })
        .collect();

    let view = EffectiveConfig {
        profile: config.profile,
        networks,
        owner: &config.owner,
        validator: &config.validator,
        denier: &config.denier,
        retry: &config.retry,
        keys,
    };
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(&view)?,
        OutputFormat::Json => serde_json::to_string_pretty(&view)?,
    })
}
