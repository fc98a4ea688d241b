//! # Serve Subcommand
//!
//! Runs the validator HTTP service against a freshly deployed pair of
//! in-memory chains, with Prometheus metrics at `/metrics`. Intended for
//! local testing of owner clients; nothing is persisted.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;

use nftb_api::AppState;
use nftb_core::U256;
use nftb_protocol::Role;

use crate::local::{signer_or_generate, LocalDeployment};

/// Arguments for `nftb serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Mine a block on both chains at this interval; 0 disables mining.
    #[arg(long, default_value_t = 0)]
    pub block_time_ms: u64,
}

/// Execute `nftb serve`.
pub async fn run_serve(args: &ServeArgs, config_path: Option<&Path>) -> Result<u8> {
    let config = crate::load_config(config_path)?;
    let registry = config.registry()?;

    let validator_key = signer_or_generate(Role::Validator)?;
    let local = LocalDeployment::deploy(&registry, validator_key.address())?;

    // Token #1 for the configured owner, so a client can bridge right away.
    if let Ok(owner) = Role::Owner.load_signer() {
        local.mint(owner.address(), U256::from(1u64), "abc")?;
        tracing::info!(owner = %owner.address(), "minted token 1 to owner");
    }
    println!("{}", serde_json::to_string_pretty(&local.context)?);

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    let validator = local.validator(validator_key, &config);
    let state = AppState::new(Arc::new(validator)).with_metrics(handle);

    let shutdown = CancellationToken::new();
    if args.block_time_ms > 0 {
        local.spawn_miner(Duration::from_millis(args.block_time_ms), shutdown.clone());
    }

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    let signal = shutdown.clone();
    nftb_api::serve(listener, state, async move {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("failed to listen for ctrl-c; waiting for cancellation");
            signal.cancelled().await;
            return;
        }
        tracing::info!("shutting down");
        signal.cancel();
    })
    .await
    .context("validator service failed")?;
    Ok(0)
}
