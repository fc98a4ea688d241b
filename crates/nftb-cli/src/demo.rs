//! # Demo Subcommand
//!
//! Bridges token #1 (URI `abc`) from the local source chain to the local
//! destination chain with a real validator, optionally over HTTP, then has
//! the denier review the resulting acquisition.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use nftb_api::{AppState, ValidatorHttpClient};
use nftb_core::U256;
use nftb_crypto::Commitment;
use nftb_protocol::{
    Denier, DenierSettings, FlowReport, OwnerFlow, Role, TokenOwner, ValidatorService, Verdict,
};
use nftb_state::RequestLifecycle;

use crate::local::{signer_or_generate, LocalDeployment};

/// Arguments for `nftb demo`.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Confirmation depth for every role; overrides the configuration.
    #[arg(long)]
    pub finality_blocks: Option<u64>,

    /// Talk to the validator over HTTP on an ephemeral local port.
    #[arg(long)]
    pub over_http: bool,

    /// Block interval of the local chains while the demo runs.
    #[arg(long, default_value_t = 20)]
    pub block_time_ms: u64,
}

#[derive(Debug, Serialize)]
struct DemoSummary<'a> {
    request: String,
    new_token_id: U256,
    commitment: Commitment,
    lifecycle: &'a RequestLifecycle,
    verdict: Verdict,
}

impl<'a> DemoSummary<'a> {
    fn new(report: &'a FlowReport, verdict: Verdict) -> Self {
        Self {
            request: report.request_id.to_string(),
            new_token_id: report.new_token_id(),
            commitment: report.attestation.commitment,
            lifecycle: &report.lifecycle,
            verdict,
        }
    }
}

/// Execute `nftb demo`.
pub async fn run_demo(args: &DemoArgs, config_path: Option<&Path>) -> Result<u8> {
    let mut config = crate::load_config(config_path)?;
    if let Some(depth) = args.finality_blocks {
        config.owner.finality_blocks = depth;
        config.validator.finality_blocks = depth;
        config.denier.finality_blocks = depth;
    }
    let registry = config.registry()?;

    let validator_key = signer_or_generate(Role::Validator)?;
    let owner_key = signer_or_generate(Role::Owner)?;
    let owner_address = owner_key.address();

    let local = LocalDeployment::deploy(&registry, validator_key.address())?;
    local.mint(owner_address, U256::from(1u64), "abc")?;

    let cancel = CancellationToken::new();
    if args.block_time_ms > 0 {
        local.spawn_miner(Duration::from_millis(args.block_time_ms), cancel.clone());
    }

    let validator = Arc::new(local.validator(validator_key, &config));
    let service: Arc<dyn ValidatorService> = if args.over_http {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let stop = cancel.clone();
        tokio::spawn(nftb_api::serve(listener, AppState::new(validator), async move {
            stop.cancelled().await
        }));
        let url = Url::parse(&format!("http://{addr}/"))?;
        Arc::new(ValidatorHttpClient::new(url, Duration::from_secs(30))?)
    } else {
        validator
    };

    let owner = Arc::new(TokenOwner::new(
        owner_key,
        Arc::new(local.source.connect(owner_address)),
        Arc::new(local.destination.connect(owner_address)),
        &config.owner,
    ));
    let flow = OwnerFlow::new(owner, service, config.retry.clone());

    let outcome = flow
        .run(local.context.clone(), U256::from(1u64), &cancel)
        .await;
    let report: FlowReport = match outcome {
        Ok(report) => report,
        Err(failure) => {
            cancel.cancel();
            eprintln!("{}", serde_json::to_string_pretty(&failure.lifecycle)?);
            return Err(failure).context("demo transfer failed");
        }
    };

    // Local chains mine fast enough to outrun the lookback window.
    let denier_settings = DenierSettings {
        event_lookback_blocks: None,
        ..config.denier.clone()
    };
    let denier = Denier::new(
        Arc::new(local.source.connect(owner_address)),
        Arc::new(local.destination.connect(owner_address)),
        &denier_settings,
    );
    let verdict = denier.review(&report.acquire).await?;
    cancel.cancel();

    println!(
        "{}",
        serde_json::to_string_pretty(&DemoSummary::new(&report, verdict))?
    );
    println!("OK: bridged token 1 as token {}", report.new_token_id());
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_process_demo_completes() {
        let args = DemoArgs {
            finality_blocks: Some(0),
            over_http: false,
            block_time_ms: 0,
        };
        assert_eq!(run_demo(&args, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn http_demo_waits_for_finality() {
        let args = DemoArgs {
            finality_blocks: Some(2),
            over_http: true,
            block_time_ms: 5,
        };
        assert_eq!(run_demo(&args, None).await.unwrap(), 0);
    }
}
