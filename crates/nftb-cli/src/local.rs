//! # Local Deployment
//!
//! Two in-memory chains wired the way a real deployment is: a token and a
//! source bridge on the `LOCALHOST_8545` chain, a token and a destination
//! bridge on `LOCALHOST_8546`, both bridges trusting the validator key.
//! Used by `serve` and `demo`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use nftb_core::{Address, BridgeContext, ChainId, TokenUri, U256};
use nftb_crypto::{CommitmentGenerator, SigningKey};
use nftb_ledger::InMemoryChain;
use nftb_protocol::{BridgeConfig, NetworkRegistry, Role, Validator};

const SOURCE_CHAIN: ChainId = ChainId(31337);
const DESTINATION_CHAIN: ChainId = ChainId(31338);

/// A deployed pair of in-memory chains.
#[derive(Debug, Clone)]
pub struct LocalDeployment {
    pub source: InMemoryChain,
    pub destination: InMemoryChain,
    pub context: BridgeContext,
    pub validator: Address,
}

impl LocalDeployment {
    /// Deploy tokens and bridges trusting `validator`.
    pub fn deploy(registry: &NetworkRegistry, validator: Address) -> Result<Self> {
        let from = registry.get(SOURCE_CHAIN)?;
        let to = registry.get(DESTINATION_CHAIN)?;
        tracing::debug!(from = %from.name, to = %to.name, "deploying local bridge");

        let source = InMemoryChain::new(from.chain_id);
        let destination = InMemoryChain::new(to.chain_id);
        let token = source.deploy_token();
        let bridge = source.deploy_source_bridge(validator);
        let dest_token = destination.deploy_token();
        let dest_bridge = destination
            .deploy_destination_bridge(validator, dest_token)
            .context("failed to deploy destination bridge")?;

        let context = BridgeContext::new(
            from.chain_id,
            token,
            bridge,
            to.chain_id,
            dest_token,
            dest_bridge,
        );
        tracing::info!(
            from_token = %token,
            from_bridge = %bridge,
            to_token = %dest_token,
            to_bridge = %dest_bridge,
            %validator,
            "local bridge deployed"
        );
        Ok(Self {
            source,
            destination,
            context,
            validator,
        })
    }

    /// Mint `token_id` on the source token to `owner`.
    pub fn mint(&self, owner: Address, token_id: U256, uri: &str) -> Result<()> {
        self.source
            .mint(self.context.from_token, owner, token_id, TokenUri::from(uri))
            .with_context(|| format!("failed to mint token {token_id}"))?;
        Ok(())
    }

    /// Validator over the source chain, using `key`.
    pub fn validator(&self, key: SigningKey, config: &BridgeConfig) -> Validator {
        let address = key.address();
        Validator::new(key, CommitmentGenerator::generate(), &config.validator)
            .with_ledger(Arc::new(self.source.connect(address)))
    }

    /// Mine one block on both chains every `interval` until `cancel` fires.
    pub fn spawn_miner(&self, interval: Duration, cancel: CancellationToken) {
        let source = self.source.clone();
        let destination = self.destination.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        source.mine(1);
                        destination.mine(1);
                    }
                }
            }
        });
    }
}

/// Key for `role` from the environment, or a fresh one when unset.
pub fn signer_or_generate(role: Role) -> Result<SigningKey> {
    match role.load_signer() {
        Ok(key) => Ok(key),
        Err(nftb_protocol::ConfigError::MissingKey { var }) => {
            let key = SigningKey::generate();
            tracing::warn!(%var, address = %key.address(), "key not set; generated an ephemeral one");
            Ok(key)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftb_ledger::{ChainReader, SourceLedger};

    #[tokio::test]
    async fn deployment_trusts_validator() {
        let registry = NetworkRegistry::with_presets(&[]).unwrap();
        let validator = SigningKey::generate();
        let local = LocalDeployment::deploy(&registry, validator.address()).unwrap();
        assert_eq!(local.context.from_chain_id, SOURCE_CHAIN);
        assert_eq!(local.context.to_chain_id, DESTINATION_CHAIN);

        let owner = Address::repeat_byte(0x11);
        local.mint(owner, U256::from(1u64), "abc").unwrap();
        let reader = local.source.connect(owner);
        assert_eq!(
            reader
                .owner_of(local.context.from_token, U256::from(1u64))
                .await
                .unwrap(),
            owner
        );
        assert_eq!(
            reader
                .request_nonce(local.context.from_bridge, owner)
                .await
                .unwrap(),
            U256::ZERO
        );
    }

    #[tokio::test]
    async fn miner_advances_both_chains() {
        let registry = NetworkRegistry::with_presets(&[]).unwrap();
        let local = LocalDeployment::deploy(&registry, Address::repeat_byte(9)).unwrap();
        let cancel = CancellationToken::new();
        let start = local.source.head();
        local.spawn_miner(Duration::from_millis(5), cancel.clone());
        tokio::time::sleep(Duration::from_millis(60)).await;
        cancel.cancel();
        assert!(local.source.head() > start);
        assert!(local.destination.head() > 0);
    }
}
