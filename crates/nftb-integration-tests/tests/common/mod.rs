//! Shared fixture: two in-memory chains with a token and bridge each, a
//! validator trusted by both bridges, and an owner holding token #1 ("abc").

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use nftb_core::{Address, BridgeContext, BridgeRequest, BridgeRequestId, ChainId, TokenUri, U256};
use nftb_crypto::{AuthnChallenge, CommitmentGenerator, SigningKey};
use nftb_ledger::InMemoryChain;
use nftb_protocol::{
    ChallengePolicy, DenierSettings, Denier, OwnerFlow, OwnerSettings, RetryPolicy,
    SignedBridgeRequest, TokenOwner, Validator, ValidatorService, ValidatorSettings,
};

pub const SOURCE_CHAIN: ChainId = ChainId(31337);
pub const DESTINATION_CHAIN: ChainId = ChainId(31338);

pub struct Harness {
    pub source: InMemoryChain,
    pub destination: InMemoryChain,
    pub context: BridgeContext,
    pub validator: Arc<Validator>,
    pub owner: Arc<TokenOwner>,
    pub threshold: u64,
}

impl Harness {
    /// Every role uses `threshold` confirmations.
    pub fn new(threshold: u64) -> Self {
        let source = InMemoryChain::new(SOURCE_CHAIN);
        let destination = InMemoryChain::new(DESTINATION_CHAIN);
        let validator_key = SigningKey::generate();
        let owner_key = SigningKey::generate();
        let validator_address = validator_key.address();
        let owner_address = owner_key.address();

        let token = source.deploy_token();
        let bridge = source.deploy_source_bridge(validator_address);
        let dest_token = destination.deploy_token();
        let dest_bridge = destination
            .deploy_destination_bridge(validator_address, dest_token)
            .unwrap();
        source
            .mint(token, owner_address, U256::from(1u64), TokenUri::from("abc"))
            .unwrap();

        let validator = Validator::new(
            validator_key,
            CommitmentGenerator::generate(),
            &ValidatorSettings {
                finality_blocks: threshold,
                challenge: ChallengePolicy::Issued { ttl_secs: 60 },
            },
        )
        .with_ledger(Arc::new(source.connect(validator_address)));

        let owner = TokenOwner::new(
            owner_key,
            Arc::new(source.connect(owner_address)),
            Arc::new(destination.connect(owner_address)),
            &OwnerSettings {
                finality_blocks: threshold,
                commit_wait_timeout_secs: 5,
                event_lookback_blocks: Some(10),
            },
        );

        Self {
            context: BridgeContext::new(
                SOURCE_CHAIN,
                token,
                bridge,
                DESTINATION_CHAIN,
                dest_token,
                dest_bridge,
            ),
            source,
            destination,
            validator: Arc::new(validator),
            owner: Arc::new(owner),
            threshold,
        }
    }

    pub fn owner_address(&self) -> Address {
        self.owner.address()
    }

    pub fn request(&self, nonce: u64) -> BridgeRequest {
        BridgeRequest::new(
            BridgeRequestId::new(self.context.clone(), self.owner_address(), U256::from(nonce)),
            U256::from(1u64),
            TokenUri::from("abc"),
        )
    }

    /// Owner-signed `request` with a challenge from the validator.
    pub async fn signed(&self, request: BridgeRequest) -> SignedBridgeRequest {
        let authn_challenge: AuthnChallenge =
            self.validator.issue_challenge(&request.id).await.unwrap();
        let owner_signature = self.owner.sign_request(&request, &authn_challenge).unwrap();
        SignedBridgeRequest {
            request,
            authn_challenge,
            owner_signature,
        }
    }

    pub async fn approve(&self) {
        self.owner
            .approve_for_all(self.context.from_token, self.context.from_bridge)
            .await
            .unwrap();
    }

    pub fn flow(&self, retry: RetryPolicy) -> OwnerFlow {
        self.flow_with(self.validator.clone(), retry)
    }

    pub fn flow_with(&self, validator: Arc<dyn ValidatorService>, retry: RetryPolicy) -> OwnerFlow {
        OwnerFlow::new(self.owner.clone(), validator, retry)
    }

    pub fn denier(&self, threshold: u64) -> Denier {
        let reader = Address::repeat_byte(0xde);
        Denier::new(
            Arc::new(self.source.connect(reader)),
            Arc::new(self.destination.connect(reader)),
            &DenierSettings {
                finality_blocks: threshold,
                event_lookback_blocks: None,
            },
        )
    }

    /// Mine a block on both chains every `interval` until the token fires.
    pub fn spawn_miner(&self, interval: Duration) -> CancellationToken {
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        let source = self.source.clone();
        let destination = self.destination.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        source.mine(1);
                        destination.mine(1);
                    }
                }
            }
        });
        cancel
    }
}
