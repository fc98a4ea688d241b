//! # Token Owner Agent
//!
//! The requester side of the protocol. Phase 1 prepares and signs a
//! request (approval, nonce, URI, signature); phase 3 listens for the
//! validator's commit, waits for finality, and acquires the new token on
//! the destination chain once the secret is known.
//!
//! Nonces are never cached: every read goes to the source bridge.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use nftb_core::{
    Address, BridgeError, BridgeRequest, BridgeRequestId, NotReady, TokenUri, ValidationFailure,
    U256,
};
use nftb_crypto::{
    AuthnChallenge, CompactSignature, OwnerMessage, ProtocolMessage, Secret, SigningKey,
};
use nftb_ledger::{
    AcquireCall, AcquireEvent, BlockRange, CommitEvent, CommitFilter, CommitSubscription,
    DestinationLedger, Logged, Origin, SourceLedger, TokenInfo, TxReceipt,
};

use crate::config::OwnerSettings;
use crate::dedup::SubmissionGuard;
use crate::finality::{FinalityOracle, FinalityStatus};
use crate::retry::RetryPolicy;

/// The token-owner agent, bound to one source and one destination ledger.
pub struct TokenOwner {
    signer: SigningKey,
    source: Arc<dyn SourceLedger>,
    destination: Arc<dyn DestinationLedger>,
    finality: FinalityOracle,
    event_lookback: Option<u64>,
    commit_wait: Duration,
    submissions: SubmissionGuard,
}

impl std::fmt::Debug for TokenOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenOwner")
            .field("address", &self.signer.address())
            .field("source", &self.source.chain_id())
            .field("destination", &self.destination.chain_id())
            .field("finality", &self.finality)
            .finish_non_exhaustive()
    }
}

impl TokenOwner {
    /// Bind `signer` to its source and destination ledgers.
    pub fn new(
        signer: SigningKey,
        source: Arc<dyn SourceLedger>,
        destination: Arc<dyn DestinationLedger>,
        settings: &OwnerSettings,
    ) -> Self {
        Self {
            signer,
            source,
            destination,
            finality: FinalityOracle::new(settings.finality_blocks)
                .with_lookback(settings.event_lookback_blocks),
            event_lookback: settings.event_lookback_blocks,
            commit_wait: Duration::from_secs(settings.commit_wait_timeout_secs),
            submissions: SubmissionGuard::new(),
        }
    }

    /// The owner's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Configured commit-event wait.
    pub fn commit_wait(&self) -> Duration {
        self.commit_wait
    }

    /// The source-chain ledger handle.
    pub fn source(&self) -> &dyn SourceLedger {
        self.source.as_ref()
    }

    /// The destination-chain ledger handle.
    pub fn destination(&self) -> &dyn DestinationLedger {
        self.destination.as_ref()
    }

    // ─── Phase 1 ────────────────────────────────────────────────────

    /// Approve `bridge` as operator for all of the owner's tokens, unless it
    /// already is. Returns the receipt when a transaction was sent.
    pub async fn approve_for_all(
        &self,
        token: Address,
        bridge: Address,
    ) -> Result<Option<TxReceipt>, BridgeError> {
        let owner = self.address();
        if self.source.is_approved_for_all(token, owner, bridge).await? {
            tracing::debug!(owner = %owner, token = %token, "bridge already approved for all");
            return Ok(None);
        }
        let receipt = self.source.set_approval_for_all(token, bridge, true).await?;
        tracing::info!(owner = %owner, token = %token, bridge = %bridge, block = receipt.block_number, "approved bridge for all");
        Ok(Some(receipt))
    }

    /// Approve `bridge` for a single token, unless it is already approved
    /// for it or for all.
    pub async fn approve(
        &self,
        token: Address,
        bridge: Address,
        token_id: U256,
    ) -> Result<Option<TxReceipt>, BridgeError> {
        let owner = self.address();
        if self.source.is_approved_for_all(token, owner, bridge).await?
            || self.source.get_approved(token, token_id).await? == bridge
        {
            return Ok(None);
        }
        let receipt = self.source.approve(token, bridge, token_id).await?;
        tracing::info!(owner = %owner, token_id = %token_id, block = receipt.block_number, "approved bridge for token");
        Ok(Some(receipt))
    }

    /// Current request nonce on `bridge`.
    pub async fn get_request_nonce(&self, bridge: Address) -> Result<U256, BridgeError> {
        Ok(self.source.request_nonce(bridge, self.address()).await?)
    }

    /// Token URI as exposed by `bridge`.
    pub async fn get_token_uri(
        &self,
        bridge: Address,
        token: Address,
        token_id: U256,
    ) -> Result<TokenUri, BridgeError> {
        Ok(self.source.token_uri(bridge, token, token_id).await?)
    }

    /// Sign `request` under `challenge`.
    pub fn sign_request(
        &self,
        request: &BridgeRequest,
        challenge: &AuthnChallenge,
    ) -> Result<CompactSignature, BridgeError> {
        OwnerMessage::for_request(request, challenge)
            .sign(&self.signer)
            .map_err(|e| BridgeError::Crypto {
                reason: e.to_string(),
            })
    }

    // ─── Phase 3 ────────────────────────────────────────────────────

    /// Arm a listener for the commit of `(owner, request_nonce)` on
    /// `bridge`. Arm it before the request is sent to the validator.
    pub async fn bind_commit_listener(
        &self,
        bridge: Address,
        request_nonce: U256,
    ) -> Result<PendingCommit, BridgeError> {
        let filter = CommitFilter::by_request(self.address(), request_nonce);
        let subscription = self.source.subscribe_commits(bridge, filter.clone()).await?;
        Ok(PendingCommit {
            subscription,
            source: Arc::clone(&self.source),
            bridge,
            filter,
            lookback: self.event_lookback,
        })
    }

    /// Whether the commit of `request_id` is final. Fails with
    /// `CommitNotMined` when no commit event is found.
    pub async fn is_commit_tx_finalized(
        &self,
        request_id: &BridgeRequestId,
    ) -> Result<bool, BridgeError> {
        let filter = CommitFilter::by_request(request_id.token_owner, request_id.request_nonce);
        match self
            .finality
            .check(self.source.as_ref(), request_id.context.from_bridge, &filter)
            .await?
        {
            FinalityStatus::Final(_) => Ok(true),
            FinalityStatus::Pending { .. } => Ok(false),
            FinalityStatus::NotMined => Err(NotReady::CommitNotMined {
                owner: request_id.token_owner,
                nonce: request_id.request_nonce,
            }
            .into()),
        }
    }

    /// Poll until the commit of `request_id` is final.
    pub async fn wait_for_finality(
        &self,
        request_id: &BridgeRequestId,
        retry: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<Logged<CommitEvent>, BridgeError> {
        self.wait_for_finality_from(request_id, None, retry, cancel)
            .await
    }

    /// Like [`wait_for_finality`](Self::wait_for_finality), but once the
    /// commit was seen at `observed_block` the search starts there instead
    /// of at the lookback window.
    pub async fn wait_for_finality_from(
        &self,
        request_id: &BridgeRequestId,
        observed_block: Option<u64>,
        retry: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<Logged<CommitEvent>, BridgeError> {
        let oracle = match observed_block {
            Some(block) => self.finality.anchored_at(block),
            None => self.finality,
        };
        let event = retry
            .run("commit finality", cancel, || {
                oracle.require_final(self.source.as_ref(), request_id)
            })
            .await?;
        tracing::info!(
            owner = %request_id.token_owner,
            nonce = %request_id.request_nonce,
            block = event.block_number,
            threshold = self.finality.threshold(),
            "commit final"
        );
        Ok(event)
    }

    /// Validator signature recorded by `bridge` for this owner's
    /// `request_nonce`.
    pub async fn fetch_validator_signature(
        &self,
        bridge: Address,
        request_nonce: U256,
    ) -> Result<CompactSignature, BridgeError> {
        let owner = self.address();
        self.source
            .validator_signature(bridge, owner, request_nonce)
            .await?
            .ok_or_else(|| {
                NotReady::CommitNotMined {
                    owner,
                    nonce: request_nonce,
                }
                .into()
            })
    }

    /// Submit `acquire` on the destination bridge. At most one acquire per
    /// request is sent from this agent.
    pub async fn acquire(
        &self,
        request: &BridgeRequest,
        commit: &CommitEvent,
        secret: Secret,
        validator_signature: CompactSignature,
    ) -> Result<Logged<AcquireEvent>, BridgeError> {
        let result = self
            .submit_acquire(request, commit, secret, validator_signature)
            .await;
        let outcome = if result.is_ok() { "acquired" } else { "failed" };
        metrics::counter!("nftb_owner_acquires_total", "outcome" => outcome).increment(1);
        result
    }

    async fn submit_acquire(
        &self,
        request: &BridgeRequest,
        commit: &CommitEvent,
        secret: Secret,
        validator_signature: CompactSignature,
    ) -> Result<Logged<AcquireEvent>, BridgeError> {
        if !commit.commitment.is_opened_by(&secret) {
            return Err(ValidationFailure::CommitmentMismatch {
                commitment: commit.commitment.0,
            }
            .into());
        }
        let ctx = request.context();
        let ticket = self.submissions.begin("acquire", &request.id)?;
        let logged = self
            .destination
            .acquire(
                ctx.to_bridge,
                AcquireCall {
                    origin: Origin::of(ctx),
                    token_owner: self.address(),
                    old_token: TokenInfo {
                        token_id: request.token_id,
                        token_uri: request.token_uri.clone(),
                    },
                    commitment: commit.commitment,
                    secret,
                    request_timestamp: commit.request_timestamp,
                    validator_signature,
                },
            )
            .await?;
        ticket.complete();
        tracing::info!(
            owner = %self.address(),
            old_token_id = %request.token_id,
            new_token_id = %logged.event.new_token_id,
            block = logged.block_number,
            "acquired on destination"
        );
        Ok(logged)
    }

    /// Owner of `token_id` on the destination chain.
    pub async fn destination_owner_of(
        &self,
        token: Address,
        token_id: U256,
    ) -> Result<Address, BridgeError> {
        Ok(self.destination.owner_of(token, token_id).await?)
    }
}

/// A commit listener armed by [`TokenOwner::bind_commit_listener`].
///
/// Dropping it detaches the listener.
pub struct PendingCommit {
    subscription: CommitSubscription,
    source: Arc<dyn SourceLedger>,
    bridge: Address,
    filter: CommitFilter,
    lookback: Option<u64>,
}

impl std::fmt::Debug for PendingCommit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCommit")
            .field("bridge", &self.bridge)
            .field("filter", &self.filter)
            .field("lookback", &self.lookback)
            .finish_non_exhaustive()
    }
}

impl PendingCommit {
    /// Wait for the commit event, at most `timeout`.
    ///
    /// When the listener closes or the timeout expires, the event log is
    /// queried once before giving up, so an event published while the
    /// listener was lagging is still found.
    pub async fn wait(
        self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Logged<CommitEvent>, BridgeError> {
        let started = Instant::now();
        let PendingCommit {
            subscription,
            source,
            bridge,
            filter,
            lookback,
        } = self;

        let listener_error = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(BridgeError::Cancelled {
                    operation: "commit event wait".into(),
                });
            }
            _ = tokio::time::sleep(timeout) => None,
            received = subscription.once() => match received {
                Ok(event) => return Ok(event),
                Err(e) => Some(e),
            },
        };

        let head = source.block_number().await?;
        let range = lookback.map_or_else(BlockRange::all, |blocks| BlockRange::last(blocks, head));
        if let Some(event) = source.commit_events(bridge, &filter, range).await?.pop() {
            return Ok(event);
        }
        match listener_error {
            Some(e) => Err(e.into()),
            None => Err(BridgeError::Timeout {
                operation: "commit event wait".into(),
                attempts: 1,
                elapsed_ms: started.elapsed().as_millis() as u64,
            }),
        }
    }
}
