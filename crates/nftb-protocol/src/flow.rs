//! # Owner Flow
//!
//! Drives one transfer end to end from the owner's side, against any
//! [`ValidatorService`]: in-process or over HTTP.
//!
//! ```text
//! approve ─► nonce ─► uri ─► challenge ─► sign ─► bind listener
//!    ─► submit to validator ─► commit observed ─► finality
//!    ─► reveal ─► validator signature ─► acquire ─► confirm owner
//! ```
//!
//! Every step advances the [`RequestLifecycle`]; the first error moves it
//! to `FAILED` and is returned together with the lifecycle.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use nftb_core::{
    BridgeContext, BridgeError, BridgeRequest, BridgeRequestId, ErrorCategory, TokenUri,
    UnixTimestamp, ValidationFailure, U256,
};
use nftb_crypto::{AuthnChallenge, Commitment, CompactSignature, Secret};
use nftb_ledger::{AcquireEvent, Logged, TxReceipt};
use nftb_state::{LifecycleError, RequestLifecycle};

use crate::owner::TokenOwner;
use crate::retry::RetryPolicy;

// ─── Wire types ─────────────────────────────────────────────────────

/// A bridge request with the owner's authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBridgeRequest {
    /// The request being authorized.
    pub request: BridgeRequest,
    /// Challenge the validator issued for this request.
    pub authn_challenge: AuthnChallenge,
    /// Owner signature over the request fields and the challenge.
    pub owner_signature: CompactSignature,
}

/// What the validator returns after committing a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAttestation {
    /// The committed request.
    pub request_id: BridgeRequestId,
    /// Commitment to the reveal secret.
    pub commitment: Commitment,
    /// When the validator accepted the request.
    pub request_timestamp: UnixTimestamp,
    /// URI the validator attested. Always equal to the request's URI.
    pub token_uri: TokenUri,
    /// Validator signature over the commit message.
    pub validator_signature: CompactSignature,
    /// Receipt of the source-chain commit transaction.
    pub commit_tx: TxReceipt,
}

/// The validator as seen by the owner.
#[async_trait]
pub trait ValidatorService: Send + Sync {
    /// Challenge to embed in the owner signature.
    async fn issue_challenge(
        &self,
        request_id: &BridgeRequestId,
    ) -> Result<AuthnChallenge, BridgeError>;

    /// Validate and commit a signed request.
    async fn process_request(
        &self,
        request: &SignedBridgeRequest,
    ) -> Result<CommitAttestation, BridgeError>;

    /// Secret of a committed request, once final.
    async fn reveal_secret(&self, request_id: &BridgeRequestId) -> Result<Secret, BridgeError>;
}

// ─── Flow ───────────────────────────────────────────────────────────

/// A step of the flow failed.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// A protocol or ledger step failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    /// The lifecycle refused a phase transition.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl FlowError {
    /// Category of the underlying failure; lifecycle errors are protocol errors.
    pub fn category(&self) -> ErrorCategory {
        match self {
            FlowError::Bridge(e) => e.category(),
            FlowError::Lifecycle(_) => ErrorCategory::Protocol,
        }
    }
}

/// A failed flow with its lifecycle, ending in `FAILED`.
#[derive(Debug, thiserror::Error)]
#[error("bridge flow {} failed: {error}", .lifecycle.flow_id)]
pub struct FlowFailure {
    /// Lifecycle as it stood when the flow failed.
    pub lifecycle: RequestLifecycle,
    /// The failing step's error.
    #[source]
    pub error: FlowError,
}

/// A completed flow.
#[derive(Debug, Clone)]
pub struct FlowReport {
    /// Lifecycle ending in `DONE`.
    pub lifecycle: RequestLifecycle,
    /// The bridged request.
    pub request_id: BridgeRequestId,
    /// The validator's commit attestation.
    pub attestation: CommitAttestation,
    /// The destination `Acquire` event.
    pub acquire: Logged<AcquireEvent>,
}

impl FlowReport {
    /// Token minted on the destination chain.
    pub fn new_token_id(&self) -> U256 {
        self.acquire.event.new_token_id
    }
}

/// Owner-side driver for one transfer at a time.
pub struct OwnerFlow {
    owner: Arc<TokenOwner>,
    validator: Arc<dyn ValidatorService>,
    retry: RetryPolicy,
}

impl OwnerFlow {
    pub fn new(
        owner: Arc<TokenOwner>,
        validator: Arc<dyn ValidatorService>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            owner,
            validator,
            retry,
        }
    }

    /// Bridge `token_id` across `context`.
    pub async fn run(
        &self,
        context: BridgeContext,
        token_id: U256,
        cancel: &CancellationToken,
    ) -> Result<FlowReport, FlowFailure> {
        let mut lifecycle = RequestLifecycle::new(token_id);
        let span = tracing::info_span!("owner_flow", flow_id = %lifecycle.flow_id, token_id = %token_id);
        let outcome = self
            .drive(&mut lifecycle, context, token_id, cancel)
            .instrument(span.clone())
            .await;
        let _entered = span.enter();

        match outcome {
            Ok((request_id, attestation, acquire)) => {
                tracing::info!(new_token_id = %acquire.event.new_token_id, "bridge flow done");
                Ok(FlowReport {
                    lifecycle,
                    request_id,
                    attestation,
                    acquire,
                })
            }
            Err(error) => {
                let phase = lifecycle.phase;
                // A terminal lifecycle cannot fail again; the error is kept as is.
                let _ = lifecycle.fail(error.category(), error.to_string());
                tracing::warn!(%phase, category = %error.category(), "bridge flow failed: {error}");
                Err(FlowFailure { lifecycle, error })
            }
        }
    }

    async fn drive(
        &self,
        lifecycle: &mut RequestLifecycle,
        context: BridgeContext,
        token_id: U256,
        cancel: &CancellationToken,
    ) -> Result<(BridgeRequestId, CommitAttestation, Logged<AcquireEvent>), FlowError> {
        let owner = self.owner.as_ref();

        // Phase 1
        owner
            .approve_for_all(context.from_token, context.from_bridge)
            .await?;
        lifecycle.approved()?;

        let nonce = owner.get_request_nonce(context.from_bridge).await?;
        lifecycle.nonce_fetched(nonce)?;

        let token_uri = owner
            .get_token_uri(context.from_bridge, context.from_token, token_id)
            .await?;
        let request_id = BridgeRequestId::new(context, owner.address(), nonce);
        let request = BridgeRequest::new(request_id.clone(), token_id, token_uri);

        let authn_challenge = self.validator.issue_challenge(&request_id).await?;
        let owner_signature = owner.sign_request(&request, &authn_challenge)?;
        lifecycle.signed()?;

        // Phase 2, on the validator
        let pending = owner
            .bind_commit_listener(request_id.context.from_bridge, nonce)
            .await?;
        lifecycle.submitted()?;
        let attestation = self
            .validator
            .process_request(&SignedBridgeRequest {
                request: request.clone(),
                authn_challenge,
                owner_signature,
            })
            .await?;

        // Phase 3
        let observed = pending.wait(owner.commit_wait(), cancel).await?;
        if observed.event.commitment != attestation.commitment {
            return Err(BridgeError::from(ValidationFailure::CommitmentMismatch {
                commitment: observed.event.commitment.0,
            })
            .into());
        }
        lifecycle.commit_observed(observed.event.commitment.0, observed.block_number)?;

        let commit = owner
            .wait_for_finality_from(
                &request_id,
                Some(observed.block_number),
                &self.retry,
                cancel,
            )
            .await?;

        let secret = self
            .retry
            .run("secret reveal", cancel, || {
                self.validator.reveal_secret(&request_id)
            })
            .await?;
        if !commit.event.commitment.is_opened_by(&secret) {
            return Err(BridgeError::from(ValidationFailure::CommitmentMismatch {
                commitment: commit.event.commitment.0,
            })
            .into());
        }
        lifecycle.secret_revealed()?;

        let validator_signature = owner
            .fetch_validator_signature(request_id.context.from_bridge, nonce)
            .await?;
        lifecycle.acquiring()?;
        let acquire = owner
            .acquire(&request, &commit.event, secret, validator_signature)
            .await?;

        let new_token_id = acquire.event.new_token_id;
        let holder = owner
            .destination_owner_of(request_id.context.to_token, new_token_id)
            .await?;
        if holder != owner.address() {
            return Err(BridgeError::from(ValidationFailure::NotTokenOwner {
                token_id: new_token_id,
                claimed: owner.address(),
                actual: holder,
            })
            .into());
        }
        lifecycle.done(new_token_id)?;

        Ok((request_id, attestation, acquire))
    }
}
