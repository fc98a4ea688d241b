//! # Validator Agent
//!
//! One long-lived instance per deployment, holding one signing identity and
//! one in-memory commitment key. It accepts signed bridge requests, checks
//! them against the source ledger, and publishes a commitment on-chain.
//! Later it reveals the secret behind that commitment, but only once its own
//! finality check passes.
//!
//! ## Security Invariant
//!
//! No ledger write happens before every validation step succeeded: the
//! commitment and the validator signature are pure functions, and the
//! `commit` transaction is the last step of [`Validator::process_request`].
//! [`Validator::reveal_secret`] never trusts the requester's view of
//! finality.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use nftb_core::{
    Address, BridgeError, BridgeRequestId, ChainId, UnixTimestamp, ValidationFailure,
};
use nftb_crypto::{
    AuthnChallenge, CommitmentGenerator, OwnerMessage, ProtocolMessage, Secret, SigningKey,
    ValidatorMessage,
};
use nftb_ledger::{CommitCall, Destination, SourceLedger};

use crate::config::{ChallengePolicy, ValidatorSettings};
use crate::dedup::SubmissionGuard;
use crate::finality::FinalityOracle;
use crate::flow::{CommitAttestation, SignedBridgeRequest, ValidatorService};

/// The validator agent.
pub struct Validator {
    signer: SigningKey,
    commitments: CommitmentGenerator,
    ledgers: HashMap<ChainId, Arc<dyn SourceLedger>>,
    finality: FinalityOracle,
    challenge: ChallengePolicy,
    submissions: SubmissionGuard,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("address", &self.signer.address())
            .field("chains", &self.ledgers.keys().collect::<Vec<_>>())
            .field("finality", &self.finality)
            .field("challenge", &self.challenge)
            .finish_non_exhaustive()
    }
}

impl Validator {
    /// A validator with no ledgers attached.
    pub fn new(
        signer: SigningKey,
        commitments: CommitmentGenerator,
        settings: &ValidatorSettings,
    ) -> Self {
        Self {
            signer,
            commitments,
            ledgers: HashMap::new(),
            finality: FinalityOracle::new(settings.finality_blocks),
            challenge: settings.challenge,
            submissions: SubmissionGuard::new(),
        }
    }

    /// Attach a source ledger. The handle must send transactions from the
    /// validator's own account.
    pub fn with_ledger(mut self, ledger: Arc<dyn SourceLedger>) -> Self {
        if ledger.account() != self.signer.address() {
            tracing::warn!(
                chain_id = %ledger.chain_id(),
                account = %ledger.account(),
                validator = %self.signer.address(),
                "ledger handle does not act as the validator; commits will revert"
            );
        }
        self.ledgers.insert(ledger.chain_id(), ledger);
        self
    }

    /// The validator's signing address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Chains this validator serves.
    pub fn chains(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.ledgers.keys().copied()
    }

    fn ledger(&self, chain_id: ChainId) -> Result<&dyn SourceLedger, BridgeError> {
        self.ledgers
            .get(&chain_id)
            .map(|l| l.as_ref())
            .ok_or_else(|| ValidationFailure::UnsupportedChain { chain_id }.into())
    }

    // ─── Challenges ─────────────────────────────────────────────────

    /// Challenge the owner must sign for `request_id`.
    pub async fn issue_challenge(
        &self,
        request_id: &BridgeRequestId,
    ) -> Result<AuthnChallenge, BridgeError> {
        self.ledger(request_id.context.from_chain_id)?;
        match self.challenge {
            ChallengePolicy::Placeholder => Ok(AuthnChallenge::placeholder()),
            ChallengePolicy::Issued { ttl_secs } => {
                let expires_at = UnixTimestamp::now().plus_secs(ttl_secs);
                AuthnChallenge::issue(self.commitments.key(), request_id, expires_at).map_err(
                    |e| BridgeError::Crypto {
                        reason: e.to_string(),
                    },
                )
            }
        }
    }

    fn check_challenge(
        &self,
        request_id: &BridgeRequestId,
        challenge: &AuthnChallenge,
    ) -> Result<(), ValidationFailure> {
        match self.challenge {
            ChallengePolicy::Placeholder if challenge.is_placeholder() => Ok(()),
            ChallengePolicy::Placeholder => Err(ValidationFailure::InvalidChallenge {
                reason: "only the 0x00 placeholder is accepted".into(),
            }),
            ChallengePolicy::Issued { .. } => challenge
                .verify(self.commitments.key(), request_id, UnixTimestamp::now())
                .map_err(|e| ValidationFailure::InvalidChallenge {
                    reason: e.to_string(),
                }),
        }
    }

    // ─── Requests ───────────────────────────────────────────────────

    /// Validate a signed request and commit it on the source ledger.
    pub async fn process_request(
        &self,
        signed: &SignedBridgeRequest,
    ) -> Result<CommitAttestation, BridgeError> {
        let result = self.commit_request(signed).await;
        let outcome = match &result {
            Ok(_) => "committed",
            Err(e) => category_label(e),
        };
        metrics::counter!("nftb_validator_requests_total", "outcome" => outcome).increment(1);
        if let Err(e) = &result {
            tracing::warn!(
                owner = %signed.request.id.token_owner,
                nonce = %signed.request.id.request_nonce,
                category = %e.category(),
                "request refused: {e}"
            );
        }
        result
    }

    async fn commit_request(
        &self,
        signed: &SignedBridgeRequest,
    ) -> Result<CommitAttestation, BridgeError> {
        let request = &signed.request;
        let id = &request.id;
        let ctx = &id.context;
        let owner = id.token_owner;
        let ledger = self.ledger(ctx.from_chain_id)?;

        // (a) owner authorization
        self.check_challenge(id, &signed.authn_challenge)?;
        let message = OwnerMessage::for_request(request, &signed.authn_challenge);
        if !message.verify(&owner, &signed.owner_signature) {
            return Err(ValidationFailure::InvalidOwnerSignature {
                owner,
                nonce: id.request_nonce,
            }
            .into());
        }

        // (b) ledger facts
        let actual = ledger.owner_of(ctx.from_token, request.token_id).await?;
        if actual != owner {
            return Err(ValidationFailure::NotTokenOwner {
                token_id: request.token_id,
                claimed: owner,
                actual,
            }
            .into());
        }
        let approved = ledger
            .is_approved_for_all(ctx.from_token, owner, ctx.from_bridge)
            .await?
            || ledger.get_approved(ctx.from_token, request.token_id).await? == ctx.from_bridge;
        if !approved {
            return Err(ValidationFailure::BridgeNotApproved {
                token: ctx.from_token,
                token_id: request.token_id,
                bridge: ctx.from_bridge,
            }
            .into());
        }
        let current = ledger.request_nonce(ctx.from_bridge, owner).await?;
        if current != id.request_nonce {
            return Err(ValidationFailure::NonceMismatch {
                owner,
                requested: id.request_nonce,
                current,
            }
            .into());
        }

        // (c) the attested URI must be the one the owner presents at acquire
        let token_uri = ledger
            .token_uri(ctx.from_bridge, ctx.from_token, request.token_id)
            .await?;
        if token_uri != request.token_uri {
            return Err(ValidationFailure::TokenUriMismatch {
                token_id: request.token_id,
                requested: request.token_uri.clone(),
                ledger: token_uri,
            }
            .into());
        }

        // (d)-(f) commitment, timestamp, attestation
        let commitment = self.commitments.commitment(id).map_err(crypto)?;
        let request_timestamp = UnixTimestamp::now();
        let validator_signature = ValidatorMessage::new(
            id,
            request.token_id,
            token_uri.clone(),
            commitment,
            request_timestamp,
        )
        .sign(&self.signer)
        .map_err(crypto)?;

        // (g) the only write
        let ticket = self.submissions.begin("commit", id)?;
        let commit_tx = ledger
            .commit(
                ctx.from_bridge,
                CommitCall {
                    from_token: ctx.from_token,
                    destination: Destination::of(ctx),
                    token_owner: owner,
                    request_nonce: id.request_nonce,
                    token_id: request.token_id,
                    commitment,
                    request_timestamp,
                    authn_challenge: signed.authn_challenge.clone(),
                    owner_signature: signed.owner_signature,
                    validator_signature,
                },
            )
            .await?;
        ticket.complete();

        tracing::info!(
            chain_id = %ctx.from_chain_id,
            owner = %owner,
            nonce = %id.request_nonce,
            block = commit_tx.block_number,
            commitment = %commitment,
            "commit submitted"
        );
        Ok(CommitAttestation {
            request_id: id.clone(),
            commitment,
            request_timestamp,
            token_uri,
            validator_signature,
            commit_tx,
        })
    }

    // ─── Reveal ─────────────────────────────────────────────────────

    /// Reveal the secret for `request_id` once its commit is final.
    pub async fn reveal_secret(&self, request_id: &BridgeRequestId) -> Result<Secret, BridgeError> {
        let result = self.open_commitment(request_id).await;
        let outcome = match &result {
            Ok(_) => "revealed",
            Err(e) => category_label(e),
        };
        metrics::counter!("nftb_validator_reveals_total", "outcome" => outcome).increment(1);
        result
    }

    async fn open_commitment(&self, request_id: &BridgeRequestId) -> Result<Secret, BridgeError> {
        let ledger = self.ledger(request_id.context.from_chain_id)?;
        let event = match self.finality.require_final(ledger, request_id).await {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(
                    owner = %request_id.token_owner,
                    nonce = %request_id.request_nonce,
                    "reveal withheld: {e}"
                );
                return Err(e);
            }
        };
        let secret = self.commitments.secret(request_id).map_err(crypto)?;
        if !event.event.commitment.is_opened_by(&secret) {
            return Err(ValidationFailure::CommitmentMismatch {
                commitment: event.event.commitment.0,
            }
            .into());
        }
        tracing::info!(
            owner = %request_id.token_owner,
            nonce = %request_id.request_nonce,
            block = event.block_number,
            "secret revealed"
        );
        Ok(secret)
    }
}

#[async_trait]
impl ValidatorService for Validator {
    async fn issue_challenge(
        &self,
        request_id: &BridgeRequestId,
    ) -> Result<AuthnChallenge, BridgeError> {
        Validator::issue_challenge(self, request_id).await
    }

    async fn process_request(
        &self,
        request: &SignedBridgeRequest,
    ) -> Result<CommitAttestation, BridgeError> {
        Validator::process_request(self, request).await
    }

    async fn reveal_secret(&self, request_id: &BridgeRequestId) -> Result<Secret, BridgeError> {
        Validator::reveal_secret(self, request_id).await
    }
}

fn crypto(e: impl std::fmt::Display) -> BridgeError {
    BridgeError::Crypto {
        reason: e.to_string(),
    }
}

fn category_label(e: &BridgeError) -> &'static str {
    match e.category() {
        nftb_core::ErrorCategory::Validation => "rejected",
        nftb_core::ErrorCategory::NotReady => "not_ready",
        nftb_core::ErrorCategory::Transport => "transport",
        nftb_core::ErrorCategory::OnChainRejection => "reverted",
        nftb_core::ErrorCategory::Protocol => "protocol",
    }
}
