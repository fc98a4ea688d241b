//! # Owner Request State Machine
//!
//! One [`RequestLifecycle`] per outstanding transfer. The lifecycle also
//! collects the facts learned along the way (nonce, commitment, new token
//! id) so the final record describes the whole flow.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use nftb_core::{ErrorCategory, UnixTimestamp, B256, U256};

// ─── Phase ───────────────────────────────────────────────────────────

/// Phase of an owner-side transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestPhase {
    /// Flow created, nothing done on-chain yet.
    Created,
    /// Source bridge approved to move the token.
    Approved,
    /// Current request nonce read from the source bridge.
    NonceFetched,
    /// Owner signature produced.
    Signed,
    /// Request handed to the validator; waiting for the commit event.
    AwaitingCommit,
    /// Commit event seen; waiting for confirmations.
    WaitingFinality,
    /// Validator released the secret.
    SecretRevealed,
    /// Acquire transaction submitted on the destination chain.
    Acquiring,
    /// Token minted on the destination chain (terminal).
    Done,
    /// The flow stopped with an error (terminal).
    Failed,
}

impl RequestPhase {
    /// Whether the phase is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// The only phase a successful step may move to.
    pub fn next(&self) -> Option<RequestPhase> {
        let next = match self {
            Self::Created => Self::Approved,
            Self::Approved => Self::NonceFetched,
            Self::NonceFetched => Self::Signed,
            Self::Signed => Self::AwaitingCommit,
            Self::AwaitingCommit => Self::WaitingFinality,
            Self::WaitingFinality => Self::SecretRevealed,
            Self::SecretRevealed => Self::Acquiring,
            Self::Acquiring => Self::Done,
            Self::Done | Self::Failed => return None,
        };
        Some(next)
    }
}

impl std::fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Approved => "APPROVED",
            Self::NonceFetched => "NONCE_FETCHED",
            Self::Signed => "SIGNED",
            Self::AwaitingCommit => "AWAITING_COMMIT",
            Self::WaitingFinality => "WAITING_FINALITY",
            Self::SecretRevealed => "SECRET_REVEALED",
            Self::Acquiring => "ACQUIRING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The requested phase is not the successor of the current one.
    #[error("invalid request transition: {from} -> {to}")]
    InvalidTransition {
        /// Current phase.
        from: RequestPhase,
        /// Attempted phase.
        to: RequestPhase,
    },

    /// The flow already ended.
    #[error("request flow is in terminal phase {phase}")]
    TerminalPhase {
        /// The terminal phase.
        phase: RequestPhase,
    },
}

// ─── Records ─────────────────────────────────────────────────────────

/// One recorded phase change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    /// Phase before.
    pub from: RequestPhase,
    /// Phase after.
    pub to: RequestPhase,
    /// When the change happened.
    pub at: UnixTimestamp,
}

/// Why and where a flow failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Phase that was active when the error occurred.
    pub phase: RequestPhase,
    /// Error category, in snake case.
    pub category: String,
    /// Rendered error.
    pub reason: String,
}

// ─── Lifecycle ───────────────────────────────────────────────────────

/// Owner-side record of one transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLifecycle {
    /// Correlation id used in logs.
    pub flow_id: Uuid,
    /// Current phase.
    pub phase: RequestPhase,
    /// Token being bridged.
    pub token_id: U256,
    /// Nonce the request was signed with.
    pub request_nonce: Option<U256>,
    /// Commitment from the commit event.
    pub commitment: Option<B256>,
    /// Block that included the commit event.
    pub commit_block: Option<u64>,
    /// Token minted on the destination chain.
    pub new_token_id: Option<U256>,
    /// Ordered transition log.
    pub history: Vec<PhaseTransition>,
    /// Set once the flow fails.
    pub failure: Option<FailureRecord>,
}

impl RequestLifecycle {
    /// Start a flow for `token_id`.
    pub fn new(token_id: U256) -> Self {
        Self {
            flow_id: Uuid::new_v4(),
            phase: RequestPhase::Created,
            token_id,
            request_nonce: None,
            commitment: None,
            commit_block: None,
            new_token_id: None,
            history: Vec::new(),
            failure: None,
        }
    }

    /// Move to `to`, which must be the successor of the current phase.
    pub fn advance(&mut self, to: RequestPhase) -> Result<(), LifecycleError> {
        if self.phase.is_terminal() {
            return Err(LifecycleError::TerminalPhase { phase: self.phase });
        }
        if self.phase.next() != Some(to) {
            return Err(LifecycleError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        self.record(to);
        Ok(())
    }

    /// CREATED → APPROVED.
    pub fn approved(&mut self) -> Result<(), LifecycleError> {
        self.advance(RequestPhase::Approved)
    }

    /// APPROVED → NONCE_FETCHED.
    pub fn nonce_fetched(&mut self, nonce: U256) -> Result<(), LifecycleError> {
        self.advance(RequestPhase::NonceFetched)?;
        self.request_nonce = Some(nonce);
        Ok(())
    }

    /// NONCE_FETCHED → SIGNED.
    pub fn signed(&mut self) -> Result<(), LifecycleError> {
        self.advance(RequestPhase::Signed)
    }

    /// SIGNED → AWAITING_COMMIT.
    pub fn submitted(&mut self) -> Result<(), LifecycleError> {
        self.advance(RequestPhase::AwaitingCommit)
    }

    /// AWAITING_COMMIT → WAITING_FINALITY.
    pub fn commit_observed(&mut self, commitment: B256, block: u64) -> Result<(), LifecycleError> {
        self.advance(RequestPhase::WaitingFinality)?;
        self.commitment = Some(commitment);
        self.commit_block = Some(block);
        Ok(())
    }

    /// WAITING_FINALITY → SECRET_REVEALED.
    pub fn secret_revealed(&mut self) -> Result<(), LifecycleError> {
        self.advance(RequestPhase::SecretRevealed)
    }

    /// SECRET_REVEALED → ACQUIRING.
    pub fn acquiring(&mut self) -> Result<(), LifecycleError> {
        self.advance(RequestPhase::Acquiring)
    }

    /// ACQUIRING → DONE.
    pub fn done(&mut self, new_token_id: U256) -> Result<(), LifecycleError> {
        self.advance(RequestPhase::Done)?;
        self.new_token_id = Some(new_token_id);
        Ok(())
    }

    /// Any non-terminal phase → FAILED.
    pub fn fail(
        &mut self,
        category: ErrorCategory,
        reason: impl Into<String>,
    ) -> Result<(), LifecycleError> {
        if self.phase.is_terminal() {
            return Err(LifecycleError::TerminalPhase { phase: self.phase });
        }
        self.failure = Some(FailureRecord {
            phase: self.phase,
            category: category.to_string(),
            reason: reason.into(),
        });
        self.record(RequestPhase::Failed);
        Ok(())
    }

    /// Whether the flow has ended.
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    fn record(&mut self, to: RequestPhase) {
        self.history.push(PhaseTransition {
            from: self.phase,
            to,
            at: UnixTimestamp::now(),
        });
        self.phase = to;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
