//! # Error Types: Protocol Failure Taxonomy
//!
//! Every failure the agents can report falls into exactly one category:
//!
//! | Category | Meaning | Caller policy |
//! |---|---|---|
//! | `Validation` | bad signature, wrong owner, missing approval, nonce mismatch | fatal to the request, never retried |
//! | `NotReady` | commit not mined, commit not yet final | expected; poll or wait |
//! | `Transport` | no provider, RPC failure, dropped subscription | retry with backoff |
//! | `OnChainRejection` | a transaction reverted | inspect; do not resubmit blindly |
//! | `Protocol` | timeout, cancellation, duplicate submission | surfaced to the operator |
//!
//! Variants carry the ids and values that failed the check so callers can
//! log or display them without string parsing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::primitives::{Address, ChainId, TokenUri, B256, U256};

/// Coarse failure category of a [`BridgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A domain rule was violated.
    Validation,
    /// A condition that resolves by itself with time.
    NotReady,
    /// Connectivity to a ledger failed.
    Transport,
    /// A ledger accepted the call and reverted it.
    OnChainRejection,
    /// A hardening guard fired: timeout, cancellation, duplicate submission.
    Protocol,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::NotReady => "not_ready",
            Self::Transport => "transport",
            Self::OnChainRejection => "on_chain_rejection",
            Self::Protocol => "protocol",
        };
        f.write_str(s)
    }
}

/// Top-level error type for the bridging protocol.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A validation check rejected the request.
    #[error("request rejected: {0}")]
    Rejected(#[from] ValidationFailure),

    /// The commit is not yet mined or not yet final.
    #[error("not ready: {0}")]
    NotReady(#[from] NotReady),

    /// A ledger call failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A bounded wait ran out.
    #[error("{operation} timed out after {attempts} attempt(s) and {elapsed_ms}ms")]
    Timeout {
        /// The wait that expired.
        operation: String,
        /// Attempts made before giving up.
        attempts: u32,
        /// Time spent waiting.
        elapsed_ms: u64,
    },

    /// The caller cancelled a pending wait.
    #[error("{operation} was cancelled")]
    Cancelled {
        /// The wait that was cancelled.
        operation: String,
    },

    /// A ledger-mutating call for this request is already in flight or done.
    #[error("duplicate {kind} submission for request {request}")]
    DuplicateSubmission {
        /// `commit` or `acquire`.
        kind: &'static str,
        /// Display form of the request id.
        request: String,
    },

    /// Key handling or signing failed locally.
    #[error("cryptographic failure: {reason}")]
    Crypto {
        /// Rendered crypto error.
        reason: String,
    },

    /// A remote agent reported an error that has no structured form here,
    /// or could not be reached.
    #[error("remote {category} error: {message}")]
    Remote {
        /// Category reported by the remote side.
        category: ErrorCategory,
        /// Remote error message.
        message: String,
    },
}

impl BridgeError {
    /// The failure category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Rejected(_) => ErrorCategory::Validation,
            Self::NotReady(_) => ErrorCategory::NotReady,
            Self::Ledger(LedgerError::Reverted { .. }) => ErrorCategory::OnChainRejection,
            Self::Ledger(_) => ErrorCategory::Transport,
            Self::Timeout { .. }
            | Self::Cancelled { .. }
            | Self::DuplicateSubmission { .. }
            | Self::Crypto { .. } => ErrorCategory::Protocol,
            Self::Remote { category, .. } => *category,
        }
    }

    /// Whether a caller may retry the same call later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::NotReady | ErrorCategory::Transport
        )
    }

    /// Whether this is a not-ready condition rather than a failure.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }
}

/// Domain-rule violations. Fatal to the request.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationFailure {
    /// The owner signature does not recover to the claimed owner.
    #[error("invalid owner signature for owner {owner} nonce {nonce}")]
    InvalidOwnerSignature {
        /// Claimed signer.
        owner: Address,
        /// Nonce of the rejected request.
        nonce: U256,
    },

    /// The authentication challenge is malformed, forged, or expired.
    #[error("invalid authentication challenge: {reason}")]
    InvalidChallenge {
        /// Which check failed.
        reason: String,
    },

    /// The requester does not own the token on the source chain.
    #[error("requester {claimed} is not owner of token {token_id} (owner is {actual})")]
    NotTokenOwner {
        /// Token being bridged.
        token_id: U256,
        /// Owner named in the request.
        claimed: Address,
        /// Owner according to the ledger.
        actual: Address,
    },

    /// The source bridge is not approved to move the token.
    #[error("bridge {bridge} is not approved for token {token_id} of {token}")]
    BridgeNotApproved {
        /// Token contract.
        token: Address,
        /// Token being bridged.
        token_id: U256,
        /// Bridge lacking approval.
        bridge: Address,
    },

    /// The request nonce is stale or from the future.
    #[error("request nonce mismatch for owner {owner}: request carries {requested}, ledger expects {current}")]
    NonceMismatch {
        /// Owner the nonce belongs to.
        owner: Address,
        /// Nonce in the request.
        requested: U256,
        /// Current nonce on the source bridge.
        current: U256,
    },

    /// The request's token URI differs from the one the source bridge reports.
    #[error("token URI mismatch for token {token_id}: request carries {requested:?}, source reports {ledger:?}")]
    TokenUriMismatch {
        /// Token being bridged.
        token_id: U256,
        /// URI in the request.
        requested: TokenUri,
        /// URI the source bridge returns.
        ledger: TokenUri,
    },

    /// A validator signature does not recover to the validator.
    #[error("invalid validator signature: expected signer {expected}")]
    InvalidValidatorSignature {
        /// Expected validator address.
        expected: Address,
    },

    /// The revealed secret does not open the published commitment.
    #[error("secret does not open commitment {commitment}")]
    CommitmentMismatch {
        /// The commitment that failed to open.
        commitment: B256,
    },

    /// The agent has no ledger access for the named chain.
    #[error("chain {chain_id} is not supported by this agent")]
    UnsupportedChain {
        /// The unsupported chain.
        chain_id: ChainId,
    },
}

/// Expected, transient conditions resolved by waiting.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotReady {
    /// No matching commit event has been observed.
    #[error("commit transaction for owner {owner} nonce {nonce} does not exist or has not yet been mined")]
    CommitNotMined {
        /// Owner of the request.
        owner: Address,
        /// Nonce of the request.
        nonce: U256,
    },

    /// The commit event is mined but lacks confirmations.
    #[error("commit transaction is not finalized yet: mined at block {event_block}, head {head}, threshold {threshold}")]
    NotFinal {
        /// Block that included the commit event.
        event_block: u64,
        /// Current chain head.
        head: u64,
        /// Required confirmation depth.
        threshold: u64,
    },
}

/// Failures reported by ledger collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerError {
    /// No connection to the named chain is configured.
    #[error("no provider for chain {chain_id}")]
    NoProvider {
        /// The chain without a provider.
        chain_id: ChainId,
    },

    /// The RPC call failed in transit.
    #[error("rpc error on chain {chain_id}: {message}")]
    Rpc {
        /// Chain the call targeted.
        chain_id: ChainId,
        /// Transport message.
        message: String,
    },

    /// The transaction was mined and reverted.
    #[error("transaction reverted on chain {chain_id}: {reason}")]
    Reverted {
        /// Chain that reverted.
        chain_id: ChainId,
        /// Revert reason.
        reason: String,
    },

    /// An event subscription ended before a matching event arrived.
    #[error("event subscription on chain {chain_id} closed")]
    SubscriptionClosed {
        /// Chain of the subscription.
        chain_id: ChainId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_taxonomy() {
        let rejected: BridgeError = ValidationFailure::NonceMismatch {
            owner: Address::ZERO,
            requested: U256::from(0u64),
            current: U256::from(1u64),
        }
        .into();
        assert_eq!(rejected.category(), ErrorCategory::Validation);
        assert!(!rejected.is_retryable());

        let pending: BridgeError = NotReady::NotFinal {
            event_block: 10,
            head: 11,
            threshold: 6,
        }
        .into();
        assert_eq!(pending.category(), ErrorCategory::NotReady);
        assert!(pending.is_retryable());
        assert!(pending.is_not_ready());

        let rpc: BridgeError = LedgerError::Rpc {
            chain_id: ChainId(1),
            message: "timeout".into(),
        }
        .into();
        assert_eq!(rpc.category(), ErrorCategory::Transport);
        assert!(rpc.is_retryable());

        let reverted: BridgeError = LedgerError::Reverted {
            chain_id: ChainId(1),
            reason: "nonce".into(),
        }
        .into();
        assert_eq!(reverted.category(), ErrorCategory::OnChainRejection);
        assert!(!reverted.is_retryable());

        let dup = BridgeError::DuplicateSubmission {
            kind: "commit",
            request: "x".into(),
        };
        assert_eq!(dup.category(), ErrorCategory::Protocol);

        let remote = BridgeError::Remote {
            category: ErrorCategory::Transport,
            message: "connection refused".into(),
        };
        assert_eq!(remote.category(), ErrorCategory::Transport);
        assert!(remote.is_retryable());
    }

    #[test]
    fn structured_failures_serialize_with_kind_tag() {
        let failure = ValidationFailure::NonceMismatch {
            owner: Address::ZERO,
            requested: U256::from(0u64),
            current: U256::from(1u64),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "nonce_mismatch");
        let back: ValidationFailure = serde_json::from_value(json).unwrap();
        assert_eq!(back, failure);

        let mismatch = ValidationFailure::TokenUriMismatch {
            token_id: U256::from(1u64),
            requested: TokenUri::from("ipfs://a"),
            ledger: TokenUri::from("ipfs://b"),
        };
        let json = serde_json::to_value(&mismatch).unwrap();
        assert_eq!(json["kind"], "token_uri_mismatch");
        assert!(mismatch.to_string().contains("ipfs://b"));
        assert_eq!(BridgeError::from(mismatch).category(), ErrorCategory::Validation);

        let json = serde_json::to_value(ErrorCategory::OnChainRejection).unwrap();
        assert_eq!(json, "on_chain_rejection");
    }

    #[test]
    fn messages_carry_context() {
        let err = NotReady::NotFinal {
            event_block: 10,
            head: 12,
            threshold: 6,
        };
        let msg = err.to_string();
        assert!(msg.contains("block 10"));
        assert!(msg.contains("head 12"));
        assert!(msg.contains("threshold 6"));
    }
}
