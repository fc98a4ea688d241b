//! # nftb-protocol: Commit-Reveal Bridging Agents
//!
//! The off-chain half of the bridge: the agents that move a token from a
//! source ledger to a destination ledger through a commit published by a
//! validator and a secret revealed after finality.
//!
//! ## Agents
//!
//! - [`TokenOwner`]: approves the bridge, signs requests, watches for the
//!   commit, waits for finality, acquires on the destination chain.
//! - [`Validator`]: validates signed requests against the source ledger,
//!   commits them, and reveals secrets only behind its own finality check.
//! - [`Denier`]: audits destination acquisitions against source commits.
//!
//! ## Shared machinery
//!
//! - [`FinalityOracle`]: confirmation-depth rule `head >= block + threshold`.
//! - [`RetryPolicy`]: bounded, cancellable polling with backoff.
//! - [`SubmissionGuard`]: at most one `commit`/`acquire` per request.
//! - [`BridgeConfig`]: YAML configuration, network presets, signer loading.
//! - [`OwnerFlow`]: drives a whole transfer against any [`ValidatorService`].
//!
//! ## Crate Policy
//!
//! - Ledger access only through the `nftb-ledger` traits.
//! - No lock is held across a ledger call.
//! - No `.unwrap()` outside tests.

pub mod config;
pub mod dedup;
pub mod denier;
pub mod finality;
pub mod flow;
pub mod owner;
pub mod retry;
pub mod validator;

pub use config::{
    BridgeConfig, ChallengePolicy, ConfigError, DenierSettings, NetworkInfo, NetworkRegistry,
    OwnerSettings, Profile, Role, ValidatorSettings,
};
pub use dedup::{SubmissionGuard, SubmissionTicket, DEFAULT_COMPLETED_RETENTION};
pub use denier::{Denier, Verdict};
pub use finality::{is_final, FinalityOracle, FinalityStatus};
pub use flow::{
    CommitAttestation, FlowError, FlowFailure, FlowReport, OwnerFlow, SignedBridgeRequest,
    ValidatorService,
};
pub use owner::{PendingCommit, TokenOwner};
pub use retry::RetryPolicy;
pub use validator::Validator;
