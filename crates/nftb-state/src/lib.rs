//! # nftb-state: Request Lifecycle
//!
//! The token owner drives each transfer through a fixed sequence of phases:
//!
//! ```text
//! Created ─▶ Approved ─▶ NonceFetched ─▶ Signed ─▶ AwaitingCommit
//!    ─▶ WaitingFinality ─▶ SecretRevealed ─▶ Acquiring ─▶ Done
//!
//! any non-terminal phase ─▶ Failed
//! ```
//!
//! Phases only move forward one step at a time. `Done` and `Failed` are
//! terminal. Every transition is recorded with its wall-clock time so a
//! stalled flow can be diagnosed from the record alone.

pub mod request;

pub use request::{
    FailureRecord, LifecycleError, PhaseTransition, RequestLifecycle, RequestPhase,
};
