//! # nftb-core: Foundational Types for the nftb Bridge
//!
//! This crate defines the value types shared by every participant of the
//! commit-reveal bridging protocol: the token owner, the validator, the
//! denier, and the ledger adapters they talk to. It depends on nothing
//! internal.
//!
//! ## Key Design Principles
//!
//! 1. **Typed ledger primitives.** `Address`, `B256` and `U256` are the
//!    `alloy-primitives` types; `ChainId` and `TokenUri` are newtypes.
//!    No bare strings for addresses or hex payloads.
//!
//! 2. **Immutable request identity.** `BridgeContext`, `BridgeRequestId` and
//!    `BridgeRequest` are plain values. They are built once per bridging
//!    operation and passed by reference; nothing in the workspace mutates
//!    them after construction.
//!
//! 3. **One injective canonical string per request.**
//!    [`BridgeRequestId::canonical_string`] is the only input to the
//!    validator's keyed derivations. Fixed-width hex fields and named
//!    separators rule out ambiguous concatenations.
//!
//! 4. **Tagged errors per failure category.** [`BridgeError`] separates
//!    validation failures, not-yet-ready conditions, transport failures,
//!    on-chain rejections and protocol gaps, each with structured context.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `nftb-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod context;
pub mod error;
pub mod primitives;
pub mod temporal;

pub use context::{BridgeContext, BridgeRequest, BridgeRequestId};
pub use error::{BridgeError, ErrorCategory, LedgerError, NotReady, ValidationFailure};
pub use primitives::{lower_hex, Address, Bytes, ChainId, TokenUri, B256, U256};
pub use temporal::UnixTimestamp;
