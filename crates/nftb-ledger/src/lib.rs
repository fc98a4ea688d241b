//! # nftb-ledger: Ledger Collaborators
//!
//! The protocol touches ledgers only through the narrow interface in
//! [`ledger`]: ownership and approval reads, the source bridge's nonce,
//! token URI and recorded validator signature, the `commit` and `acquire`
//! transactions, commit-event queries, and a one-shot commit-event
//! subscription.
//!
//! [`memory::InMemoryChain`] implements the interface with ERC-721 and
//! bridge semantics held in process memory. It mines one block per
//! transaction and lets tests advance the head with `mine`.
//!
//! ## Architecture
//!
//! Each trait object is a *handle*: one chain seen from one account. Writes
//! are sent from that account, which is how a bridge knows whether the
//! caller is its validator.

pub mod ledger;
pub mod memory;
pub mod types;

pub use ledger::{ChainReader, CommitSubscription, DestinationLedger, SourceLedger};
pub use memory::{ChainHandle, InMemoryChain};
pub use types::{
    AcquireCall, AcquireEvent, BlockRange, CommitCall, CommitEvent, CommitFilter, Destination,
    Logged, Origin, TokenInfo, TxReceipt,
};
