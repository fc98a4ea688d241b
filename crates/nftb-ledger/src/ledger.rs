//! # Ledger Traits
//!
//! The read/write surface the agents need from each ledger, split by role.
//! Every method returns [`LedgerError`] for transport problems and for
//! reverted transactions. Domain checks (ownership, approval, nonce) are the
//! agents' job; the ledger only reports facts.
//!
//! ## Subscriptions
//!
//! [`CommitSubscription`] is armed with one filter and resolves with the
//! first matching event. It is consumed by [`CommitSubscription::once`];
//! dropping it, including by cancelling the future, detaches the listener.

use async_trait::async_trait;
use tokio::sync::broadcast;

use nftb_core::{Address, ChainId, LedgerError, TokenUri, U256};
use nftb_crypto::CompactSignature;

use crate::types::{
    AcquireCall, AcquireEvent, BlockRange, CommitCall, CommitEvent, CommitFilter, Logged,
    TxReceipt,
};

/// Reads every role needs.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Chain this handle talks to.
    fn chain_id(&self) -> ChainId;

    /// Account writes are sent from.
    fn account(&self) -> Address;

    /// Current head block number.
    async fn block_number(&self) -> Result<u64, LedgerError>;

    /// ERC-721 `ownerOf`.
    async fn owner_of(&self, token: Address, token_id: U256) -> Result<Address, LedgerError>;
}

/// Source-chain token and bridge access.
#[async_trait]
pub trait SourceLedger: ChainReader {
    /// ERC-721 `isApprovedForAll`.
    async fn is_approved_for_all(
        &self,
        token: Address,
        owner: Address,
        operator: Address,
    ) -> Result<bool, LedgerError>;

    /// ERC-721 `getApproved`; the zero address when unset.
    async fn get_approved(&self, token: Address, token_id: U256) -> Result<Address, LedgerError>;

    /// ERC-721 `setApprovalForAll` from this handle's account.
    async fn set_approval_for_all(
        &self,
        token: Address,
        operator: Address,
        approved: bool,
    ) -> Result<TxReceipt, LedgerError>;

    /// ERC-721 `approve` from this handle's account.
    async fn approve(
        &self,
        token: Address,
        spender: Address,
        token_id: U256,
    ) -> Result<TxReceipt, LedgerError>;

    /// Current request nonce of `owner` on `bridge`.
    async fn request_nonce(&self, bridge: Address, owner: Address) -> Result<U256, LedgerError>;

    /// Token URI as exposed by `bridge`.
    async fn token_uri(
        &self,
        bridge: Address,
        token: Address,
        token_id: U256,
    ) -> Result<TokenUri, LedgerError>;

    /// Validator signature recorded by `bridge` for `(owner, nonce)`.
    async fn validator_signature(
        &self,
        bridge: Address,
        owner: Address,
        request_nonce: U256,
    ) -> Result<Option<CompactSignature>, LedgerError>;

    /// Submit a `commit` transaction.
    async fn commit(&self, bridge: Address, call: CommitCall) -> Result<TxReceipt, LedgerError>;

    /// Commit events of `bridge` matching `filter` within `range`,
    /// oldest first.
    async fn commit_events(
        &self,
        bridge: Address,
        filter: &CommitFilter,
        range: BlockRange,
    ) -> Result<Vec<Logged<CommitEvent>>, LedgerError>;

    /// Arm a one-shot listener for future commit events of `bridge`.
    async fn subscribe_commits(
        &self,
        bridge: Address,
        filter: CommitFilter,
    ) -> Result<CommitSubscription, LedgerError>;
}

/// Destination-chain bridge access.
#[async_trait]
pub trait DestinationLedger: ChainReader {
    /// Submit an `acquire` transaction; returns the `Acquire` event.
    async fn acquire(
        &self,
        bridge: Address,
        call: AcquireCall,
    ) -> Result<Logged<AcquireEvent>, LedgerError>;

    /// Acquire events of `bridge` within `range`, oldest first.
    async fn acquire_events(
        &self,
        bridge: Address,
        range: BlockRange,
    ) -> Result<Vec<Logged<AcquireEvent>>, LedgerError>;
}

/// A listener bound to one bridge and one filter.
#[derive(Debug)]
pub struct CommitSubscription {
    chain_id: ChainId,
    bridge: Address,
    filter: CommitFilter,
    rx: broadcast::Receiver<Logged<CommitEvent>>,
}

impl CommitSubscription {
    /// Wrap a broadcast receiver of every commit event on the chain.
    pub fn new(
        chain_id: ChainId,
        bridge: Address,
        filter: CommitFilter,
        rx: broadcast::Receiver<Logged<CommitEvent>>,
    ) -> Self {
        Self {
            chain_id,
            bridge,
            filter,
            rx,
        }
    }

    /// Wait for the first matching event.
    pub async fn once(mut self) -> Result<Logged<CommitEvent>, LedgerError> {
        loop {
            match self.rx.recv().await {
                Ok(logged) => {
                    if logged.address == self.bridge && self.filter.matches(&logged.event) {
                        return Ok(logged);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        chain_id = %self.chain_id,
                        skipped,
                        "commit subscription lagged; skipped events"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(LedgerError::SubscriptionClosed {
                        chain_id: self.chain_id,
                    });
                }
            }
        }
    }
}
