//! Call, event, and filter types shared by every ledger implementation.

use serde::{Deserialize, Serialize};

use nftb_core::{Address, BridgeContext, BridgeRequestId, ChainId, TokenUri, UnixTimestamp, B256, U256};
use nftb_crypto::{AuthnChallenge, Commitment, CompactSignature, Secret};

/// Destination half of a [`BridgeContext`], as passed to `commit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Destination chain.
    pub to_chain_id: ChainId,
    /// Destination token contract.
    pub to_token: Address,
    /// Destination bridge contract.
    pub to_bridge: Address,
}

/// Source half of a [`BridgeContext`], as passed to `acquire`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Source chain.
    pub from_chain_id: ChainId,
    /// Source token contract.
    pub from_token: Address,
    /// Source bridge contract.
    pub from_bridge: Address,
}

impl Origin {
    /// The source half of `context`.
    pub fn of(context: &BridgeContext) -> Self {
        Self {
            from_chain_id: context.from_chain_id,
            from_token: context.from_token,
            from_bridge: context.from_bridge,
        }
    }
}

impl Destination {
    /// The destination half of `context`.
    pub fn of(context: &BridgeContext) -> Self {
        Self {
            to_chain_id: context.to_chain_id,
            to_token: context.to_token,
            to_bridge: context.to_bridge,
        }
    }
}

/// The token as it exists on the source chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Source token id.
    pub token_id: U256,
    /// Source token URI.
    pub token_uri: TokenUri,
}

/// Arguments of the source bridge's `commit` transaction.
#[derive(Debug, Clone)]
pub struct CommitCall {
    /// Source token contract.
    pub from_token: Address,
    /// Where the token is going.
    pub destination: Destination,
    /// Owner of the token.
    pub token_owner: Address,
    /// Owner's nonce the request was signed with.
    pub request_nonce: U256,
    /// Token being bridged.
    pub token_id: U256,
    /// Commitment to the reveal secret.
    pub commitment: Commitment,
    /// Validator's acceptance time.
    pub request_timestamp: UnixTimestamp,
    /// Challenge covered by the owner signature.
    pub authn_challenge: AuthnChallenge,
    /// Owner's authorization.
    pub owner_signature: CompactSignature,
    /// Validator's attestation.
    pub validator_signature: CompactSignature,
}

/// Arguments of the destination bridge's `acquire` transaction.
#[derive(Debug, Clone)]
pub struct AcquireCall {
    /// Where the token came from.
    pub origin: Origin,
    /// Owner receiving the new token.
    pub token_owner: Address,
    /// The source token.
    pub old_token: TokenInfo,
    /// Commitment published at commit time.
    pub commitment: Commitment,
    /// Secret opening the commitment.
    pub secret: Secret,
    /// Timestamp from the commit.
    pub request_timestamp: UnixTimestamp,
    /// Validator attestation read back from the source bridge.
    pub validator_signature: CompactSignature,
}

/// Event emitted by the source bridge on a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEvent {
    /// Source token contract.
    pub from_token: Address,
    /// Destination chain.
    pub to_chain_id: ChainId,
    /// Destination token contract.
    pub to_token: Address,
    /// Destination bridge contract.
    pub to_bridge: Address,
    /// Owner of the token.
    pub token_owner: Address,
    /// Nonce consumed by the commit.
    pub request_nonce: U256,
    /// Token escrowed.
    pub token_id: U256,
    /// Published commitment.
    pub commitment: Commitment,
    /// Validator's acceptance time.
    pub request_timestamp: UnixTimestamp,
}

impl CommitEvent {
    /// Rebuild the request id, given the source chain and bridge that
    /// emitted the event.
    pub fn request_id(&self, from_chain_id: ChainId, from_bridge: Address) -> BridgeRequestId {
        BridgeRequestId::new(
            BridgeContext::new(
                from_chain_id,
                self.from_token,
                from_bridge,
                self.to_chain_id,
                self.to_token,
                self.to_bridge,
            ),
            self.token_owner,
            self.request_nonce,
        )
    }
}

/// Event emitted by the destination bridge on a successful acquire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireEvent {
    /// Where the token came from.
    pub origin: Origin,
    /// Owner of the new token.
    pub token_owner: Address,
    /// Source token id.
    pub old_token_id: U256,
    /// Token minted on this chain.
    pub new_token_id: U256,
    /// Commitment consumed.
    pub commitment: Commitment,
    /// Timestamp from the commit.
    pub request_timestamp: UnixTimestamp,
}

/// An event together with where it was logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logged<E> {
    /// The decoded event.
    pub event: E,
    /// Emitting contract.
    pub address: Address,
    /// Block that included the transaction.
    pub block_number: u64,
    /// Transaction hash.
    pub tx_hash: B256,
}

/// Minimal transaction receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Transaction hash.
    pub tx_hash: B256,
    /// Block that included the transaction.
    pub block_number: u64,
}

/// Indexed-field filter over commit events. `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitFilter {
    /// Match on owner.
    pub token_owner: Option<Address>,
    /// Match on nonce.
    pub request_nonce: Option<U256>,
    /// Match on commitment.
    pub commitment: Option<Commitment>,
}

impl CommitFilter {
    /// Events of one request, keyed `(tokenOwner, requestNonce)`.
    pub fn by_request(token_owner: Address, request_nonce: U256) -> Self {
        Self {
            token_owner: Some(token_owner),
            request_nonce: Some(request_nonce),
            commitment: None,
        }
    }

    /// Events carrying one commitment.
    pub fn by_commitment(commitment: Commitment) -> Self {
        Self {
            commitment: Some(commitment),
            ..Self::default()
        }
    }

    /// Whether `event` passes the filter.
    pub fn matches(&self, event: &CommitEvent) -> bool {
        self.token_owner.map_or(true, |o| o == event.token_owner)
            && self.request_nonce.map_or(true, |n| n == event.request_nonce)
            && self.commitment.map_or(true, |c| c == event.commitment)
    }
}

/// Inclusive block range for event queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    /// First block.
    pub from: u64,
    /// Last block; `None` means the current head.
    pub to: Option<u64>,
}

impl BlockRange {
    /// The whole chain history.
    pub fn all() -> Self {
        Self { from: 0, to: None }
    }

    /// The `lookback` blocks ending at `head`, clamped at genesis.
    pub fn last(lookback: u64, head: u64) -> Self {
        Self {
            from: head.saturating_sub(lookback),
            to: Some(head),
        }
    }

    /// Whether `block` lies in the range.
    pub fn contains(&self, block: u64) -> bool {
        block >= self.from && self.to.map_or(true, |to| block <= to)
    }
}
