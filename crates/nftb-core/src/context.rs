//! # Bridge Context and Request Identity
//!
//! ## Types
//!
//! - [`BridgeContext`]: the two chains and four contracts of one transfer
//!   direction.
//! - [`BridgeRequestId`]: context + token owner + request nonce. Uniquely
//!   identifies one transfer attempt.
//! - [`BridgeRequest`]: request id + token id + token URI. The subject of
//!   the owner's signature.
//!
//! ## Nonces
//!
//! The request nonce is issued by the source bridge per owner and only ever
//! grows. The off-chain layer treats it as opaque and always re-reads it from
//! the ledger; nothing here tracks or increments it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::primitives::{lower_hex, Address, ChainId, TokenUri, U256};

/// The ledgers and contracts participating in one direction of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BridgeContext {
    /// Source chain.
    pub from_chain_id: ChainId,
    /// Token contract on the source chain.
    pub from_token: Address,
    /// Bridge contract on the source chain.
    pub from_bridge: Address,
    /// Destination chain.
    pub to_chain_id: ChainId,
    /// Token contract on the destination chain.
    pub to_token: Address,
    /// Bridge contract on the destination chain.
    pub to_bridge: Address,
}

impl BridgeContext {
    /// Assemble a context.
    pub fn new(
        from_chain_id: ChainId,
        from_token: Address,
        from_bridge: Address,
        to_chain_id: ChainId,
        to_token: Address,
        to_bridge: Address,
    ) -> Self {
        Self {
            from_chain_id,
            from_token,
            from_bridge,
            to_chain_id,
            to_token,
            to_bridge,
        }
    }
}

/// Identity of one transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BridgeRequestId {
    /// Transfer direction.
    pub context: BridgeContext,
    /// Owner of the token on the source chain.
    pub token_owner: Address,
    /// Nonce issued by the source bridge for this owner.
    pub request_nonce: U256,
}

impl BridgeRequestId {
    /// Assemble a request id.
    pub fn new(context: BridgeContext, token_owner: Address, request_nonce: U256) -> Self {
        Self {
            context,
            token_owner,
            request_nonce,
        }
    }

    /// Injective string over every identifying field.
    ///
    /// Layout (all hex lowercase, fixed width):
    ///
    /// ```text
    /// fromChainId:0x<16>||fromToken:0x<40>||fromBridge:0x<40>||
    /// toChainId:0x<16>||toToken:0x<40>||toBridge:0x<40>||
    /// tokenOwner:0x<40>||requestNonce:0x<64>
    /// ```
    ///
    /// This is the message of the validator's keyed derivations; changing it
    /// orphans every outstanding commitment.
    pub fn canonical_string(&self) -> String {
        let c = &self.context;
        format!(
            "fromChainId:0x{:016x}||fromToken:{}||fromBridge:{}||toChainId:0x{:016x}||toToken:{}||toBridge:{}||tokenOwner:{}||requestNonce:0x{}",
            c.from_chain_id.as_u64(),
            lower_hex(c.from_token),
            lower_hex(c.from_bridge),
            c.to_chain_id.as_u64(),
            lower_hex(c.to_token),
            lower_hex(c.to_bridge),
            lower_hex(self.token_owner),
            hex::encode(self.request_nonce.to_be_bytes::<32>()),
        )
    }
}

impl fmt::Display for BridgeRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}@{}->{}",
            self.token_owner, self.request_nonce, self.context.from_chain_id, self.context.to_chain_id
        )
    }
}

/// A transfer request as signed by the token owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRequest {
    /// Request identity.
    pub id: BridgeRequestId,
    /// Token being bridged.
    pub token_id: U256,
    /// Token URI as read by the owner through the source bridge.
    pub token_uri: TokenUri,
}

impl BridgeRequest {
    /// Assemble a request once nonce and URI are known.
    pub fn new(id: BridgeRequestId, token_id: U256, token_uri: TokenUri) -> Self {
        Self {
            id,
            token_id,
            token_uri,
        }
    }

    /// Shorthand for the request's context.
    pub fn context(&self) -> &BridgeContext {
        &self.id.context
    }
}
