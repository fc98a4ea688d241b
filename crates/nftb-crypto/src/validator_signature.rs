//! # Validator Signature
//!
//! The validator attests to a checked request by signing:
//!
//! ```text
//! "Commit"
//! || fromChainId(32) || fromToken(20) || fromBridge(20)
//! || toChainId(32)   || toToken(20)   || toBridge(20)
//! || tokenOwner(20)  || tokenId(32)
//! || keccak256(tokenUri)
//! || commitment(32)  || requestTimestamp(32)
//! ```
//!
//! Both bridges verify this signature: the source bridge when escrowing the
//! token, the destination bridge when minting it.

use nftb_core::{Address, BridgeRequestId, ChainId, TokenUri, UnixTimestamp, U256};
use serde::{Deserialize, Serialize};

use crate::commitment::Commitment;
use crate::message::{PackedMessage, ProtocolMessage};

/// Fields covered by the validator signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorMessage {
    /// Source chain.
    pub from_chain_id: ChainId,
    /// Source token contract.
    pub from_token: Address,
    /// Source bridge contract.
    pub from_bridge: Address,
    /// Destination chain.
    pub to_chain_id: ChainId,
    /// Destination token contract.
    pub to_token: Address,
    /// Destination bridge contract.
    pub to_bridge: Address,
    /// Owner on the source chain.
    pub token_owner: Address,
    /// Token being bridged.
    pub token_id: U256,
    /// Token metadata URI as read from the source ledger.
    pub token_uri: TokenUri,
    /// Commitment to the reveal secret.
    pub commitment: Commitment,
    /// When the validator accepted the request.
    pub request_timestamp: UnixTimestamp,
}

impl ValidatorMessage {
    /// Build the message attesting `request_id`.
    pub fn new(
        request_id: &BridgeRequestId,
        token_id: U256,
        token_uri: TokenUri,
        commitment: Commitment,
        request_timestamp: UnixTimestamp,
    ) -> Self {
        let c = &request_id.context;
        Self {
            from_chain_id: c.from_chain_id,
            from_token: c.from_token,
            from_bridge: c.from_bridge,
            to_chain_id: c.to_chain_id,
            to_token: c.to_token,
            to_bridge: c.to_bridge,
            token_owner: request_id.token_owner,
            token_id,
            token_uri,
            commitment,
            request_timestamp,
        }
    }
}

impl ProtocolMessage for ValidatorMessage {
    const TAG: &'static str = "Commit";

    fn encode(&self) -> Vec<u8> {
        PackedMessage::tagged(Self::TAG)
            .uint(&self.from_chain_id.to_u256())
            .address(&self.from_token)
            .address(&self.from_bridge)
            .uint(&self.to_chain_id.to_u256())
            .address(&self.to_token)
            .address(&self.to_bridge)
            .address(&self.token_owner)
            .uint(&self.token_id)
            .hashed(self.token_uri.as_bytes())
            .word(self.commitment.as_b256())
            .uint(&self.request_timestamp.to_u256())
            .into_bytes()
    }
}
