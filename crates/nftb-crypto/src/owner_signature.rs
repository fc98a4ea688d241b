//! # Owner Signature
//!
//! The token owner authorizes a transfer by signing:
//!
//! ```text
//! "RequestBridge"
//! || fromChainId(32) || fromToken(20) || fromBridge(20)
//! || toChainId(32)   || toToken(20)   || toBridge(20)
//! || requestNonce(32) || tokenId(32)
//! || keccak256(authnChallenge)
//! ```
//!
//! The owner address itself is not in the message; it is recovered from the
//! signature and compared with the claimed owner.

use nftb_core::{Address, BridgeRequest, ChainId, U256};
use serde::{Deserialize, Serialize};

use crate::challenge::AuthnChallenge;
use crate::message::{PackedMessage, ProtocolMessage};

/// Fields covered by the owner signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerMessage {
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
    /// Owner's current nonce on the source bridge.
    pub request_nonce: U256,
    /// Token being bridged.
    pub token_id: U256,
    /// Challenge from the validator, or the placeholder.
    pub authn_challenge: AuthnChallenge,
}

impl OwnerMessage {
    /// Build the message for `request` under `challenge`.
    pub fn for_request(request: &BridgeRequest, challenge: &AuthnChallenge) -> Self {
        let c = request.context();
        Self {
            from_chain_id: c.from_chain_id,
            from_token: c.from_token,
            from_bridge: c.from_bridge,
            to_chain_id: c.to_chain_id,
            to_token: c.to_token,
            to_bridge: c.to_bridge,
            request_nonce: request.id.request_nonce,
            token_id: request.token_id,
            authn_challenge: challenge.clone(),
        }
    }
}

impl ProtocolMessage for OwnerMessage {
    const TAG: &'static str = "RequestBridge";

    fn encode(&self) -> Vec<u8> {
        PackedMessage::tagged(Self::TAG)
            .uint(&self.from_chain_id.to_u256())
            .address(&self.from_token)
            .address(&self.from_bridge)
            .uint(&self.to_chain_id.to_u256())
            .address(&self.to_token)
            .address(&self.to_bridge)
            .uint(&self.request_nonce)
            .uint(&self.token_id)
            .hashed(self.authn_challenge.as_bytes())
            .into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecdsa::SigningKey;
    use nftb_core::{BridgeContext, BridgeRequestId, TokenUri};
    use proptest::prelude::*;

    fn request(owner: Address, nonce: u64, token_id: u64) -> BridgeRequest {
        BridgeRequest::new(
            BridgeRequestId::new(
                BridgeContext::new(
                    ChainId(31337),
                    Address::repeat_byte(1),
                    Address::repeat_byte(2),
                    ChainId(31338),
                    Address::repeat_byte(3),
                    Address::repeat_byte(4),
                ),
                owner,
                U256::from(nonce),
            ),
            U256::from(token_id),
            TokenUri::from("ipfs://token"),
        )
    }

    #[test]
    fn encoded_length_is_fixed() {
        let msg = OwnerMessage::for_request(
            &request(Address::ZERO, 0, 1),
            &AuthnChallenge::placeholder(),
        );
        assert_eq!(msg.encode().len(), 13 + 32 * 4 + 20 * 4 + 32);
        assert_eq!(&msg.encode()[..13], b"RequestBridge");
    }

    #[test]
    fn owner_signs_and_validator_verifies() {
        let owner = SigningKey::generate();
        let msg = OwnerMessage::for_request(
            &request(owner.address(), 0, 1),
            &AuthnChallenge::placeholder(),
        );
        let sig = msg.sign(&owner).unwrap();
        assert!(msg.verify(&owner.address(), &sig));
    }

    #[test]
    fn signature_by_another_key_is_rejected() {
        let owner = SigningKey::generate();
        let thief = SigningKey::generate();
        let msg = OwnerMessage::for_request(
            &request(owner.address(), 0, 1),
            &AuthnChallenge::placeholder(),
        );
        let sig = msg.sign(&thief).unwrap();
        assert!(!msg.verify(&owner.address(), &sig));
    }

    #[test]
    fn challenge_change_invalidates_signature() {
        let owner = SigningKey::generate();
        let req = request(owner.address(), 0, 1);
        let msg = OwnerMessage::for_request(&req, &AuthnChallenge::placeholder());
        let sig = msg.sign(&owner).unwrap();
        let other = OwnerMessage::for_request(&req, &AuthnChallenge(vec![1, 2, 3]));
        assert!(!other.verify(&owner.address(), &sig));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn any_field_change_breaks_verification(field in 0usize..9, delta in 1u64..1000) {
            let owner = SigningKey::from_bytes(&[0x11; 32]).unwrap();
            let msg = OwnerMessage::for_request(
                &request(owner.address(), 4, 9),
                &AuthnChallenge::placeholder(),
            );
            let sig = msg.sign(&owner).unwrap();

            let mut tampered = msg.clone();
            let bump = |a: &mut Address| a.0[19] = a.0[19].wrapping_add(delta as u8 | 1);
            match field {
                0 => tampered.from_chain_id = ChainId(msg.from_chain_id.0 + delta),
                1 => bump(&mut tampered.from_token),
                2 => bump(&mut tampered.from_bridge),
                3 => tampered.to_chain_id = ChainId(msg.to_chain_id.0 + delta),
                4 => bump(&mut tampered.to_token),
                5 => bump(&mut tampered.to_bridge),
                6 => tampered.request_nonce = U256::from(4 + delta),
                7 => tampered.token_id = U256::from(9 + delta),
                _ => tampered.authn_challenge = AuthnChallenge(delta.to_be_bytes().to_vec()),
            }
            prop_assert!(!tampered.verify(&owner.address(), &sig));
        }
    }
}
