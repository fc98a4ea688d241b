//! # Authentication Challenges
//!
//! A challenge binds an owner signature to a particular validator and a
//! bounded time window. Challenges are stateless: the validator can check
//! one it issued without having stored it.
//!
//! ## Layout
//!
//! ```text
//! expiresAt (8 bytes, big-endian unix seconds)
//! || HMAC-SHA-512/256(key, "challenge||" + canonical(requestId) + "||expiresAt:" + expiresAt)
//! ```
//!
//! The MAC shares the commitment key but not its message space: commitment
//! secrets are MACs over the bare canonical string, which never starts with
//! `challenge||`.
//!
//! A validator running with the placeholder policy accepts only the single
//! byte `0x00`, which is also what owners send when no challenge was issued.

use std::fmt;

use nftb_core::{BridgeRequestId, UnixTimestamp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::commitment::CommitKey;
use crate::error::ChallengeError;

/// Total length of an issued challenge.
pub const ISSUED_CHALLENGE_LEN: usize = 8 + 32;

/// Opaque challenge bytes carried in the owner message.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AuthnChallenge(pub Vec<u8>);

impl AuthnChallenge {
    /// The fixed placeholder challenge, a single zero byte.
    pub fn placeholder() -> Self {
        Self(vec![0x00])
    }

    /// Whether this is the placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.0.as_slice() == [0x00]
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Issue a challenge for `request_id` valid until `expires_at`.
    pub fn issue(
        key: &CommitKey,
        request_id: &BridgeRequestId,
        expires_at: UnixTimestamp,
    ) -> Result<Self, ChallengeError> {
        let tag = key.mac(challenge_input(request_id, expires_at).as_bytes())?;
        let mut out = Vec::with_capacity(ISSUED_CHALLENGE_LEN);
        out.extend_from_slice(&expires_at.as_secs().to_be_bytes());
        out.extend_from_slice(&tag);
        Ok(Self(out))
    }

    /// Check a challenge previously issued with `key` for `request_id`.
    pub fn verify(
        &self,
        key: &CommitKey,
        request_id: &BridgeRequestId,
        now: UnixTimestamp,
    ) -> Result<(), ChallengeError> {
        if self.0.len() != ISSUED_CHALLENGE_LEN {
            return Err(ChallengeError::Malformed {
                expected: ISSUED_CHALLENGE_LEN,
                got: self.0.len(),
            });
        }
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&self.0[..8]);
        let expires_at = UnixTimestamp::from_secs(u64::from_be_bytes(ts));
        if now > expires_at {
            return Err(ChallengeError::Expired {
                expires_at: expires_at.as_secs(),
                now: now.as_secs(),
            });
        }
        let input = challenge_input(request_id, expires_at);
        if key.verify_mac(input.as_bytes(), &self.0[8..])? {
            Ok(())
        } else {
            Err(ChallengeError::Forged)
        }
    }
}

fn challenge_input(request_id: &BridgeRequestId, expires_at: UnixTimestamp) -> String {
    format!(
        "challenge||{}||expiresAt:{}",
        request_id.canonical_string(),
        expires_at.as_secs()
    )
}

impl Default for AuthnChallenge {
    fn default() -> Self {
        Self::placeholder()
    }
}

impl fmt::Debug for AuthnChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthnChallenge(0x{})", hex::encode(&self.0))
    }
}

impl Serialize for AuthnChallenge {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for AuthnChallenge {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let digits = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(digits)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftb_core::{Address, BridgeContext, ChainId, U256};

    fn request_id(nonce: u64) -> BridgeRequestId {
        BridgeRequestId::new(
            BridgeContext::new(
                ChainId(31337),
                Address::repeat_byte(1),
                Address::repeat_byte(2),
                ChainId(31338),
                Address::repeat_byte(3),
                Address::repeat_byte(4),
            ),
            Address::repeat_byte(5),
            U256::from(nonce),
        )
    }

    #[test]
    fn issued_challenge_verifies_before_expiry() {
        let key = CommitKey::from_bytes([7; 32]);
        let id = request_id(0);
        let ch = AuthnChallenge::issue(&key, &id, UnixTimestamp(1_000)).unwrap();
        assert_eq!(ch.as_bytes().len(), ISSUED_CHALLENGE_LEN);
        assert!(ch.verify(&key, &id, UnixTimestamp(1_000)).is_ok());
        assert!(ch.verify(&key, &id, UnixTimestamp(999)).is_ok());
    }

    #[test]
    fn expired_challenge_is_refused() {
        let key = CommitKey::from_bytes([7; 32]);
        let id = request_id(0);
        let ch = AuthnChallenge::issue(&key, &id, UnixTimestamp(1_000)).unwrap();
        assert_eq!(
            ch.verify(&key, &id, UnixTimestamp(1_001)),
            Err(ChallengeError::Expired {
                expires_at: 1_000,
                now: 1_001
            })
        );
    }

    #[test]
    fn challenge_is_bound_to_request_and_key() {
        let key = CommitKey::from_bytes([7; 32]);
        let ch = AuthnChallenge::issue(&key, &request_id(0), UnixTimestamp(1_000)).unwrap();
        assert_eq!(
            ch.verify(&key, &request_id(1), UnixTimestamp(0)),
            Err(ChallengeError::Forged)
        );
        let other = CommitKey::from_bytes([8; 32]);
        assert_eq!(
            ch.verify(&other, &request_id(0), UnixTimestamp(0)),
            Err(ChallengeError::Forged)
        );
    }

    #[test]
    fn extending_expiry_breaks_the_mac() {
        let key = CommitKey::from_bytes([7; 32]);
        let id = request_id(0);
        let mut ch = AuthnChallenge::issue(&key, &id, UnixTimestamp(1_000)).unwrap();
        ch.0[..8].copy_from_slice(&2_000u64.to_be_bytes());
        assert_eq!(
            ch.verify(&key, &id, UnixTimestamp(1_500)),
            Err(ChallengeError::Forged)
        );
    }

    #[test]
    fn placeholder_is_malformed_as_issued_challenge() {
        let key = CommitKey::from_bytes([7; 32]);
        let ch = AuthnChallenge::placeholder();
        assert!(ch.is_placeholder());
        assert!(matches!(
            ch.verify(&key, &request_id(0), UnixTimestamp(0)),
            Err(ChallengeError::Malformed { got: 1, .. })
        ));
    }

    #[test]
    fn serde_hex_roundtrip() {
        let json = serde_json::to_string(&AuthnChallenge::placeholder()).unwrap();
        assert_eq!(json, "\"0x00\"");
        let back: AuthnChallenge = serde_json::from_str(&json).unwrap();
        assert!(back.is_placeholder());
    }
}
