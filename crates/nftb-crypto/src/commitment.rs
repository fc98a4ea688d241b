//! # Commitments: Stateless Secret Derivation
//!
//! The validator never stores secrets. For a request it derives
//!
//! ```text
//! secret     = HMAC-SHA-512/256(commitKey, canonical(requestId))
//! commitment = keccak256(secret)
//! ```
//!
//! so the same request always yields the same pair and the secret can be
//! re-derived at reveal time from the request id alone. HMAC-SHA-512/256 is
//! HMAC-SHA-512 with the output truncated to the first 32 bytes.
//!
//! ## Security Invariant
//!
//! - The commit key is erased on drop and never formatted.
//! - A commitment reveals nothing about the secret until the secret is
//!   published; the destination bridge checks `keccak256(secret)` against the
//!   commitment recorded in the validator signature.

use std::fmt;

use alloy_primitives::keccak256;
use hmac::{Hmac, Mac};
use nftb_core::{BridgeRequestId, B256};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::CryptoError;

type HmacSha512 = Hmac<Sha512>;

/// Long-term validator key for commitment and challenge MACs.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CommitKey([u8; 32]);

impl CommitKey {
    /// Generate a key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wrap existing key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse 64 hex characters, optionally `0x`-prefixed.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let t = s.trim();
        let digits = t.strip_prefix("0x").unwrap_or(t);
        let bytes = Zeroizing::new(
            hex::decode(digits).map_err(|e| CryptoError::HexDecode(e.to_string()))?,
        );
        let arr = <[u8; 32]>::try_from(bytes.as_slice())
            .map_err(|_| CryptoError::Mac(format!("commit key must be 32 bytes, got {}", bytes.len())))?;
        Ok(Self(arr))
    }

    /// HMAC-SHA-512/256 of `message`.
    pub(crate) fn mac(&self, message: &[u8]) -> Result<[u8; 32], CryptoError> {
        let mut mac = <HmacSha512 as Mac>::new_from_slice(&self.0)
            .map_err(|e| CryptoError::Mac(e.to_string()))?;
        mac.update(message);
        let full = mac.finalize().into_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&full[..32]);
        Ok(out)
    }

    /// Constant-time check of a truncated MAC.
    pub(crate) fn verify_mac(&self, message: &[u8], tag: &[u8]) -> Result<bool, CryptoError> {
        if tag.len() != 32 {
            return Ok(false);
        }
        let mut mac = <HmacSha512 as Mac>::new_from_slice(&self.0)
            .map_err(|e| CryptoError::Mac(e.to_string()))?;
        mac.update(message);
        Ok(mac.verify_truncated_left(tag).is_ok())
    }
}

impl fmt::Debug for CommitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CommitKey(<redacted>)")
    }
}

/// The hidden value whose Keccak digest is the commitment.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret([u8; 32]);

impl Secret {
    /// Wrap raw secret bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The commitment this secret opens.
    pub fn commitment(&self) -> Commitment {
        Commitment(keccak256(self.0))
    }

    /// `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(commitment={})", self.commitment().0)
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let word = B256::deserialize(deserializer)?;
        Ok(Self(word.0))
    }
}

/// Keccak-256 digest of a [`Secret`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(pub B256);

impl Commitment {
    /// Whether `secret` opens this commitment.
    pub fn is_opened_by(&self, secret: &Secret) -> bool {
        secret.commitment() == *self
    }

    /// The underlying word.
    pub fn as_b256(&self) -> &B256 {
        &self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Derives secrets and commitments from request identities.
#[derive(Debug, Clone)]
pub struct CommitmentGenerator {
    key: CommitKey,
}

impl CommitmentGenerator {
    /// Use an existing key.
    pub fn new(key: CommitKey) -> Self {
        Self { key }
    }

    /// Use a freshly generated key.
    pub fn generate() -> Self {
        Self::new(CommitKey::generate())
    }

    /// The underlying key, shared with challenge issuance.
    pub fn key(&self) -> &CommitKey {
        &self.key
    }

    /// The secret for `request_id`.
    pub fn secret(&self, request_id: &BridgeRequestId) -> Result<Secret, CryptoError> {
        let bytes = self.key.mac(request_id.canonical_string().as_bytes())?;
        Ok(Secret(bytes))
    }

    /// The commitment for `request_id`.
    pub fn commitment(&self, request_id: &BridgeRequestId) -> Result<Commitment, CryptoError> {
        Ok(self.secret(request_id)?.commitment())
    }
}
