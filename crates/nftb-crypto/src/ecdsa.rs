//! # secp256k1 Personal-Message Signatures
//!
//! The signature scheme shared by owner and validator:
//!
//! 1. Prefix the packed message per EIP-191 version `0x45`:
//!    `"\x19Ethereum Signed Message:\n" || decimal(len(message)) || message`.
//! 2. Hash with Keccak-256 ([`eip191_hash_message`]).
//! 3. Sign with secp256k1 ECDSA (RFC 6979 nonces, low-S).
//! 4. Serialize as a 64-byte EIP-2098 compact signature:
//!    `r || (yParity << 255 | s)`.
//!
//! Verification recovers the public key, derives the address
//! (`keccak256(pubkey_uncompressed[1..])[12..]`) and compares it to the
//! claimed signer. A mismatch is a hard failure.
//!
//! ## Security Invariant
//!
//! - `SigningKey` does not implement `Serialize` and redacts itself in
//!   `Debug`. Its scalar is erased on drop.

use std::fmt;

use alloy_primitives::eip191_hash_message;
use nftb_core::Address;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Derive the ledger address of a public key.
pub fn address_of(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    Address::from_raw_public_key(&uncompressed[1..])
}

// ---------------------------------------------------------------------------
// CompactSignature
// ---------------------------------------------------------------------------

/// A 64-byte EIP-2098 compact signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompactSignature(pub [u8; 64]);

impl CompactSignature {
    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from 128 hex characters, optionally `0x`-prefixed.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let t = s.trim();
        let digits = t.strip_prefix("0x").unwrap_or(t);
        let bytes = hex::decode(digits).map_err(|e| CryptoError::HexDecode(e.to_string()))?;
        <[u8; 64]>::try_from(bytes.as_slice())
            .map(Self)
            .map_err(|_| {
                CryptoError::InvalidSignature(format!(
                    "compact signature must be 64 bytes, got {}",
                    bytes.len()
                ))
            })
    }

    /// Expand to the 65-byte `r || s || v` form with `v ∈ {27, 28}`.
    pub fn to_rsv(&self) -> [u8; 65] {
        let (rs, parity) = self.split();
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&rs);
        out[64] = 27 + parity;
        out
    }

    /// Split into `r || s` and the y-parity bit.
    fn split(&self) -> ([u8; 64], u8) {
        let mut rs = self.0;
        let parity = rs[32] >> 7;
        rs[32] &= 0x7f;
        (rs, parity)
    }

    fn to_recoverable(self) -> Result<RecoverableSignature, CryptoError> {
        let (rs, parity) = self.split();
        let recid = RecoveryId::from_i32(i32::from(parity))
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
        RecoverableSignature::from_compact(&rs, recid)
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))
    }
}

impl fmt::Debug for CompactSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompactSignature({}...)", &self.to_hex()[..10])
    }
}

impl fmt::Display for CompactSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for CompactSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CompactSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// SigningKey
// ---------------------------------------------------------------------------

/// A secp256k1 signing identity.
pub struct SigningKey {
    secret: SecretKey,
    address: Address,
}

impl SigningKey {
    /// Generate a fresh key from the OS RNG.
    pub fn generate() -> Self {
        let secret = SecretKey::new(&mut rand::rngs::OsRng);
        Self::from_secret(secret)
    }

    /// Load a key from its 32-byte scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| CryptoError::InvalidSecretKey(e.to_string()))?;
        Ok(Self::from_secret(secret))
    }

    /// Load a key from 64 hex characters, optionally `0x`-prefixed.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let t = s.trim();
        let digits = t.strip_prefix("0x").unwrap_or(t);
        let bytes = Zeroizing::new(
            hex::decode(digits).map_err(|e| CryptoError::HexDecode(e.to_string()))?,
        );
        let arr: Zeroizing<[u8; 32]> = Zeroizing::new(
            <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
                CryptoError::InvalidSecretKey(format!("expected 32 bytes, got {}", bytes.len()))
            })?,
        );
        Self::from_bytes(&arr)
    }

    fn from_secret(secret: SecretKey) -> Self {
        let public = PublicKey::from_secret_key(SECP256K1, &secret);
        Self {
            address: address_of(&public),
            secret,
        }
    }

    /// The address controlled by this key.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Hex export of the scalar, for key generation tooling only.
    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(self.secret.secret_bytes())))
    }

    /// Sign `message` as an EIP-191 personal message.
    pub fn sign_personal(&self, message: &[u8]) -> Result<CompactSignature, CryptoError> {
        let digest = eip191_hash_message(message);
        let msg = Message::from_digest(digest.0);
        let sig = SECP256K1.sign_ecdsa_recoverable(&msg, &self.secret);
        let (recid, rs) = sig.serialize_compact();
        let parity = recid.to_i32();
        if !(0..=1).contains(&parity) {
            return Err(CryptoError::UnencodableRecoveryId(parity));
        }
        let mut out = rs;
        // libsecp256k1 emits low-S, so the top bit of s is free.
        out[32] |= (parity as u8) << 7;
        Ok(CompactSignature(out))
    }
}

impl Drop for SigningKey {
    fn drop(&mut self) {
        self.secret.non_secure_erase();
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey({}, <private>)", self.address)
    }
}

// ---------------------------------------------------------------------------
// Recovery / verification
// ---------------------------------------------------------------------------

/// Recover the address that signed `message` as a personal message.
pub fn recover_personal(
    message: &[u8],
    signature: &CompactSignature,
) -> Result<Address, CryptoError> {
    let digest = eip191_hash_message(message);
    let msg = Message::from_digest(digest.0);
    let sig = signature.to_recoverable()?;
    let public = SECP256K1
        .recover_ecdsa(&msg, &sig)
        .map_err(|e| CryptoError::Recovery(e.to_string()))?;
    Ok(address_of(&public))
}

/// Whether `signature` over `message` recovers to `signer`.
///
/// Any parse or recovery failure counts as a mismatch.
pub fn verify_personal(signer: &Address, message: &[u8], signature: &CompactSignature) -> bool {
    matches!(recover_personal(message, signature), Ok(recovered) if recovered == *signer)
}
