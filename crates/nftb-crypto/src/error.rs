//! # Cryptographic Error Types
//!
//! Structured errors for all cryptographic operations in `nftb-crypto`.

use thiserror::Error;

/// Errors from signing, recovery, and keyed derivations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Private key bytes are not a valid secp256k1 scalar.
    #[error("invalid secp256k1 secret key: {0}")]
    InvalidSecretKey(String),

    /// Signature bytes could not be parsed.
    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),

    /// Public key recovery failed.
    #[error("signer recovery failed: {0}")]
    Recovery(String),

    /// The produced recovery id cannot be expressed as an EIP-2098 parity bit.
    #[error("recovery id {0} cannot be encoded in a compact signature")]
    UnencodableRecoveryId(i32),

    /// HMAC initialisation failed.
    #[error("mac error: {0}")]
    Mac(String),

    /// Hex decoding failed.
    #[error("hex decode error: {0}")]
    HexDecode(String),
}

/// Reasons an authentication challenge is refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    /// Wrong length for an issued challenge.
    #[error("challenge must be {expected} bytes, got {got}")]
    Malformed {
        /// Required length.
        expected: usize,
        /// Supplied length.
        got: usize,
    },

    /// The challenge lifetime has passed.
    #[error("challenge expired at {expires_at}, now {now}")]
    Expired {
        /// Expiry carried in the challenge.
        expires_at: u64,
        /// Verification time.
        now: u64,
    },

    /// The MAC does not match this validator key and request.
    #[error("challenge was not issued by this validator for this request")]
    Forged,

    /// Key setup failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
