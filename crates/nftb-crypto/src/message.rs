//! # Packed Protocol Messages
//!
//! Both signed messages of the protocol share one encoding: an ASCII tag
//! followed by fields packed without padding or length prefixes.
//!
//! | Field kind | Encoding |
//! |---|---|
//! | integer (chain id, nonce, token id, timestamp) | 32-byte big-endian |
//! | address | raw 20 bytes |
//! | commitment | raw 32 bytes |
//! | variable-length bytes (token URI, challenge) | `keccak256(bytes)` |
//!
//! Hashing the variable-length fields keeps every field at a fixed offset,
//! so the packed form is unambiguous without delimiters.

use alloy_primitives::keccak256;
use nftb_core::{Address, B256, U256};

use crate::ecdsa::{verify_personal, CompactSignature, SigningKey};
use crate::error::CryptoError;

/// Builder for a packed message.
#[derive(Debug, Clone, Default)]
pub struct PackedMessage {
    buf: Vec<u8>,
}

impl PackedMessage {
    /// Start a message with its ASCII protocol tag.
    pub fn tagged(tag: &str) -> Self {
        Self {
            buf: tag.as_bytes().to_vec(),
        }
    }

    /// Append a 32-byte big-endian integer.
    pub fn uint(mut self, value: &U256) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes::<32>());
        self
    }

    /// Append a raw 20-byte address.
    pub fn address(mut self, address: &Address) -> Self {
        self.buf.extend_from_slice(address.as_slice());
        self
    }

    /// Append a raw 32-byte word.
    pub fn word(mut self, word: &B256) -> Self {
        self.buf.extend_from_slice(word.as_slice());
        self
    }

    /// Append the Keccak-256 digest of a variable-length field.
    pub fn hashed(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(keccak256(bytes).as_slice());
        self
    }

    /// Finish and return the packed bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// A protocol message signed as an EIP-191 personal message.
pub trait ProtocolMessage {
    /// ASCII tag leading the packed encoding.
    const TAG: &'static str;

    /// The packed bytes that get signed.
    fn encode(&self) -> Vec<u8>;

    /// Sign the packed message.
    fn sign(&self, key: &SigningKey) -> Result<CompactSignature, CryptoError> {
        key.sign_personal(&self.encode())
    }

    /// Whether `signature` recovers to `signer` over this message.
    fn verify(&self, signer: &Address, signature: &CompactSignature) -> bool {
        verify_personal(signer, &self.encode(), signature)
    }
}
