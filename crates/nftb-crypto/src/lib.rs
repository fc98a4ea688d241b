//! # nftb-crypto: Cryptographic Primitives
//!
//! Provides the cryptographic building blocks of the commit-reveal bridge:
//!
//! - **Keccak-256** hashing, re-exported from `alloy-primitives`.
//! - **Packed message encoding** ([`message`]): protocol tag followed by
//!   32-byte big-endian integers, raw 20-byte addresses, raw 32-byte words,
//!   and Keccak digests of variable-length fields.
//! - **Personal-message signatures** ([`ecdsa`]): EIP-191 over secp256k1,
//!   serialized as 64-byte EIP-2098 compact signatures. Verification
//!   recovers the signer and compares addresses.
//! - **Owner and validator schemes** ([`owner_signature`],
//!   [`validator_signature`]): the two signed message containers of the
//!   protocol.
//! - **Commitments** ([`commitment`]): stateless keyed derivation of the
//!   reveal secret from the request identity.
//! - **Authentication challenges** ([`challenge`]): validator-issued,
//!   expiring, and verifiable without storage.
//!
//! ## Crate Policy
//!
//! - Depends only on `nftb-core` internally.
//! - Private key material never appears in `Debug` output and is erased on
//!   drop.
//! - Tests use the real primitives; nothing cryptographic is mocked.

pub mod challenge;
pub mod commitment;
pub mod ecdsa;
pub mod error;
pub mod message;
pub mod owner_signature;
pub mod validator_signature;

pub use challenge::AuthnChallenge;
pub use commitment::{CommitKey, Commitment, CommitmentGenerator, Secret};
pub use ecdsa::{CompactSignature, SigningKey};
pub use error::{ChallengeError, CryptoError};
pub use alloy_primitives::keccak256;
pub use message::{PackedMessage, ProtocolMessage};
pub use owner_signature::OwnerMessage;
pub use validator_signature::ValidatorMessage;
