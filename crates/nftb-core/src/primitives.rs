//! # Ledger Primitives
//!
//! The EVM value types come from `alloy-primitives`: 20-byte [`Address`],
//! 32-byte [`B256`] words and hashes, and [`U256`] integers. This module
//! adds the two bridge-specific values, [`ChainId`] and [`TokenUri`].
//!
//! ## Serde
//!
//! - `Address` serializes EIP-55 checksummed and parses any casing.
//! - `B256` and `TokenUri` serialize as `0x`-prefixed lowercase hex.
//! - `U256` serializes as minimal `0x` hex and parses hex or decimal strings.
//! - `ChainId` serializes as a bare integer.

use std::fmt;

use serde::{Deserialize, Serialize};

pub use alloy_primitives::{Address, Bytes, B256, U256};

/// Lowercase `0x`-prefixed hex of any fixed-width value.
///
/// Used where an encoding must not depend on checksum casing.
pub fn lower_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

// ---------------------------------------------------------------------------
// ChainId
// ---------------------------------------------------------------------------

/// An EVM chain identifier (EIP-155).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Return the inner integer.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Widen for 32-byte message encoding.
    pub fn to_u256(&self) -> U256 {
        U256::from(self.0)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

// ---------------------------------------------------------------------------
// TokenUri
// ---------------------------------------------------------------------------

/// The metadata pointer of a token, as returned by the source bridge.
///
/// Treated as opaque bytes; the bridge may transform the token contract's
/// raw URI before handing it out. Variable length, so message encodings
/// hash it before inclusion.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenUri(pub Bytes);

impl TokenUri {
    /// Build from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Bytes::from(bytes.into()))
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Best-effort UTF-8 view for logs and display.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}

impl From<&str> for TokenUri {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl fmt::Display for TokenUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for TokenUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenUri({:?})", self.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use proptest::prelude::*;

    #[test]
    fn address_parsing_ignores_casing() {
        let mixed: Address = "0x2c1449643E7D0C478eFC47f84AcbBbbF03399a79".parse().unwrap();
        let lower: Address = "0x2c1449643e7d0c478efc47f84acbbbbf03399a79".parse().unwrap();
        assert_eq!(mixed, lower);
        assert_eq!(
            lower_hex(mixed),
            "0x2c1449643e7d0c478efc47f84acbbbbf03399a79"
        );
        assert!("0xaabb".parse::<Address>().is_err());
    }

    #[test]
    fn address_serde_roundtrip() {
        let addr = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn u256_is_zero_padded_big_endian() {
        let bytes = U256::from(328u64).to_be_bytes::<32>();
        assert_eq!(&bytes[..30], &[0u8; 30]);
        assert_eq!(bytes[30], 0x01);
        assert_eq!(bytes[31], 0x48);
    }

    #[test]
    fn u256_wire_form_is_hex() {
        let json = serde_json::to_string(&U256::from(7u64)).unwrap();
        assert_eq!(json, "\"0x7\"");
        let back: U256 = serde_json::from_str("\"0x7\"").unwrap();
        assert_eq!(back, U256::from(7u64));
        assert_eq!(U256::from(328u64).to_string(), "328");
    }

    #[test]
    fn chain_id_is_a_bare_integer() {
        assert_eq!(serde_json::to_string(&ChainId(97)).unwrap(), "97");
        assert_eq!(ChainId(97).to_u256(), U256::from(97u64));
    }

    #[test]
    fn token_uri_serializes_as_hex() {
        let uri = TokenUri::from("abc");
        let json = serde_json::to_string(&uri).unwrap();
        assert_eq!(json, "\"0x616263\"");
        let back: TokenUri = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uri);
        assert_eq!(back.to_string(), "abc");
    }

    proptest! {
        #[test]
        fn u256_order_matches_u128_order(a in any::<u128>(), b in any::<u128>()) {
            prop_assert_eq!(U256::from(a).cmp(&U256::from(b)), a.cmp(&b));
        }
    }
}
