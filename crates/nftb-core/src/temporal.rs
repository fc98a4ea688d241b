//! # Wall-Clock Timestamps
//!
//! The validator stamps every attested request with wall-clock seconds.
//! The value travels inside the validator signature as a zero-padded
//! 32-byte integer, so only whole seconds since the Unix epoch are kept.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::primitives::U256;

/// Seconds since the Unix epoch, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixTimestamp(pub u64);

impl UnixTimestamp {
    /// Current wall-clock time, truncated to whole seconds.
    ///
    /// Clocks set before 1970 clamp to zero rather than wrapping.
    pub fn now() -> Self {
        let secs = chrono::Utc::now().timestamp();
        Self(u64::try_from(secs).unwrap_or(0))
    }

    /// Build from raw seconds.
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Raw seconds.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Widen for 32-byte message encoding.
    pub fn to_u256(&self) -> U256 {
        U256::from(self.0)
    }

    /// Saturating offset into the future.
    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl fmt::Display for UnixTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match chrono::DateTime::from_timestamp(i64::try_from(self.0).unwrap_or(i64::MAX), 0) {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            None => write!(f, "{}s", self.0),
        }
    }
}
