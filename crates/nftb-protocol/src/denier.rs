//! # Denier (Auditor) Agent
//!
//! Reviews `Acquire` events on a destination bridge and checks each one
//! against the source bridge: a commit with the same commitment, owner and
//! token must exist and be final under the denier's own threshold.
//! Acquisitions that outran finality or have no commit behind them are
//! flagged.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use nftb_core::{BridgeError, ValidationFailure};
use nftb_ledger::{AcquireEvent, BlockRange, CommitFilter, DestinationLedger, Logged, SourceLedger};

use crate::config::DenierSettings;
use crate::finality::{FinalityOracle, FinalityStatus};

/// Result of reviewing one acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// A final source commit backs the acquisition.
    Backed { commit_block: u64 },
    /// The source commit exists but is not final yet.
    PendingFinality {
        /// Block holding the source commit.
        event_block: u64,
        /// Current source head.
        head: u64,
        /// Confirmations required.
        threshold: u64,
    },
    /// No matching source commit.
    Unbacked,
}

impl Verdict {
    /// Whether a final source commit backs the acquisition.
    pub fn is_backed(&self) -> bool {
        matches!(self, Verdict::Backed { .. })
    }
}

/// The denier agent.
///
/// Reviews destination acquisitions against source commits and flags any
/// acquisition without a final, matching commit.
pub struct Denier {
    source: Arc<dyn SourceLedger>,
    destination: Arc<dyn DestinationLedger>,
    finality: FinalityOracle,
}

impl std::fmt::Debug for Denier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Denier")
            .field("source", &self.source.chain_id())
            .field("destination", &self.destination.chain_id())
            .field("finality", &self.finality)
            .finish()
    }
}

impl Denier {
    /// Watch `destination` and check acquisitions against `source`.
    pub fn new(
        source: Arc<dyn SourceLedger>,
        destination: Arc<dyn DestinationLedger>,
        settings: &DenierSettings,
    ) -> Self {
        Self {
            source,
            destination,
            finality: FinalityOracle::new(settings.finality_blocks)
                .with_lookback(settings.event_lookback_blocks),
        }
    }

    /// Review one acquisition.
    pub async fn review(&self, acquire: &Logged<AcquireEvent>) -> Result<Verdict, BridgeError> {
        let origin = &acquire.event.origin;
        if origin.from_chain_id != self.source.chain_id() {
            return Err(ValidationFailure::UnsupportedChain {
                chain_id: origin.from_chain_id,
            }
            .into());
        }
        let filter = CommitFilter {
            token_owner: Some(acquire.event.token_owner),
            request_nonce: None,
            commitment: Some(acquire.event.commitment),
        };
        let status = self
            .finality
            .check(self.source.as_ref(), origin.from_bridge, &filter)
            .await?;
        let verdict = match status {
            FinalityStatus::Final(commit) if commit.event.token_id == acquire.event.old_token_id => {
                Verdict::Backed {
                    commit_block: commit.block_number,
                }
            }
            FinalityStatus::Pending { event, head }
                if event.event.token_id == acquire.event.old_token_id =>
            {
                Verdict::PendingFinality {
                    event_block: event.block_number,
                    head,
                    threshold: self.finality.threshold(),
                }
            }
            _ => Verdict::Unbacked,
        };

        if !verdict.is_backed() {
            tracing::warn!(
                owner = %acquire.event.token_owner,
                new_token_id = %acquire.event.new_token_id,
                commitment = %acquire.event.commitment,
                block = acquire.block_number,
                ?verdict,
                "acquisition not backed by a final commit"
            );
        }
        Ok(verdict)
    }

    /// Review every acquisition of `bridge` within `range`.
    pub async fn review_destination(
        &self,
        bridge: nftb_core::Address,
        range: BlockRange,
    ) -> Result<Vec<(Logged<AcquireEvent>, Verdict)>, BridgeError> {
        let events = self.destination.acquire_events(bridge, range).await?;
        let mut reviewed = Vec::with_capacity(events.len());
        for event in events {
            let verdict = self.review(&event).await?;
            reviewed.push((event, verdict));
        }
        Ok(reviewed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftb_core::{Address, ChainId, B256, U256, UnixTimestamp};
    use nftb_crypto::{keccak256, Commitment};
    use nftb_ledger::{InMemoryChain, Origin};

    fn denier(threshold: u64) -> (Denier, InMemoryChain, Address) {
        let source = InMemoryChain::new(ChainId(31337));
        let destination = InMemoryChain::new(ChainId(31338));
        let bridge = source.deploy_source_bridge(Address::repeat_byte(9));
        let settings = DenierSettings {
            finality_blocks: threshold,
            event_lookback_blocks: Some(20),
        };
        let d = Denier::new(
            Arc::new(source.connect(Address::repeat_byte(1))),
            Arc::new(destination.connect(Address::repeat_byte(1))),
            &settings,
        );
        (d, source, bridge)
    }

    fn acquisition(chain: u64, bridge: Address) -> Logged<AcquireEvent> {
        Logged {
            event: AcquireEvent {
                origin: Origin {
                    from_chain_id: ChainId(chain),
                    from_token: Address::repeat_byte(2),
                    from_bridge: bridge,
                },
                token_owner: Address::repeat_byte(5),
                old_token_id: U256::from(1u64),
                new_token_id: U256::ZERO,
                commitment: Commitment(keccak256(b"nothing committed")),
                request_timestamp: UnixTimestamp(0),
            },
            address: Address::repeat_byte(7),
            block_number: 1,
            tx_hash: B256::ZERO,
        }
    }

    #[tokio::test]
    async fn acquisition_without_commit_is_unbacked() {
        let (d, _, bridge) = denier(0);
        let verdict = d.review(&acquisition(31337, bridge)).await.unwrap();
        assert_eq!(verdict, Verdict::Unbacked);
    }

    #[tokio::test]
    async fn foreign_origin_is_unsupported() {
        let (d, _, bridge) = denier(0);
        let err = d.review(&acquisition(56, bridge)).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Rejected(ValidationFailure::UnsupportedChain { .. })
        ));
    }

    #[test]
    fn verdict_serializes_with_tag() {
        let json = serde_json::to_value(Verdict::Backed { commit_block: 4 }).unwrap();
        assert_eq!(json["verdict"], "backed");
        assert_eq!(json["commit_block"], 4);
    }
}
