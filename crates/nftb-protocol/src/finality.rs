//! # Finality Oracle
//!
//! An event included at block `b` is final once `head >= b + threshold`.
//! Both agents apply this rule independently: the owner before asking for
//! the secret, the validator before revealing it.
//!
//! When several commit events match a request the latest one is used.

use nftb_core::{Address, BridgeError, BridgeRequestId, LedgerError, NotReady};
use nftb_ledger::{BlockRange, CommitEvent, CommitFilter, Logged, SourceLedger};

/// Whether an event at `event_block` is final at `head`.
///
/// A threshold that overflows past `u64::MAX` is never reached.
pub fn is_final(event_block: u64, head: u64, threshold: u64) -> bool {
    match event_block.checked_add(threshold) {
        Some(required) => head >= required,
        None => false,
    }
}

/// Outcome of a finality check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalityStatus {
    /// No matching event in the queried range.
    NotMined,
    /// Matching event found, confirmations missing.
    Pending {
        /// The matching event.
        event: Logged<CommitEvent>,
        /// Head at check time.
        head: u64,
    },
    /// Matching event is final.
    Final(Logged<CommitEvent>),
}

/// Confirmation-depth checker for commit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalityOracle {
    threshold: u64,
    lookback: Option<u64>,
    anchor: Option<u64>,
}

impl FinalityOracle {
    /// Check against `threshold` confirmations over the whole history.
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            lookback: None,
            anchor: None,
        }
    }

    /// Only look at the `blocks` most recent blocks when querying events.
    /// The window never shrinks below the threshold.
    pub fn with_lookback(mut self, blocks: Option<u64>) -> Self {
        self.lookback = blocks;
        self
    }

    /// Query from `block` to head, ignoring the lookback window.
    pub fn anchored_at(mut self, block: u64) -> Self {
        self.anchor = Some(block);
        self
    }

    /// Configured confirmation depth.
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Find the latest commit event matching `filter` and classify it.
    pub async fn check(
        &self,
        ledger: &dyn SourceLedger,
        bridge: Address,
        filter: &CommitFilter,
    ) -> Result<FinalityStatus, LedgerError> {
        let head = ledger.block_number().await?;
        let range = match (self.anchor, self.lookback) {
            (Some(from), _) => BlockRange {
                from,
                to: Some(head),
            },
            (None, Some(blocks)) => BlockRange::last(blocks.max(self.threshold), head),
            (None, None) => BlockRange::all(),
        };
        let mut events = ledger.commit_events(bridge, filter, range).await?;
        let Some(event) = events.pop() else {
            return Ok(FinalityStatus::NotMined);
        };
        if is_final(event.block_number, head, self.threshold) {
            Ok(FinalityStatus::Final(event))
        } else {
            Ok(FinalityStatus::Pending { event, head })
        }
    }

    /// The final commit event of `request_id`, or a not-ready error.
    pub async fn require_final(
        &self,
        ledger: &dyn SourceLedger,
        request_id: &BridgeRequestId,
    ) -> Result<Logged<CommitEvent>, BridgeError> {
        let filter = CommitFilter::by_request(request_id.token_owner, request_id.request_nonce);
        match self
            .check(ledger, request_id.context.from_bridge, &filter)
            .await?
        {
            FinalityStatus::Final(event) => Ok(event),
            FinalityStatus::NotMined => Err(NotReady::CommitNotMined {
                owner: request_id.token_owner,
                nonce: request_id.request_nonce,
            }
            .into()),
            FinalityStatus::Pending { event, head } => Err(NotReady::NotFinal {
                event_block: event.block_number,
                head,
                threshold: self.threshold,
            }
            .into()),
        }
    }
}
