//! # Submission De-duplication
//!
//! Ledger-mutating calls (`commit`, `acquire`) must not be sent twice for the
//! same request. [`SubmissionGuard::begin`] hands out one
//! [`SubmissionTicket`] per `(kind, request)`; a second `begin` while the
//! first is in flight, or after it completed, is refused with
//! [`BridgeError::DuplicateSubmission`].
//!
//! A ticket dropped without [`SubmissionTicket::complete`] releases its slot,
//! so a failed submission can be retried.
//!
//! Completed slots are kept for a retention window
//! ([`DEFAULT_COMPLETED_RETENTION`] unless configured) and pruned on every
//! `begin` and `complete`. Past the window the ledger refuses the repeat
//! (spent nonce, used commitment).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use nftb_core::{BridgeError, BridgeRequestId};

/// How long a completed submission keeps its slot.
pub const DEFAULT_COMPLETED_RETENTION: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    InFlight,
    Completed(Instant),
}

type Key = (&'static str, BridgeRequestId);

#[derive(Debug)]
struct Slots {
    entries: HashMap<Key, Slot>,
    retention: Duration,
}

impl Slots {
    fn prune(&mut self, now: Instant) {
        let retention = self.retention;
        self.entries.retain(|_, slot| match slot {
            Slot::InFlight => true,
            Slot::Completed(at) => now.saturating_duration_since(*at) < retention,
        });
    }
}

/// Tracks in-flight and recently completed submissions.
#[derive(Debug, Clone)]
pub struct SubmissionGuard {
    slots: Arc<Mutex<Slots>>,
}

impl Default for SubmissionGuard {
    fn default() -> Self {
        Self::with_retention(DEFAULT_COMPLETED_RETENTION)
    }
}

impl SubmissionGuard {
    /// An empty guard with the default retention.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty guard keeping completed slots for `retention`.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                entries: HashMap::new(),
                retention,
            })),
        }
    }

    /// Claim the slot for `kind` on `request_id`.
    pub fn begin(
        &self,
        kind: &'static str,
        request_id: &BridgeRequestId,
    ) -> Result<SubmissionTicket, BridgeError> {
        let key = (kind, request_id.clone());
        let mut slots = self.slots.lock();
        slots.prune(Instant::now());
        if slots.entries.contains_key(&key) {
            return Err(BridgeError::DuplicateSubmission {
                kind,
                request: request_id.to_string(),
            });
        }
        slots.entries.insert(key.clone(), Slot::InFlight);
        Ok(SubmissionTicket {
            slots: Arc::clone(&self.slots),
            key: Some(key),
        })
    }

    /// Whether `kind` on `request_id` completed within the retention window.
    pub fn is_completed(&self, kind: &'static str, request_id: &BridgeRequestId) -> bool {
        let mut slots = self.slots.lock();
        slots.prune(Instant::now());
        matches!(
            slots.entries.get(&(kind, request_id.clone())),
            Some(Slot::Completed(_))
        )
    }

    /// Number of tracked slots, in flight or completed.
    pub fn tracked(&self) -> usize {
        self.slots.lock().entries.len()
    }
}

/// Exclusive right to submit one call.
#[derive(Debug)]
pub struct SubmissionTicket {
    slots: Arc<Mutex<Slots>>,
    key: Option<Key>,
}

impl SubmissionTicket {
    /// Mark the submission done; the slot stays taken for the retention window.
    pub fn complete(mut self) {
        if let Some(key) = self.key.take() {
            let now = Instant::now();
            let mut slots = self.slots.lock();
            slots.prune(now);
            slots.entries.insert(key, Slot::Completed(now));
        }
    }
}

impl Drop for SubmissionTicket {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.slots.lock().entries.remove(&key);
        }
    }
}
