// src/storage/event_log.rs
//! Append-only audit log for claim lifecycle events.
//!
//! The registry writes every event through the [`EventSink`] trait after the
//! corresponding storage mutation has completed. Sinks only receive owned
//! event values and have no path back into the registry.

use crate::models::claim::ClaimId;
use crate::models::events::{ClaimEvent, LoggedEvent};
use crate::utils::serialization::{deserialize, serialize};
use chrono::Utc;
use log::debug;

/// Destination for claim lifecycle events.
pub trait EventSink {
    /// Appends one event. Implementations must not reorder events.
    fn emit(&mut self, event: ClaimEvent);
}

/// In-memory append-only event log.
///
/// Assigns each event a sequence number starting at zero.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventLog {
    entries: Vec<LoggedEvent>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded entries, oldest first.
    pub fn entries(&self) -> &[LoggedEvent] {
        &self.entries
    }

    /// Entries with a sequence number greater than or equal to `from`.
    pub fn entries_since(&self, from: u64) -> &[LoggedEvent] {
        let start = usize::try_from(from).unwrap_or(usize::MAX).min(self.entries.len());
        &self.entries[start..]
    }

    pub fn last(&self) -> Option<&LoggedEvent> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// History of one claim, oldest first.
    pub fn entries_for(&self, id: ClaimId) -> Vec<&LoggedEvent> {
        self.entries.iter().filter(|entry| entry.event.claim_id() == id).collect()
    }

    /// Exports the log as a JSON array.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serialize(&self.entries)
    }

    /// Restores a log exported with [`to_json`](Self::to_json). Entries are
    /// renumbered from zero in their exported order.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut entries: Vec<LoggedEvent> = deserialize(json)?;
        for (sequence, entry) in entries.iter_mut().enumerate() {
            entry.sequence = sequence as u64;
        }
        Ok(InMemoryEventLog { entries })
    }
}

impl EventSink for InMemoryEventLog {
    fn emit(&mut self, event: ClaimEvent) {
        let sequence = self.entries.len() as u64;
        debug!("Event #{} {:?} for claim {:?}", sequence, event.kind, event.claim_id());
        self.entries.push(LoggedEvent {
            sequence,
            recorded_at: Utc::now(),
            event,
        });
    }
}

/// Bare event list, handy when sequence numbers and timestamps are not needed.
impl EventSink for Vec<ClaimEvent> {
    fn emit(&mut self, event: ClaimEvent) {
        self.push(event);
    }
}
