// src/models/events.rs
//! Audit events emitted by the claim holder and the trusted issuer directory.

use chrono::{DateTime, Utc};
use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::models::claim::{Claim, ClaimId};

/// Which lifecycle transition produced a [`ClaimEvent`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimEventKind {
    ClaimRequested,
    ClaimChanged,
    ClaimRemoved,
}

/// A claim lifecycle event carrying the full claim tuple.
///
/// For `ClaimRemoved` the tuple holds the last values stored before removal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClaimEvent {
    pub kind: ClaimEventKind,
    pub claim: Claim,
}

impl ClaimEvent {
    pub fn requested(claim: Claim) -> Self {
        ClaimEvent { kind: ClaimEventKind::ClaimRequested, claim }
    }

    pub fn changed(claim: Claim) -> Self {
        ClaimEvent { kind: ClaimEventKind::ClaimChanged, claim }
    }

    pub fn removed(claim: Claim) -> Self {
        ClaimEvent { kind: ClaimEventKind::ClaimRemoved, claim }
    }

    pub fn claim_id(&self) -> ClaimId {
        self.claim.id
    }
}

/// An event as recorded by an audit log.
///
/// `sequence` is assigned by the log, starting at zero and strictly
/// increasing; `recorded_at` is informational only.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggedEvent {
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: ClaimEvent,
}

/// Administrative events of the trusted issuer directory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum DirectoryEvent {
    TrustedIssuerAdded { issuer: Address, topics: Vec<U256> },
    TrustedIssuerRemoved { issuer: Address },
    ClaimTopicsUpdated { issuer: Address, topics: Vec<U256> },
}
