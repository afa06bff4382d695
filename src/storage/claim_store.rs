// src/storage/claim_store.rs
//! Key-value storage for claim records.
//!
//! Holds the claim mapping of a single claim holder plus a per-topic index.
//! The index keeps ids in insertion order among live claims; a removed claim
//! leaves the index, and re-inserting it later appends at the tail.

use crate::models::claim::{Claim, ClaimId};
use ethers_core::types::U256;
use std::collections::HashMap;

/// In-memory claim storage.
///
/// This storage provides:
/// - O(1) average lookups by claim id
/// - Ordered listing of live ids per topic
///
/// It performs no authorization; the registry owning it does.
#[derive(Debug, Default, Clone)]
pub struct ClaimStore {
    /// Claim records by their derived id
    claims: HashMap<ClaimId, Claim>,
    /// Live claim ids per topic, oldest first
    by_topic: HashMap<U256, Vec<ClaimId>>,
}

impl ClaimStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a claim under its id.
    ///
    /// # Returns
    /// `true` if the id was not present before.
    ///
    /// # Behavior
    /// - Overwrites the existing record if the id already exists, keeping its
    ///   position in the topic index
    /// - Does not validate the claim
    pub fn insert(&mut self, claim: Claim) -> bool {
        let id = claim.id;
        let topic = claim.topic;
        let fresh = self.claims.insert(id, claim).is_none();
        if fresh {
            self.by_topic.entry(topic).or_default().push(id);
        }
        fresh
    }

    /// Retrieves a claim by its id.
    pub fn get(&self, id: &ClaimId) -> Option<&Claim> {
        self.claims.get(id)
    }

    /// Mutable access to a stored claim. The topic must not be changed
    /// through this reference.
    pub(crate) fn get_mut(&mut self, id: &ClaimId) -> Option<&mut Claim> {
        self.claims.get_mut(id)
    }

    pub fn contains(&self, id: &ClaimId) -> bool {
        self.claims.contains_key(id)
    }

    /// Removes a claim and drops it from the topic index.
    ///
    /// # Returns
    /// The removed record, or `None` if nothing was stored at `id`.
    pub fn remove(&mut self, id: &ClaimId) -> Option<Claim> {
        let claim = self.claims.remove(id)?;
        if let Some(ids) = self.by_topic.get_mut(&claim.topic) {
            ids.retain(|candidate| candidate != id);
            if ids.is_empty() {
                self.by_topic.remove(&claim.topic);
            }
        }
        Some(claim)
    }

    /// Live claim ids recorded under `topic`, in insertion order.
    pub fn ids_by_topic(&self, topic: U256) -> Vec<ClaimId> {
        self.by_topic.get(&topic).cloned().unwrap_or_default()
    }

    /// Number of live claims.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}
