// src/contracts/trusted_issuers.rs
//! Trusted issuer directory.
//!
//! Maps issuer addresses to the claim topics they are authorized to assert.
//! Reads are open to everyone; every mutation is restricted to the directory
//! owner. Issuers absent from the directory are trusted for nothing.

use ethers_core::types::{Address, U256};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::DirectoryError;
use crate::models::events::DirectoryEvent;
use crate::models::trusted_issuer::TrustedIssuerRecord;

/// Read contract the claim registry consumes.
pub trait IssuerTrust {
    /// Whether `issuer` may authoritatively assert claims on `topic`.
    fn is_trusted_for(&self, issuer: Address, topic: U256) -> bool;
}

/// Directory handle shared between the registry and the administration API.
pub type SharedDirectory = Arc<RwLock<TrustedIssuerDirectory>>;

/// Owner-administered allowlist of issuers and their topics.
#[derive(Debug, Clone)]
pub struct TrustedIssuerDirectory {
    /// Only address allowed to mutate the directory
    owner: Address,
    issuers: HashMap<Address, TrustedIssuerRecord>,
    /// Issuers in the order they were added
    order: Vec<Address>,
    events: Vec<DirectoryEvent>,
}

impl TrustedIssuerDirectory {
    pub fn new(owner: Address) -> Self {
        TrustedIssuerDirectory {
            owner,
            issuers: HashMap::new(),
            order: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Wraps a fresh directory into a [`SharedDirectory`].
    pub fn shared(owner: Address) -> SharedDirectory {
        Arc::new(RwLock::new(Self::new(owner)))
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Adds `issuer` with the given topics.
    ///
    /// # Errors
    /// - `NotOwner` if `caller` is not the owner
    /// - `Invalid` if `issuer` is the zero address or `topics` is empty
    /// - `AlreadyTrusted` if `issuer` is already listed
    pub fn add_trusted_issuer(
        &mut self,
        caller: Address,
        issuer: Address,
        topics: Vec<U256>,
    ) -> Result<(), DirectoryError> {
        self.ensure_owner(caller)?;
        if issuer.is_zero() {
            return Err(DirectoryError::Invalid("issuer address is zero".into()));
        }
        if topics.is_empty() {
            return Err(DirectoryError::Invalid("trusted issuer needs at least one topic".into()));
        }
        if self.issuers.contains_key(&issuer) {
            return Err(DirectoryError::AlreadyTrusted(issuer));
        }

        let record = TrustedIssuerRecord::new(issuer, topics);
        let topics = record.topics();
        self.issuers.insert(issuer, record);
        self.order.push(issuer);

        info!("Trusted issuer {:?} added for topics {:?}", issuer, topics);
        self.events.push(DirectoryEvent::TrustedIssuerAdded { issuer, topics });
        Ok(())
    }

    /// Removes `issuer` and all of its topics.
    pub fn remove_trusted_issuer(&mut self, caller: Address, issuer: Address) -> Result<(), DirectoryError> {
        self.ensure_owner(caller)?;
        if self.issuers.remove(&issuer).is_none() {
            return Err(DirectoryError::UnknownIssuer(issuer));
        }
        self.order.retain(|listed| *listed != issuer);

        info!("Trusted issuer {:?} removed", issuer);
        self.events.push(DirectoryEvent::TrustedIssuerRemoved { issuer });
        Ok(())
    }

    /// Replaces the topic set of an existing issuer.
    pub fn update_issuer_topics(
        &mut self,
        caller: Address,
        issuer: Address,
        topics: Vec<U256>,
    ) -> Result<(), DirectoryError> {
        self.ensure_owner(caller)?;
        if topics.is_empty() {
            return Err(DirectoryError::Invalid("trusted issuer needs at least one topic".into()));
        }
        let record = self
            .issuers
            .get_mut(&issuer)
            .ok_or(DirectoryError::UnknownIssuer(issuer))?;

        *record = TrustedIssuerRecord::new(issuer, topics);
        let topics = record.topics();

        info!("Trusted issuer {:?} topics set to {:?}", issuer, topics);
        self.events.push(DirectoryEvent::ClaimTopicsUpdated { issuer, topics });
        Ok(())
    }

    /// Authorizes one more topic for `issuer`, adding the issuer if needed.
    pub fn grant_topic(&mut self, caller: Address, issuer: Address, topic: U256) -> Result<(), DirectoryError> {
        self.ensure_owner(caller)?;
        let mut topics = match self.issuers.get(&issuer) {
            Some(record) if record.covers(topic) => return Ok(()),
            Some(record) => record.topics(),
            None => return self.add_trusted_issuer(caller, issuer, vec![topic]),
        };
        topics.push(topic);
        self.update_issuer_topics(caller, issuer, topics)
    }

    /// Withdraws one topic from `issuer`. Revoking the last topic removes
    /// the issuer from the directory.
    pub fn revoke_topic(&mut self, caller: Address, issuer: Address, topic: U256) -> Result<(), DirectoryError> {
        self.ensure_owner(caller)?;
        let record = self
            .issuers
            .get(&issuer)
            .ok_or(DirectoryError::UnknownIssuer(issuer))?;
        if !record.covers(topic) {
            return Ok(());
        }

        let remaining: Vec<U256> = record.topics().into_iter().filter(|t| *t != topic).collect();
        if remaining.is_empty() {
            self.remove_trusted_issuer(caller, issuer)
        } else {
            self.update_issuer_topics(caller, issuer, remaining)
        }
    }

    /// Trusted issuers in the order they were added.
    pub fn trusted_issuers(&self) -> Vec<Address> {
        self.order.clone()
    }

    pub fn is_trusted_issuer(&self, issuer: Address) -> bool {
        self.issuers.contains_key(&issuer)
    }

    /// Topics `issuer` is trusted for, sorted. Empty for unknown issuers.
    pub fn issuer_topics(&self, issuer: Address) -> Vec<U256> {
        self.issuers
            .get(&issuer)
            .map(TrustedIssuerRecord::topics)
            .unwrap_or_default()
    }

    pub fn record(&self, issuer: Address) -> Option<&TrustedIssuerRecord> {
        self.issuers.get(&issuer)
    }

    /// Administrative events, oldest first.
    pub fn events(&self) -> &[DirectoryEvent] {
        &self.events
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), DirectoryError> {
        if caller == self.owner {
            Ok(())
        } else {
            warn!("Directory mutation rejected: {:?} is not the owner", caller);
            Err(DirectoryError::NotOwner(caller))
        }
    }
}

impl IssuerTrust for TrustedIssuerDirectory {
    fn is_trusted_for(&self, issuer: Address, topic: U256) -> bool {
        self.issuers
            .get(&issuer)
            .map(|record| record.covers(topic))
            .unwrap_or(false)
    }
}

impl IssuerTrust for RwLock<TrustedIssuerDirectory> {
    fn is_trusted_for(&self, issuer: Address, topic: U256) -> bool {
        match self.read() {
            Ok(directory) => directory.is_trusted_for(issuer, topic),
            Err(poisoned) => poisoned.into_inner().is_trusted_for(issuer, topic),
        }
    }
}
