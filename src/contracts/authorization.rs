// src/contracts/authorization.rs
//! Caller authorization for claim mutations.
//!
//! A caller may mutate a claim when it is the subject of the claim holder,
//! the issuer recorded on the claim, or a manager the subject delegated to.
//! The predicate is evaluated fresh on every call.

use ethers_core::types::Address;
use log::info;
use std::collections::HashSet;

use crate::error::RegistryError;

/// Authorization policy of one claim holder.
#[derive(Debug, Clone)]
pub struct AuthorizationGuard {
    /// Identity the claims are about
    subject: Address,
    /// Addresses holding delegated management rights
    managers: HashSet<Address>,
}

impl AuthorizationGuard {
    pub fn new(subject: Address) -> Self {
        AuthorizationGuard {
            subject,
            managers: HashSet::new(),
        }
    }

    pub fn subject(&self) -> Address {
        self.subject
    }

    /// Whether `caller` may add, change or remove a claim issued by `claim_issuer`.
    pub fn can_mutate(&self, caller: Address, claim_issuer: Address) -> bool {
        caller == self.subject || caller == claim_issuer || self.managers.contains(&caller)
    }

    /// Like [`can_mutate`](Self::can_mutate) but returns `Unauthorized` on failure.
    pub fn ensure_can_mutate(&self, caller: Address, claim_issuer: Address) -> Result<(), RegistryError> {
        if self.can_mutate(caller, claim_issuer) {
            Ok(())
        } else {
            Err(RegistryError::Unauthorized(caller))
        }
    }

    pub fn is_manager(&self, candidate: Address) -> bool {
        self.managers.contains(&candidate)
    }

    /// Grants management rights to `manager`. Subject only.
    ///
    /// # Returns
    /// `true` if `manager` was not already delegated.
    pub fn add_manager(&mut self, caller: Address, manager: Address) -> Result<bool, RegistryError> {
        self.ensure_subject(caller)?;
        if manager.is_zero() {
            return Err(RegistryError::Malformed("manager address is zero".into()));
        }
        let added = self.managers.insert(manager);
        if added {
            info!("Subject {:?} delegated claim management to {:?}", self.subject, manager);
        }
        Ok(added)
    }

    /// Revokes management rights from `manager`. Subject only.
    ///
    /// # Returns
    /// `true` if `manager` held rights before the call.
    pub fn remove_manager(&mut self, caller: Address, manager: Address) -> Result<bool, RegistryError> {
        self.ensure_subject(caller)?;
        let removed = self.managers.remove(&manager);
        if removed {
            info!("Subject {:?} revoked claim management from {:?}", self.subject, manager);
        }
        Ok(removed)
    }

    fn ensure_subject(&self, caller: Address) -> Result<(), RegistryError> {
        if caller == self.subject {
            Ok(())
        } else {
            Err(RegistryError::Unauthorized(caller))
        }
    }
}
