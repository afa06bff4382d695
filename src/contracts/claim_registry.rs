// src/contracts/claim_registry.rs
//! ERC735-style claim holder.
//!
//! Stores the claims attached to one subject identity and enforces their
//! lifecycle:
//!
//! ```text
//! ABSENT --request_add_claim--> ACTIVE --change_claim--> ACTIVE
//!    ^                             |
//!    +--------remove_claim---------+
//! ```
//!
//! Claims are addressed by `keccak256(abi.encodePacked(issuer, topic))`, so
//! adding the same `(issuer, topic)` twice resolves to the same record. Every
//! mutating call is checked in full before anything is written, and its
//! event is emitted only after the write.

use ethers_core::types::{Address, U256};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::contracts::authorization::AuthorizationGuard;
use crate::contracts::trusted_issuers::IssuerTrust;
use crate::error::RegistryError;
use crate::models::claim::{Claim, ClaimId, ClaimRequest};
use crate::models::events::ClaimEvent;
use crate::storage::claim_store::ClaimStore;
use crate::storage::event_log::{EventSink, InMemoryEventLog};

/// Registry handle shared by the API handlers. The mutex serializes callers,
/// so each call runs to completion before the next one starts.
pub type SharedRegistry = Arc<Mutex<ClaimRegistry>>;

/// Locks a shared registry, ignoring poisoning. Operations validate before
/// they write.
pub fn lock_registry(registry: &SharedRegistry) -> MutexGuard<'_, ClaimRegistry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Claim holder for a single subject.
///
/// # Type Parameters
/// * `S` - Event sink receiving `ClaimRequested`, `ClaimChanged` and
///   `ClaimRemoved` events
pub struct ClaimRegistry<S: EventSink = InMemoryEventLog> {
    guard: AuthorizationGuard,
    store: ClaimStore,
    /// Trusted issuer directory, fixed at construction
    directory: Arc<dyn IssuerTrust + Send + Sync>,
    /// Reject claims from issuers the directory does not trust for the topic
    enforce_trusted_issuers: bool,
    sink: S,
}

impl ClaimRegistry<InMemoryEventLog> {
    /// Creates a claim holder for `subject` that records events in memory.
    ///
    /// # Arguments
    /// * `subject` - Identity the claims are about
    /// * `directory` - Trusted issuer directory to consult
    /// * `enforce_trusted_issuers` - Whether new claims from third-party
    ///   issuers must be backed by the directory
    pub fn new(
        subject: Address,
        directory: Arc<dyn IssuerTrust + Send + Sync>,
        enforce_trusted_issuers: bool,
    ) -> Self {
        Self::with_sink(subject, directory, enforce_trusted_issuers, InMemoryEventLog::new())
    }
}

impl<S: EventSink> ClaimRegistry<S> {
    /// Creates a claim holder writing its events to `sink`.
    pub fn with_sink(
        subject: Address,
        directory: Arc<dyn IssuerTrust + Send + Sync>,
        enforce_trusted_issuers: bool,
        sink: S,
    ) -> Self {
        ClaimRegistry {
            guard: AuthorizationGuard::new(subject),
            store: ClaimStore::new(),
            directory,
            enforce_trusted_issuers,
            sink,
        }
    }

    pub fn subject(&self) -> Address {
        self.guard.subject()
    }

    pub fn enforces_trusted_issuers(&self) -> bool {
        self.enforce_trusted_issuers
    }

    /// Event sink this registry writes to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Requests that a claim be attached to the subject.
    ///
    /// # Arguments
    /// * `caller` - Party submitting the request
    /// * `request` - Topic, scheme, issuer, signature, data and uri
    ///
    /// # Returns
    /// The claim id, `keccak256(abi.encodePacked(issuer, topic))`.
    ///
    /// # Behavior
    /// - Absent id: stores a new claim
    /// - Live id: re-assertion; the mutable fields are refreshed in place and
    ///   no second record is created
    /// - Either way `ClaimRequested` is emitted with the stored values
    ///
    /// # Errors
    /// - `Malformed` if the issuer is the zero address
    /// - `Unauthorized` if `caller` is not the subject, the issuer or a manager
    /// - `Untrusted` if enforcement is on, the issuer is not the subject, and
    ///   the directory does not trust it for the topic
    pub fn request_add_claim(&mut self, caller: Address, request: ClaimRequest) -> Result<ClaimId, RegistryError> {
        let id = request.claim_id();
        if request.issuer.is_zero() {
            warn!("Claim request rejected: zero issuer address");
            return Err(RegistryError::Malformed("issuer address is zero".into()));
        }
        if let Err(e) = self.guard.ensure_can_mutate(caller, request.issuer) {
            warn!("Claim request for {:?} rejected: {}", id, e);
            return Err(e);
        }
        self.ensure_trusted(request.issuer, request.topic)?;

        let stored = match self.store.get_mut(&id) {
            Some(existing) => {
                debug!("Claim {:?} re-asserted by {:?}", id, caller);
                existing.apply(request);
                existing.clone()
            }
            None => {
                let claim = request.into_claim();
                self.store.insert(claim.clone());
                claim
            }
        };

        info!("Claim {:?} requested (topic {}, issuer {:?})", id, stored.topic, stored.issuer);
        self.sink.emit(ClaimEvent::requested(stored));
        Ok(id)
    }

    /// Returns the claim stored at `id`.
    ///
    /// # Errors
    /// `NotFound` if no live claim has this id.
    pub fn get_claim(&self, id: ClaimId) -> Result<Claim, RegistryError> {
        self.store.get(&id).cloned().ok_or(RegistryError::NotFound(id))
    }

    /// Amends the claim stored at `id`.
    ///
    /// The request's issuer and topic must derive `id`; scheme, signature,
    /// data and uri are overwritten. Emits `ClaimChanged` with the new values.
    ///
    /// # Errors
    /// - `NotFound` if no live claim has this id
    /// - `Unauthorized` if `caller` fails the guard for the stored claim
    /// - `Malformed` if `(issuer, topic)` does not hash to `id`
    pub fn change_claim(&mut self, caller: Address, id: ClaimId, request: ClaimRequest) -> Result<(), RegistryError> {
        let stored_issuer = match self.store.get(&id) {
            Some(claim) => claim.issuer,
            None => {
                warn!("Change of unknown claim {:?} rejected", id);
                return Err(RegistryError::NotFound(id));
            }
        };
        if let Err(e) = self.guard.ensure_can_mutate(caller, stored_issuer) {
            warn!("Change of claim {:?} rejected: {}", id, e);
            return Err(e);
        }
        if request.claim_id() != id {
            warn!("Change of claim {:?} rejected: issuer/topic address a different claim", id);
            return Err(RegistryError::Malformed(format!(
                "issuer {:?} and topic {} do not derive claim {:?}",
                request.issuer, request.topic, id
            )));
        }

        let updated = match self.store.get_mut(&id) {
            Some(claim) => {
                claim.apply(request);
                claim.clone()
            }
            None => return Err(RegistryError::NotFound(id)),
        };

        info!("Claim {:?} changed by {:?}", id, caller);
        self.sink.emit(ClaimEvent::changed(updated));
        Ok(())
    }

    /// Removes the claim stored at `id`.
    ///
    /// Emits `ClaimRemoved` carrying the last stored values.
    ///
    /// # Errors
    /// - `NotFound` if no live claim has this id
    /// - `Unauthorized` if `caller` fails the guard for the stored claim
    pub fn remove_claim(&mut self, caller: Address, id: ClaimId) -> Result<(), RegistryError> {
        let stored_issuer = match self.store.get(&id) {
            Some(claim) => claim.issuer,
            None => {
                warn!("Removal of unknown claim {:?} rejected", id);
                return Err(RegistryError::NotFound(id));
            }
        };
        if let Err(e) = self.guard.ensure_can_mutate(caller, stored_issuer) {
            warn!("Removal of claim {:?} rejected: {}", id, e);
            return Err(e);
        }

        let removed = self.store.remove(&id).ok_or(RegistryError::NotFound(id))?;

        info!("Claim {:?} removed by {:?}", id, caller);
        self.sink.emit(ClaimEvent::removed(removed));
        Ok(())
    }

    /// Live claim ids with `topic`, in insertion order.
    pub fn get_claim_ids_by_topic(&self, topic: U256) -> Vec<ClaimId> {
        self.store.ids_by_topic(topic)
    }

    pub fn claim_count(&self) -> usize {
        self.store.len()
    }

    /// Delegates claim management to `manager`. Subject only.
    pub fn add_manager(&mut self, caller: Address, manager: Address) -> Result<bool, RegistryError> {
        self.guard.add_manager(caller, manager)
    }

    /// Withdraws delegated management from `manager`. Subject only.
    pub fn remove_manager(&mut self, caller: Address, manager: Address) -> Result<bool, RegistryError> {
        self.guard.remove_manager(caller, manager)
    }

    pub fn is_manager(&self, candidate: Address) -> bool {
        self.guard.is_manager(candidate)
    }

    /// Whether the directory backs `issuer` for `topic`. The subject is
    /// always trusted for claims about itself.
    pub fn is_trusted_for(&self, issuer: Address, topic: U256) -> bool {
        issuer == self.subject() || self.directory.is_trusted_for(issuer, topic)
    }

    fn ensure_trusted(&self, issuer: Address, topic: U256) -> Result<(), RegistryError> {
        if !self.enforce_trusted_issuers || self.is_trusted_for(issuer, topic) {
            return Ok(());
        }
        warn!("Claim from {:?} on topic {} rejected: issuer not trusted", issuer, topic);
        Err(RegistryError::Untrusted { issuer, topic })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::trusted_issuers::{SharedDirectory, TrustedIssuerDirectory};
    use crate::models::events::ClaimEventKind;
    use crate::utils::crypto::derive_claim_id;
    use ethers_core::types::Bytes;

    const SUBJECT: u8 = 0x5a;
    const OWNER: u8 = 0x0e;
    const ISSUER: u8 = 0x15;
    const OTHER_ISSUER: u8 = 0x16;
    const STRANGER: u8 = 0x99;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn request(issuer: u8, topic: u64, payload: &'static [u8], uri: &str) -> ClaimRequest {
        ClaimRequest {
            topic: U256::from(topic),
            scheme: U256::from(1),
            issuer: addr(issuer),
            signature: Bytes::from_static(payload),
            data: Bytes::from_static(payload),
            uri: uri.to_string(),
        }
    }

    fn registry(enforce: bool) -> (ClaimRegistry<Vec<ClaimEvent>>, SharedDirectory) {
        let directory = TrustedIssuerDirectory::shared(addr(OWNER));
        let registry = ClaimRegistry::with_sink(addr(SUBJECT), directory.clone(), enforce, Vec::new());
        (registry, directory)
    }

    #[test]
    fn test_add_then_get_round_trip() {
        let (mut registry, _) = registry(false);
        let req = request(ISSUER, 1, &[0x01, 0x23], "uri");

        let id = registry.request_add_claim(addr(ISSUER), req.clone()).unwrap();
        assert_eq!(id, derive_claim_id(addr(ISSUER), U256::from(1)));

        let claim = registry.get_claim(id).unwrap();
        assert_eq!(claim, req.into_claim());
        assert_eq!(registry.sink().len(), 1);
        assert_eq!(registry.sink()[0].kind, ClaimEventKind::ClaimRequested);
        assert_eq!(registry.sink()[0].claim, claim);
    }

    #[test]
    fn test_second_add_resolves_to_same_record() {
        let (mut registry, _) = registry(false);
        let first = registry
            .request_add_claim(addr(ISSUER), request(ISSUER, 1, b"a", "uri"))
            .unwrap();
        let second = registry
            .request_add_claim(addr(SUBJECT), request(ISSUER, 1, b"b", "uri-b"))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(registry.claim_count(), 1);
        assert_eq!(registry.get_claim_ids_by_topic(U256::from(1)), vec![first]);
        assert_eq!(registry.get_claim(first).unwrap().uri, "uri-b");

        let kinds: Vec<_> = registry.sink().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ClaimEventKind::ClaimRequested, ClaimEventKind::ClaimRequested]);
        assert_eq!(registry.sink()[1].claim.id, first);
    }

    #[test]
    fn test_get_unknown_claim_is_not_found() {
        let (registry, _) = registry(false);
        let id = derive_claim_id(addr(ISSUER), U256::from(1));
        assert_eq!(registry.get_claim(id), Err(RegistryError::NotFound(id)));
    }

    #[test]
    fn test_stranger_cannot_add() {
        let (mut registry, _) = registry(false);
        let result = registry.request_add_claim(addr(STRANGER), request(ISSUER, 1, b"x", "u"));

        assert_eq!(result, Err(RegistryError::Unauthorized(addr(STRANGER))));
        assert_eq!(registry.claim_count(), 0);
        assert!(registry.sink().is_empty());
    }

    #[test]
    fn test_zero_issuer_is_malformed() {
        let (mut registry, _) = registry(false);
        let mut req = request(ISSUER, 1, b"x", "u");
        req.issuer = Address::zero();

        assert!(matches!(
            registry.request_add_claim(addr(SUBJECT), req),
            Err(RegistryError::Malformed(_))
        ));
        assert_eq!(registry.claim_count(), 0);
    }

    #[test]
    fn test_change_updates_fields_and_emits() {
        let (mut registry, _) = registry(false);
        let id = registry
            .request_add_claim(addr(ISSUER), request(ISSUER, 1, &[0x01, 0x23], "uri"))
            .unwrap();

        registry
            .change_claim(addr(ISSUER), id, request(ISSUER, 1, &[0x04, 0x56], "uri2"))
            .unwrap();

        let claim = registry.get_claim(id).unwrap();
        assert_eq!(&claim.data[..], &[0x04u8, 0x56]);
        assert_eq!(claim.uri, "uri2");
        let last = registry.sink().last().unwrap();
        assert_eq!(last.kind, ClaimEventKind::ClaimChanged);
        assert_eq!(last.claim, claim);
    }

    #[test]
    fn test_change_with_mismatched_pair_is_malformed() {
        let (mut registry, _) = registry(false);
        let id = registry
            .request_add_claim(addr(ISSUER), request(ISSUER, 1, b"a", "uri"))
            .unwrap();
        let before = registry.get_claim(id).unwrap();

        let wrong_topic = registry.change_claim(addr(ISSUER), id, request(ISSUER, 2, b"b", "x"));
        let wrong_issuer = registry.change_claim(addr(SUBJECT), id, request(OTHER_ISSUER, 1, b"b", "x"));

        assert!(matches!(wrong_topic, Err(RegistryError::Malformed(_))));
        assert!(matches!(wrong_issuer, Err(RegistryError::Malformed(_))));
        assert_eq!(registry.get_claim(id).unwrap(), before);
        assert_eq!(registry.sink().len(), 1);
    }

    #[test]
    fn test_unauthorized_change_and_remove_leave_claim() {
        let (mut registry, _) = registry(false);
        let id = registry
            .request_add_claim(addr(ISSUER), request(ISSUER, 1, b"a", "uri"))
            .unwrap();
        let before = registry.get_claim(id).unwrap();

        assert_eq!(
            registry.change_claim(addr(STRANGER), id, request(ISSUER, 1, b"evil", "evil")),
            Err(RegistryError::Unauthorized(addr(STRANGER)))
        );
        assert_eq!(
            registry.remove_claim(addr(OTHER_ISSUER), id),
            Err(RegistryError::Unauthorized(addr(OTHER_ISSUER)))
        );

        assert_eq!(registry.get_claim(id).unwrap(), before);
        assert_eq!(registry.get_claim_ids_by_topic(U256::from(1)), vec![id]);
        assert_eq!(registry.sink().len(), 1);
    }

    #[test]
    fn test_remove_emits_last_known_values() {
        let (mut registry, _) = registry(false);
        let id = registry
            .request_add_claim(addr(ISSUER), request(ISSUER, 1, &[0x01, 0x23], "uri"))
            .unwrap();
        registry
            .change_claim(addr(ISSUER), id, request(ISSUER, 1, &[0x04, 0x56], "uri2"))
            .unwrap();

        registry.remove_claim(addr(SUBJECT), id).unwrap();

        let last = registry.sink().last().unwrap();
        assert_eq!(last.kind, ClaimEventKind::ClaimRemoved);
        assert_eq!(last.claim.uri, "uri2");
        assert_eq!(&last.claim.signature[..], &[0x04u8, 0x56]);
        assert_eq!(registry.get_claim(id), Err(RegistryError::NotFound(id)));
    }

    #[test]
    fn test_change_and_remove_after_removal_are_not_found() {
        let (mut registry, _) = registry(false);
        let id = registry
            .request_add_claim(addr(ISSUER), request(ISSUER, 1, b"a", "uri"))
            .unwrap();
        registry.remove_claim(addr(ISSUER), id).unwrap();

        assert_eq!(
            registry.change_claim(addr(ISSUER), id, request(ISSUER, 1, b"b", "uri")),
            Err(RegistryError::NotFound(id))
        );
        assert_eq!(registry.remove_claim(addr(ISSUER), id), Err(RegistryError::NotFound(id)));
        assert_eq!(registry.claim_count(), 0);
        assert_eq!(registry.sink().len(), 2);
    }

    #[test]
    fn test_topic_listing_tracks_live_claims() {
        let (mut registry, _) = registry(false);
        let a = registry.request_add_claim(addr(SUBJECT), request(0x21, 7, b"a", "")).unwrap();
        let b = registry.request_add_claim(addr(SUBJECT), request(0x22, 7, b"b", "")).unwrap();
        let c = registry.request_add_claim(addr(SUBJECT), request(0x23, 7, b"c", "")).unwrap();
        let other = registry.request_add_claim(addr(SUBJECT), request(0x21, 8, b"d", "")).unwrap();

        assert_eq!(registry.get_claim_ids_by_topic(U256::from(7)), vec![a, b, c]);
        assert_eq!(registry.get_claim_ids_by_topic(U256::from(8)), vec![other]);

        registry.remove_claim(addr(SUBJECT), a).unwrap();
        assert_eq!(registry.get_claim_ids_by_topic(U256::from(7)), vec![b, c]);

        let again = registry.request_add_claim(addr(SUBJECT), request(0x21, 7, b"a", "")).unwrap();
        assert_eq!(again, a);
        assert_eq!(registry.get_claim_ids_by_topic(U256::from(7)), vec![b, c, a]);
    }

    #[test]
    fn test_manager_can_mutate_until_revoked() {
        let (mut registry, _) = registry(false);
        let manager = addr(0x77);
        let id = registry
            .request_add_claim(addr(ISSUER), request(ISSUER, 3, b"a", "uri"))
            .unwrap();

        registry.add_manager(addr(SUBJECT), manager).unwrap();
        assert!(registry.is_manager(manager));
        registry
            .change_claim(manager, id, request(ISSUER, 3, b"b", "managed"))
            .unwrap();

        registry.remove_manager(addr(SUBJECT), manager).unwrap();
        assert_eq!(
            registry.remove_claim(manager, id),
            Err(RegistryError::Unauthorized(manager))
        );
        assert_eq!(registry.get_claim(id).unwrap().uri, "managed");
    }

    #[test]
    fn test_enforcement_rejects_untrusted_issuer() {
        let (mut registry, _) = registry(true);
        let result = registry.request_add_claim(addr(ISSUER), request(ISSUER, 1, b"a", "uri"));

        assert_eq!(
            result,
            Err(RegistryError::Untrusted { issuer: addr(ISSUER), topic: U256::from(1) })
        );
        assert_eq!(registry.claim_count(), 0);
        assert!(registry.get_claim_ids_by_topic(U256::from(1)).is_empty());
        assert!(registry.sink().is_empty());
    }

    #[test]
    fn test_enforcement_accepts_trusted_issuer_and_self_claims() {
        let (mut registry, directory) = registry(true);
        directory
            .write()
            .unwrap()
            .add_trusted_issuer(addr(OWNER), addr(ISSUER), vec![U256::from(1)])
            .unwrap();

        assert!(registry
            .request_add_claim(addr(ISSUER), request(ISSUER, 1, b"a", "uri"))
            .is_ok());
        assert!(registry
            .request_add_claim(addr(ISSUER), request(ISSUER, 2, b"a", "uri"))
            .is_err());
        assert!(registry
            .request_add_claim(addr(SUBJECT), request(SUBJECT, 2, b"self", "uri"))
            .is_ok());
        assert_eq!(registry.claim_count(), 2);
    }

    #[test]
    fn test_directory_is_consulted_per_call() {
        let (mut registry, directory) = registry(true);
        directory
            .write()
            .unwrap()
            .add_trusted_issuer(addr(OWNER), addr(ISSUER), vec![U256::from(1)])
            .unwrap();
        registry
            .request_add_claim(addr(ISSUER), request(ISSUER, 1, b"a", "uri"))
            .unwrap();

        directory
            .write()
            .unwrap()
            .remove_trusted_issuer(addr(OWNER), addr(ISSUER))
            .unwrap();
        assert!(matches!(
            registry.request_add_claim(addr(ISSUER), request(ISSUER, 1, b"b", "uri")),
            Err(RegistryError::Untrusted { .. })
        ));
        assert_eq!(registry.get_claim(derive_claim_id(addr(ISSUER), U256::from(1))).unwrap().uri, "uri");
    }

    #[test]
    fn test_default_registry_uses_in_memory_log() {
        let directory = TrustedIssuerDirectory::shared(addr(OWNER));
        let mut registry = ClaimRegistry::new(addr(SUBJECT), directory, false);
        registry
            .request_add_claim(addr(SUBJECT), request(SUBJECT, 1, b"a", "uri"))
            .unwrap();

        assert_eq!(registry.sink().len(), 1);
        assert_eq!(registry.sink().entries()[0].sequence, 0);
        assert!(!registry.enforces_trusted_issuers());
        assert_eq!(registry.subject(), addr(SUBJECT));
    }
}
