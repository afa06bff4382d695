// src/services/verifier.rs
//! Claim validity checks for relying parties.
//!
//! A stored claim is only as good as its issuer. The verifier answers whether
//! a live claim comes from the subject itself or from an issuer the trusted
//! issuer directory backs for the claim's topic. Signature payloads are not
//! checked here.

use ethers_core::types::{Address, U256};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::contracts::claim_registry::{lock_registry, SharedRegistry};
use crate::error::RegistryError;
use crate::models::claim::ClaimId;

/// Outcome of a validity check on one claim.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClaimValidity {
    pub claim_id: ClaimId,
    pub issuer: Address,
    pub topic: U256,
    /// Issued by the subject about itself
    pub self_asserted: bool,
    /// Issuer is the subject or is trusted for the topic
    pub is_valid: bool,
}

/// Claim verifier bound to one claim holder.
pub struct ClaimVerifier {
    registry: SharedRegistry,
}

impl ClaimVerifier {
    pub fn new(registry: SharedRegistry) -> Self {
        ClaimVerifier { registry }
    }

    /// Checks the claim stored at `id`.
    ///
    /// # Errors
    /// `NotFound` if no live claim has this id.
    pub fn verify_claim(&self, id: ClaimId) -> Result<ClaimValidity, RegistryError> {
        let registry = lock_registry(&self.registry);
        let claim = registry.get_claim(id)?;
        let self_asserted = claim.issuer == registry.subject();
        let is_valid = registry.is_trusted_for(claim.issuer, claim.topic);

        debug!("Claim {:?} validity: {}", id, is_valid);
        Ok(ClaimValidity {
            claim_id: id,
            issuer: claim.issuer,
            topic: claim.topic,
            self_asserted,
            is_valid,
        })
    }

    /// Whether at least one live claim on `topic` passes [`verify_claim`](Self::verify_claim).
    pub fn has_valid_claim_for_topic(&self, topic: U256) -> bool {
        let registry = lock_registry(&self.registry);
        registry
            .get_claim_ids_by_topic(topic)
            .into_iter()
            .filter_map(|id| registry.get_claim(id).ok())
            .any(|claim| registry.is_trusted_for(claim.issuer, claim.topic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::claim_registry::ClaimRegistry;
    use crate::contracts::trusted_issuers::{SharedDirectory, TrustedIssuerDirectory};
    use crate::models::claim::ClaimRequest;
    use ethers_core::types::Bytes;
    use std::sync::{Arc, Mutex};

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn setup() -> (ClaimVerifier, SharedRegistry, SharedDirectory) {
        let directory = TrustedIssuerDirectory::shared(addr(0x0e));
        let registry = Arc::new(Mutex::new(ClaimRegistry::new(addr(0x5a), directory.clone(), false)));
        (ClaimVerifier::new(registry.clone()), registry, directory)
    }

    fn add(registry: &SharedRegistry, issuer: u8, topic: u64) -> ClaimId {
        lock_registry(registry)
            .request_add_claim(
                addr(issuer),
                ClaimRequest {
                    topic: U256::from(topic),
                    scheme: U256::from(1),
                    issuer: addr(issuer),
                    signature: Bytes::from_static(b"sig"),
                    data: Bytes::from_static(b"data"),
                    uri: "uri".into(),
                },
            )
            .unwrap()
    }

    #[test]
    fn test_untrusted_issuer_claim_is_invalid() {
        let (verifier, registry, _) = setup();
        let id = add(&registry, 0x15, 1);

        let validity = verifier.verify_claim(id).unwrap();
        assert!(!validity.is_valid);
        assert!(!validity.self_asserted);
        assert!(!verifier.has_valid_claim_for_topic(U256::from(1)));
    }

    #[test]
    fn test_trusted_issuer_claim_is_valid() {
        let (verifier, registry, directory) = setup();
        let id = add(&registry, 0x15, 1);
        directory
            .write()
            .unwrap()
            .add_trusted_issuer(addr(0x0e), addr(0x15), vec![U256::from(1)])
            .unwrap();

        assert!(verifier.verify_claim(id).unwrap().is_valid);
        assert!(verifier.has_valid_claim_for_topic(U256::from(1)));
        assert!(!verifier.has_valid_claim_for_topic(U256::from(2)));
    }

    #[test]
    fn test_self_asserted_claim_is_valid() {
        let (verifier, registry, _) = setup();
        let id = add(&registry, 0x5a, 9);

        let validity = verifier.verify_claim(id).unwrap();
        assert!(validity.self_asserted);
        assert!(validity.is_valid);
    }

    #[test]
    fn test_unknown_claim_is_not_found() {
        let (verifier, _, _) = setup();
        let id = ClaimId::repeat_byte(1);
        assert_eq!(verifier.verify_claim(id), Err(RegistryError::NotFound(id)));
    }
}
