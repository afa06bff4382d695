// src/models/claim.rs
//! ERC735-style claim data model.
//!
//! A claim is an attestation about the subject of a claim holder, scoped to a
//! topic and asserted by an issuer. The registry stores it verbatim: the
//! `signature` and `data` payloads are opaque and never interpreted here.

use ethers_core::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};

use crate::utils::crypto::derive_claim_id;

/// Canonical claim identifier, `keccak256(abi.encodePacked(issuer, topic))`.
pub type ClaimId = H256;

/// A single attestation attached to the subject's identity.
///
/// # Fields
/// - `id`: derived from `(issuer, topic)`, never chosen by the caller
/// - `topic`: semantic category (e.g. KYC, accredited investor)
/// - `scheme`: how `signature` should be interpreted by verifiers
/// - `issuer`: address of the asserting party
/// - `signature`: issuer's signature over `(subject, topic, data)`
/// - `data`: claim content
/// - `uri`: off-chain pointer to supporting evidence
///
/// # Serialization
/// Addresses, ids and byte payloads serialize as `0x`-prefixed hex strings,
/// matching how an EVM JSON-RPC node would return them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub id: ClaimId,
    pub topic: U256,
    pub scheme: U256,
    pub issuer: Address,
    pub signature: Bytes,
    pub data: Bytes,
    pub uri: String,
}

/// The caller-supplied part of a claim: everything except the id.
///
/// Used as the argument bundle for add and change requests.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
    pub topic: U256,
    pub scheme: U256,
    pub issuer: Address,
    pub signature: Bytes,
    pub data: Bytes,
    pub uri: String,
}

impl ClaimRequest {
    /// Id this request addresses.
    pub fn claim_id(&self) -> ClaimId {
        derive_claim_id(self.issuer, self.topic)
    }

    /// Materializes the request into a stored claim record.
    pub fn into_claim(self) -> Claim {
        Claim {
            id: self.claim_id(),
            topic: self.topic,
            scheme: self.scheme,
            issuer: self.issuer,
            signature: self.signature,
            data: self.data,
            uri: self.uri,
        }
    }
}

impl Claim {
    /// Overwrites the mutable fields of this claim from `request`.
    ///
    /// `id`, `issuer` and `topic` are left untouched; callers must have
    /// checked that the request addresses this claim.
    pub(crate) fn apply(&mut self, request: ClaimRequest) {
        self.scheme = request.scheme;
        self.signature = request.signature;
        self.data = request.data;
        self.uri = request.uri;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(sig: &'static [u8]) -> ClaimRequest {
        ClaimRequest {
            topic: U256::from(1),
            scheme: U256::from(1),
            issuer: Address::repeat_byte(0x42),
            signature: Bytes::from_static(sig),
            data: Bytes::from_static(sig),
            uri: "uri".to_string(),
        }
    }

    #[test]
    fn test_into_claim_keeps_fields() {
        let req = request(&[0x01, 0x23]);
        let claim = req.clone().into_claim();

        assert_eq!(claim.id, derive_claim_id(req.issuer, req.topic));
        assert_eq!(claim.topic, req.topic);
        assert_eq!(claim.scheme, req.scheme);
        assert_eq!(claim.issuer, req.issuer);
        assert_eq!(claim.signature, req.signature);
        assert_eq!(claim.data, req.data);
        assert_eq!(claim.uri, req.uri);
    }

    #[test]
    fn test_apply_leaves_identity_fields() {
        let mut claim = request(&[0x01, 0x23]).into_claim();
        let id = claim.id;

        let mut update = request(&[0x04, 0x56]);
        update.uri = "uri2".to_string();
        update.scheme = U256::from(2);
        claim.apply(update);

        assert_eq!(claim.id, id);
        assert_eq!(claim.scheme, U256::from(2));
        assert_eq!(&claim.data[..], &[0x04u8, 0x56]);
        assert_eq!(claim.uri, "uri2");
    }

    #[test]
    fn test_claim_json_uses_hex() {
        let claim = request(&[0x01, 0x23]).into_claim();
        let json = serde_json::to_value(&claim).unwrap();

        assert_eq!(json["signature"], "0x0123");
        assert_eq!(json["uri"], "uri");
        assert!(json["id"].as_str().unwrap().starts_with("0x"));
    }
}
