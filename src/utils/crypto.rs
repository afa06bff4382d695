// src/utils/crypto.rs
//! Hashing and claim addressing helpers.
//!
//! Uses Keccak-256 (Ethereum's standard hash function) so that claim ids
//! computed here match the ones an EVM claim holder or an off-chain indexer
//! would compute.

use ethers_core::types::{Address, H256, U256};
use ethers_core::utils::keccak256;

use crate::models::claim::ClaimId;

/// Computes a Keccak-256 hash of the input data (Ethereum-compatible).
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) containing the hash.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Derives the canonical claim id for an `(issuer, topic)` pair.
///
/// The id is `keccak256(abi.encodePacked(issuer, topic))`: the 20 address
/// bytes followed by the 32-byte big-endian topic. It is a pure function of
/// its inputs, so any collaborator can compute it without asking the
/// registry.
///
/// # Example
/// ```
/// use claim_registry::utils::crypto::derive_claim_id;
/// use ethers_core::types::{Address, U256};
///
/// let issuer = Address::repeat_byte(0x11);
/// assert_eq!(
///     derive_claim_id(issuer, U256::from(1)),
///     derive_claim_id(issuer, U256::from(1)),
/// );
/// ```
pub fn derive_claim_id(issuer: Address, topic: U256) -> ClaimId {
    let mut packed = [0u8; 52];
    packed[..20].copy_from_slice(issuer.as_bytes());
    topic.to_big_endian(&mut packed[20..]);
    H256::from(hash_data(&packed))
}
