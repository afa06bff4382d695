// src/error.rs
//! Error types for the claim holder and the trusted issuer directory.
//!
//! Every error aborts the whole call; no operation leaves a partial write
//! behind when it returns one of these.

use ethers_core::types::{Address, U256};
use thiserror::Error;

use crate::models::claim::ClaimId;

/// Errors returned by [`ClaimRegistry`](crate::contracts::claim_registry::ClaimRegistry).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The caller is neither the subject, the claim issuer, nor a manager.
    #[error("caller {0:?} is not authorized")]
    Unauthorized(Address),

    /// No live claim is stored at this id.
    #[error("claim {0:?} not found")]
    NotFound(ClaimId),

    /// The directory does not trust `issuer` for `topic`.
    #[error("issuer {issuer:?} is not trusted for topic {topic}")]
    Untrusted { issuer: Address, topic: U256 },

    /// A structural constraint was violated, e.g. a change request whose
    /// issuer/topic do not hash to the target id.
    #[error("malformed request: {0}")]
    Malformed(String),
}

/// Errors returned by [`TrustedIssuerDirectory`](crate::contracts::trusted_issuers::TrustedIssuerDirectory).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("caller {0:?} is not the directory owner")]
    NotOwner(Address),

    #[error("issuer {0:?} is already trusted")]
    AlreadyTrusted(Address),

    #[error("issuer {0:?} is not trusted")]
    UnknownIssuer(Address),

    #[error("invalid issuer entry: {0}")]
    Invalid(String),
}
