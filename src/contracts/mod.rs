// src/contracts/mod.rs
//! Claim holder, trusted issuer directory and the authorization guard.

pub mod authorization;
pub mod claim_registry;
pub mod trusted_issuers;
