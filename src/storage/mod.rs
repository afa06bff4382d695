// src/storage/mod.rs
//! Claim storage and the audit event log.

pub mod claim_store;
pub mod event_log;
