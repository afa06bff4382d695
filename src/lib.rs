// src/lib.rs

//! # Claim Registry
//!
//! ERC735-style claim holder for a single identity, backed by a trusted
//! issuer directory and exposed over a small REST API.
//!
//! ## Layout
//! 1. **Contracts**: claim holder, authorization guard, trusted issuer directory
//! 2. **Models**: claims, events and issuer records
//! 3. **Storage**: claim store with topic index, append-only event log
//! 4. **Services**: API server, error mapping, claim verifier
//! 5. **Utils**: claim id derivation and JSON helpers

pub mod contracts;
pub mod error;
pub mod models;
pub mod services;
pub mod settings;
pub mod storage;
pub mod utils;
