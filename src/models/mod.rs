// src/models/mod.rs
//! Data structures shared by the registry, the directory and the API.

pub mod claim;
pub mod events;
pub mod trusted_issuer;
