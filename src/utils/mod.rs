// src/utils/mod.rs
//! Hashing and serialization helpers.

pub mod crypto;
pub mod serialization;
