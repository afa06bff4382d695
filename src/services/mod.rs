// src/services/mod.rs
//! HTTP API and relying-party checks on top of the claim holder.

pub mod api_error;
pub mod api_server;
pub mod verifier;
