// src/main.rs

//! # Claim Registry - Main Entry Point
//!
//! Loads settings, builds the trusted issuer directory and the claim holder
//! for the configured subject, then starts the API server.
//!
//! ## Environment Variables
//! - `CLAIMS_SUBJECT`: identity that owns the claim holder (required)
//! - `CLAIMS_DIRECTORY_OWNER`: trusted issuer administrator (optional)
//! - `CLAIMS_ENFORCE_TRUSTED_ISSUERS`: (Optional) default `true`
//! - `CLAIMS_BIND_ADDRESS`: (Optional) default `127.0.0.1:3000`
//! - `CLAIMS_LOG_LEVEL`: (Optional) default `info`, `RUST_LOG` takes precedence

use anyhow::Result;
use claim_registry::contracts::claim_registry::ClaimRegistry;
use claim_registry::contracts::trusted_issuers::TrustedIssuerDirectory;
use claim_registry::services::api_server::ApiServer;
use claim_registry::settings::Settings;
use dotenv::dotenv;
use log::info;
use std::sync::{Arc, Mutex};

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load `.env` and settings
/// 2. Initialize logging
/// 3. Build the directory and the claim holder
/// 4. Start API server
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let settings = Settings::load()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(settings.log_level.as_str())).init();

    // Directory is shared with the API for administration; the registry only reads it
    let directory = TrustedIssuerDirectory::shared(settings.directory_owner);
    let registry = ClaimRegistry::new(
        settings.subject,
        directory.clone(),
        settings.enforce_trusted_issuers,
    );
    let registry = Arc::new(Mutex::new(registry));

    let api_server = ApiServer::new(registry, directory, settings.max_body_bytes);

    info!("Claim holder for subject {:?}", settings.subject);
    info!("Trusted issuer directory owner {:?}", settings.directory_owner);
    info!(
        "Trusted issuer enforcement {}",
        if settings.enforce_trusted_issuers { "on" } else { "off" }
    );
    info!("Available endpoints:");
    info!("- POST   /claims");
    info!("- GET    /claims/:id");
    info!("- PUT    /claims/:id");
    info!("- DELETE /claims/:id");
    info!("- GET    /claims/:id/validity");
    info!("- GET    /topics/:topic/claims");
    info!("- GET    /claim-id?issuer=&topic=");
    info!("- GET    /events");
    info!("- GET    /trusted-issuers, POST /trusted-issuers");
    info!("- PUT    /trusted-issuers/:issuer, DELETE /trusted-issuers/:issuer");
    info!("- GET    /trusted-issuers/:issuer/topics/:topic");
    info!("- GET    /directory, GET /directory-events");
    info!("- POST   /managers/:manager, DELETE /managers/:manager");

    api_server.run(settings.bind_address).await
}
