// src/settings.rs
//! Runtime configuration.
//!
//! Values come from built-in defaults overridden by `CLAIMS_*` environment
//! variables (a `.env` file is loaded first by `main`):
//!
//! - `CLAIMS_SUBJECT`: address of the identity that owns the claim holder (required)
//! - `CLAIMS_DIRECTORY_OWNER`: address allowed to administer trusted issuers
//!   (defaults to the subject)
//! - `CLAIMS_ENFORCE_TRUSTED_ISSUERS`: reject third-party claims the directory
//!   does not back (default `true`)
//! - `CLAIMS_BIND_ADDRESS`: API listen address (default `127.0.0.1:3000`)
//! - `CLAIMS_LOG_LEVEL`: env_logger filter (default `info`)
//! - `CLAIMS_MAX_BODY_BYTES`: request body limit (default 64 KiB)

use anyhow::{anyhow, Context, Result};
use config::{Config, Environment};
use ethers_core::types::Address;
use serde::Deserialize;
use std::net::SocketAddr;
use std::str::FromStr;

const ENV_PREFIX: &str = "CLAIMS";

/// Settings as read from the sources, before validation.
#[derive(Debug, Deserialize)]
struct RawSettings {
    bind_address: String,
    subject: Option<String>,
    directory_owner: Option<String>,
    enforce_trusted_issuers: bool,
    log_level: String,
    max_body_bytes: usize,
}

/// Validated application settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_address: SocketAddr,
    pub subject: Address,
    pub directory_owner: Address,
    pub enforce_trusted_issuers: bool,
    pub log_level: String,
    pub max_body_bytes: usize,
}

impl Settings {
    /// Loads settings from defaults and the process environment.
    pub fn load() -> Result<Self> {
        let config = Self::builder()?
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("failed to read configuration")?;
        Self::from_config(config)
    }

    /// Builder pre-populated with defaults.
    pub fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("bind_address", "127.0.0.1:3000")?
            .set_default("enforce_trusted_issuers", true)?
            .set_default("log_level", "info")?
            .set_default("max_body_bytes", 64_i64 * 1024)?)
    }

    /// Validates an already built configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let raw: RawSettings = config
            .try_deserialize()
            .context("invalid configuration")?;

        let subject = raw
            .subject
            .as_deref()
            .ok_or_else(|| anyhow!("{}_SUBJECT must be set", ENV_PREFIX))
            .and_then(|value| parse_address("subject", value))?;
        let directory_owner = match raw.directory_owner.as_deref() {
            Some(value) => parse_address("directory_owner", value)?,
            None => subject,
        };
        let bind_address = raw
            .bind_address
            .parse()
            .with_context(|| format!("invalid bind_address {:?}", raw.bind_address))?;

        Ok(Settings {
            bind_address,
            subject,
            directory_owner,
            enforce_trusted_issuers: raw.enforce_trusted_issuers,
            log_level: raw.log_level,
            max_body_bytes: raw.max_body_bytes,
        })
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address> {
    let address = Address::from_str(value.trim()).with_context(|| format!("invalid {} address {:?}", field, value))?;
    if address.is_zero() {
        return Err(anyhow!("{} address must not be zero", field));
    }
    Ok(address)
}
