// src/models/trusted_issuer.rs
//! Trusted issuer record.

use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One issuer's authorization scope in the trusted issuer directory.
///
/// Topics are kept in a `BTreeSet` so that listings are sorted and
/// duplicates collapse.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TrustedIssuerRecord {
    pub issuer: Address,
    pub authorized_topics: BTreeSet<U256>,
}

impl TrustedIssuerRecord {
    pub fn new(issuer: Address, topics: impl IntoIterator<Item = U256>) -> Self {
        TrustedIssuerRecord {
            issuer,
            authorized_topics: topics.into_iter().collect(),
        }
    }

    pub fn covers(&self, topic: U256) -> bool {
        self.authorized_topics.contains(&topic)
    }

    pub fn topics(&self) -> Vec<U256> {
        self.authorized_topics.iter().copied().collect()
    }
}
