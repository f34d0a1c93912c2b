//! Tracked wallet record

use serde::{Deserialize, Serialize};

use crate::amount::raw_balance;
use crate::chain::Chain;

/// A watched address on one canonical chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: u64,
    pub chain: Chain,
    pub address: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub notes: String,
    /// Last known balance in the chain's smallest unit
    #[serde(default, with = "raw_balance")]
    pub last_raw_balance: u128,
}

impl Wallet {
    /// A freshly created wallet starts at raw balance zero
    pub fn new(id: u64, chain: Chain, address: impl Into<String>) -> Self {
        Self {
            id,
            chain,
            address: address.into(),
            label: String::new(),
            notes: String::new(),
            last_raw_balance: 0,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    #[must_use]
    pub fn with_raw_balance(mut self, raw: u128) -> Self {
        self.last_raw_balance = raw;
        self
    }
}
