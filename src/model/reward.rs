use std::collections::HashMap;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use super::amount::FixedPointAmount;

/// Outstanding rewards of one emission token for one (market, user) pair.
///
/// `total` is reported by the ledger independently of the two sides and is
/// not required to equal `supply_side + borrow_side`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardEntry {
    pub emission_token: Address,
    pub total: FixedPointAmount,
    pub supply_side: FixedPointAmount,
    pub borrow_side: FixedPointAmount,
}

/// Reward entries in the ledger's response order. Not deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewardSummary {
    pub entries: Vec<RewardEntry>,
}

impl RewardSummary {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Decimals used to scale each emission token's amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardDecimals {
    /// Applied to emission tokens without an override.
    pub default: u8,
    #[serde(default)]
    pub overrides: HashMap<Address, u8>,
}

impl RewardDecimals {
    pub fn uniform(default: u8) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, token: Address, decimals: u8) -> Self {
        self.overrides.insert(token, decimals);
        self
    }

    pub fn for_token(&self, token: &Address) -> u8 {
        self.overrides.get(token).copied().unwrap_or(self.default)
    }
}
