use serde::Serialize;

use super::amount::FixedPointAmount;
use super::asset::Asset;
use crate::error::{EngineError, Result};

/// Predicted change of one tracked asset's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceDelta {
    pub asset: Asset,
    pub before: FixedPointAmount,
    pub after: FixedPointAmount,
    pub delta: FixedPointAmount,
}

/// A tracked asset's real balance before the simulated call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetBalance {
    pub asset: Asset,
    pub amount: FixedPointAmount,
}

/// Everything one withdrawal dry run observed.
///
/// `pre_state` is reported whether or not the call reverted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawReport {
    /// Block the reads and the simulation were evaluated at.
    pub block: u64,
    pub pre_state: Vec<AssetBalance>,
    pub result: DryRunResult,
}

/// Outcome of one speculative execution.
///
/// A revert carries its reason and never any deltas; a success carries one
/// delta per tracked asset, in tracking order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DryRunResult {
    Succeeded { balance_delta: Vec<BalanceDelta> },
    Reverted { revert_reason: String },
}

impl DryRunResult {
    pub fn reverted(reason: impl Into<String>) -> Self {
        DryRunResult::Reverted {
            revert_reason: reason.into(),
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, DryRunResult::Succeeded { .. })
    }

    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            DryRunResult::Reverted { revert_reason } => Some(revert_reason),
            DryRunResult::Succeeded { .. } => None,
        }
    }

    /// Empty for a reverted run.
    pub fn balance_delta(&self) -> &[BalanceDelta] {
        match self {
            DryRunResult::Succeeded { balance_delta } => balance_delta,
            DryRunResult::Reverted { .. } => &[],
        }
    }

    /// For callers that treat a revert as a failure.
    pub fn into_deltas(self) -> Result<Vec<BalanceDelta>> {
        match self {
            DryRunResult::Succeeded { balance_delta } => Ok(balance_delta),
            DryRunResult::Reverted { revert_reason } => {
                Err(EngineError::RevertedSimulation(revert_reason))
            }
        }
    }
}
