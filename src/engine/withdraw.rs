use std::collections::HashSet;

use alloy::primitives::{Address, U256};
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::ledger::{
    CallerIdentity, CancelToken, LedgerClient, ReadCall, SimulateCall, SimulateMethod,
    SimulateOutcome,
};
use crate::model::{
    Asset, AssetBalance, BalanceDelta, DryRunResult, FixedPointAmount, WithdrawReport,
};

/// Predicts what `withdraw(amount)` would do to the farm's token balances.
///
/// The post-state comes from reads evaluated inside the same simulation,
/// after the withdrawal, never from a second real read: a dry run leaves the
/// real ledger untouched, so re-reading it would always show a zero change.
pub struct WithdrawalSimulator<'a, L: ?Sized> {
    ledger: &'a L,
    farm: Address,
    caller: CallerIdentity,
}

impl<'a, L: LedgerClient + ?Sized> WithdrawalSimulator<'a, L> {
    pub fn new(ledger: &'a L, farm: Address, caller: CallerIdentity) -> Self {
        Self {
            ledger,
            farm,
            caller,
        }
    }

    /// The dry-run outcome alone.
    pub async fn simulate_withdrawal(
        &self,
        amount: &FixedPointAmount,
        tracked_assets: &[Asset],
        cancel: &CancelToken,
    ) -> Result<DryRunResult> {
        Ok(self
            .preview_withdrawal(amount, tracked_assets, cancel)
            .await?
            .result)
    }

    /// Dry-run `withdraw(amount)` and keep the pre-state it was diffed against.
    ///
    /// The pre-state reads and the simulation are evaluated at one resolved block.
    pub async fn preview_withdrawal(
        &self,
        amount: &FixedPointAmount,
        tracked_assets: &[Asset],
        cancel: &CancelToken,
    ) -> Result<WithdrawReport> {
        if amount.is_zero() {
            return Err(EngineError::InvalidAmount(
                "withdrawal amount must be non-zero".into(),
            ));
        }
        let amount_raw = amount.to_ledger("withdrawal amount")?;

        let assets = dedup_by_address(tracked_assets);
        let reads: Vec<ReadCall> = assets
            .iter()
            .map(|a| ReadCall::balance_of(a.address, self.farm))
            .collect();

        let block = cancel.run(self.ledger.resolve_block()).await?;

        // 1. pre-state, from the real ledger
        let mut before = Vec::with_capacity(reads.len());
        for read in &reads {
            before.push(cancel.run(self.ledger.read_quantity(read, block)).await?);
        }
        let pre_state = assets
            .iter()
            .zip(&before)
            .map(|(asset, raw)| {
                Ok(AssetBalance {
                    asset: asset.clone(),
                    amount: FixedPointAmount::from_ledger(*raw, asset.decimals)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // 2. the withdrawal plus the same reads, against one speculative state
        let call = SimulateCall {
            contract: self.farm,
            method: SimulateMethod::Withdraw { amount: amount_raw },
            caller: self.caller,
            speculative_reads: reads,
        };
        info!(amount = %amount, assets = assets.len(), block, "simulating withdraw");
        let outcome = cancel.run(self.ledger.simulate_call(&call, block)).await?;

        let after = match outcome {
            SimulateOutcome::Reverted { reason } => {
                info!(%reason, "withdraw would revert");
                return Ok(WithdrawReport {
                    block,
                    pre_state,
                    result: DryRunResult::reverted(reason),
                });
            }
            SimulateOutcome::Success { speculative_reads } => speculative_reads,
        };
        if after.len() != assets.len() {
            return Err(EngineError::MalformedResponse(format!(
                "simulation returned {} speculative reads for {} tracked assets",
                after.len(),
                assets.len()
            )));
        }

        // 3. diff speculative post against real pre
        let balance_delta = assets
            .into_iter()
            .zip(before.into_iter().zip(after))
            .map(|(asset, (pre, post))| delta(asset, pre, post))
            .collect::<Result<Vec<_>>>()?;
        debug!(deltas = balance_delta.len(), "withdraw simulated");

        Ok(WithdrawReport {
            block,
            pre_state,
            result: DryRunResult::Succeeded { balance_delta },
        })
    }
}

fn delta(asset: Asset, pre: U256, post: U256) -> Result<BalanceDelta> {
    let before = FixedPointAmount::from_ledger(pre, asset.decimals)?;
    let after = FixedPointAmount::from_ledger(post, asset.decimals)?;
    let delta = after.subtract(&before)?;
    Ok(BalanceDelta {
        asset,
        before,
        after,
        delta,
    })
}

/// Tracked assets form a set; keep the first occurrence of each address.
fn dedup_by_address(assets: &[Asset]) -> Vec<Asset> {
    let mut seen = HashSet::new();
    assets
        .iter()
        .filter(|a| seen.insert(a.address))
        .cloned()
        .collect()
}
