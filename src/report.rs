use std::fmt::Write;

use serde::Serialize;

use crate::config::FarmConfig;
use crate::engine::PositionReport;
use crate::model::{AssetBalance, DryRunResult, FixedPointAmount, WithdrawReport};

/// Plain-text position report: valuation lines, then one block per reward entry.
pub fn render_position(report: &PositionReport, cfg: &FarmConfig) -> String {
    let underlying = &cfg.underlying.symbol;
    let snap = &report.snapshot;
    let mut out = String::new();

    let _ = writeln!(out, "Block:            {}", report.block);
    let _ = writeln!(out, "{} balance:   {}", cfg.market.symbol, report.collateral_balance);
    let _ = writeln!(out, "Exchange rate:    {}", report.exchange_rate);
    let _ = writeln!(out, "Supplied {underlying}:    {}", snap.supplied());
    let _ = writeln!(out, "Borrowed {underlying}:    {}", snap.borrowed());
    let _ = writeln!(out, "Net {underlying} on withdraw: {}", snap.net());
    if snap.is_underwater() {
        let _ = writeln!(out, "WARNING: debt exceeds supplied collateral");
    }

    if report.rewards.is_empty() {
        let _ = writeln!(out, "\nNo outstanding rewards.");
    }
    for entry in &report.rewards.entries {
        let _ = writeln!(out, "\nReward token: {}", entry.emission_token);
        let _ = writeln!(out, "  Total:       {}", entry.total);
        let _ = writeln!(out, "  Supply-side: {}", entry.supply_side);
        let _ = writeln!(out, "  Borrow-side: {}", entry.borrow_side);
    }
    out
}

/// Plain-text dry-run report: the real pre-state always, then the outcome.
pub fn render_dry_run(amount: &FixedPointAmount, report: &WithdrawReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Block: {}", report.block);
    for held in &report.pre_state {
        let _ = writeln!(out, "Pre-withdraw {}: {}", held.asset.symbol, held.amount);
    }
    match &report.result {
        DryRunResult::Reverted { revert_reason } => {
            let _ = writeln!(out, "withdraw({amount}) would revert: {revert_reason}");
        }
        DryRunResult::Succeeded { balance_delta } => {
            let _ = writeln!(out, "withdraw({amount}) would succeed");
            for d in balance_delta {
                let _ = writeln!(out, "Predicted {} change: {}", d.asset.symbol, d.delta);
            }
        }
    }
    out
}

#[derive(Serialize)]
struct DryRunDocument<'a> {
    amount: &'a FixedPointAmount,
    block: u64,
    pre_state: &'a [AssetBalance],
    #[serde(flatten)]
    result: &'a DryRunResult,
}

pub fn position_json(report: &PositionReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

pub fn dry_run_json(amount: &FixedPointAmount, report: &WithdrawReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&DryRunDocument {
        amount,
        block: report.block,
        pre_state: &report.pre_state,
        result: &report.result,
    })
}
