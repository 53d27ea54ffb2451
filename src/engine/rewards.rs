use crate::error::Result;
use crate::ledger::RewardInfo;
use crate::model::{FixedPointAmount, RewardDecimals, RewardEntry, RewardSummary};

/// Scale each ledger reward tuple to its emission token's decimals.
///
/// Order and duplicates are preserved. The three figures are reported as
/// given: `total` is never checked against or rebuilt from the two sides.
pub fn aggregate(infos: &[RewardInfo], decimals: &RewardDecimals) -> Result<RewardSummary> {
    let entries = infos
        .iter()
        .map(|info| {
            let d = decimals.for_token(&info.emission_token);
            Ok(RewardEntry {
                emission_token: info.emission_token,
                total: FixedPointAmount::from_ledger(info.total_amount, d)?,
                supply_side: FixedPointAmount::from_ledger(info.supply_side, d)?,
                borrow_side: FixedPointAmount::from_ledger(info.borrow_side, d)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RewardSummary { entries })
}
