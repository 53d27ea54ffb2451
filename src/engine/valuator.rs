use crate::error::Result;
use crate::model::{FixedPointAmount, PositionSnapshot};

/// Converts raw market reads into supplied/borrowed/net amounts.
///
/// Pure and deterministic; knows nothing about the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionValuator {
    exchange_rate_decimals: u8,
}

impl PositionValuator {
    /// `exchange_rate_decimals` is the exponent `balance * rate` is divided by
    /// (18 for Compound-style markets).
    pub fn new(exchange_rate_decimals: u8) -> Self {
        Self {
            exchange_rate_decimals,
        }
    }

    pub fn valuate(
        &self,
        collateral_balance: &FixedPointAmount,
        exchange_rate: &FixedPointAmount,
        current_debt: &FixedPointAmount,
    ) -> Result<PositionSnapshot> {
        valuate(
            collateral_balance,
            exchange_rate,
            current_debt,
            self.exchange_rate_decimals,
        )
    }
}

/// `supplied = balance * rate / 10^rate_decimals`, expressed at the debt's
/// decimals (truncating like the market's own integer division), and
/// `net = supplied - debt`.
pub fn valuate(
    collateral_balance: &FixedPointAmount,
    exchange_rate: &FixedPointAmount,
    current_debt: &FixedPointAmount,
    exchange_rate_decimals: u8,
) -> Result<PositionSnapshot> {
    let collateral_balance = collateral_balance.ensure_non_negative("collateral balance")?;
    let exchange_rate = exchange_rate.ensure_non_negative("exchange rate")?;
    let current_debt = current_debt.ensure_non_negative("current debt")?;

    let supplied = collateral_balance
        .multiply_by_rate(&exchange_rate, exchange_rate_decimals)?
        .scale_to_truncating(current_debt.decimals())?;
    let borrowed = current_debt.scale_to(supplied.decimals())?;

    PositionSnapshot::new(supplied, borrowed)
}
