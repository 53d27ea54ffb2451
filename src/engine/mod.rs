pub mod rewards;
pub mod valuator;
pub mod withdraw;

use serde::Serialize;
use tracing::debug;

use crate::config::FarmConfig;
use crate::error::Result;
use crate::ledger::{CallerIdentity, CancelToken, LedgerClient, ReadCall, RewardQuery};
use crate::model::{FixedPointAmount, PositionSnapshot, RewardSummary, WithdrawReport};

use valuator::PositionValuator;
use withdraw::WithdrawalSimulator;

/// Everything a position check reads and derives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionReport {
    /// Block every read was evaluated at.
    pub block: u64,
    /// Market (wrapper) token balance of the farm.
    pub collateral_balance: FixedPointAmount,
    pub exchange_rate: FixedPointAmount,
    pub snapshot: PositionSnapshot,
    pub rewards: RewardSummary,
}

/// Valuation and dry-run engine for one configured farm.
///
/// Holds no mutable state: every call reads fresh and derives fresh.
pub struct Engine<L> {
    ledger: L,
    config: FarmConfig,
}

impl<L: LedgerClient> Engine<L> {
    pub fn new(ledger: L, config: FarmConfig) -> Self {
        Self { ledger, config }
    }

    pub fn config(&self) -> &FarmConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Read the position and its rewards, then value it.
    ///
    /// The block is resolved once, then the market reads and the reward read
    /// are issued concurrently against it; nothing is derived until every read
    /// has completed, and the first failure or a cancellation aborts the whole
    /// check.
    pub async fn check_position(&self, cancel: &CancelToken) -> Result<PositionReport> {
        let cfg = &self.config;
        let market = cfg.market.address;

        let balance_read = ReadCall::balance_of(market, cfg.farm);
        let rate_read = ReadCall::exchange_rate_stored(market);
        let debt_read = ReadCall::borrow_balance_current(market, cfg.farm);
        let reward_query = RewardQuery {
            distributor: cfg.reward_distributor,
            market,
            user: cfg.farm,
        };

        let block = cancel.run(self.ledger.resolve_block()).await?;

        let market_reads = async {
            tokio::try_join!(
                cancel.run(self.ledger.read_quantity(&balance_read, block)),
                cancel.run(self.ledger.read_quantity(&rate_read, block)),
                cancel.run(self.ledger.read_quantity(&debt_read, block)),
            )
        };
        let reward_read = cancel.run(self.ledger.read_rewards(&reward_query, block));

        let ((balance, rate, debt), infos) = tokio::try_join!(market_reads, reward_read)?;
        debug!(block, %balance, %rate, %debt, rewards = infos.len(), "position reads complete");

        let collateral_balance = FixedPointAmount::from_ledger(balance, cfg.market.decimals)?;
        let exchange_rate = FixedPointAmount::from_ledger(rate, cfg.exchange_rate.value_decimals)?;
        let current_debt = FixedPointAmount::from_ledger(debt, cfg.underlying.decimals)?;

        let snapshot = PositionValuator::new(cfg.exchange_rate.divisor_decimals).valuate(
            &collateral_balance,
            &exchange_rate,
            &current_debt,
        )?;
        let rewards = rewards::aggregate(&infos, &cfg.reward_decimals)?;

        Ok(PositionReport {
            block,
            collateral_balance,
            exchange_rate,
            snapshot,
            rewards,
        })
    }

    /// Dry-run `withdraw(amount)` as `caller`, diffing the configured tracked assets.
    pub async fn simulate_withdraw(
        &self,
        amount: &FixedPointAmount,
        caller: CallerIdentity,
        cancel: &CancelToken,
    ) -> Result<WithdrawReport> {
        WithdrawalSimulator::new(&self.ledger, self.config.farm, caller)
            .preview_withdrawal(amount, &self.config.tracked_assets(), cancel)
            .await
    }
}
