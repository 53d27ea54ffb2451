pub mod amount;
pub mod asset;
pub mod chain;
pub mod dry_run;
pub mod position;
pub mod reward;

pub use amount::FixedPointAmount;
pub use asset::Asset;
pub use chain::Chain;
pub use dry_run::{AssetBalance, BalanceDelta, DryRunResult, WithdrawReport};
pub use position::PositionSnapshot;
pub use reward::{RewardDecimals, RewardEntry, RewardSummary};
