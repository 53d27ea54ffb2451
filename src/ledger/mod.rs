//! Read and dry-run capability over the remote ledger.
//!
//! The engine only ever talks to a [`LedgerClient`]. Reads are point-in-time
//! and side-effect free; simulations run against a discarded copy of state.

pub mod cancel;
pub mod evm;

use alloy::primitives::{Address, BlockNumber, U256};
use async_trait::async_trait;

use crate::error::Result;

pub use cancel::{CancelHandle, CancelToken};

// ── Requests ────────────────────────────────────────────────────────

/// A read-only method with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReadMethod {
    /// `balanceOf(address)` on an ERC20 or market token.
    BalanceOf { holder: Address },
    /// `exchangeRateStored()` on a market token.
    ExchangeRateStored,
    /// `borrowBalanceCurrent(address)` on a market token, evaluated as a call.
    BorrowBalanceCurrent { borrower: Address },
}

/// A point-in-time read of one `uint256` quantity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadCall {
    pub contract: Address,
    pub method: ReadMethod,
}

impl ReadCall {
    pub fn balance_of(token: Address, holder: Address) -> Self {
        Self {
            contract: token,
            method: ReadMethod::BalanceOf { holder },
        }
    }

    pub fn exchange_rate_stored(market: Address) -> Self {
        Self {
            contract: market,
            method: ReadMethod::ExchangeRateStored,
        }
    }

    pub fn borrow_balance_current(market: Address, borrower: Address) -> Self {
        Self {
            contract: market,
            method: ReadMethod::BorrowBalanceCurrent { borrower },
        }
    }
}

/// `getOutstandingRewardsForUser(market, user)` on a reward distributor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RewardQuery {
    pub distributor: Address,
    pub market: Address,
    pub user: Address,
}

/// One reward tuple exactly as the ledger reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardInfo {
    pub emission_token: Address,
    pub total_amount: U256,
    pub supply_side: U256,
    pub borrow_side: U256,
}

/// A state-changing method that may only ever be simulated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulateMethod {
    /// `withdraw(uint256)` on the farm contract.
    Withdraw { amount: U256 },
}

/// Opaque caller identity presented to the ledger as `msg.sender`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallerIdentity(pub Address);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulateCall {
    pub contract: Address,
    pub method: SimulateMethod,
    pub caller: CallerIdentity,
    /// Reads evaluated against the speculative end state, after the call.
    pub speculative_reads: Vec<ReadCall>,
}

/// Raw outcome of a simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulateOutcome {
    /// The call succeeded. `speculative_reads` align with the request's reads.
    Success { speculative_reads: Vec<U256> },
    /// The call reverted; nothing after it was evaluated.
    Reverted { reason: String },
}

// ── Capability ──────────────────────────────────────────────────────

/// Read/simulate capability over the ledger.
///
/// Implementations must never mutate real ledger state, must map transport
/// failures to `EngineError::LedgerUnavailable` and must not retry. One engine
/// operation resolves a block once and evaluates every call at it.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// The block the next operation is evaluated at: the pinned block, or the
    /// current head.
    async fn resolve_block(&self) -> Result<BlockNumber>;

    async fn read_quantity(&self, call: &ReadCall, at: BlockNumber) -> Result<U256>;

    async fn read_rewards(&self, query: &RewardQuery, at: BlockNumber) -> Result<Vec<RewardInfo>>;

    /// Simulates on top of the state after block `at`.
    async fn simulate_call(&self, call: &SimulateCall, at: BlockNumber) -> Result<SimulateOutcome>;
}
