use thiserror::Error;

/// Errors produced by the valuation and simulation engine.
///
/// Arithmetic and validation variants are contract violations and are never
/// coerced. `LedgerUnavailable` carries the transport message untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("precision loss: scaling {raw} from {from} to {to} decimals drops a non-zero remainder")]
    PrecisionLoss { raw: String, from: u8, to: u8 },

    #[error("scale mismatch: {left} decimals vs {right} decimals")]
    ScaleMismatch { left: u8, right: u8 },

    #[error("negative amount where non-negative required: {context} = {raw}")]
    NegativeAmount { context: String, raw: String },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("cannot parse `{input}` as a decimal amount: {reason}")]
    Parse { input: String, reason: String },

    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("malformed ledger response: {0}")]
    MalformedResponse(String),

    #[error("simulation reverted: {0}")]
    RevertedSimulation(String),

    #[error("cancelled before completion")]
    Cancelled,
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
