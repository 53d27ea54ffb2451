pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod model;
pub mod report;

pub use engine::{Engine, PositionReport};
pub use error::EngineError;
