// Model exports
pub mod domain;
pub mod records;

pub use domain::{Agent, ColumnSchema, Market, MarketError, Side};
pub use records::{AllocationFields, BiasFields, MatchRecord, RoundRecord, RunSummary};
