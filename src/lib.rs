//! Deferred-acceptance matching engine for two-sided markets.
//!
//! Computes a stable, applicant-optimal assignment between two equally-sized
//! populations. Preferences come from a continuous linear utility model over
//! each agent's observable characteristics, weighted by per-agent marginal
//! rates of substitution, with an optional reviewer-side perception-bias
//! mode run as a parallel shadow matching.

pub mod config;
pub mod core;
pub mod data;
pub mod models;

// Re-export commonly used types
pub use crate::config::Settings;
pub use crate::core::{materialize, DeferredAcceptance, EngineError, MatchOutcome};
pub use crate::models::{Agent, Market, MatchRecord, RoundRecord};
