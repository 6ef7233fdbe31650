//! Domain layer - Core estimation logic and models.
//!
//! Pure functions and immutable values only: no I/O, no async.
//! Everything here is deterministic and testable in isolation.

pub mod estimator;
pub mod market;
pub mod normality;
pub mod params;
pub mod probability;
pub mod profile;
pub mod selection;
pub mod skip;
pub mod stats;

// Re-export core types for convenience
pub use estimator::{EstimationMethod, Gate, GateFailure, Matchup, MethodOutcome, SideOutcome, estimator_for};
pub use market::{BettingLine, EventId, EventInfo, LinePair, Method, Side, StatType};
pub use normality::Normality;
pub use params::{BayesParams, EngineConfig, MedianParams, SelectionParams};
pub use probability::{Estimate, MarketPrior, ProbabilityTriple};
pub use profile::{PickDiagnostics, TeamProfile};
pub use selection::SelectionPolicy;
pub use skip::SkipReason;
