//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `OddsSource`: Read-only events, lines and team statistics
//! - `PickRepository`: Pick persistence (insert-or-ignore) and summaries

pub mod odds_source;
pub mod pick_repository;

pub use odds_source::{DataStoreError, OddsSource};
pub use pick_repository::{MethodSummary, PickKey, PickRecord, PickRepository};
