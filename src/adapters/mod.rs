//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (SQLite, files, HTTP).
//!
//! Adapter categories:
//! - `sqlite`: Odds and esports statistics databases via sqlx
//! - `snapshot`: Offline JSON dataset
//! - `persistence`: JSONL pick store
//! - `metrics`: Prometheus metrics export

pub mod metrics;
pub mod persistence;
pub mod snapshot;
pub mod sqlite;
