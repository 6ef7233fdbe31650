//! Odds Source Port - Read-only Data Acquisition Interface
//!
//! Defines the trait for reading events, bookmaker lines and team
//! historical statistics from the data-acquisition collaborator.
//! Adapters: SQLite databases, JSON snapshots.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::market::{BettingLine, EventId, EventInfo, StatType};

/// Failure talking to the underlying data store.
///
/// Only `Unavailable` is considered fatal for a run; the service
/// propagates every variant to the caller with context.
#[derive(Debug, Error)]
pub enum DataStoreError {
  /// Connection could not be established or was lost.
  #[error("data store unavailable: {0}")]
  Unavailable(String),
  /// A query failed after the connection was established.
  #[error("query failed ({context}): {source}")]
  Query {
    context: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
  /// Stored data could not be decoded into domain values.
  #[error("malformed data: {0}")]
  Decode(String),
}

impl DataStoreError {
  pub fn query(
    context: impl Into<String>,
    source: impl std::error::Error + Send + Sync + 'static,
  ) -> Self {
    Self::Query {
      context: context.into(),
      source: Box::new(source),
    }
  }

  /// Whether the run must stop.
  pub fn is_fatal(&self) -> bool {
    matches!(self, Self::Unavailable(_))
  }
}

/// Trait for read-only odds and statistics providers.
///
/// Soft failures (unknown event, unknown team) are represented as
/// empty values, never as errors.
#[async_trait]
pub trait OddsSource: Send + Sync + 'static {
  /// Events that carry at least one totals market.
  async fn list_events(&self) -> Result<Vec<EventId>, DataStoreError>;

  /// Event metadata; `None` when the event is unknown.
  async fn event_info(&self, event_id: &str) -> Result<Option<EventInfo>, DataStoreError>;

  /// All lines quoted for one market of an event.
  async fn betting_lines(
    &self,
    event_id: &str,
    market: &str,
  ) -> Result<Vec<BettingLine>, DataStoreError>;

  /// Most-recent-first per-map totals for a team; may be shorter than
  /// `limit`, or empty for an unknown team.
  async fn team_stat_series(
    &self,
    team: &str,
    stat: StatType,
    limit: usize,
  ) -> Result<Vec<f64>, DataStoreError>;

  /// Check if the underlying store is reachable.
  async fn is_healthy(&self) -> bool;
}
