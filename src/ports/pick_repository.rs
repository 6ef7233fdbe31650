//! Pick Repository Port - Pick Persistence Interface
//!
//! Defines the record persisted for every emitted pick and the trait
//! storage adapters implement. Inserts are insert-or-ignore keyed by
//! (event, method, market, selection, handicap), so re-running a
//! backtest over the same data is an idempotent no-op.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::estimator::SideOutcome;
use crate::domain::market::{EventInfo, Method};
use crate::domain::profile::PickDiagnostics;

/// Unique identity of a stored pick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PickKey {
  pub event_id: String,
  pub method: Method,
  pub market: String,
  pub selection: String,
  /// Normalized so 25.5 and 25.50 collide.
  pub handicap: Decimal,
}

/// A persisted pick: an estimate bound to an event, market and side.
///
/// Probabilities are stored as fractions in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickRecord {
  /// Backtest run that produced this pick.
  pub run_id: Uuid,
  pub created_at: DateTime<Utc>,
  pub event_id: String,
  pub method: Method,
  pub league_name: String,
  pub match_date: String,
  pub home_team: String,
  pub away_team: String,
  pub market: String,
  /// Selection label as quoted, e.g. "Over 25.5 Kills".
  pub selection: String,
  pub handicap: Decimal,
  /// Bookmaker decimal odds.
  pub house_odds: f64,
  pub posterior: f64,
  pub prior: f64,
  pub likelihood: f64,
  pub fair_odds: f64,
  pub roi_pct: f64,
  pub ev_pct: f64,
  pub prior_weight: f64,
  /// Diagnostics of the representative team for this side.
  #[serde(flatten)]
  pub diagnostics: PickDiagnostics,
}

impl PickRecord {
  /// Binds an emitted side to its event context.
  pub fn new(
    run_id: Uuid,
    event_id: &str,
    info: &EventInfo,
    market: &str,
    selection: &str,
    handicap: Decimal,
    outcome: &SideOutcome,
  ) -> Self {
    let e = &outcome.estimate;
    Self {
      run_id,
      created_at: Utc::now(),
      event_id: event_id.to_string(),
      method: e.method,
      league_name: info.league_name.clone(),
      match_date: info.match_date.clone(),
      home_team: info.home_team.clone(),
      away_team: info.away_team.clone(),
      market: market.to_string(),
      selection: selection.to_string(),
      handicap,
      house_odds: e.odds,
      posterior: e.probabilities.posterior,
      prior: e.probabilities.prior,
      likelihood: e.probabilities.likelihood,
      fair_odds: e.fair_odds,
      roi_pct: e.roi_pct,
      ev_pct: e.ev_pct,
      prior_weight: e.prior_weight,
      diagnostics: outcome.diagnostics,
    }
  }

  pub fn key(&self) -> PickKey {
    PickKey {
      event_id: self.event_id.clone(),
      method: self.method,
      market: self.market.clone(),
      selection: self.selection.clone(),
      handicap: self.handicap.normalize(),
    }
  }
}

/// Aggregate statistics for one method's stored picks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSummary {
  pub method: Method,
  pub count: usize,
  pub avg_roi_pct: f64,
  pub avg_ev_pct: f64,
  pub avg_odds: f64,
  pub avg_fair_odds: f64,
  pub avg_prior_weight: f64,
  /// Fraction of picks whose representative sample tested normal.
  pub normal_fraction: f64,
  pub min_roi_pct: f64,
  pub max_roi_pct: f64,
}

impl MethodSummary {
  /// Groups records by method, ordered by method.
  pub fn from_records<'a>(records: impl IntoIterator<Item = &'a PickRecord>) -> Vec<Self> {
    let mut groups: BTreeMap<Method, Vec<&PickRecord>> = BTreeMap::new();
    for r in records {
      groups.entry(r.method).or_default().push(r);
    }

    groups
      .into_iter()
      .map(|(method, picks)| {
        let n = picks.len() as f64;
        let avg = |f: fn(&PickRecord) -> f64| picks.iter().map(|p| f(p)).sum::<f64>() / n;
        Self {
          method,
          count: picks.len(),
          avg_roi_pct: avg(|p| p.roi_pct),
          avg_ev_pct: avg(|p| p.ev_pct),
          avg_odds: avg(|p| p.house_odds),
          avg_fair_odds: avg(|p| p.fair_odds),
          avg_prior_weight: avg(|p| p.prior_weight),
          normal_fraction: avg(|p| if p.diagnostics.is_normal { 1.0 } else { 0.0 }),
          min_roi_pct: picks.iter().map(|p| p.roi_pct).fold(f64::INFINITY, f64::min),
          max_roi_pct: picks.iter().map(|p| p.roi_pct).fold(f64::NEG_INFINITY, f64::max),
        }
      })
      .collect()
  }
}

/// Trait for pick persistence providers.
#[async_trait]
pub trait PickRepository: Send + Sync + 'static {
  /// Insert-or-ignore; returns how many records were actually inserted.
  async fn save_picks(&self, picks: &[PickRecord]) -> anyhow::Result<usize>;

  /// Load every stored pick.
  async fn load_picks(&self) -> anyhow::Result<Vec<PickRecord>>;

  /// Per-method aggregate of everything stored so far.
  async fn summary_by_method(&self) -> anyhow::Result<Vec<MethodSummary>>;

  /// Check if the repository is healthy (disk space, permissions).
  async fn is_healthy(&self) -> bool;
}
