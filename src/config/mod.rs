//! Configuration Module - TOML-based Engine Configuration
//!
//! Loads and validates configuration from `config.toml`. Every field
//! has a default so a minimal (even empty) file is valid. Method
//! thresholds live here and are handed to the domain as an immutable
//! `EngineConfig`.

pub mod loader;

use serde::Deserialize;

use crate::domain::market::DEFAULT_MARKETS;
use crate::domain::params::{BayesParams, EngineConfig, MedianParams, SelectionParams};
use crate::usecases::optimizer::{ParameterGrid, SearchSettings};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// Identity and logging.
  pub bot: BotConfig,
  /// Pick selection thresholds.
  pub selection: SelectionParams,
  /// Bayesian matchup parameters.
  pub bayes: BayesParams,
  /// Median total test parameters.
  pub median: MedianParams,
  /// Grid search settings.
  pub optimizer: OptimizerConfig,
  /// Odds and statistics source.
  pub data: DataConfig,
  /// Pick storage.
  pub persistence: PersistenceConfig,
  /// Metrics and monitoring.
  pub metrics: MetricsConfig,
}

impl AppConfig {
  /// Method and selection parameters as one immutable value.
  pub fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      selection: self.selection,
      bayes: self.bayes,
      median: self.median,
    }
  }
}

/// Identity and logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
  pub name: String,
  /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
  pub log_level: String,
  /// "json" or "pretty".
  pub log_format: String,
}

impl Default for BotConfig {
  fn default() -> Self {
    Self {
      name: "totals-edge".to_string(),
      log_level: default_log_level(),
      log_format: "pretty".to_string(),
    }
  }
}

/// Grid search configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
  /// Run the grid search before `backtest`.
  pub enabled: bool,
  /// Events sampled per trial.
  pub sample_event_count: usize,
  pub random_seed: u64,
  /// Candidate values per axis.
  pub grid: ParameterGrid,
}

impl Default for OptimizerConfig {
  fn default() -> Self {
    let settings = SearchSettings::default();
    Self {
      enabled: true,
      sample_event_count: settings.sample_event_count,
      random_seed: settings.random_seed,
      grid: ParameterGrid::default(),
    }
  }
}

impl OptimizerConfig {
  pub fn settings(&self) -> SearchSettings {
    SearchSettings {
      sample_event_count: self.sample_event_count,
      random_seed: self.random_seed,
    }
  }
}

/// Where events, lines and team series come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
  Sqlite,
  Snapshot,
}

/// Data source configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
  pub source: DataSourceKind,
  /// Odds database (events, current_odds).
  pub odds_db_url: String,
  /// Esports statistics database (matches, map_statistics).
  pub stats_db_url: String,
  /// JSON snapshot used when `source = "snapshot"`.
  pub snapshot_path: String,
  /// Maximum samples per team series.
  pub series_limit: usize,
  pub stats_lookback_days: u32,
  pub max_recent_matches: u32,
  /// Markets evaluated per event.
  pub markets: Vec<String>,
}

impl Default for DataConfig {
  fn default() -> Self {
    Self {
      source: DataSourceKind::Sqlite,
      odds_db_url: "sqlite://data/odds.db".to_string(),
      stats_db_url: "sqlite://data/esports_stats.db".to_string(),
      snapshot_path: "data/snapshot.json".to_string(),
      series_limit: 50,
      stats_lookback_days: 60,
      max_recent_matches: 30,
      markets: DEFAULT_MARKETS.iter().map(|m| m.to_string()).collect(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  pub enabled: bool,
  /// Metrics server bind address.
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      bind_address: default_metrics_addr(),
    }
  }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
  /// Directory holding `picks/backtest_picks.jsonl`.
  pub data_dir: String,
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_data_dir() -> String {
  "data".to_string()
}
