//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::{AppConfig, DataSourceKind};

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)
    .with_context(|| format!("Invalid configuration in {}", path.display()))?;

  info!(
    source = ?config.data.source,
    markets = config.data.markets.len(),
    optimizer = config.optimizer.enabled,
    grid_points = config.optimizer.grid.len(),
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate a TOML document.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).context("Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

fn in_unit_open(x: f64) -> bool {
  x > 0.0 && x < 1.0
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    matches!(config.bot.log_format.as_str(), "json" | "pretty"),
    "log_format must be \"json\" or \"pretty\", got {:?}",
    config.bot.log_format
  );

  let s = &config.selection;
  anyhow::ensure!(s.min_roi.is_finite(), "selection.min_roi must be finite");
  anyhow::ensure!(
    s.min_delta_roi_pp >= 0.0,
    "selection.min_delta_roi_pp must be non-negative, got {}",
    s.min_delta_roi_pp
  );

  let b = &config.bayes;
  anyhow::ensure!(
    in_unit_open(b.prior_weight_floor) && in_unit_open(b.prior_weight_cap),
    "bayes prior weight floor/cap must be in (0, 1), got {}/{}",
    b.prior_weight_floor,
    b.prior_weight_cap
  );
  anyhow::ensure!(
    b.prior_weight_floor <= b.prior_weight_cap,
    "bayes.prior_weight_floor ({}) must not exceed prior_weight_cap ({})",
    b.prior_weight_floor,
    b.prior_weight_cap
  );
  anyhow::ensure!(
    b.prior_a0 > 0.0 && b.prior_b0 > 0.0,
    "bayes pseudo-counts must be positive, got a0={} b0={}",
    b.prior_a0,
    b.prior_b0
  );

  let m = &config.median;
  anyhow::ensure!(
    in_unit_open(m.pvalue_max),
    "median.pvalue_max must be in (0, 1), got {}",
    m.pvalue_max
  );
  anyhow::ensure!(m.min_abs_z >= 0.0, "median.min_abs_z must be non-negative");
  anyhow::ensure!(
    (0.0..1.0).contains(&m.min_edge),
    "median.min_edge must be in [0, 1), got {}",
    m.min_edge
  );
  anyhow::ensure!(
    (0.0..1.0).contains(&m.min_posterior_gain),
    "median.min_posterior_gain must be in [0, 1), got {}",
    m.min_posterior_gain
  );
  anyhow::ensure!(m.max_cv15 > 0.0, "median.max_cv15 must be positive");

  let o = &config.optimizer;
  anyhow::ensure!(
    o.sample_event_count > 0,
    "optimizer.sample_event_count must be positive"
  );
  anyhow::ensure!(!o.grid.is_empty(), "optimizer.grid has an empty axis");
  anyhow::ensure!(
    o.grid
      .prior_weight_floor
      .iter()
      .chain(&o.grid.prior_weight_cap)
      .chain(&o.grid.pvalue_max)
      .all(|&x| in_unit_open(x)),
    "optimizer.grid prior weights and p-values must be in (0, 1)"
  );
  anyhow::ensure!(
    o.grid.beta_prior.iter().all(|&(a, b)| a > 0.0 && b > 0.0),
    "optimizer.grid.beta_prior pseudo-counts must be positive"
  );

  let d = &config.data;
  anyhow::ensure!(!d.markets.is_empty(), "At least one market must be configured");
  anyhow::ensure!(d.series_limit >= 15, "data.series_limit must be at least 15");
  match d.source {
    DataSourceKind::Sqlite => {
      anyhow::ensure!(
        !d.odds_db_url.is_empty() && !d.stats_db_url.is_empty(),
        "SQLite source needs odds_db_url and stats_db_url"
      );
    }
    DataSourceKind::Snapshot => {
      anyhow::ensure!(!d.snapshot_path.is_empty(), "Snapshot source needs snapshot_path");
    }
  }

  anyhow::ensure!(
    !config.persistence.data_dir.is_empty(),
    "persistence.data_dir must not be empty"
  );
  if config.metrics.enabled {
    anyhow::ensure!(
      !config.metrics.bind_address.is_empty(),
      "metrics.bind_address must not be empty"
    );
  }

  Ok(())
}
