//! Parameter Optimizer - Grid Search over Method Hyperparameters
//!
//! Scores every point of the Bayesian × Median parameter grid on a
//! seeded sample of events and returns the best configuration as a
//! new immutable value. Trials are independent and run on rayon;
//! cancellation is checked between trials.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::domain::market::Method;
use crate::domain::params::{BayesParams, EngineConfig, MedianParams};

use super::backtest_runner::{BacktestRunner, RunResult};
use super::dataset::{Dataset, EventData};

/// Methods whose picks are scored during the search.
pub const TUNED_METHODS: [Method; 2] = [Method::BayesianMatchup, Method::MedianTotalTest];

/// Per-pick volume bonus that keeps zero-pick configurations from winning.
pub const VOLUME_BONUS: f64 = 0.001;

/// Candidate values per hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterGrid {
  pub prior_weight_floor: Vec<f64>,
  pub prior_weight_cap: Vec<f64>,
  /// (a0, b0) pairs.
  pub beta_prior: Vec<(f64, f64)>,
  pub pvalue_max: Vec<f64>,
  pub min_abs_z: Vec<f64>,
  pub min_edge: Vec<f64>,
  pub min_posterior_gain: Vec<f64>,
  pub max_cv15: Vec<f64>,
}

impl Default for ParameterGrid {
  fn default() -> Self {
    Self {
      prior_weight_floor: vec![0.50, 0.55, 0.60],
      prior_weight_cap: vec![0.70, 0.75, 0.80],
      beta_prior: vec![(4.0, 4.0), (5.0, 5.0), (6.0, 6.0)],
      pvalue_max: vec![0.10, 0.15, 0.20, 0.25],
      min_abs_z: vec![0.8, 1.0, 1.2],
      min_edge: vec![0.04, 0.06, 0.08],
      min_posterior_gain: vec![0.02, 0.03, 0.05],
      max_cv15: vec![50.0, 60.0, 70.0],
    }
  }
}

impl ParameterGrid {
  fn radices(&self) -> [usize; 8] {
    [
      self.prior_weight_floor.len(),
      self.prior_weight_cap.len(),
      self.beta_prior.len(),
      self.pvalue_max.len(),
      self.min_abs_z.len(),
      self.min_edge.len(),
      self.min_posterior_gain.len(),
      self.max_cv15.len(),
    ]
  }

  /// Number of grid points (cartesian product size).
  pub fn len(&self) -> usize {
    self.radices().iter().product()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Decodes a flat index into one grid point; the first axis varies
  /// slowest, matching nested-loop order.
  pub fn point(&self, index: usize) -> Option<(BayesParams, MedianParams)> {
    if index >= self.len() {
      return None;
    }
    let radices = self.radices();
    let mut digits = [0usize; 8];
    let mut rest = index;
    for (digit, radix) in digits.iter_mut().zip(radices).rev() {
      *digit = rest % radix;
      rest /= radix;
    }
    let [floor, cap, beta, p, z, edge, gain, cv] = digits;
    let (a0, b0) = self.beta_prior[beta];

    Some((
      BayesParams {
        prior_weight_floor: self.prior_weight_floor[floor],
        prior_weight_cap: self.prior_weight_cap[cap],
        prior_a0: a0,
        prior_b0: b0,
      },
      MedianParams {
        pvalue_max: self.pvalue_max[p],
        min_abs_z: self.min_abs_z[z],
        min_edge: self.min_edge[edge],
        min_posterior_gain: self.min_posterior_gain[gain],
        max_cv15: self.max_cv15[cv],
      },
    ))
  }
}

/// Sampling settings for the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
  pub sample_event_count: usize,
  pub random_seed: u64,
}

impl Default for SearchSettings {
  fn default() -> Self {
    Self {
      sample_event_count: 120,
      random_seed: 42,
    }
  }
}

/// Result of a grid search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
  /// Configuration to use from now on (the input when nothing improved).
  pub config: EngineConfig,
  pub score: f64,
  /// Score of the input configuration.
  pub baseline_score: f64,
  /// Grid points actually scored.
  pub trials: usize,
  pub sample_events: usize,
  pub improved: bool,
  pub cancelled: bool,
}

/// Expected profit of a run in stake units plus the volume bonus:
/// `Σ EV%/100 + 0.001 × picks`.
pub fn score_run(result: &RunResult<'_>) -> f64 {
  let ev: f64 = result
    .picks
    .iter()
    .map(|p| p.outcome.estimate.ev_pct / 100.0)
    .sum();
  ev + VOLUME_BONUS * result.picks.len() as f64
}

/// Grid-search optimizer over [`ParameterGrid`].
#[derive(Debug, Clone, Default)]
pub struct ParameterOptimizer {
  grid: ParameterGrid,
  settings: SearchSettings,
}

impl ParameterOptimizer {
  pub fn new(grid: ParameterGrid, settings: SearchSettings) -> Self {
    Self { grid, settings }
  }

  pub fn grid(&self) -> &ParameterGrid {
    &self.grid
  }

  /// Seeded shuffle of the dataset's events, truncated to the sample size.
  pub fn sample_events<'a>(&self, data: &'a Dataset) -> Vec<&'a EventData> {
    let mut events: Vec<&EventData> = data.events.iter().collect();
    let mut rng = StdRng::seed_from_u64(self.settings.random_seed);
    events.shuffle(&mut rng);
    events.truncate(self.settings.sample_event_count);
    events
  }

  /// Score one configuration on a fixed event sample.
  pub fn score(config: EngineConfig, data: &Dataset, events: &[&EventData]) -> f64 {
    let runner = BacktestRunner::new(config, &TUNED_METHODS);
    let never = AtomicBool::new(false);
    score_run(&runner.run_events(data, events, &never))
  }

  /// Searches the grid around `base` (selection settings are kept).
  ///
  /// The base configuration is scored first; a grid point replaces it
  /// only with a strictly higher score. Ties keep the earliest point.
  #[instrument(skip_all, name = "grid_search", fields(points = self.grid.len()))]
  pub fn optimize(&self, base: EngineConfig, data: &Dataset, cancel: &AtomicBool) -> SearchOutcome {
    let events = self.sample_events(data);
    let baseline_score = Self::score(base, data, &events);
    info!(
      sample = events.len(),
      points = self.grid.len(),
      baseline = baseline_score,
      "Starting grid search"
    );

    let trials = AtomicUsize::new(0);
    let best = (0..self.grid.len())
      .into_par_iter()
      .filter_map(|index| {
        if cancel.load(Ordering::Relaxed) {
          return None;
        }
        let (bayes, median) = self.grid.point(index)?;
        let config = base.with_method_params(bayes, median);
        let score = Self::score(config, data, &events);
        trials.fetch_add(1, Ordering::Relaxed);
        Some((index, score, config))
      })
      .reduce_with(|a, b| {
        if b.1 > a.1 || (b.1 == a.1 && b.0 < a.0) {
          b
        } else {
          a
        }
      });

    let trials = trials.into_inner();
    let cancelled = cancel.load(Ordering::Relaxed);

    let outcome = match best {
      Some((index, score, config)) if score > baseline_score => {
        info!(
          index,
          score,
          baseline = baseline_score,
          floor = config.bayes.prior_weight_floor,
          cap = config.bayes.prior_weight_cap,
          a0 = config.bayes.prior_a0,
          b0 = config.bayes.prior_b0,
          pvalue_max = config.median.pvalue_max,
          min_abs_z = config.median.min_abs_z,
          min_edge = config.median.min_edge,
          min_gain = config.median.min_posterior_gain,
          max_cv15 = config.median.max_cv15,
          "Best configuration found"
        );
        SearchOutcome {
          config,
          score,
          baseline_score,
          trials,
          sample_events: events.len(),
          improved: true,
          cancelled,
        }
      }
      _ => {
        warn!(
          baseline = baseline_score,
          best = best.map(|b| b.1),
          trials,
          "No configuration beat the defaults, keeping them"
        );
        SearchOutcome {
          config: base,
          score: baseline_score,
          baseline_score,
          trials,
          sample_events: events.len(),
          improved: false,
          cancelled,
        }
      }
    };

    if cancelled {
      warn!(trials, "Grid search cancelled");
    }
    outcome
  }
}
