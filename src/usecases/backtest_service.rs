//! Backtest Service - End-to-End Backtest Orchestration
//!
//! Wires the ports to the synchronous engine:
//! 1. Prefetch the dataset through `OddsSource`
//! 2. Grid-search the method parameters (optional, on the blocking pool)
//! 3. Evaluate every event with all four methods
//! 4. Persist picks through `PickRepository` (insert-or-ignore)
//! 5. Record metrics and return the run report

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::market::Method;
use crate::domain::params::EngineConfig;
use crate::domain::skip::SkipReason;
use crate::ports::odds_source::OddsSource;
use crate::ports::pick_repository::{MethodSummary, PickRecord, PickRepository};

use super::backtest_runner::{BacktestRunner, Coverage};
use super::dataset::{Dataset, DatasetLoader};
use super::optimizer::{ParameterOptimizer, SearchOutcome};

/// Outcome of one `run_backtest` call.
#[derive(Debug, Clone)]
pub struct BacktestReport {
  pub run_id: Uuid,
  /// Configuration the events were evaluated with.
  pub config: EngineConfig,
  /// Present when the optimizer ran.
  pub search: Option<SearchOutcome>,
  pub coverage: Coverage,
  pub events: usize,
  pub picks_emitted: usize,
  /// Picks newly stored (re-runs insert nothing).
  pub picks_inserted: usize,
  pub cancelled: bool,
}

/// Backtest orchestrator over an odds source and a pick repository.
pub struct BacktestService<S: OddsSource, R: PickRepository> {
  source: Arc<S>,
  repository: Arc<R>,
  loader: DatasetLoader,
  base_config: EngineConfig,
  optimizer: Option<ParameterOptimizer>,
  metrics: Option<Arc<MetricsRegistry>>,
  cancel: Arc<AtomicBool>,
}

impl<S: OddsSource, R: PickRepository> BacktestService<S, R> {
  /// Create a service. `optimizer = None` evaluates with `base_config` as is.
  pub fn new(
    source: Arc<S>,
    repository: Arc<R>,
    loader: DatasetLoader,
    base_config: EngineConfig,
    optimizer: Option<ParameterOptimizer>,
  ) -> Self {
    Self {
      source,
      repository,
      loader,
      base_config,
      optimizer,
      metrics: None,
      cancel: Arc::new(AtomicBool::new(false)),
    }
  }

  /// Attach a metrics registry.
  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// Share a cancellation flag (set by the Ctrl-C handler).
  pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
    self.cancel = cancel;
    self
  }

  pub fn cancel_flag(&self) -> Arc<AtomicBool> {
    Arc::clone(&self.cancel)
  }

  fn observe(&self, phase: &str, started: Instant) {
    if let Some(m) = &self.metrics {
      m.observe_phase(phase, started.elapsed().as_secs_f64());
    }
  }

  /// Prefetch every event and series the run needs.
  pub async fn load_dataset(&self) -> Result<Arc<Dataset>> {
    let started = Instant::now();
    let dataset = match self.loader.load(self.source.as_ref(), &self.cancel).await {
      Ok(d) => d,
      Err(e) if e.is_fatal() => {
        error!(error = %e, "Data store unavailable, aborting run");
        return Err(e).context("Failed to load dataset");
      }
      Err(e) => return Err(e).context("Failed to load dataset"),
    };
    self.observe("load", started);
    Ok(Arc::new(dataset))
  }

  /// Grid search on the blocking pool. Without an optimizer the base
  /// configuration is returned unchanged.
  pub async fn optimize(&self, data: Arc<Dataset>) -> Result<Option<SearchOutcome>> {
    let Some(optimizer) = self.optimizer.clone() else {
      return Ok(None);
    };
    let started = Instant::now();
    let base = self.base_config;
    let cancel = Arc::clone(&self.cancel);

    let outcome =
      tokio::task::spawn_blocking(move || optimizer.optimize(base, &data, &cancel))
        .await
        .context("Grid search task failed")?;

    if let Some(m) = &self.metrics {
      m.record_search(outcome.trials as u64, outcome.score);
    }
    self.observe("optimize", started);
    Ok(Some(outcome))
  }

  /// Load, optionally optimize, evaluate and persist.
  #[instrument(skip(self), name = "backtest")]
  pub async fn run_backtest(&self) -> Result<BacktestReport> {
    let run_id = Uuid::new_v4();
    let data = self.load_dataset().await?;

    let search = self.optimize(Arc::clone(&data)).await?;
    let config = search.as_ref().map_or(self.base_config, |s| s.config);

    let started = Instant::now();
    let cancel = Arc::clone(&self.cancel);
    let (records, coverage, events) = tokio::task::spawn_blocking(move || {
      let runner = BacktestRunner::all_methods(config);
      let result = runner.run(&data, &cancel);
      let records: Vec<PickRecord> = result
        .picks
        .iter()
        .map(|p| {
          PickRecord::new(
            run_id,
            &p.event.event_id,
            &p.event.info,
            p.market,
            &p.line.selection,
            p.handicap(),
            &p.outcome,
          )
        })
        .collect();
      (records, result.coverage, result.events)
    })
    .await
    .context("Evaluation task failed")?;
    self.observe("evaluate", started);

    let picks_inserted = self
      .repository
      .save_picks(&records)
      .await
      .context("Failed to persist picks")?;

    if let Some(m) = &self.metrics {
      for method in Method::ALL {
        m.record_method(method, coverage.analyzed(method), coverage.selected(method));
      }
      for reason in SkipReason::ALL {
        m.record_skips(reason, coverage.skipped(reason));
      }
    }

    let cancelled = self.cancel.load(Ordering::Relaxed);
    if cancelled {
      warn!(events, "Backtest cancelled, results are partial");
    }
    info!(
      run_id = %run_id,
      events,
      emitted = records.len(),
      inserted = picks_inserted,
      "Backtest finished"
    );

    Ok(BacktestReport {
      run_id,
      config,
      search,
      coverage,
      events,
      picks_emitted: records.len(),
      picks_inserted,
      cancelled,
    })
  }

  /// Per-method summary of everything stored so far.
  pub async fn summary(&self) -> Result<Vec<MethodSummary>> {
    self.repository.summary_by_method().await
  }
}
