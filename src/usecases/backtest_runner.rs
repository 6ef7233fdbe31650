//! Backtest Runner - Event × Market × Handicap Evaluation
//!
//! For every paired handicap of every event:
//! 1. Resolves the stat the line is written on
//! 2. Builds the four team/side profiles (skips the pair if any is short)
//! 3. Runs each enabled estimation method
//! 4. Applies the selection policy per method independently
//! 5. Accumulates picks and per-method coverage counters
//!
//! Events are independent; `run` evaluates them on rayon and merges
//! the per-event results.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use crate::domain::estimator::{Matchup, SideOutcome, estimator_for};
use crate::domain::market::{BettingLine, Method, Side};
use crate::domain::params::EngineConfig;
use crate::domain::selection::SelectionPolicy;
use crate::domain::skip::SkipReason;

use super::dataset::{Dataset, EventData, pair_stat};

/// An emitted pick, borrowing its context from the dataset.
#[derive(Debug, Clone, Copy)]
pub struct Pick<'a> {
  pub event: &'a EventData,
  pub market: &'a str,
  pub line: &'a BettingLine,
  pub outcome: SideOutcome,
}

impl Pick<'_> {
  pub fn method(&self) -> Method {
    self.outcome.estimate.method
  }

  pub fn handicap(&self) -> Decimal {
    self.line.handicap
  }
}

/// Analyzed/selected counters per method plus skip counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
  /// Over/under sides analyzed (+2 per pair touched).
  pub analyzed: BTreeMap<Method, u64>,
  /// Picks emitted.
  pub selected: BTreeMap<Method, u64>,
  pub skipped: BTreeMap<SkipReason, u64>,
}

impl Coverage {
  pub fn analyzed(&self, method: Method) -> u64 {
    self.analyzed.get(&method).copied().unwrap_or(0)
  }

  pub fn selected(&self, method: Method) -> u64 {
    self.selected.get(&method).copied().unwrap_or(0)
  }

  pub fn skipped(&self, reason: SkipReason) -> u64 {
    self.skipped.get(&reason).copied().unwrap_or(0)
  }

  fn skip(&mut self, reason: SkipReason, count: u64) {
    if count > 0 {
      *self.skipped.entry(reason).or_default() += count;
    }
  }

  pub fn merge(mut self, other: Self) -> Self {
    for (m, n) in other.analyzed {
      *self.analyzed.entry(m).or_default() += n;
    }
    for (m, n) in other.selected {
      *self.selected.entry(m).or_default() += n;
    }
    for (r, n) in other.skipped {
      *self.skipped.entry(r).or_default() += n;
    }
    self
  }
}

/// Picks and coverage of a (partial) run.
#[derive(Debug, Clone, Default)]
pub struct RunResult<'a> {
  pub picks: Vec<Pick<'a>>,
  pub coverage: Coverage,
  /// Events actually evaluated.
  pub events: usize,
}

impl RunResult<'_> {
  fn merge(mut self, other: Self) -> Self {
    self.picks.extend(other.picks);
    self.coverage = self.coverage.merge(other.coverage);
    self.events += other.events;
    self
  }
}

/// Runs the estimation pipeline over prefetched events.
#[derive(Debug, Clone)]
pub struct BacktestRunner {
  config: EngineConfig,
  policy: SelectionPolicy,
  methods: Vec<Method>,
}

impl BacktestRunner {
  /// Runner evaluating the given methods under one immutable config.
  pub fn new(config: EngineConfig, methods: &[Method]) -> Self {
    Self {
      config,
      policy: SelectionPolicy::new(config.selection),
      methods: methods.to_vec(),
    }
  }

  /// Runner evaluating all four methods.
  pub fn all_methods(config: EngineConfig) -> Self {
    Self::new(config, &Method::ALL)
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Evaluates one event.
  pub fn evaluate_event<'a>(&self, data: &Dataset, event: &'a EventData) -> RunResult<'a> {
    let mut result = RunResult {
      events: 1,
      ..RunResult::default()
    };

    for market in &event.markets {
      result
        .coverage
        .skip(SkipReason::UnpairedLine, market.unpaired as u64);

      for pair in &market.pairs {
        let Some(stat) = pair_stat(&market.market, pair) else {
          debug!(event_id = %event.event_id, selection = %pair.over.selection, "Unknown stat, pair skipped");
          result.coverage.skip(SkipReason::UnknownStat, 1);
          continue;
        };

        let matchup = match Matchup::new(
          stat,
          pair.handicap_f64(),
          pair.over.odds,
          pair.under.odds,
          data.series(&event.info.home_team, stat),
          data.series(&event.info.away_team, stat),
        ) {
          Ok(m) => m,
          Err(reason) => {
            debug!(
              event_id = %event.event_id,
              market = %market.market,
              handicap = %pair.handicap,
              %reason,
              "Pair skipped"
            );
            result.coverage.skip(reason, 1);
            continue;
          }
        };

        for &method in &self.methods {
          let outcome = estimator_for(method).estimate(&matchup, &self.config);
          *result.coverage.analyzed.entry(method).or_default() += 2;

          for side in self.policy.select(&outcome) {
            let line = match side.estimate.side {
              Side::Over => &pair.over,
              Side::Under => &pair.under,
            };
            *result.coverage.selected.entry(method).or_default() += 1;
            result.picks.push(Pick {
              event,
              market: &market.market,
              line,
              outcome: side,
            });
          }
        }
      }
    }
    result
  }

  /// Evaluates `events` in parallel. Events not yet started when
  /// `cancel` is set are left out.
  pub fn run_events<'a>(
    &self,
    data: &Dataset,
    events: &[&'a EventData],
    cancel: &AtomicBool,
  ) -> RunResult<'a> {
    events
      .par_iter()
      .filter(|_| !cancel.load(Ordering::Relaxed))
      .map(|&event| self.evaluate_event(data, event))
      .reduce(RunResult::default, RunResult::merge)
  }

  /// Evaluates every event in the dataset.
  #[instrument(skip_all, name = "backtest_run", fields(events = data.events.len()))]
  pub fn run<'a>(&self, data: &'a Dataset, cancel: &AtomicBool) -> RunResult<'a> {
    let events: Vec<&EventData> = data.events.iter().collect();
    let mut result = self.run_events(data, &events, cancel);
    result.coverage.skip(SkipReason::MissingEvent, data.missing_events);

    info!(
      evaluated = result.events,
      picks = result.picks.len(),
      "Backtest run complete"
    );
    result
  }
}
