//! Dataset - Immutable Prefetched Backtest Input
//!
//! Pulls every event, its paired lines and the team series those lines
//! need through the `OddsSource` port exactly once. Evaluation and
//! grid-search trials then run synchronously over this value and
//! never touch the data store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, instrument};

use crate::domain::market::{EventId, EventInfo, LinePair, StatType, pair_lines};
use crate::ports::odds_source::{DataStoreError, OddsSource};

/// One market of an event, lines already paired by handicap.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketData {
  pub market: String,
  /// Complete over/under pairs, ascending handicap.
  pub pairs: Vec<LinePair>,
  /// Handicaps quoted on one side only.
  pub unpaired: usize,
}

/// An event with its metadata and markets.
#[derive(Debug, Clone, PartialEq)]
pub struct EventData {
  pub event_id: EventId,
  pub info: EventInfo,
  pub markets: Vec<MarketData>,
}

/// Everything a backtest needs, fetched up front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
  pub events: Vec<EventData>,
  /// (team, stat) → most-recent-first series.
  pub series: HashMap<(String, StatType), Vec<f64>>,
  /// Events listed by the source but without metadata.
  pub missing_events: u64,
}

impl Dataset {
  /// Series for a team, empty when never fetched or unknown.
  pub fn series(&self, team: &str, stat: StatType) -> &[f64] {
    self
      .series
      .get(&(team.to_string(), stat))
      .map(Vec::as_slice)
      .unwrap_or_default()
  }
}

/// Stat a pair is written on: market name first, then the over selection.
pub fn pair_stat(market: &str, pair: &LinePair) -> Option<StatType> {
  StatType::from_market_or_selection(market, &pair.over.selection)
}

/// Prefetch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLoader {
  /// Markets evaluated per event.
  pub markets: Vec<String>,
  /// Maximum samples fetched per team series.
  pub series_limit: usize,
}

impl DatasetLoader {
  pub fn new(markets: Vec<String>, series_limit: usize) -> Self {
    Self {
      markets,
      series_limit,
    }
  }

  /// Load all events listed by the source.
  ///
  /// Stops early (returning what was loaded so far) when `cancel` is set.
  #[instrument(skip(self, source, cancel), name = "dataset_load")]
  pub async fn load<S: OddsSource + ?Sized>(
    &self,
    source: &S,
    cancel: &AtomicBool,
  ) -> Result<Dataset, DataStoreError> {
    let event_ids = source.list_events().await?;
    info!(events = event_ids.len(), "Loading dataset");

    let mut dataset = Dataset::default();
    for event_id in event_ids {
      if cancel.load(Ordering::Relaxed) {
        info!(loaded = dataset.events.len(), "Dataset load cancelled");
        break;
      }

      let Some(info) = source.event_info(&event_id).await? else {
        debug!(event_id = %event_id, "Event metadata missing, skipped");
        dataset.missing_events += 1;
        continue;
      };

      let mut markets = Vec::with_capacity(self.markets.len());
      for market in &self.markets {
        let lines = source.betting_lines(&event_id, market).await?;
        let (pairs, unpaired) = pair_lines(&lines);

        for pair in &pairs {
          let Some(stat) = pair_stat(market, pair) else {
            continue;
          };
          for team in [&info.home_team, &info.away_team] {
            let key = (team.clone(), stat);
            if !dataset.series.contains_key(&key) {
              let series = source
                .team_stat_series(team, stat, self.series_limit)
                .await?;
              dataset.series.insert(key, series);
            }
          }
        }

        markets.push(MarketData {
          market: market.clone(),
          pairs,
          unpaired,
        });
      }

      dataset.events.push(EventData {
        event_id,
        info,
        markets,
      });
    }

    info!(
      events = dataset.events.len(),
      series = dataset.series.len(),
      missing = dataset.missing_events,
      "Dataset loaded"
    );
    Ok(dataset)
  }
}
