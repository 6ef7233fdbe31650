//! Snapshot Odds Source - Offline JSON Data
//!
//! Serves the `OddsSource` port from a single JSON document holding
//! events, their lines per market and team series per stat. Used for
//! offline backtests and as a deterministic fixture in tests.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::market::{BettingLine, EventId, EventInfo, StatType};
use crate::ports::odds_source::{DataStoreError, OddsSource};

/// One event with its lines, keyed by market name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEvent {
    pub event_id: EventId,
    pub info: EventInfo,
    #[serde(default)]
    pub markets: BTreeMap<String, Vec<BettingLine>>,
}

/// Complete offline dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub events: Vec<SnapshotEvent>,
    /// Team name → stat → most-recent-first map totals.
    #[serde(default)]
    pub series: BTreeMap<String, BTreeMap<StatType, Vec<f64>>>,
}

/// In-memory `OddsSource` over a [`Snapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotOddsSource {
    snapshot: Snapshot,
}

impl SnapshotOddsSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Read a snapshot document from disk.
    pub async fn load(path: &str) -> Result<Self> {
        let path = Path::new(path);
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;

        info!(
            events = snapshot.events.len(),
            teams = snapshot.series.len(),
            "Snapshot loaded"
        );
        Ok(Self::new(snapshot))
    }

    fn event(&self, event_id: &str) -> Option<&SnapshotEvent> {
        self.snapshot.events.iter().find(|e| e.event_id == event_id)
    }
}

#[async_trait]
impl OddsSource for SnapshotOddsSource {
    async fn list_events(&self) -> Result<Vec<EventId>, DataStoreError> {
        Ok(self
            .snapshot
            .events
            .iter()
            .filter(|e| e.markets.keys().any(|m| m.ends_with("Totals")))
            .map(|e| e.event_id.clone())
            .collect())
    }

    async fn event_info(&self, event_id: &str) -> Result<Option<EventInfo>, DataStoreError> {
        Ok(self.event(event_id).map(|e| e.info.clone()))
    }

    async fn betting_lines(
        &self,
        event_id: &str,
        market: &str,
    ) -> Result<Vec<BettingLine>, DataStoreError> {
        Ok(self
            .event(event_id)
            .and_then(|e| e.markets.get(market))
            .cloned()
            .unwrap_or_default())
    }

    async fn team_stat_series(
        &self,
        team: &str,
        stat: StatType,
        limit: usize,
    ) -> Result<Vec<f64>, DataStoreError> {
        Ok(self
            .snapshot
            .series
            .get(team)
            .and_then(|by_stat| by_stat.get(&stat))
            .map(|s| s.iter().copied().take(limit).collect())
            .unwrap_or_default())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "events": [
            {
                "event_id": "ev1",
                "info": {"home_team": "Alpha", "away_team": "Beta", "league_name": "LCK", "match_date": "2025-03-01"},
                "markets": {
                    "Map 1 - Totals": [
                        {"selection": "Over 4.5 Dragons", "handicap": 4.5, "odds": 1.95},
                        {"selection": "Under 4.5 Dragons", "handicap": "4.5", "odds": 1.80}
                    ]
                }
            },
            {
                "event_id": "ev2",
                "info": {"home_team": "Gamma", "away_team": "Delta", "league_name": "LEC", "match_date": "2025-03-02"}
            }
        ],
        "series": {"Alpha": {"dragons": [5, 4, 6, 3]}}
    }"#;

    fn source() -> SnapshotOddsSource {
        SnapshotOddsSource::new(serde_json::from_str(DOC).unwrap())
    }

    #[tokio::test]
    async fn test_lists_only_events_with_totals() {
        assert_eq!(source().list_events().await.unwrap(), vec!["ev1".to_string()]);
    }

    #[tokio::test]
    async fn test_lines_and_soft_misses() {
        let s = source();
        let lines = s.betting_lines("ev1", "Map 1 - Totals").await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].handicap, lines[1].handicap);
        assert!(s.betting_lines("ev1", "Map 2 - Totals").await.unwrap().is_empty());
        assert!(s.event_info("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_series_respects_limit() {
        let s = source();
        let series = s.team_stat_series("Alpha", StatType::Dragons, 2).await.unwrap();
        assert_eq!(series, vec![5.0, 4.0]);
        assert!(s
            .team_stat_series("Alpha", StatType::Barons, 50)
            .await
            .unwrap()
            .is_empty());
    }
}
