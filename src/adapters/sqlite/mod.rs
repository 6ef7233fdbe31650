//! SQLite Odds Source - Odds and Esports Statistics Databases
//!
//! Implements the `OddsSource` port over two SQLite databases:
//! - odds database: `current_odds`, `events`, `teams`
//! - statistics database: `teams`, `matches`, `game_maps`, `map_statistics`
//!
//! Both are opened read-only through sqlx connection pools.

use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, instrument};

use crate::domain::market::{BettingLine, EventId, EventInfo, StatType};
use crate::ports::odds_source::{DataStoreError, OddsSource};

/// Finished-match status code in the statistics database.
const FINISHED_STATUS: i64 = 3;

/// Which recent matches feed a team series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesWindow {
    /// Only matches newer than this many days count.
    pub lookback_days: u32,
    /// At most this many matches (each contributes one value per map).
    pub max_recent_matches: u32,
}

impl Default for SeriesWindow {
    fn default() -> Self {
        Self {
            lookback_days: 60,
            max_recent_matches: 30,
        }
    }
}

/// Odds type column value for a market name ("Map 2 - Totals" → "map_2").
pub fn odds_type_for_market(market: &str) -> String {
    market
        .strip_prefix("Map ")
        .and_then(|rest| rest.split_whitespace().next())
        .filter(|n| n.chars().all(|c| c.is_ascii_digit()))
        .map_or_else(|| "main".to_string(), |n| format!("map_{n}"))
}

/// Connectivity failures are fatal; anything else is a query failure.
fn classify(context: &str, e: sqlx::Error) -> DataStoreError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Configuration(_)
        | sqlx::Error::Tls(_) => DataStoreError::Unavailable(format!("{context}: {e}")),
        other => DataStoreError::query(context, other),
    }
}

/// `OddsSource` backed by the odds and statistics SQLite databases.
pub struct SqliteOddsSource {
    odds: SqlitePool,
    stats: SqlitePool,
    window: SeriesWindow,
}

impl SqliteOddsSource {
    /// Open both databases read-only.
    pub async fn connect(
        odds_url: &str,
        stats_url: &str,
        window: SeriesWindow,
    ) -> Result<Self, DataStoreError> {
        let odds = open_pool(odds_url).await?;
        let stats = open_pool(stats_url).await?;
        info!(odds = odds_url, stats = stats_url, "SQLite odds source connected");
        Ok(Self::from_pools(odds, stats, window))
    }

    /// Wrap existing pools.
    pub fn from_pools(odds: SqlitePool, stats: SqlitePool, window: SeriesWindow) -> Self {
        Self {
            odds,
            stats,
            window,
        }
    }

    async fn team_id(&self, team: &str) -> Result<Option<i64>, DataStoreError> {
        sqlx::query("SELECT team_id FROM teams WHERE name = ?")
            .bind(team)
            .fetch_optional(&self.stats)
            .await
            .map_err(|e| classify("team lookup", e))?
            .map(|row| row.try_get::<i64, _>("team_id"))
            .transpose()
            .map_err(|e| DataStoreError::Decode(format!("team_id: {e}")))
    }
}

async fn open_pool(url: &str) -> Result<SqlitePool, DataStoreError> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| DataStoreError::Unavailable(format!("{url}: {e}")))?
        .read_only(true);

    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .map_err(|e| DataStoreError::Unavailable(format!("{url}: {e}")))
}

#[async_trait]
impl OddsSource for SqliteOddsSource {
    #[instrument(skip(self))]
    async fn list_events(&self) -> Result<Vec<EventId>, DataStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT CAST(event_id AS TEXT) AS event_id
            FROM current_odds
            WHERE market_name LIKE '%Totals' AND odds_type IN ('map_1', 'map_2')
            "#,
        )
        .fetch_all(&self.odds)
        .await
        .map_err(|e| classify("list events", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("event_id")
                    .map_err(|e| DataStoreError::Decode(format!("event_id: {e}")))
            })
            .collect()
    }

    async fn event_info(&self, event_id: &str) -> Result<Option<EventInfo>, DataStoreError> {
        let row = sqlx::query(
            r#"
            SELECT e.home_team_id, e.away_team_id, e.league_name, e.match_date,
                   ht.name AS home_name, at.name AS away_name
            FROM events e
            LEFT JOIN teams ht ON ht.team_id = e.home_team_id
            LEFT JOIN teams at ON at.team_id = e.away_team_id
            WHERE e.event_id = ?
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.odds)
        .await
        .map_err(|e| classify("event info", e))?;

        let Some(row) = row else {
            debug!(event_id, "Unknown event");
            return Ok(None);
        };

        let decode = |e: sqlx::Error| DataStoreError::Decode(format!("event {event_id}: {e}"));
        let team_name = |name: Option<String>, id: Option<i64>| {
            name.unwrap_or_else(|| format!("Team {}", id.unwrap_or_default()))
        };

        Ok(Some(EventInfo {
            home_team: team_name(
                row.try_get("home_name").map_err(decode)?,
                row.try_get("home_team_id").map_err(decode)?,
            ),
            away_team: team_name(
                row.try_get("away_name").map_err(decode)?,
                row.try_get("away_team_id").map_err(decode)?,
            ),
            league_name: row
                .try_get::<Option<String>, _>("league_name")
                .map_err(decode)?
                .unwrap_or_default(),
            match_date: row
                .try_get::<Option<String>, _>("match_date")
                .map_err(decode)?
                .unwrap_or_default(),
        }))
    }

    async fn betting_lines(
        &self,
        event_id: &str,
        market: &str,
    ) -> Result<Vec<BettingLine>, DataStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT selection_name,
                   CAST(handicap AS REAL) AS handicap,
                   CAST(odds_value AS REAL) AS odds_value
            FROM current_odds
            WHERE event_id = ? AND market_name = ? AND odds_type = ?
            ORDER BY selection_name, handicap
            "#,
        )
        .bind(event_id)
        .bind(market)
        .bind(odds_type_for_market(market))
        .fetch_all(&self.odds)
        .await
        .map_err(|e| classify("betting lines", e))?;

        rows.iter()
            .map(|row| {
                let decode = |e: sqlx::Error| DataStoreError::Decode(format!("line: {e}"));
                let handicap: f64 = row.try_get("handicap").map_err(decode)?;
                Ok(BettingLine {
                    selection: row.try_get("selection_name").map_err(decode)?,
                    handicap: Decimal::from_f64(handicap)
                        .map(|d| d.round_dp(4).normalize())
                        .ok_or_else(|| DataStoreError::Decode(format!("handicap {handicap}")))?,
                    odds: row.try_get("odds_value").map_err(decode)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn team_stat_series(
        &self,
        team: &str,
        stat: StatType,
        limit: usize,
    ) -> Result<Vec<f64>, DataStoreError> {
        let Some(team_id) = self.team_id(team).await? else {
            debug!(team, "Unknown team, empty series");
            return Ok(Vec::new());
        };

        let rows = sqlx::query(
            r#"
            SELECT CAST(COALESCE(ms.home_value, 0) AS REAL)
                 + CAST(COALESCE(ms.away_value, 0) AS REAL) AS total
            FROM map_statistics ms
            JOIN game_maps gm ON gm.map_id = ms.map_id
            WHERE ms.stat_name = ?
              AND gm.match_id IN (
                SELECT m.match_id
                FROM matches m
                WHERE (m.home_team_id = ? OR m.away_team_id = ?)
                  AND m.time_status = ?
                  AND m.event_time >= datetime('now', ?)
                ORDER BY m.event_time DESC
                LIMIT ?
              )
            ORDER BY ms.map_id DESC
            "#,
        )
        .bind(stat.as_str())
        .bind(team_id)
        .bind(team_id)
        .bind(FINISHED_STATUS)
        .bind(format!("-{} days", self.window.lookback_days))
        .bind(i64::from(self.window.max_recent_matches))
        .fetch_all(&self.stats)
        .await
        .map_err(|e| classify("team series", e))?;

        let mut series = Vec::with_capacity(limit.min(rows.len()));
        for row in &rows {
            if series.len() >= limit {
                break;
            }
            let total: f64 = row
                .try_get("total")
                .map_err(|e| DataStoreError::Decode(format!("map total: {e}")))?;
            // A zero inhibitor total means the stat was not recorded.
            if stat == StatType::Inhibitors && total == 0.0 {
                continue;
            }
            series.push(total);
        }
        Ok(series)
    }

    async fn is_healthy(&self) -> bool {
        let odds = sqlx::query("SELECT 1").execute(&self.odds).await.is_ok();
        let stats = sqlx::query("SELECT 1").execute(&self.stats).await.is_ok();
        odds && stats
    }
}
