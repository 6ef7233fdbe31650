//! Core betting domain types.
//!
//! Lines, sides, stat types and the estimation method tags shared by
//! the estimator, the selection policy and the persistence boundary.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Totals markets evaluated by the backtest, one per map.
pub const DEFAULT_MARKETS: [&str; 2] = ["Map 1 - Totals", "Map 2 - Totals"];

/// Lightweight event identifier used at the ports boundary.
pub type EventId = String;

/// Over or under side of a totals line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Over,
    Under,
}

impl Side {
    /// Infers the side from a selection label ("Over 25.5 Kills").
    ///
    /// Anything that does not mention "over" is treated as an under quote.
    pub fn from_selection(selection: &str) -> Self {
        if selection.to_lowercase().contains("over") {
            Self::Over
        } else {
            Self::Under
        }
    }

    /// Whether an observed value lands on this side of the threshold.
    pub fn hits(self, value: f64, handicap: f64) -> bool {
        match self {
            Self::Over => value > handicap,
            Self::Under => value < handicap,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Over => write!(f, "over"),
            Self::Under => write!(f, "under"),
        }
    }
}

/// In-game statistic a totals line is written on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatType {
    Kills,
    Dragons,
    Towers,
    Inhibitors,
    Barons,
}

impl StatType {
    /// Resolves the stat type from free text by substring match.
    pub fn from_label(label: &str) -> Option<Self> {
        let s = label.to_lowercase();
        if s.contains("dragon") {
            Some(Self::Dragons)
        } else if s.contains("baron") {
            Some(Self::Barons)
        } else if s.contains("kill") {
            Some(Self::Kills)
        } else if s.contains("tower") {
            Some(Self::Towers)
        } else if s.contains("inhibitor") {
            Some(Self::Inhibitors)
        } else {
            None
        }
    }

    /// Market name first, selection label as fallback.
    pub fn from_market_or_selection(market: &str, selection: &str) -> Option<Self> {
        Self::from_label(market).or_else(|| Self::from_label(selection))
    }

    /// Column value used by the statistics store.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kills => "kills",
            Self::Dragons => "dragons",
            Self::Towers => "towers",
            Self::Inhibitors => "inhibitors",
            Self::Barons => "barons",
        }
    }
}

impl std::fmt::Display for StatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estimation method tag, persisted with every pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Raw implied prior, per-team same-side hit rates.
    RawTeamAverage,
    /// Vig-free prior, own side crossed with the opponent's complement.
    CrossAverage,
    /// Beta-Binomial shrinkage with an adaptive prior weight.
    BayesianMatchup,
    /// Weighted-median normal approximation of the summed statistic.
    MedianTotalTest,
}

impl Method {
    pub const ALL: [Self; 4] = [
        Self::RawTeamAverage,
        Self::CrossAverage,
        Self::BayesianMatchup,
        Self::MedianTotalTest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RawTeamAverage => "raw_team_average",
            Self::CrossAverage => "cross_average",
            Self::BayesianMatchup => "bayesian_matchup",
            Self::MedianTotalTest => "median_total_test",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event metadata supplied by the data-acquisition collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    pub home_team: String,
    pub away_team: String,
    pub league_name: String,
    pub match_date: String,
}

/// Immutable bookmaker quote for one (market, selection, handicap).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BettingLine {
    /// Selection label, e.g. "Over 25.5 Kills".
    pub selection: String,
    /// Threshold the total is compared against.
    pub handicap: Decimal,
    /// Decimal odds (> 1 for a sane quote).
    pub odds: f64,
}

impl BettingLine {
    pub fn side(&self) -> Side {
        Side::from_selection(&self.selection)
    }

    pub fn handicap_f64(&self) -> f64 {
        self.handicap.to_f64().unwrap_or(0.0)
    }
}

/// Over and under quotes sharing a handicap.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePair {
    pub handicap: Decimal,
    pub over: BettingLine,
    pub under: BettingLine,
}

impl LinePair {
    pub fn handicap_f64(&self) -> f64 {
        self.handicap.to_f64().unwrap_or(0.0)
    }
}

/// Groups a market's lines by handicap and keeps only complete pairs.
///
/// Returns the pairs (ascending handicap) and the number of unpaired
/// handicaps that were dropped. A later quote for the same side and
/// handicap replaces an earlier one.
pub fn pair_lines(lines: &[BettingLine]) -> (Vec<LinePair>, usize) {
    let mut by_handicap: BTreeMap<Decimal, (Option<&BettingLine>, Option<&BettingLine>)> =
        BTreeMap::new();

    for line in lines {
        let slot = by_handicap.entry(line.handicap.normalize()).or_default();
        match line.side() {
            Side::Over => slot.0 = Some(line),
            Side::Under => slot.1 = Some(line),
        }
    }

    let mut unpaired = 0;
    let mut pairs = Vec::with_capacity(by_handicap.len());
    for (handicap, sides) in by_handicap {
        match sides {
            (Some(over), Some(under)) => pairs.push(LinePair {
                handicap,
                over: over.clone(),
                under: under.clone(),
            }),
            _ => unpaired += 1,
        }
    }
    (pairs, unpaired)
}
