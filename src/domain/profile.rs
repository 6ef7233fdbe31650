//! Per-team diagnostics for one (stat, side, handicap) combination.

use serde::{Deserialize, Serialize};

use super::market::Side;
use super::normality::{Normality, check_normality};
use super::stats;

/// Minimum history required before a team can be scored.
pub const MIN_SAMPLES: usize = 15;
/// Weight of the last-10 window in blended hit rates and effective counts.
pub const RECENT_WEIGHT: f64 = 0.6;
/// Weight of the last-15 window.
pub const EXTENDED_WEIGHT: f64 = 0.4;

/// Historical profile of one team against one side of a line.
///
/// Built from a most-recent-first series; only the first 15 samples
/// are used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamProfile {
    pub side: Side,
    pub handicap: f64,
    /// Most recent 10 samples
    pub last10: Vec<f64>,
    /// Most recent 15 samples
    pub last15: Vec<f64>,
    pub mean10: f64,
    pub median10: f64,
    pub std10: f64,
    /// Coefficient of variation of the last-10 window, percent
    pub cv10: f64,
    pub mean15: f64,
    pub hits10: usize,
    pub hits15: usize,
    pub hit_rate10: f64,
    pub hit_rate15: f64,
    /// Recent-vs-older mean change, percent
    pub trend_pct: f64,
    pub normality: Normality,
}

impl TeamProfile {
    /// Returns `None` when the series is shorter than [`MIN_SAMPLES`].
    pub fn build(series: &[f64], side: Side, handicap: f64) -> Option<Self> {
        if series.len() < MIN_SAMPLES {
            return None;
        }
        let last10 = series[..10].to_vec();
        let last15 = series[..MIN_SAMPLES].to_vec();

        let hits10 = stats::hit_count(&last10, handicap, side);
        let hits15 = stats::hit_count(&last15, handicap, side);

        Some(Self {
            side,
            handicap,
            mean10: stats::mean(&last10),
            median10: stats::median(&last10),
            std10: stats::std_dev(&last10),
            cv10: stats::cv_percent(&last10),
            mean15: stats::mean(&last15),
            hits10,
            hits15,
            hit_rate10: hits10 as f64 / 10.0,
            hit_rate15: hits15 as f64 / MIN_SAMPLES as f64,
            trend_pct: stats::trend_percent(&last15),
            normality: check_normality(&last10),
            last10,
            last15,
        })
    }

    /// Recency-blended hit rate `0.6*hit10 + 0.4*hit15`.
    pub fn blended_hit_rate(&self) -> f64 {
        RECENT_WEIGHT * self.hit_rate10 + EXTENDED_WEIGHT * self.hit_rate15
    }
}

/// Diagnostics persisted alongside a pick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickDiagnostics {
    pub hit_rate10: f64,
    pub hit_rate15: f64,
    pub mean10: f64,
    pub median10: f64,
    pub std10: f64,
    pub cv10: f64,
    pub trend_pct: f64,
    pub is_normal: bool,
}

impl From<&TeamProfile> for PickDiagnostics {
    fn from(p: &TeamProfile) -> Self {
        Self {
            hit_rate10: p.hit_rate10,
            hit_rate15: p.hit_rate15,
            mean10: p.mean10,
            median10: p.median10,
            std10: p.std10,
            cv10: p.cv10,
            trend_pct: p.trend_pct,
            is_normal: p.normality.is_normal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> Vec<f64> {
        let mut s = vec![28.0, 30.0, 26.0, 24.0, 29.0, 31.0, 27.0, 25.0, 33.0, 22.0];
        s.extend([20.0, 21.0, 26.0, 19.0, 24.0, 40.0, 41.0]);
        s
    }

    #[test]
    fn test_short_series_is_unscorable() {
        assert!(TeamProfile::build(&[25.0; 14], Side::Over, 25.5).is_none());
    }

    #[test]
    fn test_profile_uses_first_fifteen_samples() {
        let p = TeamProfile::build(&series(), Side::Over, 25.5).unwrap();
        assert_eq!(p.last15.len(), 15);
        assert_eq!(p.hits10, 7);
        // Older block adds only 26.
        assert_eq!(p.hits15, 8);
        assert!((p.hit_rate10 - 0.7).abs() < 1e-12);
        assert!((p.blended_hit_rate() - (0.6 * 0.7 + 0.4 * 8.0 / 15.0)).abs() < 1e-12);
        assert!((p.mean10 - 27.5).abs() < 1e-12);
        assert!(p.trend_pct > 0.0);
    }

    #[test]
    fn test_under_profile_counts_strictly_below() {
        let p = TeamProfile::build(&series(), Side::Under, 25.5).unwrap();
        assert_eq!(p.hits10, 3);
        assert_eq!(p.hits15, 7);
    }

    #[test]
    fn test_diagnostics_copy_profile_fields() {
        let p = TeamProfile::build(&series(), Side::Over, 25.5).unwrap();
        let d = PickDiagnostics::from(&p);
        assert_eq!(d.cv10, p.cv10);
        assert_eq!(d.is_normal, p.normality.is_normal());
    }
}
