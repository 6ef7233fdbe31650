//! Tunable engine hyperparameters.
//!
//! An `EngineConfig` is an immutable value: the optimizer builds a fresh
//! one per trial and returns the winner instead of mutating shared state.

use serde::{Deserialize, Serialize};

/// Selection policy thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionParams {
    /// Minimum ROI (percent) a side needs to become a candidate.
    pub min_roi: f64,
    /// Keep both sides when both are candidates.
    pub allow_both_sides: bool,
    /// ROI margin (percentage points) over needs over under to win.
    pub min_delta_roi_pp: f64,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            min_roi: 10.0,
            allow_both_sides: false,
            min_delta_roi_pp: 0.0,
        }
    }
}

/// Bayesian matchup parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayesParams {
    pub prior_weight_floor: f64,
    pub prior_weight_cap: f64,
    /// Beta prior pseudo-successes.
    pub prior_a0: f64,
    /// Beta prior pseudo-failures.
    pub prior_b0: f64,
}

impl Default for BayesParams {
    fn default() -> Self {
        Self {
            prior_weight_floor: 0.55,
            prior_weight_cap: 0.75,
            prior_a0: 5.0,
            prior_b0: 5.0,
        }
    }
}

/// Median total test gate and weighting parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedianParams {
    /// Largest two-sided p-value that still passes the gate.
    pub pvalue_max: f64,
    pub min_abs_z: f64,
    /// Minimum |likelihood - 0.5|.
    pub min_edge: f64,
    /// Minimum posterior - prior for a candidate.
    pub min_posterior_gain: f64,
    /// Per-team CV(15) ceiling, percent.
    pub max_cv15: f64,
}

impl Default for MedianParams {
    fn default() -> Self {
        Self {
            pvalue_max: 0.20,
            min_abs_z: 1.0,
            min_edge: 0.06,
            min_posterior_gain: 0.03,
            max_cv15: 60.0,
        }
    }
}

/// Complete hyperparameter vector for one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub selection: SelectionParams,
    pub bayes: BayesParams,
    pub median: MedianParams,
}

impl EngineConfig {
    /// Copy with replaced method parameters; selection is left untouched.
    pub fn with_method_params(self, bayes: BayesParams, median: MedianParams) -> Self {
        Self {
            bayes,
            median,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.selection.min_roi, 10.0);
        assert!(!c.selection.allow_both_sides);
        assert_eq!(c.bayes.prior_weight_floor, 0.55);
        assert_eq!(c.bayes.prior_a0, 5.0);
        assert_eq!(c.median.max_cv15, 60.0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let c: EngineConfig = toml::from_str("[median]\nmin_abs_z = 1.2\n").unwrap();
        assert_eq!(c.median.min_abs_z, 1.2);
        assert_eq!(c.median.pvalue_max, 0.20);
        assert_eq!(c.bayes, BayesParams::default());
    }
}
