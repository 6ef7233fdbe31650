//! Selection policy: which sides of an over/under pair become picks.

use super::estimator::{MethodOutcome, SideOutcome};
use super::market::Side;
use super::params::SelectionParams;

/// Tolerance applied to the over side when both sides compete.
const ROI_TIE_EPS: f64 = 1e-9;

/// Gates, mutually excludes and edge-checks the sides of one method's
/// outcome on one pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionPolicy {
    params: SelectionParams,
}

impl SelectionPolicy {
    pub fn new(params: SelectionParams) -> Self {
        Self { params }
    }

    /// ROI above threshold, gate open, and the required posterior gain met.
    pub fn is_candidate(&self, side: &SideOutcome) -> bool {
        side.estimate.roi_pct > self.params.min_roi
            && side.gate.is_open()
            && side
                .min_posterior_gain
                .is_none_or(|gain| side.estimate.probabilities.gain() >= gain)
    }

    /// Sides to emit, over first.
    ///
    /// When both sides qualify and only one may be kept, over wins iff
    /// `roi_over + 1e-9 >= roi_under + min_delta_roi_pp`. A surviving side
    /// is emitted only if its posterior strictly exceeds its prior.
    pub fn select(&self, outcome: &MethodOutcome) -> Vec<SideOutcome> {
        let mut keep_over = self.is_candidate(&outcome.over);
        let mut keep_under = self.is_candidate(&outcome.under);

        if keep_over && keep_under && !self.params.allow_both_sides {
            let over_wins = outcome.over.estimate.roi_pct + ROI_TIE_EPS
                >= outcome.under.estimate.roi_pct + self.params.min_delta_roi_pp;
            keep_over = over_wins;
            keep_under = !over_wins;
        }

        [(Side::Over, keep_over), (Side::Under, keep_under)]
            .into_iter()
            .filter(|&(_, keep)| keep)
            .map(|(side, _)| *outcome.side(side))
            .filter(|s| s.estimate.probabilities.posterior > s.estimate.probabilities.prior)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::estimator::{Gate, GateFailure};
    use crate::domain::market::Method;
    use crate::domain::probability::{Estimate, ProbabilityTriple};
    use crate::domain::profile::PickDiagnostics;

    fn side(side: Side, roi: f64, prior: f64, posterior: f64) -> SideOutcome {
        SideOutcome {
            estimate: Estimate {
                method: Method::CrossAverage,
                side,
                odds: 2.0,
                probabilities: ProbabilityTriple {
                    prior,
                    likelihood: posterior,
                    posterior,
                },
                prior_weight: 0.5,
                fair_odds: 1.0 / posterior,
                roi_pct: roi,
                ev_pct: roi,
            },
            diagnostics: PickDiagnostics {
                hit_rate10: 0.5,
                hit_rate15: 0.5,
                mean10: 0.0,
                median10: 0.0,
                std10: 0.0,
                cv10: 0.0,
                trend_pct: 0.0,
                is_normal: false,
            },
            gate: Gate::Ungated,
            min_posterior_gain: None,
        }
    }

    fn pair(roi_over: f64, roi_under: f64) -> MethodOutcome {
        MethodOutcome {
            over: side(Side::Over, roi_over, 0.5, 0.6),
            under: side(Side::Under, roi_under, 0.5, 0.6),
        }
    }

    fn sides(picks: &[SideOutcome]) -> Vec<Side> {
        picks.iter().map(|p| p.estimate.side).collect()
    }

    #[test]
    fn test_only_over_above_threshold() {
        let policy = SelectionPolicy::new(SelectionParams::default());
        assert_eq!(sides(&policy.select(&pair(12.0, 9.0))), vec![Side::Over]);
    }

    #[test]
    fn test_mutual_exclusion_keeps_higher_roi() {
        let policy = SelectionPolicy::new(SelectionParams::default());
        assert_eq!(sides(&policy.select(&pair(12.0, 14.0))), vec![Side::Under]);
        assert_eq!(sides(&policy.select(&pair(14.0, 12.0))), vec![Side::Over]);
        // Exact tie goes to over.
        assert_eq!(sides(&policy.select(&pair(12.0, 12.0))), vec![Side::Over]);
    }

    #[test]
    fn test_delta_requirement_applies_to_over() {
        let policy = SelectionPolicy::new(SelectionParams {
            min_delta_roi_pp: 5.0,
            ..SelectionParams::default()
        });
        assert_eq!(sides(&policy.select(&pair(15.0, 12.0))), vec![Side::Under]);
        assert_eq!(sides(&policy.select(&pair(18.0, 12.0))), vec![Side::Over]);
    }

    #[test]
    fn test_allow_both_sides() {
        let policy = SelectionPolicy::new(SelectionParams {
            allow_both_sides: true,
            ..SelectionParams::default()
        });
        assert_eq!(
            sides(&policy.select(&pair(12.0, 14.0))),
            vec![Side::Over, Side::Under]
        );
    }

    #[test]
    fn test_no_edge_no_pick() {
        let policy = SelectionPolicy::new(SelectionParams::default());
        let outcome = MethodOutcome {
            over: side(Side::Over, 20.0, 0.6, 0.6),
            under: side(Side::Under, 0.0, 0.4, 0.4),
        };
        assert!(policy.select(&outcome).is_empty());
    }

    #[test]
    fn test_gate_and_gain_requirements() {
        let policy = SelectionPolicy::new(SelectionParams::default());
        let mut rejected = side(Side::Over, 20.0, 0.5, 0.6);
        rejected.gate = Gate::Rejected(GateFailure::Significance);
        assert!(!policy.is_candidate(&rejected));

        let mut thin = side(Side::Over, 20.0, 0.5, 0.52);
        thin.gate = Gate::Passed;
        thin.min_posterior_gain = Some(0.03);
        assert!(!policy.is_candidate(&thin));
        thin.min_posterior_gain = Some(0.02);
        assert!(policy.is_candidate(&thin));
    }
}
