//! Shared probability primitives.
//!
//! Every estimation method reduces to the same pipeline:
//! market prior → data likelihood → blended posterior → fair odds,
//! ROI and EV against the offered price. Only the likelihood and the
//! prior weight differ per method.

use serde::{Deserialize, Serialize};

use super::market::{Method, Side};

/// Lower/upper clip for any probability fed into the blend.
pub const PROB_EPS: f64 = 1e-6;
/// Posterior floor; forbids absurd fair prices.
pub const POSTERIOR_MIN: f64 = 0.02;
/// Posterior cap.
pub const POSTERIOR_MAX: f64 = 0.98;

/// Implied probability `clip(1/odds, 1e-6, 1-1e-6)`.
///
/// Non-positive odds are floored before inversion instead of failing.
pub fn implied_probability(odds: f64) -> f64 {
    let odds = if odds.is_finite() { odds.max(1e-12) } else { 1e-12 };
    (1.0 / odds).clamp(PROB_EPS, 1.0 - PROB_EPS)
}

/// Normalizes an over/under pair to sum to one, preserving the ratio.
pub fn remove_vig(p_over: f64, p_under: f64) -> (f64, f64) {
    let total = p_over + p_under;
    if total <= 0.0 {
        return (p_over, p_under);
    }
    (
        (p_over / total).clamp(PROB_EPS, 1.0 - PROB_EPS),
        (p_under / total).clamp(PROB_EPS, 1.0 - PROB_EPS),
    )
}

/// Convex blend `w*prior + (1-w)*likelihood`, clipped to [0.02, 0.98].
pub fn blend_posterior(prior: f64, likelihood: f64, prior_weight: f64) -> f64 {
    let prior = prior.clamp(PROB_EPS, 1.0 - PROB_EPS);
    let likelihood = likelihood.clamp(PROB_EPS, 1.0 - PROB_EPS);
    let p = prior_weight * prior + (1.0 - prior_weight) * likelihood;
    p.clamp(POSTERIOR_MIN, POSTERIOR_MAX)
}

/// Break-even decimal price for a probability.
pub fn fair_odds(posterior: f64) -> f64 {
    1.0 / posterior.clamp(PROB_EPS, 1.0 - PROB_EPS)
}

/// Return on a unit stake, percent: `(odds/fair - 1) * 100`.
pub fn roi_percent(odds: f64, fair: f64) -> f64 {
    (odds / fair - 1.0) * 100.0
}

/// Expected value of a unit stake, percent: `(p*odds - 1) * 100`.
pub fn ev_percent(posterior: f64, odds: f64) -> f64 {
    (posterior.clamp(PROB_EPS, 1.0 - PROB_EPS) * odds - 1.0) * 100.0
}

/// Market-implied priors for one over/under pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketPrior {
    pub raw_over: f64,
    pub raw_under: f64,
    pub clean_over: f64,
    pub clean_under: f64,
}

impl MarketPrior {
    pub fn from_odds(over_odds: f64, under_odds: f64) -> Self {
        let raw_over = implied_probability(over_odds);
        let raw_under = implied_probability(under_odds);
        let (clean_over, clean_under) = remove_vig(raw_over, raw_under);
        Self {
            raw_over,
            raw_under,
            clean_over,
            clean_under,
        }
    }

    pub fn raw(&self, side: Side) -> f64 {
        match side {
            Side::Over => self.raw_over,
            Side::Under => self.raw_under,
        }
    }

    pub fn clean(&self, side: Side) -> f64 {
        match side {
            Side::Over => self.clean_over,
            Side::Under => self.clean_under,
        }
    }
}

/// Prior, likelihood and posterior for one side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityTriple {
    pub prior: f64,
    pub likelihood: f64,
    pub posterior: f64,
}

impl ProbabilityTriple {
    /// Informational edge of the posterior over the market prior.
    pub fn gain(&self) -> f64 {
        self.posterior - self.prior
    }
}

/// Value judgement for one side of a line under one method.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub method: Method,
    pub side: Side,
    pub odds: f64,
    pub probabilities: ProbabilityTriple,
    pub prior_weight: f64,
    pub fair_odds: f64,
    pub roi_pct: f64,
    pub ev_pct: f64,
}

impl Estimate {
    /// Standard pipeline: blend, then price the blended posterior.
    pub fn blended(
        method: Method,
        side: Side,
        odds: f64,
        prior: f64,
        likelihood: f64,
        prior_weight: f64,
    ) -> Self {
        let posterior = blend_posterior(prior, likelihood, prior_weight);
        let fair = fair_odds(posterior);
        Self {
            method,
            side,
            odds,
            probabilities: ProbabilityTriple {
                prior,
                likelihood,
                posterior,
            },
            prior_weight,
            fair_odds: fair,
            roi_pct: roi_percent(odds, fair),
            ev_pct: ev_percent(posterior, odds),
        }
    }

    /// Averages per-team estimates in price space: the fair odds are the
    /// mean of the team fair odds, ROI is priced off that mean, EV and the
    /// reported probabilities are plain means.
    pub fn averaged_in_price_space(parts: &[Self]) -> Option<Self> {
        let first = *parts.first()?;
        let n = parts.len() as f64;
        let avg = |f: fn(&Self) -> f64| parts.iter().map(f).sum::<f64>() / n;

        let fair = avg(|e| e.fair_odds);
        let posterior = avg(|e| e.probabilities.posterior);
        Some(Self {
            probabilities: ProbabilityTriple {
                prior: avg(|e| e.probabilities.prior),
                likelihood: avg(|e| e.probabilities.likelihood),
                posterior,
            },
            prior_weight: avg(|e| e.prior_weight),
            fair_odds: fair,
            roi_pct: roi_percent(first.odds, fair),
            ev_pct: ev_percent(posterior, first.odds),
            ..first
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implied_probability_floors_degenerate_odds() {
        assert!((implied_probability(2.0) - 0.5).abs() < 1e-12);
        assert_eq!(implied_probability(0.0), 1.0 - PROB_EPS);
        assert_eq!(implied_probability(-3.0), 1.0 - PROB_EPS);
        assert_eq!(implied_probability(f64::NAN), 1.0 - PROB_EPS);
    }

    #[test]
    fn test_remove_vig_preserves_ratio() {
        let (o, u) = remove_vig(0.55, 0.50);
        assert!((o + u - 1.0).abs() < 1e-12);
        assert!((o / u - 0.55 / 0.50).abs() < 1e-12);
    }

    #[test]
    fn test_posterior_is_clamped() {
        assert_eq!(blend_posterior(0.999, 0.999, 0.5), POSTERIOR_MAX);
        assert_eq!(blend_posterior(0.001, 0.0, 0.5), POSTERIOR_MIN);
    }

    #[test]
    fn test_reference_scenario_roi() {
        // Over 25.5 kills at 1.90 with a 0.7 likelihood.
        let prior = implied_probability(1.90);
        let e = Estimate::blended(Method::RawTeamAverage, Side::Over, 1.90, prior, 0.7, 0.5);
        assert!((prior - 0.526_315_8).abs() < 1e-6);
        assert!((e.probabilities.posterior - 0.613_157_9).abs() < 1e-6);
        assert!((e.fair_odds - 1.630_901).abs() < 1e-5);
        assert!((e.roi_pct - 16.5).abs() < 0.01, "roi = {}", e.roi_pct);
        let again = Estimate::blended(Method::RawTeamAverage, Side::Over, 1.90, prior, 0.7, 0.5);
        assert_eq!(e, again);
    }

    #[test]
    fn test_roi_reconstructs_from_fair_odds() {
        let e = Estimate::blended(Method::CrossAverage, Side::Under, 2.05, 0.47, 0.61, 0.5);
        assert!((roi_percent(e.odds, e.fair_odds) - e.roi_pct).abs() < 1e-9);
        assert!((e.fair_odds - 1.0 / e.probabilities.posterior).abs() < 1e-12);
    }

    #[test]
    fn test_price_space_average() {
        let a = Estimate::blended(Method::RawTeamAverage, Side::Over, 1.9, 0.52, 0.7, 0.5);
        let b = Estimate::blended(Method::RawTeamAverage, Side::Over, 1.9, 0.52, 0.5, 0.5);
        let avg = Estimate::averaged_in_price_space(&[a, b]).unwrap();
        assert!((avg.fair_odds - (a.fair_odds + b.fair_odds) / 2.0).abs() < 1e-12);
        assert!((roi_percent(avg.odds, avg.fair_odds) - avg.roi_pct).abs() < 1e-12);
        assert!(Estimate::averaged_in_price_space(&[]).is_none());
    }
}
