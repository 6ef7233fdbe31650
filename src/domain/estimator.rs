//! Four estimation strategies over one shared numeric core.
//!
//! Each strategy supplies only its likelihood and prior-weight
//! derivation; blending, pricing and diagnostics come from
//! [`super::probability`] and [`super::profile`].

use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

use super::market::{Method, Side, StatType};
use super::params::{BayesParams, EngineConfig, MedianParams};
use super::probability::{Estimate, MarketPrior};
use super::profile::{EXTENDED_WEIGHT, MIN_SAMPLES, PickDiagnostics, RECENT_WEIGHT, TeamProfile};
use super::skip::SkipReason;
use super::stats;

/// Prior weight used by the two fixed-weight methods.
pub const FIXED_PRIOR_WEIGHT: f64 = 0.5;

/// Everything the estimators need for one over/under pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Matchup {
    pub stat: StatType,
    pub handicap: f64,
    pub over_odds: f64,
    pub under_odds: f64,
    pub prior: MarketPrior,
    pub home_over: TeamProfile,
    pub home_under: TeamProfile,
    pub away_over: TeamProfile,
    pub away_under: TeamProfile,
}

impl Matchup {
    /// Builds the four team/side profiles.
    ///
    /// Fails with [`SkipReason::InsufficientHistory`] when either series
    /// is shorter than 15 samples; the whole pair is then skipped for
    /// every method.
    pub fn new(
        stat: StatType,
        handicap: f64,
        over_odds: f64,
        under_odds: f64,
        home_series: &[f64],
        away_series: &[f64],
    ) -> Result<Self, SkipReason> {
        let profile = |series: &[f64], side| {
            TeamProfile::build(series, side, handicap).ok_or(SkipReason::InsufficientHistory)
        };
        Ok(Self {
            stat,
            handicap,
            over_odds,
            under_odds,
            prior: MarketPrior::from_odds(over_odds, under_odds),
            home_over: profile(home_series, Side::Over)?,
            home_under: profile(home_series, Side::Under)?,
            away_over: profile(away_series, Side::Over)?,
            away_under: profile(away_series, Side::Under)?,
        })
    }

    pub fn odds(&self, side: Side) -> f64 {
        match side {
            Side::Over => self.over_odds,
            Side::Under => self.under_odds,
        }
    }
}

/// Why the median gate rejected a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateFailure {
    /// A team's CV(15) exceeded the volatility ceiling.
    Volatility,
    /// p-value, |z| or edge threshold not met.
    Significance,
}

/// Statistical precondition attached to a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gate {
    /// Method has no gate.
    Ungated,
    Passed,
    Rejected(GateFailure),
}

impl Gate {
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// One side's estimate plus what the selection policy needs to judge it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideOutcome {
    pub estimate: Estimate,
    pub diagnostics: PickDiagnostics,
    pub gate: Gate,
    /// Minimum posterior - prior, for methods that demand one.
    pub min_posterior_gain: Option<f64>,
}

/// Over and under outcomes of one method on one pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodOutcome {
    pub over: SideOutcome,
    pub under: SideOutcome,
}

impl MethodOutcome {
    pub fn side(&self, side: Side) -> &SideOutcome {
        match side {
            Side::Over => &self.over,
            Side::Under => &self.under,
        }
    }
}

/// A strategy turning a matchup into an over/under outcome pair.
pub trait EstimationMethod: Send + Sync {
    fn method(&self) -> Method;

    fn estimate(&self, matchup: &Matchup, config: &EngineConfig) -> MethodOutcome;
}

/// Strategy registered for a method tag.
pub fn estimator_for(method: Method) -> &'static dyn EstimationMethod {
    match method {
        Method::RawTeamAverage => &RawTeamAverageEstimator,
        Method::CrossAverage => &CrossAverageEstimator,
        Method::BayesianMatchup => &BayesianMatchupEstimator,
        Method::MedianTotalTest => &MedianTotalTestEstimator,
    }
}

fn ungated(estimate: Estimate, profile: &TeamProfile) -> SideOutcome {
    SideOutcome {
        estimate,
        diagnostics: profile.into(),
        gate: Gate::Ungated,
        min_posterior_gain: None,
    }
}

/// Cross-combines a home/over and an away/under likelihood: each side
/// averages its own signal with the complement of the opposing one.
fn cross_combine(home_over: f64, away_under: f64) -> (f64, f64) {
    (
        (home_over + (1.0 - away_under)) / 2.0,
        (away_under + (1.0 - home_over)) / 2.0,
    )
}

/// Raw implied prior, each team blended separately, averaged in price space.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawTeamAverageEstimator;

impl RawTeamAverageEstimator {
    fn side(m: &Matchup, side: Side, home: &TeamProfile, away: &TeamProfile) -> SideOutcome {
        let prior = m.prior.raw(side);
        let odds = m.odds(side);
        let per_team = [home, away].map(|p| {
            Estimate::blended(
                Method::RawTeamAverage,
                side,
                odds,
                prior,
                p.blended_hit_rate(),
                FIXED_PRIOR_WEIGHT,
            )
        });
        // Two elements, never empty.
        let estimate = Estimate::averaged_in_price_space(&per_team).unwrap_or(per_team[0]);
        ungated(estimate, home)
    }
}

impl EstimationMethod for RawTeamAverageEstimator {
    fn method(&self) -> Method {
        Method::RawTeamAverage
    }

    fn estimate(&self, m: &Matchup, _config: &EngineConfig) -> MethodOutcome {
        MethodOutcome {
            over: Self::side(m, Side::Over, &m.home_over, &m.away_over),
            under: Self::side(m, Side::Under, &m.home_under, &m.away_under),
        }
    }
}

/// Vig-free prior, own-side hit rate crossed with the opponent's complement.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossAverageEstimator;

impl EstimationMethod for CrossAverageEstimator {
    fn method(&self) -> Method {
        Method::CrossAverage
    }

    fn estimate(&self, m: &Matchup, _config: &EngineConfig) -> MethodOutcome {
        let (like_over, like_under) = cross_combine(
            m.home_over.blended_hit_rate(),
            m.away_under.blended_hit_rate(),
        );
        let blend = |side, likelihood| {
            Estimate::blended(
                Method::CrossAverage,
                side,
                m.odds(side),
                m.prior.clean(side),
                likelihood,
                FIXED_PRIOR_WEIGHT,
            )
        };
        MethodOutcome {
            over: ungated(blend(Side::Over, like_over), &m.home_over),
            under: ungated(blend(Side::Under, like_under), &m.away_under),
        }
    }
}

/// Effective Beta-Binomial `(successes, trials)` from recency-weighted
/// hit counts over the 10- and 15-sample windows.
pub fn effective_counts(hits10: usize, hits15: usize) -> (f64, f64) {
    let trials = (RECENT_WEIGHT * 10.0 + EXTENDED_WEIGHT * MIN_SAMPLES as f64).round();
    let successes = (RECENT_WEIGHT * hits10 as f64 + EXTENDED_WEIGHT * hits15 as f64)
        .round()
        .clamp(0.0, trials);
    (successes, trials)
}

/// Posterior mean `(a0 + s) / (a0 + b0 + n)` of a Beta(a0, b0) prior.
pub fn beta_posterior_mean(a0: f64, b0: f64, successes: f64, trials: f64) -> f64 {
    (a0 + successes) / (a0 + b0 + trials)
}

/// Per-team prior weight from volatility and trend: volatile teams lean
/// on the market, a falling trend leans on the data.
fn team_prior_weight(profile: &TeamProfile) -> f64 {
    let base = 0.3 + 0.3 * (profile.cv10 / 100.0).clamp(0.0, 1.0);
    let penalty = if profile.trend_pct < -10.0 {
        0.10
    } else if profile.trend_pct < -5.0 {
        0.05
    } else {
        0.0
    };
    base - penalty
}

/// Adaptive prior weight averaged over both teams and bounded by the
/// configured floor and cap.
pub fn bayes_prior_weight(home: &TeamProfile, away: &TeamProfile, params: &BayesParams) -> f64 {
    let w = (team_prior_weight(home) + team_prior_weight(away)) / 2.0;
    w.max(params.prior_weight_floor).min(params.prior_weight_cap)
}

/// Beta-Binomial shrinkage per team, cross-combined across the matchup.
#[derive(Debug, Clone, Copy, Default)]
pub struct BayesianMatchupEstimator;

impl BayesianMatchupEstimator {
    fn shrunk(profile: &TeamProfile, params: &BayesParams) -> f64 {
        let (s, n) = effective_counts(profile.hits10, profile.hits15);
        beta_posterior_mean(params.prior_a0, params.prior_b0, s, n)
    }
}

impl EstimationMethod for BayesianMatchupEstimator {
    fn method(&self) -> Method {
        Method::BayesianMatchup
    }

    fn estimate(&self, m: &Matchup, config: &EngineConfig) -> MethodOutcome {
        let params = &config.bayes;
        let (like_over, like_under) = cross_combine(
            Self::shrunk(&m.home_over, params),
            Self::shrunk(&m.away_under, params),
        );
        let w = bayes_prior_weight(&m.home_over, &m.away_under, params);
        let blend = |side, likelihood| {
            Estimate::blended(
                Method::BayesianMatchup,
                side,
                m.odds(side),
                m.prior.clean(side),
                likelihood,
                w,
            )
        };
        MethodOutcome {
            over: ungated(blend(Side::Over, like_over), &m.home_over),
            under: ungated(blend(Side::Under, like_under), &m.away_under),
        }
    }
}

/// Standard normal CDF.
pub fn standard_normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Normal approximation of the summed statistic around the two teams'
/// weighted medians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MedianTest {
    pub median_home: f64,
    pub median_away: f64,
    pub z: f64,
    /// Two-sided p-value of `z`.
    pub p_value: f64,
    pub likelihood_over: f64,
    pub likelihood_under: f64,
    pub cv15_home: f64,
    pub cv15_away: f64,
    /// Ratio of the teams' absolute deviations around their weighted medians.
    pub robust_ratio: f64,
}

impl MedianTest {
    /// Runs the test on the first 15 samples of each series.
    ///
    /// Returns `None` when either series is shorter than 15.
    pub fn run(home: &[f64], away: &[f64], handicap: f64) -> Option<Self> {
        if home.len() < MIN_SAMPLES || away.len() < MIN_SAMPLES {
            return None;
        }
        let home = &home[..MIN_SAMPLES];
        let away = &away[..MIN_SAMPLES];
        let weights = stats::recency_weights_15();

        let median_home = stats::weighted_median(home, &weights);
        let median_away = stats::weighted_median(away, &weights);
        let sd_total = (stats::mad_sigma(home).powi(2) + stats::mad_sigma(away).powi(2)).sqrt();

        let z = (handicap - (median_home + median_away)) / sd_total;
        let likelihood_over = (1.0 - standard_normal_cdf(z)).clamp(1e-3, 1.0 - 1e-3);
        let p_value = 2.0 * (1.0 - standard_normal_cdf(z.abs()));

        let robust_ratio = (stats::mad_around(home, median_home) + 1e-6)
            / (stats::mad_around(away, median_away) + 1e-6);

        Some(Self {
            median_home,
            median_away,
            z,
            p_value,
            likelihood_over,
            likelihood_under: 1.0 - likelihood_over,
            cv15_home: stats::volatility_cv(home),
            cv15_away: stats::volatility_cv(away),
            robust_ratio,
        })
    }

    pub fn likelihood(&self, side: Side) -> f64 {
        match side {
            Side::Over => self.likelihood_over,
            Side::Under => self.likelihood_under,
        }
    }

    /// Gate verdict for one side. A volatile team rejects both sides.
    pub fn gate(&self, side: Side, params: &MedianParams) -> Gate {
        if self.cv15_home > params.max_cv15 || self.cv15_away > params.max_cv15 {
            return Gate::Rejected(GateFailure::Volatility);
        }
        let significant = self.p_value <= params.pvalue_max
            && self.z.abs() >= params.min_abs_z
            && (self.likelihood(side) - 0.5).abs() >= params.min_edge;
        if significant {
            Gate::Passed
        } else {
            Gate::Rejected(GateFailure::Significance)
        }
    }

    /// Prior weight rising with the p-value, trimmed when the two teams'
    /// spreads are asymmetric.
    pub fn prior_weight(&self) -> f64 {
        let base = 0.50 + 0.30 * self.p_value.clamp(0.0, 1.0);
        let asymmetry = self.robust_ratio.max(1e-6).ln().abs();
        (base - (0.02 * asymmetry).min(0.05)).clamp(0.45, 0.85)
    }
}

/// Weighted-median normal test on the summed statistic, gated.
#[derive(Debug, Clone, Copy, Default)]
pub struct MedianTotalTestEstimator;

impl EstimationMethod for MedianTotalTestEstimator {
    fn method(&self) -> Method {
        Method::MedianTotalTest
    }

    fn estimate(&self, m: &Matchup, config: &EngineConfig) -> MethodOutcome {
        let params = &config.median;
        // Profiles always carry 15 samples, so the test always runs.
        let test = MedianTest::run(&m.home_over.last15, &m.away_over.last15, m.handicap);
        let w = test.map_or(FIXED_PRIOR_WEIGHT, |t| t.prior_weight());

        let outcome = |side: Side, profile: &TeamProfile| {
            let (likelihood, gate) = test.map_or(
                (0.5, Gate::Rejected(GateFailure::Significance)),
                |t| (t.likelihood(side), t.gate(side, params)),
            );
            SideOutcome {
                estimate: Estimate::blended(
                    Method::MedianTotalTest,
                    side,
                    m.odds(side),
                    m.prior.clean(side),
                    likelihood,
                    w,
                ),
                diagnostics: profile.into(),
                gate,
                min_posterior_gain: Some(params.min_posterior_gain),
            }
        };
        MethodOutcome {
            over: outcome(Side::Over, &m.home_over),
            under: outcome(Side::Under, &m.away_under),
        }
    }
}
