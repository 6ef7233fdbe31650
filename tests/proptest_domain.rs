//! Property-Based Tests - Domain Layer Invariants
//!
//! Uses `proptest` to verify that the estimation math keeps its
//! invariants across random odds, series and parameters.

use proptest::prelude::*;

use totals_edge::domain::estimator::{
    MedianTest, Matchup, beta_posterior_mean, effective_counts, estimator_for,
};
use totals_edge::domain::market::{Method, Side, StatType};
use totals_edge::domain::params::{EngineConfig, MedianParams};
use totals_edge::domain::probability::{
    POSTERIOR_MAX, POSTERIOR_MIN, blend_posterior, ev_percent, fair_odds, implied_probability,
    remove_vig, roi_percent,
};

fn series() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..60.0, 15..30)
}

// ── Probability Properties ──────────────────────────────────

proptest! {
    /// Posterior is always inside [0.02, 0.98], whatever goes in.
    #[test]
    fn posterior_always_clipped(
        prior in -1.0f64..2.0,
        likelihood in -1.0f64..2.0,
        w in 0.0f64..=1.0,
    ) {
        let p = blend_posterior(prior, likelihood, w);
        prop_assert!((POSTERIOR_MIN..=POSTERIOR_MAX).contains(&p), "posterior {p}");
    }

    /// De-vigged pair sums to one.
    #[test]
    fn vig_removal_sums_to_one(over in 1.01f64..20.0, under in 1.01f64..20.0) {
        let (o, u) = remove_vig(implied_probability(over), implied_probability(under));
        prop_assert!((o + u - 1.0).abs() < 1e-9);
        prop_assert!(o > 0.0 && u > 0.0);
    }

    /// ROI rebuilt from reported fair odds matches reported ROI.
    #[test]
    fn roi_consistent_with_fair_odds(posterior in 0.02f64..=0.98, odds in 1.01f64..10.0) {
        let fair = fair_odds(posterior);
        let roi = roi_percent(odds, fair);
        prop_assert!((odds / fair * 100.0 - 100.0 - roi).abs() < 1e-9);
        // Same quantity seen through EV when fair is exactly 1/p.
        prop_assert!((ev_percent(posterior, odds) - roi).abs() < 1e-6);
    }

    /// Implied probability never leaves [1e-6, 1 - 1e-6].
    #[test]
    fn implied_probability_bounded(odds in -5.0f64..1000.0) {
        let p = implied_probability(odds);
        prop_assert!(p >= 1e-6 && p <= 1.0 - 1e-6);
    }
}

// ── Beta-Binomial Properties ────────────────────────────────

proptest! {
    /// More observed hits never lower the posterior mean.
    #[test]
    fn beta_mean_monotone_in_hits(
        a0 in 1.0f64..10.0,
        b0 in 1.0f64..10.0,
        hits10 in 0usize..10,
        hits15 in 0usize..15,
    ) {
        let (s1, n) = effective_counts(hits10, hits15);
        let (s2, _) = effective_counts(hits10 + 1, hits15 + 1);
        prop_assert!(s2 >= s1);
        prop_assert!(s1 <= n);
        prop_assert!(beta_posterior_mean(a0, b0, s2, n) >= beta_posterior_mean(a0, b0, s1, n));
    }
}

// ── Method Properties ───────────────────────────────────────

proptest! {
    /// Every method reports probabilities inside the clip bounds and
    /// fair odds consistent with the reported ROI.
    #[test]
    fn method_outputs_well_formed(
        home in series(),
        away in series(),
        handicap in 5.0f64..60.0,
        over in 1.3f64..3.5,
        under in 1.3f64..3.5,
    ) {
        let m = Matchup::new(StatType::Kills, handicap, over, under, &home, &away).unwrap();
        let config = EngineConfig::default();
        for method in Method::ALL {
            let outcome = estimator_for(method).estimate(&m, &config);
            for side in [Side::Over, Side::Under] {
                let e = outcome.side(side).estimate;
                prop_assert_eq!(e.method, method);
                prop_assert!(e.probabilities.posterior >= POSTERIOR_MIN - 1e-12);
                prop_assert!(e.probabilities.posterior <= POSTERIOR_MAX + 1e-12);
                prop_assert!(e.prior_weight >= 0.0 && e.prior_weight <= 1.0);
                prop_assert!((e.odds / e.fair_odds * 100.0 - 100.0 - e.roi_pct).abs() < 1e-6);
            }
        }
    }

    /// Raising `min_abs_z` can only close the median gate, never open it.
    #[test]
    fn median_gate_monotone_in_min_abs_z(
        home in series(),
        away in series(),
        handicap in 5.0f64..60.0,
        z1 in 0.0f64..3.0,
        dz in 0.0f64..3.0,
    ) {
        let Some(test) = MedianTest::run(&home, &away, handicap) else {
            return Ok(());
        };
        let loose = MedianParams { min_abs_z: z1, ..MedianParams::default() };
        let tight = MedianParams { min_abs_z: z1 + dz, ..MedianParams::default() };
        for side in [Side::Over, Side::Under] {
            if test.gate(side, &tight).is_open() {
                prop_assert!(test.gate(side, &loose).is_open());
            }
        }
    }

    /// Median prior weight stays in [0.45, 0.85].
    #[test]
    fn median_prior_weight_bounded(home in series(), away in series(), handicap in 5.0f64..60.0) {
        if let Some(test) = MedianTest::run(&home, &away, handicap) {
            let w = test.prior_weight();
            prop_assert!((0.45..=0.85).contains(&w), "weight {w}");
        }
    }
}
