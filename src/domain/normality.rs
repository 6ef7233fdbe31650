//! Shapiro–Wilk normality check (Royston's AS R94 approximation).
//!
//! Used only as a diagnostic flag on persisted picks. Numerical trouble
//! (too few samples, zero range, non-finite input) resolves to
//! `Normality::Indeterminate` instead of an error.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Significance level above which a sample is reported as normal.
pub const NORMALITY_ALPHA: f64 = 0.05;

const C1: [f64; 6] = [0.0, 0.221_157, -0.147_981, -2.071_19, 4.434_685, -2.706_056];
const C2: [f64; 6] = [0.0, 0.042_981, -0.293_762, -1.752_461, 5.682_633, -3.582_633];
const C3: [f64; 4] = [0.544, -0.399_78, 0.025_054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.778_57, 0.062_767, -0.002_032_2];
const C5: [f64; 4] = [-1.5861, -0.310_82, -0.083_751, 0.003_891_5];
const C6: [f64; 3] = [-0.4803, -0.082_676, 0.003_030_2];
const G: [f64; 2] = [-2.273, 0.459];

/// Tri-state outcome of the normality test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normality {
    Normal,
    NotNormal,
    Indeterminate,
}

impl Normality {
    /// Persisted boolean flag: only a conclusive pass counts as normal.
    pub fn is_normal(self) -> bool {
        matches!(self, Self::Normal)
    }
}

/// Result of a Shapiro–Wilk run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapiroWilk {
    pub w: f64,
    pub p_value: f64,
}

/// Classifies a sample at [`NORMALITY_ALPHA`].
pub fn check_normality(values: &[f64]) -> Normality {
    match shapiro_wilk(values) {
        Some(sw) if sw.p_value > NORMALITY_ALPHA => Normality::Normal,
        Some(_) => Normality::NotNormal,
        None => Normality::Indeterminate,
    }
}

/// Runs the test; `None` when it cannot be computed.
pub fn shapiro_wilk(values: &[f64]) -> Option<ShapiroWilk> {
    let n = values.len();
    if !(3..=5000).contains(&n) || values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let std_normal = Normal::new(0.0, 1.0).ok()?;

    let mut x = values.to_vec();
    x.sort_by(f64::total_cmp);
    let range = x[n - 1] - x[0];
    if range < 1e-19 {
        return None;
    }

    let an = n as f64;
    let nn2 = n / 2;
    let mut a = vec![0.0; nn2];

    if n == 3 {
        a[0] = 0.5_f64.sqrt();
    } else {
        let an25 = an + 0.25;
        let mut summ2 = 0.0;
        for (i, slot) in a.iter_mut().enumerate() {
            let m = std_normal.inverse_cdf(((i + 1) as f64 - 0.375) / an25);
            *slot = m;
            summ2 += m * m;
        }
        summ2 *= 2.0;
        let ssumm2 = summ2.sqrt();
        let rsn = 1.0 / an.sqrt();
        let a1 = poly(&C1, rsn) - a[0] / ssumm2;

        let (first_scaled, fac) = if n > 5 {
            let a2 = -a[1] / ssumm2 + poly(&C2, rsn);
            let fac = ((summ2 - 2.0 * a[0].powi(2) - 2.0 * a[1].powi(2))
                / (1.0 - 2.0 * a1.powi(2) - 2.0 * a2.powi(2)))
            .sqrt();
            a[1] = a2;
            (2, fac)
        } else {
            let fac = ((summ2 - 2.0 * a[0].powi(2)) / (1.0 - 2.0 * a1.powi(2))).sqrt();
            (1, fac)
        };
        a[0] = a1;
        for slot in a.iter_mut().skip(first_scaled) {
            *slot = -*slot / fac;
        }
    }

    let mean = x.iter().sum::<f64>() / an;
    let ssq: f64 = x.iter().map(|v| ((v - mean) / range).powi(2)).sum();
    let b: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (x[n - 1 - i] - x[i]) / range)
        .sum();
    let w = (b * b / ssq).min(1.0);
    if !w.is_finite() {
        return None;
    }

    let p_value = if n == 3 {
        let pi6 = 6.0 / std::f64::consts::PI;
        let stqr = std::f64::consts::PI / 3.0;
        (pi6 * (w.sqrt().asin() - stqr)).max(0.0)
    } else {
        let w1 = 1.0 - w;
        if w1 <= 0.0 {
            return Some(ShapiroWilk { w, p_value: 1.0 });
        }
        let mut y = w1.ln();
        let (m, s) = if n <= 11 {
            let gamma = poly(&G, an);
            if y >= gamma {
                return Some(ShapiroWilk { w, p_value: 1e-99 });
            }
            y = -(gamma - y).ln();
            (poly(&C3, an), poly(&C4, an).exp())
        } else {
            let xx = an.ln();
            (poly(&C5, xx), poly(&C6, xx).exp())
        };
        1.0 - std_normal.cdf((y - m) / s)
    };

    p_value.is_finite().then_some(ShapiroWilk { w, p_value })
}

/// Polynomial `c[0] + c[1] x + c[2] x^2 + ...`.
fn poly(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, coef| acc * x + coef)
}
