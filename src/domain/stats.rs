//! Descriptive statistics over historical team samples.
//!
//! Everything here is a pure function over `&[f64]`. Population
//! (ddof = 0) standard deviations are used throughout.

/// Scale factor turning a MAD into a normal-consistent sigma.
pub const MAD_TO_SIGMA: f64 = 1.4826;

/// Recency weights for a 15-sample window: 0.6 spread over the first
/// (most recent) 10 samples, 0.4 over the last 5, normalized to 1.
pub fn recency_weights_15() -> [f64; 15] {
    let mut w = [0.0; 15];
    for (i, slot) in w.iter_mut().enumerate() {
        *slot = if i < 10 { 0.6 / 10.0 } else { 0.4 / 5.0 };
    }
    let total: f64 = w.iter().sum();
    for slot in &mut w {
        *slot /= total;
    }
    w
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median with the midpoint convention for even lengths.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Coefficient of variation in percent; 0 when the mean is not positive.
pub fn cv_percent(values: &[f64]) -> f64 {
    let m = mean(values);
    if m > 0.0 { std_dev(values) / m * 100.0 } else { 0.0 }
}

/// Fraction of samples landing strictly on the given side of `handicap`.
pub fn hit_rate(values: &[f64], handicap: f64, side: super::market::Side) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    hit_count(values, handicap, side) as f64 / values.len() as f64
}

pub fn hit_count(values: &[f64], handicap: f64, side: super::market::Side) -> usize {
    values.iter().filter(|&&v| side.hits(v, handicap)).count()
}

/// Percent change of the recent 10 mean over the older 5 (samples 10..15).
pub fn trend_percent(values: &[f64]) -> f64 {
    if values.len() < 15 {
        return 0.0;
    }
    let recent = mean(&values[..10]);
    let older = mean(&values[10..15]);
    if older > 0.0 { (recent - older) / older * 100.0 } else { 0.0 }
}

/// Weighted median: the first sorted value whose cumulative weight
/// reaches one half.
///
/// `weights` must have the same length as `values`; the caller is
/// expected to pass normalized weights.
pub fn weighted_median(values: &[f64], weights: &[f64]) -> f64 {
    debug_assert_eq!(values.len(), weights.len());
    if values.is_empty() {
        return f64::NAN;
    }
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut cumulative = 0.0;
    for &i in &idx {
        cumulative += weights[i];
        if cumulative >= 0.5 {
            return values[i];
        }
    }
    values[idx[idx.len() - 1]]
}

/// Median absolute deviation around an arbitrary center.
pub fn mad_around(values: &[f64], center: f64) -> f64 {
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// Robust sigma estimate `1.4826 * MAD`, floored at 1e-6.
pub fn mad_sigma(values: &[f64]) -> f64 {
    let mad = mad_around(values, median(values));
    (MAD_TO_SIGMA * mad).max(1e-6)
}

/// CV(15) volatility filter value: 999 when the mean is not positive.
pub fn volatility_cv(values: &[f64]) -> f64 {
    let m = mean(values);
    if m > 0.0 {
        std_dev(values) / m.max(1e-6) * 100.0
    } else {
        999.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Side;

    #[test]
    fn test_recency_weights_sum_to_one() {
        let w = recency_weights_15();
        let total: f64 = w.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((w[0] - 0.06).abs() < 1e-12);
        assert!((w[14] - 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_median_reaches_half_in_first_block() {
        let mut values = vec![10.0; 10];
        values.extend([20.0; 5]);
        let w = recency_weights_15();
        assert_eq!(weighted_median(&values, &w), 10.0);
    }

    #[test]
    fn test_weighted_median_respects_weights() {
        // Recent block is high, old block low; 0.6 of the mass sits on 30.
        let mut values = vec![30.0; 10];
        values.extend([10.0; 5]);
        let w = recency_weights_15();
        assert_eq!(weighted_median(&values, &w), 30.0);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
    }

    #[test]
    fn test_population_std() {
        let s = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((s - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_hit_rate_example_series() {
        let l10 = [28.0, 30.0, 26.0, 24.0, 29.0, 31.0, 27.0, 25.0, 33.0, 22.0];
        assert!((hit_rate(&l10, 25.5, Side::Over) - 0.7).abs() < 1e-12);
        assert!((hit_rate(&l10, 25.5, Side::Under) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_trend_percent() {
        let mut values = vec![12.0; 10];
        values.extend([10.0; 5]);
        assert!((trend_percent(&values) - 20.0).abs() < 1e-9);
        assert_eq!(trend_percent(&values[..14]), 0.0);
    }

    #[test]
    fn test_mad_sigma_floor() {
        assert_eq!(mad_sigma(&[5.0; 15]), 1e-6);
        let s = mad_sigma(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((s - MAD_TO_SIGMA).abs() < 1e-12);
    }

    #[test]
    fn test_volatility_cv_non_positive_mean() {
        assert_eq!(volatility_cv(&[0.0; 15]), 999.0);
        assert_eq!(cv_percent(&[0.0; 10]), 0.0);
    }
}
