//! Small numeric helpers shared by the detectors.
//!
//! Every function returns a finite value for finite input; degenerate
//! cases (empty input, zero variance) yield 0.

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance; 0 for an empty slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Sums of squared deviations below this are treated as zero variance.
const ZERO_VARIANCE: f64 = 1e-12;

/// Pearson correlation coefficient.
///
/// `r = Σ(x−x̄)(y−ȳ) / √(Σ(x−x̄)² Σ(y−ȳ)²)`, defined as 0 when either series
/// is constant or the series are empty or of unequal length.
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.is_empty() || xs.len() != ys.len() {
        return 0.0;
    }
    let (mx, my) = (mean(xs), mean(ys));
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    // constant input leaves only rounding noise in the deviations
    if sxx < ZERO_VARIANCE || syy < ZERO_VARIANCE {
        return 0.0;
    }
    let r = sxy / (sxx * syy).sqrt();
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Ordinary-least-squares slope of `values` against their index.
pub fn linear_trend(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn mean_and_variance() {
        assert_eq!(mean(&[]), 0.0);
        assert!(approx(mean(&[1.0, 2.0, 3.0]), 2.0));
        assert!(approx(variance(&[1.0, 2.0, 3.0]), 2.0 / 3.0));
        assert_eq!(variance(&[0.4; 5]), 0.0);
    }

    #[test]
    fn identical_vectors_correlate_perfectly() {
        let xs = [0.1, 0.5, 0.3, 0.9, 0.7];
        assert!(approx(pearson_correlation(&xs, &xs), 1.0));
    }

    #[test]
    fn inverse_vectors_correlate_negatively() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [4.0, 3.0, 2.0, 1.0];
        assert!(approx(pearson_correlation(&xs, &ys), -1.0));
    }

    #[test]
    fn constant_vectors_yield_zero() {
        let r = pearson_correlation(&[0.5; 6], &[0.5; 6]);
        assert_eq!(r, 0.0);
        assert!(!r.is_nan());
        // rounding noise in the mean must not read as correlation
        assert_eq!(pearson_correlation(&[0.95; 10], &[0.08; 10]), 0.0);
        assert_eq!(pearson_correlation(&[1.0, 2.0, 3.0], &[2.0; 3]), 0.0);
    }

    #[test]
    fn mismatched_or_empty_yield_zero() {
        assert_eq!(pearson_correlation(&[], &[]), 0.0);
        assert_eq!(pearson_correlation(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn linear_trend_slope() {
        assert!(approx(linear_trend(&[0.0, 1.0, 2.0, 3.0]), 1.0));
        assert!(approx(linear_trend(&[0.9, 0.7, 0.5]), -0.2));
        assert_eq!(linear_trend(&[0.4]), 0.0);
        assert!(approx(linear_trend(&[0.4; 8]), 0.0));
    }
}
