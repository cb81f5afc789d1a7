//! Window statistics - pure numeric helpers

/// Default number of histogram bins for entropy
pub const DEFAULT_ENTROPY_BINS: usize = 16;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N)
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    // Rounding can leave a tiny negative variance on constant input
    variance.max(0.0).sqrt()
}

/// Shannon entropy of the binned distribution, normalized by log2(bins)
///
/// Bins span [min, max] of the window. A zero-width range (constant
/// signal) has entropy 0.
pub fn normalized_entropy(values: &[f64], bins: usize) -> f64 {
    if values.len() < 2 || bins < 2 {
        return 0.0;
    }

    let (lo, hi) = min_max(values);
    let range = hi - lo;
    if !(range.is_finite() && range > f64::EPSILON) {
        return 0.0;
    }

    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - lo) / range) * bins as f64) as usize;
        counts[idx.min(bins - 1)] += 1;
    }

    let total = values.len() as f64;
    let entropy: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();

    (entropy / (bins as f64).log2()).clamp(0.0, 1.0)
}

/// (min, max); (0, 0) for an empty slice
pub fn min_max(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Net change per second between the first and last reading
pub fn rate_of_change(first: (f64, f64), last: (f64, f64)) -> f64 {
    let (t0, p0) = first;
    let (t1, p1) = last;
    let span = t1 - t0;
    if span > f64::EPSILON {
        (p1 - p0) / span
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_population_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        // Population formula: sqrt(32 / 8) = 2
        assert!((population_std_dev(&values) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_signal_has_zero_entropy_and_std() {
        let values = [-45.0; 5];
        assert_eq!(normalized_entropy(&values, 16), 0.0);
        assert_eq!(population_std_dev(&values), 0.0);
    }

    #[test]
    fn test_uniform_spread_has_max_entropy() {
        let values: Vec<f64> = (0..16).map(|i| i as f64 + 0.5).collect();
        let h = normalized_entropy(&values, 16);
        assert!((h - 1.0).abs() < 1e-9, "entropy {}", h);
    }

    #[test]
    fn test_two_level_signal_entropy() {
        // Two equally populated bins out of 16: 1 bit / 4 bits
        let values = [-90.0, -50.0, -90.0, -50.0];
        assert!((normalized_entropy(&values, 16) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_entropy_degenerate_inputs() {
        assert_eq!(normalized_entropy(&[], 16), 0.0);
        assert_eq!(normalized_entropy(&[-60.0], 16), 0.0);
        assert_eq!(normalized_entropy(&[-60.0, -70.0], 1), 0.0);
    }

    #[test]
    fn test_rate_of_change() {
        assert_eq!(rate_of_change((0.0, -80.0), (2.0, -60.0)), 10.0);
        assert_eq!(rate_of_change((1.0, -80.0), (1.0, -60.0)), 0.0);
    }

    #[test]
    fn test_min_max() {
        assert_eq!(min_max(&[-3.0, 1.0, -7.0]), (-7.0, 1.0));
        assert_eq!(min_max(&[]), (0.0, 0.0));
    }
}
