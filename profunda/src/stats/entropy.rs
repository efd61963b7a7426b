//! Shannon entropy and class imbalance.

/// Base-2 entropy of a frequency distribution.
///
/// NaN if any count is NaN; zero-count classes contribute nothing.
pub fn entropy<I>(counts: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let counts: Vec<f64> = counts.into_iter().collect();
    if counts.iter().any(|c| c.is_nan()) {
        return f64::NAN;
    }
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    -counts
        .iter()
        .filter(|c| **c > 0.0)
        .map(|c| {
            let p = c / total;
            p * p.log2()
        })
        .sum::<f64>()
}

/// Imbalance of `k` classes with base-2 entropy `entropy`:
/// `1 - entropy / log2(k)`, or 0 when there are fewer than two classes.
pub fn imbalance_from_entropy(entropy: f64, k: u64) -> f64 {
    if k <= 1 {
        return 0.0;
    }
    1.0 - entropy / (k as f64).log2()
}

/// Imbalance of a frequency distribution.
pub fn imbalance<I>(counts: I) -> f64
where
    I: IntoIterator<Item = u64>,
{
    let counts: Vec<f64> = counts.into_iter().map(|c| c as f64).collect();
    let k = counts.len() as u64;
    imbalance_from_entropy(entropy(counts), k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_is_balanced() {
        assert!((entropy([5.0, 5.0]) - 1.0).abs() < 1e-12);
        assert!(imbalance([5, 5, 5, 5]).abs() < 1e-12);
    }

    #[test]
    fn test_single_class() {
        assert_eq!(imbalance([10]), 0.0);
        assert_eq!(imbalance(std::iter::empty()), 0.0);
    }

    #[test]
    fn test_skewed_distribution() {
        let value = imbalance([99, 1]);
        assert!(value > 0.9 && value < 1.0);
    }

    #[test]
    fn test_nan_propagates() {
        assert!(entropy([1.0, f64::NAN]).is_nan());
    }
}
