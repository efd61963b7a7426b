//! Linear-interpolation quantiles over order statistics.

/// Position of quantile `q` among `n` sorted values: the lower and upper
/// order statistic indices and the interpolation weight.
pub fn position(n: usize, q: f64) -> (usize, usize, f64) {
    let virtual_index = (n - 1) as f64 * q;
    let lower = virtual_index.floor();
    let lower_index = (lower as usize).min(n - 1);
    let upper_index = (lower_index + 1).min(n - 1);
    (lower_index, upper_index, virtual_index - lower)
}

/// Interpolates between `a` and `b`; evaluated from the nearer end to keep
/// the result exact when `t` is 0 or 1.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    let diff = b - a;
    if t >= 0.5 {
        b - diff * (1.0 - t)
    } else {
        a + diff * t
    }
}

/// Quantile `q` of an ascending slice; NaN when empty.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let (lower, upper, t) = position(sorted.len(), q);
    lerp(sorted[lower], sorted[upper], t)
}

/// Reported quantile: infinite results are replaced by NaN.
pub fn finite_or_nan(value: f64) -> f64 {
    if value.is_infinite() {
        f64::NAN
    } else {
        value
    }
}

/// Summary key for quantile `q`, e.g. `"25%"`.
pub fn quantile_key(q: f64) -> String {
    format!("{:.0}%", q * 100.0)
}

/// Sorts a copy of `values` ascending.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    sorted
}

/// Median absolute deviation around the median; NaN when empty or when
/// the median is not finite.
pub fn median_absolute_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let median = quantile_sorted(&sorted(values), 0.5);
    if !median.is_finite() {
        return f64::NAN;
    }
    let deviations: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
    quantile_sorted(&sorted(&deviations), 0.5)
}

/// Distinct values in ascending order with their multiplicities.
#[derive(Debug, Clone, Default)]
pub struct OrderStatistics {
    values: Vec<(f64, u64)>,
    total: u64,
}

impl OrderStatistics {
    pub fn new(values: impl IntoIterator<Item = (f64, u64)>) -> Self {
        let mut values: Vec<(f64, u64)> = values.into_iter().collect();
        values.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
        let total = values.iter().map(|(_, count)| count).sum();
        Self { values, total }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// The `k`-th smallest value, 0-based.
    pub fn nth(&self, k: u64) -> f64 {
        let mut seen = 0;
        for (value, count) in &self.values {
            seen += count;
            if k < seen {
                return *value;
            }
        }
        f64::NAN
    }

    /// Interpolated quantile `q`; NaN when empty.
    pub fn quantile(&self, q: f64) -> f64 {
        if self.total == 0 {
            return f64::NAN;
        }
        let (lower, upper, t) = position(self.total as usize, q);
        lerp(self.nth(lower as u64), self.nth(upper as u64), t)
    }

    /// Median absolute deviation around the median.
    pub fn median_absolute_deviation(&self) -> f64 {
        let median = self.quantile(0.5);
        if !median.is_finite() {
            return f64::NAN;
        }
        OrderStatistics::new(
            self.values
                .iter()
                .map(|(value, count)| ((value - median).abs(), *count)),
        )
        .quantile(0.5)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(f64, u64)> {
        self.values.iter()
    }
}
