//! Variance, skewness and kurtosis from central-moment sums.
//!
//! Backends compute `n`, the mean and the sums of centered powers with
//! whatever execution model they have; the formulas live here once.

use serde::{Deserialize, Serialize};

/// Kurtosis denominators below this are treated as zero.
pub const KURTOSIS_DENOMINATOR_EPSILON: f64 = 1e-14;

/// Sums of the 2nd, 3rd and 4th powers of deviations from the mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CentralMoments {
    pub count: u64,
    pub m2: f64,
    pub m3: f64,
    pub m4: f64,
}

impl CentralMoments {
    /// Computes the sums for `values` around `mean`.
    pub fn from_values(values: &[f64], mean: f64) -> Self {
        let mut moments = Self {
            count: values.len() as u64,
            ..Self::default()
        };
        for value in values {
            moments.add(*value - mean);
        }
        moments
    }

    /// Accumulates one deviation.
    pub fn add(&mut self, deviation: f64) {
        let squared = deviation * deviation;
        self.m2 += squared;
        self.m3 += squared * deviation;
        self.m4 += squared * squared;
    }

    /// Combines sums taken around the same mean.
    pub fn merge(&mut self, other: &Self) {
        self.count += other.count;
        self.m2 += other.m2;
        self.m3 += other.m3;
        self.m4 += other.m4;
    }

    /// Sample variance; NaN with fewer than two values.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return f64::NAN;
        }
        self.m2 / (self.count - 1) as f64
    }

    /// Adjusted Fisher-Pearson skewness.
    ///
    /// NaN with fewer than three values; 0.0 when the second moment is zero.
    pub fn skewness(&self) -> f64 {
        if self.count < 3 {
            return f64::NAN;
        }
        if self.m2 == 0.0 {
            return 0.0;
        }
        let n = self.count as f64;
        (n * (n - 1.0).sqrt() / (n - 2.0)) * (self.m3 / self.m2.powf(1.5))
    }

    /// Bias-corrected excess kurtosis.
    ///
    /// NaN with fewer than four values; 0.0 when the denominator vanishes.
    pub fn kurtosis(&self) -> f64 {
        if self.count < 4 {
            return f64::NAN;
        }
        let n = self.count as f64;
        let adj = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
        let numerator = n * (n + 1.0) * (n - 1.0) * self.m4;
        let denominator = (n - 2.0) * (n - 3.0) * self.m2.powi(2);
        if denominator < KURTOSIS_DENOMINATOR_EPSILON {
            return 0.0;
        }
        numerator / denominator - adj
    }
}

/// Standard deviation and variance, NaN if any value is infinite.
pub fn spread(moments: &CentralMoments, has_infinite: bool) -> (f64, f64) {
    if has_infinite {
        return (f64::NAN, f64::NAN);
    }
    let variance = moments.variance();
    (variance.sqrt(), variance)
}
