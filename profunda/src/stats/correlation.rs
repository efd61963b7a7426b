//! Correlation coefficients and the matrix they are reported in.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::CorrelationSettings;

/// Correlation coefficient families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    Pearson,
    Spearman,
    Kendall,
    Cramers,
    PhiK,
}

impl CorrelationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            CorrelationMethod::Pearson => "pearson",
            CorrelationMethod::Spearman => "spearman",
            CorrelationMethod::Kendall => "kendall",
            CorrelationMethod::Cramers => "cramers",
            CorrelationMethod::PhiK => "phi_k",
        }
    }

    /// Methods switched on in `settings`, in a fixed order.
    pub fn enabled(settings: &CorrelationSettings) -> Vec<CorrelationMethod> {
        [
            (settings.pearson, CorrelationMethod::Pearson),
            (settings.spearman, CorrelationMethod::Spearman),
            (settings.kendall, CorrelationMethod::Kendall),
            (settings.cramers, CorrelationMethod::Cramers),
            (settings.phi_k, CorrelationMethod::PhiK),
        ]
        .into_iter()
        .filter_map(|(on, method)| on.then_some(method))
        .collect()
    }
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A square, symmetric matrix labelled by column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// A NaN-filled matrix over `columns`.
    pub fn new(columns: Vec<String>) -> Self {
        let k = columns.len();
        Self {
            columns,
            values: vec![vec![f64::NAN; k]; k],
        }
    }

    /// Builds the matrix evaluating `coefficient` once per unordered pair.
    pub fn from_fn<F>(columns: Vec<String>, mut coefficient: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut matrix = Self::new(columns);
        let k = matrix.len();
        for i in 0..k {
            for j in i..k {
                matrix.set(i, j, coefficient(i, j));
            }
        }
        matrix
    }

    /// Sets the coefficient of a pair in both triangles.
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.values[i][j] = value;
        self.values[j][i] = value;
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// First-pass sums over pairwise-complete rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PairSums {
    pub n: u64,
    pub sum_x: f64,
    pub sum_y: f64,
}

impl PairSums {
    pub fn add(&mut self, x: f64, y: f64) {
        self.n += 1;
        self.sum_x += x;
        self.sum_y += y;
    }

    pub fn merge(&mut self, other: &Self) {
        self.n += other.n;
        self.sum_x += other.sum_x;
        self.sum_y += other.sum_y;
    }

    pub fn means(&self) -> (f64, f64) {
        let n = self.n as f64;
        (self.sum_x / n, self.sum_y / n)
    }
}

/// Second-pass sums of products of deviations from the pair means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CenteredPairSums {
    pub sxx: f64,
    pub syy: f64,
    pub sxy: f64,
}

impl CenteredPairSums {
    pub fn add(&mut self, dx: f64, dy: f64) {
        self.sxx += dx * dx;
        self.syy += dy * dy;
        self.sxy += dx * dy;
    }

    pub fn merge(&mut self, other: &Self) {
        self.sxx += other.sxx;
        self.syy += other.syy;
        self.sxy += other.sxy;
    }

    /// Pearson coefficient for `n` pairs; NaN when undefined.
    pub fn pearson(&self, n: u64) -> f64 {
        if n < 2 {
            return f64::NAN;
        }
        let denominator = (self.sxx * self.syy).sqrt();
        if denominator == 0.0 {
            return f64::NAN;
        }
        (self.sxy / denominator).clamp(-1.0, 1.0)
    }
}

fn complete_pairs(x: &[Option<f64>], y: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if !a.is_nan() && !b.is_nan() => Some((*a, *b)),
            _ => None,
        })
        .unzip()
}

fn pearson_complete(x: &[f64], y: &[f64]) -> f64 {
    let mut sums = PairSums::default();
    for (a, b) in x.iter().zip(y) {
        sums.add(*a, *b);
    }
    let (mean_x, mean_y) = sums.means();
    let mut centered = CenteredPairSums::default();
    for (a, b) in x.iter().zip(y) {
        centered.add(a - mean_x, b - mean_y);
    }
    centered.pearson(sums.n)
}

/// Pearson correlation over the rows where both values are present.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let (x, y) = complete_pairs(x, y);
    pearson_complete(&x, &y)
}

/// 1-based ranks, ties sharing their average rank.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| values[*a].total_cmp(&values[*b]));
    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let rank = (start + end + 1) as f64 / 2.0;
        for index in &order[start..end] {
            ranks[*index] = rank;
        }
        start = end;
    }
    ranks
}

/// Spearman rank correlation over pairwise-complete rows.
pub fn spearman(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let (x, y) = complete_pairs(x, y);
    pearson_complete(&average_ranks(&x), &average_ranks(&y))
}

/// Kendall tau-b over pairwise-complete rows.
pub fn kendall(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let (x, y) = complete_pairs(x, y);
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    let mut score = 0i64;
    let mut untied_x = 0u64;
    let mut untied_y = 0u64;
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = sign(x[i] - x[j]);
            let dy = sign(y[i] - y[j]);
            score += dx * dy;
            untied_x += (dx != 0) as u64;
            untied_y += (dy != 0) as u64;
        }
    }
    let denominator = ((untied_x as f64) * (untied_y as f64)).sqrt();
    if denominator == 0.0 {
        return f64::NAN;
    }
    (score as f64 / denominator).clamp(-1.0, 1.0)
}

fn sign(value: f64) -> i64 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_perfect_correlation() {
        let x = some(&[1.0, 2.0, 3.0, 4.0]);
        let y = some(&[2.0, 4.0, 6.0, 8.0]);
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
        let z = some(&[4.0, 3.0, 2.0, 1.0]);
        assert!((pearson(&x, &z) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pairwise_complete() {
        let x = vec![Some(1.0), Some(2.0), None, Some(3.0)];
        let y = vec![Some(1.0), Some(2.0), Some(100.0), Some(3.0)];
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_is_nan() {
        let x = some(&[1.0, 1.0, 1.0]);
        let y = some(&[1.0, 2.0, 3.0]);
        assert!(pearson(&x, &y).is_nan());
        assert!(pearson(&x, &x).is_nan());
    }

    #[test]
    fn test_average_ranks() {
        assert_eq!(average_ranks(&[10.0, 20.0, 10.0, 30.0]), vec![1.5, 3.0, 1.5, 4.0]);
    }

    #[test]
    fn test_spearman_monotonic() {
        let x = some(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let y = some(&[1.0, 4.0, 9.0, 16.0, 1000.0]);
        assert!((spearman(&x, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_kendall() {
        let x = some(&[1.0, 2.0, 3.0]);
        let y = some(&[1.0, 3.0, 2.0]);
        // 2 concordant, 1 discordant
        assert!((kendall(&x, &y) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_matrix_symmetric() {
        let columns = vec!["a".to_string(), "b".to_string()];
        let mut calls = 0;
        let matrix = CorrelationMatrix::from_fn(columns, |i, j| {
            calls += 1;
            (i + j) as f64
        });
        assert_eq!(calls, 3);
        assert_eq!(matrix.get("a", "b"), Some(1.0));
        assert_eq!(matrix.get("b", "a"), Some(1.0));
        assert_eq!(matrix.get("a", "z"), None);
    }

    #[test]
    fn test_enabled_methods() {
        let settings = CorrelationSettings {
            pearson: true,
            kendall: true,
            ..CorrelationSettings::default()
        };
        assert_eq!(
            CorrelationMethod::enabled(&settings),
            vec![CorrelationMethod::Pearson, CorrelationMethod::Kendall]
        );
    }
}
