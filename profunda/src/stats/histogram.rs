//! Equal-width histograms.
//!
//! Edges are `bins + 1` evenly spaced points over `[min, max]`; every bucket
//! is left-closed and the last one also holds `max`. A constant column is
//! widened to `[v - 0.5, v + 0.5]`. Non-finite values are never binned.

use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, ProfileResult};

/// Counts per bucket plus the `counts.len() + 1` bucket edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub counts: Vec<u64>,
    pub bin_edges: Vec<f64>,
}

impl Histogram {
    /// The histogram of a column without finite values.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Adds the counts of another histogram over the same edges.
    pub fn merge_counts(&mut self, other: &[u64]) {
        for (count, add) in self.counts.iter_mut().zip(other) {
            *count += add;
        }
    }
}

/// Rejects a histogram request without buckets.
pub fn require_bins(bins: usize) -> ProfileResult<usize> {
    if bins == 0 {
        return Err(ProfileError::invalid_config(
            "histogram.bins must be greater than 0",
        ));
    }
    Ok(bins)
}

/// Range of the edges for a histogram over `[min, max]`.
pub fn histogram_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    }
}

/// `bins + 1` evenly spaced edges from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, bins: usize) -> Vec<f64> {
    let step = (stop - start) / bins as f64;
    let mut edges: Vec<f64> = (0..bins).map(|i| start + i as f64 * step).collect();
    edges.push(stop);
    edges
}

/// Edges for `bins` buckets covering `[min, max]`.
pub fn bin_edges(min: f64, max: f64, bins: usize) -> Vec<f64> {
    let (start, stop) = histogram_range(min, max);
    linspace(start, stop, bins)
}

/// Bucket of `value`, which must lie within `[edges[0], edges[last]]`.
///
/// The number of interior edges not greater than the value; this matches
/// the `CASE WHEN v < e1 THEN 0 ...` expression pushed down to SQL engines.
pub fn bin_index(edges: &[f64], value: f64) -> usize {
    let bins = edges.len() - 1;
    edges[1..bins].partition_point(|edge| *edge <= value)
}

/// Counts `values` into the buckets delimited by `edges`.
pub fn bin_counts<I>(edges: &[f64], values: I) -> Vec<u64>
where
    I: IntoIterator<Item = f64>,
{
    let mut counts = vec![0u64; edges.len().saturating_sub(1)];
    if counts.is_empty() {
        return counts;
    }
    for value in values {
        counts[bin_index(edges, value)] += 1;
    }
    counts
}

/// Histogram over the finite entries of `values`.
pub fn histogram(values: &[f64], bins: usize) -> ProfileResult<Histogram> {
    let bins = require_bins(bins)?;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut any = false;
    for value in values.iter().copied().filter(|v| v.is_finite()) {
        any = true;
        min = min.min(value);
        max = max.max(value);
    }
    if !any {
        return Ok(Histogram::empty());
    }
    let bin_edges = bin_edges(min, max, bins);
    let counts = bin_counts(
        &bin_edges,
        values.iter().copied().filter(|v| v.is_finite()),
    );
    Ok(Histogram { counts, bin_edges })
}

/// Histogram over the finite entries of `(value, multiplicity)` pairs.
pub fn weighted_histogram<I>(values: I, bins: usize) -> ProfileResult<Histogram>
where
    I: IntoIterator<Item = (f64, u64)>,
{
    let bins = require_bins(bins)?;
    let finite: Vec<(f64, u64)> = values
        .into_iter()
        .filter(|(value, count)| value.is_finite() && *count > 0)
        .collect();
    let min = finite.iter().map(|(v, _)| *v).fold(f64::INFINITY, f64::min);
    let max = finite.iter().map(|(v, _)| *v).fold(f64::NEG_INFINITY, f64::max);
    if finite.is_empty() {
        return Ok(Histogram::empty());
    }
    let bin_edges = bin_edges(min, max, bins);
    let mut counts = vec![0u64; bins];
    for (value, count) in finite {
        counts[bin_index(&bin_edges, value)] += count;
    }
    Ok(Histogram { counts, bin_edges })
}
