//! Per-partition partial states and their merges.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{ProfileError, ProfileResult};
use crate::stats::correlation::{CenteredPairSums, PairSums};
use crate::stats::quantile::OrderStatistics;
use crate::stats::{CentralMoments, MonotonicTracker};
use crate::summary::CellValue;

/// State computed independently on each partition and combined on the driver.
pub trait PartialState: Clone + Send + Sync + Debug {
    /// Merges partition states, in partition order.
    fn merge(states: Vec<Self>) -> ProfileResult<Self>
    where
        Self: Sized;
}

fn add_counts<K: Eq + Hash>(into: &mut HashMap<K, u64>, from: HashMap<K, u64>) {
    for (key, count) in from {
        *into.entry(key).or_insert(0) += count;
    }
}

fn add_slices(into: &mut [u64], from: &[u64]) -> ProfileResult<()> {
    if into.len() != from.len() {
        return Err(ProfileError::execution(format!(
            "cannot merge partial counts of length {} and {}",
            into.len(),
            from.len()
        )));
    }
    for (a, b) in into.iter_mut().zip(from) {
        *a += b;
    }
    Ok(())
}

/// Frequency of every value of a partition, nulls included.
#[derive(Debug, Clone, Default)]
pub struct CountsState {
    pub counts: HashMap<CellValue, u64>,
}

impl PartialState for CountsState {
    fn merge(states: Vec<Self>) -> ProfileResult<Self> {
        let mut merged = HashMap::new();
        for state in states {
            add_counts(&mut merged, state.counts);
        }
        Ok(Self { counts: merged })
    }
}

/// First-pass aggregates of a numeric partition.
#[derive(Debug, Clone)]
pub struct NumericState {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub finite_min: Option<f64>,
    pub finite_max: Option<f64>,
    pub n_infinite: u64,
    pub n_zeros: u64,
    pub n_negative: u64,
    /// Value frequencies keyed by bit pattern, for exact order statistics.
    pub frequencies: HashMap<u64, u64>,
    pub monotonic: MonotonicTracker,
}

impl Default for NumericState {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            finite_min: None,
            finite_max: None,
            n_infinite: 0,
            n_zeros: 0,
            n_negative: 0,
            frequencies: HashMap::new(),
            monotonic: MonotonicTracker::default(),
        }
    }
}

fn fold_option(a: Option<f64>, b: Option<f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, None) => a,
        (None, b) => b,
    }
}

impl NumericState {
    pub fn from_values(values: &[f64]) -> Self {
        let mut state = Self::default();
        for value in values.iter().copied() {
            state.count += 1;
            state.sum += value;
            state.min = state.min.min(value);
            state.max = state.max.max(value);
            if value.is_finite() {
                state.finite_min = fold_option(state.finite_min, Some(value), f64::min);
                state.finite_max = fold_option(state.finite_max, Some(value), f64::max);
            } else {
                state.n_infinite += 1;
            }
            if value == 0.0 {
                state.n_zeros += 1;
            } else if value < 0.0 {
                state.n_negative += 1;
            }
            // -0.0 and 0.0 share one key
            let key = if value == 0.0 { 0.0f64 } else { value };
            *state.frequencies.entry(key.to_bits()).or_insert(0) += 1;
            state.monotonic.push(value);
        }
        state
    }

    /// The merged frequencies as an ascending order-statistic table.
    pub fn order_statistics(&self) -> OrderStatistics {
        OrderStatistics::new(
            self.frequencies
                .iter()
                .map(|(bits, count)| (f64::from_bits(*bits), *count)),
        )
    }
}

impl PartialState for NumericState {
    fn merge(states: Vec<Self>) -> ProfileResult<Self> {
        let mut merged = Self::default();
        for state in states {
            merged.count += state.count;
            merged.sum += state.sum;
            merged.min = merged.min.min(state.min);
            merged.max = merged.max.max(state.max);
            merged.finite_min = fold_option(merged.finite_min, state.finite_min, f64::min);
            merged.finite_max = fold_option(merged.finite_max, state.finite_max, f64::max);
            merged.n_infinite += state.n_infinite;
            merged.n_zeros += state.n_zeros;
            merged.n_negative += state.n_negative;
            add_counts(&mut merged.frequencies, state.frequencies);
            merged.monotonic.append(&state.monotonic);
        }
        Ok(merged)
    }
}

/// Second-pass aggregates around the global mean and histogram edges.
#[derive(Debug, Clone, Default)]
pub struct SpreadState {
    pub moments: CentralMoments,
    pub bins: Vec<u64>,
}

impl PartialState for SpreadState {
    fn merge(states: Vec<Self>) -> ProfileResult<Self> {
        let mut states = states.into_iter();
        let Some(mut merged) = states.next() else {
            return Ok(Self::default());
        };
        for state in states {
            merged.moments.merge(&state.moments);
            add_slices(&mut merged.bins, &state.bins)?;
        }
        Ok(merged)
    }
}

/// Bucket counts over shared histogram edges.
#[derive(Debug, Clone, Default)]
pub struct BinState {
    pub bins: Vec<u64>,
}

impl PartialState for BinState {
    fn merge(states: Vec<Self>) -> ProfileResult<Self> {
        let mut states = states.into_iter();
        let Some(mut merged) = states.next() else {
            return Ok(Self::default());
        };
        for state in states {
            add_slices(&mut merged.bins, &state.bins)?;
        }
        Ok(merged)
    }
}

/// Text aggregates of a string partition.
#[derive(Debug, Clone, Default)]
pub struct TextState {
    /// Leading non-null values, at most the configured number.
    pub first_rows: Vec<String>,
    pub first_rows_limit: usize,
    /// Character length frequencies of non-null values.
    pub lengths: HashMap<u64, u64>,
    pub characters: HashMap<char, u64>,
    pub words: HashMap<String, u64>,
}

impl PartialState for TextState {
    fn merge(states: Vec<Self>) -> ProfileResult<Self> {
        let mut merged = Self::default();
        for state in states {
            merged.first_rows_limit = merged.first_rows_limit.max(state.first_rows_limit);
            let room = merged.first_rows_limit.saturating_sub(merged.first_rows.len());
            merged.first_rows.extend(state.first_rows.into_iter().take(room));
            add_counts(&mut merged.lengths, state.lengths);
            add_counts(&mut merged.characters, state.characters);
            add_counts(&mut merged.words, state.words);
        }
        Ok(merged)
    }
}

/// Range of a temporal partition, in nanoseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRangeState {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl PartialState for DateRangeState {
    fn merge(states: Vec<Self>) -> ProfileResult<Self> {
        Ok(states.into_iter().fold(Self::default(), |acc, state| Self {
            min: acc.min.into_iter().chain(state.min).min(),
            max: acc.max.into_iter().chain(state.max).max(),
        }))
    }
}

/// Missing counts per column.
#[derive(Debug, Clone, Default)]
pub struct MissingState {
    pub missing: Vec<u64>,
    pub rows: u64,
}

impl PartialState for MissingState {
    fn merge(states: Vec<Self>) -> ProfileResult<Self> {
        let mut states = states.into_iter();
        let Some(mut merged) = states.next() else {
            return Ok(Self::default());
        };
        for state in states {
            add_slices(&mut merged.missing, &state.missing)?;
            merged.rows += state.rows;
        }
        Ok(merged)
    }
}

/// First-pass Pearson sums for every column pair `i <= j`.
#[derive(Debug, Clone, Default)]
pub struct PairSumsState {
    pub sums: Vec<PairSums>,
}

impl PartialState for PairSumsState {
    fn merge(states: Vec<Self>) -> ProfileResult<Self> {
        let mut states = states.into_iter();
        let Some(mut merged) = states.next() else {
            return Ok(Self::default());
        };
        for state in states {
            for (a, b) in merged.sums.iter_mut().zip(&state.sums) {
                a.merge(b);
            }
        }
        Ok(merged)
    }
}

/// Second-pass Pearson sums for every column pair `i <= j`.
#[derive(Debug, Clone, Default)]
pub struct CenteredSumsState {
    pub sums: Vec<CenteredPairSums>,
}

impl PartialState for CenteredSumsState {
    fn merge(states: Vec<Self>) -> ProfileResult<Self> {
        let mut states = states.into_iter();
        let Some(mut merged) = states.next() else {
            return Ok(Self::default());
        };
        for state in states {
            for (a, b) in merged.sums.iter_mut().zip(&state.sums) {
                a.merge(b);
            }
        }
        Ok(merged)
    }
}

/// Row groups of a partition: count and first global row index.
#[derive(Debug, Clone, Default)]
pub struct DuplicateState {
    pub groups: HashMap<Vec<CellValue>, (u64, u64)>,
}

impl PartialState for DuplicateState {
    fn merge(states: Vec<Self>) -> ProfileResult<Self> {
        let mut merged: HashMap<Vec<CellValue>, (u64, u64)> = HashMap::new();
        for state in states {
            for (key, (count, first)) in state.groups {
                let entry = merged.entry(key).or_insert((0, first));
                entry.0 += count;
                entry.1 = entry.1.min(first);
            }
        }
        Ok(Self { groups: merged })
    }
}
