//! Statistical kernels shared by every backend.
//!
//! Backends differ in how they collect counts, sums and order statistics;
//! the arithmetic that turns those into reported values is defined here.

pub mod correlation;
pub mod entropy;
pub mod histogram;
pub mod moments;
pub mod quantile;

pub use correlation::{CorrelationMatrix, CorrelationMethod};
pub use histogram::Histogram;
pub use moments::CentralMoments;

/// `numerator / denominator`, or 0.0 when the denominator is zero.
pub fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Direction of a sequence of values in row order.
///
/// 2 strictly increasing, 1 increasing, -1 decreasing, -2 strictly
/// decreasing, 0 neither. An empty or single-value sequence is strictly
/// increasing.
pub fn monotonic(values: &[f64]) -> i64 {
    let mut tracker = MonotonicTracker::default();
    for value in values {
        tracker.push(*value);
    }
    tracker.finish()
}

/// Incremental form of [`monotonic`] that partitions can be merged into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonotonicTracker {
    first: Option<f64>,
    last: Option<f64>,
    increasing: bool,
    strictly_increasing: bool,
    decreasing: bool,
    strictly_decreasing: bool,
}

impl Default for MonotonicTracker {
    fn default() -> Self {
        Self {
            first: None,
            last: None,
            increasing: true,
            strictly_increasing: true,
            decreasing: true,
            strictly_decreasing: true,
        }
    }
}

impl MonotonicTracker {
    pub fn push(&mut self, value: f64) {
        if let Some(previous) = self.last {
            self.step(previous, value);
        } else {
            self.first = Some(value);
        }
        self.last = Some(value);
    }

    fn step(&mut self, previous: f64, next: f64) {
        self.increasing &= previous <= next;
        self.strictly_increasing &= previous < next;
        self.decreasing &= previous >= next;
        self.strictly_decreasing &= previous > next;
    }

    /// Appends the tracker of the following partition.
    pub fn append(&mut self, next: &Self) {
        let Some(next_first) = next.first else {
            return;
        };
        if let Some(previous) = self.last {
            self.step(previous, next_first);
        } else {
            self.first = next.first;
        }
        self.increasing &= next.increasing;
        self.strictly_increasing &= next.strictly_increasing;
        self.decreasing &= next.decreasing;
        self.strictly_decreasing &= next.strictly_decreasing;
        self.last = next.last;
    }

    pub fn finish(&self) -> i64 {
        if self.strictly_increasing {
            2
        } else if self.increasing {
            1
        } else if self.strictly_decreasing {
            -2
        } else if self.decreasing {
            -1
        } else {
            0
        }
    }
}
