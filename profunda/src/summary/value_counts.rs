use std::collections::HashMap;

use serde::Serialize;

use super::value::CellValue;

/// Frequency table of a column's non-missing values.
///
/// `entries` is ordered by descending count, then ascending value, and may
/// be truncated for rendering. `n_distinct` and `n_unique` always describe
/// the full table, so derived metrics never depend on the cap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCounts {
    pub entries: Vec<(CellValue, u64)>,
    pub n_distinct: u64,
    pub n_unique: u64,
    pub n_missing: u64,
}

impl ValueCounts {
    /// Builds the table from raw counts. Null keys are counted as missing.
    pub fn from_counts(counts: HashMap<CellValue, u64>, n_missing: u64) -> Self {
        let mut n_missing = n_missing;
        let mut entries: Vec<(CellValue, u64)> = Vec::with_capacity(counts.len());
        for (value, count) in counts {
            if value.is_null() {
                n_missing += count;
            } else {
                entries.push((value, count));
            }
        }
        sort_entries(&mut entries);
        let n_unique = entries.iter().filter(|(_, count)| *count == 1).count() as u64;
        Self {
            n_distinct: entries.len() as u64,
            n_unique,
            n_missing,
            entries,
        }
    }

    /// Counts every value of an iterator.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = CellValue>,
    {
        let mut counts: HashMap<CellValue, u64> = HashMap::new();
        for value in values {
            *counts.entry(value).or_insert(0) += 1;
        }
        Self::from_counts(counts, 0)
    }

    /// Returns a copy keeping only the `n` most frequent entries.
    pub fn top(&self, n: usize) -> Self {
        Self {
            entries: self.entries.iter().take(n).cloned().collect(),
            ..self.clone()
        }
    }

    /// The most frequent value and its count.
    pub fn first(&self) -> Option<&(CellValue, u64)> {
        self.entries.first()
    }

    pub fn is_empty(&self) -> bool {
        self.n_distinct == 0
    }

    pub fn counts(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|(_, count)| *count)
    }
}

/// Sorts by descending count, ties by ascending value.
pub fn sort_entries(entries: &mut [(CellValue, u64)]) {
    entries.sort_unstable_by(|(va, ca), (vb, cb)| cb.cmp(ca).then_with(|| va.cmp(vb)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_and_totals() {
        let counts = ValueCounts::from_values(
            ["b", "a", "c", "a", "b", "d"].into_iter().map(CellValue::from),
        );
        assert_eq!(counts.n_distinct, 4);
        assert_eq!(counts.n_unique, 2);
        assert_eq!(
            counts.entries,
            vec![
                (CellValue::from("a"), 2),
                (CellValue::from("b"), 2),
                (CellValue::from("c"), 1),
                (CellValue::from("d"), 1),
            ]
        );
    }

    #[test]
    fn test_top_keeps_true_totals() {
        let counts = ValueCounts::from_values((0..10).map(CellValue::Integer));
        let top = counts.top(3);
        assert_eq!(top.entries.len(), 3);
        assert_eq!(top.n_distinct, 10);
        assert_eq!(top.n_unique, 10);
    }

    #[test]
    fn test_null_keys_are_missing() {
        let counts = ValueCounts::from_values(vec![
            CellValue::Null,
            CellValue::Boolean(true),
            CellValue::Null,
        ]);
        assert_eq!(counts.n_missing, 2);
        assert_eq!(counts.n_distinct, 1);
        assert_eq!(counts.first(), Some(&(CellValue::Boolean(true), 1)));
    }
}
