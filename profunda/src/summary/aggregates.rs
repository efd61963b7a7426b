//! Results of table-level aggregations.

use std::fmt;

use arrow::record_batch::RecordBatch;
use serde::Serialize;

/// Rows that occur more than once.
#[derive(Debug, Clone)]
pub struct Duplicates {
    /// Number of distinct rows occurring more than once.
    pub n_duplicates: u64,
    /// `n_duplicates` relative to the row count.
    pub p_duplicates: f64,
    /// The most frequent duplicated rows with their count column, if any.
    pub rows: Option<RecordBatch>,
}

impl Duplicates {
    /// Metrics of a table without duplicates.
    pub fn none() -> Self {
        Self {
            n_duplicates: 0,
            p_duplicates: 0.0,
            rows: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
    Head,
    Tail,
    Random,
}

impl SampleKind {
    pub const ALL: [SampleKind; 3] = [SampleKind::Head, SampleKind::Tail, SampleKind::Random];

    pub fn label(&self) -> &'static str {
        match self {
            SampleKind::Head => "First rows",
            SampleKind::Tail => "Last rows",
            SampleKind::Random => "Random sample",
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleKind::Head => "head",
            SampleKind::Tail => "tail",
            SampleKind::Random => "random",
        };
        f.write_str(name)
    }
}

/// A labelled set of rows.
#[derive(Debug, Clone)]
pub struct Sample {
    pub kind: SampleKind,
    pub name: String,
    pub data: RecordBatch,
}

impl Sample {
    pub fn new(kind: SampleKind, data: RecordBatch) -> Self {
        Self {
            kind,
            name: kind.label().to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingDiagramKind {
    Bar,
    Heatmap,
    Matrix,
}

impl fmt::Display for MissingDiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissingDiagramKind::Bar => "bar",
            MissingDiagramKind::Heatmap => "heatmap",
            MissingDiagramKind::Matrix => "matrix",
        };
        f.write_str(name)
    }
}

/// Missing (null or NaN) cells per column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingBar {
    pub columns: Vec<String>,
    pub missing: Vec<u64>,
    pub n_rows: u64,
}

impl MissingBar {
    /// Present cells per column.
    pub fn present(&self) -> Vec<u64> {
        self.missing.iter().map(|m| self.n_rows - m).collect()
    }
}

/// Correlation of missingness indicators between partially missing columns.
///
/// `mask[i][j]` hides the diagonal and the upper triangle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingHeatmap {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
    pub mask: Vec<Vec<bool>>,
}

impl MissingHeatmap {
    pub fn upper_triangle_mask(k: usize) -> Vec<Vec<bool>> {
        (0..k).map(|i| (0..k).map(|j| j >= i).collect()).collect()
    }
}

/// Per-row presence of every column, in row order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingMatrix {
    pub columns: Vec<String>,
    /// `present[c][r]` is true when column `c` has a value in row `r`.
    pub present: Vec<Vec<bool>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MissingDiagram {
    Bar(MissingBar),
    Heatmap(MissingHeatmap),
    Matrix(MissingMatrix),
}

impl MissingDiagram {
    pub fn kind(&self) -> MissingDiagramKind {
        match self {
            MissingDiagram::Bar(_) => MissingDiagramKind::Bar,
            MissingDiagram::Heatmap(_) => MissingDiagramKind::Heatmap,
            MissingDiagram::Matrix(_) => MissingDiagramKind::Matrix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_triangle_mask() {
        let mask = MissingHeatmap::upper_triangle_mask(3);
        assert_eq!(
            mask,
            vec![
                vec![true, true, true],
                vec![false, true, true],
                vec![false, false, true],
            ]
        );
    }

    #[test]
    fn test_missing_bar_present() {
        let bar = MissingBar {
            columns: vec!["a".into(), "b".into()],
            missing: vec![0, 3],
            n_rows: 5,
        };
        assert_eq!(bar.present(), vec![5, 2]);
    }

    #[test]
    fn test_sample_label() {
        assert_eq!(SampleKind::Tail.label(), "Last rows");
        assert_eq!(SampleKind::Random.to_string(), "random");
    }
}
