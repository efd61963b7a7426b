//! Backend seams.
//!
//! A backend provides one [`Describer`] per [`DescribeOp`] and one
//! [`TableAggregator`]. Both are looked up through the
//! [`DispatchRegistry`](crate::registry::DispatchRegistry) by backend kind.

use std::fmt::{self, Debug};

use async_trait::async_trait;

use crate::config::Settings;
use crate::error::ProfileResult;
use crate::frame::{BackendKind, Column, Frame};
use crate::stats::{CorrelationMatrix, CorrelationMethod};
use crate::summary::{
    ColumnSummary, Duplicates, MissingBar, MissingHeatmap, MissingMatrix, Sample, SampleKind,
};
use crate::types::SemanticType;

#[cfg(feature = "cluster")]
pub mod cluster;
#[cfg(feature = "lazy")]
pub mod lazy;
pub mod memory;
pub(crate) mod shared;

/// A per-column statistic stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescribeOp {
    Counts,
    Generic,
    Supported,
    Numeric,
    Categorical,
    Boolean,
    DateTime,
}

impl DescribeOp {
    pub const ALL: [DescribeOp; 7] = [
        DescribeOp::Counts,
        DescribeOp::Generic,
        DescribeOp::Supported,
        DescribeOp::Numeric,
        DescribeOp::Categorical,
        DescribeOp::Boolean,
        DescribeOp::DateTime,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DescribeOp::Counts => "describe_counts",
            DescribeOp::Generic => "describe_generic",
            DescribeOp::Supported => "describe_supported",
            DescribeOp::Numeric => "describe_numeric",
            DescribeOp::Categorical => "describe_categorical",
            DescribeOp::Boolean => "describe_boolean",
            DescribeOp::DateTime => "describe_date",
        }
    }

    /// The type-specific stage for a semantic type, if it has one.
    pub fn for_type(semantic_type: SemanticType) -> Option<DescribeOp> {
        match semantic_type {
            SemanticType::Numeric => Some(DescribeOp::Numeric),
            SemanticType::Categorical => Some(DescribeOp::Categorical),
            SemanticType::Boolean => Some(DescribeOp::Boolean),
            SemanticType::DateTime => Some(DescribeOp::DateTime),
            SemanticType::Unsupported => None,
        }
    }

    /// The stages run for a semantic type, in order.
    pub fn chain(semantic_type: SemanticType) -> Vec<DescribeOp> {
        match DescribeOp::for_type(semantic_type) {
            Some(specific) => vec![
                DescribeOp::Counts,
                DescribeOp::Generic,
                specific,
                DescribeOp::Supported,
            ],
            None => vec![DescribeOp::Counts, DescribeOp::Generic],
        }
    }
}

impl fmt::Display for DescribeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fold stage over a column summary.
///
/// Implementations read the keys of earlier stages, add their own and
/// return the summary. They never mutate the column or the settings.
#[async_trait]
pub trait Describer: Send + Sync + Debug {
    async fn describe(
        &self,
        settings: &Settings,
        column: &Column,
        summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary>;
}

/// Whether a backend can produce an optional artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum Capability<T> {
    Supported(T),
    /// Carries the reason shown in the degradation warning.
    Unsupported(String),
}

impl<T> Capability<T> {
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Capability::Unsupported(reason.into())
    }

    pub fn supported(self) -> Option<T> {
        match self {
            Capability::Supported(value) => Some(value),
            Capability::Unsupported(_) => None,
        }
    }
}

/// Whole-table aggregations of one backend.
///
/// The orchestrator handles the shared preconditions (disabled features,
/// empty tables, too few columns) before calling in.
#[async_trait]
pub trait TableAggregator: Send + Sync + Debug {
    fn backend(&self) -> BackendKind;

    async fn row_count(&self, frame: &Frame) -> ProfileResult<u64>;

    /// Duplicate rows over `columns` of a non-empty table.
    async fn duplicates(
        &self,
        settings: &Settings,
        frame: &Frame,
        columns: &[String],
        n_rows: u64,
    ) -> ProfileResult<Duplicates>;

    /// Correlation matrix of at least two numeric `columns`.
    async fn correlation(
        &self,
        frame: &Frame,
        method: CorrelationMethod,
        columns: &[String],
    ) -> ProfileResult<CorrelationMatrix>;

    async fn missing_bar(&self, frame: &Frame) -> ProfileResult<MissingBar>;

    async fn missing_heatmap(&self, frame: &Frame) -> ProfileResult<MissingHeatmap>;

    async fn missing_matrix(&self, frame: &Frame) -> ProfileResult<Capability<MissingMatrix>>;

    /// Up to `n` rows of a non-empty table.
    async fn sample(
        &self,
        settings: &Settings,
        frame: &Frame,
        kind: SampleKind,
        n: usize,
    ) -> ProfileResult<Capability<Sample>>;
}

/// Columns of a missing-value heatmap: those with some, but not all, values missing.
pub(crate) fn heatmap_columns(bar: &MissingBar) -> Vec<usize> {
    bar.missing
        .iter()
        .enumerate()
        .filter(|(_, missing)| **missing > 0 && **missing < bar.n_rows)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_order() {
        assert_eq!(
            DescribeOp::chain(SemanticType::Numeric),
            vec![
                DescribeOp::Counts,
                DescribeOp::Generic,
                DescribeOp::Numeric,
                DescribeOp::Supported
            ]
        );
        assert_eq!(
            DescribeOp::chain(SemanticType::Unsupported),
            vec![DescribeOp::Counts, DescribeOp::Generic]
        );
    }

    #[test]
    fn test_capability() {
        assert_eq!(Capability::Supported(3).supported(), Some(3));
        assert_eq!(Capability::<i32>::unsupported("no").supported(), None);
    }

    #[test]
    fn test_heatmap_columns() {
        let bar = MissingBar {
            columns: vec!["a".into(), "b".into(), "c".into()],
            missing: vec![0, 2, 4],
            n_rows: 4,
        };
        assert_eq!(heatmap_columns(&bar), vec![1]);
    }
}
