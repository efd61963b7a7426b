//! The same data profiled on every compiled backend yields the same
//! statistics, within floating-point tolerance.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array};
use profunda::prelude::*;
use profunda::stats::Histogram;
use profunda::summary::MissingDiagram;
use profunda::test_fixtures::{batch, correlated, customers, duplicated_rows, frames};

const NUMERIC_KEYS: &[&str] = &[
    "n", "count", "n_missing", "p_missing", "n_distinct", "p_distinct", "n_unique", "p_unique",
    "is_unique", "mean", "std", "variance", "min", "max", "sum", "kurtosis", "skewness", "mad",
    "range", "n_infinite", "p_infinite", "n_zeros", "p_zeros", "n_negative", "p_negative", "5%",
    "25%", "50%", "75%", "95%", "iqr", "cv", "histogram", "type",
];

const CATEGORICAL_KEYS: &[&str] = &[
    "n", "count", "n_missing", "n_distinct", "n_unique", "is_unique", "max_length", "min_length",
    "mean_length", "median_length", "histogram_length", "imbalance", "type",
];

const BOOLEAN_KEYS: &[&str] = &[
    "n", "count", "n_missing", "n_distinct", "top", "freq", "imbalance", "type",
];

const DATE_KEYS: &[&str] = &[
    "n", "count", "n_missing", "n_distinct", "min", "max", "range", "histogram",
    "n_invalid_dates", "p_invalid_dates", "type",
];

fn close(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b || (a - b).abs() <= 1e-9 * a.abs().max(1.0)
}

fn assert_histograms_close(key: &str, a: &Histogram, b: &Histogram) {
    assert_eq!(a.counts, b.counts, "{key}: histogram counts");
    assert_eq!(a.bin_edges.len(), b.bin_edges.len(), "{key}: histogram edges");
    for (x, y) in a.bin_edges.iter().zip(&b.bin_edges) {
        assert!(close(*x, *y), "{key}: edge {x} != {y}");
    }
}

fn assert_summaries_match(
    backend: BackendKind,
    column: &str,
    keys: &[&str],
    expected: &ColumnSummary,
    actual: &ColumnSummary,
) {
    for key in keys {
        let context = format!("{backend} {column}.{key}");
        let a = expected.get(key).unwrap_or_else(|| panic!("{context}: missing on memory"));
        let b = actual.get(key).unwrap_or_else(|| panic!("{context}: missing"));
        match (a, b) {
            (SummaryValue::Double(x), SummaryValue::Double(y)) => {
                assert!(close(*x, *y), "{context}: {x} != {y}")
            }
            (SummaryValue::Histogram(x), SummaryValue::Histogram(y)) => {
                assert_histograms_close(&context, x, y)
            }
            _ => assert_eq!(a, b, "{context}"),
        }
    }
}

async fn profile(frame: &Frame) -> Description {
    Profiler::builder()
        .registry(DispatchRegistry::with_builtin())
        .build()
        .unwrap()
        .describe(frame)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_column_statistics_match_across_backends() {
    let frames = frames(&customers(), 3).await.unwrap();
    let reference = profile(&frames[0]).await;

    for frame in &frames[1..] {
        let description = profile(frame).await;
        assert_eq!(description.backend, frame.backend());
        for (column, keys) in [
            ("age", NUMERIC_KEYS),
            ("score", NUMERIC_KEYS),
            ("city", CATEGORICAL_KEYS),
            ("active", BOOLEAN_KEYS),
            ("joined", DATE_KEYS),
        ] {
            assert_summaries_match(
                frame.backend(),
                column,
                keys,
                reference.variable(column).unwrap(),
                description.variable(column).unwrap(),
            );
        }
        assert_eq!(description.table.n, reference.table.n);
        assert_eq!(description.table.n_cells_missing, reference.table.n_cells_missing);
        assert_eq!(description.table.types, reference.table.types);
    }
}

#[tokio::test]
async fn test_nan_counts_as_missing_everywhere() {
    for frame in frames(&customers(), 2).await.unwrap() {
        let description = profile(&frame).await;
        let score = description.variable("score").unwrap();
        assert_eq!(score.count("n_missing").unwrap(), 2, "{}", frame.backend());
        assert_eq!(score.count("count").unwrap(), 8, "{}", frame.backend());
    }
}

#[tokio::test]
async fn test_negative_zero_is_zero_everywhere() {
    let data = batch(vec![(
        "x",
        Arc::new(Float64Array::from(vec![-0.0, 0.0, 1.0, 2.0])) as ArrayRef,
    )]);
    for frame in frames(&data, 2).await.unwrap() {
        let backend = frame.backend();
        let description = profile(&frame).await;
        let x = description.variable("x").unwrap();
        assert_eq!(x.count("n_zeros").unwrap(), 2, "{backend}");
        assert_eq!(x.count("n_negative").unwrap(), 0, "{backend}");
        assert_eq!(x.count("n_distinct").unwrap(), 3, "{backend}");
        assert_eq!(x.get("is_unique"), Some(&SummaryValue::Boolean(false)), "{backend}");

        let duplicates = description.duplicates.unwrap();
        assert_eq!(duplicates.n_duplicates, 1, "{backend}");
    }
}

#[tokio::test]
async fn test_duplicates_match_across_backends() {
    let frames = frames(&duplicated_rows(), 2).await.unwrap();
    let reference = profile(&frames[0]).await.duplicates.unwrap();
    assert_eq!(reference.n_duplicates, 2);

    for frame in &frames[1..] {
        let duplicates = profile(frame).await.duplicates.unwrap();
        assert_eq!(duplicates.n_duplicates, reference.n_duplicates, "{}", frame.backend());
        assert!(close(duplicates.p_duplicates, reference.p_duplicates));
        let expected = reference.rows.as_ref().unwrap();
        let actual = duplicates.rows.as_ref().unwrap();
        assert_eq!(actual.num_rows(), expected.num_rows());
        assert_eq!(
            actual.column_by_name("# duplicates").unwrap(),
            expected.column_by_name("# duplicates").unwrap(),
            "{}",
            frame.backend()
        );
    }
}

#[tokio::test]
async fn test_pearson_matches_across_backends() {
    let frames = frames(&correlated(40), 4).await.unwrap();
    let reference = profile(&frames[0]).await;
    let expected = &reference.correlations[&CorrelationMethod::Pearson];
    assert!(close(expected.get("x", "y").unwrap(), 1.0));

    for frame in &frames[1..] {
        let description = profile(frame).await;
        let matrix = &description.correlations[&CorrelationMethod::Pearson];
        assert_eq!(matrix.columns, expected.columns);
        for (row, expected_row) in matrix.values.iter().zip(&expected.values) {
            for (a, b) in row.iter().zip(expected_row) {
                assert!(close(*a, *b), "{}: {a} != {b}", frame.backend());
            }
        }
    }
}

#[tokio::test]
async fn test_missing_bar_matches_across_backends() {
    let frames = frames(&customers(), 3).await.unwrap();
    let bar = |description: &Description| {
        description
            .missing
            .iter()
            .find_map(|diagram| match diagram {
                MissingDiagram::Bar(bar) => Some(bar.clone()),
                _ => None,
            })
            .unwrap()
    };
    let reference = bar(&profile(&frames[0]).await);
    assert_eq!(reference.missing, vec![2, 2, 2, 2, 2]);
    for frame in &frames[1..] {
        assert_eq!(bar(&profile(frame).await), reference, "{}", frame.backend());
    }
}
