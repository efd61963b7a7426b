//! Shared datasets for tests and benchmarks.
//!
//! Every fixture is a plain [`RecordBatch`]; [`frames`] wraps one batch in
//! each compiled backend so the same data can be profiled everywhere.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::backends::memory::MemoryFrame;
use crate::error::ProfileResult;
use crate::frame::Frame;

/// Builds a batch from named arrays; every field is nullable.
pub fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let arrays = columns.into_iter().map(|(_, array)| array).collect();
    match RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays) {
        Ok(batch) => batch,
        Err(err) => panic!("invalid fixture: {err}"),
    }
}

/// Ten customers with one column per semantic type and assorted gaps.
pub fn customers() -> RecordBatch {
    batch(vec![
        (
            "age",
            Arc::new(Int64Array::from(vec![
                Some(34),
                Some(27),
                None,
                Some(45),
                Some(27),
                Some(61),
                Some(19),
                Some(27),
                None,
                Some(38),
            ])),
        ),
        (
            "score",
            Arc::new(Float64Array::from(vec![
                Some(0.5),
                Some(1.5),
                Some(f64::NAN),
                Some(-2.0),
                Some(0.0),
                None,
                Some(3.25),
                Some(1.5),
                Some(0.75),
                Some(2.0),
            ])),
        ),
        (
            "city",
            Arc::new(StringArray::from(vec![
                Some("Lisbon"),
                Some("Porto"),
                Some("Lisbon"),
                None,
                Some("Faro"),
                Some("Lisbon"),
                Some("Porto"),
                Some("Braga"),
                None,
                Some("Lisbon"),
            ])),
        ),
        (
            "active",
            Arc::new(BooleanArray::from(vec![
                Some(true),
                Some(false),
                Some(true),
                Some(true),
                None,
                Some(false),
                Some(true),
                Some(true),
                Some(false),
                None,
            ])),
        ),
        (
            "joined",
            Arc::new(Date32Array::from(vec![
                Some(18_000),
                Some(18_400),
                None,
                Some(19_000),
                Some(18_250),
                Some(19_500),
                Some(18_000),
                None,
                Some(19_250),
                Some(18_900),
            ])),
        ),
    ])
}

/// Seven rows where `(a, b)` repeats three and two times.
pub fn duplicated_rows() -> RecordBatch {
    batch(vec![
        (
            "a",
            Arc::new(Int64Array::from(vec![1, 2, 1, 3, 2, 1, 4])),
        ),
        (
            "b",
            Arc::new(StringArray::from(vec!["x", "y", "x", "z", "y", "x", "w"])),
        ),
    ])
}

/// Two linearly related columns and an independent one, `n` rows.
pub fn correlated(n: usize) -> RecordBatch {
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
    let z: Vec<f64> = (0..n).map(|i| ((i * 7919) % 13) as f64).collect();
    batch(vec![
        ("x", Arc::new(Float64Array::from(x))),
        ("y", Arc::new(Float64Array::from(y))),
        ("z", Arc::new(Float64Array::from(z))),
    ])
}

/// A schema with zero rows for every semantic type.
pub fn empty() -> RecordBatch {
    RecordBatch::new_empty(Arc::new(Schema::new(vec![
        Field::new("n", DataType::Float64, true),
        Field::new("m", DataType::Int64, true),
        Field::new("s", DataType::Utf8, true),
        Field::new("b", DataType::Boolean, true),
    ])))
}

/// `batch` wrapped in every compiled backend, memory first.
///
/// The cluster frame splits the rows into `partitions` partitions; the lazy
/// frame registers the batch as `table` in a fresh session.
pub async fn frames(batch: &RecordBatch, partitions: usize) -> ProfileResult<Vec<Frame>> {
    let mut frames = vec![Frame::Memory(MemoryFrame::new(batch.clone()))];
    #[cfg(feature = "cluster")]
    frames.push(Frame::Cluster(
        crate::backends::cluster::ClusterFrame::from_batch(batch, partitions),
    ));
    #[cfg(not(feature = "cluster"))]
    let _ = partitions;
    #[cfg(feature = "lazy")]
    frames.push(Frame::Lazy(
        crate::backends::lazy::LazyFrame::from_batch("profiled", batch.clone()).await?,
    ));
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_cover_compiled_backends() {
        let frames = frames(&customers(), 3).await.unwrap();
        let expected = 1 + usize::from(cfg!(feature = "cluster")) + usize::from(cfg!(feature = "lazy"));
        assert_eq!(frames.len(), expected);
        for frame in &frames {
            assert_eq!(frame.column_names().len(), 5);
        }
    }

    #[test]
    fn test_fixture_shapes() {
        assert_eq!(customers().num_rows(), 10);
        assert_eq!(duplicated_rows().num_rows(), 7);
        assert_eq!(correlated(50).num_rows(), 50);
        assert_eq!(empty().num_rows(), 0);
    }
}
