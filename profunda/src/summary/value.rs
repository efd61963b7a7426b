//! Individual cell values and their extraction from Arrow arrays.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type, TimeUnit, TimestampNanosecondType};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::DateTime;
use serde::Serialize;

use crate::error::{ProfileError, ProfileResult};

/// A single scalar taken from a column.
///
/// Float NaN never appears as a value: extraction maps it to [`CellValue::Null`].
/// Ordering puts nulls last and compares floats with `total_cmp`, so value
/// counts and duplicate rows break ties the same way on every backend.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Nanoseconds since the Unix epoch.
    Timestamp(i64),
    Null,
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Builds a float cell; NaN becomes null and negative zero is folded into zero.
    pub fn float(value: f64) -> Self {
        if value.is_nan() {
            CellValue::Null
        } else {
            CellValue::Float(value + 0.0)
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v),
            CellValue::Timestamp(v) => Some(*v as f64),
            CellValue::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(v) => Some(v),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Boolean(_) => 0,
            CellValue::Integer(_) => 1,
            CellValue::Float(_) => 2,
            CellValue::Text(_) => 3,
            CellValue::Timestamp(_) => 4,
            CellValue::Null => 5,
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (CellValue::Boolean(a), CellValue::Boolean(b)) => a.cmp(b),
            (CellValue::Integer(a), CellValue::Integer(b)) => a.cmp(b),
            (CellValue::Float(a), CellValue::Float(b)) => a.total_cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Timestamp(a), CellValue::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            CellValue::Boolean(v) => v.hash(state),
            CellValue::Integer(v) | CellValue::Timestamp(v) => v.hash(state),
            CellValue::Float(v) => v.to_bits().hash(state),
            CellValue::Text(v) => v.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Boolean(v) => write!(f, "{v}"),
            CellValue::Integer(v) => write!(f, "{v}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Text(v) => f.write_str(v),
            CellValue::Timestamp(v) => write!(f, "{}", DateTime::from_timestamp_nanos(*v).naive_utc()),
            CellValue::Null => f.write_str("null"),
        }
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::float(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

/// How a physical Arrow type is read into [`CellValue`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Boolean,
    Integer,
    Float,
    Text,
    Timestamp,
    Display,
}

fn cell_kind(data_type: &DataType) -> CellKind {
    match data_type {
        DataType::Dictionary(_, values) => cell_kind(values),
        DataType::Boolean => CellKind::Boolean,
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => CellKind::Integer,
        // UInt64 does not fit i64; read it as a float instead of losing rows to null
        DataType::UInt64
        | DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => CellKind::Float,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => CellKind::Text,
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => CellKind::Timestamp,
        _ => CellKind::Display,
    }
}

/// The canonical timestamp type every temporal column is cast to.
pub fn nanosecond_timestamp() -> DataType {
    DataType::Timestamp(TimeUnit::Nanosecond, None)
}

/// Reads every row of `array` as a [`CellValue`].
pub fn cell_values(array: &dyn Array) -> ProfileResult<Vec<CellValue>> {
    let values = match cell_kind(array.data_type()) {
        CellKind::Boolean => {
            let casted = cast(array, &DataType::Boolean)?;
            let booleans = casted
                .as_boolean_opt()
                .ok_or_else(|| downcast_error("boolean"))?;
            booleans
                .iter()
                .map(|v| v.map_or(CellValue::Null, CellValue::Boolean))
                .collect()
        }
        CellKind::Integer => {
            let casted = cast(array, &DataType::Int64)?;
            let ints = casted
                .as_primitive_opt::<Int64Type>()
                .ok_or_else(|| downcast_error("Int64"))?;
            ints.iter()
                .map(|v| v.map_or(CellValue::Null, CellValue::Integer))
                .collect()
        }
        CellKind::Float => {
            let casted = cast(array, &DataType::Float64)?;
            let floats = casted
                .as_primitive_opt::<Float64Type>()
                .ok_or_else(|| downcast_error("Float64"))?;
            floats
                .iter()
                .map(|v| v.map_or(CellValue::Null, CellValue::float))
                .collect()
        }
        CellKind::Text => {
            let casted = cast(array, &DataType::Utf8)?;
            let strings = casted
                .as_string_opt::<i32>()
                .ok_or_else(|| downcast_error("Utf8"))?;
            strings
                .iter()
                .map(|v| v.map_or(CellValue::Null, CellValue::from))
                .collect()
        }
        CellKind::Timestamp => {
            let casted = cast(array, &nanosecond_timestamp())?;
            let timestamps = casted
                .as_primitive_opt::<TimestampNanosecondType>()
                .ok_or_else(|| downcast_error("Timestamp(ns)"))?;
            timestamps
                .iter()
                .map(|v| v.map_or(CellValue::Null, CellValue::Timestamp))
                .collect()
        }
        CellKind::Display => {
            let options = FormatOptions::default();
            let formatter = ArrayFormatter::try_new(array, &options)?;
            (0..array.len())
                .map(|row| {
                    if array.is_null(row) {
                        CellValue::Null
                    } else {
                        CellValue::Text(formatter.value(row).to_string())
                    }
                })
                .collect()
        }
    };
    Ok(values)
}

fn downcast_error(target: &str) -> ProfileError {
    ProfileError::invalid_data(format!("cast did not produce a {target} array"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int32Array, StringArray, TimestampMillisecondArray};

    #[test]
    fn test_nan_is_null() {
        let array = Float64Array::from(vec![Some(1.5), Some(f64::NAN), None, Some(-0.0)]);
        let values = cell_values(&array).unwrap();
        assert_eq!(
            values,
            vec![
                CellValue::Float(1.5),
                CellValue::Null,
                CellValue::Null,
                CellValue::Float(0.0)
            ]
        );
    }

    #[test]
    fn test_integer_and_text_extraction() {
        let ints = Int32Array::from(vec![Some(3), None]);
        assert_eq!(
            cell_values(&ints).unwrap(),
            vec![CellValue::Integer(3), CellValue::Null]
        );

        let strings = StringArray::from(vec![Some("a"), None]);
        assert_eq!(
            cell_values(&strings).unwrap(),
            vec![CellValue::Text("a".into()), CellValue::Null]
        );
    }

    #[test]
    fn test_timestamps_normalized_to_nanoseconds() {
        let millis = TimestampMillisecondArray::from(vec![Some(1_000), None]);
        assert_eq!(
            cell_values(&millis).unwrap(),
            vec![CellValue::Timestamp(1_000_000_000), CellValue::Null]
        );
    }

    #[test]
    fn test_ordering_nulls_last() {
        let mut values = vec![
            CellValue::Null,
            CellValue::Float(2.0),
            CellValue::Float(-1.0),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![CellValue::Float(-1.0), CellValue::Float(2.0), CellValue::Null]
        );
    }
}
