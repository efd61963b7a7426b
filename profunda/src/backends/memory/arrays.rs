//! Array kernels used by the memory backend and by cluster partitions.

use arrow::array::{Array, ArrayRef, AsArray, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, TimestampNanosecondType};

use crate::error::{ProfileError, ProfileResult};
use crate::summary::value::nanosecond_timestamp;
use crate::summary::CellValue;

fn is_float(data_type: &DataType) -> bool {
    match data_type {
        DataType::Dictionary(_, values) => is_float(values),
        other => other.is_floating(),
    }
}

/// Every row as a float; `None` for null and NaN.
pub(crate) fn optional_numeric(array: &dyn Array) -> ProfileResult<Vec<Option<f64>>> {
    let casted = cast(array, &DataType::Float64)?;
    let floats = casted
        .as_primitive_opt::<Float64Type>()
        .ok_or_else(|| ProfileError::invalid_data("cast did not produce a Float64 array"))?;
    Ok(floats
        .iter()
        .map(|v| v.filter(|v| !v.is_nan()))
        .collect())
}

/// Non-missing values as floats in row order; infinities are kept.
pub(crate) fn numeric_values(array: &dyn Array) -> ProfileResult<Vec<f64>> {
    Ok(optional_numeric(array)?.into_iter().flatten().collect())
}

/// True for every null row, and every NaN row of a float column.
pub(crate) fn missing_mask(array: &dyn Array) -> ProfileResult<Vec<bool>> {
    if is_float(array.data_type()) {
        return Ok(optional_numeric(array)?
            .iter()
            .map(Option::is_none)
            .collect());
    }
    Ok((0..array.len()).map(|row| array.is_null(row)).collect())
}

/// Number of null (or NaN) rows.
pub(crate) fn missing_count(array: &dyn Array) -> ProfileResult<u64> {
    if is_float(array.data_type()) {
        return Ok(missing_mask(array)?.into_iter().filter(|m| *m).count() as u64);
    }
    Ok(array.null_count() as u64)
}

/// Casts a string-like column to `Utf8`.
pub(crate) fn utf8(array: &dyn Array) -> ProfileResult<ArrayRef> {
    Ok(cast(array, &DataType::Utf8)?)
}

pub(crate) fn as_strings(array: &ArrayRef) -> ProfileResult<&StringArray> {
    array
        .as_string_opt::<i32>()
        .ok_or_else(|| ProfileError::invalid_data("cast did not produce a Utf8 array"))
}

/// Non-null timestamps in nanoseconds since the epoch, row order.
pub(crate) fn timestamps(array: &dyn Array) -> ProfileResult<Vec<i64>> {
    let casted = cast(array, &nanosecond_timestamp())?;
    let timestamps = casted
        .as_primitive_opt::<TimestampNanosecondType>()
        .ok_or_else(|| ProfileError::invalid_data("cast did not produce a Timestamp(ns) array"))?;
    Ok(timestamps.iter().flatten().collect())
}

/// One key per row over several columns.
pub(crate) fn row_keys(arrays: &[ArrayRef]) -> ProfileResult<Vec<Vec<CellValue>>> {
    let columns = arrays
        .iter()
        .map(|array| crate::summary::cell_values(array.as_ref()))
        .collect::<ProfileResult<Vec<_>>>()?;
    let n_rows = arrays.first().map_or(0, |a| a.len());
    Ok((0..n_rows)
        .map(|row| columns.iter().map(|column| column[row].clone()).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float32Array, Int64Array, StringArray, TimestampSecondArray};
    use std::sync::Arc;

    #[test]
    fn test_numeric_values_drop_missing_keep_infinite() {
        let array = Float32Array::from(vec![Some(1.0), None, Some(f32::NAN), Some(f32::INFINITY)]);
        assert_eq!(numeric_values(&array).unwrap(), vec![1.0, f64::INFINITY]);
        assert_eq!(missing_count(&array).unwrap(), 2);
        assert_eq!(
            missing_mask(&array).unwrap(),
            vec![false, true, true, false]
        );
    }

    #[test]
    fn test_missing_count_non_float() {
        let array = Int64Array::from(vec![Some(1), None, None]);
        assert_eq!(missing_count(&array).unwrap(), 2);
    }

    #[test]
    fn test_timestamps() {
        let array = TimestampSecondArray::from(vec![Some(2), None, Some(1)]);
        assert_eq!(
            timestamps(&array).unwrap(),
            vec![2_000_000_000, 1_000_000_000]
        );
    }

    #[test]
    fn test_row_keys() {
        let a: ArrayRef = Arc::new(Int64Array::from(vec![1, 2]));
        let b: ArrayRef = Arc::new(StringArray::from(vec![Some("x"), None]));
        let keys = row_keys(&[a, b]).unwrap();
        assert_eq!(
            keys,
            vec![
                vec![CellValue::Integer(1), CellValue::from("x")],
                vec![CellValue::Integer(2), CellValue::Null],
            ]
        );
    }
}
