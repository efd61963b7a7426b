//! SQL text builders and result readers for the lazy backend.

use std::sync::Arc;

use arrow::array::{ArrayRef, AsArray};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use tracing::debug;

use crate::error::{ProfileError, ProfileResult};
use crate::logging::{truncate_field, LogConfig};

/// Largest finite double; `abs(x) <= MAX_FINITE` filters out infinities.
pub(crate) const MAX_FINITE: &str = "CAST(1.7976931348623157e308 AS DOUBLE)";

/// Quotes an identifier, doubling embedded quotes.
pub(crate) fn quote_identifier(identifier: &str) -> ProfileResult<String> {
    if identifier.contains('\0') {
        return Err(ProfileError::invalid_data(
            "SQL identifier cannot contain null bytes",
        ));
    }
    Ok(format!("\"{}\"", identifier.replace('"', "\"\"")))
}

/// A double literal that round-trips `value` exactly.
pub(crate) fn float_literal(value: f64) -> String {
    format!("CAST({value:e} AS DOUBLE)")
}

/// The column with NaN mapped to NULL, so NaN counts as missing.
///
/// `-0.0` is folded into `0.0`; the engine compares and hashes floats by
/// bit pattern.
pub(crate) fn value_expr(field: &Field) -> ProfileResult<String> {
    let column = quote_identifier(field.name())?;
    Ok(if field.data_type().is_floating() {
        format!(
            "CASE WHEN isnan({column}) THEN NULL \
             WHEN abs({column}) = 0 THEN abs({column}) ELSE {column} END"
        )
    } else {
        column
    })
}

/// True when the column is null or NaN.
pub(crate) fn missing_expr(field: &Field) -> ProfileResult<String> {
    let column = quote_identifier(field.name())?;
    Ok(if field.data_type().is_floating() {
        format!("({column} IS NULL OR isnan({column}))")
    } else {
        format!("{column} IS NULL")
    })
}

/// A derived table exposing the column as `v`.
pub(crate) fn column_source(table: &str, field: &Field) -> ProfileResult<String> {
    Ok(format!(
        "(SELECT {} AS v FROM {}) AS src",
        value_expr(field)?,
        quote_identifier(table)?
    ))
}

/// Bucket index of `expr` over `edges`, as evaluated by [`bin_index`].
///
/// [`bin_index`]: crate::stats::histogram::bin_index
pub(crate) fn bucket_expr(expr: &str, edges: &[f64]) -> String {
    let bins = edges.len().saturating_sub(1);
    if bins <= 1 {
        return "0".to_string();
    }
    let whens: Vec<String> = edges[1..bins]
        .iter()
        .enumerate()
        .map(|(i, edge)| format!("WHEN {expr} < {} THEN {i}", float_literal(*edge)))
        .collect();
    format!("CASE {} ELSE {} END", whens.join(" "), bins - 1)
}

/// Counts the finite values of `expr` in `from` per bucket of `edges`.
pub(crate) async fn bucket_counts(
    ctx: &SessionContext,
    log: &LogConfig,
    from: &str,
    expr: &str,
    edges: &[f64],
) -> ProfileResult<Vec<u64>> {
    let bins = edges.len().saturating_sub(1);
    if bins == 0 {
        return Err(ProfileError::invalid_config(
            "histogram needs at least two bin edges",
        ));
    }
    let mut counts = vec![0u64; bins];
    let sql = format!(
        "SELECT {} AS bucket, COUNT(*) AS cnt FROM {from} \
         WHERE {expr} IS NOT NULL AND abs({expr}) <= {MAX_FINITE} GROUP BY bucket",
        bucket_expr(expr, edges)
    );
    let batch = query(ctx, log, &sql).await?;
    for (bucket, count) in integers(&batch, 0)?.into_iter().zip(integers(&batch, 1)?) {
        let slot = usize::try_from(bucket)
            .ok()
            .and_then(|index| counts.get_mut(index))
            .ok_or_else(|| ProfileError::invalid_data(format!("bucket {bucket} out of range")))?;
        *slot += count as u64;
    }
    Ok(counts)
}

/// Runs `sql` and concatenates the result into one batch.
pub(crate) async fn query(
    ctx: &SessionContext,
    log: &LogConfig,
    sql: &str,
) -> ProfileResult<RecordBatch> {
    if log.log_queries {
        debug!(sql = %truncate_field(sql, log.max_field_length), "executing query");
    }
    let df = ctx.sql(sql).await?;
    let schema = Arc::new(df.schema().as_arrow().clone());
    let batches = df.collect().await?;
    Ok(concat_batches(&schema, &batches)?)
}

fn column_as(batch: &RecordBatch, index: usize, data_type: &DataType) -> ProfileResult<ArrayRef> {
    Ok(cast(column(batch, index)?, data_type)?)
}

/// Every row of a column as a float; nulls become `None`.
pub(crate) fn floats(batch: &RecordBatch, index: usize) -> ProfileResult<Vec<Option<f64>>> {
    let array = column_as(batch, index, &DataType::Float64)?;
    let floats = array
        .as_primitive_opt::<Float64Type>()
        .ok_or_else(|| ProfileError::invalid_data("expected a Float64 result column"))?;
    Ok(floats.iter().collect())
}

/// Every row of a column as an integer; nulls become 0.
pub(crate) fn integers(batch: &RecordBatch, index: usize) -> ProfileResult<Vec<i64>> {
    let array = column_as(batch, index, &DataType::Int64)?;
    let integers = array
        .as_primitive_opt::<Int64Type>()
        .ok_or_else(|| ProfileError::invalid_data("expected an Int64 result column"))?;
    Ok(integers.iter().map(|v| v.unwrap_or(0)).collect())
}

/// First-row float of an aggregate result.
pub(crate) fn scalar_f64(batch: &RecordBatch, index: usize) -> ProfileResult<Option<f64>> {
    Ok(floats(batch, index)?.first().copied().flatten())
}

/// First-row count of an aggregate result; NULL sums read as 0.
pub(crate) fn scalar_u64(batch: &RecordBatch, index: usize) -> ProfileResult<u64> {
    let value = integers(batch, index)?.first().copied().unwrap_or(0);
    u64::try_from(value).map_err(|_| ProfileError::invalid_data(format!("negative count {value}")))
}

/// A result column as returned by the engine.
pub(crate) fn column(batch: &RecordBatch, index: usize) -> ProfileResult<&ArrayRef> {
    if index >= batch.num_columns() {
        return Err(ProfileError::invalid_data(format!(
            "query result has no column {index}"
        )));
    }
    Ok(batch.column(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("a").unwrap(), "\"a\"");
        assert_eq!(quote_identifier("we\"ird").unwrap(), "\"we\"\"ird\"");
        assert_eq!(quote_identifier("Unnamed: 2").unwrap(), "\"Unnamed: 2\"");
        assert!(quote_identifier("bad\0").is_err());
    }

    #[test]
    fn test_float_literal_round_trips() {
        for value in [0.1, -2.5, 1.0 / 3.0, 1e-300, 123456789.125] {
            let literal = float_literal(value);
            let inner = &literal["CAST(".len()..literal.len() - " AS DOUBLE)".len()];
            assert_eq!(inner.parse::<f64>().unwrap(), value);
        }
    }

    #[test]
    fn test_bucket_expr() {
        assert_eq!(bucket_expr("x", &[0.0, 1.0]), "0");
        let expr = bucket_expr("x", &[0.0, 1.0, 2.0, 3.0]);
        assert!(expr.starts_with("CASE WHEN x < CAST(1e0 AS DOUBLE) THEN 0"));
        assert!(expr.ends_with("ELSE 2 END"));
    }

    #[test]
    fn test_value_expr_nulls_nan() {
        let float = Field::new("f", DataType::Float64, true);
        assert_eq!(
            value_expr(&float).unwrap(),
            "CASE WHEN isnan(\"f\") THEN NULL \
             WHEN abs(\"f\") = 0 THEN abs(\"f\") ELSE \"f\" END"
        );
        let int = Field::new("i", DataType::Int64, true);
        assert_eq!(value_expr(&int).unwrap(), "\"i\"");
        assert_eq!(missing_expr(&int).unwrap(), "\"i\" IS NULL");
    }
}
