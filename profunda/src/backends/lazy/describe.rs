use std::collections::HashMap;

use arrow::array::Array;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use tracing::{debug, instrument};

use super::sql::{
    bucket_counts, column, float_literal, floats, integers, query, quote_identifier, scalar_f64,
    scalar_u64, MAX_FINITE,
};
use crate::backends::memory::arrays::timestamps;
use crate::backends::shared::{
    self, epoch_seconds, quantile_probes, DateStats, LengthStats, NumericStats,
};
use crate::backends::Describer;
use crate::config::Settings;
use crate::error::{ProfileError, ProfileResult};
use crate::frame::{BackendKind, Column};
use crate::log_column_stage;
use crate::logging::LogConfig;
use crate::stats::histogram::{bin_edges, require_bins};
use crate::stats::quantile::{lerp, position};
use crate::stats::{CentralMoments, Histogram};
use crate::summary::value_counts::sort_entries;
use crate::summary::{cell_values, ColumnSummary, ValueCounts};

/// Distinct and singleton counts of the non-missing values of `src`.
async fn distinct_totals(ctx: &SessionContext, log: &LogConfig, src: &str) -> ProfileResult<(u64, u64)> {
    let batch = query(
        ctx,
        log,
        &format!(
            "SELECT COUNT(*) AS n_distinct, SUM(CASE WHEN cnt = 1 THEN 1 ELSE 0 END) AS n_unique \
             FROM (SELECT v, COUNT(*) AS cnt FROM {src} WHERE v IS NOT NULL GROUP BY v) AS groups"
        ),
    )
    .await?;
    Ok((scalar_u64(&batch, 0)?, scalar_u64(&batch, 1)?))
}

/// Top value counts pushed down as `GROUP BY ... ORDER BY ... LIMIT`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LazyCounts;

#[async_trait]
impl Describer for LazyCounts {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let lazy = column.as_lazy()?;
        let (ctx, log) = (lazy.context(), &settings.log);
        let src = lazy.source()?;

        let top = query(
            ctx,
            log,
            &format!(
                "SELECT v, COUNT(*) AS cnt FROM {src} WHERE v IS NOT NULL \
                 GROUP BY v ORDER BY cnt DESC, v ASC LIMIT {}",
                settings.value_counts_top_n
            ),
        )
        .await?;
        let mut entries: Vec<_> = cell_values(column_ref(&top, 0)?)?
            .into_iter()
            .zip(integers(&top, 1)?.into_iter().map(|count| count as u64))
            .collect();
        sort_entries(&mut entries);

        let (n_distinct, n_unique) = distinct_totals(ctx, log, &src).await?;
        let missing = query(
            ctx,
            log,
            &format!("SELECT COUNT(*) - COUNT(v) AS n_missing FROM {src}"),
        )
        .await?;

        let value_counts = ValueCounts {
            entries,
            n_distinct,
            n_unique,
            n_missing: scalar_u64(&missing, 0)?,
        };
        shared::write_counts(settings, value_counts, &mut summary);
        Ok(summary)
    }
}

fn column_ref(batch: &RecordBatch, index: usize) -> ProfileResult<&dyn Array> {
    Ok(column(batch, index)?.as_ref())
}

/// Row count; the in-memory footprint of a lazy table is unknown and
/// reported as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct LazyGeneric;

#[async_trait]
impl Describer for LazyGeneric {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let lazy = column.as_lazy()?;
        let batch = query(
            lazy.context(),
            &settings.log,
            &format!("SELECT COUNT(*) AS n FROM {}", quote_identifier(lazy.table())?),
        )
        .await?;
        shared::write_generic(scalar_u64(&batch, 0)?, 0, &mut summary)?;
        Ok(summary)
    }
}

/// Distinctness from full `GROUP BY` totals, independent of the top-N cap.
#[derive(Debug, Clone, Copy, Default)]
pub struct LazySupported;

#[async_trait]
impl Describer for LazySupported {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let lazy = column.as_lazy()?;
        let (n_distinct, n_unique) =
            distinct_totals(lazy.context(), &settings.log, &lazy.source()?).await?;
        shared::write_supported(n_distinct, n_unique, &mut summary)?;
        Ok(summary)
    }
}

/// Order statistic `q` of `expr` over the `count` non-null rows of `from`.
async fn quantile(
    ctx: &SessionContext,
    log: &LogConfig,
    from: &str,
    expr: &str,
    count: u64,
    q: f64,
) -> ProfileResult<f64> {
    if count == 0 {
        return Ok(f64::NAN);
    }
    let (lower, upper, t) = position(count as usize, q);
    let batch = query(
        ctx,
        log,
        &format!(
            "SELECT {expr} AS o FROM {from} ORDER BY o ASC LIMIT {} OFFSET {lower}",
            upper - lower + 1
        ),
    )
    .await?;
    let values = floats(&batch, 0)?;
    match (values.first().copied().flatten(), values.last().copied().flatten()) {
        (Some(a), Some(b)) => Ok(lerp(a, b, t)),
        _ => Err(ProfileError::invalid_data(format!(
            "order statistic {lower} missing from {count} rows"
        ))),
    }
}

/// Aggregates, moments, quantiles and histogram as SQL aggregates.
///
/// Monotonicity needs row order, which a SQL table does not have; it is
/// reported as 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct LazyNumeric;

#[async_trait]
impl Describer for LazyNumeric {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let lazy = column.as_lazy()?;
        let (ctx, log) = (lazy.context(), &settings.log);
        let num = format!(
            "(SELECT CAST(v AS DOUBLE) AS x FROM {} WHERE v IS NOT NULL) AS num",
            lazy.source()?
        );

        let aggregates = query(
            ctx,
            log,
            &format!(
                "SELECT COUNT(x), SUM(x), MIN(x), MAX(x), \
                 SUM(CASE WHEN abs(x) > {MAX_FINITE} THEN 1 ELSE 0 END), \
                 SUM(CASE WHEN x = 0.0 THEN 1 ELSE 0 END), \
                 SUM(CASE WHEN x < 0.0 THEN 1 ELSE 0 END), \
                 MIN(CASE WHEN abs(x) <= {MAX_FINITE} THEN x END), \
                 MAX(CASE WHEN abs(x) <= {MAX_FINITE} THEN x END) \
                 FROM {num}"
            ),
        )
        .await?;
        let count = scalar_u64(&aggregates, 0)?;
        let sum = scalar_f64(&aggregates, 1)?.unwrap_or(0.0);
        let finite_min = scalar_f64(&aggregates, 7)?;
        let finite_max = scalar_f64(&aggregates, 8)?;
        log_column_stage!(settings.log, count, "numeric aggregates pushed down");

        let mean = NumericStats::mean(count, sum);
        let moments = if count == 0 {
            CentralMoments::default()
        } else if mean.is_finite() {
            let batch = query(
                ctx,
                log,
                &format!(
                    "SELECT SUM(d * d), SUM((d * d) * d), SUM((d * d) * (d * d)) \
                     FROM (SELECT x - {} AS d FROM {num}) AS dev",
                    float_literal(mean)
                ),
            )
            .await?;
            CentralMoments {
                count,
                m2: scalar_f64(&batch, 0)?.unwrap_or(0.0),
                m3: scalar_f64(&batch, 1)?.unwrap_or(0.0),
                m4: scalar_f64(&batch, 2)?.unwrap_or(0.0),
            }
        } else {
            CentralMoments {
                count,
                m2: f64::NAN,
                m3: f64::NAN,
                m4: f64::NAN,
            }
        };

        let mut quantiles = Vec::new();
        for q in quantile_probes(settings) {
            quantiles.push((q, quantile(ctx, log, &num, "x", count, q).await?));
        }

        let median = quantile(ctx, log, &num, "x", count, 0.5).await?;
        let mad = if median.is_finite() {
            let deviation = format!("abs(x - {})", float_literal(median));
            quantile(ctx, log, &num, &deviation, count, 0.5).await?
        } else {
            f64::NAN
        };

        let bins = require_bins(settings.histogram.bins)?;
        let histogram = match (finite_min, finite_max) {
            (Some(min), Some(max)) => {
                let edges = bin_edges(min, max, bins);
                Histogram {
                    counts: bucket_counts(ctx, log, &num, "x", &edges).await?,
                    bin_edges: edges,
                }
            }
            _ => Histogram::empty(),
        };

        NumericStats {
            count,
            sum,
            min: scalar_f64(&aggregates, 2)?.unwrap_or(f64::NAN),
            max: scalar_f64(&aggregates, 3)?.unwrap_or(f64::NAN),
            n_infinite: scalar_u64(&aggregates, 4)?,
            n_zeros: scalar_u64(&aggregates, 5)?,
            n_negative: scalar_u64(&aggregates, 6)?,
            moments,
            quantiles,
            mad,
            histogram,
            monotonic: 0,
        }
        .write(settings, &mut summary)?;
        Ok(summary)
    }
}

/// Text statistics of string columns; character and word counts need
/// per-row tokenization and are not pushed down.
#[derive(Debug, Clone, Copy, Default)]
pub struct LazyCategorical;

#[async_trait]
impl Describer for LazyCategorical {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let text = &settings.vars.text;
        if text.characters {
            return Err(ProfileError::not_implemented(
                "character statistics",
                BackendKind::Lazy,
            ));
        }
        if text.words {
            return Err(ProfileError::not_implemented("word statistics", BackendKind::Lazy));
        }

        let lazy = column.as_lazy()?;
        let (ctx, log) = (lazy.context(), &settings.log);
        let src = lazy.source()?;

        if !settings.vars.cat.redact {
            let batch = query(
                ctx,
                log,
                &format!(
                    "SELECT CAST(v AS VARCHAR) AS s FROM {src} WHERE v IS NOT NULL LIMIT {}",
                    settings.vars.cat.first_rows
                ),
            )
            .await?;
            shared::write_first_rows(settings, cell_values(column_ref(&batch, 0)?)?, &mut summary);
        }

        if text.length {
            let batch = query(
                ctx,
                log,
                &format!(
                    "SELECT character_length(CAST(v AS VARCHAR)) AS n_chars, COUNT(*) AS cnt \
                     FROM {src} WHERE v IS NOT NULL GROUP BY n_chars"
                ),
            )
            .await?;
            let lengths: HashMap<u64, u64> = integers(&batch, 0)?
                .into_iter()
                .zip(integers(&batch, 1)?)
                .map(|(length, count)| (length as u64, count as u64))
                .collect();
            debug!(lengths = lengths.len(), "length frequencies pushed down");
            LengthStats::from_frequencies(lengths, settings.histogram.bins)?.write(&mut summary);
        }

        let batch = query(
            ctx,
            log,
            &format!(
                "SELECT COUNT(*) AS k, SUM(cnt) AS total, SUM(cnt * ln(cnt)) AS weighted \
                 FROM (SELECT CAST(COUNT(*) AS DOUBLE) AS cnt FROM {src} \
                 WHERE v IS NOT NULL GROUP BY v) AS groups"
            ),
        )
        .await?;
        let k = scalar_u64(&batch, 0)?;
        let total = scalar_f64(&batch, 1)?.unwrap_or(0.0);
        let weighted = scalar_f64(&batch, 2)?.unwrap_or(0.0);
        let entropy = if total > 0.0 {
            (total.ln() - weighted / total) / std::f64::consts::LN_2
        } else {
            0.0
        };
        shared::write_imbalance(entropy, k, &mut summary);
        Ok(summary)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LazyBoolean;

#[async_trait]
impl Describer for LazyBoolean {
    async fn describe(
        &self,
        _settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        column.as_lazy()?;
        shared::write_boolean(&mut summary)?;
        Ok(summary)
    }
}

/// Date range from `MIN`/`MAX`, histogram over epoch seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LazyDate;

#[async_trait]
impl Describer for LazyDate {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let lazy = column.as_lazy()?;
        let (ctx, log) = (lazy.context(), &settings.log);
        let src = lazy.source()?;

        let range = query(
            ctx,
            log,
            &format!("SELECT MIN(v) AS lo, MAX(v) AS hi FROM {src}"),
        )
        .await?;
        let min = timestamps(column_ref(&range, 0)?)?.first().copied();
        let max = timestamps(column_ref(&range, 1)?)?.first().copied();

        let bins = require_bins(settings.histogram.bins)?;
        let histogram = match (min, max) {
            (Some(min), Some(max)) => {
                let edges = bin_edges(epoch_seconds(min), epoch_seconds(max), bins);
                let seconds =
                    "CAST(CAST(CAST(v AS TIMESTAMP) AS BIGINT) AS DOUBLE) / 1000000000.0";
                Histogram {
                    counts: bucket_counts(ctx, log, &src, seconds, &edges).await?,
                    bin_edges: edges,
                }
            }
            _ => Histogram::empty(),
        };

        DateStats {
            min,
            max,
            histogram,
        }
        .write(&mut summary)?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::lazy::LazyFrame;
    use crate::frame::Frame;
    use crate::summary::{keys, CellValue, SummaryValue};
    use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampNanosecondArray};
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    async fn column(name: &str, array: ArrayRef) -> Column {
        let schema = Arc::new(Schema::new(vec![Field::new(
            name,
            array.data_type().clone(),
            true,
        )]));
        let batch = RecordBatch::try_new(schema, vec![array]).unwrap();
        let frame = LazyFrame::from_batch("data", batch).await.unwrap();
        Frame::Lazy(frame).column(name).unwrap()
    }

    async fn chain(settings: &Settings, column: &Column, specific: &dyn Describer) -> ColumnSummary {
        let summary = LazyCounts
            .describe(settings, column, ColumnSummary::new())
            .await
            .unwrap();
        let summary = LazyGeneric.describe(settings, column, summary).await.unwrap();
        let summary = specific.describe(settings, column, summary).await.unwrap();
        LazySupported.describe(settings, column, summary).await.unwrap()
    }

    #[tokio::test]
    async fn test_counts_are_capped_but_totals_are_not() {
        let settings = Settings::builder().value_counts_top_n(1).build().unwrap();
        let array: ArrayRef = Arc::new(StringArray::from(vec![Some("b"), Some("a"), Some("a"), None]));
        let column = column("s", array).await;
        let summary = LazyCounts
            .describe(&settings, &column, ColumnSummary::new())
            .await
            .unwrap();

        let counts = summary.value_counts(keys::VALUE_COUNTS).unwrap();
        assert_eq!(counts.entries, vec![(CellValue::from("a"), 2)]);
        assert_eq!(counts.n_distinct, 2);
        assert_eq!(counts.n_unique, 1);
        assert_eq!(summary.count(keys::N_MISSING).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_numeric_pushdown() {
        let settings = Settings::default();
        let values: Vec<Option<i64>> = (0..20).map(Some).chain([None]).collect();
        let column = column("x", Arc::new(Int64Array::from(values))).await;
        let summary = chain(&settings, &column, &LazyNumeric).await;

        assert_eq!(summary.count(keys::N).unwrap(), 21);
        assert_eq!(summary.count(keys::COUNT).unwrap(), 20);
        assert!((summary.f64("mean").unwrap() - 9.5).abs() < 1e-12);
        assert!((summary.f64("50%").unwrap() - 9.5).abs() < 1e-12);
        assert!((summary.f64("mad").unwrap() - 5.0).abs() < 1e-12);
        assert_eq!(summary.count("n_zeros").unwrap(), 1);
        assert_eq!(summary.count("monotonic").unwrap(), 0);
        assert_eq!(summary.count("memory_size").unwrap(), 0);
        assert_eq!(summary.histogram("histogram").unwrap().total(), 20);
        assert_eq!(summary.count(keys::N_DISTINCT).unwrap(), 20);
    }

    #[tokio::test]
    async fn test_numeric_with_infinity_and_nan() {
        let settings = Settings::default();
        let array: ArrayRef = Arc::new(Float64Array::from(vec![
            Some(1.0),
            Some(2.0),
            Some(f64::NAN),
            Some(f64::INFINITY),
            Some(0.0),
        ]));
        let column = column("x", array).await;
        let summary = chain(&settings, &column, &LazyNumeric).await;

        assert_eq!(summary.count(keys::N_MISSING).unwrap(), 1);
        assert_eq!(summary.count("n_infinite").unwrap(), 1);
        assert_eq!(summary.f64("max").unwrap(), f64::INFINITY);
        assert!(summary.f64("std").unwrap().is_nan());
        assert_eq!(summary.histogram("histogram").unwrap().total(), 3);
    }

    #[tokio::test]
    async fn test_categorical_lengths_and_imbalance() {
        let settings = Settings::default();
        let array: ArrayRef = Arc::new(StringArray::from(vec![
            Some("ab"),
            None,
            Some("ab"),
            Some("cde"),
        ]));
        let column = column("s", array).await;
        let summary = chain(&settings, &column, &LazyCategorical).await;

        assert_eq!(summary.f64("mean_length").unwrap(), 7.0 / 3.0);
        assert_eq!(summary.f64("median_length").unwrap(), 2.0);
        let expected = crate::stats::entropy::imbalance([2, 1]);
        assert!((summary.f64("imbalance").unwrap() - expected).abs() < 1e-12);
        match summary.get("first_rows") {
            Some(SummaryValue::Values(rows)) => assert_eq!(rows.len(), 3),
            other => panic!("unexpected first_rows: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_word_statistics_not_implemented() {
        let settings = Settings::builder().text_stats(true, false, true).build().unwrap();
        let array: ArrayRef = Arc::new(StringArray::from(vec!["a b"]));
        let column = column("s", array).await;
        let err = LazyCategorical
            .describe(&settings, &column, ColumnSummary::new())
            .await
            .unwrap_err();
        assert!(err.is_not_implemented());
    }

    #[tokio::test]
    async fn test_date_range() {
        let settings = Settings::default();
        let day = 86_400_000_000_000i64;
        let array: ArrayRef = Arc::new(TimestampNanosecondArray::from(vec![
            Some(0),
            None,
            Some(day),
        ]));
        let column = column("t", array).await;
        let summary = chain(&settings, &column, &LazyDate).await;

        let expected = chrono::DateTime::from_timestamp_nanos(day).naive_utc();
        assert_eq!(summary.get("max"), Some(&SummaryValue::DateTime(Some(expected))));
        assert_eq!(summary.count("n_invalid_dates").unwrap(), 1);
        assert_eq!(summary.histogram("histogram").unwrap().total(), 2);
    }

    #[tokio::test]
    async fn test_negative_zero_counts_as_zero() {
        let settings = Settings::default();
        let array: ArrayRef = Arc::new(Float64Array::from(vec![-0.0, 0.0, 1.0, 2.0]));
        let column = column("x", array).await;
        let summary = chain(&settings, &column, &LazyNumeric).await;

        assert_eq!(summary.count("n_zeros").unwrap(), 2);
        assert_eq!(summary.count("n_negative").unwrap(), 0);
        assert_eq!(summary.count(keys::N_DISTINCT).unwrap(), 3);
        assert_eq!(summary.get("is_unique"), Some(&SummaryValue::Boolean(false)));
        let counts = summary.value_counts(keys::VALUE_COUNTS).unwrap();
        assert_eq!(counts.entries[0], (CellValue::Float(0.0), 2));
    }

    #[tokio::test]
    async fn test_zero_bins_is_a_configuration_error() {
        let mut settings = Settings::default();
        settings.histogram.bins = 0;
        let array: ArrayRef = Arc::new(TimestampNanosecondArray::from(vec![Some(0), Some(1_000)]));
        let column = column("t", array).await;
        let summary = LazyCounts
            .describe(&settings, &column, ColumnSummary::new())
            .await
            .unwrap();
        let summary = LazyGeneric.describe(&settings, &column, summary).await.unwrap();

        let result = LazyDate.describe(&settings, &column, summary).await;
        assert!(matches!(result, Err(crate::ProfileError::Configuration(_))));
    }
}
