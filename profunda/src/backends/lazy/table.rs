use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use tracing::{debug, instrument};

use super::sql::{
    float_literal, integers, missing_expr, query, quote_identifier, scalar_f64, scalar_u64,
    value_expr,
};
use super::LazyFrame;
use crate::backends::memory::table::with_count_column;
use crate::backends::{heatmap_columns, Capability, TableAggregator};
use crate::config::Settings;
use crate::error::{ProfileError, ProfileResult};
use crate::frame::{BackendKind, Frame};
use crate::logging::LogConfig;
use crate::stats::correlation::CenteredPairSums;
use crate::stats::{ratio, CorrelationMatrix, CorrelationMethod};
use crate::summary::{Duplicates, MissingBar, MissingHeatmap, MissingMatrix, Sample, SampleKind};

/// Pearson coefficient of two expressions over their pairwise-complete rows,
/// in two queries: counts and sums, then centered sums around the means.
async fn pearson_pair(
    ctx: &SessionContext,
    log: &LogConfig,
    table: &str,
    x: &str,
    y: &str,
) -> ProfileResult<f64> {
    let pairs = format!(
        "(SELECT {x} AS x, {y} AS y FROM {table}) AS pairs WHERE x IS NOT NULL AND y IS NOT NULL"
    );
    let sums = query(
        ctx,
        log,
        &format!("SELECT COUNT(*), SUM(x), SUM(y) FROM {pairs}"),
    )
    .await?;
    let n = scalar_u64(&sums, 0)?;
    if n < 2 {
        return Ok(f64::NAN);
    }
    let mean_x = scalar_f64(&sums, 1)?.unwrap_or(f64::NAN) / n as f64;
    let mean_y = scalar_f64(&sums, 2)?.unwrap_or(f64::NAN) / n as f64;
    if !mean_x.is_finite() || !mean_y.is_finite() {
        return Ok(f64::NAN);
    }

    let (dx, dy) = (
        format!("(x - {})", float_literal(mean_x)),
        format!("(y - {})", float_literal(mean_y)),
    );
    let centered = query(
        ctx,
        log,
        &format!("SELECT SUM({dx} * {dx}), SUM({dy} * {dy}), SUM({dx} * {dy}) FROM {pairs}"),
    )
    .await?;
    let sums = CenteredPairSums {
        sxx: scalar_f64(&centered, 0)?.unwrap_or(0.0),
        syy: scalar_f64(&centered, 1)?.unwrap_or(0.0),
        sxy: scalar_f64(&centered, 2)?.unwrap_or(0.0),
    };
    Ok(sums.pearson(n))
}

/// Pearson matrix of `exprs`, labelled by `columns`.
async fn pearson_matrix(
    frame: &LazyFrame,
    log: &LogConfig,
    columns: Vec<String>,
    exprs: &[String],
) -> ProfileResult<CorrelationMatrix> {
    let table = quote_identifier(frame.table())?;
    let mut matrix = CorrelationMatrix::new(columns);
    for i in 0..exprs.len() {
        for j in i..exprs.len() {
            let value = pearson_pair(frame.context(), log, &table, &exprs[i], &exprs[j]).await?;
            matrix.set(i, j, value);
        }
    }
    Ok(matrix)
}

/// Table aggregations as SQL over a DataFusion table.
///
/// Operations that take no settings log their queries with the default
/// [`LogConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LazyAggregator;

impl LazyAggregator {
    fn frame<'a>(&self, frame: &'a Frame) -> ProfileResult<&'a LazyFrame> {
        frame.as_lazy()
    }

    fn numeric_expr(frame: &LazyFrame, name: &str) -> ProfileResult<String> {
        let schema = frame.schema();
        let field = schema
            .field_with_name(name)
            .map_err(|_| ProfileError::ColumnNotFound(name.to_string()))?;
        Ok(format!("CAST({} AS DOUBLE)", value_expr(field)?))
    }

    fn missing_exprs(frame: &LazyFrame) -> ProfileResult<Vec<String>> {
        frame
            .schema()
            .fields()
            .iter()
            .map(|field| missing_expr(field))
            .collect()
    }
}

#[async_trait]
impl TableAggregator for LazyAggregator {
    fn backend(&self) -> BackendKind {
        BackendKind::Lazy
    }

    async fn row_count(&self, frame: &Frame) -> ProfileResult<u64> {
        let lazy = self.frame(frame)?;
        let batch = query(
            lazy.context(),
            &LogConfig::default(),
            &format!("SELECT COUNT(*) FROM {}", quote_identifier(lazy.table())?),
        )
        .await?;
        scalar_u64(&batch, 0)
    }

    #[instrument(skip_all, fields(columns = columns.len()))]
    async fn duplicates(
        &self,
        settings: &Settings,
        frame: &Frame,
        columns: &[String],
        n_rows: u64,
    ) -> ProfileResult<Duplicates> {
        let lazy = self.frame(frame)?;
        let (ctx, log) = (lazy.context(), &settings.log);
        let schema = lazy.schema();

        let mut projection = Vec::with_capacity(columns.len());
        let mut keys = Vec::with_capacity(columns.len());
        for name in columns {
            let field = schema
                .field_with_name(name)
                .map_err(|_| ProfileError::ColumnNotFound(name.clone()))?;
            let quoted = quote_identifier(name)?;
            projection.push(format!("{} AS {quoted}", value_expr(field)?));
            keys.push(quoted);
        }
        let rows = format!(
            "(SELECT {} FROM {}) AS profile_rows",
            projection.join(", "),
            quote_identifier(lazy.table())?
        );
        let group_by = keys.join(", ");

        let total = query(
            ctx,
            log,
            &format!(
                "SELECT COUNT(*) FROM (SELECT COUNT(*) AS cnt FROM {rows} \
                 GROUP BY {group_by} HAVING COUNT(*) > 1) AS groups"
            ),
        )
        .await?;
        let n_duplicates = scalar_u64(&total, 0)?;
        debug!(n_duplicates, "duplicate groups counted");

        let head = settings.duplicates.head;
        let rows = if n_duplicates == 0 || head == 0 {
            None
        } else {
            let count_key = quote_identifier(&settings.duplicates.key)?;
            let order: Vec<String> = keys.iter().map(|key| format!("{key} ASC NULLS LAST")).collect();
            let batch = query(
                ctx,
                log,
                &format!(
                    "SELECT {group_by}, COUNT(*) AS {count_key} FROM {rows} \
                     GROUP BY {group_by} HAVING COUNT(*) > 1 \
                     ORDER BY {count_key} DESC, {} LIMIT {head}",
                    order.join(", ")
                ),
            )
            .await?;
            let counts = integers(&batch, columns.len())?;
            let indices: Vec<usize> = (0..columns.len()).collect();
            Some(with_count_column(
                batch.project(&indices)?,
                &settings.duplicates.key,
                counts,
            )?)
        };

        Ok(Duplicates {
            n_duplicates,
            p_duplicates: ratio(n_duplicates, n_rows),
            rows,
        })
    }

    #[instrument(skip_all, fields(method = %method))]
    async fn correlation(
        &self,
        frame: &Frame,
        method: CorrelationMethod,
        columns: &[String],
    ) -> ProfileResult<CorrelationMatrix> {
        if method != CorrelationMethod::Pearson {
            return Err(ProfileError::not_implemented(
                format!("{method} correlation"),
                BackendKind::Lazy,
            ));
        }
        let lazy = self.frame(frame)?;
        let exprs = columns
            .iter()
            .map(|name| Self::numeric_expr(lazy, name))
            .collect::<ProfileResult<Vec<_>>>()?;
        pearson_matrix(lazy, &LogConfig::default(), columns.to_vec(), &exprs).await
    }

    async fn missing_bar(&self, frame: &Frame) -> ProfileResult<MissingBar> {
        let lazy = self.frame(frame)?;
        let mut select = vec!["COUNT(*)".to_string()];
        select.extend(
            Self::missing_exprs(lazy)?
                .into_iter()
                .map(|missing| format!("SUM(CASE WHEN {missing} THEN 1 ELSE 0 END)")),
        );
        let batch = query(
            lazy.context(),
            &LogConfig::default(),
            &format!(
                "SELECT {} FROM {}",
                select.join(", "),
                quote_identifier(lazy.table())?
            ),
        )
        .await?;
        let missing = (1..select.len())
            .map(|i| scalar_u64(&batch, i))
            .collect::<ProfileResult<Vec<_>>>()?;
        Ok(MissingBar {
            columns: frame.column_names(),
            missing,
            n_rows: scalar_u64(&batch, 0)?,
        })
    }

    async fn missing_heatmap(&self, frame: &Frame) -> ProfileResult<MissingHeatmap> {
        let lazy = self.frame(frame)?;
        let bar = self.missing_bar(frame).await?;
        let selected = heatmap_columns(&bar);
        let missing = Self::missing_exprs(lazy)?;
        let columns: Vec<String> = selected.iter().map(|i| bar.columns[*i].clone()).collect();
        let indicators: Vec<String> = selected
            .iter()
            .map(|i| format!("CASE WHEN {} THEN 1.0 ELSE 0.0 END", missing[*i]))
            .collect();
        let matrix = pearson_matrix(lazy, &LogConfig::default(), columns, &indicators).await?;
        let mask = MissingHeatmap::upper_triangle_mask(matrix.len());
        Ok(MissingHeatmap {
            columns: matrix.columns,
            values: matrix.values,
            mask,
        })
    }

    async fn missing_matrix(&self, frame: &Frame) -> ProfileResult<Capability<MissingMatrix>> {
        self.frame(frame)?;
        Ok(Capability::unsupported(
            "the nullity matrix needs row order, which SQL tables do not have",
        ))
    }

    async fn sample(
        &self,
        settings: &Settings,
        frame: &Frame,
        kind: SampleKind,
        n: usize,
    ) -> ProfileResult<Capability<Sample>> {
        let lazy = self.frame(frame)?;
        match kind {
            SampleKind::Head => {
                let data = query(
                    lazy.context(),
                    &settings.log,
                    &format!(
                        "SELECT * FROM {} LIMIT {n}",
                        quote_identifier(lazy.table())?
                    ),
                )
                .await?;
                Ok(Capability::Supported(Sample::new(kind, data)))
            }
            SampleKind::Tail => Ok(Capability::unsupported(
                "tail sampling needs row order, which SQL tables do not have",
            )),
            SampleKind::Random => Ok(Capability::unsupported(
                "random sampling is not pushed down to SQL tables",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::{MemoryAggregator, MemoryFrame};
    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Int64, false),
            Field::new("b", DataType::Utf8, true),
            Field::new("x", DataType::Float64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 1, 2, 1, 2, 3, 4])),
                Arc::new(StringArray::from(vec![
                    Some("p"),
                    Some("p"),
                    None,
                    Some("p"),
                    None,
                    Some("q"),
                    Some("r"),
                ])),
                Arc::new(Float64Array::from(vec![
                    Some(1.0),
                    None,
                    Some(3.0),
                    Some(f64::NAN),
                    Some(5.0),
                    Some(6.0),
                    Some(2.0),
                ])),
            ],
        )
        .unwrap()
    }

    async fn frames() -> (Frame, Frame) {
        let batch = batch();
        let lazy = LazyFrame::from_batch("data", batch.clone()).await.unwrap();
        (Frame::Memory(MemoryFrame::new(batch)), Frame::Lazy(lazy))
    }

    #[tokio::test]
    async fn test_row_count() {
        let (_, lazy) = frames().await;
        assert_eq!(LazyAggregator.row_count(&lazy).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_duplicates_match_memory() {
        let settings = Settings::default();
        let (memory, lazy) = frames().await;
        let columns = vec!["a".to_string(), "b".to_string()];
        let expected = MemoryAggregator
            .duplicates(&settings, &memory, &columns, 7)
            .await
            .unwrap();
        let actual = LazyAggregator
            .duplicates(&settings, &lazy, &columns, 7)
            .await
            .unwrap();

        assert_eq!(actual.n_duplicates, expected.n_duplicates);
        assert_eq!(actual.p_duplicates, expected.p_duplicates);
        let (rows, expected_rows) = (actual.rows.unwrap(), expected.rows.unwrap());
        let key = settings.duplicates.key.as_str();
        assert_eq!(
            integers(&rows, rows.schema().index_of(key).unwrap()).unwrap(),
            vec![3, 2]
        );
        assert_eq!(rows.num_rows(), expected_rows.num_rows());
    }

    #[tokio::test]
    async fn test_pearson_matches_memory() {
        let (memory, lazy) = frames().await;
        let columns = vec!["a".to_string(), "x".to_string()];
        let expected = MemoryAggregator
            .correlation(&memory, CorrelationMethod::Pearson, &columns)
            .await
            .unwrap();
        let actual = LazyAggregator
            .correlation(&lazy, CorrelationMethod::Pearson, &columns)
            .await
            .unwrap();
        let (e, a) = (expected.get("a", "x").unwrap(), actual.get("a", "x").unwrap());
        assert!((e - a).abs() < 1e-12);
        assert!((actual.get("a", "a").unwrap() - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_kendall_not_implemented() {
        let (_, lazy) = frames().await;
        let columns = vec!["a".to_string(), "x".to_string()];
        let err = LazyAggregator
            .correlation(&lazy, CorrelationMethod::Kendall, &columns)
            .await
            .unwrap_err();
        assert!(err.is_not_implemented());
    }

    #[tokio::test]
    async fn test_missing_diagrams() {
        let (memory, lazy) = frames().await;
        let bar = LazyAggregator.missing_bar(&lazy).await.unwrap();
        assert_eq!(bar, MemoryAggregator.missing_bar(&memory).await.unwrap());

        let heatmap = LazyAggregator.missing_heatmap(&lazy).await.unwrap();
        let expected = MemoryAggregator.missing_heatmap(&memory).await.unwrap();
        assert_eq!(heatmap.columns, expected.columns);
        assert!((heatmap.values[0][1] - expected.values[0][1]).abs() < 1e-12);

        let matrix = LazyAggregator.missing_matrix(&lazy).await.unwrap();
        assert!(matches!(matrix, Capability::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_samples() {
        let settings = Settings::default();
        let (_, lazy) = frames().await;
        let head = LazyAggregator
            .sample(&settings, &lazy, SampleKind::Head, 3)
            .await
            .unwrap()
            .supported()
            .unwrap();
        assert_eq!(head.data.num_rows(), 3);
        assert_eq!(head.name, "First rows");

        for kind in [SampleKind::Tail, SampleKind::Random] {
            let sample = LazyAggregator.sample(&settings, &lazy, kind, 3).await.unwrap();
            assert!(matches!(sample, Capability::Unsupported(_)));
        }
    }
}
