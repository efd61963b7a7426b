use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, UInt64Array};
use arrow::compute::take_record_batch;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, instrument};

use super::arrays::{missing_count, missing_mask, optional_numeric, row_keys};
use super::MemoryFrame;
use crate::backends::{heatmap_columns, Capability, TableAggregator};
use crate::config::Settings;
use crate::error::{ProfileError, ProfileResult};
use crate::frame::{BackendKind, Frame};
use crate::stats::correlation::{kendall, pearson, spearman};
use crate::stats::{ratio, CorrelationMatrix, CorrelationMethod};
use crate::summary::{
    CellValue, Duplicates, MissingBar, MissingHeatmap, MissingMatrix, Sample, SampleKind,
};

/// Table aggregations over an in-process record batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryAggregator;

impl MemoryAggregator {
    fn frame<'a>(&self, frame: &'a Frame) -> ProfileResult<&'a MemoryFrame> {
        frame.as_memory()
    }
}

/// Duplicate groups ordered by descending count, then ascending key.
///
/// Each group carries its count and the index of its first row.
pub(crate) fn rank_duplicates(
    groups: HashMap<Vec<CellValue>, (u64, u64)>,
) -> Vec<(Vec<CellValue>, u64, u64)> {
    let mut duplicated: Vec<(Vec<CellValue>, u64, u64)> = groups
        .into_iter()
        .filter(|(_, (count, _))| *count > 1)
        .map(|(key, (count, first))| (key, count, first))
        .collect();
    duplicated.sort_unstable_by(|(ka, ca, _), (kb, cb, _)| cb.cmp(ca).then_with(|| ka.cmp(kb)));
    duplicated
}

/// Appends the count column named `key` to the representative rows.
pub(crate) fn with_count_column(
    rows: RecordBatch,
    key: &str,
    counts: Vec<i64>,
) -> ProfileResult<RecordBatch> {
    let mut fields: Vec<Arc<Field>> = rows.schema().fields().iter().cloned().collect();
    fields.push(Arc::new(Field::new(key, DataType::Int64, false)));
    let mut columns: Vec<ArrayRef> = rows.columns().to_vec();
    columns.push(Arc::new(Int64Array::from(counts)));
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Missingness indicator correlation over the partially missing columns.
pub(crate) fn heatmap_from_indicators(
    bar: &MissingBar,
    indicators: impl Fn(usize) -> ProfileResult<Vec<Option<f64>>>,
) -> ProfileResult<MissingHeatmap> {
    let selected = heatmap_columns(bar);
    let columns: Vec<String> = selected.iter().map(|i| bar.columns[*i].clone()).collect();
    let vectors = selected
        .iter()
        .map(|i| indicators(*i))
        .collect::<ProfileResult<Vec<_>>>()?;
    let matrix = CorrelationMatrix::from_fn(columns, |i, j| pearson(&vectors[i], &vectors[j]));
    let mask = MissingHeatmap::upper_triangle_mask(matrix.len());
    Ok(MissingHeatmap {
        columns: matrix.columns,
        values: matrix.values,
        mask,
    })
}

#[async_trait]
impl TableAggregator for MemoryAggregator {
    fn backend(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn row_count(&self, frame: &Frame) -> ProfileResult<u64> {
        Ok(self.frame(frame)?.num_rows() as u64)
    }

    #[instrument(skip_all, fields(columns = columns.len()))]
    async fn duplicates(
        &self,
        settings: &Settings,
        frame: &Frame,
        columns: &[String],
        n_rows: u64,
    ) -> ProfileResult<Duplicates> {
        let batch = self.frame(frame)?.batch();
        let indices = columns
            .iter()
            .map(|name| batch.schema().index_of(name).map_err(ProfileError::from))
            .collect::<ProfileResult<Vec<usize>>>()?;
        let projected = batch.project(&indices)?;

        let mut groups: HashMap<Vec<CellValue>, (u64, u64)> = HashMap::new();
        for (row, key) in row_keys(projected.columns())?.into_iter().enumerate() {
            groups.entry(key).or_insert((0, row as u64)).0 += 1;
        }
        let duplicated = rank_duplicates(groups);
        let n_duplicates = duplicated.len() as u64;
        debug!(n_duplicates, "duplicate rows grouped");

        let head: Vec<_> = duplicated.into_iter().take(settings.duplicates.head).collect();
        let rows = if head.is_empty() {
            None
        } else {
            let take = UInt64Array::from(head.iter().map(|(_, _, first)| *first).collect::<Vec<_>>());
            let counts = head.iter().map(|(_, count, _)| *count as i64).collect();
            let rows = take_record_batch(&projected, &take)?;
            Some(with_count_column(rows, &settings.duplicates.key, counts)?)
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
        let coefficient: fn(&[Option<f64>], &[Option<f64>]) -> f64 = match method {
            CorrelationMethod::Pearson => pearson,
            CorrelationMethod::Spearman => spearman,
            CorrelationMethod::Kendall => kendall,
            CorrelationMethod::Cramers | CorrelationMethod::PhiK => {
                return Err(ProfileError::not_implemented(
                    format!("{method} correlation"),
                    BackendKind::Memory,
                ))
            }
        };
        let memory = self.frame(frame)?;
        let vectors = columns
            .iter()
            .map(|name| optional_numeric(memory.column(name)?.array().as_ref()))
            .collect::<ProfileResult<Vec<_>>>()?;
        Ok(CorrelationMatrix::from_fn(columns.to_vec(), |i, j| {
            coefficient(&vectors[i], &vectors[j])
        }))
    }

    async fn missing_bar(&self, frame: &Frame) -> ProfileResult<MissingBar> {
        let batch = self.frame(frame)?.batch();
        let missing = batch
            .columns()
            .iter()
            .map(|array| missing_count(array.as_ref()))
            .collect::<ProfileResult<Vec<_>>>()?;
        Ok(MissingBar {
            columns: frame.column_names(),
            missing,
            n_rows: batch.num_rows() as u64,
        })
    }

    async fn missing_heatmap(&self, frame: &Frame) -> ProfileResult<MissingHeatmap> {
        let bar = self.missing_bar(frame).await?;
        let batch = self.frame(frame)?.batch();
        heatmap_from_indicators(&bar, |i| {
            Ok(missing_mask(batch.column(i).as_ref())?
                .into_iter()
                .map(|m| Some(if m { 1.0 } else { 0.0 }))
                .collect())
        })
    }

    async fn missing_matrix(&self, frame: &Frame) -> ProfileResult<Capability<MissingMatrix>> {
        let batch = self.frame(frame)?.batch();
        let present = batch
            .columns()
            .iter()
            .map(|array| Ok(missing_mask(array.as_ref())?.into_iter().map(|m| !m).collect()))
            .collect::<ProfileResult<Vec<_>>>()?;
        Ok(Capability::Supported(MissingMatrix {
            columns: frame.column_names(),
            present,
        }))
    }

    async fn sample(
        &self,
        settings: &Settings,
        frame: &Frame,
        kind: SampleKind,
        n: usize,
    ) -> ProfileResult<Capability<Sample>> {
        let batch = self.frame(frame)?.batch();
        let rows = batch.num_rows();
        let k = n.min(rows);
        let data = match kind {
            SampleKind::Head => batch.slice(0, k),
            SampleKind::Tail => batch.slice(rows - k, k),
            SampleKind::Random => {
                let mut rng = StdRng::seed_from_u64(settings.random_seed);
                let indices: Vec<u64> = rand::seq::index::sample(&mut rng, rows, k)
                    .into_iter()
                    .map(|i| i as u64)
                    .collect();
                take_record_batch(batch, &UInt64Array::from(indices))?
            }
        };
        Ok(Capability::Supported(Sample::new(kind, data)))
    }
}
