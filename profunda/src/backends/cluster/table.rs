use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use tracing::{debug, instrument};

use super::partial::{CenteredSumsState, DuplicateState, MissingState, PairSumsState};
use super::{map_partitions, map_reduce, ClusterFrame};
use crate::backends::memory::arrays::{missing_count, missing_mask, optional_numeric, row_keys};
use crate::backends::memory::table::{rank_duplicates, with_count_column};
use crate::backends::{heatmap_columns, Capability, TableAggregator};
use crate::config::Settings;
use crate::error::{ProfileError, ProfileResult};
use crate::frame::{BackendKind, Frame};
use crate::stats::correlation::{CenteredPairSums, PairSums};
use crate::stats::{ratio, CorrelationMatrix, CorrelationMethod};
use crate::summary::{
    CellValue, Duplicates, MissingBar, MissingHeatmap, MissingMatrix, Sample, SampleKind,
};

type Vectorize = fn(&dyn Array) -> ProfileResult<Vec<Option<f64>>>;

fn missing_indicator(array: &dyn Array) -> ProfileResult<Vec<Option<f64>>> {
    Ok(missing_mask(array)?
        .into_iter()
        .map(|missing| Some(if missing { 1.0 } else { 0.0 }))
        .collect())
}

fn upper_pairs(k: usize) -> Vec<(usize, usize)> {
    (0..k).flat_map(|i| (i..k).map(move |j| (i, j))).collect()
}

fn complete<'a>(x: &'a [Option<f64>], y: &'a [Option<f64>]) -> impl Iterator<Item = (f64, f64)> + 'a {
    x.iter().zip(y).filter_map(|(a, b)| Some(((*a)?, (*b)?)))
}

/// Pearson matrix in two passes: pair sums, then centered pair sums.
async fn pearson_matrix(
    columns: Vec<String>,
    partitions: Vec<Vec<ArrayRef>>,
    vectorize: Vectorize,
) -> ProfileResult<CorrelationMatrix> {
    let pairs = Arc::new(upper_pairs(columns.len()));

    let first_pairs = Arc::clone(&pairs);
    let first: PairSumsState = map_reduce(partitions.clone(), move |arrays: Vec<ArrayRef>| {
        let vectors = arrays
            .iter()
            .map(|array| vectorize(array.as_ref()))
            .collect::<ProfileResult<Vec<_>>>()?;
        let sums = first_pairs
            .iter()
            .map(|(i, j)| {
                let mut sums = PairSums::default();
                complete(&vectors[*i], &vectors[*j]).for_each(|(x, y)| sums.add(x, y));
                sums
            })
            .collect();
        Ok(PairSumsState { sums })
    })
    .await?;

    let means: Arc<Vec<(f64, f64)>> = Arc::new(first.sums.iter().map(PairSums::means).collect());
    let second_pairs = Arc::clone(&pairs);
    let second: CenteredSumsState = map_reduce(partitions, move |arrays: Vec<ArrayRef>| {
        let vectors = arrays
            .iter()
            .map(|array| vectorize(array.as_ref()))
            .collect::<ProfileResult<Vec<_>>>()?;
        let sums = second_pairs
            .iter()
            .zip(means.iter())
            .map(|((i, j), (mean_x, mean_y))| {
                let mut sums = CenteredPairSums::default();
                complete(&vectors[*i], &vectors[*j])
                    .for_each(|(x, y)| sums.add(x - mean_x, y - mean_y));
                sums
            })
            .collect();
        Ok(CenteredSumsState { sums })
    })
    .await?;

    let mut matrix = CorrelationMatrix::new(columns);
    for (p, (i, j)) in pairs.iter().enumerate() {
        matrix.set(*i, *j, second.sums[p].pearson(first.sums[p].n));
    }
    Ok(matrix)
}

/// Table aggregations over record batch partitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterAggregator;

impl ClusterAggregator {
    fn frame<'a>(&self, frame: &'a Frame) -> ProfileResult<&'a ClusterFrame> {
        frame.as_cluster()
    }

    /// The arrays of `indices` in every partition.
    fn projected(frame: &ClusterFrame, indices: &[usize]) -> Vec<Vec<ArrayRef>> {
        frame
            .partitions()
            .iter()
            .map(|partition| {
                indices
                    .iter()
                    .map(|i| Arc::clone(partition.column(*i)))
                    .collect()
            })
            .collect()
    }

    fn indices(frame: &ClusterFrame, columns: &[String]) -> ProfileResult<Vec<usize>> {
        let schema = frame.schema();
        columns
            .iter()
            .map(|name| {
                schema
                    .index_of(name)
                    .map_err(|_| ProfileError::ColumnNotFound(name.clone()))
            })
            .collect()
    }

    /// Single-row slices of the global rows `rows`, concatenated.
    fn gather(frame: &ClusterFrame, batch_of: &[RecordBatch], rows: &[u64]) -> ProfileResult<RecordBatch> {
        let mut offsets = Vec::with_capacity(batch_of.len());
        let mut offset = 0u64;
        for batch in batch_of {
            offsets.push(offset);
            offset += batch.num_rows() as u64;
        }
        let slices = rows
            .iter()
            .map(|row| {
                let partition = offsets.partition_point(|start| *start <= *row) - 1;
                let local = (row - offsets[partition]) as usize;
                batch_of[partition].slice(local, 1)
            })
            .collect::<Vec<_>>();
        let schema = batch_of
            .first()
            .map_or_else(|| frame.schema(), |batch| batch.schema());
        Ok(concat_batches(&schema, &slices)?)
    }
}

#[async_trait]
impl TableAggregator for ClusterAggregator {
    fn backend(&self) -> BackendKind {
        BackendKind::Cluster
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
        let cluster = self.frame(frame)?;
        let indices = Self::indices(cluster, columns)?;
        let projected = cluster
            .partitions()
            .iter()
            .map(|partition| partition.project(&indices))
            .collect::<Result<Vec<_>, _>>()?;

        let mut inputs = Vec::with_capacity(projected.len());
        let mut offset = 0u64;
        for batch in &projected {
            inputs.push((offset, batch.clone()));
            offset += batch.num_rows() as u64;
        }
        let state: DuplicateState = map_reduce(inputs, |(offset, batch): (u64, RecordBatch)| {
            let mut groups: HashMap<Vec<CellValue>, (u64, u64)> = HashMap::new();
            for (row, key) in row_keys(batch.columns())?.into_iter().enumerate() {
                groups.entry(key).or_insert((0, offset + row as u64)).0 += 1;
            }
            Ok(DuplicateState { groups })
        })
        .await?;

        let duplicated = rank_duplicates(state.groups);
        let n_duplicates = duplicated.len() as u64;
        debug!(n_duplicates, partitions = projected.len(), "duplicate groups merged");

        let head: Vec<_> = duplicated.into_iter().take(settings.duplicates.head).collect();
        let rows = if head.is_empty() {
            None
        } else {
            let first_rows: Vec<u64> = head.iter().map(|(_, _, first)| *first).collect();
            let counts = head.iter().map(|(_, count, _)| *count as i64).collect();
            let rows = Self::gather(cluster, &projected, &first_rows)?;
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
        if method != CorrelationMethod::Pearson {
            return Err(ProfileError::not_implemented(
                format!("{method} correlation"),
                BackendKind::Cluster,
            ));
        }
        let cluster = self.frame(frame)?;
        let indices = Self::indices(cluster, columns)?;
        pearson_matrix(
            columns.to_vec(),
            Self::projected(cluster, &indices),
            optional_numeric,
        )
        .await
    }

    async fn missing_bar(&self, frame: &Frame) -> ProfileResult<MissingBar> {
        let partitions = self.frame(frame)?.partitions().to_vec();
        let state: MissingState = map_reduce(partitions, |batch: RecordBatch| {
            let missing = batch
                .columns()
                .iter()
                .map(|array| missing_count(array.as_ref()))
                .collect::<ProfileResult<Vec<_>>>()?;
            Ok(MissingState {
                missing,
                rows: batch.num_rows() as u64,
            })
        })
        .await?;
        Ok(MissingBar {
            columns: frame.column_names(),
            missing: state.missing,
            n_rows: state.rows,
        })
    }

    async fn missing_heatmap(&self, frame: &Frame) -> ProfileResult<MissingHeatmap> {
        let bar = self.missing_bar(frame).await?;
        let selected = heatmap_columns(&bar);
        let columns: Vec<String> = selected.iter().map(|i| bar.columns[*i].clone()).collect();
        let matrix = pearson_matrix(
            columns,
            Self::projected(self.frame(frame)?, &selected),
            missing_indicator,
        )
        .await?;
        let mask = MissingHeatmap::upper_triangle_mask(matrix.len());
        Ok(MissingHeatmap {
            columns: matrix.columns,
            values: matrix.values,
            mask,
        })
    }

    async fn missing_matrix(&self, frame: &Frame) -> ProfileResult<Capability<MissingMatrix>> {
        let partitions = self.frame(frame)?.partitions().to_vec();
        let masks = map_partitions(partitions, |batch: RecordBatch| {
            batch
                .columns()
                .iter()
                .map(|array| missing_mask(array.as_ref()))
                .collect::<ProfileResult<Vec<_>>>()
        })
        .await?;

        let mut present: Vec<Vec<bool>> = vec![Vec::new(); frame.column_names().len()];
        for partition in masks {
            for (column, mask) in present.iter_mut().zip(partition) {
                column.extend(mask.into_iter().map(|missing| !missing));
            }
        }
        Ok(Capability::Supported(MissingMatrix {
            columns: frame.column_names(),
            present,
        }))
    }

    async fn sample(
        &self,
        _settings: &Settings,
        frame: &Frame,
        kind: SampleKind,
        n: usize,
    ) -> ProfileResult<Capability<Sample>> {
        let cluster = self.frame(frame)?;
        let partitions = cluster.partitions();
        let mut taken: Vec<RecordBatch> = Vec::new();
        let mut remaining = n;
        match kind {
            SampleKind::Head => {
                for partition in partitions {
                    if remaining == 0 {
                        break;
                    }
                    let k = remaining.min(partition.num_rows());
                    taken.push(partition.slice(0, k));
                    remaining -= k;
                }
            }
            SampleKind::Tail => {
                for partition in partitions.iter().rev() {
                    if remaining == 0 {
                        break;
                    }
                    let k = remaining.min(partition.num_rows());
                    taken.push(partition.slice(partition.num_rows() - k, k));
                    remaining -= k;
                }
                taken.reverse();
            }
            SampleKind::Random => {
                return Ok(Capability::unsupported(
                    "random sampling is not available on partitioned frames",
                ))
            }
        }
        let data = concat_batches(&cluster.schema(), &taken)?;
        Ok(Capability::Supported(Sample::new(kind, data)))
    }
}
