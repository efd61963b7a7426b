use std::collections::HashMap;

use arrow::array::Array;
use async_trait::async_trait;
use tracing::{debug, instrument};

use super::map_reduce;
use super::partial::{BinState, CountsState, DateRangeState, NumericState, SpreadState, TextState};
use crate::backends::memory::arrays::{as_strings, numeric_values, timestamps, utf8};
use crate::backends::shared::{
    self, epoch_seconds, quantile_probes, DateStats, LengthStats, NumericStats,
};
use crate::backends::Describer;
use crate::config::Settings;
use crate::error::ProfileResult;
use crate::frame::Column;
use crate::log_column_stage;
use crate::stats::histogram::{bin_counts, bin_edges, require_bins};
use crate::stats::{CentralMoments, Histogram};
use crate::summary::{cell_values, keys, CellValue, ColumnSummary, ValueCounts};

/// Value counts merged across partitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterCounts;

#[async_trait]
impl Describer for ClusterCounts {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let partitions = column.as_cluster()?.partitions().to_vec();
        let state: CountsState = map_reduce(partitions, |array| {
            let mut counts = HashMap::new();
            for value in cell_values(array.as_ref())? {
                *counts.entry(value).or_insert(0) += 1;
            }
            Ok(CountsState { counts })
        })
        .await?;
        shared::write_counts(settings, ValueCounts::from_counts(state.counts, 0), &mut summary);
        Ok(summary)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterGeneric;

#[async_trait]
impl Describer for ClusterGeneric {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        _settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let partitions = column.as_cluster()?.partitions();
        let n: usize = partitions.iter().map(|array| array.len()).sum();
        let memory_size: usize = partitions
            .iter()
            .map(|array| array.get_array_memory_size())
            .sum();
        shared::write_generic(n as u64, memory_size as u64, &mut summary)?;
        Ok(summary)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterSupported;

#[async_trait]
impl Describer for ClusterSupported {
    async fn describe(
        &self,
        _settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        column.as_cluster()?;
        shared::write_supported_from_counts(&mut summary)?;
        Ok(summary)
    }
}

/// Numeric statistics in two passes: aggregates and frequencies first,
/// then moments and histogram counts around the merged mean and range.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterNumeric;

#[async_trait]
impl Describer for ClusterNumeric {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let partitions = column.as_cluster()?.partitions().to_vec();
        let first: NumericState = map_reduce(partitions.clone(), |array| {
            Ok(NumericState::from_values(&numeric_values(array.as_ref())?))
        })
        .await?;
        log_column_stage!(
            settings.log,
            count = first.count,
            distinct = first.frequencies.len(),
            "numeric first pass merged"
        );

        let mean = NumericStats::mean(first.count, first.sum);
        let bins = require_bins(settings.histogram.bins)?;
        let edges = match (first.finite_min, first.finite_max) {
            (Some(min), Some(max)) => bin_edges(min, max, bins),
            _ => Vec::new(),
        };
        let pass_edges = edges.clone();
        let second: SpreadState = map_reduce(partitions, move |array| {
            let values = numeric_values(array.as_ref())?;
            Ok(SpreadState {
                moments: CentralMoments::from_values(&values, mean),
                bins: bin_counts(&pass_edges, values.iter().copied().filter(|v| v.is_finite())),
            })
        })
        .await?;

        let table = first.order_statistics();
        let quantiles = quantile_probes(settings)
            .into_iter()
            .map(|q| (q, table.quantile(q)))
            .collect();
        let histogram = if edges.is_empty() {
            Histogram::empty()
        } else {
            Histogram {
                counts: second.bins,
                bin_edges: edges,
            }
        };

        NumericStats {
            count: first.count,
            sum: first.sum,
            min: first.min,
            max: first.max,
            n_infinite: first.n_infinite,
            n_zeros: first.n_zeros,
            n_negative: first.n_negative,
            moments: second.moments,
            quantiles,
            mad: table.median_absolute_deviation(),
            histogram,
            monotonic: first.monotonic.finish(),
        }
        .write(settings, &mut summary)?;
        Ok(summary)
    }
}

/// Text statistics merged from per-partition frequency tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterCategorical;

#[async_trait]
impl Describer for ClusterCategorical {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let partitions = column.as_cluster()?.partitions().to_vec();
        let limit = settings.vars.cat.first_rows;
        let options = settings.vars.text.clone();
        let state: TextState = map_reduce(partitions, move |array| {
            let casted = utf8(array.as_ref())?;
            let mut state = TextState {
                first_rows_limit: limit,
                ..TextState::default()
            };
            for value in as_strings(&casted)?.iter().flatten() {
                if state.first_rows.len() < limit {
                    state.first_rows.push(value.to_string());
                }
                if options.length {
                    *state.lengths.entry(value.chars().count() as u64).or_insert(0) += 1;
                }
                if options.characters {
                    for c in value.chars() {
                        *state.characters.entry(c).or_insert(0) += 1;
                    }
                }
                if options.words {
                    for word in shared::words(value) {
                        *state.words.entry(word).or_insert(0) += 1;
                    }
                }
            }
            Ok(state)
        })
        .await?;
        debug!(lengths = state.lengths.len(), "text partitions merged");

        let first_rows = state
            .first_rows
            .iter()
            .map(|s| CellValue::from(s.as_str()))
            .collect();
        shared::write_first_rows(settings, first_rows, &mut summary);

        let text = &settings.vars.text;
        if text.length {
            LengthStats::from_frequencies(state.lengths, settings.histogram.bins)?
                .write(&mut summary);
        }
        if text.characters {
            let counts = state
                .characters
                .into_iter()
                .map(|(c, count)| (CellValue::Text(c.to_string()), count))
                .collect();
            shared::write_characters(settings, ValueCounts::from_counts(counts, 0), &mut summary);
        }
        if text.words {
            let counts = state
                .words
                .into_iter()
                .map(|(word, count)| (CellValue::Text(word), count))
                .collect();
            shared::write_words(settings, ValueCounts::from_counts(counts, 0), &mut summary);
        }

        let value_counts = summary.value_counts(keys::VALUE_COUNTS)?.clone();
        shared::write_imbalance_from_counts(&value_counts, &mut summary);
        Ok(summary)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterBoolean;

#[async_trait]
impl Describer for ClusterBoolean {
    async fn describe(
        &self,
        _settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        column.as_cluster()?;
        shared::write_boolean(&mut summary)?;
        Ok(summary)
    }
}

/// Date range in one pass, histogram counts in a second.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterDate;

#[async_trait]
impl Describer for ClusterDate {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let partitions = column.as_cluster()?.partitions().to_vec();
        let range: DateRangeState = map_reduce(partitions.clone(), |array| {
            let values = timestamps(array.as_ref())?;
            Ok(DateRangeState {
                min: values.iter().min().copied(),
                max: values.iter().max().copied(),
            })
        })
        .await?;

        let bins = require_bins(settings.histogram.bins)?;
        let histogram = match (range.min, range.max) {
            (Some(min), Some(max)) => {
                let edges = bin_edges(epoch_seconds(min), epoch_seconds(max), bins);
                let pass_edges = edges.clone();
                let counts: BinState = map_reduce(partitions, move |array| {
                    let seconds = timestamps(array.as_ref())?.into_iter().map(epoch_seconds);
                    Ok(BinState {
                        bins: bin_counts(&pass_edges, seconds),
                    })
                })
                .await?;
                Histogram {
                    counts: counts.bins,
                    bin_edges: edges,
                }
            }
            _ => Histogram::empty(),
        };

        DateStats {
            min: range.min,
            max: range.max,
            histogram,
        }
        .write(&mut summary)?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::cluster::ClusterFrame;
    use crate::frame::Frame;
    use arrow::array::{Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    fn column(name: &str, data_type: DataType, array: Arc<dyn Array>, partitions: usize) -> Column {
        let schema = Arc::new(Schema::new(vec![Field::new(name, data_type, true)]));
        let batch = RecordBatch::try_new(schema, vec![array]).unwrap();
        Frame::Cluster(ClusterFrame::from_batch(&batch, partitions))
            .column(name)
            .unwrap()
    }

    async fn chain(settings: &Settings, column: &Column, specific: &dyn Describer) -> ColumnSummary {
        let summary = ClusterCounts
            .describe(settings, column, ColumnSummary::new())
            .await
            .unwrap();
        let summary = ClusterGeneric.describe(settings, column, summary).await.unwrap();
        let summary = specific.describe(settings, column, summary).await.unwrap();
        ClusterSupported.describe(settings, column, summary).await.unwrap()
    }

    #[tokio::test]
    async fn test_numeric_across_partitions() {
        let settings = Settings::default();
        let values: Vec<Option<f64>> = (0..20).map(|i| Some(i as f64)).chain([None]).collect();
        let array = Arc::new(Float64Array::from(values));
        let column = column("x", DataType::Float64, array, 4);
        let summary = chain(&settings, &column, &ClusterNumeric).await;

        assert_eq!(summary.count(keys::COUNT).unwrap(), 20);
        assert_eq!(summary.count(keys::N_MISSING).unwrap(), 1);
        assert!((summary.f64("mean").unwrap() - 9.5).abs() < 1e-12);
        assert!((summary.f64("50%").unwrap() - 9.5).abs() < 1e-12);
        assert_eq!(summary.count("monotonic").unwrap(), 2);
        assert_eq!(summary.histogram("histogram").unwrap().total(), 20);
    }

    #[tokio::test]
    async fn test_categorical_across_partitions() {
        let settings = Settings::builder().text_stats(true, true, false).build().unwrap();
        let array = Arc::new(StringArray::from(vec![Some("ab"), None, Some("ab"), Some("cde")]));
        let column = column("s", DataType::Utf8, array, 3);
        let summary = chain(&settings, &column, &ClusterCategorical).await;

        assert_eq!(summary.f64("mean_length").unwrap(), 7.0 / 3.0);
        assert_eq!(summary.f64("median_length").unwrap(), 2.0);
        assert_eq!(summary.count("n_characters").unwrap(), 7);
        assert!(!summary.contains("n_words"));
    }

    #[tokio::test]
    async fn test_zero_bins_is_a_configuration_error() {
        let mut settings = Settings::default();
        settings.histogram.bins = 0;
        let array = Arc::new(Float64Array::from(vec![None, None]));
        let column = column("x", DataType::Float64, array, 2);
        let summary = ClusterCounts
            .describe(&settings, &column, ColumnSummary::new())
            .await
            .unwrap();
        let summary = ClusterGeneric.describe(&settings, &column, summary).await.unwrap();

        // rejected even when no value would be binned
        let result = ClusterNumeric.describe(&settings, &column, summary).await;
        assert!(matches!(result, Err(crate::ProfileError::Configuration(_))));
    }
}
