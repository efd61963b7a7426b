use std::collections::HashMap;

use arrow::array::Array;
use async_trait::async_trait;
use tracing::instrument;

use super::arrays::{as_strings, numeric_values, timestamps, utf8};
use crate::backends::shared::{
    self, epoch_seconds, quantile_probes, DateStats, LengthStats, NumericStats,
};
use crate::backends::Describer;
use crate::config::Settings;
use crate::error::ProfileResult;
use crate::frame::Column;
use crate::log_column_stage;
use crate::stats::histogram::histogram;
use crate::stats::quantile::{median_absolute_deviation, quantile_sorted, sorted};
use crate::stats::{monotonic, CentralMoments};
use crate::summary::{cell_values, keys, CellValue, ColumnSummary, ValueCounts};

/// Value counts, missing count and hashability.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryCounts;

#[async_trait]
impl Describer for MemoryCounts {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let column = column.as_memory()?;
        let values = cell_values(column.array().as_ref())?;
        shared::write_counts(settings, ValueCounts::from_values(values), &mut summary);
        Ok(summary)
    }
}

/// Row count, missing ratio and memory footprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryGeneric;

#[async_trait]
impl Describer for MemoryGeneric {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        _settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let array = column.as_memory()?.array();
        shared::write_generic(
            array.len() as u64,
            array.get_array_memory_size() as u64,
            &mut summary,
        )?;
        Ok(summary)
    }
}

/// Distinctness and uniqueness.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemorySupported;

#[async_trait]
impl Describer for MemorySupported {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        _settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        column.as_memory()?;
        shared::write_supported_from_counts(&mut summary)?;
        Ok(summary)
    }
}

/// Computes every numeric aggregate from the non-missing values of a column.
pub(crate) fn numeric_stats(settings: &Settings, values: &[f64]) -> ProfileResult<NumericStats> {
    let count = values.len() as u64;
    let sum: f64 = values.iter().sum();
    let mean = NumericStats::mean(count, sum);
    let ordered = sorted(values);
    let quantiles = quantile_probes(settings)
        .into_iter()
        .map(|q| (q, quantile_sorted(&ordered, q)))
        .collect();

    Ok(NumericStats {
        count,
        sum,
        min: ordered.first().copied().unwrap_or(f64::NAN),
        max: ordered.last().copied().unwrap_or(f64::NAN),
        n_infinite: values.iter().filter(|v| v.is_infinite()).count() as u64,
        n_zeros: values.iter().filter(|v| **v == 0.0).count() as u64,
        n_negative: values.iter().filter(|v| **v < 0.0).count() as u64,
        moments: CentralMoments::from_values(values, mean),
        quantiles,
        mad: median_absolute_deviation(values),
        histogram: histogram(values, settings.histogram.bins)?,
        monotonic: monotonic(values),
    })
}

/// Moments, quantiles, histogram and sign counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryNumeric;

#[async_trait]
impl Describer for MemoryNumeric {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let values = numeric_values(column.as_memory()?.array().as_ref())?;
        log_column_stage!(settings.log, values = values.len(), "numeric values extracted");
        numeric_stats(settings, &values)?.write(settings, &mut summary)?;
        Ok(summary)
    }
}

fn length_stats(settings: &Settings, lengths: &[f64]) -> ProfileResult<LengthStats> {
    let histogram = histogram(lengths, settings.histogram.bins)?;
    if lengths.is_empty() {
        return Ok(LengthStats::empty());
    }
    let ordered = sorted(lengths);
    Ok(LengthStats {
        min: ordered[0],
        max: ordered[ordered.len() - 1],
        mean: lengths.iter().sum::<f64>() / lengths.len() as f64,
        median: quantile_sorted(&ordered, 0.5),
        histogram,
    })
}

/// Text statistics and imbalance of string columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryCategorical;

#[async_trait]
impl Describer for MemoryCategorical {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let casted = utf8(column.as_memory()?.array().as_ref())?;
        let strings: Vec<&str> = as_strings(&casted)?.iter().flatten().collect();
        let text = &settings.vars.text;

        let first_rows = strings
            .iter()
            .take(settings.vars.cat.first_rows)
            .map(|s| CellValue::from(*s))
            .collect();
        shared::write_first_rows(settings, first_rows, &mut summary);

        if text.length {
            let lengths: Vec<f64> = strings
                .iter()
                .map(|s| s.chars().count() as f64)
                .collect();
            length_stats(settings, &lengths)?.write(&mut summary);
        }
        if text.characters {
            let mut counts: HashMap<CellValue, u64> = HashMap::new();
            for c in strings.iter().flat_map(|s| s.chars()) {
                *counts.entry(CellValue::Text(c.to_string())).or_insert(0) += 1;
            }
            shared::write_characters(settings, ValueCounts::from_counts(counts, 0), &mut summary);
        }
        if text.words {
            let words = strings
                .iter()
                .flat_map(|s| shared::words(s))
                .map(CellValue::Text);
            shared::write_words(settings, ValueCounts::from_values(words), &mut summary);
        }

        let value_counts = summary.value_counts(keys::VALUE_COUNTS)?.clone();
        shared::write_imbalance_from_counts(&value_counts, &mut summary);
        Ok(summary)
    }
}

/// Most frequent value and imbalance of boolean columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryBoolean;

#[async_trait]
impl Describer for MemoryBoolean {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        _settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        column.as_memory()?;
        shared::write_boolean(&mut summary)?;
        Ok(summary)
    }
}

/// Range, histogram and invalid dates of temporal columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryDate;

#[async_trait]
impl Describer for MemoryDate {
    #[instrument(skip_all, fields(column = %column.name()))]
    async fn describe(
        &self,
        settings: &Settings,
        column: &Column,
        mut summary: ColumnSummary,
    ) -> ProfileResult<ColumnSummary> {
        let values = timestamps(column.as_memory()?.array().as_ref())?;
        let seconds: Vec<f64> = values.iter().map(|ns| epoch_seconds(*ns)).collect();
        DateStats {
            min: values.iter().min().copied(),
            max: values.iter().max().copied(),
            histogram: histogram(&seconds, settings.histogram.bins)?,
        }
        .write(&mut summary)?;
        Ok(summary)
    }
}
