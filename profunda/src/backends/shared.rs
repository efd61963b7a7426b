//! Summary writers shared by the backends.
//!
//! Backends gather counts, sums and order statistics in their own execution
//! model and hand them to these writers, so every backend reports the same
//! keys with the same edge-case policy.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Settings;
use crate::error::ProfileResult;
use crate::stats::entropy::{imbalance, imbalance_from_entropy};
use crate::stats::moments::spread;
use crate::stats::histogram::weighted_histogram;
use crate::stats::quantile::{finite_or_nan, quantile_key, OrderStatistics};
use crate::stats::{ratio, CentralMoments, Histogram};
use crate::summary::{keys, CellValue, ColumnSummary, SummaryValue, ValueCounts};

/// Quantile probabilities to compute: the configured ones plus the quartiles
/// needed for the interquartile range.
pub(crate) fn quantile_probes(settings: &Settings) -> Vec<f64> {
    let mut probes = settings.vars.num.quantiles.clone();
    for quartile in [0.25, 0.75] {
        if !probes.contains(&quartile) {
            probes.push(quartile);
        }
    }
    probes
}

/// Writes the counts stage from a value-count table.
///
/// `value_counts` holds every distinct value on backends that materialize
/// it; the rendering copies are capped at `value_counts_top_n`.
pub(crate) fn write_counts(settings: &Settings, value_counts: ValueCounts, summary: &mut ColumnSummary) {
    let top = value_counts.top(settings.value_counts_top_n);
    let mut index_sorted = top.clone();
    index_sorted.entries.sort_by(|(a, _), (b, _)| a.cmp(b));

    summary.insert(keys::N_MISSING, value_counts.n_missing);
    summary.insert(keys::VALUE_COUNTS, value_counts);
    summary.insert(keys::VALUE_COUNTS_WITHOUT_NAN, top);
    summary.insert("value_counts_index_sorted", index_sorted);
    summary.insert("hashable", true);
    summary.insert("ordering", true);
}

/// Writes the generic stage; needs `n_missing` from the counts stage.
pub(crate) fn write_generic(n: u64, memory_size: u64, summary: &mut ColumnSummary) -> ProfileResult<()> {
    let n_missing = summary.count(keys::N_MISSING)?;
    summary.insert(keys::N, n);
    summary.insert(keys::COUNT, n.saturating_sub(n_missing));
    summary.insert(keys::P_MISSING, ratio(n_missing, n));
    summary.insert("memory_size", memory_size);
    Ok(())
}

/// Writes the supported stage; needs `count` from the generic stage.
pub(crate) fn write_supported(n_distinct: u64, n_unique: u64, summary: &mut ColumnSummary) -> ProfileResult<()> {
    let count = summary.count(keys::COUNT)?;
    summary.insert(keys::N_DISTINCT, n_distinct);
    summary.insert("p_distinct", ratio(n_distinct, count));
    summary.insert("is_unique", n_unique == count && count > 0);
    summary.insert(keys::N_UNIQUE, n_unique);
    summary.insert("p_unique", ratio(n_unique, count));
    Ok(())
}

/// Writes the supported stage from the true totals of the counts stage.
pub(crate) fn write_supported_from_counts(summary: &mut ColumnSummary) -> ProfileResult<()> {
    let counts = summary.value_counts(keys::VALUE_COUNTS_WITHOUT_NAN)?;
    let (n_distinct, n_unique) = (counts.n_distinct, counts.n_unique);
    write_supported(n_distinct, n_unique, summary)
}

/// Aggregates of a numeric column's non-missing values, infinities included.
#[derive(Debug, Clone)]
pub(crate) struct NumericStats {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub n_infinite: u64,
    pub n_zeros: u64,
    pub n_negative: u64,
    /// Central moments around `sum / count`.
    pub moments: CentralMoments,
    /// `(probability, value)` for every probe of [`quantile_probes`].
    pub quantiles: Vec<(f64, f64)>,
    pub mad: f64,
    pub histogram: Histogram,
    pub monotonic: i64,
}

impl NumericStats {
    pub(crate) fn mean(count: u64, sum: f64) -> f64 {
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    }

    pub(crate) fn write(self, settings: &Settings, summary: &mut ColumnSummary) -> ProfileResult<()> {
        let n = summary.count(keys::N)?;
        let mean = Self::mean(self.count, self.sum);
        let (std, variance) = spread(&self.moments, self.n_infinite > 0);
        let (min, max) = if self.count == 0 {
            (f64::NAN, f64::NAN)
        } else {
            (self.min, self.max)
        };

        summary.insert(keys::MEAN, mean);
        summary.insert(keys::STD, std);
        summary.insert("variance", variance);
        summary.insert("min", min);
        summary.insert("max", max);
        summary.insert("sum", self.sum);
        summary.insert("kurtosis", self.moments.kurtosis());
        summary.insert("skewness", self.moments.skewness());
        summary.insert("mad", self.mad);
        summary.insert("range", max - min);
        summary.insert("n_infinite", self.n_infinite);
        summary.insert("p_infinite", ratio(self.n_infinite, n));
        summary.insert("n_zeros", self.n_zeros);
        summary.insert("p_zeros", ratio(self.n_zeros, n));
        summary.insert("n_negative", self.n_negative);
        summary.insert("p_negative", ratio(self.n_negative, n));

        let quantile = |q: f64| {
            self.quantiles
                .iter()
                .find(|(p, _)| *p == q)
                .map(|(_, value)| finite_or_nan(*value))
                .unwrap_or(f64::NAN)
        };
        for q in &settings.vars.num.quantiles {
            summary.insert(quantile_key(*q), quantile(*q));
        }
        summary.insert("iqr", quantile(0.75) - quantile(0.25));
        let cv = if mean != 0.0 && !mean.is_nan() {
            std / mean
        } else {
            f64::NAN
        };
        summary.insert("cv", cv);
        summary.insert("monotonic", self.monotonic);
        summary.insert(keys::HISTOGRAM, self.histogram);
        Ok(())
    }
}

/// Character-length statistics of non-null strings.
#[derive(Debug, Clone)]
pub(crate) struct LengthStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub histogram: Histogram,
}

impl LengthStats {
    pub(crate) fn empty() -> Self {
        Self {
            min: f64::NAN,
            max: f64::NAN,
            mean: f64::NAN,
            median: f64::NAN,
            histogram: Histogram::empty(),
        }
    }

    /// Statistics from `(length, count)` frequencies.
    pub(crate) fn from_frequencies<I>(lengths: I, bins: usize) -> ProfileResult<Self>
    where
        I: IntoIterator<Item = (u64, u64)>,
    {
        let table = OrderStatistics::new(lengths.into_iter().map(|(length, count)| (length as f64, count)));
        let histogram = weighted_histogram(table.iter().copied(), bins)?;
        if table.total() == 0 {
            return Ok(Self::empty());
        }
        let sum: f64 = table.iter().map(|(length, count)| length * *count as f64).sum();
        Ok(Self {
            min: table.nth(0),
            max: table.nth(table.total() - 1),
            mean: sum / table.total() as f64,
            median: table.quantile(0.5),
            histogram,
        })
    }

    pub(crate) fn write(self, summary: &mut ColumnSummary) {
        summary.insert("min_length", self.min);
        summary.insert("max_length", self.max);
        summary.insert("mean_length", self.mean);
        summary.insert("median_length", self.median);
        summary.insert("histogram_length", self.histogram);
    }
}

/// Writes the first non-null values unless values are redacted.
pub(crate) fn write_first_rows(settings: &Settings, first_rows: Vec<CellValue>, summary: &mut ColumnSummary) {
    if !settings.vars.cat.redact {
        summary.insert("first_rows", SummaryValue::Values(first_rows));
    }
}

/// Writes character-level statistics from the character counts.
pub(crate) fn write_characters(settings: &Settings, characters: ValueCounts, summary: &mut ColumnSummary) {
    let total: u64 = characters.counts().sum();
    summary.insert("n_characters", total);
    summary.insert("n_characters_distinct", characters.n_distinct);
    summary.insert("character_counts", characters.top(settings.value_counts_top_n));
}

/// Writes word-level statistics from the word counts.
pub(crate) fn write_words(settings: &Settings, words: ValueCounts, summary: &mut ColumnSummary) {
    let total: u64 = words.counts().sum();
    summary.insert("n_words", total);
    summary.insert("n_words_distinct", words.n_distinct);
    summary.insert("word_counts", words.top(settings.value_counts_top_n));
}

/// Splits text into lowercase words.
pub(crate) fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    static WORD: Lazy<Regex> = Lazy::new(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"\w+").expect("Hard-coded regex pattern should be valid")
    });
    WORD.find_iter(text).map(|m| m.as_str().to_lowercase())
}

/// Writes the class imbalance of a full frequency table.
pub(crate) fn write_imbalance_from_counts(value_counts: &ValueCounts, summary: &mut ColumnSummary) {
    summary.insert("imbalance", imbalance(value_counts.counts()));
}

/// Writes the class imbalance from a base-2 entropy over `k` classes.
pub(crate) fn write_imbalance(entropy: f64, k: u64, summary: &mut ColumnSummary) {
    summary.insert("imbalance", imbalance_from_entropy(entropy, k));
}

/// Writes top, freq and imbalance of a boolean column.
pub(crate) fn write_boolean(summary: &mut ColumnSummary) -> ProfileResult<()> {
    let counts = summary.value_counts(keys::VALUE_COUNTS_WITHOUT_NAN)?.clone();
    match counts.first() {
        Some((top, freq)) => {
            summary.insert("top", top.clone());
            summary.insert("freq", *freq);
            write_imbalance_from_counts(&counts, summary);
        }
        None => {
            summary.insert("top", f64::NAN);
            summary.insert("freq", 0u64);
            summary.insert("imbalance", 0.0);
        }
    }
    Ok(())
}

/// Aggregates of a datetime column, in nanoseconds since the epoch.
#[derive(Debug, Clone)]
pub(crate) struct DateStats {
    pub min: Option<i64>,
    pub max: Option<i64>,
    /// Histogram over epoch seconds.
    pub histogram: Histogram,
}

impl DateStats {
    pub(crate) fn write(self, summary: &mut ColumnSummary) -> ProfileResult<()> {
        let n = summary.count(keys::N)?;
        let n_invalid = summary.count(keys::N_MISSING)?;
        let to_datetime = |ns: i64| chrono::DateTime::from_timestamp_nanos(ns).naive_utc();

        let range = match (self.min, self.max) {
            (Some(min), Some(max)) => max.saturating_sub(min),
            _ => 0,
        };
        summary.insert("min", SummaryValue::DateTime(self.min.map(to_datetime)));
        summary.insert("max", SummaryValue::DateTime(self.max.map(to_datetime)));
        summary.insert("range", SummaryValue::Timedelta(range));
        summary.insert(keys::HISTOGRAM, self.histogram);
        summary.insert("invalid_dates", u64::from(n_invalid > 0));
        summary.insert("n_invalid_dates", n_invalid);
        summary.insert("p_invalid_dates", ratio(n_invalid, n));
        Ok(())
    }
}

/// Epoch seconds of a nanosecond timestamp.
pub(crate) fn epoch_seconds(ns: i64) -> f64 {
    ns as f64 / 1_000_000_000.0
}
