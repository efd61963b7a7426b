//! The summary data model.
//!
//! A [`ColumnSummary`] is an ordered map from statistic name to
//! [`SummaryValue`]. Describers fold over it: each stage reads the keys of
//! earlier stages and adds its own.

pub mod aggregates;
pub mod table;
pub mod value;
pub mod value_counts;

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{ProfileError, ProfileResult};
use crate::stats::Histogram;

pub use aggregates::{
    Duplicates, MissingBar, MissingDiagram, MissingDiagramKind, MissingHeatmap, MissingMatrix,
    Sample, SampleKind,
};
pub use table::TableSummary;
pub use value::{cell_values, CellValue};
pub use value_counts::ValueCounts;

/// Names of statistics that later stages depend on.
pub mod keys {
    pub const N: &str = "n";
    pub const COUNT: &str = "count";
    pub const N_MISSING: &str = "n_missing";
    pub const P_MISSING: &str = "p_missing";
    pub const VALUE_COUNTS: &str = "value_counts";
    pub const VALUE_COUNTS_WITHOUT_NAN: &str = "value_counts_without_nan";
    pub const N_DISTINCT: &str = "n_distinct";
    pub const N_UNIQUE: &str = "n_unique";
    pub const TYPE: &str = "type";
    pub const MEAN: &str = "mean";
    pub const STD: &str = "std";
    pub const HISTOGRAM: &str = "histogram";
}

/// A single statistic value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SummaryValue {
    Double(f64),
    Long(i64),
    Boolean(bool),
    String(String),
    Value(CellValue),
    Values(Vec<CellValue>),
    /// `None` is "not a time".
    DateTime(Option<NaiveDateTime>),
    /// Nanoseconds.
    Timedelta(i64),
    Histogram(Histogram),
    ValueCounts(ValueCounts),
}

impl SummaryValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SummaryValue::Double(v) => Some(*v),
            SummaryValue::Long(v) => Some(*v as f64),
            SummaryValue::Timedelta(v) => Some(*v as f64),
            SummaryValue::Value(v) => v.as_f64(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SummaryValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SummaryValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SummaryValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_histogram(&self) -> Option<&Histogram> {
        match self {
            SummaryValue::Histogram(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_value_counts(&self) -> Option<&ValueCounts> {
        match self {
            SummaryValue::ValueCounts(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for SummaryValue {
    fn from(value: f64) -> Self {
        SummaryValue::Double(value)
    }
}

impl From<i64> for SummaryValue {
    fn from(value: i64) -> Self {
        SummaryValue::Long(value)
    }
}

impl From<u64> for SummaryValue {
    fn from(value: u64) -> Self {
        SummaryValue::Long(value as i64)
    }
}

impl From<bool> for SummaryValue {
    fn from(value: bool) -> Self {
        SummaryValue::Boolean(value)
    }
}

impl From<String> for SummaryValue {
    fn from(value: String) -> Self {
        SummaryValue::String(value)
    }
}

impl From<&str> for SummaryValue {
    fn from(value: &str) -> Self {
        SummaryValue::String(value.to_string())
    }
}

impl From<CellValue> for SummaryValue {
    fn from(value: CellValue) -> Self {
        SummaryValue::Value(value)
    }
}

impl From<Histogram> for SummaryValue {
    fn from(value: Histogram) -> Self {
        SummaryValue::Histogram(value)
    }
}

impl From<ValueCounts> for SummaryValue {
    fn from(value: ValueCounts) -> Self {
        SummaryValue::ValueCounts(value)
    }
}

/// Statistics of one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ColumnSummary {
    values: BTreeMap<String, SummaryValue>,
}

impl ColumnSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SummaryValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&SummaryValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<SummaryValue> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SummaryValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn required(&self, key: &str) -> ProfileResult<&SummaryValue> {
        self.values
            .get(key)
            .ok_or_else(|| ProfileError::invalid_data(format!("statistic '{key}' has not been computed")))
    }

    /// Numeric statistic computed by an earlier stage.
    pub fn f64(&self, key: &str) -> ProfileResult<f64> {
        let value = self.required(key)?;
        value
            .as_f64()
            .ok_or_else(|| ProfileError::invalid_data(format!("statistic '{key}' is not numeric")))
    }

    /// Count computed by an earlier stage.
    pub fn count(&self, key: &str) -> ProfileResult<u64> {
        let value = self.required(key)?;
        value
            .as_i64()
            .and_then(|v| u64::try_from(v).ok())
            .ok_or_else(|| ProfileError::invalid_data(format!("statistic '{key}' is not a count")))
    }

    pub fn value_counts(&self, key: &str) -> ProfileResult<&ValueCounts> {
        let value = self.required(key)?;
        value.as_value_counts().ok_or_else(|| {
            ProfileError::invalid_data(format!("statistic '{key}' is not a value count table"))
        })
    }

    pub fn histogram(&self, key: &str) -> ProfileResult<&Histogram> {
        let value = self.required(key)?;
        value
            .as_histogram()
            .ok_or_else(|| ProfileError::invalid_data(format!("statistic '{key}' is not a histogram")))
    }

    /// Semantic type name recorded by the orchestrator.
    pub fn type_name(&self) -> Option<&str> {
        self.get(keys::TYPE).and_then(SummaryValue::as_str)
    }
}

impl Extend<(String, SummaryValue)> for ColumnSummary {
    fn extend<T: IntoIterator<Item = (String, SummaryValue)>>(&mut self, iter: T) {
        self.values.extend(iter);
    }
}
