//! Semantic type classification.

use std::fmt;

use arrow::datatypes::{DataType, Field};
use serde::{Deserialize, Serialize};

/// Arrow field metadata key naming an extension type.
pub const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";

/// The semantic category a column is summarized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SemanticType {
    Numeric,
    Categorical,
    Boolean,
    DateTime,
    Unsupported,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Numeric => "Numeric",
            SemanticType::Categorical => "Categorical",
            SemanticType::Boolean => "Boolean",
            SemanticType::DateTime => "DateTime",
            SemanticType::Unsupported => "Unsupported",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a column from its engine-reported field.
///
/// Checks run in a fixed order: string, temporal, boolean, numeric.
/// Time-of-day, duration and interval columns are not points in time and
/// classify as [`SemanticType::Unsupported`].
pub fn classify(field: &Field) -> SemanticType {
    classify_type(field.data_type())
}

fn classify_type(data_type: &DataType) -> SemanticType {
    if let DataType::Dictionary(_, values) = data_type {
        return classify_type(values);
    }
    if is_string(data_type) {
        SemanticType::Categorical
    } else if is_temporal(data_type) {
        SemanticType::DateTime
    } else if matches!(data_type, DataType::Boolean) {
        SemanticType::Boolean
    } else if is_numeric(data_type) {
        SemanticType::Numeric
    } else {
        SemanticType::Unsupported
    }
}

fn is_string(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
    )
}

fn is_temporal(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _)
    )
}

pub(crate) fn is_numeric(data_type: &DataType) -> bool {
    data_type.is_integer() || data_type.is_floating() || is_decimal(data_type)
}

fn is_decimal(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Decimal128(_, _) | DataType::Decimal256(_, _)
    )
}

/// Returns true for nested, semi-structured and geometry columns, which are
/// dropped before profiling.
pub fn is_bad_type(field: &Field) -> bool {
    if let Some(extension) = field.metadata().get(EXTENSION_NAME_KEY) {
        if extension == "arrow.json"
            || extension.starts_with("geoarrow.")
            || extension.starts_with("ogc.")
        {
            return true;
        }
    }
    is_nested(field.data_type())
}

fn is_nested(data_type: &DataType) -> bool {
    match data_type {
        DataType::List(_)
        | DataType::LargeList(_)
        | DataType::FixedSizeList(_, _)
        | DataType::ListView(_)
        | DataType::LargeListView(_)
        | DataType::Struct(_)
        | DataType::Map(_, _)
        | DataType::Union(_, _)
        | DataType::RunEndEncoded(_, _) => true,
        DataType::Dictionary(_, values) => is_nested(values),
        _ => false,
    }
}
