use std::fmt;

use serde::Serialize;

/// A non-fatal degradation recorded during a run.
///
/// Produced when a column is dropped or a backend cannot build an optional
/// artifact; the artifact is omitted and the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileWarning {
    /// The feature that was degraded, e.g. `sample:tail`.
    pub feature: String,
    pub message: String,
}

impl ProfileWarning {
    pub fn new(feature: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            message: message.into(),
        }
    }

    /// Logs the warning and returns it.
    pub fn emit(self) -> Self {
        tracing::warn!(feature = %self.feature, "{}", self.message);
        self
    }
}

impl fmt::Display for ProfileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.feature, self.message)
    }
}
