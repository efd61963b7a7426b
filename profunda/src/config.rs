//! Profiling settings.
//!
//! [`Settings`] is immutable for the duration of a run and shared by
//! reference with every describer and aggregator. Every group has a
//! `Default`, so partial JSON documents deserialize into complete settings.

use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, ProfileResult};
use crate::logging::LogConfig;

/// Top-level settings for a profiling run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub vars: VarsSettings,
    pub histogram: HistogramSettings,
    pub duplicates: DuplicatesSettings,
    pub samples: SampleSettings,
    pub correlations: CorrelationSettings,
    pub missing_diagrams: MissingDiagramSettings,
    /// Order of variables in the table summary.
    pub sort: SortOrder,
    /// Number of most frequent values kept for rendering.
    pub value_counts_top_n: usize,
    /// Seed for the random sample.
    pub random_seed: u64,
    /// Requests the time-series index description, which no backend
    /// computes; the run records a warning instead.
    pub tsmode: bool,
    #[serde(skip)]
    pub log: LogConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vars: VarsSettings::default(),
            histogram: HistogramSettings::default(),
            duplicates: DuplicatesSettings::default(),
            samples: SampleSettings::default(),
            correlations: CorrelationSettings::default(),
            missing_diagrams: MissingDiagramSettings::default(),
            sort: SortOrder::Original,
            value_counts_top_n: 200,
            random_seed: 0,
            tsmode: false,
            log: LogConfig::default(),
        }
    }
}

impl Settings {
    /// Creates a new builder starting from the defaults.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Parses settings from a JSON document and validates them.
    pub fn from_json(json: &str) -> ProfileResult<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks the settings for values no backend can honor.
    pub fn validate(&self) -> ProfileResult<()> {
        if self.histogram.bins == 0 {
            return Err(ProfileError::invalid_config(
                "histogram.bins must be a positive integer",
            ));
        }
        if let Some(q) = self
            .vars
            .num
            .quantiles
            .iter()
            .find(|q| !(0.0..=1.0).contains(*q))
        {
            return Err(ProfileError::invalid_config(format!(
                "quantile {q} is outside [0, 1]"
            )));
        }
        if self.duplicates.key.is_empty() {
            return Err(ProfileError::invalid_config(
                "duplicates.key must not be empty",
            ));
        }
        Ok(())
    }
}

/// Per-type variable settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VarsSettings {
    pub num: NumSettings,
    pub cat: CatSettings,
    pub text: TextSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NumSettings {
    /// Quantile probabilities, each in [0, 1].
    pub quantiles: Vec<f64>,
}

impl Default for NumSettings {
    fn default() -> Self {
        Self {
            quantiles: vec![0.05, 0.25, 0.5, 0.75, 0.95],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatSettings {
    /// Hide raw values (first rows) from the summary.
    pub redact: bool,
    /// Number of leading non-null values kept as `first_rows`.
    pub first_rows: usize,
}

impl Default for CatSettings {
    fn default() -> Self {
        Self {
            redact: false,
            first_rows: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    pub length: bool,
    pub characters: bool,
    pub words: bool,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            length: true,
            characters: false,
            words: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramSettings {
    pub bins: usize,
}

impl Default for HistogramSettings {
    fn default() -> Self {
        Self { bins: 50 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicatesSettings {
    /// Maximum number of duplicate rows returned; 0 disables detection.
    pub head: usize,
    /// Name of the count column appended to duplicate rows.
    pub key: String,
}

impl Default for DuplicatesSettings {
    fn default() -> Self {
        Self {
            head: 10,
            key: "# duplicates".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleSettings {
    pub head: usize,
    pub tail: usize,
    pub random: usize,
}

impl Default for SampleSettings {
    fn default() -> Self {
        Self {
            head: 10,
            tail: 10,
            random: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationSettings {
    pub pearson: bool,
    pub spearman: bool,
    pub kendall: bool,
    pub cramers: bool,
    pub phi_k: bool,
}

impl Default for CorrelationSettings {
    fn default() -> Self {
        Self {
            pearson: true,
            spearman: false,
            kendall: false,
            cramers: false,
            phi_k: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingDiagramSettings {
    pub bar: bool,
    pub heatmap: bool,
    pub matrix: bool,
}

impl Default for MissingDiagramSettings {
    fn default() -> Self {
        Self {
            bar: true,
            heatmap: true,
            matrix: true,
        }
    }
}

/// Ordering of variables in the table summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Keep the column order of the table.
    #[default]
    Original,
    Ascending,
    Descending,
}

/// Builder for [`Settings`].
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn quantiles(mut self, quantiles: Vec<f64>) -> Self {
        self.settings.vars.num.quantiles = quantiles;
        self
    }

    pub fn histogram_bins(mut self, bins: usize) -> Self {
        self.settings.histogram.bins = bins;
        self
    }

    pub fn redact(mut self, redact: bool) -> Self {
        self.settings.vars.cat.redact = redact;
        self
    }

    /// Enables or disables the length, character and word text statistics.
    pub fn text_stats(mut self, length: bool, characters: bool, words: bool) -> Self {
        self.settings.vars.text = TextSettings {
            length,
            characters,
            words,
        };
        self
    }

    pub fn duplicates(mut self, head: usize, key: impl Into<String>) -> Self {
        self.settings.duplicates = DuplicatesSettings {
            head,
            key: key.into(),
        };
        self
    }

    pub fn samples(mut self, head: usize, tail: usize, random: usize) -> Self {
        self.settings.samples = SampleSettings { head, tail, random };
        self
    }

    pub fn correlations(mut self, correlations: CorrelationSettings) -> Self {
        self.settings.correlations = correlations;
        self
    }

    pub fn missing_diagrams(mut self, bar: bool, heatmap: bool, matrix: bool) -> Self {
        self.settings.missing_diagrams = MissingDiagramSettings { bar, heatmap, matrix };
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.settings.sort = sort;
        self
    }

    pub fn value_counts_top_n(mut self, top_n: usize) -> Self {
        self.settings.value_counts_top_n = top_n;
        self
    }

    pub fn random_seed(mut self, seed: u64) -> Self {
        self.settings.random_seed = seed;
        self
    }

    pub fn tsmode(mut self, tsmode: bool) -> Self {
        self.settings.tsmode = tsmode;
        self
    }

    pub fn log_config(mut self, log: LogConfig) -> Self {
        self.settings.log = log;
        self
    }

    /// Validates and returns the settings.
    pub fn build(self) -> ProfileResult<Settings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.vars.num.quantiles, vec![0.05, 0.25, 0.5, 0.75, 0.95]);
        assert_eq!(settings.histogram.bins, 50);
        assert_eq!(settings.duplicates.head, 10);
        assert_eq!(settings.duplicates.key, "# duplicates");
        assert_eq!(settings.value_counts_top_n, 200);
        assert_eq!(settings.sort, SortOrder::Original);
        assert!(settings.correlations.pearson);
        assert!(!settings.correlations.spearman);
        assert!(!settings.vars.text.characters);
        settings.validate().unwrap();
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = Settings::from_json(
            r#"{"histogram": {"bins": 10}, "sort": "descending", "vars": {"cat": {"redact": true}}}"#,
        )
        .unwrap();
        assert_eq!(settings.histogram.bins, 10);
        assert_eq!(settings.sort, SortOrder::Descending);
        assert!(settings.vars.cat.redact);
        assert_eq!(settings.vars.cat.first_rows, 5);
        assert_eq!(settings.samples.head, 10);
    }

    #[test]
    fn test_zero_bins_rejected() {
        let err = Settings::builder().histogram_bins(0).build().unwrap_err();
        assert!(matches!(err, ProfileError::Configuration(_)));

        let err = Settings::from_json(r#"{"histogram": {"bins": 0}}"#).unwrap_err();
        assert!(err.to_string().contains("histogram.bins"));
    }

    #[test]
    fn test_out_of_range_quantile_rejected() {
        let err = Settings::builder()
            .quantiles(vec![0.5, 1.5])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("1.5"));
    }

    #[test]
    fn test_empty_duplicates_key_rejected() {
        assert!(Settings::builder().duplicates(5, "").build().is_err());
    }

    #[test]
    fn test_builder() {
        let settings = Settings::builder()
            .samples(3, 0, 2)
            .random_seed(7)
            .sort(SortOrder::Ascending)
            .build()
            .unwrap();
        assert_eq!(settings.samples.head, 3);
        assert_eq!(settings.samples.random, 2);
        assert_eq!(settings.random_seed, 7);
    }
}
