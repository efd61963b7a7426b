//! The summary orchestrator.
//!
//! A [`Profiler`] walks every column of a [`Frame`], runs the describer
//! chain of its semantic type through the dispatch registry, and then runs
//! the table-level aggregations. Degraded capabilities are collected as
//! [`ProfileWarning`]s; configuration and not-implemented errors abort the
//! run.
//!
//! ```rust,no_run
//! use profunda::prelude::*;
//!
//! # async fn example(batch: arrow::record_batch::RecordBatch) -> ProfileResult<()> {
//! let profiler = Profiler::builder()
//!     .settings(Settings::builder().histogram_bins(20).build()?)
//!     .on_progress(|progress| println!("{}/{}", progress.completed, progress.total))
//!     .build()?;
//! let description = profiler.describe(&Frame::Memory(MemoryFrame::new(batch))).await?;
//! println!("{} rows", description.table.n);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, instrument};

use crate::backends::{Capability, DescribeOp, TableAggregator};
use crate::config::Settings;
use crate::error::{ProfileError, ProfileResult};
use crate::frame::{BackendKind, Column, Frame};
use crate::preprocess;
use crate::registry::{self, DispatchRegistry};
use crate::stats::{CorrelationMatrix, CorrelationMethod};
use crate::summary::table::sort_variables;
use crate::summary::{
    keys, ColumnSummary, Duplicates, MissingDiagram, Sample, SampleKind, TableSummary,
};
use crate::types::{classify, SemanticType};
use crate::warning::ProfileWarning;

/// Progress after a column has been described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilerProgress {
    pub column: String,
    pub completed: usize,
    pub total: usize,
}

/// Receives a [`ProfilerProgress`] after every column.
pub type ProgressCallback = Arc<dyn Fn(ProfilerProgress) + Send + Sync>;

/// Start and end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisMetadata {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Everything computed for one table.
#[derive(Debug, Clone)]
pub struct Description {
    pub backend: BackendKind,
    pub table: TableSummary,
    pub correlations: BTreeMap<CorrelationMethod, CorrelationMatrix>,
    /// `None` when duplicate detection is disabled.
    pub duplicates: Option<Duplicates>,
    pub missing: Vec<MissingDiagram>,
    pub samples: Vec<Sample>,
    pub warnings: Vec<ProfileWarning>,
    pub analysis: AnalysisMetadata,
}

impl Description {
    pub fn variable(&self, name: &str) -> Option<&ColumnSummary> {
        self.table.variable(name)
    }
}

/// Runs the describer chains and table aggregations over a frame.
#[derive(Clone)]
pub struct Profiler {
    settings: Arc<Settings>,
    registry: Option<Arc<DispatchRegistry>>,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiler")
            .field("settings", &self.settings)
            .field("registry", &self.registry.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Profiler {
    pub fn builder() -> ProfilerBuilder {
        ProfilerBuilder::default()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The registry of this profiler, or a snapshot of the global one.
    fn registry(&self) -> ProfileResult<Arc<DispatchRegistry>> {
        match &self.registry {
            Some(registry) => Ok(Arc::clone(registry)),
            None => registry::global(),
        }
    }

    /// Normalizes column names and drops columns of unsupported types.
    pub async fn preprocess(&self, frame: &Frame) -> ProfileResult<(Frame, Option<ProfileWarning>)> {
        preprocess::preprocess(frame).await
    }

    /// Describes one column with the chain of its semantic type.
    pub async fn describe_1d(&self, column: &Column) -> ProfileResult<ColumnSummary> {
        describe_column(&*self.registry()?, &self.settings, column).await
    }

    /// Describes every column, in the configured sort order, with
    /// `value_counts` removed.
    pub async fn get_series_descriptions(
        &self,
        frame: &Frame,
    ) -> ProfileResult<IndexMap<String, ColumnSummary>> {
        self.series_descriptions(&*self.registry()?, frame).await
    }

    async fn series_descriptions(
        &self,
        registry: &DispatchRegistry,
        frame: &Frame,
    ) -> ProfileResult<IndexMap<String, ColumnSummary>> {
        let names = frame.column_names();
        let total = names.len();
        let mut variables = IndexMap::with_capacity(total);
        for (index, name) in names.into_iter().enumerate() {
            let column = frame.column(&name)?;
            let mut summary = describe_column(registry, &self.settings, &column).await?;
            summary.remove(keys::VALUE_COUNTS);
            variables.insert(name.clone(), summary);
            if let Some(progress) = &self.progress {
                progress(ProfilerProgress {
                    column: name,
                    completed: index + 1,
                    total,
                });
            }
        }
        Ok(sort_variables(variables, self.settings.sort))
    }

    /// Table-wide totals from the column summaries.
    pub fn table_stats(
        &self,
        n: u64,
        variables: IndexMap<String, ColumnSummary>,
    ) -> ProfileResult<TableSummary> {
        TableSummary::from_variables(n, variables)
    }

    /// Profiles `frame`: preprocessing, every column, then duplicates,
    /// correlations, missing diagrams and samples.
    #[instrument(skip_all, fields(backend = %frame.backend()))]
    pub async fn describe(&self, frame: &Frame) -> ProfileResult<Description> {
        let started_at = Utc::now();
        self.settings.validate()?;
        let registry = self.registry()?;
        let aggregator = registry.aggregator(frame.backend())?;
        info!(columns = frame.column_names().len(), "starting profile");

        let mut warnings = Vec::new();
        let (frame, dropped) = self.preprocess(frame).await?;
        warnings.extend(dropped.map(ProfileWarning::emit));
        self.check_duplicates_key(&frame)?;
        if self.settings.tsmode {
            warnings.push(
                ProfileWarning::new(
                    "time_index",
                    format!(
                        "Time series index description is not implemented for the {} backend",
                        frame.backend()
                    ),
                )
                .emit(),
            );
        }

        let variables = self.series_descriptions(&registry, &frame).await?;
        let n = aggregator.row_count(&frame).await?;
        let table = self.table_stats(n, variables)?;

        let duplicates = self.duplicates(aggregator.as_ref(), &frame, &table).await?;
        let correlations = self.correlations(aggregator.as_ref(), &frame, &table).await?;
        let missing = self
            .missing_diagrams(aggregator.as_ref(), &frame, &mut warnings)
            .await?;
        let samples = self
            .samples(aggregator.as_ref(), &frame, n, &mut warnings)
            .await?;

        let finished_at = Utc::now();
        info!(
            rows = n,
            variables = table.n_var,
            warnings = warnings.len(),
            "profile finished"
        );
        Ok(Description {
            backend: frame.backend(),
            table,
            correlations,
            duplicates,
            missing,
            samples,
            warnings,
            analysis: AnalysisMetadata {
                started_at,
                finished_at,
            },
        })
    }

    fn check_duplicates_key(&self, frame: &Frame) -> ProfileResult<()> {
        let key = &self.settings.duplicates.key;
        if self.settings.duplicates.head > 0 && frame.column_names().contains(key) {
            return Err(ProfileError::DuplicateKeyCollision { key: key.clone() });
        }
        Ok(())
    }

    async fn duplicates(
        &self,
        aggregator: &dyn TableAggregator,
        frame: &Frame,
        table: &TableSummary,
    ) -> ProfileResult<Option<Duplicates>> {
        if self.settings.duplicates.head == 0 {
            return Ok(None);
        }
        let supported = columns_of(table, |t| t != SemanticType::Unsupported);
        if table.n == 0 || supported.is_empty() {
            return Ok(Some(Duplicates::none()));
        }
        aggregator
            .duplicates(&self.settings, frame, &supported, table.n)
            .await
            .map(Some)
    }

    async fn correlations(
        &self,
        aggregator: &dyn TableAggregator,
        frame: &Frame,
        table: &TableSummary,
    ) -> ProfileResult<BTreeMap<CorrelationMethod, CorrelationMatrix>> {
        let numeric = columns_of(table, |t| t == SemanticType::Numeric);
        let mut correlations = BTreeMap::new();
        for method in CorrelationMethod::enabled(&self.settings.correlations) {
            let matrix = if table.n == 0 || numeric.len() < 2 {
                CorrelationMatrix::default()
            } else {
                aggregator.correlation(frame, method, &numeric).await?
            };
            correlations.insert(method, matrix);
        }
        Ok(correlations)
    }

    async fn missing_diagrams(
        &self,
        aggregator: &dyn TableAggregator,
        frame: &Frame,
        warnings: &mut Vec<ProfileWarning>,
    ) -> ProfileResult<Vec<MissingDiagram>> {
        let enabled = &self.settings.missing_diagrams;
        let mut diagrams = Vec::new();
        if frame.column_names().is_empty() {
            return Ok(diagrams);
        }
        if enabled.bar {
            diagrams.push(MissingDiagram::Bar(aggregator.missing_bar(frame).await?));
        }
        if enabled.heatmap {
            diagrams.push(MissingDiagram::Heatmap(
                aggregator.missing_heatmap(frame).await?,
            ));
        }
        if enabled.matrix {
            match aggregator.missing_matrix(frame).await? {
                Capability::Supported(matrix) => diagrams.push(MissingDiagram::Matrix(matrix)),
                Capability::Unsupported(reason) => {
                    warnings.push(ProfileWarning::new("missing:matrix", reason).emit());
                }
            }
        }
        Ok(diagrams)
    }

    async fn samples(
        &self,
        aggregator: &dyn TableAggregator,
        frame: &Frame,
        n_rows: u64,
        warnings: &mut Vec<ProfileWarning>,
    ) -> ProfileResult<Vec<Sample>> {
        let counts = &self.settings.samples;
        let mut samples = Vec::new();
        if n_rows == 0 {
            return Ok(samples);
        }
        for (kind, n) in [
            (SampleKind::Head, counts.head),
            (SampleKind::Tail, counts.tail),
            (SampleKind::Random, counts.random),
        ] {
            if n == 0 {
                continue;
            }
            match aggregator.sample(&self.settings, frame, kind, n).await? {
                Capability::Supported(sample) => samples.push(sample),
                Capability::Unsupported(reason) => {
                    warnings.push(ProfileWarning::new(format!("sample:{kind}"), reason).emit());
                }
            }
        }
        Ok(samples)
    }
}

/// Runs the chain of `column`'s semantic type and records the type.
async fn describe_column(
    registry: &DispatchRegistry,
    settings: &Settings,
    column: &Column,
) -> ProfileResult<ColumnSummary> {
    let semantic_type = classify(column.field());
    let mut summary = ColumnSummary::new();
    for op in DescribeOp::chain(semantic_type) {
        let describer = registry.describer(op, column.backend())?;
        summary = describer.describe(settings, column, summary).await?;
    }
    summary.insert(keys::TYPE, semantic_type.as_str());
    Ok(summary)
}

fn columns_of(table: &TableSummary, keep: impl Fn(SemanticType) -> bool) -> Vec<String> {
    table
        .variables
        .iter()
        .filter(|(_, summary)| {
            summary
                .type_name()
                .and_then(semantic_type_named)
                .is_some_and(&keep)
        })
        .map(|(name, _)| name.clone())
        .collect()
}

fn semantic_type_named(name: &str) -> Option<SemanticType> {
    [
        SemanticType::Numeric,
        SemanticType::Categorical,
        SemanticType::Boolean,
        SemanticType::DateTime,
        SemanticType::Unsupported,
    ]
    .into_iter()
    .find(|t| t.as_str() == name)
}

/// Builder for [`Profiler`].
#[derive(Default)]
pub struct ProfilerBuilder {
    settings: Settings,
    registry: Option<Arc<DispatchRegistry>>,
    progress: Option<ProgressCallback>,
}

impl ProfilerBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Uses `registry` instead of the process-wide registry.
    pub fn registry(mut self, registry: DispatchRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProfilerProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Validates the settings and builds the profiler.
    pub fn build(self) -> ProfileResult<Profiler> {
        self.settings.validate()?;
        Ok(Profiler {
            settings: Arc::new(self.settings),
            registry: self.registry,
            progress: self.progress,
        })
    }
}

/// Profiles `frame` with `settings` and the process-wide registry.
pub async fn describe(settings: Settings, frame: &Frame) -> ProfileResult<Description> {
    Profiler::builder().settings(settings).build()?.describe(frame).await
}
