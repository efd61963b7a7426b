//! # Profunda - exploratory profiling for tabular data
//!
//! Profunda computes the descriptive statistics of an exploratory data
//! analysis report: per-column counts, distributions, quantiles and text
//! statistics, and per-table duplicates, correlations, missing-value
//! diagrams and samples. The same statistics are produced over three
//! execution backends built on Apache Arrow:
//!
//! - **memory**: one in-process `RecordBatch`, computed with array kernels;
//! - **cluster**: partitioned batches, summarized per partition and merged;
//! - **lazy**: a DataFusion table, with every statistic pushed down as SQL.
//!
//! Statistic names and formulas are shared, so a column's `mean` or
//! `histogram` compares across backends.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use arrow::array::{Float64Array, StringArray};
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use profunda::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Arc::new(Schema::new(vec![
//!     Field::new("price", DataType::Float64, true),
//!     Field::new("category", DataType::Utf8, true),
//! ]));
//! let batch = RecordBatch::try_new(
//!     schema,
//!     vec![
//!         Arc::new(Float64Array::from(vec![Some(9.5), None, Some(12.0)])),
//!         Arc::new(StringArray::from(vec!["a", "b", "a"])),
//!     ],
//! )?;
//!
//! let settings = Settings::builder().histogram_bins(10).build()?;
//! let description = profunda::describe(settings, &Frame::Memory(MemoryFrame::new(batch))).await?;
//!
//! let price = description.variable("price").expect("profiled column");
//! println!("mean price: {}", price.f64("mean")?);
//! println!("missing cells: {}", description.table.n_cells_missing);
//! # Ok(())
//! # }
//! ```
//!
//! ## Backends
//!
//! A [`frame::Frame`] wraps the native table of a backend. The
//! [`registry::DispatchRegistry`] maps each describer operation and backend
//! to an implementation; custom implementations can be registered process
//! wide with [`registry::register_describer`] or passed to a single
//! [`describe::Profiler`].
//!
//! Not every backend supports every artifact. When a backend cannot build an
//! optional artifact, such as a tail sample from a query table, the artifact
//! is omitted and a [`warning::ProfileWarning`] is recorded. Requesting a
//! statistic that has no implementation, such as Kendall correlation on the
//! lazy backend, fails with [`error::ProfileError::NotImplemented`].
//!
//! ## Feature flags
//!
//! - `cluster` (default): the partitioned backend
//! - `lazy` (default): the DataFusion backend
//! - `test-utils`: exposes [`test_fixtures`] to downstream tests
//!
//! ## Logging
//!
//! Profunda emits `tracing` spans and events. Use
//! [`logging::setup::init_logging`] or any `tracing` subscriber to collect
//! them; [`logging::LogConfig`] controls per-column and per-query detail.

pub mod backends;
pub mod capabilities;
pub mod config;
pub mod describe;
pub mod diagrams;
pub mod error;
pub mod frame;
pub mod logging;
pub mod prelude;
pub mod preprocess;
pub mod registry;
pub mod stats;
pub mod summary;
pub mod types;
pub mod warning;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;

pub use describe::{describe, Description, Profiler};
pub use error::{ProfileError, ProfileResult};
