//! Prelude for commonly used types and traits in profunda.

pub use crate::backends::memory::MemoryFrame;
pub use crate::backends::{Capability, DescribeOp, Describer, TableAggregator};
pub use crate::config::{Settings, SortOrder};
pub use crate::describe::{Description, Profiler, ProfilerProgress};
pub use crate::error::{ProfileError, ProfileResult};
pub use crate::frame::{BackendKind, Column, Frame};
pub use crate::logging::LogConfig;
pub use crate::registry::DispatchRegistry;
pub use crate::stats::{CorrelationMatrix, CorrelationMethod};
pub use crate::summary::{ColumnSummary, SummaryValue, TableSummary};
pub use crate::types::SemanticType;
pub use crate::warning::ProfileWarning;

#[cfg(feature = "cluster")]
pub use crate::backends::cluster::ClusterFrame;
#[cfg(feature = "lazy")]
pub use crate::backends::lazy::LazyFrame;
