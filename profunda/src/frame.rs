//! Backend-tagged tables and columns.
//!
//! [`Frame`] and [`Column`] are closed unions over the compiled backends.
//! Matching on them is the only place the crate branches on the runtime
//! shape of the data; everything else goes through the
//! [`registry`](crate::registry).

use std::fmt;

use arrow::datatypes::{FieldRef, SchemaRef};
use serde::{Deserialize, Serialize};

use crate::backends::memory::{MemoryColumn, MemoryFrame};
use crate::error::{ProfileError, ProfileResult};

#[cfg(feature = "cluster")]
use crate::backends::cluster::{ClusterColumn, ClusterFrame};
#[cfg(feature = "lazy")]
use crate::backends::lazy::{LazyColumn, LazyFrame};

/// Identifies an execution backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Arrow arrays held in process; the reference implementation.
    Memory,
    /// Ordered record batch partitions processed map/reduce style.
    Cluster,
    /// A table registered in a DataFusion session, profiled through SQL.
    Lazy,
}

impl BackendKind {
    /// All backends, in registration order.
    pub const ALL: [BackendKind; 3] = [BackendKind::Memory, BackendKind::Cluster, BackendKind::Lazy];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Cluster => "cluster",
            BackendKind::Lazy => "lazy",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table to profile.
#[derive(Debug, Clone)]
pub enum Frame {
    Memory(MemoryFrame),
    #[cfg(feature = "cluster")]
    Cluster(ClusterFrame),
    #[cfg(feature = "lazy")]
    Lazy(LazyFrame),
}

impl Frame {
    pub fn backend(&self) -> BackendKind {
        match self {
            Frame::Memory(_) => BackendKind::Memory,
            #[cfg(feature = "cluster")]
            Frame::Cluster(_) => BackendKind::Cluster,
            #[cfg(feature = "lazy")]
            Frame::Lazy(_) => BackendKind::Lazy,
        }
    }

    pub fn schema(&self) -> SchemaRef {
        match self {
            Frame::Memory(frame) => frame.schema(),
            #[cfg(feature = "cluster")]
            Frame::Cluster(frame) => frame.schema(),
            #[cfg(feature = "lazy")]
            Frame::Lazy(frame) => frame.schema(),
        }
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<String> {
        self.schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Returns the named column as a backend-tagged [`Column`].
    pub fn column(&self, name: &str) -> ProfileResult<Column> {
        match self {
            Frame::Memory(frame) => frame.column(name).map(Column::Memory),
            #[cfg(feature = "cluster")]
            Frame::Cluster(frame) => frame.column(name).map(Column::Cluster),
            #[cfg(feature = "lazy")]
            Frame::Lazy(frame) => frame.column(name).map(Column::Lazy),
        }
    }

    pub fn as_memory(&self) -> ProfileResult<&MemoryFrame> {
        match self {
            Frame::Memory(frame) => Ok(frame),
            #[allow(unreachable_patterns)]
            other => Err(mismatch(BackendKind::Memory, other.backend())),
        }
    }

    #[cfg(feature = "cluster")]
    pub fn as_cluster(&self) -> ProfileResult<&ClusterFrame> {
        match self {
            Frame::Cluster(frame) => Ok(frame),
            other => Err(mismatch(BackendKind::Cluster, other.backend())),
        }
    }

    #[cfg(feature = "lazy")]
    pub fn as_lazy(&self) -> ProfileResult<&LazyFrame> {
        match self {
            Frame::Lazy(frame) => Ok(frame),
            other => Err(mismatch(BackendKind::Lazy, other.backend())),
        }
    }
}

impl From<MemoryFrame> for Frame {
    fn from(frame: MemoryFrame) -> Self {
        Frame::Memory(frame)
    }
}

#[cfg(feature = "cluster")]
impl From<ClusterFrame> for Frame {
    fn from(frame: ClusterFrame) -> Self {
        Frame::Cluster(frame)
    }
}

#[cfg(feature = "lazy")]
impl From<LazyFrame> for Frame {
    fn from(frame: LazyFrame) -> Self {
        Frame::Lazy(frame)
    }
}

/// A single column of a [`Frame`].
#[derive(Debug, Clone)]
pub enum Column {
    Memory(MemoryColumn),
    #[cfg(feature = "cluster")]
    Cluster(ClusterColumn),
    #[cfg(feature = "lazy")]
    Lazy(LazyColumn),
}

impl Column {
    pub fn backend(&self) -> BackendKind {
        match self {
            Column::Memory(_) => BackendKind::Memory,
            #[cfg(feature = "cluster")]
            Column::Cluster(_) => BackendKind::Cluster,
            #[cfg(feature = "lazy")]
            Column::Lazy(_) => BackendKind::Lazy,
        }
    }

    pub fn field(&self) -> &FieldRef {
        match self {
            Column::Memory(column) => column.field(),
            #[cfg(feature = "cluster")]
            Column::Cluster(column) => column.field(),
            #[cfg(feature = "lazy")]
            Column::Lazy(column) => column.field(),
        }
    }

    pub fn name(&self) -> &str {
        self.field().name()
    }

    pub fn as_memory(&self) -> ProfileResult<&MemoryColumn> {
        match self {
            Column::Memory(column) => Ok(column),
            #[allow(unreachable_patterns)]
            other => Err(mismatch(BackendKind::Memory, other.backend())),
        }
    }

    #[cfg(feature = "cluster")]
    pub fn as_cluster(&self) -> ProfileResult<&ClusterColumn> {
        match self {
            Column::Cluster(column) => Ok(column),
            other => Err(mismatch(BackendKind::Cluster, other.backend())),
        }
    }

    #[cfg(feature = "lazy")]
    pub fn as_lazy(&self) -> ProfileResult<&LazyColumn> {
        match self {
            Column::Lazy(column) => Ok(column),
            other => Err(mismatch(BackendKind::Lazy, other.backend())),
        }
    }
}

fn mismatch(expected: BackendKind, actual: BackendKind) -> ProfileError {
    ProfileError::BackendMismatch { expected, actual }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Memory.to_string(), "memory");
        assert_eq!(BackendKind::Cluster.to_string(), "cluster");
        assert_eq!(BackendKind::Lazy.to_string(), "lazy");
    }

    #[test]
    fn test_backend_kind_serde() {
        let json = serde_json::to_string(&BackendKind::Lazy).unwrap();
        assert_eq!(json, "\"lazy\"");
        let back: BackendKind = serde_json::from_str("\"cluster\"").unwrap();
        assert_eq!(back, BackendKind::Cluster);
    }
}
