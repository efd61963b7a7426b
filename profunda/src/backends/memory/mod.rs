//! In-process Arrow backend.
//!
//! Every statistic is computed directly over Arrow arrays. This is the
//! reference implementation: the registry falls back to it for any memory
//! operation without an explicit registration, and the other backends are
//! tested for agreement with it.

pub(crate) mod arrays;
mod describe;
pub(crate) mod table;

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::compute::concat_batches;
use arrow::datatypes::{FieldRef, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::backends::{DescribeOp, Describer, TableAggregator};
use crate::error::{ProfileError, ProfileResult};
use crate::frame::BackendKind;
use crate::preprocess::PreprocessPlan;
use crate::registry::DispatchRegistry;

pub use describe::{
    MemoryBoolean, MemoryCategorical, MemoryCounts, MemoryDate, MemoryGeneric, MemoryNumeric,
    MemorySupported,
};
pub(crate) use describe::numeric_stats;
pub use table::MemoryAggregator;

/// A table held in process as a single record batch.
#[derive(Debug, Clone)]
pub struct MemoryFrame {
    batch: RecordBatch,
}

impl MemoryFrame {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Concatenates `batches` into one frame.
    pub fn try_from_batches(schema: SchemaRef, batches: &[RecordBatch]) -> ProfileResult<Self> {
        Ok(Self::new(concat_batches(&schema, batches)?))
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn column(&self, name: &str) -> ProfileResult<MemoryColumn> {
        let schema = self.batch.schema();
        let (index, field) = schema
            .column_with_name(name)
            .ok_or_else(|| ProfileError::ColumnNotFound(name.to_string()))?;
        Ok(MemoryColumn {
            field: Arc::new(field.clone()),
            array: Arc::clone(self.batch.column(index)),
        })
    }

    pub(crate) fn apply(&self, plan: &PreprocessPlan) -> ProfileResult<Self> {
        Ok(Self::new(plan.apply_to_batch(&self.batch)?))
    }
}

impl From<RecordBatch> for MemoryFrame {
    fn from(batch: RecordBatch) -> Self {
        Self::new(batch)
    }
}

/// One column of a [`MemoryFrame`].
#[derive(Debug, Clone)]
pub struct MemoryColumn {
    field: FieldRef,
    array: ArrayRef,
}

impl MemoryColumn {
    pub fn new(field: FieldRef, array: ArrayRef) -> Self {
        Self { field, array }
    }

    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    pub fn array(&self) -> &ArrayRef {
        &self.array
    }
}

/// The built-in memory describer for `op`.
pub fn reference_describer(op: DescribeOp) -> Arc<dyn Describer> {
    match op {
        DescribeOp::Counts => Arc::new(MemoryCounts),
        DescribeOp::Generic => Arc::new(MemoryGeneric),
        DescribeOp::Supported => Arc::new(MemorySupported),
        DescribeOp::Numeric => Arc::new(MemoryNumeric),
        DescribeOp::Categorical => Arc::new(MemoryCategorical),
        DescribeOp::Boolean => Arc::new(MemoryBoolean),
        DescribeOp::DateTime => Arc::new(MemoryDate),
    }
}

pub fn reference_aggregator() -> Arc<dyn TableAggregator> {
    Arc::new(MemoryAggregator)
}

pub(crate) fn register(registry: &mut DispatchRegistry) {
    for op in DescribeOp::ALL {
        registry.register_describer(op, BackendKind::Memory, reference_describer(op));
    }
    registry.register_aggregator(reference_aggregator());
}
