//! Partitioned map/reduce backend.
//!
//! A [`ClusterFrame`] is an ordered list of record batch partitions. Every
//! statistic is computed as a per-partition partial state on the blocking
//! pool and merged on the driver. Statistics that need a global value
//! (central moments, histogram edges, Pearson deviations) run a second pass
//! with the merged result of the first.

mod describe;
mod partial;
mod table;

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::datatypes::{FieldRef, SchemaRef};
use arrow::record_batch::RecordBatch;
use futures::future::try_join_all;

use crate::backends::DescribeOp;
use crate::error::{ProfileError, ProfileResult};
use crate::frame::BackendKind;
use crate::preprocess::PreprocessPlan;
use crate::registry::DispatchRegistry;

pub use describe::{
    ClusterBoolean, ClusterCategorical, ClusterCounts, ClusterDate, ClusterGeneric,
    ClusterNumeric, ClusterSupported,
};
pub use partial::PartialState;
pub use table::ClusterAggregator;

/// A table split into ordered partitions sharing one schema.
#[derive(Debug, Clone)]
pub struct ClusterFrame {
    schema: SchemaRef,
    partitions: Vec<RecordBatch>,
}

impl ClusterFrame {
    /// Creates a frame, checking that every partition has `schema`'s fields.
    pub fn try_new(schema: SchemaRef, partitions: Vec<RecordBatch>) -> ProfileResult<Self> {
        for (index, partition) in partitions.iter().enumerate() {
            if partition.schema().fields() != schema.fields() {
                return Err(ProfileError::invalid_data(format!(
                    "partition {index} does not match the frame schema"
                )));
            }
        }
        Ok(Self { schema, partitions })
    }

    /// Splits `batch` into `n_partitions` contiguous partitions of near-equal size.
    pub fn from_batch(batch: &RecordBatch, n_partitions: usize) -> Self {
        let n_partitions = n_partitions.max(1);
        let rows = batch.num_rows();
        let size = rows.div_ceil(n_partitions).max(1);
        let mut partitions = Vec::with_capacity(n_partitions);
        let mut offset = 0;
        while offset < rows {
            let length = size.min(rows - offset);
            partitions.push(batch.slice(offset, length));
            offset += length;
        }
        if partitions.is_empty() {
            partitions.push(batch.slice(0, 0));
        }
        Self {
            schema: batch.schema(),
            partitions,
        }
    }

    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    pub fn partitions(&self) -> &[RecordBatch] {
        &self.partitions
    }

    pub fn num_rows(&self) -> usize {
        self.partitions.iter().map(RecordBatch::num_rows).sum()
    }

    pub fn column(&self, name: &str) -> ProfileResult<ClusterColumn> {
        let index = self
            .schema
            .index_of(name)
            .map_err(|_| ProfileError::ColumnNotFound(name.to_string()))?;
        Ok(ClusterColumn {
            field: Arc::new(self.schema.field(index).clone()),
            partitions: self
                .partitions
                .iter()
                .map(|partition| Arc::clone(partition.column(index)))
                .collect(),
        })
    }

    pub(crate) fn apply(&self, plan: &PreprocessPlan) -> ProfileResult<Self> {
        let partitions = self
            .partitions
            .iter()
            .map(|partition| plan.apply_to_batch(partition))
            .collect::<ProfileResult<Vec<_>>>()?;
        Ok(Self {
            schema: plan.schema(&self.schema),
            partitions,
        })
    }
}

/// One column of a [`ClusterFrame`], partition by partition.
#[derive(Debug, Clone)]
pub struct ClusterColumn {
    field: FieldRef,
    partitions: Vec<ArrayRef>,
}

impl ClusterColumn {
    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    pub fn partitions(&self) -> &[ArrayRef] {
        &self.partitions
    }
}

/// Runs `map` over every item on the blocking pool, keeping item order.
pub(crate) async fn map_partitions<I, T, F>(items: Vec<I>, map: F) -> ProfileResult<Vec<T>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> ProfileResult<T> + Send + Sync + 'static,
{
    let map = Arc::new(map);
    let handles = items.into_iter().map(|item| {
        let map = Arc::clone(&map);
        tokio::task::spawn_blocking(move || map(item))
    });
    try_join_all(handles).await?.into_iter().collect()
}

/// Maps every partition to a partial state and merges the results.
pub(crate) async fn map_reduce<I, S, F>(items: Vec<I>, map: F) -> ProfileResult<S>
where
    I: Send + 'static,
    S: PartialState + 'static,
    F: Fn(I) -> ProfileResult<S> + Send + Sync + 'static,
{
    S::merge(map_partitions(items, map).await?)
}

pub(crate) fn register(registry: &mut DispatchRegistry) {
    let cluster = BackendKind::Cluster;
    registry.register_describer(DescribeOp::Counts, cluster, Arc::new(ClusterCounts));
    registry.register_describer(DescribeOp::Generic, cluster, Arc::new(ClusterGeneric));
    registry.register_describer(DescribeOp::Supported, cluster, Arc::new(ClusterSupported));
    registry.register_describer(DescribeOp::Numeric, cluster, Arc::new(ClusterNumeric));
    registry.register_describer(DescribeOp::Categorical, cluster, Arc::new(ClusterCategorical));
    registry.register_describer(DescribeOp::Boolean, cluster, Arc::new(ClusterBoolean));
    registry.register_describer(DescribeOp::DateTime, cluster, Arc::new(ClusterDate));
    registry.register_aggregator(Arc::new(ClusterAggregator));
}
