//! Table preparation before profiling.
//!
//! Column names are normalized and columns of types no describer handles
//! are dropped with a warning. The plan is computed from the schema once
//! and applied by each backend to its own representation.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, FieldRef, Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use tracing::debug;

use crate::error::ProfileResult;
use crate::frame::Frame;
use crate::types::is_bad_type;
use crate::warning::ProfileWarning;

/// Which columns survive preprocessing, and under which name.
#[derive(Debug, Clone)]
pub struct PreprocessPlan {
    /// Source index and output field of every kept column.
    pub kept: Vec<(usize, FieldRef)>,
    /// Name and type of every dropped column.
    pub dropped: Vec<(String, DataType)>,
}

impl PreprocessPlan {
    pub fn from_schema(schema: &Schema) -> Self {
        let mut kept = Vec::new();
        let mut dropped = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (index, field) in schema.fields().iter().enumerate() {
            if is_bad_type(field) {
                dropped.push((field.name().clone(), field.data_type().clone()));
                continue;
            }
            let name = unique_name(normalize_name(field.name(), index), &mut seen);
            let field: FieldRef = if &name == field.name() {
                Arc::clone(field)
            } else {
                Arc::new(Field::clone(field).with_name(name))
            };
            kept.push((index, field));
        }
        Self { kept, dropped }
    }

    /// Schema of the preprocessed table.
    pub fn schema(&self, source: &Schema) -> SchemaRef {
        let fields: Vec<FieldRef> = self.kept.iter().map(|(_, f)| Arc::clone(f)).collect();
        Arc::new(Schema::new_with_metadata(fields, source.metadata().clone()))
    }

    /// True when nothing is dropped or renamed.
    pub fn is_identity(&self, source: &Schema) -> bool {
        self.dropped.is_empty()
            && self.kept.len() == source.fields().len()
            && self
                .kept
                .iter()
                .all(|(i, f)| source.field(*i).name() == f.name())
    }

    pub fn warning(&self) -> Option<ProfileWarning> {
        if self.dropped.is_empty() {
            return None;
        }
        let columns: Vec<String> = self
            .dropped
            .iter()
            .map(|(name, data_type)| format!("'{name}' ({data_type})"))
            .collect();
        Some(ProfileWarning::new(
            "preprocess",
            format!(
                "Dropped columns of unsupported types: {}",
                columns.join(", ")
            ),
        ))
    }

    /// Applies the plan to a record batch.
    pub fn apply_to_batch(&self, batch: &RecordBatch) -> ProfileResult<RecordBatch> {
        let schema = self.schema(batch.schema_ref());
        let columns = self
            .kept
            .iter()
            .map(|(i, _)| Arc::clone(batch.column(*i)))
            .collect();
        let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
        Ok(RecordBatch::try_new_with_options(schema, columns, &options)?)
    }
}

fn normalize_name(name: &str, index: usize) -> String {
    if name.trim().is_empty() {
        format!("Unnamed: {index}")
    } else {
        name.to_string()
    }
}

fn unique_name(name: String, seen: &mut HashSet<String>) -> String {
    if seen.insert(name.clone()) {
        return name;
    }
    let mut suffix = 1;
    loop {
        let candidate = format!("{name}.{suffix}");
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Normalizes and filters a frame for profiling.
///
/// The warning for dropped columns is returned, not emitted.
pub async fn preprocess(frame: &Frame) -> ProfileResult<(Frame, Option<ProfileWarning>)> {
    let schema = frame.schema();
    let plan = PreprocessPlan::from_schema(&schema);
    let warning = plan.warning();
    if plan.is_identity(&schema) {
        return Ok((frame.clone(), warning));
    }
    let prepared = match frame {
        Frame::Memory(memory) => Frame::Memory(memory.apply(&plan)?),
        #[cfg(feature = "cluster")]
        Frame::Cluster(cluster) => Frame::Cluster(cluster.apply(&plan)?),
        #[cfg(feature = "lazy")]
        Frame::Lazy(lazy) => Frame::Lazy(lazy.apply(&plan).await?),
    };
    debug!(
        kept = plan.kept.len(),
        dropped = plan.dropped.len(),
        "frame preprocessed"
    );
    Ok((prepared, warning))
}
