//! SQL pushdown backend over DataFusion.
//!
//! A [`LazyFrame`] names a table registered in a [`SessionContext`]. Every
//! statistic is an aggregate query; only aggregate results and capped
//! frequency tables are materialized. Statistics that need per-row order
//! (the missing matrix, tail and random samples, monotonicity) are not
//! available.

mod describe;
pub(crate) mod sql;
mod table;

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::{FieldRef, SchemaRef};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::logical_expr::ident;
use datafusion::prelude::SessionContext;
use datafusion::sql::TableReference;
use tracing::debug;

use crate::backends::DescribeOp;
use crate::error::{ProfileError, ProfileResult};
use crate::frame::BackendKind;
use crate::preprocess::PreprocessPlan;
use crate::registry::DispatchRegistry;

pub use describe::{
    LazyBoolean, LazyCategorical, LazyCounts, LazyDate, LazyGeneric, LazyNumeric, LazySupported,
};
pub use table::LazyAggregator;

/// A table registered in a DataFusion session.
#[derive(Clone)]
pub struct LazyFrame {
    ctx: SessionContext,
    table: String,
    schema: SchemaRef,
}

impl fmt::Debug for LazyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyFrame")
            .field("table", &self.table)
            .field("schema", &self.schema)
            .finish()
    }
}

impl LazyFrame {
    /// Wraps the table `table` of `ctx`, which must already be registered.
    pub async fn try_new(ctx: SessionContext, table: impl Into<String>) -> ProfileResult<Self> {
        let table = table.into();
        let df = ctx.table(TableReference::bare(table.as_str())).await?;
        let schema = Arc::new(df.schema().as_arrow().clone());
        Ok(Self { ctx, table, schema })
    }

    /// Registers `batch` as `table` in a fresh session.
    pub async fn from_batch(table: impl Into<String>, batch: RecordBatch) -> ProfileResult<Self> {
        let table = table.into();
        let ctx = SessionContext::new();
        let provider = MemTable::try_new(batch.schema(), vec![vec![batch]])?;
        ctx.register_table(TableReference::bare(table.as_str()), Arc::new(provider))?;
        Self::try_new(ctx, table).await
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    pub fn column(&self, name: &str) -> ProfileResult<LazyColumn> {
        let field = self
            .schema
            .field_with_name(name)
            .map_err(|_| ProfileError::ColumnNotFound(name.to_string()))?;
        Ok(LazyColumn {
            ctx: self.ctx.clone(),
            table: self.table.clone(),
            field: Arc::new(field.clone()),
        })
    }

    /// Registers a view applying `plan` and returns a frame over it.
    pub(crate) async fn apply(&self, plan: &PreprocessPlan) -> ProfileResult<Self> {
        let view = format!("{}_profile_input", self.table);
        let projection = plan
            .kept
            .iter()
            .map(|(index, field)| ident(self.schema.field(*index).name()).alias(field.name()))
            .collect::<Vec<_>>();
        let df = self
            .ctx
            .table(TableReference::bare(self.table.as_str()))
            .await?
            .select(projection)?;
        self.ctx
            .register_table(TableReference::bare(view.as_str()), df.into_view())?;
        debug!(table = %self.table, view = %view, "registered preprocessed view");
        Self::try_new(self.ctx.clone(), view).await
    }
}

/// One column of a [`LazyFrame`].
#[derive(Clone)]
pub struct LazyColumn {
    ctx: SessionContext,
    table: String,
    field: FieldRef,
}

impl fmt::Debug for LazyColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyColumn")
            .field("table", &self.table)
            .field("field", &self.field)
            .finish()
    }
}

impl LazyColumn {
    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// A derived table exposing the column as `v`, NaN mapped to NULL.
    pub(crate) fn source(&self) -> ProfileResult<String> {
        sql::column_source(&self.table, &self.field)
    }
}

pub(crate) fn register(registry: &mut DispatchRegistry) {
    let lazy = BackendKind::Lazy;
    registry.register_describer(DescribeOp::Counts, lazy, Arc::new(LazyCounts));
    registry.register_describer(DescribeOp::Generic, lazy, Arc::new(LazyGeneric));
    registry.register_describer(DescribeOp::Supported, lazy, Arc::new(LazySupported));
    registry.register_describer(DescribeOp::Numeric, lazy, Arc::new(LazyNumeric));
    registry.register_describer(DescribeOp::Categorical, lazy, Arc::new(LazyCategorical));
    registry.register_describer(DescribeOp::Boolean, lazy, Arc::new(LazyBoolean));
    registry.register_describer(DescribeOp::DateTime, lazy, Arc::new(LazyDate));
    registry.register_aggregator(Arc::new(LazyAggregator));
}
