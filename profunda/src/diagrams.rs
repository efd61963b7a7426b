//! Diagram payloads for the rendering layer.
//!
//! Profiling only produces numbers. A [`DiagramRenderer`] turns histograms,
//! heatmaps and missing-value bars into an embeddable string; plotting
//! libraries implement it outside this crate. [`JsonRenderer`] embeds the
//! numeric payload as JSON.
//!
//! ```rust
//! use profunda::diagrams::{DiagramRenderer, JsonRenderer};
//! use profunda::stats::Histogram;
//!
//! let histogram = Histogram { counts: vec![2, 1], bin_edges: vec![0.0, 0.5, 1.0] };
//! let payload = JsonRenderer::new().render_histogram(&histogram).unwrap();
//! assert!(payload.contains("\"counts\":[2,1]"));
//! ```

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;

use crate::describe::Description;
use crate::error::ProfileResult;
use crate::stats::Histogram;
use crate::summary::{keys, MissingBar, MissingDiagram, SummaryValue};

/// Renders computed statistics into an embeddable image or markup string.
pub trait DiagramRenderer {
    fn render_histogram(&self, histogram: &Histogram) -> ProfileResult<String>;

    /// Renders a square matrix; `mask` hides the cells marked `true`.
    fn render_heatmap(
        &self,
        columns: &[String],
        values: &[Vec<f64>],
        mask: Option<&[Vec<bool>]>,
    ) -> ProfileResult<String>;

    fn render_missing_bar(&self, bar: &MissingBar) -> ProfileResult<String>;
}

/// Renders diagrams as JSON documents.
#[derive(Debug, Clone, Default)]
pub struct JsonRenderer {
    pretty: bool,
}

impl JsonRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    fn to_string<T: Serialize>(&self, value: &T) -> ProfileResult<String> {
        Ok(if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        })
    }
}

impl DiagramRenderer for JsonRenderer {
    fn render_histogram(&self, histogram: &Histogram) -> ProfileResult<String> {
        self.to_string(&json!({
            "kind": "histogram",
            "counts": histogram.counts,
            "bin_edges": histogram.bin_edges,
        }))
    }

    fn render_heatmap(
        &self,
        columns: &[String],
        values: &[Vec<f64>],
        mask: Option<&[Vec<bool>]>,
    ) -> ProfileResult<String> {
        self.to_string(&json!({
            "kind": "heatmap",
            "columns": columns,
            "values": values,
            "mask": mask,
        }))
    }

    fn render_missing_bar(&self, bar: &MissingBar) -> ProfileResult<String> {
        self.to_string(&json!({
            "kind": "missing_bar",
            "columns": bar.columns,
            "present": bar.present(),
            "n_rows": bar.n_rows,
        }))
    }
}

/// Renders every diagram of a description, keyed by a stable name such as
/// `histogram:age`, `correlation:pearson` or `missing:bar`.
pub fn render_diagrams(
    renderer: &dyn DiagramRenderer,
    description: &Description,
) -> ProfileResult<IndexMap<String, String>> {
    let mut rendered = IndexMap::new();
    for (name, summary) in &description.table.variables {
        if let Some(SummaryValue::Histogram(histogram)) = summary.get(keys::HISTOGRAM) {
            rendered.insert(
                format!("histogram:{name}"),
                renderer.render_histogram(histogram)?,
            );
        }
    }
    for (method, matrix) in &description.correlations {
        if matrix.is_empty() {
            continue;
        }
        rendered.insert(
            format!("correlation:{method}"),
            renderer.render_heatmap(&matrix.columns, &matrix.values, None)?,
        );
    }
    for diagram in &description.missing {
        let payload = match diagram {
            MissingDiagram::Bar(bar) => renderer.render_missing_bar(bar)?,
            MissingDiagram::Heatmap(heatmap) => renderer.render_heatmap(
                &heatmap.columns,
                &heatmap.values,
                Some(&heatmap.mask),
            )?,
            // The matrix is tabular already; it is embedded as is.
            MissingDiagram::Matrix(_) => continue,
        };
        rendered.insert(format!("missing:{}", diagram.kind()), payload);
    }
    Ok(rendered)
}
