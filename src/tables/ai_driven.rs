//! Table extraction delegated to an external layout model.
//!
//! The model finds table regions and infers their structure; this module only
//! lays the reported cells onto a grid. Any failure to reach the model is
//! reported as [`Error::ModelUnavailable`] so the service can fall back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ExtractionConfig;
use crate::document::DocumentId;
use crate::elements::{ParsedContent, TableRegionContent};
use crate::error::{Error, Result};
use crate::tables::extractor::{Detection, DetectionRequest, TableExtractor};
use crate::tables::method::DetectionMethod;
use crate::tables::model::{Cell, Table, TableRegion};

/// Most rows or columns a model table may span.
const MAX_GRID_DIMENSION: usize = 1_000;

/// Most grid positions a model table may cover.
const MAX_GRID_CELLS: usize = 100_000;

/// A table region reported by a layout model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTable {
    /// Page index (0-based)
    pub page: usize,
    /// Region with cells
    pub region: TableRegionContent,
}

/// The external layout-analysis model boundary.
#[async_trait]
pub trait LayoutModel: Send + Sync {
    /// Find table regions and their cell structure.
    ///
    /// # Errors
    ///
    /// [`Error::ModelUnavailable`] when the model cannot be invoked.
    async fn analyze(&self, content: &ParsedContent) -> Result<Vec<ModelTable>>;

    /// Return the name of this model for debugging.
    fn name(&self) -> &'static str;
}

/// Uses the table regions the parsing engine already embedded in the content.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedLayoutModel;

#[async_trait]
impl LayoutModel for EmbeddedLayoutModel {
    async fn analyze(&self, content: &ParsedContent) -> Result<Vec<ModelTable>> {
        Ok(content
            .pages
            .iter()
            .flat_map(|page| {
                page.table_regions().map(move |region| ModelTable {
                    page: page.index,
                    region: region.clone(),
                })
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "embedded"
    }
}

/// Stands in for a model whose runtime could not be loaded.
#[derive(Debug, Clone)]
pub struct UnavailableLayoutModel {
    reason: String,
}

impl UnavailableLayoutModel {
    /// Create a model that always fails with `reason`.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LayoutModel for UnavailableLayoutModel {
    async fn analyze(&self, _content: &ParsedContent) -> Result<Vec<ModelTable>> {
        Err(Error::model_unavailable(self.reason.clone()))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

/// Extractor backed by a [`LayoutModel`].
#[derive(Clone)]
pub struct AiDrivenExtractor {
    model: Arc<dyn LayoutModel>,
    timeout: Duration,
}

impl std::fmt::Debug for AiDrivenExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiDrivenExtractor")
            .field("model", &self.model.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AiDrivenExtractor {
    /// Create an extractor bounded by the configured model timeout.
    pub fn new(model: Arc<dyn LayoutModel>, config: &ExtractionConfig) -> Self {
        Self {
            model,
            timeout: config.model_timeout(),
        }
    }

    /// Call the model, racing it against the deadline and cancellation.
    async fn call_model(&self, request: &DetectionRequest<'_>) -> Result<Vec<ModelTable>> {
        request.cancel.check()?;

        let call = tokio::time::timeout(self.timeout, self.model.analyze(request.content));
        let outcome = tokio::select! {
            biased;
            _ = request.cancel.cancelled() => {
                log::info!("Layout model call cancelled for document {}", request.document_id);
                return Err(Error::Cancelled);
            }
            outcome = call => outcome,
        };

        match outcome {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    "Layout model '{}' timed out after {:?}",
                    self.model.name(),
                    self.timeout
                );
                Err(Error::model_unavailable(format!(
                    "layout model timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }
}

fn build_table(document_id: &DocumentId, index: usize, model_table: ModelTable) -> Result<Table> {
    let ModelTable { page, region } = model_table;

    let out_of_range = |what: String| {
        Error::extraction(
            DetectionMethod::AiDriven,
            format!("{} out of range on page {}", what, page),
        )
    };

    let mut cells = Vec::with_capacity(region.cells.len());
    let (mut num_rows, mut num_cols) = (0usize, 0usize);
    for c in region.cells {
        let row_end = c.row.checked_add(c.rowspan.max(1));
        let col_end = c.col.checked_add(c.colspan.max(1));
        let (row_end, col_end) = match (row_end, col_end) {
            (Some(r), Some(col)) if r <= MAX_GRID_DIMENSION && col <= MAX_GRID_DIMENSION => {
                (r, col)
            }
            _ => {
                return Err(out_of_range(format!(
                    "cell ({}, {}) spanning {}x{}",
                    c.row, c.col, c.rowspan, c.colspan
                )))
            }
        };
        num_rows = num_rows.max(row_end);
        num_cols = num_cols.max(col_end);

        let mut cell = Cell::new(c.row, c.col, c.text)
            .with_span(c.rowspan, c.colspan)
            .with_confidence(c.confidence)
            .header(c.is_header);
        if let Some(bbox) = c.bbox {
            cell = cell.with_bbox(bbox);
        }
        cells.push(cell);
    }

    if num_rows * num_cols > MAX_GRID_CELLS {
        return Err(out_of_range(format!("{}x{} grid", num_rows, num_cols)));
    }

    let mut table = Table::from_cells(
        Table::make_id(document_id, page, index),
        document_id.clone(),
        TableRegion {
            page,
            bbox: region.bbox,
        },
        DetectionMethod::AiDriven,
        cells,
    )
    .with_caption(region.caption);
    if let Some(confidence) = region.confidence {
        table = table.with_reported_confidence(confidence);
    }
    Ok(table)
}

#[async_trait]
impl TableExtractor for AiDrivenExtractor {
    async fn detect(&self, request: &DetectionRequest<'_>) -> Result<Detection> {
        let model_tables = self.call_model(request).await?;

        let mut per_page: HashMap<usize, usize> = HashMap::new();
        let mut tables = Vec::with_capacity(model_tables.len());
        for model_table in model_tables {
            if model_table.region.cells.is_empty() {
                log::debug!("Skipping table region without cells on page {}", model_table.page);
                continue;
            }
            let index = per_page.entry(model_table.page).or_insert(0);
            tables.push(build_table(request.document_id, *index, model_table)?);
            *index += 1;
        }

        log::debug!(
            "Layout model '{}' found {} table(s) in document {}",
            self.model.name(),
            tables.len(),
            request.document_id
        );
        Ok(Detection::new(tables))
    }

    fn method(&self) -> DetectionMethod {
        DetectionMethod::AiDriven
    }

    fn name(&self) -> &'static str {
        "ai_driven"
    }
}
