//! Rule-based table extraction from text block positions.
//!
//! Uses no external model, so it terminates every fallback chain. On input
//! with no grid of at least two rows and two columns it reports "no table
//! found" rather than failing.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::cancel::CancellationFlag;
use crate::config::ExtractionConfig;
use crate::document::DocumentId;
use crate::elements::{ParsedPage, TextContent};
use crate::error::Result;
use crate::geometry::{bounding_box, Rect};
use crate::layout::table_detector::{detect_tables, DetectedGrid, GridTolerance};
use crate::tables::extractor::{Detection, DetectionRequest, TableExtractor};
use crate::tables::method::DetectionMethod;
use crate::tables::model::{Cell, Table, TableRegion};

/// Whitespace-grid extractor.
#[derive(Debug, Clone)]
pub struct RuleBasedExtractor {
    tolerance: GridTolerance,
    caption_distance: f32,
}

impl Default for RuleBasedExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl RuleBasedExtractor {
    /// Create an extractor using the configured tolerances.
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            tolerance: GridTolerance {
                row: config.row_tolerance,
                col: config.col_tolerance,
            },
            caption_distance: config.caption_distance,
        }
    }

    /// Extract the tables on one page.
    pub fn extract_page(
        &self,
        document_id: &DocumentId,
        page: &ParsedPage,
        cancel: &CancellationFlag,
    ) -> Result<Vec<Table>> {
        let (captions, blocks): (Vec<&TextContent>, Vec<&TextContent>) =
            page.text_blocks().partition(|t| t.is_caption());

        let grids = detect_tables(&blocks, self.tolerance, cancel)?;
        let mut used_captions = HashSet::new();

        let tables = grids
            .iter()
            .enumerate()
            .map(|(i, grid)| {
                let caption = self.nearest_caption(&grid.bbox, &captions, &mut used_captions);
                build_table(document_id, page.index, i, grid, &blocks).with_caption(caption)
            })
            .collect();

        Ok(tables)
    }

    /// Closest unused caption within `caption_distance` above or below the table.
    fn nearest_caption(
        &self,
        bbox: &Rect,
        captions: &[&TextContent],
        used: &mut HashSet<usize>,
    ) -> Option<String> {
        let (idx, _) = captions
            .iter()
            .enumerate()
            .filter(|(i, _)| !used.contains(i))
            .map(|(i, c)| (i, c.bbox.vertical_gap(bbox)))
            .filter(|(_, gap)| *gap <= self.caption_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))?;
        used.insert(idx);
        Some(captions[idx].text.trim().to_string())
    }
}

fn build_table(
    document_id: &DocumentId,
    page: usize,
    index: usize,
    grid: &DetectedGrid,
    blocks: &[&TextContent],
) -> Table {
    let confidence = grid.regularity();
    let mut cells = Vec::new();

    for (r, row) in grid.cells.iter().enumerate() {
        for (c, members) in row.iter().enumerate() {
            if members.is_empty() {
                continue;
            }
            let text = members
                .iter()
                .map(|&i| blocks[i].text.trim())
                .collect::<Vec<_>>()
                .join(" ");
            let mut cell = Cell::new(r, c, text)
                .with_confidence(confidence)
                .header(grid.has_header && r == 0);
            if let Some(bbox) = bounding_box(members.iter().map(|&i| &blocks[i].bbox)) {
                cell = cell.with_bbox(bbox);
            }
            cells.push(cell);
        }
    }

    Table::from_cells(
        Table::make_id(document_id, page, index),
        document_id.clone(),
        TableRegion {
            page,
            bbox: grid.bbox,
        },
        DetectionMethod::RuleBased,
        cells,
    )
    .with_reported_confidence(confidence)
}

#[async_trait]
impl TableExtractor for RuleBasedExtractor {
    async fn detect(&self, request: &DetectionRequest<'_>) -> Result<Detection> {
        let mut tables = Vec::new();
        for page in &request.content.pages {
            request.cancel.check()?;
            tables.extend(self.extract_page(request.document_id, page, request.cancel)?);
        }

        log::debug!(
            "Rule-based detection found {} table(s) in document {}",
            tables.len(),
            request.document_id
        );
        Ok(Detection::new(tables))
    }

    fn method(&self) -> DetectionMethod {
        DetectionMethod::RuleBased
    }

    fn name(&self) -> &'static str {
        "rule_based"
    }
}
