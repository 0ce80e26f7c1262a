//! Table regions already structured by the parsing engine.
//!
//! These are raw model output: cell lists with explicit grid coordinates and
//! spans. They only become [`Table`](crate::tables::Table)s after an extractor
//! lays them onto a grid and the service validates them.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

fn one() -> usize {
    1
}

fn full_confidence() -> f32 {
    1.0
}

/// A cell reported inside a structured table region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCellContent {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
    /// Rows spanned
    #[serde(default = "one")]
    pub rowspan: usize,
    /// Columns spanned
    #[serde(default = "one")]
    pub colspan: usize,
    /// Cell text
    #[serde(default)]
    pub text: String,
    /// Cell bounds, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Rect>,
    /// Model confidence for this cell
    #[serde(default = "full_confidence")]
    pub confidence: f32,
    /// Header cell flag
    #[serde(default)]
    pub is_header: bool,
}

impl TableCellContent {
    /// Create a 1×1 cell with full confidence.
    pub fn new(row: usize, col: usize, text: impl Into<String>) -> Self {
        Self {
            row,
            col,
            rowspan: 1,
            colspan: 1,
            text: text.into(),
            bbox: None,
            confidence: 1.0,
            is_header: false,
        }
    }

    /// Set the spans.
    pub fn with_span(mut self, rowspan: usize, colspan: usize) -> Self {
        self.rowspan = rowspan;
        self.colspan = colspan;
        self
    }

    /// Set the confidence.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }
}

/// A table region detected and structured by the parsing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRegionContent {
    /// Bounding box of the entire table
    pub bbox: Rect,
    /// Cells in any order
    #[serde(default)]
    pub cells: Vec<TableCellContent>,
    /// Optional table caption
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Region-level confidence, when the engine reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl TableRegionContent {
    /// Create an empty region.
    pub fn new(bbox: Rect) -> Self {
        Self {
            bbox,
            cells: Vec::new(),
            caption: None,
            confidence: None,
        }
    }

    /// Add a cell.
    pub fn with_cell(mut self, cell: TableCellContent) -> Self {
        self.cells.push(cell);
        self
    }

    /// Set the caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Set the region confidence.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}
