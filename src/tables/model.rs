//! Table value types.
//!
//! A [`Table`] owns a rectangular grid of [`Cell`]s stored row-major. Every
//! grid position holds exactly one cell value: either a content cell, an
//! explicit empty placeholder, or a marker pointing back at the merged cell
//! whose span covers the position. Tables are immutable once an extractor
//! hands them to the service.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ConfidenceAggregation;
use crate::document::DocumentId;
use crate::geometry::Rect;
use crate::tables::method::DetectionMethod;

lazy_static! {
    static ref NUMERIC_RE: Regex =
        Regex::new(r"^[-+(]?[$€£¥]?\s?(\d{1,3}(,\d{3})+|\d+)(\.\d+)?\)?\s?%?$").unwrap();
    static ref DATE_HINT_RE: Regex = Regex::new(r"^\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}$").unwrap();
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d"];

/// Row/column address of a grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
}

impl GridPos {
    /// Create a grid position.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Inferred data type of a cell's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellDataType {
    /// Integer, decimal, currency, or percentage
    Numeric,
    /// Calendar date
    Date,
    /// Anything else with visible content
    #[default]
    Text,
    /// Whitespace only
    Empty,
}

impl CellDataType {
    /// Infer the data type of a piece of cell text.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablesift::tables::CellDataType;
    ///
    /// assert_eq!(CellDataType::infer("1,204.50"), CellDataType::Numeric);
    /// assert_eq!(CellDataType::infer("2024-03-01"), CellDataType::Date);
    /// assert_eq!(CellDataType::infer("London"), CellDataType::Text);
    /// assert_eq!(CellDataType::infer("  "), CellDataType::Empty);
    /// ```
    pub fn infer(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return CellDataType::Empty;
        }
        if DATE_HINT_RE.is_match(text)
            && DATE_FORMATS
                .iter()
                .any(|fmt| NaiveDate::parse_from_str(text, fmt).is_ok())
        {
            return CellDataType::Date;
        }
        if NUMERIC_RE.is_match(text) {
            return CellDataType::Numeric;
        }
        CellDataType::Text
    }
}

/// What a grid position holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CellSlot {
    /// A cell detected by an extractor. May span several positions.
    #[default]
    Content,
    /// No detected content maps to this position.
    Placeholder,
    /// Position claimed by the span of the cell at `origin`.
    Covered {
        /// Position of the spanning cell
        origin: GridPos,
    },
}

/// A single grid position of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Text content (possibly empty)
    pub text: String,
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
    /// Number of rows this cell spans
    pub rowspan: usize,
    /// Number of columns this cell spans
    pub colspan: usize,
    /// Bounding box of the cell, when the source reported one
    pub bbox: Option<Rect>,
    /// Inferred data type
    pub data_type: CellDataType,
    /// Whether this is a header cell
    pub is_header: bool,
    /// Source confidence (0.0 - 1.0)
    pub confidence: f32,
    /// Content, placeholder, or span coverage
    pub slot: CellSlot,
}

impl Cell {
    /// Create a 1×1 content cell with full confidence.
    pub fn new(row: usize, col: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            data_type: CellDataType::infer(&text),
            text,
            row,
            col,
            rowspan: 1,
            colspan: 1,
            bbox: None,
            is_header: false,
            confidence: 1.0,
            slot: CellSlot::Content,
        }
    }

    /// Create an explicit empty placeholder.
    pub fn placeholder(row: usize, col: usize) -> Self {
        Self {
            text: String::new(),
            row,
            col,
            rowspan: 1,
            colspan: 1,
            bbox: None,
            data_type: CellDataType::Empty,
            is_header: false,
            confidence: 0.0,
            slot: CellSlot::Placeholder,
        }
    }

    /// Create a marker for a position covered by the merged cell at `origin`.
    pub fn covered(row: usize, col: usize, origin: GridPos) -> Self {
        Self {
            slot: CellSlot::Covered { origin },
            ..Self::placeholder(row, col)
        }
    }

    /// Set the row and column span.
    pub fn with_span(mut self, rowspan: usize, colspan: usize) -> Self {
        self.rowspan = rowspan;
        self.colspan = colspan;
        self
    }

    /// Set the source confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set the bounding box.
    pub fn with_bbox(mut self, bbox: Rect) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Mark as header cell.
    pub fn header(mut self, is_header: bool) -> Self {
        self.is_header = is_header;
        self
    }

    /// Grid position of this cell.
    pub fn pos(&self) -> GridPos {
        GridPos::new(self.row, self.col)
    }

    /// Whether this cell owns its position (content or placeholder).
    pub fn is_origin(&self) -> bool {
        !matches!(self.slot, CellSlot::Covered { .. })
    }

    /// Whether this cell carries detected content.
    pub fn is_content(&self) -> bool {
        self.slot == CellSlot::Content
    }

    /// Number of grid positions this cell claims.
    pub fn span_area(&self) -> usize {
        self.rowspan * self.colspan
    }
}

/// Page and bounds of a detected table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableRegion {
    /// Page index (0-based)
    pub page: usize,
    /// Table bounds on the page
    pub bbox: Rect,
}

/// The grid payload of a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    /// Row-major cells; insertion order is visual order.
    pub grid: Vec<Vec<Cell>>,
}

/// A table detected in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Identifier, unique within the document
    pub id: String,
    /// Owning document
    pub document_id: DocumentId,
    /// Where the table sits
    pub region: TableRegion,
    /// Declared number of rows
    pub num_rows: usize,
    /// Declared number of columns
    pub num_cols: usize,
    /// Grid of cells
    pub data: TableData,
    /// Table caption or title if available
    pub caption: Option<String>,
    /// Method that produced this table
    pub detection_method: DetectionMethod,
    /// Confidence reported directly by the strategy, overriding cell aggregation
    pub reported_confidence: Option<f32>,
}

impl Table {
    /// Build an identifier for the `index`-th table on `page`.
    pub fn make_id(document_id: &DocumentId, page: usize, index: usize) -> String {
        format!("{}-p{}-t{}", document_id, page, index)
    }

    /// Create a table from an explicit grid and declared dimensions.
    ///
    /// The grid is stored as given, so structural problems are left for
    /// validation to report.
    pub fn from_grid(
        id: impl Into<String>,
        document_id: DocumentId,
        region: TableRegion,
        detection_method: DetectionMethod,
        num_rows: usize,
        num_cols: usize,
        grid: Vec<Vec<Cell>>,
    ) -> Self {
        Self {
            id: id.into(),
            document_id,
            region,
            num_rows,
            num_cols,
            data: TableData { grid },
            caption: None,
            detection_method,
            reported_confidence: None,
        }
    }

    /// Create a table from a sparse list of content cells.
    ///
    /// Dimensions are the smallest rectangle holding every cell span. Positions
    /// claimed by a span become covered markers, unclaimed positions become
    /// placeholders. When two cells share an origin the more confident one is
    /// kept before any span is laid out. Overlapping spans are laid out as-is
    /// so validation can reject them.
    ///
    /// The grid is allocated in full, so callers taking cells from untrusted
    /// input must bound spans first.
    pub fn from_cells(
        id: impl Into<String>,
        document_id: DocumentId,
        region: TableRegion,
        detection_method: DetectionMethod,
        mut cells: Vec<Cell>,
    ) -> Self {
        cells.sort_by_key(|c| (c.row, c.col));

        let mut unique: Vec<Cell> = Vec::with_capacity(cells.len());
        for mut cell in cells {
            cell.slot = CellSlot::Content;
            if let Some(kept) = unique.last_mut().filter(|k| k.pos() == cell.pos()) {
                log::debug!(
                    "Duplicate cell at ({}, {}): keeping confidence {:.2} over {:.2}",
                    cell.row,
                    cell.col,
                    kept.confidence.max(cell.confidence),
                    kept.confidence.min(cell.confidence)
                );
                if cell.confidence > kept.confidence {
                    *kept = cell;
                }
                continue;
            }
            unique.push(cell);
        }

        let num_rows = unique
            .iter()
            .map(|c| c.row + c.rowspan.max(1))
            .max()
            .unwrap_or(0);
        let num_cols = unique
            .iter()
            .map(|c| c.col + c.colspan.max(1))
            .max()
            .unwrap_or(0);

        let mut grid: Vec<Vec<Cell>> = (0..num_rows)
            .map(|r| (0..num_cols).map(|c| Cell::placeholder(r, c)).collect())
            .collect();

        for cell in &unique {
            let origin = cell.pos();
            for r in cell.row..cell.row + cell.rowspan.max(1) {
                for c in cell.col..cell.col + cell.colspan.max(1) {
                    if (r, c) != (cell.row, cell.col) && grid[r][c].slot == CellSlot::Placeholder {
                        grid[r][c] = Cell::covered(r, c, origin);
                    }
                }
            }
        }

        for cell in unique {
            let (r, c) = (cell.row, cell.col);
            grid[r][c] = cell;
        }

        Self::from_grid(
            id,
            document_id,
            region,
            detection_method,
            num_rows,
            num_cols,
            grid,
        )
    }

    /// Set the caption.
    pub fn with_caption(mut self, caption: Option<String>) -> Self {
        self.caption = caption;
        self
    }

    /// Set the confidence reported by the strategy.
    pub fn with_reported_confidence(mut self, confidence: f32) -> Self {
        self.reported_confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    /// Rows of the grid.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.data.grid
    }

    /// Cell stored at a grid position, without span resolution.
    pub fn slot(&self, row: usize, col: usize) -> Option<&Cell> {
        self.data.grid.get(row).and_then(|r| r.get(col))
    }

    /// Cell that owns a grid position, following span coverage.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablesift::document::DocumentId;
    /// use tablesift::geometry::Rect;
    /// use tablesift::tables::{Cell, DetectionMethod, Table, TableRegion};
    ///
    /// let region = TableRegion { page: 0, bbox: Rect::new(0.0, 0.0, 100.0, 40.0) };
    /// let table = Table::from_cells(
    ///     "t0",
    ///     DocumentId::from("doc"),
    ///     region,
    ///     DetectionMethod::AiDriven,
    ///     vec![
    ///         Cell::new(0, 0, "Region").with_span(1, 2),
    ///         Cell::new(1, 0, "North"),
    ///         Cell::new(1, 1, "South"),
    ///     ],
    /// );
    ///
    /// assert_eq!(table.cell_at(0, 1).unwrap().text, "Region");
    /// ```
    pub fn cell_at(&self, row: usize, col: usize) -> Option<&Cell> {
        let cell = self.slot(row, col)?;
        match cell.slot {
            CellSlot::Covered { origin } => self.slot(origin.row, origin.col),
            _ => Some(cell),
        }
    }

    /// Distinct cells after span resolution, in row-major order.
    ///
    /// A merged cell appears once; the positions it covers do not appear.
    pub fn effective_cells(&self) -> Vec<&Cell> {
        self.data
            .grid
            .iter()
            .flatten()
            .filter(|c| c.is_origin())
            .collect()
    }

    /// Fraction of effective cells that carry detected content.
    pub fn filled_ratio(&self) -> f32 {
        let effective = self.effective_cells();
        if effective.is_empty() {
            return 0.0;
        }
        let filled = effective
            .iter()
            .filter(|c| c.is_content() && !c.text.trim().is_empty())
            .count();
        filled as f32 / effective.len() as f32
    }

    /// Table confidence: the strategy's reported value, otherwise the
    /// aggregate over content cells.
    pub fn confidence(&self, aggregation: ConfidenceAggregation) -> f32 {
        if let Some(reported) = self.reported_confidence {
            return reported;
        }
        aggregation.aggregate(self.effective_cells().into_iter().filter(|c| c.is_content()))
    }

    /// Index of the header row, if any cell is flagged as header.
    pub fn header_row(&self) -> Option<usize> {
        self.data
            .grid
            .iter()
            .position(|row| row.iter().any(|c| c.is_header))
    }

    /// Plain 2D text layout. Covered positions are blank.
    pub fn to_text_grid(&self) -> Vec<Vec<String>> {
        self.data
            .grid
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| match c.slot {
                        CellSlot::Content => c.text.clone(),
                        _ => String::new(),
                    })
                    .collect()
            })
            .collect()
    }

    /// Render as a Markdown table.
    ///
    /// The separator goes after the header row, or after the first row when no
    /// cell is flagged as header.
    pub fn to_markdown(&self) -> String {
        let grid = self.to_text_grid();
        if grid.is_empty() {
            return String::new();
        }

        let header_row = self.header_row().unwrap_or(0);
        let mut lines = Vec::with_capacity(grid.len() + 2);

        if let Some(caption) = &self.caption {
            lines.push(format!("**{}**", caption));
            lines.push(String::new());
        }

        for (i, row) in grid.iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|t| t.replace('|', "\\|")).collect();
            lines.push(format!("| {} |", cells.join(" | ")));
            if i == header_row {
                lines.push(format!("|{}|", vec!["---"; row.len()].join("|")));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::validation::TableValidator;

    fn region() -> TableRegion {
        TableRegion {
            page: 0,
            bbox: Rect::new(0.0, 0.0, 300.0, 90.0),
        }
    }

    fn sample_table() -> Table {
        Table::from_cells(
            "t",
            DocumentId::from("doc-1"),
            region(),
            DetectionMethod::AiDriven,
            vec![
                Cell::new(0, 0, "Header 1").header(true),
                Cell::new(0, 1, "Header 2").header(true),
                Cell::new(1, 0, "Data 1").with_confidence(0.5),
                Cell::new(1, 1, "Data 2").with_confidence(0.7),
            ],
        )
    }

    #[test]
    fn test_infer_numeric() {
        assert_eq!(CellDataType::infer("42"), CellDataType::Numeric);
        assert_eq!(CellDataType::infer("-3.5"), CellDataType::Numeric);
        assert_eq!(CellDataType::infer("$1,200"), CellDataType::Numeric);
        assert_eq!(CellDataType::infer("12%"), CellDataType::Numeric);
        assert_eq!(CellDataType::infer("(450)"), CellDataType::Numeric);
    }

    #[test]
    fn test_infer_date() {
        assert_eq!(CellDataType::infer("2023-12-31"), CellDataType::Date);
        assert_eq!(CellDataType::infer("31/12/2023"), CellDataType::Date);
        assert_eq!(CellDataType::infer("2023-13-45"), CellDataType::Text);
    }

    #[test]
    fn test_infer_text_and_empty() {
        assert_eq!(CellDataType::infer("New York"), CellDataType::Text);
        assert_eq!(CellDataType::infer("1,2,3 apples"), CellDataType::Text);
        assert_eq!(CellDataType::infer(""), CellDataType::Empty);
    }

    #[test]
    fn test_from_cells_fills_placeholders() {
        let table = Table::from_cells(
            "t",
            DocumentId::from("doc-1"),
            region(),
            DetectionMethod::AiDriven,
            vec![Cell::new(0, 0, "a"), Cell::new(1, 2, "b")],
        );

        assert_eq!(table.num_rows, 2);
        assert_eq!(table.num_cols, 3);
        assert!(table.rows().iter().all(|r| r.len() == 3));
        assert_eq!(table.slot(0, 1).unwrap().slot, CellSlot::Placeholder);
        assert_eq!(table.slot(1, 2).unwrap().text, "b");
    }

    #[test]
    fn test_merged_cell_resolution() {
        let table = Table::from_cells(
            "t",
            DocumentId::from("doc-1"),
            region(),
            DetectionMethod::AiDriven,
            vec![
                Cell::new(0, 0, "merged").with_span(2, 2),
                Cell::new(0, 2, "c"),
                Cell::new(1, 2, "f"),
                Cell::new(2, 0, "g"),
                Cell::new(2, 1, "h"),
                Cell::new(2, 2, "i"),
            ],
        );

        assert_eq!(table.num_rows, 3);
        assert_eq!(table.num_cols, 3);
        assert_eq!(table.rows().iter().flatten().count(), 9);
        assert_eq!(table.effective_cells().len(), 6);
        assert_eq!(table.cell_at(1, 1).unwrap().text, "merged");
        assert_eq!(
            table.slot(1, 0).unwrap().slot,
            CellSlot::Covered {
                origin: GridPos::new(0, 0)
            }
        );
    }

    #[test]
    fn test_duplicate_origin_keeps_more_confident_cell() {
        let table = Table::from_cells(
            "t",
            DocumentId::from("doc-1"),
            region(),
            DetectionMethod::AiDriven,
            vec![
                Cell::new(0, 0, "low").with_confidence(0.2),
                Cell::new(0, 0, "high").with_confidence(0.9),
            ],
        );
        assert_eq!(table.slot(0, 0).unwrap().text, "high");
    }

    #[test]
    fn test_discarded_duplicate_leaves_no_span_behind() {
        let table = Table::from_cells(
            "t",
            DocumentId::from("doc-1"),
            region(),
            DetectionMethod::AiDriven,
            vec![
                Cell::new(0, 0, "wide").with_span(1, 3).with_confidence(0.3),
                Cell::new(0, 0, "a").with_confidence(0.9),
                Cell::new(0, 1, "b"),
                Cell::new(1, 0, "c"),
                Cell::new(1, 1, "d"),
            ],
        );

        assert_eq!((table.num_rows, table.num_cols), (2, 2));
        assert_eq!(table.cell_at(0, 0).unwrap().text, "a");
        assert_eq!(table.slot(0, 1).unwrap().slot, CellSlot::Content);
        assert_eq!(table.cell_at(0, 1).unwrap().text, "b");
        assert!(TableValidator::default().validate(&table).is_ok());
    }

    #[test]
    fn test_confidence_aggregation() {
        let table = sample_table();
        let mean = table.confidence(ConfidenceAggregation::Mean);
        assert!((mean - 0.8).abs() < 1e-6);

        let reported = table.clone().with_reported_confidence(0.3);
        assert_eq!(reported.confidence(ConfidenceAggregation::Mean), 0.3);
    }

    #[test]
    fn test_to_text_grid() {
        assert_eq!(
            sample_table().to_text_grid(),
            vec![vec!["Header 1", "Header 2"], vec!["Data 1", "Data 2"]]
        );
    }

    #[test]
    fn test_to_markdown() {
        let expected = "| Header 1 | Header 2 |\n|---|---|\n| Data 1 | Data 2 |";
        assert_eq!(sample_table().to_markdown(), expected);
    }

    #[test]
    fn test_to_markdown_with_caption() {
        let table = sample_table().with_caption(Some("Table 1: Sample".to_string()));
        assert!(table.to_markdown().starts_with("**Table 1: Sample**\n\n| Header 1"));
    }

    #[test]
    fn test_filled_ratio() {
        let table = Table::from_cells(
            "t",
            DocumentId::from("doc-1"),
            region(),
            DetectionMethod::RuleBased,
            vec![Cell::new(0, 0, "a"), Cell::new(1, 1, "b")],
        );
        assert!((table.filled_ratio() - 0.5).abs() < 1e-6);
    }
}
