//! Parsed layout content handed over by the document parsing collaborator.
//!
//! The parsing engine segments a document into pages of positioned
//! [`LayoutElement`]s. Table extraction never reads raw document bytes; it
//! works from this representation only.
//!
//! ## Example
//!
//! ```
//! use tablesift::elements::ParsedContent;
//!
//! let json = r#"{
//!     "pages": [{
//!         "index": 0,
//!         "width": 612,
//!         "height": 792,
//!         "elements": [
//!             {"type": "text", "text": "Name", "bbox": [50, 50, 100, 62]},
//!             {"type": "image", "bbox": [300, 400, 500, 600]}
//!         ]
//!     }]
//! }"#;
//!
//! let content = ParsedContent::from_json_str(json).unwrap();
//! assert_eq!(content.pages.len(), 1);
//! assert_eq!(content.text_block_count(), 1);
//! ```

mod table;
mod text;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use table::{TableCellContent, TableRegionContent};
pub use text::TextContent;

use crate::error::Result;
use crate::geometry::Rect;

/// An image region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRegion {
    /// Bounds
    pub bbox: Rect,
    /// Caption, when detected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// A formula region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaRegion {
    /// Bounds
    pub bbox: Rect,
    /// LaTeX source, when recognized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latex: Option<String>,
}

/// A code block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Bounds
    pub bbox: Rect,
    /// Source text
    #[serde(default)]
    pub text: String,
}

/// A positioned element on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutElement {
    /// Text block
    Text(TextContent),
    /// Image region
    Image(ImageRegion),
    /// Formula region
    Formula(FormulaRegion),
    /// Code block
    Code(CodeBlock),
    /// Table region structured by the parsing engine
    Table(TableRegionContent),
}

impl LayoutElement {
    /// Get the bounding box of this element.
    pub fn bbox(&self) -> Rect {
        match self {
            LayoutElement::Text(t) => t.bbox,
            LayoutElement::Image(i) => i.bbox,
            LayoutElement::Formula(f) => f.bbox,
            LayoutElement::Code(c) => c.bbox,
            LayoutElement::Table(t) => t.bbox,
        }
    }

    /// Get the text block, if this is one.
    pub fn as_text(&self) -> Option<&TextContent> {
        match self {
            LayoutElement::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Get the table region, if this is one.
    pub fn as_table(&self) -> Option<&TableRegionContent> {
        match self {
            LayoutElement::Table(t) => Some(t),
            _ => None,
        }
    }
}

/// One page of parsed layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedPage {
    /// Page index (0-based)
    pub index: usize,
    /// Page width in points
    #[serde(default)]
    pub width: f32,
    /// Page height in points
    #[serde(default)]
    pub height: f32,
    /// Elements in the order the engine reported them
    #[serde(default)]
    pub elements: Vec<LayoutElement>,
}

impl ParsedPage {
    /// Create an empty page.
    pub fn new(index: usize, width: f32, height: f32) -> Self {
        Self {
            index,
            width,
            height,
            elements: Vec::new(),
        }
    }

    /// Add an element.
    pub fn with_element(mut self, element: LayoutElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Add a text block.
    pub fn with_text(self, text: TextContent) -> Self {
        self.with_element(LayoutElement::Text(text))
    }

    /// Text blocks on this page, skipping blank ones.
    pub fn text_blocks(&self) -> impl Iterator<Item = &TextContent> {
        self.elements
            .iter()
            .filter_map(LayoutElement::as_text)
            .filter(|t| !t.is_blank())
    }

    /// Structured table regions on this page.
    pub fn table_regions(&self) -> impl Iterator<Item = &TableRegionContent> {
        self.elements.iter().filter_map(LayoutElement::as_table)
    }
}

/// Page-segmented layout content of one document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedContent {
    /// Pages in document order
    #[serde(default)]
    pub pages: Vec<ParsedPage>,
}

impl ParsedContent {
    /// Create content from pages.
    pub fn new(pages: Vec<ParsedPage>) -> Self {
        Self { pages }
    }

    /// Parse content from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load content from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Whether no page holds any element.
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.elements.is_empty())
    }

    /// Number of non-blank text blocks across all pages.
    pub fn text_block_count(&self) -> usize {
        self.pages.iter().map(|p| p.text_blocks().count()).sum()
    }
}
