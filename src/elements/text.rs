//! Text block element.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

lazy_static! {
    static ref CAPTION_RE: Regex =
        Regex::new(r"(?i)^\s*table\s+([0-9]+(\.[0-9]+)*|[ivxlc]+|[a-z])\b").unwrap();
}

/// A positioned run of text reported by the parsing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// The text string
    pub text: String,
    /// Bounding box of the text
    pub bbox: Rect,
    /// Font name, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    /// Font size in points, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    /// Bold weight
    #[serde(default)]
    pub bold: bool,
}

impl TextContent {
    /// Create a text block without font information.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablesift::elements::TextContent;
    /// use tablesift::geometry::Rect;
    ///
    /// let text = TextContent::new("Revenue", Rect::from_points(50.0, 20.0, 120.0, 32.0));
    /// assert_eq!(text.text, "Revenue");
    /// assert!(!text.bold);
    /// ```
    pub fn new(text: impl Into<String>, bbox: Rect) -> Self {
        Self {
            text: text.into(),
            bbox,
            font: None,
            font_size: None,
            bold: false,
        }
    }

    /// Set the font name and size.
    pub fn with_font(mut self, name: impl Into<String>, size: f32) -> Self {
        self.font = Some(name.into());
        self.font_size = Some(size);
        self
    }

    /// Set the bold flag.
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// Whether the text reads like a table caption ("Table 3: ...").
    pub fn is_caption(&self) -> bool {
        CAPTION_RE.is_match(&self.text)
    }

    /// Whether the block carries no visible text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Formatting signature used to tell header rows from body rows.
    pub fn style_key(&self) -> (Option<&str>, Option<i32>, bool) {
        (
            self.font.as_deref(),
            self.font_size.map(|s| (s * 10.0).round() as i32),
            self.bold,
        )
    }
}
