//! Document parsing collaborator boundary.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::document::Document;
use crate::elements::ParsedContent;
use crate::error::{Error, Result};

/// Produces parsed layout content for a document.
///
/// The parsing engine itself (PDF text extraction, OCR) lives outside this
/// crate; implementations adapt it to [`ParsedContent`].
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// Parse a document into page-segmented layout.
    ///
    /// # Errors
    ///
    /// [`Error::Parse`] when the document cannot be turned into layout.
    async fn parse(&self, document: &Document) -> Result<ParsedContent>;

    /// Return the name of this parser for debugging.
    fn name(&self) -> &'static str;
}

/// Reads layout precomputed by the parsing engine as JSON.
///
/// A `.json` document is read directly; any other document is expected to
/// have a `<file name>.layout.json` sidecar next to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLayoutParser;

impl JsonLayoutParser {
    /// Location of the layout JSON for a document at `path`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use tablesift::pipeline::JsonLayoutParser;
    ///
    /// assert_eq!(
    ///     JsonLayoutParser::layout_path(Path::new("in/report.pdf")),
    ///     Path::new("in/report.pdf.layout.json")
    /// );
    /// assert_eq!(
    ///     JsonLayoutParser::layout_path(Path::new("in/report.json")),
    ///     Path::new("in/report.json")
    /// );
    /// ```
    pub fn layout_path(path: &Path) -> PathBuf {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            return path.to_path_buf();
        }
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".layout.json");
        path.with_file_name(name)
    }
}

#[async_trait]
impl DocumentParser for JsonLayoutParser {
    async fn parse(&self, document: &Document) -> Result<ParsedContent> {
        let path = Self::layout_path(&document.path);
        let json = tokio::fs::read_to_string(&path).await.map_err(|e| {
            Error::parse(
                document.id.as_str(),
                format!("cannot read layout {}: {}", path.display(), e),
            )
        })?;
        let content = ParsedContent::from_json_str(&json).map_err(|e| {
            Error::parse(
                document.id.as_str(),
                format!("invalid layout {}: {}", path.display(), e),
            )
        })?;
        log::debug!(
            "Parsed {} page(s) for document {} from {}",
            content.pages.len(),
            document.id,
            path.display()
        );
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "json_layout"
    }
}
