//! Documents tracked by the ingestion pipeline.
//!
//! A [`Document`] is referenced by id from every table extracted from it. Its
//! status moves `Pending → Processing → {Completed, Failed}`; the last two are
//! terminal.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Raster image (png, jpg, tiff)
    Image,
    /// Word document
    Docx,
    /// HTML page
    Html,
    /// Anything else
    Unknown,
}

impl FileType {
    /// Classify a file by extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => FileType::Pdf,
            "png" | "jpg" | "jpeg" | "tif" | "tiff" => FileType::Image,
            "docx" => FileType::Docx,
            "html" | "htm" => FileType::Html,
            _ => FileType::Unknown,
        }
    }
}

/// Processing status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Registered, not yet picked up
    Pending,
    /// Parsing or extraction in progress
    Processing,
    /// Finished successfully (terminal)
    Completed,
    /// Finished with an error (terminal)
    Failed,
}

impl DocumentStatus {
    /// Whether no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }

    fn can_transition_to(&self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Pending, DocumentStatus::Processing)
                | (DocumentStatus::Processing, DocumentStatus::Completed)
                | (DocumentStatus::Processing, DocumentStatus::Failed)
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A source document and its processing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier
    pub id: DocumentId,
    /// Original file name
    pub filename: String,
    /// Location of the file
    pub path: PathBuf,
    /// File kind
    pub file_type: FileType,
    status: DocumentStatus,
    /// When the document was registered
    pub created_at: DateTime<Utc>,
    /// When processing started
    pub processing_started_at: Option<DateTime<Utc>>,
    /// When processing reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
    /// Failure description when status is `Failed`
    pub error_message: Option<String>,
}

impl Document {
    /// Register a document at `path` with a generated id.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_id(DocumentId::generate(), path)
    }

    /// Register a document with a caller-chosen id.
    pub fn with_id(id: DocumentId, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            id,
            file_type: FileType::from_path(&path),
            filename,
            path,
            status: DocumentStatus::Pending,
            created_at: Utc::now(),
            processing_started_at: None,
            finished_at: None,
            error_message: None,
        }
    }

    /// Current status.
    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    /// `Pending → Processing`.
    pub fn start_processing(&mut self) -> Result<()> {
        self.transition(DocumentStatus::Processing)?;
        self.processing_started_at = Some(Utc::now());
        Ok(())
    }

    /// `Processing → Completed`.
    pub fn complete(&mut self) -> Result<()> {
        self.transition(DocumentStatus::Completed)?;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// `Processing → Failed`, recording the reason.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(DocumentStatus::Failed)?;
        self.finished_at = Some(Utc::now());
        self.error_message = Some(reason.into());
        Ok(())
    }

    fn transition(&mut self, next: DocumentStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        log::debug!("Document {}: {} -> {}", self.id, self.status, next);
        self.status = next;
        Ok(())
    }
}
