//! The table detection capability every strategy implements.

use async_trait::async_trait;

use crate::cancel::CancellationFlag;
use crate::document::DocumentId;
use crate::elements::ParsedContent;
use crate::error::Result;
use crate::tables::method::DetectionMethod;
use crate::tables::model::Table;
use crate::tables::validation::RejectedTable;

/// Input to one detect call.
#[derive(Debug, Clone, Copy)]
pub struct DetectionRequest<'a> {
    /// Document the tables will belong to.
    pub document_id: &'a DocumentId,

    /// Parsed layout of the document.
    pub content: &'a ParsedContent,

    /// Cancellation signal for the surrounding extraction call.
    pub cancel: &'a CancellationFlag,
}

impl<'a> DetectionRequest<'a> {
    /// Create a request.
    pub fn new(
        document_id: &'a DocumentId,
        content: &'a ParsedContent,
        cancel: &'a CancellationFlag,
    ) -> Self {
        Self {
            document_id,
            content,
            cancel,
        }
    }
}

/// Output of one detect call: candidate tables, not yet validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    /// Candidate tables in page order.
    pub tables: Vec<Table>,

    /// Confidence for the whole candidate, when the strategy computes one
    /// directly. Otherwise the service derives it from the accepted tables.
    pub confidence: Option<f32>,

    /// Tables the strategy already validated and dropped.
    pub rejected: Vec<RejectedTable>,
}

impl Detection {
    /// A result with no tables ("no table found").
    pub fn empty() -> Self {
        Self::default()
    }

    /// Candidate tables without a strategy-level confidence.
    pub fn new(tables: Vec<Table>) -> Self {
        Self {
            tables,
            ..Self::default()
        }
    }

    /// Set the strategy-level confidence.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    /// Record tables dropped before the candidate was returned.
    pub fn with_rejected(mut self, rejected: Vec<RejectedTable>) -> Self {
        self.rejected = rejected;
        self
    }
}

/// A table detection strategy.
///
/// Implementations must be shareable across concurrent extraction calls; they
/// hold configuration only, never per-document state.
#[async_trait]
pub trait TableExtractor: Send + Sync {
    /// Detect candidate tables in parsed content.
    ///
    /// # Errors
    ///
    /// - [`Error::ModelUnavailable`](crate::Error::ModelUnavailable) when an
    ///   external model cannot be invoked. The service falls back.
    /// - [`Error::Cancelled`](crate::Error::Cancelled) when the request's
    ///   flag is raised.
    /// - Any other error aborts the extraction call.
    async fn detect(&self, request: &DetectionRequest<'_>) -> Result<Detection>;

    /// Method this extractor implements. Tables it produces carry this value.
    fn method(&self) -> DetectionMethod;

    /// Return the name of this extractor for debugging.
    fn name(&self) -> &'static str;
}
