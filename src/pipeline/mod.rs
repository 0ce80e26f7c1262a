//! Document ingestion pipeline.
//!
//! Drives a [`Document`] through `Pending → Processing → {Completed, Failed}`:
//! the parser produces layout, the extraction service produces tables, and
//! the whole run is bounded by a per-document deadline. When the deadline
//! passes, the in-flight extraction is cancelled and the document fails.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tablesift::config::ExtractionConfig;
//! use tablesift::document::Document;
//! use tablesift::pipeline::{IngestionPipeline, JsonLayoutParser, PipelineConfig};
//! use tablesift::tables::{ExtractorRegistry, TableExtractionService};
//!
//! # async fn run() {
//! let config = ExtractionConfig::default();
//! let service = TableExtractionService::new(
//!     ExtractorRegistry::with_defaults(&config, None),
//!     config,
//! );
//! let pipeline = IngestionPipeline::new(
//!     Arc::new(JsonLayoutParser),
//!     Arc::new(service),
//!     PipelineConfig::default(),
//! );
//!
//! let processed = pipeline.process(Document::new("invoice.pdf")).await;
//! println!("{}: {}", processed.document.filename, processed.document.status());
//! # }
//! ```

pub mod config;
mod parser;

pub use config::PipelineConfig;
pub use parser::{DocumentParser, JsonLayoutParser};

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::cancel::CancellationFlag;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::tables::method::DetectionMethod;
use crate::tables::service::{ExtractionRequest, ExtractionResult, TableExtractionService};

/// A document after a pipeline run, with its extraction outcome.
#[derive(Debug)]
pub struct ProcessedDocument {
    /// The document in its final status
    pub document: Document,
    /// Extracted tables, or why the run failed
    pub outcome: Result<ExtractionResult>,
}

impl ProcessedDocument {
    /// Extraction result, if the run succeeded.
    pub fn result(&self) -> Option<&ExtractionResult> {
        self.outcome.as_ref().ok()
    }
}

/// Parses documents and extracts their tables.
pub struct IngestionPipeline {
    parser: Arc<dyn DocumentParser>,
    service: Arc<TableExtractionService>,
    config: PipelineConfig,
    preferred_method: Option<DetectionMethod>,
}

impl IngestionPipeline {
    /// Create a pipeline.
    pub fn new(
        parser: Arc<dyn DocumentParser>,
        service: Arc<TableExtractionService>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            parser,
            service,
            config,
            preferred_method: None,
        }
    }

    /// Method to try before rule-based for every document.
    pub fn with_preferred_method(mut self, method: Option<DetectionMethod>) -> Self {
        self.preferred_method = method;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one document.
    ///
    /// A document that is not `Pending` is returned untouched with an
    /// [`Error::InvalidTransition`] outcome.
    pub async fn process(&self, mut document: Document) -> ProcessedDocument {
        if let Err(e) = document.start_processing() {
            return ProcessedDocument {
                document,
                outcome: Err(e),
            };
        }

        let deadline = self.config.document_timeout();
        let cancel = CancellationFlag::new();
        let outcome = match timeout(deadline, self.parse_and_extract(&document, &cancel)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                cancel.cancel();
                log::error!(
                    "Timed out processing '{}' after {:?}",
                    document.filename,
                    deadline
                );
                Err(Error::Timeout(deadline))
            }
        };

        let transition = match &outcome {
            Ok(result) => {
                log::info!(
                    "Processed '{}': {} table(s) via {}",
                    document.filename,
                    result.tables().len(),
                    result.method().map_or("none", |m| m.as_str())
                );
                document.complete()
            }
            Err(e) => {
                log::error!("Failed to process '{}': {}", document.filename, e);
                document.fail(e.to_string())
            }
        };
        if let Err(e) = transition {
            log::error!("Document {} left in {}: {}", document.id, document.status(), e);
        }

        ProcessedDocument { document, outcome }
    }

    /// Process documents concurrently, at most `max_concurrent_documents` at
    /// a time. Results keep input order; one failure does not stop the rest.
    pub async fn process_batch(&self, documents: Vec<Document>) -> Vec<ProcessedDocument> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_documents.max(1)));

        let runs: Vec<_> = documents
            .into_iter()
            .map(|document| {
                let semaphore = Arc::clone(&semaphore);
                async move {
                    // Never closed, so a permit is always granted.
                    let _permit = semaphore.acquire_owned().await.ok();
                    self.process(document).await
                }
            })
            .collect();

        let processed = join_all(runs).await;
        let failed = processed.iter().filter(|p| p.outcome.is_err()).count();
        log::info!(
            "Batch finished: {} document(s), {} failed",
            processed.len(),
            failed
        );
        processed
    }

    async fn parse_and_extract(
        &self,
        document: &Document,
        cancel: &CancellationFlag,
    ) -> Result<ExtractionResult> {
        let content = self.parser.parse(document).await?;
        let request = ExtractionRequest::new(document.id.clone(), &content)
            .with_method(self.preferred_method)
            .with_cancel(cancel.clone());
        self.service.extract(request).await
    }
}
