//! Configuration for the document ingestion pipeline.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};

/// Document processing pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Deadline for parsing plus extraction of one document, in milliseconds.
    pub document_timeout_ms: u64,

    /// Documents processed at the same time by `process_batch`.
    pub max_concurrent_documents: usize,

    /// Table extraction settings.
    pub extraction: ExtractionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            document_timeout_ms: 300_000,
            max_concurrent_documents: 4,
            extraction: ExtractionConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Set the per-document deadline.
    pub fn with_document_timeout(mut self, timeout: Duration) -> Self {
        self.document_timeout_ms = (timeout.as_millis() as u64).max(1);
        self
    }

    /// Set the batch concurrency.
    pub fn with_max_concurrent_documents(mut self, max: usize) -> Self {
        self.max_concurrent_documents = max.max(1);
        self
    }

    /// Set the extraction settings.
    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }

    /// Per-document deadline as a duration.
    pub fn document_timeout(&self) -> Duration {
        Duration::from_millis(self.document_timeout_ms)
    }

    /// Check value ranges, including the extraction settings.
    pub fn validate(&self) -> Result<()> {
        if self.document_timeout_ms == 0 {
            return Err(Error::Config("document_timeout_ms must be positive".to_string()));
        }
        if self.max_concurrent_documents == 0 {
            return Err(Error::Config(
                "max_concurrent_documents must be at least 1".to_string(),
            ));
        }
        self.extraction.validate()
    }

    /// Load and validate configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}
