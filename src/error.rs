//! Error types for table extraction.
//!
//! This module defines all error types that can occur while parsing documents,
//! running detection strategies, and validating extracted tables.

use std::time::Duration;

use crate::document::DocumentStatus;
use crate::tables::method::DetectionMethod;
use crate::tables::validation::ValidationError;

/// Result type alias for table extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during document processing and table extraction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The external layout model cannot be invoked (missing runtime, failed
    /// load, hardware not present, call timed out).
    ///
    /// Recoverable: the extraction service moves on to the next method.
    #[error("Layout model unavailable: {0}")]
    ModelUnavailable(String),

    /// No extractor is registered for the requested method.
    ///
    /// Recoverable inside a fallback chain.
    #[error("Unknown detection method: {0}")]
    UnknownMethod(DetectionMethod),

    /// A strategy failed for a reason that switching strategy will not fix.
    #[error("Extraction failed ({method}): {reason}")]
    Extraction {
        /// Method whose detect call failed
        method: DetectionMethod,
        /// Reason for failure
        reason: String,
    },

    /// A single table violates a structural invariant.
    #[error("Table validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The caller abandoned the request.
    #[error("Extraction cancelled")]
    Cancelled,

    /// A document-level deadline elapsed.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Illegal document status change.
    #[error("Invalid document status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status
        from: DocumentStatus,
        /// Requested status
        to: DocumentStatus,
    },

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// The document parsing collaborator could not produce layout content.
    #[error("Failed to parse document '{document}': {reason}")]
    Parse {
        /// Document identifier
        document: String,
        /// Reason for parse failure
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an extraction error for a method.
    pub fn extraction(method: DetectionMethod, reason: impl Into<String>) -> Self {
        Self::Extraction {
            method,
            reason: reason.into(),
        }
    }

    /// Create a model-unavailable error.
    pub fn model_unavailable(reason: impl Into<String>) -> Self {
        Self::ModelUnavailable(reason.into())
    }

    /// Create a parse error for a document.
    pub fn parse(document: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            document: document.into(),
            reason: reason.into(),
        }
    }

    /// Whether the fallback chain may continue past this error.
    ///
    /// Only a missing capability (model or method) is recoverable. Every
    /// other failure aborts the extraction call.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::ModelUnavailable(_) | Error::UnknownMethod(_))
    }
}
