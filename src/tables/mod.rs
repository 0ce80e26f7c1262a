//! Table extraction.
//!
//! This module provides a pluggable, multi-strategy table extraction engine:
//!
//! - [`model`]: tables, cells, and span resolution
//! - [`registry`]: explicit mapping from [`DetectionMethod`] to extractor
//! - [`rule_based`], [`ai_driven`], [`hybrid`]: the built-in strategies
//! - [`validation`]: structural checks applied to every returned table
//! - [`service`]: confidence-driven fallback across strategies
//!
//! # Example
//!
//! ```
//! use tablesift::config::ExtractionConfig;
//! use tablesift::document::DocumentId;
//! use tablesift::elements::ParsedContent;
//! use tablesift::tables::{ExtractorRegistry, TableExtractionService};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = ExtractionConfig::default();
//! let service = TableExtractionService::new(
//!     ExtractorRegistry::with_defaults(&config, None),
//!     config,
//! );
//!
//! let result = service
//!     .extract_tables(&DocumentId::from("doc-1"), &ParsedContent::default(), None, None)
//!     .await
//!     .unwrap();
//! assert!(result.is_empty());
//! # }
//! ```

pub mod ai_driven;
pub mod extractor;
pub mod hybrid;
pub mod method;
pub mod model;
pub mod registry;
pub mod rule_based;
pub mod service;
pub mod validation;

pub use ai_driven::{
    AiDrivenExtractor, EmbeddedLayoutModel, LayoutModel, ModelTable, UnavailableLayoutModel,
};
pub use extractor::{Detection, DetectionRequest, TableExtractor};
pub use hybrid::HybridExtractor;
pub use method::DetectionMethod;
pub use model::{Cell, CellDataType, CellSlot, GridPos, Table, TableData, TableRegion};
pub use registry::ExtractorRegistry;
pub use rule_based::RuleBasedExtractor;
pub use service::{
    candidate_methods, AttemptOutcome, ExtractionRequest, ExtractionResult, MethodAttempt,
    TableExtractionService,
};
pub use validation::{RejectedTable, TableValidator, ValidationError, ValidationOutcome};
