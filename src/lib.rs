// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::enum_variant_names)]

//! # tablesift
//!
//! Multi-strategy table extraction for document ingestion pipelines.
//!
//! ## Core Features
//!
//! - **Pluggable Strategies**: AI-driven (external layout model), rule-based
//!   (whitespace grid over text block positions), and hybrid, registered
//!   explicitly per [`tables::DetectionMethod`]
//! - **Confidence-Driven Fallback**: the preferred method first, rule-based
//!   last, short-circuiting on the first result that reaches the threshold
//! - **Structural Validation**: every table is checked for a full rectangular
//!   grid whose spans cover each position exactly once; invalid tables are
//!   dropped individually with the rule they broke
//! - **Merged Cells**: row and column spans resolved to effective cells
//! - **Cancellation and Deadlines**: in-flight model calls are abandoned when
//!   a document-level timeout passes
//!
//! ## Architecture
//!
//! - [`elements`]: parsed layout content supplied by the parsing engine
//! - [`tables`]: table model, strategies, registry, validation, service
//! - [`pipeline`]: document status tracking around parse + extract
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tablesift::config::ExtractionConfig;
//! use tablesift::document::DocumentId;
//! use tablesift::elements::ParsedContent;
//! use tablesift::tables::{DetectionMethod, EmbeddedLayoutModel, ExtractorRegistry, TableExtractionService};
//!
//! # #[tokio::main]
//! # async fn main() -> tablesift::Result<()> {
//! let content = ParsedContent::from_json_file("report.layout.json")?;
//!
//! let config = ExtractionConfig::default();
//! let registry = ExtractorRegistry::with_defaults(&config, Some(Arc::new(EmbeddedLayoutModel)));
//! let service = TableExtractionService::new(registry, config);
//!
//! let result = service
//!     .extract_tables(&DocumentId::from("report"), &content, Some(DetectionMethod::AiDriven), None)
//!     .await?;
//!
//! for table in result.tables() {
//!     println!("{}\n", table.to_markdown());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Cooperative cancellation
pub mod cancel;

// Configuration
pub mod config;

// Documents and status tracking
pub mod document;

// Parsed layout input
pub mod elements;
pub mod geometry;

// Layout analysis
pub mod layout;

// Table extraction
pub mod tables;

// Ingestion pipeline
pub mod pipeline;

// Re-exports
pub use config::{ConfidenceAggregation, ExtractionConfig};
pub use document::{Document, DocumentId, DocumentStatus};
pub use error::{Error, Result};
pub use tables::{DetectionMethod, ExtractionResult, Table, TableExtractionService};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
