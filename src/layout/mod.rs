//! Layout analysis over parsed text blocks.
//!
//! This module provides the geometric algorithms behind rule-based table
//! detection:
//! - Row clustering by vertical overlap
//! - Column clustering by horizontal overlap
//! - Grid regularity scoring and header inference

pub mod table_detector;

// Re-export main types
pub use table_detector::{detect_tables, DetectedGrid, GridTolerance};
