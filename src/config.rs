//! Configuration for table extraction and document processing.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tables::model::Cell;

/// How cell confidences combine into a table confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceAggregation {
    /// Arithmetic mean over content cells
    #[default]
    Mean,
    /// Mean weighted by the number of grid positions each cell spans
    SpanWeighted,
}

impl ConfidenceAggregation {
    /// Aggregate the confidences of a set of cells. Empty input scores 0.
    pub fn aggregate<'a>(&self, cells: impl IntoIterator<Item = &'a Cell>) -> f32 {
        let (sum, weight) = cells.into_iter().fold((0.0f32, 0.0f32), |(sum, weight), c| {
            let w = match self {
                ConfidenceAggregation::Mean => 1.0,
                ConfidenceAggregation::SpanWeighted => c.span_area().max(1) as f32,
            };
            (sum + c.confidence * w, weight + w)
        });
        if weight == 0.0 {
            0.0
        } else {
            sum / weight
        }
    }
}

/// Table extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Confidence at which a method's result is accepted without trying the
    /// next method.
    pub min_confidence_threshold: f32,

    /// Tables with fewer rows are discarded as false positives.
    pub min_rows: usize,

    /// Tables with fewer columns are discarded as false positives.
    pub min_cols: usize,

    /// Vertical gap (points) below which two blocks share a row.
    pub row_tolerance: f32,

    /// Horizontal gap (points) below which two blocks share a column.
    pub col_tolerance: f32,

    /// Cell confidence aggregation formula.
    pub confidence_aggregation: ConfidenceAggregation,

    /// Maximum distance (points) between a table and its caption.
    pub caption_distance: f32,

    /// Upper bound on a single external layout model call, in milliseconds.
    pub model_timeout_ms: u64,

    /// Minimum fraction of effective cells that must carry text.
    pub min_filled_ratio: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            min_confidence_threshold: 0.7,
            min_rows: 2,
            min_cols: 2,
            row_tolerance: 3.0,
            col_tolerance: 5.0,
            confidence_aggregation: ConfidenceAggregation::Mean,
            caption_distance: 50.0,
            model_timeout_ms: 120_000,
            min_filled_ratio: 0.5,
        }
    }

    /// Set the confidence threshold.
    pub fn with_min_confidence(mut self, threshold: f32) -> Self {
        self.min_confidence_threshold = threshold;
        self
    }

    /// Set the minimum table size.
    pub fn with_min_size(mut self, rows: usize, cols: usize) -> Self {
        self.min_rows = rows;
        self.min_cols = cols;
        self
    }

    /// Set the row and column clustering tolerances.
    pub fn with_tolerances(mut self, row_tolerance: f32, col_tolerance: f32) -> Self {
        self.row_tolerance = row_tolerance;
        self.col_tolerance = col_tolerance;
        self
    }

    /// Set the confidence aggregation formula.
    pub fn with_aggregation(mut self, aggregation: ConfidenceAggregation) -> Self {
        self.confidence_aggregation = aggregation;
        self
    }

    /// Set the external model timeout.
    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout_ms = (timeout.as_millis() as u64).max(1);
        self
    }

    /// Set the minimum filled ratio.
    pub fn with_min_filled_ratio(mut self, ratio: f32) -> Self {
        self.min_filled_ratio = ratio;
        self
    }

    /// External model timeout as a duration.
    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        check_unit("min_confidence_threshold", self.min_confidence_threshold)?;
        check_unit("min_filled_ratio", self.min_filled_ratio)?;
        if self.min_rows == 0 || self.min_cols == 0 {
            return Err(Error::Config(format!(
                "minimum table size must be at least 1x1, got {}x{}",
                self.min_rows, self.min_cols
            )));
        }
        if !(self.row_tolerance >= 0.0 && self.col_tolerance >= 0.0) {
            return Err(Error::Config(format!(
                "tolerances must be non-negative, got row={} col={}",
                self.row_tolerance, self.col_tolerance
            )));
        }
        if !(self.caption_distance >= 0.0) {
            return Err(Error::Config(format!(
                "caption_distance must be non-negative, got {}",
                self.caption_distance
            )));
        }
        if self.model_timeout_ms == 0 {
            return Err(Error::Config("model_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Parse and validate configuration from JSON. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!("{} must be within [0, 1], got {}", name, value)))
    }
}
