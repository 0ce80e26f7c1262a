//! Structural validation of extracted tables.
//!
//! Validation runs on every table a strategy returns. A failing table is
//! dropped from its candidate result and reported with the rule it broke;
//! the rest of the candidate's tables are kept.

use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::tables::model::{CellSlot, Table};

/// A structural rule a table violates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ValidationError {
    /// Grid row count differs from `num_rows`.
    #[error("grid has {actual} rows, expected {expected}")]
    RowCountMismatch {
        /// Declared rows
        expected: usize,
        /// Rows present
        actual: usize,
    },

    /// A grid row length differs from `num_cols`.
    #[error("row {row} has {actual} cells, expected {expected}")]
    RowLengthMismatch {
        /// Row index
        row: usize,
        /// Declared columns
        expected: usize,
        /// Cells present
        actual: usize,
    },

    /// A cell's coordinates disagree with where it is stored.
    #[error("cell stored at ({row}, {col}) claims position ({cell_row}, {cell_col})")]
    MisplacedCell {
        /// Storage row
        row: usize,
        /// Storage column
        col: usize,
        /// Row the cell reports
        cell_row: usize,
        /// Column the cell reports
        cell_col: usize,
    },

    /// A cell declares a zero span.
    #[error("cell ({row}, {col}) has a zero span")]
    ZeroSpan {
        /// Row index
        row: usize,
        /// Column index
        col: usize,
    },

    /// A span runs past the grid edge.
    #[error("cell ({row}, {col}) spans {rowspan}x{colspan}, past the grid edge")]
    SpanOutOfBounds {
        /// Row index
        row: usize,
        /// Column index
        col: usize,
        /// Rows spanned
        rowspan: usize,
        /// Columns spanned
        colspan: usize,
    },

    /// A position is claimed by more than one cell.
    #[error("position ({row}, {col}) is claimed by {claims} cells")]
    Overlap {
        /// Row index
        row: usize,
        /// Column index
        col: usize,
        /// Number of claiming cells
        claims: usize,
    },

    /// A position is claimed by no cell.
    #[error("position ({row}, {col}) is not covered by any cell")]
    Gap {
        /// Row index
        row: usize,
        /// Column index
        col: usize,
    },

    /// A covered marker points at a cell whose span does not reach it.
    #[error("position ({row}, {col}) is marked covered by a cell that does not span it")]
    CoverMismatch {
        /// Row index
        row: usize,
        /// Column index
        col: usize,
    },

    /// A cell confidence lies outside [0, 1].
    #[error("cell ({row}, {col}) has confidence {confidence} outside [0, 1]")]
    ConfidenceOutOfRange {
        /// Row index
        row: usize,
        /// Column index
        col: usize,
        /// Reported confidence
        confidence: f32,
    },

    /// The table is below the minimum size.
    #[error("table is {rows}x{cols}, minimum is {min_rows}x{min_cols}")]
    TooSmall {
        /// Rows
        rows: usize,
        /// Columns
        cols: usize,
        /// Minimum rows
        min_rows: usize,
        /// Minimum columns
        min_cols: usize,
    },

    /// Too few cells carry text.
    #[error("only {filled:.2} of cells carry text, minimum is {min:.2}")]
    TooSparse {
        /// Filled fraction
        filled: f32,
        /// Required fraction
        min: f32,
    },
}

/// A table dropped by validation, with the rule it broke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedTable {
    /// The offending table
    pub table: Table,
    /// Why it was dropped
    pub reason: ValidationError,
}

/// Partition of a candidate's tables into accepted and rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOutcome {
    /// Tables satisfying every rule, in input order
    pub accepted: Vec<Table>,
    /// Tables that broke a rule, in input order
    pub rejected: Vec<RejectedTable>,
}

/// Checks tables against the grid invariants and size limits.
#[derive(Debug, Clone)]
pub struct TableValidator {
    min_rows: usize,
    min_cols: usize,
    min_filled_ratio: f32,
}

impl Default for TableValidator {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

impl TableValidator {
    /// Create a validator with explicit limits.
    pub fn new(min_rows: usize, min_cols: usize, min_filled_ratio: f32) -> Self {
        Self {
            min_rows,
            min_cols,
            min_filled_ratio,
        }
    }

    /// Create a validator from extraction configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.min_rows, config.min_cols, config.min_filled_ratio)
    }

    /// Validate one table, reporting the first broken rule.
    ///
    /// Shape is checked before coverage, and coverage before size, so a
    /// malformed grid is never reported as merely too small.
    pub fn validate(&self, table: &Table) -> Result<(), ValidationError> {
        check_shape(table)?;
        check_cells(table)?;
        check_coverage(table)?;

        if table.num_rows < self.min_rows || table.num_cols < self.min_cols {
            return Err(ValidationError::TooSmall {
                rows: table.num_rows,
                cols: table.num_cols,
                min_rows: self.min_rows,
                min_cols: self.min_cols,
            });
        }

        let filled = table.filled_ratio();
        if filled < self.min_filled_ratio {
            return Err(ValidationError::TooSparse {
                filled,
                min: self.min_filled_ratio,
            });
        }

        Ok(())
    }

    /// Validate every table, keeping the ones that pass.
    pub fn partition(&self, tables: Vec<Table>) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();
        for table in tables {
            match self.validate(&table) {
                Ok(()) => outcome.accepted.push(table),
                Err(reason) => {
                    log::info!("Rejected table {}: {}", table.id, reason);
                    outcome.rejected.push(RejectedTable { table, reason });
                }
            }
        }
        outcome
    }
}

fn check_shape(table: &Table) -> Result<(), ValidationError> {
    let rows = table.rows();
    if rows.len() != table.num_rows {
        return Err(ValidationError::RowCountMismatch {
            expected: table.num_rows,
            actual: rows.len(),
        });
    }
    for (r, row) in rows.iter().enumerate() {
        if row.len() != table.num_cols {
            return Err(ValidationError::RowLengthMismatch {
                row: r,
                expected: table.num_cols,
                actual: row.len(),
            });
        }
    }
    Ok(())
}

fn check_cells(table: &Table) -> Result<(), ValidationError> {
    for (r, row) in table.rows().iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if (cell.row, cell.col) != (r, c) {
                return Err(ValidationError::MisplacedCell {
                    row: r,
                    col: c,
                    cell_row: cell.row,
                    cell_col: cell.col,
                });
            }
            if !cell.is_origin() {
                continue;
            }
            if cell.rowspan == 0 || cell.colspan == 0 {
                return Err(ValidationError::ZeroSpan { row: r, col: c });
            }
            if r + cell.rowspan > table.num_rows || c + cell.colspan > table.num_cols {
                return Err(ValidationError::SpanOutOfBounds {
                    row: r,
                    col: c,
                    rowspan: cell.rowspan,
                    colspan: cell.colspan,
                });
            }
            if !(0.0..=1.0).contains(&cell.confidence) {
                return Err(ValidationError::ConfidenceOutOfRange {
                    row: r,
                    col: c,
                    confidence: cell.confidence,
                });
            }
        }
    }
    Ok(())
}

/// Every position must be claimed by exactly one origin cell, and covered
/// markers must name that cell.
fn check_coverage(table: &Table) -> Result<(), ValidationError> {
    let mut owner: Vec<Vec<Option<(usize, usize)>>> =
        vec![vec![None; table.num_cols]; table.num_rows];
    let mut claims = vec![vec![0usize; table.num_cols]; table.num_rows];

    for cell in table.rows().iter().flatten().filter(|c| c.is_origin()) {
        for r in cell.row..cell.row + cell.rowspan {
            for c in cell.col..cell.col + cell.colspan {
                claims[r][c] += 1;
                owner[r][c] = Some((cell.row, cell.col));
            }
        }
    }

    for (r, row) in claims.iter().enumerate() {
        for (c, &count) in row.iter().enumerate() {
            match count {
                0 => return Err(ValidationError::Gap { row: r, col: c }),
                1 => {}
                n => {
                    return Err(ValidationError::Overlap {
                        row: r,
                        col: c,
                        claims: n,
                    })
                }
            }
        }
    }

    for cell in table.rows().iter().flatten() {
        if let CellSlot::Covered { origin } = cell.slot {
            if owner[cell.row][cell.col] != Some((origin.row, origin.col)) {
                return Err(ValidationError::CoverMismatch {
                    row: cell.row,
                    col: cell.col,
                });
            }
        }
    }

    Ok(())
}
