//! Table detection using alignment analysis.
//!
//! Blocks whose vertical extents overlap form a row, blocks whose horizontal
//! extents overlap form a column. A table region is a maximal run of
//! consecutive rows that each hold at least two blocks, so single-block rows
//! such as titles and paragraph lines separate tables.

use std::collections::HashSet;
use std::ops::Range;

use crate::cancel::CancellationFlag;
use crate::elements::TextContent;
use crate::error::Result;
use crate::geometry::{bounding_box, Rect};

/// Gaps (points) below which blocks are clustered together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTolerance {
    /// Vertical gap for sharing a row
    pub row: f32,
    /// Horizontal gap for sharing a column
    pub col: f32,
}

/// A grid detected on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedGrid {
    /// Bounding box of every block in the grid
    pub bbox: Rect,
    /// Bounds of each row, top to bottom
    pub rows: Vec<Rect>,
    /// Bounds of each column, left to right
    pub columns: Vec<Rect>,
    /// Block indices per grid position, row-major, each list in reading order.
    /// An empty list is an empty position.
    pub cells: Vec<Vec<Vec<usize>>>,
    /// First row is formatted differently from the rest
    pub has_header: bool,
}

impl DetectedGrid {
    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// Grid regularity in (0, 1].
    ///
    /// Mean of the row-height and column-width scores, each `1 / (1 + cv)`
    /// where `cv` is the coefficient of variation. Uniform rows and columns
    /// score 1.
    pub fn regularity(&self) -> f32 {
        let rows = regularity_score(self.rows.iter().map(|r| r.height));
        let cols = regularity_score(self.columns.iter().map(|c| c.width));
        (rows + cols) / 2.0
    }
}

#[derive(Debug)]
struct RowCluster {
    bounds: Rect,
    members: Vec<usize>,
}

/// Detect table grids in the text blocks of one page.
///
/// The cancellation flag is checked after row clustering, after each
/// region's column clustering, and after each region's cell assignment.
///
/// # Examples
///
/// ```
/// use tablesift::cancel::CancellationFlag;
/// use tablesift::elements::TextContent;
/// use tablesift::geometry::Rect;
/// use tablesift::layout::table_detector::{detect_tables, GridTolerance};
///
/// let blocks = vec![
///     TextContent::new("Name", Rect::from_points(50.0, 50.0, 100.0, 62.0)),
///     TextContent::new("Age", Rect::from_points(200.0, 50.0, 230.0, 62.0)),
///     TextContent::new("Alice", Rect::from_points(50.0, 70.0, 100.0, 82.0)),
///     TextContent::new("30", Rect::from_points(200.0, 70.0, 215.0, 82.0)),
/// ];
/// let refs: Vec<&TextContent> = blocks.iter().collect();
/// let tolerance = GridTolerance { row: 3.0, col: 5.0 };
///
/// let grids = detect_tables(&refs, tolerance, &CancellationFlag::new()).unwrap();
/// assert_eq!(grids.len(), 1);
/// assert_eq!((grids[0].num_rows(), grids[0].num_cols()), (2, 2));
/// ```
pub fn detect_tables(
    blocks: &[&TextContent],
    tolerance: GridTolerance,
    cancel: &CancellationFlag,
) -> Result<Vec<DetectedGrid>> {
    if blocks.len() < 4 {
        // Need at least 4 blocks for a minimal 2×2 table
        return Ok(vec![]);
    }

    let rows = cluster_rows(blocks, tolerance.row);
    cancel.check()?;

    let mut grids = vec![];
    for run in table_row_runs(&rows) {
        let region = &rows[run];

        let columns = cluster_columns(blocks, region, tolerance.col);
        cancel.check()?;
        if columns.len() < 2 {
            continue;
        }

        grids.push(assign_cells(blocks, region, columns));
        cancel.check()?;
    }

    log::debug!("Detected {} grid(s) among {} blocks", grids.len(), blocks.len());
    Ok(grids)
}

/// Group blocks into rows, top to bottom. Members are sorted left to right.
fn cluster_rows(blocks: &[&TextContent], tolerance: f32) -> Vec<RowCluster> {
    let mut order: Vec<usize> = (0..blocks.len()).collect();
    order.sort_by(|&a, &b| {
        let (a, b) = (&blocks[a].bbox, &blocks[b].bbox);
        a.top()
            .total_cmp(&b.top())
            .then(a.left().total_cmp(&b.left()))
    });

    let mut rows: Vec<RowCluster> = vec![];
    for idx in order {
        let bbox = blocks[idx].bbox;
        match rows.last_mut() {
            Some(row) if row.bounds.overlaps_vertically(&bbox, tolerance) => {
                row.bounds = row.bounds.union(&bbox);
                row.members.push(idx);
            }
            _ => rows.push(RowCluster {
                bounds: bbox,
                members: vec![idx],
            }),
        }
    }

    for row in &mut rows {
        row.members
            .sort_by(|&a, &b| blocks[a].bbox.left().total_cmp(&blocks[b].bbox.left()));
    }

    rows
}

/// Maximal runs of at least two consecutive rows with at least two blocks.
fn table_row_runs(rows: &[RowCluster]) -> Vec<Range<usize>> {
    let mut runs = vec![];
    let mut start = None;

    for (i, row) in rows.iter().enumerate() {
        match (row.members.len() >= 2, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if i - s >= 2 {
                    runs.push(s..i);
                }
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        if rows.len() - s >= 2 {
            runs.push(s..rows.len());
        }
    }

    runs
}

/// Merge the horizontal extents of every block in a region into columns.
fn cluster_columns(blocks: &[&TextContent], rows: &[RowCluster], tolerance: f32) -> Vec<Rect> {
    let mut order: Vec<usize> = rows.iter().flat_map(|r| r.members.iter().copied()).collect();
    order.sort_by(|&a, &b| blocks[a].bbox.left().total_cmp(&blocks[b].bbox.left()));

    let mut columns: Vec<Rect> = vec![];
    for idx in order {
        let bbox = blocks[idx].bbox;
        match columns.last_mut() {
            Some(col) if col.overlaps_horizontally(&bbox, tolerance) => *col = col.union(&bbox),
            _ => columns.push(bbox),
        }
    }

    columns
}

fn assign_cells(
    blocks: &[&TextContent],
    rows: &[RowCluster],
    columns: Vec<Rect>,
) -> DetectedGrid {
    let mut cells = vec![vec![Vec::new(); columns.len()]; rows.len()];

    for (r, row) in rows.iter().enumerate() {
        for &idx in &row.members {
            let left = blocks[idx].bbox.left();
            // Columns start at a member's left edge, so the last one starting
            // at or before this block is the one it was merged into.
            let c = columns
                .iter()
                .rposition(|col| col.left() <= left)
                .unwrap_or(0);
            cells[r][c].push(idx);
        }
    }

    for list in cells.iter_mut().flatten() {
        list.sort_by(|&a, &b| {
            let (a, b) = (&blocks[a].bbox, &blocks[b].bbox);
            a.top()
                .total_cmp(&b.top())
                .then(a.left().total_cmp(&b.left()))
        });
    }

    let has_header = infer_header(blocks, rows);
    let bbox = bounding_box(rows.iter().map(|r| &r.bounds)).unwrap_or(rows[0].bounds);

    DetectedGrid {
        bbox,
        rows: rows.iter().map(|r| r.bounds).collect(),
        columns,
        cells,
        has_header,
    }
}

/// The first row is a header when it carries formatting information and
/// shares no formatting with any body row.
fn infer_header(blocks: &[&TextContent], rows: &[RowCluster]) -> bool {
    let Some((first, body)) = rows.split_first() else {
        return false;
    };
    if body.is_empty() {
        return false;
    }

    let styled = first.members.iter().any(|&i| {
        let b = blocks[i];
        b.font.is_some() || b.font_size.is_some() || b.bold
    });
    if !styled {
        return false;
    }

    let header: HashSet<_> = first.members.iter().map(|&i| blocks[i].style_key()).collect();
    body.iter()
        .flat_map(|r| r.members.iter())
        .all(|&i| !header.contains(&blocks[i].style_key()))
}

fn regularity_score(extents: impl Iterator<Item = f32>) -> f32 {
    let values: Vec<f32> = extents.collect();
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    if mean <= f32::EPSILON {
        return 1.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    let cv = variance.sqrt() / mean;
    1.0 / (1.0 + cv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const TOL: GridTolerance = GridTolerance { row: 3.0, col: 5.0 };

    fn block(text: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> TextContent {
        TextContent::new(text, Rect::from_points(x0, y0, x1, y1))
    }

    /// Rows at y = 50, 70, 90 and columns at x = 50, 200, 300.
    fn grid_blocks(rows: usize) -> Vec<TextContent> {
        let mut blocks = vec![];
        for r in 0..rows {
            let y = 50.0 + 20.0 * r as f32;
            blocks.push(block(&format!("name{}", r), 50.0, y, 150.0, y + 12.0));
            blocks.push(block(&format!("{}", r), 200.0, y, 250.0, y + 12.0));
            blocks.push(block(&format!("city{}", r), 300.0, y, 380.0, y + 12.0));
        }
        blocks
    }

    fn detect(blocks: &[TextContent]) -> Vec<DetectedGrid> {
        let refs: Vec<&TextContent> = blocks.iter().collect();
        detect_tables(&refs, TOL, &CancellationFlag::new()).unwrap()
    }

    #[test]
    fn test_regular_grid() {
        let grids = detect(&grid_blocks(3));
        assert_eq!(grids.len(), 1);
        let grid = &grids[0];
        assert_eq!((grid.num_rows(), grid.num_cols()), (3, 3));
        assert!(grid.cells.iter().flatten().all(|c| c.len() == 1));
        assert_eq!(grid.bbox, Rect::from_points(50.0, 50.0, 380.0, 102.0));
    }

    #[test]
    fn test_too_few_blocks() {
        let blocks = vec![
            block("a", 50.0, 50.0, 60.0, 62.0),
            block("b", 100.0, 50.0, 110.0, 62.0),
            block("c", 50.0, 70.0, 60.0, 82.0),
        ];
        assert!(detect(&blocks).is_empty());
    }

    #[test]
    fn test_single_column_is_not_a_table() {
        let blocks: Vec<TextContent> = (0..5)
            .map(|i| {
                let y = 50.0 + 20.0 * i as f32;
                block("line", 50.0, y, 300.0, y + 12.0)
            })
            .collect();
        assert!(detect(&blocks).is_empty());
    }

    #[test]
    fn test_title_row_excluded() {
        let mut blocks = grid_blocks(2);
        blocks.push(block("Quarterly figures", 50.0, 20.0, 380.0, 32.0));
        let grids = detect(&blocks);
        assert_eq!(grids.len(), 1);
        assert_eq!(grids[0].num_rows(), 2);
        assert_eq!(grids[0].bbox.top(), 50.0);
    }

    #[test]
    fn test_paragraph_splits_tables() {
        let mut blocks = grid_blocks(2);
        blocks.push(block("Some prose between tables.", 50.0, 110.0, 380.0, 122.0));
        for r in 0..2 {
            let y = 140.0 + 20.0 * r as f32;
            blocks.push(block("x", 50.0, y, 90.0, y + 12.0));
            blocks.push(block("y", 200.0, y, 240.0, y + 12.0));
        }
        let grids = detect(&blocks);
        assert_eq!(grids.len(), 2);
        assert_eq!(grids[1].num_cols(), 2);
    }

    #[test]
    fn test_missing_block_leaves_empty_position() {
        let mut blocks = grid_blocks(3);
        // Drop the middle column of the second row.
        blocks.remove(4);
        let grids = detect(&blocks);
        assert_eq!(grids.len(), 1);
        assert!(grids[0].cells[1][1].is_empty());
        assert_eq!(grids[0].cells[1][2].len(), 1);
    }

    #[test]
    fn test_stacked_blocks_share_a_cell() {
        let mut blocks = grid_blocks(2);
        // Second line of a wrapped cell, overlapping row 0 vertically.
        blocks.push(block("(cont.)", 50.0, 58.0, 120.0, 66.0));
        let grids = detect(&blocks);
        assert_eq!(grids[0].cells[0][0].len(), 2);
    }

    #[test]
    fn test_regular_rows_score_higher() {
        let regular = detect(&grid_blocks(3)).remove(0);

        let mut blocks = grid_blocks(2);
        blocks.push(block("tall", 50.0, 90.0, 150.0, 140.0));
        blocks.push(block("9", 200.0, 90.0, 250.0, 102.0));
        let irregular = detect(&blocks).remove(0);

        assert!(regular.regularity() > irregular.regularity());
        assert!(regular.regularity() <= 1.0);
        assert!(irregular.regularity() > 0.0);
    }

    #[test]
    fn test_header_inferred_from_formatting() {
        let mut blocks = grid_blocks(3);
        for (i, b) in blocks.iter_mut().enumerate() {
            b.font = Some("Helvetica".to_string());
            b.font_size = Some(10.0);
            b.bold = i < 3;
        }
        assert!(detect(&blocks)[0].has_header);
    }

    #[test]
    fn test_no_header_without_formatting() {
        assert!(!detect(&grid_blocks(3))[0].has_header);
    }

    #[test]
    fn test_cancelled_detection() {
        let blocks = grid_blocks(3);
        let refs: Vec<&TextContent> = blocks.iter().collect();
        let cancel = CancellationFlag::new();
        cancel.cancel();
        assert!(matches!(detect_tables(&refs, TOL, &cancel), Err(Error::Cancelled)));
    }

    #[test]
    fn test_regularity_score() {
        assert_eq!(regularity_score([10.0, 10.0, 10.0].into_iter()), 1.0);
        assert_eq!(regularity_score(std::iter::empty()), 0.0);
        // mean 15, std 5, cv 1/3
        assert!((regularity_score([10.0, 20.0].into_iter()) - 0.75).abs() < 1e-6);
    }
}
