//! Table detection from positioned text runs.
//!
//! A page's runs are grouped into rows by vertical position, runs on a row
//! are merged into cells wherever the horizontal gap is small, and stretches
//! of consecutive multi-cell rows become tables. Column positions are
//! recovered by clustering cell left edges so ragged rows still line up.
//!
//! Detected tables are appended to the page text in a data-frame style dump
//! (see [`Table::to_frame_string`]).

use crate::config::TableSettings;
use crate::error::PdfSumError;
use crate::pipeline::pdf::{RawPage, TextRun};
use tracing::debug;

/// A rectangular grid of cell strings. Missing cells are empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, padding short rows with empty cells.
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Render as a data-frame dump.
    ///
    /// ```text
    ///        0      1
    /// 0   Item  Price
    /// 1  Apple   1.20
    /// ```
    ///
    /// The header holds integer column labels, each row starts with its
    /// 0-based index (left-aligned), values are right-aligned and columns
    /// are separated by two spaces.
    pub fn to_frame_string(&self) -> String {
        let n_cols = self.n_cols();
        let index_width = self
            .rows
            .len()
            .saturating_sub(1)
            .to_string()
            .len();

        let col_widths: Vec<usize> = (0..n_cols)
            .map(|c| {
                self.rows
                    .iter()
                    .map(|row| row[c].chars().count())
                    .chain(std::iter::once(c.to_string().len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        out.push_str(&" ".repeat(index_width));
        for (c, width) in col_widths.iter().enumerate() {
            out.push_str(&format!("  {:>width$}", c, width = width));
        }
        for (r, row) in self.rows.iter().enumerate() {
            out.push('\n');
            out.push_str(&format!("{:<width$}", r, width = index_width));
            for (cell, width) in row.iter().zip(&col_widths) {
                out.push_str("  ");
                let pad = width.saturating_sub(cell.chars().count());
                out.push_str(&" ".repeat(pad));
                out.push_str(cell);
            }
        }
        out
    }
}

/// Finds tables on a page.
pub trait TableExtractor: Send + Sync {
    fn extract(&self, page: &RawPage) -> Result<Vec<Table>, PdfSumError>;
}

/// Disables table extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTables;

impl TableExtractor for NoTables {
    fn extract(&self, _page: &RawPage) -> Result<Vec<Table>, PdfSumError> {
        Ok(Vec::new())
    }
}

/// Geometry-based table finder over [`TextRun`]s.
#[derive(Debug, Clone, Default)]
pub struct LayoutTableExtractor {
    settings: TableSettings,
}

impl LayoutTableExtractor {
    pub fn new(settings: TableSettings) -> Self {
        Self { settings }
    }
}

impl TableExtractor for LayoutTableExtractor {
    fn extract(&self, page: &RawPage) -> Result<Vec<Table>, PdfSumError> {
        if let Some(bad) = page.runs.iter().find(|r| !run_is_finite(r)) {
            return Err(PdfSumError::TableExtractionFailed {
                page: page.page_num,
                detail: format!("text run {:?} has a non-finite bounding box", bad.text),
            });
        }

        let rows = group_rows(&page.runs, self.settings.row_tolerance);
        let rows: Vec<Vec<Cell>> = rows
            .into_iter()
            .map(|row| merge_cells(row, self.settings.column_gap))
            .collect();

        let mut tables = Vec::new();
        for block in candidate_blocks(&rows, self.settings.min_columns) {
            if block.len() >= self.settings.min_rows {
                tables.push(place_on_grid(block, self.settings.column_tolerance));
            }
        }

        debug!("Page {}: {} tables found", page.page_num, tables.len());
        Ok(tables)
    }
}

// ── Geometry helpers ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    left: f32,
    right: f32,
}

fn run_is_finite(run: &TextRun) -> bool {
    run.left.is_finite() && run.right.is_finite() && run.top.is_finite() && run.bottom.is_finite()
}

/// Rows top-to-bottom; runs inside a row left-to-right.
fn group_rows(runs: &[TextRun], tolerance: f32) -> Vec<Vec<&TextRun>> {
    let mut sorted: Vec<&TextRun> = runs.iter().collect();
    sorted.sort_by(|a, b| {
        b.center_y()
            .total_cmp(&a.center_y())
            .then(a.left.total_cmp(&b.left))
    });

    let mut rows: Vec<Vec<&TextRun>> = Vec::new();
    let mut anchor = f32::NAN;
    for run in sorted {
        match rows.last_mut() {
            Some(row) if (anchor - run.center_y()).abs() <= tolerance => row.push(run),
            _ => {
                anchor = run.center_y();
                rows.push(vec![run]);
            }
        }
    }
    for row in &mut rows {
        row.sort_by(|a, b| a.left.total_cmp(&b.left));
    }
    rows
}

/// Merge runs whose horizontal gap is below `gap` into one cell.
fn merge_cells(row: Vec<&TextRun>, gap: f32) -> Vec<Cell> {
    let mut cells: Vec<Cell> = Vec::new();
    for run in row {
        let text = run.text.trim();
        match cells.last_mut() {
            Some(cell) if run.left - cell.right < gap => {
                if run.left - cell.right > 1.0 {
                    cell.text.push(' ');
                }
                cell.text.push_str(text);
                cell.right = cell.right.max(run.right);
            }
            _ => cells.push(Cell {
                text: text.to_string(),
                left: run.left,
                right: run.right,
            }),
        }
    }
    cells
}

/// Maximal stretches of consecutive rows with at least `min_columns` cells.
fn candidate_blocks(rows: &[Vec<Cell>], min_columns: usize) -> Vec<&[Vec<Cell>]> {
    let mut blocks = Vec::new();
    let mut start = None;
    for (i, row) in rows.iter().enumerate() {
        match (row.len() >= min_columns, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                blocks.push(&rows[s..i]);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        blocks.push(&rows[s..]);
    }
    blocks
}

/// Cluster left edges into column anchors and drop each cell into the
/// nearest column. Cells landing in an occupied slot are appended to it.
fn place_on_grid(block: &[Vec<Cell>], tolerance: f32) -> Table {
    let mut lefts: Vec<f32> = block.iter().flatten().map(|c| c.left).collect();
    lefts.sort_by(f32::total_cmp);

    let mut anchors: Vec<f32> = Vec::new();
    let mut cluster_last = f32::NAN;
    for left in lefts {
        if anchors.is_empty() || left - cluster_last > tolerance {
            anchors.push(left);
        }
        cluster_last = left;
    }

    let rows = block
        .iter()
        .map(|row| {
            let mut out = vec![String::new(); anchors.len()];
            for cell in row {
                let col = nearest(&anchors, cell.left);
                if !out[col].is_empty() {
                    out[col].push(' ');
                }
                out[col].push_str(&cell.text);
            }
            out
        })
        .collect();
    Table::new(rows)
}

fn nearest(anchors: &[f32], x: f32) -> usize {
    anchors
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - x).abs().total_cmp(&(*b - x).abs()))
        .map_or(0, |(i, _)| i)
}
