//! In-memory tabular store for tests and local runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{CellRange, TabularStore};

/// Growable string grids keyed by sheet name.
///
/// Mirrors the read semantics of real spreadsheet APIs: reads trim
/// trailing empty rows and trailing empty cells per row. Unlike a real
/// backend it is lenient about missing sheets: reads of an unknown
/// sheet return nothing and writes create the sheet implicitly, so
/// tests do not need a provisioning step.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sheets: Mutex<HashMap<String, Vec<Vec<String>>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn grids(&self) -> MutexGuard<'_, HashMap<String, Vec<Vec<String>>>> {
        self.sheets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Full untrimmed grid of a sheet, for equality assertions.
    #[must_use]
    pub fn snapshot(&self, sheet: &str) -> Vec<Vec<String>> {
        self.grids().get(sheet).cloned().unwrap_or_default()
    }

    /// Single cell value; empty string when out of bounds.
    #[must_use]
    pub fn cell(&self, sheet: &str, col: u32, row: u32) -> String {
        self.grids()
            .get(sheet)
            .and_then(|grid| grid.get(row as usize - 1))
            .and_then(|cells| cells.get(col as usize - 1))
            .cloned()
            .unwrap_or_default()
    }

    /// Names of existing sheets, for provisioning assertions.
    #[must_use]
    pub fn sheet_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.grids().keys().cloned().collect();
        names.sort();
        names
    }
}

fn ensure_size(grid: &mut Vec<Vec<String>>, rows: usize, cols: usize) {
    if grid.len() < rows {
        grid.resize_with(rows, Vec::new);
    }
    for row in grid.iter_mut().take(rows) {
        if row.len() < cols {
            row.resize(cols, String::new());
        }
    }
}

impl TabularStore for MemoryStore {
    fn read_range(&self, range: &CellRange) -> anyhow::Result<Vec<Vec<String>>> {
        let grids = self.grids();
        let Some(grid) = grids.get(&range.sheet) else {
            return Ok(Vec::new());
        };

        let mut out: Vec<Vec<String>> = Vec::with_capacity(range.height());
        for row_idx in range.start_row..=range.end_row {
            let mut cells: Vec<String> = Vec::with_capacity(range.width());
            if let Some(row) = grid.get(row_idx as usize - 1) {
                for col_idx in range.start_col..=range.end_col {
                    cells.push(
                        row.get(col_idx as usize - 1)
                            .cloned()
                            .unwrap_or_default(),
                    );
                }
            }
            while cells.last().is_some_and(|c| c.is_empty()) {
                cells.pop();
            }
            out.push(cells);
        }
        while out.last().is_some_and(Vec::is_empty) {
            out.pop();
        }
        Ok(out)
    }

    fn write_range(&self, range: &CellRange, values: &[Vec<String>]) -> anyhow::Result<()> {
        if values.len() > range.height() {
            anyhow::bail!(
                "write of {} rows exceeds range {range} ({} rows)",
                values.len(),
                range.height()
            );
        }
        if let Some(widest) = values.iter().map(Vec::len).max()
            && widest > range.width()
        {
            anyhow::bail!(
                "write of {widest} columns exceeds range {range} ({} columns)",
                range.width()
            );
        }

        let mut grids = self.grids();
        let grid = grids.entry(range.sheet.clone()).or_default();
        let needed_rows = range.start_row as usize - 1 + values.len();
        let needed_cols = range.end_col as usize;
        ensure_size(grid, needed_rows, needed_cols);

        for (i, row_values) in values.iter().enumerate() {
            let row = &mut grid[range.start_row as usize - 1 + i];
            for (j, value) in row_values.iter().enumerate() {
                row[range.start_col as usize - 1 + j] = value.clone();
            }
        }
        Ok(())
    }

    fn append_row(&self, sheet: &str, row: &[String]) -> anyhow::Result<()> {
        let mut grids = self.grids();
        let grid = grids.entry(sheet.to_owned()).or_default();
        let last_used = grid
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_empty()))
            .map_or(0, |i| i + 1);
        ensure_size(grid, last_used + 1, row.len());
        for (j, value) in row.iter().enumerate() {
            grid[last_used][j] = value.clone();
        }
        Ok(())
    }

    fn ensure_sheet(&self, sheet: &str) -> anyhow::Result<bool> {
        let mut grids = self.grids();
        if grids.contains_key(sheet) {
            return Ok(false);
        }
        grids.insert(sheet.to_owned(), Vec::new());
        Ok(true)
    }
}
