//! Tabular storage seam.
//!
//! The schedule lives in a spreadsheet-like backend addressed by sheet
//! name and rectangular cell ranges. Backends are blocking; callers on
//! the async runtime go through `spawn_blocking`. The crate ships an
//! in-memory backend ([`memory::MemoryStore`]) for tests and local
//! runs; real spreadsheet backends implement [`TabularStore`] out of
//! tree.

pub mod memory;

use std::fmt;

/// Blocking backend over rectangular cell ranges.
///
/// All values are strings, as in the backing spreadsheet. Implementors
/// return transport errors as-is; the service layer wraps them.
pub trait TabularStore: Send + Sync {
    /// Reads a rectangle. Trailing empty rows are omitted, and each
    /// returned row omits its trailing empty cells, so the result is
    /// ragged: rows may be shorter than the requested width.
    fn read_range(&self, range: &CellRange) -> anyhow::Result<Vec<Vec<String>>>;

    /// Writes `values` into the rectangle, anchored at the top-left
    /// corner. `values` must fit within the range bounds.
    fn write_range(&self, range: &CellRange, values: &[Vec<String>]) -> anyhow::Result<()>;

    /// Appends a row after the last non-empty row of the sheet.
    fn append_row(&self, sheet: &str, row: &[String]) -> anyhow::Result<()>;

    /// Creates the sheet if it does not exist. Returns `true` when a
    /// new sheet was created.
    fn ensure_sheet(&self, sheet: &str) -> anyhow::Result<bool>;
}

/// A rectangular range of cells on one sheet. Columns and rows are
/// 1-based, both ends inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub sheet: String,
    pub start_col: u32,
    pub start_row: u32,
    pub end_col: u32,
    pub end_row: u32,
}

impl CellRange {
    #[must_use]
    pub fn new(sheet: &str, start_col: u32, start_row: u32, end_col: u32, end_row: u32) -> Self {
        Self {
            sheet: sheet.to_owned(),
            start_col,
            start_row,
            end_col,
            end_row,
        }
    }

    /// A single-cell range.
    #[must_use]
    pub fn cell(sheet: &str, col: u32, row: u32) -> Self {
        Self::new(sheet, col, row, col, row)
    }

    /// Number of columns covered.
    #[must_use]
    pub fn width(&self) -> usize {
        self.end_col.saturating_sub(self.start_col) as usize + 1
    }

    /// Number of rows covered.
    #[must_use]
    pub fn height(&self) -> usize {
        self.end_row.saturating_sub(self.start_row) as usize + 1
    }
}

impl fmt::Display for CellRange {
    /// A1 notation with a quoted sheet name, e.g. `'Schedule'!A6:C36`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}'!{}{}:{}{}",
            self.sheet,
            col_letters(self.start_col),
            self.start_row,
            col_letters(self.end_col),
            self.end_row
        )
    }
}

/// 1-based column index to spreadsheet letters: 1 → A, 26 → Z, 27 → AA.
#[must_use]
pub fn col_letters(index: u32) -> String {
    let mut n = index;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Spreadsheet letters back to a 1-based column index.
#[must_use]
pub fn col_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut n: u32 = 0;
    for c in letters.chars() {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        n = n.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)?;
    }
    Some(n)
}

/// Parses a bare A1 cell reference like `AF1` into (column, row).
#[must_use]
pub fn parse_a1_cell(cell: &str) -> Option<(u32, u32)> {
    let trimmed = cell.trim();
    let split = trimmed.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = trimmed.split_at(split);
    let col = col_index(letters)?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((col, row))
}
