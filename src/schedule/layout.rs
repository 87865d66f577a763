//! Physical geometry of the schedule sheet.
//!
//! One sheet holds everything: month blocks of four data columns
//! (weekday, date, flag, names) plus one spacer column, laid out left
//! to right; the reminder-subscription table in a fixed row region
//! below the day grid; and one cell holding the dashboard message
//! reference.

use crate::config::SheetConfig;
use crate::error::{Result, RosterError};
use crate::store::{CellRange, parse_a1_cell};

/// Data columns per block, without the names column.
pub const BLOCK_DATA_COLS: u32 = 3;
/// Column stride between blocks: data + names + spacer.
pub const BLOCK_STRIDE: u32 = 5;
/// Columns of the reminder table: UserID, UserTag, Enabled, Time,
/// LastNotified, Timezone.
pub const REMINDER_COLS: u32 = 6;

/// Validated sheet geometry, derived from [`SheetConfig`] plus the
/// configured window length.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    pub schedule_tab: String,
    pub optout_log_tab: String,
    pub header_row: u32,
    pub first_day_row: u32,
    pub block_capacity: u32,
    pub blocks: usize,
    pub reminder_header_row: u32,
    pub reminder_max_rows: u32,
    dashboard_ref: (u32, u32),
}

impl SheetLayout {
    /// Builds and validates the layout.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Config`] when rows overlap, a month of 31
    /// days cannot fit a block, or the dashboard cell does not parse.
    pub fn from_config(sheet: &SheetConfig, blocks: usize) -> Result<Self> {
        if sheet.schedule_tab.trim().is_empty() || sheet.optout_log_tab.trim().is_empty() {
            return Err(RosterError::Config("sheet tab names must not be empty".to_owned()));
        }
        if blocks == 0 {
            return Err(RosterError::Config("window must span at least one month".to_owned()));
        }
        if sheet.header_row == 0 || sheet.first_day_row <= sheet.header_row {
            return Err(RosterError::Config(format!(
                "first_day_row {} must sit below header_row {}",
                sheet.first_day_row, sheet.header_row
            )));
        }
        if sheet.block_capacity < 31 {
            return Err(RosterError::Config(format!(
                "block_capacity {} cannot hold a 31-day month",
                sheet.block_capacity
            )));
        }
        let last_day_row = sheet.first_day_row + sheet.block_capacity - 1;
        if sheet.reminder_header_row <= last_day_row {
            return Err(RosterError::Config(format!(
                "reminder_header_row {} overlaps the day grid (ends at row {last_day_row})",
                sheet.reminder_header_row
            )));
        }
        if sheet.reminder_max_rows == 0 {
            return Err(RosterError::Config("reminder_max_rows must be at least 1".to_owned()));
        }
        let dashboard_ref = parse_a1_cell(&sheet.dashboard_ref_cell).ok_or_else(|| {
            RosterError::Config(format!(
                "dashboard_ref_cell '{}' is not an A1 cell reference",
                sheet.dashboard_ref_cell
            ))
        })?;

        Ok(Self {
            schedule_tab: sheet.schedule_tab.clone(),
            optout_log_tab: sheet.optout_log_tab.clone(),
            header_row: sheet.header_row,
            first_day_row: sheet.first_day_row,
            block_capacity: sheet.block_capacity,
            blocks,
            reminder_header_row: sheet.reminder_header_row,
            reminder_max_rows: sheet.reminder_max_rows,
            dashboard_ref,
        })
    }

    /// First column of a block (weekday column), 1-based.
    #[must_use]
    pub fn block_start_col(&self, block: usize) -> u32 {
        1 + block as u32 * BLOCK_STRIDE
    }

    /// Flag column of a block.
    #[must_use]
    pub fn flag_col(&self, block: usize) -> u32 {
        self.block_start_col(block) + BLOCK_DATA_COLS - 1
    }

    /// Names column, directly right of the flag column.
    #[must_use]
    pub fn names_col(&self, block: usize) -> u32 {
        self.flag_col(block) + 1
    }

    /// Last row of the day grid.
    #[must_use]
    pub fn last_day_row(&self) -> u32 {
        self.first_day_row + self.block_capacity - 1
    }

    /// The single header cell of a block ("Month YYYY").
    #[must_use]
    pub fn header_cell(&self, block: usize) -> CellRange {
        CellRange::cell(&self.schedule_tab, self.block_start_col(block), self.header_row)
    }

    /// Full day region of a block, all four columns over the whole
    /// capacity. Used for reads.
    #[must_use]
    pub fn block_range(&self, block: usize) -> CellRange {
        CellRange::new(
            &self.schedule_tab,
            self.block_start_col(block),
            self.first_day_row,
            self.names_col(block),
            self.last_day_row(),
        )
    }

    /// The first `rows` day rows of a block. Used for batch writes.
    #[must_use]
    pub fn day_rows_range(&self, block: usize, rows: u32) -> CellRange {
        CellRange::new(
            &self.schedule_tab,
            self.block_start_col(block),
            self.first_day_row,
            self.names_col(block),
            self.first_day_row + rows.saturating_sub(1),
        )
    }

    /// Rows of a block past `used` up to capacity, or `None` when the
    /// block is full.
    #[must_use]
    pub fn leftover_range(&self, block: usize, used: u32) -> Option<CellRange> {
        if used >= self.block_capacity {
            return None;
        }
        Some(CellRange::new(
            &self.schedule_tab,
            self.block_start_col(block),
            self.first_day_row + used,
            self.names_col(block),
            self.last_day_row(),
        ))
    }

    /// Flag cell of a specific absolute row within a block.
    #[must_use]
    pub fn flag_cell(&self, block: usize, row: u32) -> CellRange {
        CellRange::cell(&self.schedule_tab, self.flag_col(block), row)
    }

    /// Names cell of a specific absolute row within a block.
    #[must_use]
    pub fn names_cell(&self, block: usize, row: u32) -> CellRange {
        CellRange::cell(&self.schedule_tab, self.names_col(block), row)
    }

    /// Header row of the reminder table.
    #[must_use]
    pub fn reminder_header_range(&self) -> CellRange {
        CellRange::new(
            &self.schedule_tab,
            1,
            self.reminder_header_row,
            REMINDER_COLS,
            self.reminder_header_row,
        )
    }

    /// Scannable data region of the reminder table.
    #[must_use]
    pub fn reminder_data_range(&self) -> CellRange {
        CellRange::new(
            &self.schedule_tab,
            1,
            self.reminder_header_row + 1,
            REMINDER_COLS,
            self.reminder_header_row + self.reminder_max_rows,
        )
    }

    /// Absolute sheet row of the reminder data row at `index`.
    #[must_use]
    pub fn reminder_row(&self, index: usize) -> u32 {
        self.reminder_header_row + 1 + index as u32
    }

    /// Last row a reminder may occupy.
    #[must_use]
    pub fn reminder_last_row(&self) -> u32 {
        self.reminder_header_row + self.reminder_max_rows
    }

    /// The cell persisting the dashboard message reference.
    #[must_use]
    pub fn dashboard_ref_cell(&self) -> CellRange {
        CellRange::cell(&self.schedule_tab, self.dashboard_ref.0, self.dashboard_ref.1)
    }
}
