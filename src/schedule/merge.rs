//! Override-preserving refresh of the schedule window.
//!
//! As the window rolls forward a date's physical block can change
//! (September's days migrate from block 0 to nowhere, October's from
//! block 1 to block 0, and so on). Overrides are therefore collected
//! by date across all blocks before the grid is rewritten, so a
//! surviving date keeps its flag and names no matter where it moves.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use super::layout::SheetLayout;
use super::window::{build_window, month_span, month_tag};
use super::{DayFlag, ScheduleDay, WeekdaySet, split_names};
use crate::dates;
use crate::error::{Result, RosterError};
use crate::store::TabularStore;

/// Stored flags and names keyed by date, independent of block.
#[derive(Debug, Default)]
pub struct StoredOverrides {
    pub flags: HashMap<NaiveDate, DayFlag>,
    pub names: HashMap<NaiveDate, Vec<String>>,
}

/// Reads every block and collects explicit flags (valid symbols only)
/// and non-empty name lists by date.
pub fn collect_overrides(
    store: &dyn TabularStore,
    layout: &SheetLayout,
) -> Result<StoredOverrides> {
    let mut collected = StoredOverrides::default();
    for block in 0..layout.blocks {
        let rows = store
            .read_range(&layout.block_range(block))
            .map_err(RosterError::backend)?;
        for row in rows {
            let Some(date) = row.get(1).and_then(|cell| dates::parse_canonical(cell)) else {
                continue;
            };
            if let Some(flag) = row.get(2).and_then(|cell| DayFlag::from_symbol(cell)) {
                collected.flags.insert(date, flag);
            }
            if let Some(cell) = row.get(3) {
                let names = split_names(cell);
                if !names.is_empty() {
                    collected.names.insert(date, names);
                }
            }
        }
    }
    Ok(collected)
}

/// Recomputes the window from `anchor` and rewrites all blocks,
/// keeping stored flags and names for every date that survives.
///
/// Idempotent: a second run with the same anchor and no intervening
/// writes produces identical cell content.
pub fn refresh_preserving_overrides(
    store: &dyn TabularStore,
    layout: &SheetLayout,
    raid_weekdays: &WeekdaySet,
    anchor: NaiveDate,
) -> Result<usize> {
    let stored = collect_overrides(store, layout)?;
    let mut desired = build_window(anchor, layout.blocks, true, raid_weekdays);
    for day in &mut desired {
        if let Some(flag) = stored.flags.get(&day.date) {
            day.flag = *flag;
        }
        if let Some(names) = stored.names.get(&day.date) {
            day.opted_out = names.clone();
        }
    }
    let total = desired.len();
    write_blocks(store, layout, anchor, desired)?;
    info!(
        "refreshed schedule from {}: {total} days across {} blocks",
        dates::canonical(anchor),
        layout.blocks
    );
    Ok(total)
}

/// Rewrites all blocks with computed defaults, discarding every
/// stored flag and name.
pub fn rebuild_defaults(
    store: &dyn TabularStore,
    layout: &SheetLayout,
    raid_weekdays: &WeekdaySet,
    anchor: NaiveDate,
    start_from_day_one: bool,
) -> Result<usize> {
    let desired = build_window(anchor, layout.blocks, !start_from_day_one, raid_weekdays);
    let total = desired.len();
    write_blocks(store, layout, anchor, desired)?;
    info!("rebuilt schedule with defaults: {total} days");
    Ok(total)
}

/// Partitions days into blocks by (year, month) and writes each block
/// sequentially: header, day rows in one batch, then cleared leftover
/// rows up to capacity. The first failing write aborts the rest.
fn write_blocks(
    store: &dyn TabularStore,
    layout: &SheetLayout,
    anchor: NaiveDate,
    days: Vec<ScheduleDay>,
) -> Result<()> {
    let tags = month_span(anchor, layout.blocks);
    let mut per_block: Vec<Vec<ScheduleDay>> = (0..layout.blocks).map(|_| Vec::new()).collect();
    for day in days {
        let ym = (day.date.year(), day.date.month());
        // A month outside the span lands in the last block.
        let idx = tags.iter().position(|tag| *tag == ym).unwrap_or(layout.blocks - 1);
        per_block[idx].push(day);
    }

    for (block, block_days) in per_block.iter().enumerate() {
        let (year, month) = tags[block];
        store
            .write_range(&layout.header_cell(block), &[vec![month_tag(year, month)]])
            .map_err(RosterError::backend)?;

        if !block_days.is_empty() {
            let rows: Vec<Vec<String>> = block_days.iter().map(ScheduleDay::row_cells).collect();
            store
                .write_range(&layout.day_rows_range(block, rows.len() as u32), &rows)
                .map_err(RosterError::backend)?;
        }

        if let Some(range) = layout.leftover_range(block, block_days.len() as u32) {
            let empties = vec![vec![String::new(); range.width()]; range.height()];
            store.write_range(&range, &empties).map_err(RosterError::backend)?;
        }
        debug!("wrote block {block} ({year}-{month:02}): {} day rows", block_days.len());
    }
    Ok(())
}
