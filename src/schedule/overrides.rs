//! Opt-out / opt-in tracking and direct flag edits on a located date.
//!
//! Every operation first locates the date across all visible blocks;
//! a date outside the current window is reported as not found, which
//! is an informational outcome rather than an error.

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use super::layout::SheetLayout;
use super::{DayFlag, WeekdaySet, join_names, split_names};
use crate::dates;
use crate::error::{Result, RosterError};
use crate::store::TabularStore;

/// A date found in the visible grid.
#[derive(Debug, Clone)]
pub struct LocatedDay {
    pub block: usize,
    /// Absolute sheet row.
    pub row: u32,
    /// Stored flag, when the cell holds a valid symbol.
    pub flag: Option<DayFlag>,
    pub names: Vec<String>,
}

/// Scans the blocks in order for a row whose date cell matches.
pub fn locate_day(
    store: &dyn TabularStore,
    layout: &SheetLayout,
    date: NaiveDate,
) -> Result<Option<LocatedDay>> {
    for block in 0..layout.blocks {
        let rows = store
            .read_range(&layout.block_range(block))
            .map_err(RosterError::backend)?;
        for (offset, row) in rows.iter().enumerate() {
            let stored = row.get(1).and_then(|cell| dates::parse_canonical(cell));
            if stored == Some(date) {
                return Ok(Some(LocatedDay {
                    block,
                    row: layout.first_day_row + offset as u32,
                    flag: row.get(2).and_then(|cell| DayFlag::from_symbol(cell)),
                    names: row.get(3).map(|cell| split_names(cell)).unwrap_or_default(),
                }));
            }
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptOutOutcome {
    /// Name recorded (or already present); the day is now Unavailable.
    Applied { names: Vec<String> },
    NotFound,
}

/// Adds `name` to the date's opt-out list (case-insensitively unique,
/// first-seen casing kept) and forces the flag to Unavailable. Names
/// are written before the flag.
pub fn opt_out(
    store: &dyn TabularStore,
    layout: &SheetLayout,
    date: NaiveDate,
    name: &str,
) -> Result<OptOutOutcome> {
    let Some(found) = locate_day(store, layout, date)? else {
        return Ok(OptOutOutcome::NotFound);
    };

    let mut names = found.names;
    let lowered = name.to_lowercase();
    if !names.iter().any(|n| n.to_lowercase() == lowered) {
        names.push(name.to_owned());
    }

    store
        .write_range(&layout.names_cell(found.block, found.row), &[vec![join_names(&names)]])
        .map_err(RosterError::backend)?;
    store
        .write_range(
            &layout.flag_cell(found.block, found.row),
            &[vec![DayFlag::Unavailable.symbol().to_owned()]],
        )
        .map_err(RosterError::backend)?;

    debug!("opt-out {} on {}: {} name(s)", name, dates::canonical(date), names.len());
    Ok(OptOutOutcome::Applied { names })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptInOutcome {
    /// Name removed; flag derived from the remaining list.
    Applied { flag: DayFlag, names: Vec<String> },
    NotFound,
}

/// Removes `name` from the date's opt-out list (case-insensitive).
/// An emptied list flips the flag back to Available, otherwise it
/// stays Unavailable. The flag is written before the names.
pub fn opt_in(
    store: &dyn TabularStore,
    layout: &SheetLayout,
    date: NaiveDate,
    name: &str,
) -> Result<OptInOutcome> {
    let Some(found) = locate_day(store, layout, date)? else {
        return Ok(OptInOutcome::NotFound);
    };

    let lowered = name.to_lowercase();
    let names: Vec<String> = found
        .names
        .into_iter()
        .filter(|n| n.to_lowercase() != lowered)
        .collect();
    let flag = if names.is_empty() {
        DayFlag::Available
    } else {
        DayFlag::Unavailable
    };

    store
        .write_range(
            &layout.flag_cell(found.block, found.row),
            &[vec![flag.symbol().to_owned()]],
        )
        .map_err(RosterError::backend)?;
    store
        .write_range(&layout.names_cell(found.block, found.row), &[vec![join_names(&names)]])
        .map_err(RosterError::backend)?;

    debug!("opt-in {} on {}: {} name(s) left", name, dates::canonical(date), names.len());
    Ok(OptInOutcome::Applied { flag, names })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagWriteOutcome {
    Written { flag: DayFlag },
    /// Refused: the weekday is not a raid weekday and the guard is on.
    SkippedWeekday,
    NotFound,
}

/// Overwrites the flag cell only, leaving names untouched. With
/// `only_on_raid_weekdays` the write is refused for dates outside the
/// configured weekday set. Can leave a day Unavailable with an empty
/// name list, which is the point of a manual override.
pub fn set_flag(
    store: &dyn TabularStore,
    layout: &SheetLayout,
    raid_weekdays: &WeekdaySet,
    date: NaiveDate,
    flag: DayFlag,
    only_on_raid_weekdays: bool,
) -> Result<FlagWriteOutcome> {
    if only_on_raid_weekdays && !raid_weekdays.contains(date.weekday()) {
        return Ok(FlagWriteOutcome::SkippedWeekday);
    }
    let Some(found) = locate_day(store, layout, date)? else {
        return Ok(FlagWriteOutcome::NotFound);
    };
    store
        .write_range(
            &layout.flag_cell(found.block, found.row),
            &[vec![flag.symbol().to_owned()]],
        )
        .map_err(RosterError::backend)?;
    Ok(FlagWriteOutcome::Written { flag })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Toggled { flag: DayFlag },
    NotFound,
}

/// Flips the date's flag. A cell holding anything but `✔` flips to
/// Available, matching a plain visual toggle.
pub fn toggle_flag(
    store: &dyn TabularStore,
    layout: &SheetLayout,
    date: NaiveDate,
) -> Result<ToggleOutcome> {
    let Some(found) = locate_day(store, layout, date)? else {
        return Ok(ToggleOutcome::NotFound);
    };
    let flag = match found.flag {
        Some(DayFlag::Available) => DayFlag::Unavailable,
        _ => DayFlag::Available,
    };
    store
        .write_range(
            &layout.flag_cell(found.block, found.row),
            &[vec![flag.symbol().to_owned()]],
        )
        .map_err(RosterError::backend)?;
    Ok(ToggleOutcome::Toggled { flag })
}

/// Whether the date is in the visible window and marked Available.
pub fn is_raid_day(
    store: &dyn TabularStore,
    layout: &SheetLayout,
    date: NaiveDate,
) -> Result<bool> {
    Ok(locate_day(store, layout, date)?.is_some_and(|d| d.flag == Some(DayFlag::Available)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::config::SheetConfig;
    use crate::schedule::merge::refresh_preserving_overrides;
    use crate::store::memory::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded() -> (MemoryStore, SheetLayout) {
        let store = MemoryStore::new();
        let layout = SheetLayout::from_config(&SheetConfig::default(), 3).unwrap();
        refresh_preserving_overrides(&store, &layout, &WeekdaySet::default(), date(2025, 9, 15))
            .unwrap();
        (store, layout)
    }

    #[test]
    fn locate_finds_dates_in_later_blocks() {
        let (store, layout) = seeded();
        let found = locate_day(&store, &layout, date(2025, 10, 1)).unwrap().unwrap();
        assert_eq!(found.block, 1);
        assert_eq!(found.row, 6);
        assert!(locate_day(&store, &layout, date(2030, 1, 1)).unwrap().is_none());
    }

    #[test]
    fn opt_out_then_opt_in_round_trip() {
        let (store, layout) = seeded();
        let wednesday = date(2025, 9, 17);

        let out = opt_out(&store, &layout, wednesday, "Alice").unwrap();
        assert_eq!(out, OptOutOutcome::Applied { names: vec!["Alice".to_owned()] });
        let out = opt_out(&store, &layout, wednesday, "Bob").unwrap();
        assert_eq!(
            out,
            OptOutOutcome::Applied { names: vec!["Alice".to_owned(), "Bob".to_owned()] }
        );
        assert_eq!(store.cell("Schedule", 3, 8), "✖");
        assert_eq!(store.cell("Schedule", 4, 8), "Alice, Bob");

        let back = opt_in(&store, &layout, wednesday, "Alice").unwrap();
        assert_eq!(
            back,
            OptInOutcome::Applied {
                flag: DayFlag::Unavailable,
                names: vec!["Bob".to_owned()],
            }
        );

        let back = opt_in(&store, &layout, wednesday, "Bob").unwrap();
        assert_eq!(back, OptInOutcome::Applied { flag: DayFlag::Available, names: vec![] });
        assert_eq!(store.cell("Schedule", 3, 8), "✔");
        assert_eq!(store.cell("Schedule", 4, 8), "");
    }

    #[test]
    fn opt_out_dedupes_case_insensitively_keeping_first_casing() {
        let (store, layout) = seeded();
        let day = date(2025, 9, 18);
        opt_out(&store, &layout, day, "Alice").unwrap();
        let out = opt_out(&store, &layout, day, "alice").unwrap();
        assert_eq!(out, OptOutOutcome::Applied { names: vec!["Alice".to_owned()] });
    }

    #[test]
    fn opt_in_removes_case_insensitively() {
        let (store, layout) = seeded();
        let day = date(2025, 9, 18);
        opt_out(&store, &layout, day, "Alice").unwrap();
        let out = opt_in(&store, &layout, day, "ALICE").unwrap();
        assert_eq!(out, OptInOutcome::Applied { flag: DayFlag::Available, names: vec![] });
    }

    #[test]
    fn unknown_dates_are_reported_not_found() {
        let (store, layout) = seeded();
        let missing = date(2030, 1, 1);
        assert_eq!(opt_out(&store, &layout, missing, "Alice").unwrap(), OptOutOutcome::NotFound);
        assert_eq!(opt_in(&store, &layout, missing, "Alice").unwrap(), OptInOutcome::NotFound);
        assert_eq!(toggle_flag(&store, &layout, missing).unwrap(), ToggleOutcome::NotFound);
        assert_eq!(
            set_flag(
                &store,
                &layout,
                &WeekdaySet::default(),
                missing,
                DayFlag::Available,
                false
            )
            .unwrap(),
            FlagWriteOutcome::NotFound
        );
    }

    #[test]
    fn set_flag_respects_the_weekday_guard() {
        let (store, layout) = seeded();
        let tuesday = date(2025, 9, 16);

        let out = set_flag(
            &store,
            &layout,
            &WeekdaySet::default(),
            tuesday,
            DayFlag::Available,
            true,
        )
        .unwrap();
        assert_eq!(out, FlagWriteOutcome::SkippedWeekday);
        assert_eq!(store.cell("Schedule", 3, 7), "✖");

        let out = set_flag(
            &store,
            &layout,
            &WeekdaySet::default(),
            tuesday,
            DayFlag::Available,
            false,
        )
        .unwrap();
        assert_eq!(out, FlagWriteOutcome::Written { flag: DayFlag::Available });
        assert_eq!(store.cell("Schedule", 3, 7), "✔");
    }

    #[test]
    fn set_flag_leaves_names_alone() {
        let (store, layout) = seeded();
        let monday = date(2025, 9, 15);
        opt_out(&store, &layout, monday, "Alice").unwrap();

        set_flag(&store, &layout, &WeekdaySet::default(), monday, DayFlag::Available, true)
            .unwrap();
        // Available with a non-empty list: manual overrides may do this.
        assert_eq!(store.cell("Schedule", 3, 6), "✔");
        assert_eq!(store.cell("Schedule", 4, 6), "Alice");
    }

    #[test]
    fn toggle_flips_both_ways() {
        let (store, layout) = seeded();
        let monday = date(2025, 9, 15);
        assert_eq!(
            toggle_flag(&store, &layout, monday).unwrap(),
            ToggleOutcome::Toggled { flag: DayFlag::Unavailable }
        );
        assert_eq!(
            toggle_flag(&store, &layout, monday).unwrap(),
            ToggleOutcome::Toggled { flag: DayFlag::Available }
        );
    }

    #[test]
    fn raid_day_requires_presence_and_available_flag() {
        let (store, layout) = seeded();
        assert!(is_raid_day(&store, &layout, date(2025, 9, 15)).unwrap());
        assert!(!is_raid_day(&store, &layout, date(2025, 9, 16)).unwrap());
        assert!(!is_raid_day(&store, &layout, date(2030, 1, 1)).unwrap());

        opt_out(&store, &layout, date(2025, 9, 15), "Alice").unwrap();
        assert!(!is_raid_day(&store, &layout, date(2025, 9, 15)).unwrap());
    }
}
