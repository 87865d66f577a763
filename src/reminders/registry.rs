//! Per-user reminder rows stored on the schedule tab below the
//! visible window.
//!
//! Column order: UserID | UserTag | Enabled | Time | LastNotified |
//! Timezone. Upserts rewrite the first five columns only, so the
//! timezone survives enable and disable cycles untouched.

use chrono::NaiveDate;
use tracing::debug;

use crate::dates;
use crate::error::{Result, RosterError};
use crate::schedule::layout::SheetLayout;
use crate::store::{CellRange, TabularStore};

const HEADER: [&str; 6] = ["UserID", "UserTag", "Enabled", "Time", "LastNotified", "Timezone"];

/// One reminder row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub user_id: u64,
    pub tag: String,
    pub enabled: bool,
    /// Zero-padded HH:MM, interpreted in the user's own timezone.
    pub time: String,
    pub last_notified: Option<NaiveDate>,
    /// Stored zone name as entered; resolved at dispatch time.
    pub timezone: String,
}

impl Subscription {
    /// `None` when the user-id column does not hold a number.
    fn from_row(row: &[String]) -> Option<Self> {
        let user_id = row.first()?.trim().parse().ok()?;
        Some(Self {
            user_id,
            tag: row.get(1).cloned().unwrap_or_default(),
            enabled: row.get(2).is_some_and(|c| c.trim().eq_ignore_ascii_case("Y")),
            time: row.get(3).map(|c| c.trim().to_owned()).unwrap_or_default(),
            last_notified: row
                .get(4)
                .and_then(|c| NaiveDate::parse_from_str(c.trim(), "%Y-%m-%d").ok()),
            timezone: row.get(5).map(|c| c.trim().to_owned()).unwrap_or_default(),
        })
    }
}

/// Writes the header row unless it is already present verbatim.
fn ensure_header(store: &dyn TabularStore, layout: &SheetLayout) -> Result<()> {
    let range = layout.reminder_header_range();
    let existing = store.read_range(&range).map_err(RosterError::backend)?;
    let wanted: Vec<String> = HEADER.iter().map(|h| (*h).to_owned()).collect();
    if existing.first() != Some(&wanted) {
        store
            .write_range(&range, &[wanted])
            .map_err(RosterError::backend)?;
    }
    Ok(())
}

fn data_rows(store: &dyn TabularStore, layout: &SheetLayout) -> Result<Vec<Vec<String>>> {
    store
        .read_range(&layout.reminder_data_range())
        .map_err(RosterError::backend)
}

fn find_row(rows: &[Vec<String>], user_id: u64) -> Option<usize> {
    let uid = user_id.to_string();
    rows.iter()
        .position(|r| r.first().is_some_and(|c| c.trim() == uid))
}

/// A:E range for one data row; the timezone column stays out of it.
fn row_range(layout: &SheetLayout, row: u32) -> CellRange {
    CellRange::new(&layout.schedule_tab, 1, row, 5, row)
}

/// Creates or updates a user's row.
///
/// `time` of `Some` is validated and stored; `None` keeps the time
/// already on the row, falling back to `default_time` when the row is
/// new. LastNotified is always carried over.
///
/// # Errors
///
/// Returns [`RosterError::InvalidTimeFormat`] for a malformed time and
/// a backend error when the table has no free row left.
pub fn upsert(
    store: &dyn TabularStore,
    layout: &SheetLayout,
    user_id: u64,
    tag: &str,
    enable: bool,
    time: Option<&str>,
    default_time: &str,
) -> Result<Subscription> {
    ensure_header(store, layout)?;
    let rows = data_rows(store, layout)?;
    let found = find_row(&rows, user_id);

    let time = match time {
        Some(raw) => dates::parse_hhmm(raw)?,
        None => found
            .and_then(|i| rows[i].get(3))
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map_or_else(|| default_time.to_owned(), ToOwned::to_owned),
    };
    let last = found
        .and_then(|i| rows[i].get(4))
        .map(|c| c.trim().to_owned())
        .unwrap_or_default();
    let timezone = found
        .and_then(|i| rows[i].get(5))
        .map(|c| c.trim().to_owned())
        .unwrap_or_default();

    let row = match found {
        Some(i) => layout.reminder_row(i),
        None => {
            let row = layout.reminder_row(rows.len());
            if row > layout.reminder_last_row() {
                return Err(RosterError::Backend("reminder table is full".to_owned()));
            }
            row
        }
    };

    let enabled = if enable { "Y" } else { "N" };
    let cells = vec![
        user_id.to_string(),
        tag.to_owned(),
        enabled.to_owned(),
        time.clone(),
        last.clone(),
    ];
    store
        .write_range(&row_range(layout, row), &[cells])
        .map_err(RosterError::backend)?;
    debug!("reminder upsert for {user_id}: enabled={enable} time={time}");

    Ok(Subscription {
        user_id,
        tag: tag.to_owned(),
        enabled: enable,
        time,
        last_notified: NaiveDate::parse_from_str(&last, "%Y-%m-%d").ok(),
        timezone,
    })
}

/// Stores the user's zone name, creating a default-disabled row when
/// none exists yet. Existing rows get only their timezone cell
/// patched.
///
/// # Errors
///
/// Returns [`RosterError::InvalidTimezone`] when the name is not in
/// the IANA database.
pub fn set_timezone(
    store: &dyn TabularStore,
    layout: &SheetLayout,
    user_id: u64,
    zone: &str,
    default_time: &str,
) -> Result<()> {
    let zone = zone.trim();
    if zone.parse::<chrono_tz::Tz>().is_err() {
        return Err(RosterError::InvalidTimezone(zone.to_owned()));
    }

    ensure_header(store, layout)?;
    let rows = data_rows(store, layout)?;
    match find_row(&rows, user_id) {
        Some(i) => {
            let cell = CellRange::cell(&layout.schedule_tab, 6, layout.reminder_row(i));
            store
                .write_range(&cell, &[vec![zone.to_owned()]])
                .map_err(RosterError::backend)?;
        }
        None => {
            let row = layout.reminder_row(rows.len());
            if row > layout.reminder_last_row() {
                return Err(RosterError::Backend("reminder table is full".to_owned()));
            }
            let cells = vec![
                user_id.to_string(),
                String::new(),
                "N".to_owned(),
                default_time.to_owned(),
                String::new(),
                zone.to_owned(),
            ];
            store
                .write_range(&CellRange::new(&layout.schedule_tab, 1, row, 6, row), &[cells])
                .map_err(RosterError::backend)?;
        }
    }
    debug!("timezone for {user_id} set to {zone}");
    Ok(())
}

/// All rows currently switched on. Rows whose user id is not a number
/// are skipped.
pub fn enabled_subscriptions(
    store: &dyn TabularStore,
    layout: &SheetLayout,
) -> Result<Vec<Subscription>> {
    ensure_header(store, layout)?;
    let rows = data_rows(store, layout)?;
    let mut subs = Vec::new();
    for row in &rows {
        if row.first().is_some_and(|c| !c.trim().is_empty()) {
            match Subscription::from_row(row) {
                Some(sub) if sub.enabled => subs.push(sub),
                Some(_) => {}
                None => debug!("skipping reminder row with non-numeric id: {row:?}"),
            }
        }
    }
    Ok(subs)
}

/// Stamps the LastNotified cell with an ISO date. A missing row is a
/// no-op.
pub fn mark_notified(
    store: &dyn TabularStore,
    layout: &SheetLayout,
    user_id: u64,
    date: NaiveDate,
) -> Result<()> {
    let rows = data_rows(store, layout)?;
    if let Some(i) = find_row(&rows, user_id) {
        let cell = CellRange::cell(&layout.schedule_tab, 5, layout.reminder_row(i));
        store
            .write_range(&cell, &[vec![date.format("%Y-%m-%d").to_string()]])
            .map_err(RosterError::backend)?;
    }
    Ok(())
}
