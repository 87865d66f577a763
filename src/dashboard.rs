//! The pinned "next raid days" message: a short render of the
//! upcoming Available days plus the persisted reference of the live
//! message so it can be edited in place.

use chrono::NaiveDate;

use crate::channels::MessageRef;
use crate::dates;
use crate::error::{Result, RosterError};
use crate::schedule::layout::SheetLayout;
use crate::schedule::{DayFlag, ScheduleDay, split_names};
use crate::store::TabularStore;

/// The next `count` days at or after `from` marked Available, in date
/// order across all blocks.
pub fn upcoming_raid_days(
    store: &dyn TabularStore,
    layout: &SheetLayout,
    from: NaiveDate,
    count: usize,
) -> Result<Vec<ScheduleDay>> {
    let mut days = Vec::new();
    for block in 0..layout.blocks {
        let rows = store
            .read_range(&layout.block_range(block))
            .map_err(RosterError::backend)?;
        for row in &rows {
            let Some(date) = row.get(1).and_then(|c| dates::parse_canonical(c)) else {
                continue;
            };
            if date < from {
                continue;
            }
            if row.get(2).and_then(|c| DayFlag::from_symbol(c)) != Some(DayFlag::Available) {
                continue;
            }
            let mut day = ScheduleDay::new(date, DayFlag::Available);
            day.opted_out = row.get(3).map(|c| split_names(c)).unwrap_or_default();
            days.push(day);
        }
    }
    days.sort_by_key(|d| d.date);
    days.truncate(count);
    Ok(days)
}

/// Plain chat text: a header plus one line per day.
#[must_use]
pub fn render(days: &[ScheduleDay]) -> String {
    if days.is_empty() {
        return "No raid days in the current window.".to_owned();
    }
    let mut lines = vec!["Next raid days:".to_owned()];
    for day in days {
        lines.push(format!(
            "- {} {} ({} opted out)",
            dates::weekday_name(day.date),
            dates::canonical(day.date),
            day.opted_out.len()
        ));
    }
    lines.join("\n")
}

/// Reference of the live dashboard message, when one was stored.
pub fn read_message_ref(
    store: &dyn TabularStore,
    layout: &SheetLayout,
) -> Result<Option<MessageRef>> {
    let rows = store
        .read_range(&layout.dashboard_ref_cell())
        .map_err(RosterError::backend)?;
    let cell = rows
        .first()
        .and_then(|r| r.first())
        .map_or("", |c| c.trim());
    Ok((!cell.is_empty()).then(|| MessageRef(cell.to_owned())))
}

pub fn write_message_ref(
    store: &dyn TabularStore,
    layout: &SheetLayout,
    message: &MessageRef,
) -> Result<()> {
    store
        .write_range(&layout.dashboard_ref_cell(), &[vec![message.0.clone()]])
        .map_err(RosterError::backend)
}
