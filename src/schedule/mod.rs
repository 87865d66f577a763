//! Schedule domain model: days, availability flags and the weekday set
//! that makes a date a raid day by default.

pub mod layout;
pub mod merge;
pub mod overrides;
pub mod window;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::dates;
use crate::error::{Result, RosterError};

/// Availability flag of one schedule day, stored as `✔` / `✖`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayFlag {
    Available,
    Unavailable,
}

impl DayFlag {
    /// The cell symbol for this flag.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Available => "✔",
            Self::Unavailable => "✖",
        }
    }

    /// Parses a flag cell. Anything but the two symbols is `None`
    /// (empty cells, stray text).
    #[must_use]
    pub fn from_symbol(cell: &str) -> Option<Self> {
        match cell.trim() {
            "✔" => Some(Self::Available),
            "✖" => Some(Self::Unavailable),
            _ => None,
        }
    }

    /// The opposite flag.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Available => Self::Unavailable,
            Self::Unavailable => Self::Available,
        }
    }
}

/// Set of weekdays that default to Available when a window is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekdaySet(Vec<Weekday>);

impl WeekdaySet {
    #[must_use]
    pub fn new(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut set = Vec::new();
        for day in days {
            if !set.contains(&day) {
                set.push(day);
            }
        }
        Self(set)
    }

    /// Parses weekday names from configuration ("Mon" or "Monday",
    /// case-insensitive).
    pub fn from_names(names: &[String]) -> Result<Self> {
        let mut days = Vec::with_capacity(names.len());
        for name in names {
            let day: Weekday = name
                .trim()
                .parse()
                .map_err(|_| RosterError::Config(format!("unknown weekday '{name}'")))?;
            days.push(day);
        }
        Ok(Self::new(days))
    }

    #[must_use]
    pub fn contains(&self, day: Weekday) -> bool {
        self.0.contains(&day)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for WeekdaySet {
    /// Mon/Wed/Thu, the planned raid days.
    fn default() -> Self {
        Self::new([Weekday::Mon, Weekday::Wed, Weekday::Thu])
    }
}

/// Validated scheduling knobs, derived from configuration once at
/// startup.
#[derive(Debug, Clone)]
pub struct SchedulePolicy {
    /// Months the rolling window spans.
    pub window_months: usize,
    pub raid_weekdays: WeekdaySet,
    /// Canonical zone: "today" for refreshes and raid-day checks, and
    /// the fallback for user rows without a usable timezone.
    pub zone: chrono_tz::Tz,
    /// Refuse manual flag writes on non-raid weekdays.
    pub restrict_flag_overrides: bool,
    /// Days shown on the dashboard.
    pub dashboard_days: usize,
}

/// One day of the schedule window.
///
/// The calendar date is the identity; which block currently holds the
/// day is derived at write time. `opted_out` keeps first-seen casing
/// and is unique case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleDay {
    pub date: NaiveDate,
    pub flag: DayFlag,
    pub opted_out: Vec<String>,
}

impl ScheduleDay {
    #[must_use]
    pub fn new(date: NaiveDate, flag: DayFlag) -> Self {
        Self {
            date,
            flag,
            opted_out: Vec::new(),
        }
    }

    /// The four stored cells: weekday, date, flag, names.
    #[must_use]
    pub fn row_cells(&self) -> Vec<String> {
        vec![
            dates::weekday_name(self.date),
            dates::canonical(self.date),
            self.flag.symbol().to_owned(),
            join_names(&self.opted_out),
        ]
    }

    #[must_use]
    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }
}

/// Splits a names cell into trimmed, non-empty entries.
#[must_use]
pub fn split_names(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Joins names the way the names cell stores them.
#[must_use]
pub fn join_names(names: &[String]) -> String {
    names.join(", ")
}
