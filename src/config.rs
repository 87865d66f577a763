//! Configuration for the roster service.
//!
//! Stored as TOML. Every section and field has a default matching the
//! layout the schedule sheet has always used, so an empty file is a
//! valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dates;
use crate::error::{Result, RosterError};
use crate::schedule::layout::SheetLayout;
use crate::schedule::{SchedulePolicy, WeekdaySet};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Window and weekday behavior.
    pub schedule: ScheduleConfig,
    /// Spreadsheet geometry.
    pub sheet: SheetConfig,
    /// Reminder dispatch settings.
    pub reminders: ReminderConfig,
}

/// Scheduling behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Months the rolling window spans, one sheet block per month.
    pub window_months: u32,
    /// Weekdays that default to Available ("Mon" or "Monday").
    pub raid_weekdays: Vec<String>,
    /// Canonical IANA timezone: defines "today" for refreshes and
    /// raid-day checks, and is the fallback for user rows without a
    /// usable zone.
    pub timezone: String,
    /// Local wall time of the daily window refresh, `HH:MM`.
    pub refresh_time: String,
    /// Refuse manual flag writes on weekdays outside `raid_weekdays`.
    pub restrict_flag_overrides: bool,
    /// Days listed on the dashboard.
    pub dashboard_days: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            window_months: 6,
            raid_weekdays: vec!["Mon".to_owned(), "Wed".to_owned(), "Thu".to_owned()],
            timezone: "Europe/Berlin".to_owned(),
            refresh_time: "05:00".to_owned(),
            restrict_flag_overrides: true,
            dashboard_days: 7,
        }
    }
}

/// Where things live on the spreadsheet. Rows and columns are 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Tab holding the schedule grid and the reminder table.
    pub schedule_tab: String,
    /// Tab receiving the opt-out audit log.
    pub optout_log_tab: String,
    /// Row of the month headers.
    pub header_row: u32,
    /// First row of day data in each block.
    pub first_day_row: u32,
    /// Day rows reserved per block; must fit a 31-day month.
    pub block_capacity: u32,
    /// Header row of the reminder table, below the day grid.
    pub reminder_header_row: u32,
    /// Data rows scanned below the reminder header.
    pub reminder_max_rows: u32,
    /// Cell keeping the dashboard message reference, e.g. "AF1".
    pub dashboard_ref_cell: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            schedule_tab: "Schedule".to_owned(),
            optout_log_tab: "Cant".to_owned(),
            header_row: 4,
            first_day_row: 6,
            block_capacity: 31,
            reminder_header_row: 300,
            reminder_max_rows: 1000,
            dashboard_ref_cell: "AF1".to_owned(),
        }
    }
}

/// Reminder dispatch knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Time written when a user enables without giving one.
    pub default_time: String,
    /// Seconds between dispatch evaluations.
    pub tick_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            default_time: "17:00".to_owned(),
            tick_secs: 60,
        }
    }
}

impl RosterConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| RosterError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Saves the configuration as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RosterError::Config(format!("failed to serialize config: {e}")))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default path: `<user config dir>/raidroster/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error when the platform has no config directory.
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("raidroster").join("config.toml"))
            .ok_or_else(|| RosterError::Config("no user config directory".to_owned()))
    }

    /// Loads from the default path; a missing file means defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be parsed.
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Derived sheet geometry, one block per window month.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Config`] for a geometry that cannot hold
    /// the window.
    pub fn layout(&self) -> Result<SheetLayout> {
        SheetLayout::from_config(&self.sheet, self.schedule.window_months as usize)
    }

    /// Validated scheduling knobs.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Config`] for an unknown timezone or
    /// weekday name, an empty weekday set, or zero dashboard days.
    pub fn policy(&self) -> Result<SchedulePolicy> {
        let zone: chrono_tz::Tz = self.schedule.timezone.trim().parse().map_err(|_| {
            RosterError::Config(format!("unknown timezone '{}'", self.schedule.timezone))
        })?;
        let raid_weekdays = WeekdaySet::from_names(&self.schedule.raid_weekdays)?;
        if raid_weekdays.is_empty() {
            return Err(RosterError::Config("raid_weekdays must not be empty".to_owned()));
        }
        if self.schedule.dashboard_days == 0 {
            return Err(RosterError::Config("dashboard_days must be at least 1".to_owned()));
        }
        Ok(SchedulePolicy {
            window_months: self.schedule.window_months as usize,
            raid_weekdays,
            zone,
            restrict_flag_overrides: self.schedule.restrict_flag_overrides,
            dashboard_days: self.schedule.dashboard_days,
        })
    }

    /// Daily refresh wall time as `(hour, minute)`.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Config`] when `refresh_time` is not a
    /// valid `HH:MM`.
    pub fn refresh_at(&self) -> Result<(u32, u32)> {
        dates::parse_hhmm_pair(&self.schedule.refresh_time).map_err(|_| {
            RosterError::Config(format!("bad refresh_time '{}'", self.schedule.refresh_time))
        })
    }

    /// Canonical form of the default reminder time.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Config`] when `default_time` is not a
    /// valid `HH:MM`.
    pub fn default_reminder_time(&self) -> Result<String> {
        dates::parse_hhmm(&self.reminders.default_time).map_err(|_| {
            RosterError::Config(format!(
                "bad reminders.default_time '{}'",
                self.reminders.default_time
            ))
        })
    }
}
