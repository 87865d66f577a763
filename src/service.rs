//! The command surface.
//!
//! One method per user-facing operation, each returning a short status
//! string ready to drop into a chat reply. Store I/O is blocking and
//! runs on the blocking pool; every method has an `_at` twin taking
//! the current instant so behavior is testable at a fixed clock.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use crate::channels::{ChannelSink, EditOutcome, ReminderPing};
use crate::config::RosterConfig;
use crate::dashboard;
use crate::dates;
use crate::error::{Result, RosterError};
use crate::reminders::dispatch::{due_users, resolve_zone};
use crate::reminders::registry;
use crate::schedule::layout::SheetLayout;
use crate::schedule::merge;
use crate::schedule::overrides::{
    self, FlagWriteOutcome, OptInOutcome, OptOutOutcome, ToggleOutcome,
};
use crate::schedule::{DayFlag, SchedulePolicy};
use crate::store::TabularStore;

/// Scheduling service over one spreadsheet and one chat sink.
pub struct RosterService {
    store: Arc<dyn TabularStore>,
    sink: Arc<dyn ChannelSink>,
    layout: Arc<SheetLayout>,
    policy: SchedulePolicy,
    default_reminder_time: String,
}

impl RosterService {
    /// Builds the service from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Config`] when the configuration does not
    /// validate.
    pub fn new(
        config: &RosterConfig,
        store: Arc<dyn TabularStore>,
        sink: Arc<dyn ChannelSink>,
    ) -> Result<Self> {
        Ok(Self {
            layout: Arc::new(config.layout()?),
            policy: config.policy()?,
            default_reminder_time: config.default_reminder_time()?,
            store,
            sink,
        })
    }

    /// Today in the canonical zone.
    fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.policy.zone).date_naive()
    }

    /// Runs a store job on the blocking pool.
    async fn run_blocking<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&dyn TabularStore, &SheetLayout) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let layout = Arc::clone(&self.layout);
        tokio::task::spawn_blocking(move || job(store.as_ref(), &layout))
            .await
            .map_err(|e| RosterError::Backend(format!("blocking task failed: {e}")))?
    }

    /// Records a user as out on a date and logs it to the audit tab.
    pub async fn mark_unavailable(
        &self,
        date_input: &str,
        user_id: u64,
        user_name: &str,
    ) -> Result<String> {
        self.mark_unavailable_at(date_input, user_id, user_name, Utc::now())
            .await
    }

    pub async fn mark_unavailable_at(
        &self,
        date_input: &str,
        user_id: u64,
        user_name: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let date = dates::parse_user_date(date_input, self.today(now))?;
        let name = user_name.trim().to_owned();

        let outcome = {
            let name = name.clone();
            self.run_blocking(move |store, layout| overrides::opt_out(store, layout, date, &name))
                .await?
        };
        match outcome {
            OptOutOutcome::Applied { names } => {
                self.log_opt_out(user_id, &name, date, now).await?;
                info!("{name} opted out of {}", dates::canonical(date));
                Ok(format!(
                    "{name} is out on {}. Out that day: {}.",
                    dates::canonical(date),
                    names.join(", ")
                ))
            }
            OptOutOutcome::NotFound => Ok(not_in_window(date)),
        }
    }

    /// Removes a user from a date's opt-out list.
    pub async fn mark_available(&self, date_input: &str, user_name: &str) -> Result<String> {
        self.mark_available_at(date_input, user_name, Utc::now())
            .await
    }

    pub async fn mark_available_at(
        &self,
        date_input: &str,
        user_name: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let date = dates::parse_user_date(date_input, self.today(now))?;
        let name = user_name.trim().to_owned();

        let outcome = {
            let name = name.clone();
            self.run_blocking(move |store, layout| overrides::opt_in(store, layout, date, &name))
                .await?
        };
        match outcome {
            OptInOutcome::Applied { flag, names } => {
                info!("{name} opted back in on {}", dates::canonical(date));
                let tail = if flag == DayFlag::Available {
                    "The day is on again.".to_owned()
                } else {
                    format!("Still out: {}.", names.join(", "))
                };
                Ok(format!("{name} is back for {}. {tail}", dates::canonical(date)))
            }
            OptInOutcome::NotFound => Ok(not_in_window(date)),
        }
    }

    /// Sets a date's flag directly, names untouched.
    pub async fn set_day_flag(&self, date_input: &str, available: bool) -> Result<String> {
        self.set_day_flag_at(date_input, available, Utc::now())
            .await
    }

    pub async fn set_day_flag_at(
        &self,
        date_input: &str,
        available: bool,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let date = dates::parse_user_date(date_input, self.today(now))?;
        let flag = if available {
            DayFlag::Available
        } else {
            DayFlag::Unavailable
        };
        let weekdays = self.policy.raid_weekdays.clone();
        let restrict = self.policy.restrict_flag_overrides;

        let outcome = self
            .run_blocking(move |store, layout| {
                overrides::set_flag(store, layout, &weekdays, date, flag, restrict)
            })
            .await?;
        match outcome {
            FlagWriteOutcome::Written { flag: DayFlag::Available } => {
                Ok(format!("{} is a raid day now.", dates::canonical(date)))
            }
            FlagWriteOutcome::Written { flag: DayFlag::Unavailable } => {
                Ok(format!("{} is off now.", dates::canonical(date)))
            }
            FlagWriteOutcome::SkippedWeekday => Ok(format!(
                "{} is not a raid weekday; flag unchanged.",
                dates::canonical(date)
            )),
            FlagWriteOutcome::NotFound => Ok(not_in_window(date)),
        }
    }

    /// Flips a date's flag.
    pub async fn toggle_day(&self, date_input: &str) -> Result<String> {
        self.toggle_day_at(date_input, Utc::now()).await
    }

    pub async fn toggle_day_at(&self, date_input: &str, now: DateTime<Utc>) -> Result<String> {
        let date = dates::parse_user_date(date_input, self.today(now))?;
        let outcome = self
            .run_blocking(move |store, layout| overrides::toggle_flag(store, layout, date))
            .await?;
        match outcome {
            ToggleOutcome::Toggled { flag } => Ok(format!(
                "{} toggled to {}.",
                dates::canonical(date),
                flag.symbol()
            )),
            ToggleOutcome::NotFound => Ok(not_in_window(date)),
        }
    }

    /// Rewrites the whole window with weekday defaults, discarding
    /// overrides. `start_from_day_one` starts the first month at its
    /// 1st instead of today.
    pub async fn rebuild(&self, start_from_day_one: bool) -> Result<String> {
        self.rebuild_at(start_from_day_one, Utc::now()).await
    }

    pub async fn rebuild_at(
        &self,
        start_from_day_one: bool,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let today = self.today(now);
        let weekdays = self.policy.raid_weekdays.clone();
        let days = self
            .run_blocking(move |store, layout| {
                merge::rebuild_defaults(store, layout, &weekdays, today, start_from_day_one)
            })
            .await?;
        Ok(format!("Schedule rebuilt: {days} days written."))
    }

    /// Rolls the window forward to today, keeping stored overrides.
    pub async fn refresh(&self) -> Result<String> {
        self.refresh_at(Utc::now()).await
    }

    pub async fn refresh_at(&self, now: DateTime<Utc>) -> Result<String> {
        let today = self.today(now);
        let weekdays = self.policy.raid_weekdays.clone();
        let days = self
            .run_blocking(move |store, layout| {
                merge::refresh_preserving_overrides(store, layout, &weekdays, today)
            })
            .await?;
        Ok(format!("Schedule refreshed: {days} days in the window."))
    }

    /// Switches a user's reminder on, at the given time or the default.
    pub async fn enable_reminder(
        &self,
        user_id: u64,
        user_tag: &str,
        time: Option<String>,
    ) -> Result<String> {
        let time = match time {
            Some(raw) => dates::parse_hhmm(&raw)?,
            None => self.default_reminder_time.clone(),
        };
        let tag = user_tag.to_owned();
        let default_time = self.default_reminder_time.clone();
        let sub = self
            .run_blocking(move |store, layout| {
                registry::upsert(store, layout, user_id, &tag, true, Some(&time), &default_time)
            })
            .await?;
        let zone = resolve_zone(&sub.timezone, self.policy.zone);
        Ok(format!("Reminder on, daily at {} ({zone}).", sub.time))
    }

    /// Switches a user's reminder off. The stored time is kept for the
    /// next enable.
    pub async fn disable_reminder(&self, user_id: u64, user_tag: &str) -> Result<String> {
        let tag = user_tag.to_owned();
        let default_time = self.default_reminder_time.clone();
        let sub = self
            .run_blocking(move |store, layout| {
                registry::upsert(store, layout, user_id, &tag, false, None, &default_time)
            })
            .await?;
        Ok(format!("Reminder off. Your time {} is kept.", sub.time))
    }

    /// Stores a user's IANA timezone for reminder dispatch.
    pub async fn set_timezone(&self, user_id: u64, zone: &str) -> Result<String> {
        let zone = zone.trim().to_owned();
        let default_time = self.default_reminder_time.clone();
        let echoed = zone.clone();
        self.run_blocking(move |store, layout| {
            registry::set_timezone(store, layout, user_id, &zone, &default_time)
        })
        .await?;
        Ok(format!("Timezone set to {echoed}."))
    }

    /// Renders the upcoming raid days and upserts the pinned dashboard
    /// message.
    pub async fn show_dashboard(&self) -> Result<String> {
        self.show_dashboard_at(Utc::now()).await
    }

    pub async fn show_dashboard_at(&self, now: DateTime<Utc>) -> Result<String> {
        let today = self.today(now);
        let count = self.policy.dashboard_days;
        let days = self
            .run_blocking(move |store, layout| {
                dashboard::upcoming_raid_days(store, layout, today, count)
            })
            .await?;
        let text = dashboard::render(&days);

        let stored = self.run_blocking(dashboard::read_message_ref).await?;
        let fresh = match stored {
            Some(reference) => {
                match self
                    .sink
                    .edit_dashboard(&reference, &text)
                    .await
                    .map_err(RosterError::backend)?
                {
                    EditOutcome::Edited => None,
                    EditOutcome::Gone => Some(
                        self.sink
                            .publish_dashboard(&text)
                            .await
                            .map_err(RosterError::backend)?,
                    ),
                }
            }
            None => Some(
                self.sink
                    .publish_dashboard(&text)
                    .await
                    .map_err(RosterError::backend)?,
            ),
        };
        if let Some(reference) = fresh {
            info!("dashboard published on {}", self.sink.id());
            self.run_blocking(move |store, layout| {
                dashboard::write_message_ref(store, layout, &reference)
            })
            .await?;
        }
        Ok(format!("Dashboard updated: {} day(s) listed.", days.len()))
    }

    /// Whether today (canonical zone) is a raid day.
    pub async fn is_raid_today(&self) -> Result<bool> {
        self.is_raid_today_at(Utc::now()).await
    }

    pub async fn is_raid_today_at(&self, now: DateTime<Utc>) -> Result<bool> {
        let today = self.today(now);
        self.run_blocking(move |store, layout| overrides::is_raid_day(store, layout, today))
            .await
    }

    /// One dispatch evaluation: on a raid day, ping everyone whose
    /// local clock matches their configured time and who has not been
    /// pinged on their local day yet. Returns how many users were
    /// pinged.
    pub async fn reminder_tick(&self, now: DateTime<Utc>) -> Result<usize> {
        if !self.is_raid_today_at(now).await? {
            return Ok(0);
        }

        let subs = self.run_blocking(registry::enabled_subscriptions).await?;
        let due = due_users(&subs, now, self.policy.zone);
        if due.is_empty() {
            return Ok(0);
        }

        let user_ids: Vec<u64> = due.iter().map(|d| d.user_id).collect();
        self.sink
            .send_reminder(ReminderPing { user_ids })
            .await
            .map_err(RosterError::backend)?;
        for ping in &due {
            let (user_id, local_date) = (ping.user_id, ping.local_date);
            self.run_blocking(move |store, layout| {
                registry::mark_notified(store, layout, user_id, local_date)
            })
            .await?;
        }
        info!(
            "reminder sent to {} user(s) for {}",
            due.len(),
            dates::canonical(self.today(now))
        );
        Ok(due.len())
    }

    /// Appends one line to the opt-out audit tab, creating it with its
    /// header on first use.
    async fn log_opt_out(
        &self,
        user_id: u64,
        user_name: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let stamp = now
            .with_timezone(&self.policy.zone)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let name = user_name.to_owned();
        self.run_blocking(move |store, layout| {
            let tab = &layout.optout_log_tab;
            let created = store.ensure_sheet(tab).map_err(RosterError::backend)?;
            if created {
                let header = ["Timestamp", "UserID", "UserTag", "Date (dd.mm.yyyy)"]
                    .map(str::to_owned);
                store.append_row(tab, &header).map_err(RosterError::backend)?;
            }
            let line = [stamp, user_id.to_string(), name, dates::canonical(date)];
            store.append_row(tab, &line).map_err(RosterError::backend)?;
            Ok(())
        })
        .await
    }
}

fn not_in_window(date: NaiveDate) -> String {
    format!(
        "{} is not in the current schedule window.",
        dates::canonical(date)
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::channels::MessageRef;
    use crate::store::memory::MemoryStore;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        pings: Mutex<Vec<ReminderPing>>,
        publishes: Mutex<Vec<String>>,
        edits: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ChannelSink for RecordingSink {
        fn id(&self) -> &'static str {
            "recording"
        }

        async fn send_reminder(&self, ping: ReminderPing) -> anyhow::Result<()> {
            self.pings.lock().unwrap().push(ping);
            Ok(())
        }

        async fn publish_dashboard(&self, text: &str) -> anyhow::Result<MessageRef> {
            let mut published = self.publishes.lock().unwrap();
            published.push(text.to_owned());
            Ok(MessageRef(format!("msg-{}", published.len())))
        }

        async fn edit_dashboard(
            &self,
            _message: &MessageRef,
            text: &str,
        ) -> anyhow::Result<EditOutcome> {
            self.edits.lock().unwrap().push(text.to_owned());
            Ok(EditOutcome::Edited)
        }
    }

    fn service() -> (Arc<MemoryStore>, Arc<RecordingSink>, RosterService) {
        service_with(RosterConfig::default())
    }

    fn service_with(
        config: RosterConfig,
    ) -> (Arc<MemoryStore>, Arc<RecordingSink>, RosterService) {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let service = RosterService::new(&config, store.clone(), sink.clone()).unwrap();
        (store, sink, service)
    }

    /// Monday 2025-09-15, 07:00 UTC (09:00 in Berlin).
    fn monday_morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 15, 7, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn opt_out_updates_the_grid_and_the_audit_tab() {
        let (store, _, service) = service();
        let now = monday_morning();
        service.rebuild_at(false, now).await.unwrap();

        let reply = service
            .mark_unavailable_at("17.9", 1, "Alice", now)
            .await
            .unwrap();
        assert_eq!(reply, "Alice is out on 17.09.2025. Out that day: Alice.");

        let log = store.snapshot("Cant");
        assert_eq!(log[0][0], "Timestamp");
        assert_eq!(log[1][1], "1");
        assert_eq!(log[1][2], "Alice");
        assert_eq!(log[1][3], "17.09.2025");

        let reply = service
            .mark_available_at("17.9", "alice", now)
            .await
            .unwrap();
        assert_eq!(reply, "alice is back for 17.09.2025. The day is on again.");
    }

    #[tokio::test]
    async fn dates_outside_the_window_read_as_informational() {
        let (store, _, service) = service();
        let now = monday_morning();
        service.rebuild_at(false, now).await.unwrap();

        let reply = service
            .mark_unavailable_at("1.1.2030", 1, "Alice", now)
            .await
            .unwrap();
        assert_eq!(reply, "01.01.2030 is not in the current schedule window.");
        // The audit tab is only created for applied opt-outs.
        assert!(!store.sheet_names().contains(&"Cant".to_owned()));
    }

    #[tokio::test]
    async fn invalid_input_surfaces_a_corrective_hint() {
        let (_, _, service) = service();
        let err = service
            .mark_unavailable_at("soon", 1, "Alice", monday_morning())
            .await
            .unwrap_err();
        assert!(err.is_user_input());
        assert!(err.user_message().contains("d.m.yyyy"));
    }

    #[tokio::test]
    async fn flag_writes_respect_the_weekday_restriction() {
        let (_, _, service) = service();
        let now = monday_morning();
        service.rebuild_at(false, now).await.unwrap();

        let reply = service.set_day_flag_at("16.9", true, now).await.unwrap();
        assert_eq!(reply, "16.09.2025 is not a raid weekday; flag unchanged.");

        let mut config = RosterConfig::default();
        config.schedule.restrict_flag_overrides = false;
        let (_, _, unrestricted) = service_with(config);
        unrestricted.rebuild_at(false, now).await.unwrap();
        let reply = unrestricted
            .set_day_flag_at("16.9", true, now)
            .await
            .unwrap();
        assert_eq!(reply, "16.09.2025 is a raid day now.");
    }

    #[tokio::test]
    async fn toggle_reports_the_new_symbol() {
        let (_, _, service) = service();
        let now = monday_morning();
        service.rebuild_at(false, now).await.unwrap();

        let reply = service.toggle_day_at("15.9", now).await.unwrap();
        assert_eq!(reply, "15.09.2025 toggled to ✖.");
        assert!(!service.is_raid_today_at(now).await.unwrap());
    }

    #[tokio::test]
    async fn reminder_tick_pings_once_per_local_day() {
        let (_, sink, service) = service();
        let now = monday_morning();
        service.rebuild_at(false, now).await.unwrap();
        service
            .enable_reminder(7, "alice#1", Some("09:00".to_owned()))
            .await
            .unwrap();
        service.set_timezone(7, "Europe/Berlin").await.unwrap();

        assert_eq!(service.reminder_tick(now).await.unwrap(), 1);
        assert_eq!(service.reminder_tick(now).await.unwrap(), 0);
        assert_eq!(sink.pings.lock().unwrap().len(), 1);
        assert_eq!(sink.pings.lock().unwrap()[0].user_ids, vec![7]);

        // Next Wednesday at the same local time pings again.
        let wednesday = Utc.with_ymd_and_hms(2025, 9, 17, 7, 0, 0).unwrap();
        assert_eq!(service.reminder_tick(wednesday).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reminder_tick_is_quiet_off_raid_days() {
        let (_, sink, service) = service();
        let now = monday_morning();
        service.rebuild_at(false, now).await.unwrap();
        service
            .enable_reminder(7, "alice#1", Some("09:00".to_owned()))
            .await
            .unwrap();

        // Tuesday is not a raid day by default.
        let tuesday = Utc.with_ymd_and_hms(2025, 9, 16, 7, 0, 0).unwrap();
        assert_eq!(service.reminder_tick(tuesday).await.unwrap(), 0);
        assert!(sink.pings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dashboard_publishes_then_edits_in_place() {
        let (store, sink, service) = service();
        let now = monday_morning();
        service.rebuild_at(false, now).await.unwrap();

        let reply = service.show_dashboard_at(now).await.unwrap();
        assert_eq!(reply, "Dashboard updated: 7 day(s) listed.");
        assert_eq!(sink.publishes.lock().unwrap().len(), 1);
        assert_eq!(store.cell("Schedule", 32, 1), "msg-1");

        service.show_dashboard_at(now).await.unwrap();
        assert_eq!(sink.publishes.lock().unwrap().len(), 1);
        assert_eq!(sink.edits.lock().unwrap().len(), 1);
        assert!(
            sink.edits.lock().unwrap()[0].starts_with("Next raid days:\n- Monday 15.09.2025")
        );
    }

    #[tokio::test]
    async fn disable_keeps_the_stored_time() {
        let (_, _, service) = service();
        service
            .enable_reminder(7, "alice#1", Some("08:30".to_owned()))
            .await
            .unwrap();
        let reply = service.disable_reminder(7, "alice#1").await.unwrap();
        assert_eq!(reply, "Reminder off. Your time 08:30 is kept.");

        let reply = service.enable_reminder(7, "alice#1", None).await.unwrap();
        // Enabling without a time goes back to the default.
        assert_eq!(reply, "Reminder on, daily at 17:00 (Europe/Berlin).");
    }
}
