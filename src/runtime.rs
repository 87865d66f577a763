//! Single-writer runtime: one queue, one worker.
//!
//! Chat commands, the reminder tick and the daily refresh all travel
//! through one mpsc channel and run serially, so two operations can
//! never interleave their reads and writes on the sheet. Callers get
//! their status line back over a oneshot, which lets a front end
//! acknowledge immediately and deliver the result when it arrives.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, LocalResult, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::{Result, RosterError};
use crate::service::RosterService;

const QUEUE_DEPTH: usize = 64;

/// One user-facing operation, as carried through the queue.
#[derive(Debug)]
pub enum Command {
    MarkUnavailable {
        date: String,
        user_id: u64,
        user_name: String,
    },
    MarkAvailable {
        date: String,
        user_name: String,
    },
    SetDayFlag {
        date: String,
        available: bool,
    },
    ToggleDay {
        date: String,
    },
    Rebuild {
        start_from_day_one: bool,
    },
    Refresh,
    EnableReminder {
        user_id: u64,
        user_tag: String,
        time: Option<String>,
    },
    DisableReminder {
        user_id: u64,
        user_tag: String,
    },
    SetTimezone {
        user_id: u64,
        zone: String,
    },
    ShowDashboard,
}

struct CommandRequest {
    command: Command,
    reply: oneshot::Sender<String>,
}

enum RuntimeJob {
    Command(CommandRequest),
    ReminderTick,
    DailyRefresh,
}

/// The worker end of the queue. Consumed by [`Runtime::run`].
pub struct Runtime {
    service: Arc<RosterService>,
    jobs: mpsc::Receiver<RuntimeJob>,
}

/// Cloneable sender half; front ends and tickers hold these.
#[derive(Clone)]
pub struct RuntimeHandle {
    jobs: mpsc::Sender<RuntimeJob>,
}

impl Runtime {
    /// Creates the runtime and its handle.
    #[must_use]
    pub fn new(service: RosterService) -> (Self, RuntimeHandle) {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        (
            Self {
                service: Arc::new(service),
                jobs: rx,
            },
            RuntimeHandle { jobs: tx },
        )
    }

    /// Drains the queue until every handle is gone.
    pub async fn run(mut self) {
        info!("roster runtime started");
        while let Some(job) = self.jobs.recv().await {
            match job {
                RuntimeJob::Command(request) => {
                    let reply = match execute(&self.service, request.command).await {
                        Ok(line) => line,
                        Err(err) => {
                            if !err.is_user_input() {
                                error!("command failed: {err}");
                            }
                            err.user_message()
                        }
                    };
                    if request.reply.send(reply).is_err() {
                        debug!("command caller went away before the reply");
                    }
                }
                RuntimeJob::ReminderTick => {
                    if let Err(err) = self.service.reminder_tick(Utc::now()).await {
                        warn!("reminder tick failed: {err}");
                    }
                }
                RuntimeJob::DailyRefresh => match self.service.refresh().await {
                    Ok(line) => info!("daily refresh: {line}"),
                    Err(err) => warn!("daily refresh failed: {err}"),
                },
            }
        }
        info!("roster runtime stopped");
    }
}

async fn execute(service: &RosterService, command: Command) -> Result<String> {
    match command {
        Command::MarkUnavailable {
            date,
            user_id,
            user_name,
        } => service.mark_unavailable(&date, user_id, &user_name).await,
        Command::MarkAvailable { date, user_name } => {
            service.mark_available(&date, &user_name).await
        }
        Command::SetDayFlag { date, available } => service.set_day_flag(&date, available).await,
        Command::ToggleDay { date } => service.toggle_day(&date).await,
        Command::Rebuild { start_from_day_one } => service.rebuild(start_from_day_one).await,
        Command::Refresh => service.refresh().await,
        Command::EnableReminder {
            user_id,
            user_tag,
            time,
        } => service.enable_reminder(user_id, &user_tag, time).await,
        Command::DisableReminder { user_id, user_tag } => {
            service.disable_reminder(user_id, &user_tag).await
        }
        Command::SetTimezone { user_id, zone } => service.set_timezone(user_id, &zone).await,
        Command::ShowDashboard => service.show_dashboard().await,
    }
}

impl RuntimeHandle {
    /// Queues a command and waits for its status line. Errors are
    /// already rendered; whatever comes back can go straight to chat.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Backend`] when the runtime is gone.
    pub async fn dispatch(&self, command: Command) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        self.jobs
            .send(RuntimeJob::Command(CommandRequest {
                command,
                reply: tx,
            }))
            .await
            .map_err(|_| RosterError::Backend("runtime is not running".to_owned()))?;
        rx.await
            .map_err(|_| RosterError::Backend("runtime dropped the reply".to_owned()))
    }

    /// Spawns the periodic reminder ticker. The task ends when the
    /// runtime goes away.
    pub fn spawn_reminder_ticker(&self, tick_secs: u64) -> JoinHandle<()> {
        let jobs = self.jobs.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(tick_secs.max(1)));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if jobs.send(RuntimeJob::ReminderTick).await.is_err() {
                    break;
                }
            }
        })
    }

    /// Spawns the daily refresh task, firing at the given wall time in
    /// `zone`.
    pub fn spawn_daily_refresh(&self, zone: Tz, hour: u32, minute: u32) -> JoinHandle<()> {
        let jobs = self.jobs.clone();
        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = next_occurrence(now, zone, hour, minute);
                let wait = (next - now)
                    .to_std()
                    .unwrap_or(Duration::from_secs(60 * 60 * 24));
                debug!("next refresh at {next}");
                tokio::time::sleep(wait).await;
                if jobs.send(RuntimeJob::DailyRefresh).await.is_err() {
                    break;
                }
            }
        })
    }
}

/// Next instant strictly after `now` at which the zone's wall clock
/// reads `hour:minute`. A DST gap skips to the next day; an ambiguous
/// wall time takes the earlier of the two instants.
#[must_use]
pub fn next_occurrence(now: DateTime<Utc>, zone: Tz, hour: u32, minute: u32) -> DateTime<Utc> {
    let local_now = now.with_timezone(&zone);
    for days in 0..=3u64 {
        let Some(date) = local_now.date_naive().checked_add_days(Days::new(days)) else {
            continue;
        };
        let Some(naive) = date.and_hms_opt(hour, minute, 0) else {
            continue;
        };
        let candidate = match zone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt),
            LocalResult::Ambiguous(first, _) => Some(first),
            LocalResult::None => None,
        };
        if let Some(dt) = candidate {
            let utc = dt.with_timezone(&Utc);
            if utc > now {
                return utc;
            }
        }
    }
    now + chrono::Duration::hours(24)
}
