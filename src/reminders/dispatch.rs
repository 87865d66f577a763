//! Per-tick decision of who is due, evaluated in each user's own
//! timezone.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use super::registry::Subscription;

/// Resolves a stored zone name. Empty or unparsable cells fall back
/// to the canonical zone, so one bad row never stalls the tick.
#[must_use]
pub fn resolve_zone(stored: &str, fallback: Tz) -> Tz {
    stored.trim().parse().unwrap_or(fallback)
}

/// A subscription that should be pinged right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuePing {
    pub user_id: u64,
    /// Today in the user's zone; stamped after the ping so a user
    /// never hears from us twice on the same local day.
    pub local_date: NaiveDate,
}

/// Users whose local wall clock matches their stored HH:MM and whose
/// last stamp is not already today (their today).
#[must_use]
pub fn due_users(subs: &[Subscription], now_utc: DateTime<Utc>, fallback: Tz) -> Vec<DuePing> {
    subs.iter()
        .filter_map(|sub| {
            let zone = resolve_zone(&sub.timezone, fallback);
            let local = now_utc.with_timezone(&zone);
            let local_date = local.date_naive();
            let due = local.format("%H:%M").to_string() == sub.time
                && sub.last_notified != Some(local_date);
            due.then_some(DuePing { user_id: sub.user_id, local_date })
        })
        .collect()
}
