//! Pure construction of the rolling schedule window.

use chrono::{Datelike, NaiveDate};

use super::{DayFlag, ScheduleDay, WeekdaySet};

/// The (year, month) each block represents for a given anchor:
/// the anchor's month plus one month per following block.
#[must_use]
pub fn month_span(anchor: NaiveDate, months: usize) -> Vec<(i32, u32)> {
    (0..months)
        .map(|idx| {
            let m0 = anchor.month() as i32 - 1 + idx as i32;
            let year = anchor.year() + m0.div_euclid(12);
            let month = (m0.rem_euclid(12) + 1) as u32;
            (year, month)
        })
        .collect()
}

/// Block header text, e.g. "September 2025".
#[must_use]
pub fn month_tag(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_default()
}

/// Number of days in a month.
#[must_use]
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(31, |last| last.day())
}

/// Default flag of a date: Available on the configured raid weekdays.
#[must_use]
pub fn default_flag(date: NaiveDate, raid_weekdays: &WeekdaySet) -> DayFlag {
    if raid_weekdays.contains(date.weekday()) {
        DayFlag::Available
    } else {
        DayFlag::Unavailable
    }
}

/// Builds the desired window: the anchor month (from the anchor day,
/// or day 1 when `start_from_anchor` is false) followed by full
/// months, in date order, with default flags and no names.
#[must_use]
pub fn build_window(
    anchor: NaiveDate,
    months: usize,
    start_from_anchor: bool,
    raid_weekdays: &WeekdaySet,
) -> Vec<ScheduleDay> {
    let mut days = Vec::new();
    for (idx, (year, month)) in month_span(anchor, months).into_iter().enumerate() {
        let start_day = if idx == 0 && start_from_anchor { anchor.day() } else { 1 };
        for day in start_day..=days_in_month(year, month) {
            // Every (year, month, day) here names a real date.
            let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                continue;
            };
            days.push(ScheduleDay::new(date, default_flag(date, raid_weekdays)));
        }
    }
    days
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn three_month_window_from_mid_september() {
        let days = build_window(date(2025, 9, 15), 3, true, &WeekdaySet::default());

        // 15–30 September, full October, full November.
        assert_eq!(days.len(), 16 + 31 + 30);
        assert_eq!(days.first().unwrap().date, date(2025, 9, 15));
        assert_eq!(days[15].date, date(2025, 9, 30));
        assert_eq!(days[16].date, date(2025, 10, 1));
        assert_eq!(days.last().unwrap().date, date(2025, 11, 30));

        // 2025-09-15 is a Monday and defaults to Available.
        assert_eq!(days[0].weekday(), Weekday::Mon);
        assert_eq!(days[0].flag, DayFlag::Available);
        // 2025-09-16 is a Tuesday.
        assert_eq!(days[1].flag, DayFlag::Unavailable);
        assert!(days.iter().all(|d| d.opted_out.is_empty()));
    }

    #[test]
    fn start_from_day_one_covers_the_whole_anchor_month() {
        let days = build_window(date(2025, 9, 15), 1, false, &WeekdaySet::default());
        assert_eq!(days.len(), 30);
        assert_eq!(days.first().unwrap().date, date(2025, 9, 1));
    }

    #[test]
    fn window_is_ordered_and_contiguous() {
        let days = build_window(date(2025, 9, 15), 6, true, &WeekdaySet::default());
        for pair in days.windows(2) {
            assert_eq!(pair[0].date.succ_opt().unwrap(), pair[1].date);
        }
    }

    #[test]
    fn december_rolls_into_january() {
        let span = month_span(date(2025, 11, 20), 3);
        assert_eq!(span, vec![(2025, 11), (2025, 12), (2026, 1)]);

        let days = build_window(date(2025, 11, 20), 3, true, &WeekdaySet::default());
        assert_eq!(days.last().unwrap().date, date(2026, 1, 31));
    }

    #[test]
    fn month_lengths_include_leap_february() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2025, 12), 31);
        assert_eq!(days_in_month(2025, 4), 30);
    }

    #[test]
    fn month_tags_render_full_name_and_year() {
        assert_eq!(month_tag(2025, 9), "September 2025");
        assert_eq!(month_tag(2026, 1), "January 2026");
    }

    #[test]
    fn custom_weekday_set_changes_defaults() {
        let weekends = WeekdaySet::new([Weekday::Sat, Weekday::Sun]);
        // 2025-09-20 is a Saturday.
        assert_eq!(default_flag(date(2025, 9, 20), &weekends), DayFlag::Available);
        assert_eq!(default_flag(date(2025, 9, 15), &weekends), DayFlag::Unavailable);
    }
}
