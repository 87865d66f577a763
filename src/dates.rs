//! Date and time-of-day normalization for user input.
//!
//! Users type dates as `d.m` or `d.m.yyyy` with `.`, `/` or `-` as
//! separators; the schedule sheet stores them canonically as
//! `dd.mm.yyyy`. Parsing never rolls an overflowing day into the next
//! month: `31.04` is rejected, not turned into the 1st of May.

use chrono::NaiveDate;

use crate::error::{Result, RosterError};

/// Canonical cell form of a date: zero-padded `dd.mm.yyyy`.
#[must_use]
pub fn canonical(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Strict parse of a canonical `dd.mm.yyyy` cell value.
///
/// Returns `None` for anything else; stored cells that fail this parse
/// are treated as absent rather than as errors.
#[must_use]
pub fn parse_canonical(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d.%m.%Y").ok()
}

/// Full weekday name for a date, as written in the weekday column.
#[must_use]
pub fn weekday_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// Parses a user-supplied date.
///
/// Accepts `d.m` and `d.m.yyyy` (optionally zero-padded) with `.`, `/`
/// or `-` separators. A missing year defaults to the anchor's year.
///
/// # Errors
///
/// Returns [`RosterError::InvalidFormat`] when the input does not split
/// into two or three numeric components, and
/// [`RosterError::InvalidCalendarDate`] when the components name a day
/// that does not exist (e.g. `31.02.2025`).
pub fn parse_user_date(raw: &str, anchor: NaiveDate) -> Result<NaiveDate> {
    let cleaned = raw.trim().replace(['/', '-'], ".");
    let parts: Vec<&str> = cleaned.split('.').filter(|p| !p.is_empty()).collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Err(RosterError::InvalidFormat(raw.to_owned()));
    }

    let day: u32 = parts[0]
        .trim()
        .parse()
        .map_err(|_| RosterError::InvalidFormat(raw.to_owned()))?;
    let month: u32 = parts[1]
        .trim()
        .parse()
        .map_err(|_| RosterError::InvalidFormat(raw.to_owned()))?;
    let year: i32 = match parts.get(2) {
        Some(y) => y
            .trim()
            .parse()
            .map_err(|_| RosterError::InvalidFormat(raw.to_owned()))?,
        None => chrono::Datelike::year(&anchor),
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| RosterError::InvalidCalendarDate(raw.to_owned()))
}

/// Parses a user-supplied `HH:MM` into its hour and minute.
///
/// # Errors
///
/// Returns [`RosterError::InvalidTimeFormat`] unless the input is two
/// `:`-separated numbers within 00:00..=23:59.
pub fn parse_hhmm_pair(raw: &str) -> Result<(u32, u32)> {
    let trimmed = raw.trim();
    let mut it = trimmed.split(':');
    let (Some(h), Some(m), None) = (it.next(), it.next(), it.next()) else {
        return Err(RosterError::InvalidTimeFormat(raw.to_owned()));
    };
    let hour: u32 = h
        .trim()
        .parse()
        .map_err(|_| RosterError::InvalidTimeFormat(raw.to_owned()))?;
    let minute: u32 = m
        .trim()
        .parse()
        .map_err(|_| RosterError::InvalidTimeFormat(raw.to_owned()))?;
    if hour > 23 || minute > 59 {
        return Err(RosterError::InvalidTimeFormat(raw.to_owned()));
    }
    Ok((hour, minute))
}

/// Validates a user-supplied `HH:MM` and returns it zero-padded.
///
/// # Errors
///
/// Same as [`parse_hhmm_pair`].
pub fn parse_hhmm(raw: &str) -> Result<String> {
    let (hour, minute) = parse_hhmm_pair(raw)?;
    Ok(format!("{hour:02}:{minute:02}"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()
    }

    #[test]
    fn short_form_defaults_to_anchor_year() {
        let parsed = parse_user_date("7/9", anchor()).unwrap();
        assert_eq!(canonical(parsed), "07.09.2025");
    }

    #[test]
    fn all_separators_are_equivalent() {
        let dot = parse_user_date("7.9.2025", anchor()).unwrap();
        let slash = parse_user_date("7/9/2025", anchor()).unwrap();
        let dash = parse_user_date("7-9-2025", anchor()).unwrap();
        assert_eq!(dot, slash);
        assert_eq!(dot, dash);
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["7.9", "07.09.2025", "1/1/2026", "31-12"] {
            let once = canonical(parse_user_date(raw, anchor()).unwrap());
            let twice = canonical(parse_user_date(&once, anchor()).unwrap());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn nonexistent_days_are_rejected_not_rolled_over() {
        assert!(matches!(
            parse_user_date("31.02.2025", anchor()),
            Err(RosterError::InvalidCalendarDate(_))
        ));
        assert!(matches!(
            parse_user_date("31.04", anchor()),
            Err(RosterError::InvalidCalendarDate(_))
        ));
    }

    #[test]
    fn leap_day_is_valid_only_in_leap_years() {
        assert!(parse_user_date("29.02.2024", anchor()).is_ok());
        assert!(parse_user_date("29.02.2025", anchor()).is_err());
    }

    #[test]
    fn wrong_shapes_are_format_errors() {
        for raw in ["", "7", "7.9.2025.1", "a.b", "7,9", "7.x"] {
            assert!(
                matches!(
                    parse_user_date(raw, anchor()),
                    Err(RosterError::InvalidFormat(_))
                ),
                "expected format error for {raw:?}"
            );
        }
    }

    #[test]
    fn doubled_separators_collapse() {
        // Empty components are dropped, matching the lenient split.
        let parsed = parse_user_date("7..9", anchor()).unwrap();
        assert_eq!(canonical(parsed), "07.09.2025");
    }

    #[test]
    fn canonical_round_trips_through_strict_parse() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 3).unwrap();
        assert_eq!(parse_canonical(&canonical(date)), Some(date));
        assert_eq!(parse_canonical("not a date"), None);
        assert_eq!(parse_canonical(""), None);
    }

    #[test]
    fn weekday_names_are_full_english() {
        let monday = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        assert_eq!(weekday_name(monday), "Monday");
    }

    #[test]
    fn hhmm_zero_pads() {
        assert_eq!(parse_hhmm("7:5").unwrap(), "07:05");
        assert_eq!(parse_hhmm(" 17:00 ").unwrap(), "17:00");
        assert_eq!(parse_hhmm("0:0").unwrap(), "00:00");
        assert_eq!(parse_hhmm("23:59").unwrap(), "23:59");
    }

    #[test]
    fn hhmm_rejects_out_of_range_and_wrong_shape() {
        for raw in ["24:00", "12:60", "17", "17:00:00", "ab:cd", ""] {
            assert!(
                matches!(parse_hhmm(raw), Err(RosterError::InvalidTimeFormat(_))),
                "expected time error for {raw:?}"
            );
        }
    }
}
