//! Error types for the roster core.

/// Top-level error type for the scheduling system.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    /// User-supplied date string is not in a recognized shape.
    #[error("invalid date format: {0}")]
    InvalidFormat(String),

    /// Date string parsed but names a day that does not exist.
    #[error("invalid calendar date: {0}")]
    InvalidCalendarDate(String),

    /// User-supplied time-of-day string is not HH:MM.
    #[error("invalid time format: {0}")]
    InvalidTimeFormat(String),

    /// User-supplied timezone is not a known IANA zone.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Storage backend failure (read, write, append or sheet creation).
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RosterError {
    /// Wraps a storage transport error, keeping its text.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }

    /// Whether this error was caused by user input (as opposed to the
    /// backend or the host environment). Input errors carry a corrective
    /// hint and should be shown to the user verbatim.
    #[must_use]
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat(_)
                | Self::InvalidCalendarDate(_)
                | Self::InvalidTimeFormat(_)
                | Self::InvalidTimezone(_)
        )
    }

    /// Renders the error as a reply line, with a corrective hint for
    /// input errors and a generic line for everything else.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidFormat(input) => {
                format!("Could not read '{input}' as a date. Use d.m or d.m.yyyy, e.g. 7.9 or 07.09.2025.")
            }
            Self::InvalidCalendarDate(input) => {
                format!("'{input}' is not a real calendar date. Check the day and month.")
            }
            Self::InvalidTimeFormat(input) => {
                format!("Could not read '{input}' as a time. Use 24h HH:MM, e.g. 17:00.")
            }
            Self::InvalidTimezone(input) => {
                format!("Unknown timezone '{input}'. Use an IANA name, e.g. Europe/Berlin.")
            }
            other => format!("Something went wrong: {other}"),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, RosterError>;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn input_errors_are_flagged_as_user_input() {
        assert!(RosterError::InvalidFormat("x".to_owned()).is_user_input());
        assert!(RosterError::InvalidCalendarDate("31.02".to_owned()).is_user_input());
        assert!(RosterError::InvalidTimeFormat("25:99".to_owned()).is_user_input());
        assert!(RosterError::InvalidTimezone("Mars/Olympus".to_owned()).is_user_input());
        assert!(!RosterError::Backend("quota".to_owned()).is_user_input());
    }

    #[test]
    fn user_message_contains_a_hint_for_input_errors() {
        let msg = RosterError::InvalidFormat("2025-13-40".to_owned()).user_message();
        assert!(msg.contains("d.m.yyyy"));
        let msg = RosterError::InvalidTimezone("Nowhere".to_owned()).user_message();
        assert!(msg.contains("Europe/Berlin"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RosterError = io.into();
        assert!(matches!(err, RosterError::Io(_)));
    }
}
