//! Attendance dates
//!
//! Attendance history is a set of calendar dates stored and exchanged as
//! `YYYY-MM-DD` strings. [`AttendanceDate`] keeps that wire form strict while
//! giving the rest of the code real date ordering.

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A calendar date in a student's attendance history
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttendanceDate(NaiveDate);

impl AttendanceDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Today in the server's local timezone
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// The date `days` days before this one
    pub fn days_before(&self, days: i64) -> Self {
        Self(self.0 - Duration::days(days))
    }
}

impl fmt::Display for AttendanceDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for AttendanceDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // chrono accepts "2024-1-5"; stored keys must be zero-padded
        if s.len() != 10 {
            return Err(Error::InvalidDate(format!("expected YYYY-MM-DD, got '{}'", s)));
        }
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Self)
            .map_err(|e| Error::InvalidDate(format!("'{}': {}", s, e)))
    }
}

impl TryFrom<String> for AttendanceDate {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AttendanceDate> for String {
    fn from(value: AttendanceDate) -> Self {
        value.to_string()
    }
}

impl From<NaiveDate> for AttendanceDate {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

/// Restrict a history to the closed interval `[start, end]`.
///
/// Order of the input is preserved. An inverted interval yields nothing.
pub fn filter_history<'a, I>(history: I, start: AttendanceDate, end: AttendanceDate) -> Vec<AttendanceDate>
where
    I: IntoIterator<Item = &'a AttendanceDate>,
{
    history
        .into_iter()
        .filter(|d| **d >= start && **d <= end)
        .copied()
        .collect()
}

/// Which dates attendance may be recorded for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatePolicy {
    /// Earliest markable date
    pub min_date: AttendanceDate,
    /// Whether dates after "today" are accepted
    pub allow_future_dates: bool,
}

impl DatePolicy {
    pub fn new(min_date: AttendanceDate, allow_future_dates: bool) -> Self {
        Self {
            min_date,
            allow_future_dates,
        }
    }

    /// Check `target` against the policy, with `today` supplied by the caller
    pub fn validate(&self, target: AttendanceDate, today: AttendanceDate) -> Result<()> {
        if target < self.min_date {
            return Err(Error::InvalidDate(format!(
                "{} is before the earliest permitted date {}",
                target, self.min_date
            )));
        }
        if !self.allow_future_dates && target > today {
            return Err(Error::InvalidDate(format!(
                "{} is in the future (today is {})",
                target, today
            )));
        }
        Ok(())
    }
}

impl Default for DatePolicy {
    fn default() -> Self {
        Self {
            min_date: AttendanceDate(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN)),
            allow_future_dates: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> AttendanceDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display_roundtrip() {
        let date = d("2024-01-05");
        assert_eq!(date.to_string(), "2024-01-05");
    }

    #[test]
    fn test_parse_rejects_unpadded_and_garbage() {
        assert!("2024-1-5".parse::<AttendanceDate>().is_err());
        assert!("2024-02-30".parse::<AttendanceDate>().is_err());
        assert!("yesterday".parse::<AttendanceDate>().is_err());
        assert!("".parse::<AttendanceDate>().is_err());
    }

    #[test]
    fn test_serde_uses_string_form() {
        let json = serde_json::to_string(&d("2024-03-09")).unwrap();
        assert_eq!(json, "\"2024-03-09\"");

        let back: AttendanceDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d("2024-03-09"));

        assert!(serde_json::from_str::<AttendanceDate>("\"03/09/2024\"").is_err());
    }

    #[test]
    fn test_filter_history_is_inclusive_and_keeps_order() {
        let history = vec![d("2024-01-10"), d("2024-01-01"), d("2024-01-05"), d("2024-01-03")];
        let filtered = filter_history(&history, d("2024-01-03"), d("2024-01-05"));
        assert_eq!(filtered, vec![d("2024-01-05"), d("2024-01-03")]);
    }

    #[test]
    fn test_filter_history_inverted_interval_is_empty() {
        let history = vec![d("2024-01-01"), d("2024-01-02")];
        assert!(filter_history(&history, d("2024-01-02"), d("2024-01-01")).is_empty());
    }

    #[test]
    fn test_days_before() {
        assert_eq!(d("2024-03-01").days_before(7), d("2024-02-23"));
    }

    #[test]
    fn test_policy_rejects_future_by_default() {
        let policy = DatePolicy::default();
        let today = d("2024-05-10");
        assert!(policy.validate(d("2024-05-10"), today).is_ok());
        assert!(policy.validate(d("2024-05-09"), today).is_ok());
        assert!(matches!(
            policy.validate(d("2024-05-11"), today),
            Err(Error::InvalidDate(_))
        ));
    }

    #[test]
    fn test_policy_allows_future_when_configured() {
        let policy = DatePolicy::new(d("2020-01-01"), true);
        assert!(policy.validate(d("2030-01-01"), d("2024-05-10")).is_ok());
    }

    #[test]
    fn test_policy_rejects_before_minimum() {
        let policy = DatePolicy::new(d("2024-01-01"), false);
        assert!(policy.validate(d("2023-12-31"), d("2024-05-10")).is_err());
        assert!(policy.validate(d("2024-01-01"), d("2024-05-10")).is_ok());
    }
}
