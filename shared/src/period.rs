//! Calendar-month period keys and rolling report windows
//!
//! Report periods are identified by `YYYY-MM` strings externally and by
//! [`MonthKey`] internally. SQL-style date ranges derived from a window are
//! always half-open `[month_start, next_month_start)` intervals.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

/// Error parsing a `YYYY-MM` month key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid month key: {0:?}")]
pub struct ParseMonthKeyError(pub String);

impl MonthKey {
    /// Create a month key; `month` must be 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following calendar month.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The preceding calendar month.
    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// First day of this month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap()
    }

    /// First day of the following month (exclusive end of this month's
    /// half-open date range).
    pub fn next_month_start(&self) -> NaiveDate {
        self.next().first_day()
    }

    /// Whether `date` falls inside this month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = ParseMonthKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMonthKeyError(s.to_string());
        let (y, m) = s.split_once('-').ok_or_else(err)?;
        if y.len() != 4 || m.len() != 2 {
            return Err(err());
        }
        let year: i32 = y.parse().map_err(|_| err())?;
        let month: u32 = m.parse().map_err(|_| err())?;
        MonthKey::new(year, month).ok_or_else(err)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Rolling window of `len` months ending at the month containing `today`,
/// in ascending chronological order.
pub fn rolling_window(today: NaiveDate, len: usize) -> Vec<MonthKey> {
    let mut months = Vec::with_capacity(len);
    let mut current = MonthKey::from_date(today);
    for _ in 0..len {
        months.push(current);
        current = current.prev();
    }
    months.reverse();
    months
}

/// Half-open `[start, end)` date range covering an ascending month window.
/// Returns `None` for an empty window.
pub fn window_date_range(months: &[MonthKey]) -> Option<(NaiveDate, NaiveDate)> {
    let first = months.first()?;
    let last = months.last()?;
    Some((first.first_day(), last.next_month_start()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_key_display_and_parse_round_trip() {
        let key = MonthKey::new(2024, 3).unwrap();
        assert_eq!(key.to_string(), "2024-03");
        assert_eq!("2024-03".parse::<MonthKey>().unwrap(), key);
    }

    #[test]
    fn month_key_rejects_bad_input() {
        assert!("2024-13".parse::<MonthKey>().is_err());
        assert!("2024-00".parse::<MonthKey>().is_err());
        assert!("2024-3".parse::<MonthKey>().is_err());
        assert!("202403".parse::<MonthKey>().is_err());
    }

    #[test]
    fn next_and_prev_wrap_at_year_boundary() {
        let dec = MonthKey::new(2023, 12).unwrap();
        assert_eq!(dec.next(), MonthKey::new(2024, 1).unwrap());
        assert_eq!(MonthKey::new(2024, 1).unwrap().prev(), dec);
    }

    #[test]
    fn rolling_window_is_thirteen_ascending_months() {
        let months = rolling_window(date(2024, 2, 15), 13);
        assert_eq!(months.len(), 13);
        assert_eq!(months[0], MonthKey::new(2023, 2).unwrap());
        assert_eq!(months[12], MonthKey::new(2024, 2).unwrap());
        assert!(months.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn window_date_range_is_half_open() {
        let months = rolling_window(date(2024, 2, 15), 13);
        let (start, end) = window_date_range(&months).unwrap();
        assert_eq!(start, date(2023, 2, 1));
        assert_eq!(end, date(2024, 3, 1));
    }

    #[test]
    fn contains_checks_year_and_month() {
        let key = MonthKey::new(2024, 2).unwrap();
        assert!(key.contains(date(2024, 2, 29)));
        assert!(!key.contains(date(2024, 3, 1)));
    }
}
