//! Calendar dates and the Act/365 year fraction used for option expiries.
//!
//! ```
//! use pricer_core::types::time::{year_fraction, Date};
//!
//! let valuation = Date::from_ymd(2024, 1, 1).unwrap();
//! let expiry = Date::from_ymd(2024, 7, 1).unwrap();
//! assert!((year_fraction(valuation, expiry) - 182.0 / 365.0).abs() < 1e-12);
//! ```

use chrono::{Datelike, Duration, Local, NaiveDate};
use std::fmt;
use std::ops::Sub;
use std::str::FromStr;

use super::error::DateError;

/// Days per year in the Act/365 convention.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Type-safe date wrapper around `chrono::NaiveDate`.
///
/// Serialises as an ISO 8601 string.
///
/// # Examples
///
/// ```
/// use pricer_core::types::time::Date;
///
/// let date = Date::from_ymd(2024, 6, 15).unwrap();
/// let parsed: Date = "2024-06-15".parse().unwrap();
/// assert_eq!(date, parsed);
///
/// let start = Date::from_ymd(2024, 1, 1).unwrap();
/// let end = Date::from_ymd(2024, 1, 11).unwrap();
/// assert_eq!(end - start, 10);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Date(NaiveDate);

impl Date {
    /// Creates a Date from year, month, and day components.
    ///
    /// Returns `Err(DateError::InvalidDate)` when the components do not
    /// form a calendar date.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, DateError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Date)
            .ok_or(DateError::InvalidDate { year, month, day })
    }

    /// Returns today's date based on local system time.
    pub fn today() -> Self {
        Date(Local::now().date_naive())
    }

    /// Parses a date from `YYYY-MM-DD`.
    pub fn parse(s: &str) -> Result<Self, DateError> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Date)
            .map_err(|e| DateError::ParseError(e.to_string()))
    }

    /// Returns the underlying `NaiveDate`.
    #[inline]
    pub fn into_inner(self) -> NaiveDate {
        self.0
    }

    /// Year component.
    #[inline]
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Month component (1-12).
    #[inline]
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Day-of-month component.
    #[inline]
    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Signed number of calendar days from `earlier` to `self`.
    ///
    /// ```
    /// use pricer_core::types::Date;
    ///
    /// let a = Date::from_ymd(2024, 3, 1).unwrap();
    /// let b = Date::from_ymd(2024, 2, 1).unwrap();
    /// assert_eq!(a.days_since(b), 29);
    /// assert_eq!(b.days_since(a), -29);
    /// ```
    #[inline]
    pub fn days_since(&self, earlier: Date) -> i64 {
        (self.0 - earlier.0).num_days()
    }

    /// Date shifted by a signed number of days.
    ///
    /// Saturates at the input date if the shift leaves chrono's range.
    pub fn add_days(&self, days: i64) -> Date {
        self.0
            .checked_add_signed(Duration::days(days))
            .map(Date)
            .unwrap_or(*self)
    }
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        Date(date)
    }
}

impl Sub for Date {
    type Output = i64;

    /// Number of days between two dates.
    fn sub(self, rhs: Self) -> Self::Output {
        self.days_since(rhs)
    }
}

impl FromStr for Date {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Date::parse(s)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Act/365 year fraction from `start` to `end`.
///
/// Negative when `end` precedes `start`; callers treat non-positive
/// fractions as expired.
#[inline]
pub fn year_fraction(start: Date, end: Date) -> f64 {
    end.days_since(start) as f64 / DAYS_PER_YEAR
}
