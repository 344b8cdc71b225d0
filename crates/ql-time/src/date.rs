//! Calendar dates for pillars and curve queries.
//!
//! A [`Date`] counts days from 1970-01-01 and converts to and from the
//! proleptic Gregorian calendar in constant time.  Supported years run from
//! 1900 to 2199.  There are no business-day rules: tenors roll on calendar
//! days and months.

use std::fmt;
use std::ops::Sub;

use crate::time_unit::TimeUnit;
use ql_core::errors::{Error, Result};

const FIRST_YEAR: i32 = 1900;
const LAST_YEAR: i32 = 2199;

/// A calendar date.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Date(i32);

impl Date {
    /// 1900-01-01.
    pub const MIN: Date = Date(-25_567);

    /// 2199-12-31; curves without a natural end report this as their
    /// maximum date.
    pub const MAX: Date = Date(84_005);

    /// The date `year-month-day`.
    ///
    /// # Errors
    /// [`Error::Date`] for a year outside 1900..=2199 or a day that does not
    /// exist in the given month.
    pub fn from_ymd(year: u16, month: u8, day: u8) -> Result<Self> {
        let year = i32::from(year);
        if !(FIRST_YEAR..=LAST_YEAR).contains(&year) {
            return Err(Error::Date(format!("year {year} outside {FIRST_YEAR}..={LAST_YEAR}")));
        }
        if !(1..=12).contains(&month) || day == 0 || day > month_length(year, month) {
            return Err(Error::Date(format!("no such date: {year}-{month:02}-{day:02}")));
        }
        Ok(Date(days_from_civil(year, month, day)))
    }

    /// Year, month and day of month.
    pub fn ymd(self) -> (u16, u8, u8) {
        let (y, m, d) = civil_from_days(self.0);
        (y as u16, m, d)
    }

    /// The date `n` calendar days later (earlier for negative `n`).
    pub fn add_days(self, n: i32) -> Result<Self> {
        let shifted = Date(self.0 + n);
        if shifted < Self::MIN || shifted > Self::MAX {
            return Err(Error::Date(format!("{self} moved by {n} days leaves the calendar")));
        }
        Ok(shifted)
    }

    /// The date `n` units later.  Month and year steps keep the day of month,
    /// falling back to the month's last day when it is shorter.
    pub fn advance(self, n: i32, unit: TimeUnit) -> Result<Self> {
        let months = match unit {
            TimeUnit::Days => return self.add_days(n),
            TimeUnit::Weeks => return self.add_days(7 * n),
            TimeUnit::Months => n,
            TimeUnit::Years => 12 * n,
        };
        let (y, m, d) = civil_from_days(self.0);
        let index = 12 * y + i32::from(m) - 1 + months;
        let year = index.div_euclid(12);
        if !(FIRST_YEAR..=LAST_YEAR).contains(&year) {
            return Err(Error::Date(format!("{self} moved by {n} {unit} leaves the calendar")));
        }
        let month = (index.rem_euclid(12) + 1) as u8;
        let day = d.min(month_length(year, month));
        Ok(Date(days_from_civil(year, month, day)))
    }
}

impl Sub for Date {
    type Output = i32;

    /// Calendar days from `rhs` to `self`.
    fn sub(self, rhs: Date) -> i32 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (y, m, d) = self.ymd();
        write!(f, "{y:04}-{m:02}-{d:02}")
    }
}

impl fmt::Debug for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Date({self})")
    }
}

fn is_leap(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn month_length(year: i32, month: u8) -> u8 {
    match month {
        2 if is_leap(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

// Gregorian day-number conversions counting years from March, so that the
// leap day falls at the end of each cycle.

fn days_from_civil(year: i32, month: u8, day: u8) -> i32 {
    let (month, day) = (i32::from(month), i32::from(day));
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let shifted = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * shifted + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i32) -> (i32, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + i32::from(month <= 2);
    (year, month, day)
}
