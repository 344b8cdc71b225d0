//! Day-count conventions.
//!
//! Curves turn dates into times only through [`DayCounter::year_fraction`],
//! so any convention can be plugged in by implementing the trait.

use crate::date::Date;
use ql_core::{Real, Time};

/// Converts a pair of dates into a year fraction.
pub trait DayCounter: std::fmt::Debug {
    /// Conventional name, e.g. `Actual/360`.
    fn name(&self) -> &str;

    /// Days counted from `d1` to `d2`; actual calendar days unless overridden.
    fn day_count(&self, d1: Date, d2: Date) -> i64 {
        i64::from(d2 - d1)
    }

    /// Year fraction from `d1` to `d2`, negative when `d2` precedes `d1`.
    fn year_fraction(&self, d1: Date, d2: Date) -> Time;
}

macro_rules! actual_over_fixed_basis {
    ($(#[$doc:meta])* $name:ident, $label:literal, $basis:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl DayCounter for $name {
            fn name(&self) -> &str {
                $label
            }

            fn year_fraction(&self, d1: Date, d2: Date) -> Time {
                self.day_count(d1, d2) as Real / $basis
            }
        }
    };
}

actual_over_fixed_basis!(
    /// Actual days over a 365-day year; the usual convention for curve times.
    Actual365Fixed,
    "Actual/365 (Fixed)",
    365.0
);

actual_over_fixed_basis!(
    /// Actual days over a 360-day year, used by money-market deposits.
    Actual360,
    "Actual/360",
    360.0
);
