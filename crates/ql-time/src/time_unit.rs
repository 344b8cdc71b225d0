//! Tenor units for [`Date::advance`](crate::Date::advance).

use std::fmt;

/// The unit of a tenor such as `3M` or `5Y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeUnit {
    /// `D`, one calendar day.
    Days,
    /// `W`, seven calendar days.
    Weeks,
    /// `M`, rolled on the day of month.
    Months,
    /// `Y`, twelve months.
    Years,
}

impl fmt::Display for TimeUnit {
    /// The tenor suffix: `D`, `W`, `M` or `Y`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self {
            Self::Days => "D",
            Self::Weeks => "W",
            Self::Months => "M",
            Self::Years => "Y",
        };
        f.write_str(suffix)
    }
}
