//! `TermStructure` — base trait for all term structures.
//!
//! Every term structure has a **reference date**, a **day counter**, and a
//! **maximum date** (the furthest point at which it can be queried without
//! extrapolation).  Term structures are observable: consumers register with
//! them (or with a `Handle` to them) to learn about changes.

use std::cell::Cell;
use std::rc::Rc;

use ql_core::errors::{Error, Result};
use ql_core::patterns::observable::{Observable, Observer};
use ql_core::Time;
use ql_math::close_enough;
use ql_time::{Date, DayCounter, Settings};

/// Base trait for all term structures.
pub trait TermStructure: Observable + std::fmt::Debug {
    /// The date at which discount = 1.0 and from which time is measured.
    fn reference_date(&self) -> Result<Date>;

    /// The day counter used for date → time-fraction conversions.
    fn day_counter(&self) -> &dyn DayCounter;

    /// The latest date for which the curve can be used without
    /// extrapolation.
    fn max_date(&self) -> Result<Date>;

    /// Storage for the extrapolation switch.
    fn extrapolation(&self) -> &Cell<bool>;

    /// The latest time for which the curve can be used.
    fn max_time(&self) -> Result<Time> {
        self.time_from_reference(self.max_date()?)
    }

    /// Convert a date to a year fraction relative to the reference date.
    fn time_from_reference(&self, date: Date) -> Result<Time> {
        Ok(self
            .day_counter()
            .year_fraction(self.reference_date()?, date))
    }

    /// Whether queries past [`max_date`](Self::max_date) are allowed.
    fn allows_extrapolation(&self) -> bool {
        self.extrapolation().get()
    }

    /// Allow queries past [`max_date`](Self::max_date).
    fn enable_extrapolation(&self) {
        self.extrapolation().set(true);
    }

    /// Forbid queries past [`max_date`](Self::max_date).
    fn disable_extrapolation(&self) {
        self.extrapolation().set(false);
    }

    /// Check that `t` can be queried.
    ///
    /// # Errors
    /// A precondition error for negative times, and
    /// [`Error::ExtrapolationNotAllowed`] past the maximum time unless
    /// `extrapolate` is set or extrapolation is enabled on the curve.
    fn check_range(&self, t: Time, extrapolate: bool) -> Result<()> {
        ql_core::ensure!(t >= 0.0, "negative time ({t}) given");
        if extrapolate || self.allows_extrapolation() {
            return Ok(());
        }
        let max_time = self.max_time()?;
        if t <= max_time || close_enough(t, max_time, 42) {
            Ok(())
        } else {
            Err(Error::ExtrapolationNotAllowed { time: t, max_time })
        }
    }
}

/// How a curve determines its reference date.
#[derive(Debug, Clone)]
pub enum ReferenceDate {
    /// A fixed date.
    Fixed(Date),
    /// The evaluation date of a [`Settings`] context moved forward by a number
    /// of calendar days; the curve follows the evaluation date.
    Moving {
        /// The evaluation-date context.
        settings: Rc<Settings>,
        /// Calendar days between the evaluation date and the reference date.
        settlement_days: i32,
    },
}

impl ReferenceDate {
    /// A reference date following `settings`.
    pub fn moving(settings: &Rc<Settings>, settlement_days: i32) -> Self {
        Self::Moving {
            settings: Rc::clone(settings),
            settlement_days,
        }
    }

    /// The current reference date.
    pub fn date(&self) -> Result<Date> {
        match self {
            Self::Fixed(date) => Ok(*date),
            Self::Moving {
                settings,
                settlement_days,
            } => settings.evaluation_date().add_days(*settlement_days),
        }
    }

    /// Register `observer` with the evaluation-date context, if any.
    pub fn register_observer(&self, observer: std::rc::Weak<dyn Observer>) {
        if let Self::Moving { settings, .. } = self {
            settings.register_observer(observer);
        }
    }
}

impl From<Date> for ReferenceDate {
    fn from(date: Date) -> Self {
        Self::Fixed(date)
    }
}
