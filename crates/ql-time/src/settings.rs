//! Evaluation-date context.
//!
//! [`Settings`] holds the **evaluation date** ("today") for one scenario or
//! run.  It is an explicit object shared through `Rc` rather than a process
//! singleton: create one per scenario, hand it to the curves and helpers that
//! depend on "today", and drop it when the scenario ends.
//!
//! `Settings` is observable; changing the evaluation date notifies every
//! registered object synchronously before the setter returns.

use crate::date::Date;
use ql_core::errors::Result;
use ql_core::patterns::observable::{Observable, ObservableImpl};
use std::cell::Cell;
use std::rc::Rc;

/// Scenario-wide settings: currently the evaluation date.
#[derive(Debug)]
pub struct Settings {
    evaluation_date: Cell<Date>,
    observable: ObservableImpl,
}

impl Settings {
    /// Create a settings context whose evaluation date is `evaluation_date`.
    pub fn new(evaluation_date: Date) -> Rc<Self> {
        Rc::new(Self {
            evaluation_date: Cell::new(evaluation_date),
            observable: ObservableImpl::new(),
        })
    }

    /// The current evaluation date.
    pub fn evaluation_date(&self) -> Date {
        self.evaluation_date.get()
    }

    /// Move the evaluation date and notify dependents if it changed.
    pub fn set_evaluation_date(&self, date: Date) -> Result<()> {
        if self.evaluation_date.replace(date) == date {
            return Ok(());
        }
        tracing::debug!(%date, "evaluation date changed");
        self.observable.notify()
    }
}

impl Observable for Settings {
    fn observable_impl(&self) -> &ObservableImpl {
        &self.observable
    }
}

/// Restores the evaluation date it found when dropped.
///
/// # Example
/// ```
/// use ql_time::{Date, ScopedEvaluationDate, Settings};
///
/// let settings = Settings::new(Date::from_ymd(2025, 1, 2).unwrap());
/// {
///     let _guard = ScopedEvaluationDate::new(&settings);
///     settings.set_evaluation_date(Date::from_ymd(2030, 1, 2).unwrap()).unwrap();
/// }
/// assert_eq!(settings.evaluation_date(), Date::from_ymd(2025, 1, 2).unwrap());
/// ```
#[derive(Debug)]
pub struct ScopedEvaluationDate {
    settings: Rc<Settings>,
    saved: Date,
}

impl ScopedEvaluationDate {
    /// Remember the current evaluation date of `settings`.
    pub fn new(settings: &Rc<Settings>) -> Self {
        Self {
            settings: Rc::clone(settings),
            saved: settings.evaluation_date(),
        }
    }
}

impl Drop for ScopedEvaluationDate {
    fn drop(&mut self) {
        if let Err(e) = self.settings.set_evaluation_date(self.saved) {
            tracing::warn!(error = %e, "observer failed while restoring the evaluation date");
        }
    }
}
