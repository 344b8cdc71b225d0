//! # ql-time
//!
//! Dates, day-count conventions, and the observable evaluation-date context.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// `Date` type.
pub mod date;

/// `DayCounter` trait and built-in day-count conventions.
pub mod day_counter;

/// Evaluation-date context (`Settings`).
pub mod settings;

/// `TimeUnit` — days, weeks, months, years.
pub mod time_unit;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use date::Date;
pub use day_counter::{Actual360, Actual365Fixed, DayCounter};
pub use settings::{ScopedEvaluationDate, Settings};
pub use time_unit::TimeUnit;
