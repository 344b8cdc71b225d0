//! # quantlib
//!
//! Observable market data, lazily recalculated objects and piecewise curve
//! bootstrapping, in the style of [QuantLib](https://www.quantlib.org/).
//!
//! This crate is a **façade** that re-exports all public items from the
//! underlying workspace crates. Application code should depend on this
//! crate rather than the individual `ql-*` crates.
//!
//! ## Quick start
//!
//! ```toml
//! [dependencies]
//! quantlib = "0.1"
//! ```
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use quantlib::core::{Handle, LazyObject};
//! use quantlib::math::LogLinear;
//! use quantlib::quotes::{Quote, SimpleQuote};
//! use quantlib::termstructures::{
//!     BootstrapHelper, DepositRateHelper, Discount, PiecewiseYieldCurve, YieldTermStructure,
//! };
//! use quantlib::time::{Actual360, Actual365Fixed, Date, TimeUnit};
//!
//! let today = Date::from_ymd(2025, 1, 2)?;
//! let quote = SimpleQuote::shared(0.03);
//! let helper: Rc<dyn BootstrapHelper<dyn YieldTermStructure>> = Rc::new(
//!     DepositRateHelper::with_tenor(
//!         Handle::<dyn Quote>::new(quote.clone()),
//!         today,
//!         6,
//!         TimeUnit::Months,
//!         Actual360,
//!     )?,
//! );
//! let curve =
//!     PiecewiseYieldCurve::<Discount>::new(today, vec![helper], Actual365Fixed, LogLinear)?;
//!
//! let six_months = today.advance(6, TimeUnit::Months)?;
//! let df = curve.discount(six_months)?;
//! assert!((df - 1.0 / (1.0 + 0.03 * 181.0 / 360.0)).abs() < 1e-12);
//!
//! // a quote change marks the curve dirty; the next read re-bootstraps
//! quote.set_value(0.04)?;
//! assert!(!curve.is_calculated());
//! assert!(curve.discount(six_months)? < df);
//! # Ok::<(), quantlib::core::Error>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Core types, aliases, errors, observables, handles and lazy objects.
pub use ql_core as core;

/// Dates, day counters and the evaluation date.
pub use ql_time as time;

/// Comparison, interpolation and 1D solvers.
pub use ql_math as math;

/// Market quotes.
pub use ql_quotes as quotes;

/// Yield and default curves and the piecewise bootstrapper.
pub use ql_termstructures as termstructures;
