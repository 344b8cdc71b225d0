//! `FlatForward` — a yield term structure with a constant forward rate.
//!
//! This is the simplest possible yield curve: a single quoted rate that
//! applies for all maturities.  The curve observes its rate quote (through a
//! handle) and, if its reference date moves, the evaluation date.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::term_structure::{ReferenceDate, TermStructure};
use crate::yield_term_structure::YieldTermStructure;
use ql_core::errors::Result;
use ql_core::patterns::observable::{
    register_with, weak_observer, Observable, ObservableImpl, Observer,
};
use ql_core::{Compounding, DiscountFactor, Handle, Rate, Time};
use ql_quotes::{quote_value, Quote, SimpleQuote};
use ql_time::{Date, DayCounter};

/// A flat (constant) forward-rate yield term structure.
///
/// Discount factors are `1 / compound_factor(r, t)` for the quoted rate `r`
/// under the curve's compounding convention.
pub struct FlatForward {
    reference: ReferenceDate,
    forward: Handle<dyn Quote>,
    day_counter: Rc<dyn DayCounter>,
    compounding: Compounding,
    extrapolation: Cell<bool>,
    observable: ObservableImpl,
}

impl FlatForward {
    /// Create a flat-forward curve on a quoted rate.
    pub fn new(
        reference: impl Into<ReferenceDate>,
        forward: Handle<dyn Quote>,
        day_counter: impl DayCounter + 'static,
        compounding: Compounding,
    ) -> Rc<Self> {
        let curve = Rc::new(Self {
            reference: reference.into(),
            forward,
            day_counter: Rc::new(day_counter),
            compounding,
            extrapolation: Cell::new(false),
            observable: ObservableImpl::new(),
        });
        register_with(&curve, &curve.forward);
        curve.reference.register_observer(weak_observer(&curve));
        curve
    }

    /// Create a flat-forward curve on a fixed, continuously-compounded rate.
    pub fn continuous(
        reference: impl Into<ReferenceDate>,
        rate: Rate,
        day_counter: impl DayCounter + 'static,
    ) -> Rc<Self> {
        Self::new(
            reference,
            Handle::<dyn Quote>::new(SimpleQuote::shared(rate)),
            day_counter,
            Compounding::Continuous,
        )
    }

    /// The handle to the quoted rate.
    pub fn forward(&self) -> &Handle<dyn Quote> {
        &self.forward
    }
}

impl Observer for FlatForward {
    fn update(&self) -> Result<()> {
        self.notify_observers()
    }
}

impl Observable for FlatForward {
    fn observable_impl(&self) -> &ObservableImpl {
        &self.observable
    }
}

impl TermStructure for FlatForward {
    fn reference_date(&self) -> Result<Date> {
        self.reference.date()
    }

    fn day_counter(&self) -> &dyn DayCounter {
        self.day_counter.as_ref()
    }

    fn max_date(&self) -> Result<Date> {
        Ok(Date::MAX)
    }

    fn extrapolation(&self) -> &Cell<bool> {
        &self.extrapolation
    }
}

impl YieldTermStructure for FlatForward {
    fn discount_impl(&self, t: Time) -> Result<DiscountFactor> {
        let rate = quote_value(&self.forward)?;
        match self.compounding {
            Compounding::Continuous => Ok((-rate * t).exp()),
            compounding => Ok(1.0 / compounding.compound_factor(rate, t)?),
        }
    }
}

impl fmt::Debug for FlatForward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatForward")
            .field("reference", &self.reference)
            .field("forward", &self.forward)
            .field("day_counter", &self.day_counter.name())
            .field("compounding", &self.compounding)
            .finish()
    }
}
