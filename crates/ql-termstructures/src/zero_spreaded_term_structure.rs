//! `PiecewiseZeroSpreadedTermStructure` — a yield curve shifted by a
//! piecewise spread on its zero rates.
//!
//! The continuously-compounded zero rate of the result is the base curve's
//! zero rate plus a spread interpolated between quoted spreads at given
//! dates.  The spread is flat before the first and after the last date; a
//! single quote gives a constant spread.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::term_structure::TermStructure;
use crate::yield_term_structure::YieldTermStructure;
use ql_core::errors::{Error, Result};
use ql_core::patterns::lazy_object::{LazyObject, LazyState};
use ql_core::patterns::observable::{register_with, Observable, ObservableImpl, Observer};
use ql_core::{Compounding, DiscountFactor, Handle, Real, Spread, Time};
use ql_math::{Interpolation1D, Interpolator, Linear};
use ql_quotes::{quote_value, Quote};
use ql_time::{Date, DayCounter};

/// Spread values at their times, as of the last calculation.
#[derive(Debug)]
struct SpreadNodes {
    times: Vec<Time>,
    values: Vec<Spread>,
    interpolation: Box<dyn Interpolation1D>,
}

impl SpreadNodes {
    fn value(&self, t: Time) -> Spread {
        let n = self.values.len();
        if n == 1 || t <= self.times[0] {
            self.values[0]
        } else if t >= self.times[n - 1] {
            self.values[n - 1]
        } else {
            self.interpolation.value(t)
        }
    }
}

/// Base yield curve plus interpolated zero-rate spreads.
pub struct PiecewiseZeroSpreadedTermStructure {
    base: Handle<dyn YieldTermStructure>,
    spreads: Vec<Handle<dyn Quote>>,
    dates: Vec<Date>,
    day_counter: Rc<dyn DayCounter>,
    interpolator: Box<dyn Interpolator>,
    nodes: RefCell<Option<SpreadNodes>>,
    lazy: LazyState,
    extrapolation: Cell<bool>,
}

impl PiecewiseZeroSpreadedTermStructure {
    /// Spread `base` by `spreads` quoted at `dates`, interpolated linearly.
    pub fn new(
        base: Handle<dyn YieldTermStructure>,
        spreads: Vec<Handle<dyn Quote>>,
        dates: Vec<Date>,
        day_counter: impl DayCounter + 'static,
    ) -> Result<Rc<Self>> {
        Self::with_interpolator(base, spreads, dates, day_counter, Linear)
    }

    /// As [`new`](Self::new), with another interpolation between spreads.
    ///
    /// # Errors
    /// A precondition error unless there is one date per spread, and
    /// [`Error::InvalidNodeOrdering`] unless the dates strictly increase.
    pub fn with_interpolator(
        base: Handle<dyn YieldTermStructure>,
        spreads: Vec<Handle<dyn Quote>>,
        dates: Vec<Date>,
        day_counter: impl DayCounter + 'static,
        interpolator: impl Interpolator + 'static,
    ) -> Result<Rc<Self>> {
        ql_core::ensure!(!spreads.is_empty(), "no spreads given");
        ql_core::ensure!(
            spreads.len() == dates.len(),
            "{} spreads for {} dates",
            spreads.len(),
            dates.len()
        );
        if let Some(i) = (1..dates.len()).find(|&i| dates[i] <= dates[i - 1]) {
            return Err(Error::InvalidNodeOrdering {
                index: i,
                previous: dates[i - 1].to_string(),
                current: dates[i].to_string(),
            });
        }

        let curve = Rc::new(Self {
            base,
            spreads,
            dates,
            day_counter: Rc::new(day_counter),
            interpolator: Box::new(interpolator),
            nodes: RefCell::new(None),
            lazy: LazyState::new(),
            extrapolation: Cell::new(false),
        });
        register_with(&curve, &curve.base);
        for spread in &curve.spreads {
            register_with(&curve, spread);
        }
        Ok(curve)
    }

    /// The spread dates.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// The spread at time `t`.
    pub fn spread(&self, t: Time) -> Result<Spread> {
        self.calculate()?;
        match self.nodes.borrow().as_ref() {
            Some(nodes) => Ok(nodes.value(t)),
            None => ql_core::fail!("spreads have not been calculated"),
        }
    }
}

impl LazyObject for PiecewiseZeroSpreadedTermStructure {
    fn lazy_state(&self) -> &LazyState {
        &self.lazy
    }

    fn perform_calculations(&self) -> Result<()> {
        let reference_date = self.reference_date()?;
        let times: Vec<Time> = self
            .dates
            .iter()
            .map(|&d| self.day_counter.year_fraction(reference_date, d))
            .collect();
        let values = self
            .spreads
            .iter()
            .map(quote_value)
            .collect::<Result<Vec<Real>>>()?;
        let mut interpolation = self.interpolator.interpolation();
        if values.len() >= self.interpolator.required_points() {
            interpolation.update(&times, &values)?;
        }
        *self.nodes.borrow_mut() = Some(SpreadNodes {
            times,
            values,
            interpolation,
        });
        Ok(())
    }
}

impl Observer for PiecewiseZeroSpreadedTermStructure {
    fn update(&self) -> Result<()> {
        self.invalidate()
    }
}

impl Observable for PiecewiseZeroSpreadedTermStructure {
    fn observable_impl(&self) -> &ObservableImpl {
        self.lazy.observable()
    }
}

impl TermStructure for PiecewiseZeroSpreadedTermStructure {
    fn reference_date(&self) -> Result<Date> {
        self.base.current_link()?.reference_date()
    }

    fn day_counter(&self) -> &dyn DayCounter {
        self.day_counter.as_ref()
    }

    fn max_date(&self) -> Result<Date> {
        let base_max = self.base.current_link()?.max_date()?;
        Ok(base_max.min(self.dates[self.dates.len() - 1]))
    }

    fn extrapolation(&self) -> &Cell<bool> {
        &self.extrapolation
    }
}

impl YieldTermStructure for PiecewiseZeroSpreadedTermStructure {
    fn discount_impl(&self, t: Time) -> Result<DiscountFactor> {
        let spread = self.spread(t)?;
        let base = self.base.current_link()?;
        let zero = base.zero_rate_time(t, Compounding::Continuous, true)?;
        Ok((-(zero + spread) * t).exp())
    }
}

impl fmt::Debug for PiecewiseZeroSpreadedTermStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PiecewiseZeroSpreadedTermStructure")
            .field("base", &self.base)
            .field("dates", &self.dates)
            .field("interpolator", &self.interpolator)
            .field("status", &self.lazy)
            .finish()
    }
}
