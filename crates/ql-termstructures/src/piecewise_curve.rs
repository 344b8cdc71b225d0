//! `PiecewiseCurve` — a term structure bootstrapped from market helpers.
//!
//! The curve is a [`LazyObject`]: it observes every helper's quote (and the
//! evaluation date, when its reference date moves) and re-bootstraps on the
//! first query after a change.  A bootstrap runs on a scratch node curve
//! which replaces the committed nodes only when every pillar converged, so a
//! failed recalculation never leaves a half-built curve behind.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use ql_core::Handle;
//! use ql_math::LogLinear;
//! use ql_quotes::{Quote, SimpleQuote};
//! use ql_termstructures::{
//!     BootstrapHelper, DepositRateHelper, Discount, PiecewiseCurve, YieldTermStructure,
//! };
//! use ql_time::{Actual360, Actual365Fixed, Date, TimeUnit};
//!
//! let today = Date::from_ymd(2025, 1, 2).unwrap();
//! let helpers: Vec<Rc<dyn BootstrapHelper<dyn YieldTermStructure>>> = [3, 6]
//!     .into_iter()
//!     .map(|months| {
//!         let quote = Handle::<dyn Quote>::new(SimpleQuote::shared(0.04));
//!         let helper =
//!             DepositRateHelper::with_tenor(quote, today, months, TimeUnit::Months, Actual360)
//!                 .unwrap();
//!         Rc::new(helper) as Rc<dyn BootstrapHelper<dyn YieldTermStructure>>
//!     })
//!     .collect();
//! let curve = PiecewiseCurve::<Discount>::new(today, helpers, Actual365Fixed, LogLinear).unwrap();
//! let six_months = today.advance(6, TimeUnit::Months).unwrap();
//! assert!(curve.discount(six_months).unwrap() < 1.0);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::bootstrap::{bootstrap, BootstrapConfig};
use crate::bootstrap_helper::BootstrapHelper;
use crate::bootstrap_traits::{CurveTraits, Discount, HazardRate, NodeCurve};
use crate::default_probability_term_structure::DefaultProbabilityTermStructure;
use crate::term_structure::{ReferenceDate, TermStructure};
use crate::yield_term_structure::YieldTermStructure;
use ql_core::errors::{Error, Result};
use ql_core::patterns::lazy_object::{LazyObject, LazyState};
use ql_core::patterns::observable::{
    register_with, weak_observer, Observable, ObservableImpl, Observer,
};
use ql_core::{DiscountFactor, Probability, Real, Time};
use ql_math::Interpolator;
use ql_time::{Date, DayCounter};

/// A piecewise yield curve.
pub type PiecewiseYieldCurve<T = Discount> = PiecewiseCurve<T>;

/// A piecewise default-probability curve.
pub type PiecewiseDefaultCurve<T = HazardRate> = PiecewiseCurve<T>;

/// A curve whose nodes are solved so that each helper reprices its quote.
///
/// `T` selects what is stored at the nodes (see
/// [`bootstrap_traits`](crate::bootstrap_traits)) and therefore which term
/// structure interface the curve implements.
pub struct PiecewiseCurve<T: CurveTraits> {
    reference: ReferenceDate,
    day_counter: Rc<dyn DayCounter>,
    helpers: Vec<Rc<dyn BootstrapHelper<T::Curve>>>,
    interpolator: Box<dyn Interpolator>,
    config: BootstrapConfig,
    nodes: RefCell<Option<NodeCurve<T>>>,
    lazy: LazyState,
    extrapolation: Cell<bool>,
}

impl<T: CurveTraits> PiecewiseCurve<T> {
    /// Create a curve with the default bootstrap configuration.
    ///
    /// # Errors
    /// A precondition error without helpers, and
    /// [`Error::InvalidNodeOrdering`] unless the helpers' pillar dates are
    /// strictly increasing.
    pub fn new(
        reference: impl Into<ReferenceDate>,
        helpers: Vec<Rc<dyn BootstrapHelper<T::Curve>>>,
        day_counter: impl DayCounter + 'static,
        interpolator: impl Interpolator + 'static,
    ) -> Result<Rc<Self>> {
        Self::with_config(
            reference,
            helpers,
            day_counter,
            interpolator,
            BootstrapConfig::default(),
        )
    }

    /// Create a curve with an explicit bootstrap configuration.
    pub fn with_config(
        reference: impl Into<ReferenceDate>,
        helpers: Vec<Rc<dyn BootstrapHelper<T::Curve>>>,
        day_counter: impl DayCounter + 'static,
        interpolator: impl Interpolator + 'static,
        config: BootstrapConfig,
    ) -> Result<Rc<Self>> {
        ql_core::ensure!(!helpers.is_empty(), "no bootstrap helpers given");
        for i in 1..helpers.len() {
            let previous = helpers[i - 1].pillar_date();
            let current = helpers[i].pillar_date();
            if current <= previous {
                return Err(Error::InvalidNodeOrdering {
                    index: i,
                    previous: previous.to_string(),
                    current: current.to_string(),
                });
            }
        }

        let curve = Rc::new(Self {
            reference: reference.into(),
            day_counter: Rc::new(day_counter),
            helpers,
            interpolator: Box::new(interpolator),
            config,
            nodes: RefCell::new(None),
            lazy: LazyState::new(),
            extrapolation: Cell::new(false),
        });
        for helper in &curve.helpers {
            for observable in helper.observables() {
                register_with(&curve, observable);
            }
        }
        curve.reference.register_observer(weak_observer(&curve));
        Ok(curve)
    }

    /// The helpers, in pillar order.
    pub fn helpers(&self) -> &[Rc<dyn BootstrapHelper<T::Curve>>] {
        &self.helpers
    }

    /// The bootstrap configuration.
    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Run `f` on the bootstrapped nodes, bootstrapping first if needed.
    fn with_nodes<R>(&self, f: impl FnOnce(&NodeCurve<T>) -> R) -> Result<R> {
        self.calculate()?;
        match self.nodes.borrow().as_ref() {
            Some(nodes) => Ok(f(nodes)),
            None => ql_core::fail!("curve has not been bootstrapped"),
        }
    }

    /// Node dates, reference date first.
    pub fn dates(&self) -> Result<Vec<Date>> {
        self.with_nodes(|n| n.dates().to_vec())
    }

    /// Node times.
    pub fn times(&self) -> Result<Vec<Time>> {
        self.with_nodes(|n| n.times().to_vec())
    }

    /// Node values.
    pub fn data(&self) -> Result<Vec<Real>> {
        self.with_nodes(|n| n.data().to_vec())
    }

    /// `(date, value)` pairs.
    pub fn nodes(&self) -> Result<Vec<(Date, Real)>> {
        self.with_nodes(|n| n.dates().iter().copied().zip(n.data().iter().copied()).collect())
    }

    fn node_value(&self, t: Time) -> Result<Real> {
        self.with_nodes(|n| T::curve_value(n, t))?
    }
}

impl<T: CurveTraits> LazyObject for PiecewiseCurve<T> {
    fn lazy_state(&self) -> &LazyState {
        &self.lazy
    }

    fn perform_calculations(&self) -> Result<()> {
        let reference_date = self.reference.date()?;
        let dates = std::iter::once(reference_date)
            .chain(self.helpers.iter().map(|h| h.pillar_date()))
            .collect();
        let mut scratch =
            NodeCurve::<T>::new(Rc::clone(&self.day_counter), dates, self.interpolator.as_ref())?;
        bootstrap(&mut scratch, &self.helpers, &self.config)?;
        *self.nodes.borrow_mut() = Some(scratch);
        Ok(())
    }
}

impl<T: CurveTraits> Observer for PiecewiseCurve<T> {
    fn update(&self) -> Result<()> {
        self.invalidate()
    }
}

impl<T: CurveTraits> Observable for PiecewiseCurve<T> {
    fn observable_impl(&self) -> &ObservableImpl {
        self.lazy.observable()
    }
}

impl<T: CurveTraits> TermStructure for PiecewiseCurve<T> {
    fn reference_date(&self) -> Result<Date> {
        self.reference.date()
    }

    fn day_counter(&self) -> &dyn DayCounter {
        self.day_counter.as_ref()
    }

    fn max_date(&self) -> Result<Date> {
        self.with_nodes(|n| n.dates()[n.dates().len() - 1])
    }

    fn extrapolation(&self) -> &Cell<bool> {
        &self.extrapolation
    }
}

impl<T> YieldTermStructure for PiecewiseCurve<T>
where
    T: CurveTraits<Curve = dyn YieldTermStructure>,
{
    fn discount_impl(&self, t: Time) -> Result<DiscountFactor> {
        self.node_value(t)
    }
}

impl<T> DefaultProbabilityTermStructure for PiecewiseCurve<T>
where
    T: CurveTraits<Curve = dyn DefaultProbabilityTermStructure>,
{
    fn survival_probability_impl(&self, t: Time) -> Result<Probability> {
        self.node_value(t)
    }
}

impl<T: CurveTraits> fmt::Debug for PiecewiseCurve<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PiecewiseCurve")
            .field("traits", &std::any::type_name::<T>())
            .field("reference", &self.reference)
            .field("helpers", &self.helpers)
            .field("interpolator", &self.interpolator)
            .field("status", &self.lazy_state())
            .finish()
    }
}
