//! Bootstrap traits: what a piecewise curve stores at its nodes and how the
//! bootstrapper seeds and brackets each node.
//!
//! | Traits | Node value | Curve kind |
//! |--------|------------|------------|
//! | [`Discount`] | discount factor | yield |
//! | [`ZeroYield`] | continuous zero rate | yield |
//! | [`ForwardRate`] | instantaneous forward rate | yield |
//! | [`HazardRate`] | hazard rate | default probability |
//! | [`SurvivalProbability`] | survival probability | default probability |
//!
//! Node 0 always sits on the reference date.  For rate-like traits its value
//! is not solved for but tied to node 1.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::default_probability_term_structure::DefaultProbabilityTermStructure;
use crate::term_structure::TermStructure;
use crate::yield_term_structure::YieldTermStructure;
use ql_core::errors::{Error, Result};
use ql_core::patterns::observable::{Observable, ObservableImpl};
use ql_core::{DiscountFactor, Probability, Real, Time};
use ql_math::{Interpolation1D, Interpolator};
use ql_time::{Date, DayCounter};

/// Average rate used to seed the first yield node.
const AVG_RATE: Real = 0.05;

/// Largest rate magnitude the yield brackets allow.
const MAX_RATE: Real = 1.0;

/// Average hazard rate used to seed the first default node.
const AVG_HAZARD_RATE: Real = 0.01;

/// Largest hazard rate the default brackets allow.
const MAX_HAZARD_RATE: Real = 1.0;

/// Node semantics for a piecewise curve.
pub trait CurveTraits: Sized + fmt::Debug + 'static {
    /// The term-structure interface helpers price against.
    type Curve: ?Sized;

    /// Value stored at node 0 before bootstrapping.
    fn initial_value() -> Real;

    /// Starting point for node `i` (`i >= 1`); nodes `0..i` are solved.
    fn guess(i: usize, curve: &NodeCurve<Self>) -> Real;

    /// Lower end of the search interval for node `i`.
    fn min_value_after(i: usize, curve: &NodeCurve<Self>) -> Real;

    /// Upper end of the search interval for node `i`.
    fn max_value_after(i: usize, curve: &NodeCurve<Self>) -> Real;

    /// Store the trial value `value` at node `i`.
    fn update_guess(data: &mut [Real], value: Real, i: usize) {
        data[i] = value;
    }

    /// View the node curve through the interface helpers use.
    fn as_curve(curve: &NodeCurve<Self>) -> &Self::Curve;

    /// Discount factor or survival probability at time `t`.
    fn curve_value(curve: &NodeCurve<Self>, t: Time) -> Result<Real>;
}

// ── NodeCurve ────────────────────────────────────────────────────────────────

/// An interpolated curve over `(date, value)` nodes.
///
/// Only the first `active` nodes take part in the interpolation; the
/// bootstrapper grows the active range one pillar at a time.
pub struct NodeCurve<T: CurveTraits> {
    reference_date: Date,
    day_counter: Rc<dyn DayCounter>,
    dates: Vec<Date>,
    times: Vec<Time>,
    data: Vec<Real>,
    interpolation: Box<dyn Interpolation1D>,
    active: usize,
    extrapolation: Cell<bool>,
    observable: ObservableImpl,
    traits: PhantomData<T>,
}

impl<T: CurveTraits> NodeCurve<T> {
    /// A curve over `dates` (the first being the reference date) with every
    /// node set to the initial value.
    ///
    /// # Errors
    /// [`Error::InvalidNodeOrdering`] unless dates and times are strictly
    /// increasing.
    pub fn new(
        day_counter: Rc<dyn DayCounter>,
        dates: Vec<Date>,
        interpolator: &dyn Interpolator,
    ) -> Result<Self> {
        ql_core::ensure!(dates.len() >= 2, "at least one pillar after the reference date required");
        let reference_date = dates[0];
        let times: Vec<Time> = dates
            .iter()
            .map(|&d| day_counter.year_fraction(reference_date, d))
            .collect();
        for i in 1..dates.len() {
            if dates[i] <= dates[i - 1] || times[i] <= times[i - 1] {
                return Err(Error::InvalidNodeOrdering {
                    index: i,
                    previous: dates[i - 1].to_string(),
                    current: dates[i].to_string(),
                });
            }
        }
        let data = vec![T::initial_value(); dates.len()];
        Ok(Self {
            reference_date,
            day_counter,
            dates,
            times,
            data,
            interpolation: interpolator.interpolation(),
            active: 0,
            extrapolation: Cell::new(true),
            observable: ObservableImpl::new(),
            traits: PhantomData,
        })
    }

    /// Node dates, reference date first.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Node times.
    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// Node values.
    pub fn data(&self) -> &[Real] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [Real] {
        &mut self.data
    }

    /// Rebuild the interpolation over the first `count` nodes.
    pub(crate) fn activate(&mut self, count: usize) -> Result<()> {
        self.interpolation
            .update(&self.times[..count], &self.data[..count])?;
        self.active = count;
        Ok(())
    }

    /// Active `(times, data)` slices; at least two nodes.
    fn active_nodes(&self) -> Result<(&[Time], &[Real])> {
        ql_core::ensure!(self.active >= 2, "curve has no active segment");
        Ok((&self.times[..self.active], &self.data[..self.active]))
    }

    /// `exp(-∫ y)` with the node values read as rates, flat past the last
    /// node.
    fn integrated_rate(&self, t: Time) -> Result<Real> {
        let (times, data) = self.active_nodes()?;
        let n = times.len();
        let integral = if t <= times[n - 1] {
            self.interpolation.primitive(t)
        } else {
            self.interpolation.primitive(times[n - 1]) + data[n - 1] * (t - times[n - 1])
        };
        Ok((-integral).exp())
    }

    /// The node values read as discount-like factors, flat log-forward past
    /// the last node.
    fn interpolated_factor(&self, t: Time) -> Result<Real> {
        let (times, data) = self.active_nodes()?;
        let n = times.len();
        if t <= times[n - 1] {
            return Ok(self.interpolation.value(t));
        }
        let rate = log_slope(times, data, n - 1);
        Ok(data[n - 1] * (-rate * (t - times[n - 1])).exp())
    }
}

/// `ln(y[i-1] / y[i]) / (t[i] - t[i-1])`.
fn log_slope(times: &[Time], data: &[Real], i: usize) -> Real {
    (data[i - 1] / data[i]).ln() / (times[i] - times[i - 1])
}

/// A factor at node `i` extending the previous segment's log-slope, or
/// `1 / (1 + avg * t)` for the first pillar.
fn extrapolated_factor<T: CurveTraits>(i: usize, curve: &NodeCurve<T>, avg: Real) -> Real {
    let (times, data) = (&curve.times, &curve.data);
    if i == 1 {
        return 1.0 / (1.0 + avg * times[1]);
    }
    let rate = log_slope(times, data, i - 1);
    data[i - 1] * (-rate * (times[i] - times[i - 1])).exp()
}

impl<T: CurveTraits> Observable for NodeCurve<T> {
    fn observable_impl(&self) -> &ObservableImpl {
        &self.observable
    }
}

impl<T: CurveTraits> TermStructure for NodeCurve<T> {
    fn reference_date(&self) -> Result<Date> {
        Ok(self.reference_date)
    }

    fn day_counter(&self) -> &dyn DayCounter {
        self.day_counter.as_ref()
    }

    fn max_date(&self) -> Result<Date> {
        ql_core::ensure!(self.active >= 1, "curve has no active node");
        Ok(self.dates[self.active - 1])
    }

    fn extrapolation(&self) -> &Cell<bool> {
        &self.extrapolation
    }
}

impl<T> YieldTermStructure for NodeCurve<T>
where
    T: CurveTraits<Curve = dyn YieldTermStructure>,
{
    fn discount_impl(&self, t: Time) -> Result<DiscountFactor> {
        T::curve_value(self, t)
    }
}

impl<T> DefaultProbabilityTermStructure for NodeCurve<T>
where
    T: CurveTraits<Curve = dyn DefaultProbabilityTermStructure>,
{
    fn survival_probability_impl(&self, t: Time) -> Result<Probability> {
        T::curve_value(self, t)
    }
}

impl<T: CurveTraits> fmt::Debug for NodeCurve<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCurve")
            .field("traits", &std::any::type_name::<T>())
            .field("dates", &self.dates)
            .field("data", &self.data)
            .field("active", &self.active)
            .finish()
    }
}

// ── Yield traits ─────────────────────────────────────────────────────────────

/// Discount-factor nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discount;

impl CurveTraits for Discount {
    type Curve = dyn YieldTermStructure;

    fn initial_value() -> Real {
        1.0
    }

    fn guess(i: usize, curve: &NodeCurve<Self>) -> Real {
        extrapolated_factor(i, curve, AVG_RATE)
    }

    fn min_value_after(i: usize, curve: &NodeCurve<Self>) -> Real {
        let dt = curve.times[i] - curve.times[i - 1];
        curve.data[i - 1] * (-MAX_RATE * dt).exp()
    }

    fn max_value_after(i: usize, curve: &NodeCurve<Self>) -> Real {
        let dt = curve.times[i] - curve.times[i - 1];
        curve.data[i - 1] * (MAX_RATE * dt).exp()
    }

    fn as_curve(curve: &NodeCurve<Self>) -> &Self::Curve {
        curve
    }

    fn curve_value(curve: &NodeCurve<Self>, t: Time) -> Result<Real> {
        curve.interpolated_factor(t)
    }
}

/// Continuously-compounded zero-rate nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroYield;

impl CurveTraits for ZeroYield {
    type Curve = dyn YieldTermStructure;

    fn initial_value() -> Real {
        AVG_RATE
    }

    fn guess(i: usize, curve: &NodeCurve<Self>) -> Real {
        if i == 1 {
            AVG_RATE
        } else {
            curve.data[i - 1]
        }
    }

    fn min_value_after(_i: usize, _curve: &NodeCurve<Self>) -> Real {
        -MAX_RATE
    }

    fn max_value_after(_i: usize, _curve: &NodeCurve<Self>) -> Real {
        MAX_RATE
    }

    fn update_guess(data: &mut [Real], value: Real, i: usize) {
        data[i] = value;
        if i == 1 {
            data[0] = value;
        }
    }

    fn as_curve(curve: &NodeCurve<Self>) -> &Self::Curve {
        curve
    }

    fn curve_value(curve: &NodeCurve<Self>, t: Time) -> Result<Real> {
        let (times, data) = curve.active_nodes()?;
        let n = times.len();
        let t_max = times[n - 1];
        let zero = if t <= t_max {
            curve.interpolation.value(t)
        } else {
            // flat instantaneous forward past the last node
            let slope = (data[n - 1] - data[n - 2]) / (t_max - times[n - 2]);
            let forward = data[n - 1] + t_max * slope;
            data[n - 1] * t_max / t + forward * (1.0 - t_max / t)
        };
        Ok((-zero * t).exp())
    }
}

/// Instantaneous forward-rate nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardRate;

impl CurveTraits for ForwardRate {
    type Curve = dyn YieldTermStructure;

    fn initial_value() -> Real {
        AVG_RATE
    }

    fn guess(i: usize, curve: &NodeCurve<Self>) -> Real {
        if i == 1 {
            AVG_RATE
        } else {
            curve.data[i - 1]
        }
    }

    fn min_value_after(_i: usize, _curve: &NodeCurve<Self>) -> Real {
        -MAX_RATE
    }

    fn max_value_after(_i: usize, _curve: &NodeCurve<Self>) -> Real {
        MAX_RATE
    }

    fn update_guess(data: &mut [Real], value: Real, i: usize) {
        data[i] = value;
        if i == 1 {
            data[0] = value;
        }
    }

    fn as_curve(curve: &NodeCurve<Self>) -> &Self::Curve {
        curve
    }

    fn curve_value(curve: &NodeCurve<Self>, t: Time) -> Result<Real> {
        curve.integrated_rate(t)
    }
}

// ── Default traits ───────────────────────────────────────────────────────────

/// Hazard-rate nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HazardRate;

impl CurveTraits for HazardRate {
    type Curve = dyn DefaultProbabilityTermStructure;

    fn initial_value() -> Real {
        AVG_HAZARD_RATE
    }

    fn guess(i: usize, curve: &NodeCurve<Self>) -> Real {
        if i == 1 {
            AVG_HAZARD_RATE
        } else {
            curve.data[i - 1]
        }
    }

    fn min_value_after(_i: usize, _curve: &NodeCurve<Self>) -> Real {
        Real::EPSILON
    }

    fn max_value_after(_i: usize, _curve: &NodeCurve<Self>) -> Real {
        MAX_HAZARD_RATE
    }

    fn update_guess(data: &mut [Real], value: Real, i: usize) {
        data[i] = value;
        if i == 1 {
            data[0] = value;
        }
    }

    fn as_curve(curve: &NodeCurve<Self>) -> &Self::Curve {
        curve
    }

    fn curve_value(curve: &NodeCurve<Self>, t: Time) -> Result<Real> {
        curve.integrated_rate(t)
    }
}

/// Survival-probability nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurvivalProbability;

impl CurveTraits for SurvivalProbability {
    type Curve = dyn DefaultProbabilityTermStructure;

    fn initial_value() -> Real {
        1.0
    }

    fn guess(i: usize, curve: &NodeCurve<Self>) -> Real {
        extrapolated_factor(i, curve, AVG_HAZARD_RATE)
    }

    fn min_value_after(i: usize, curve: &NodeCurve<Self>) -> Real {
        let dt = curve.times[i] - curve.times[i - 1];
        curve.data[i - 1] * (-MAX_HAZARD_RATE * dt).exp()
    }

    fn max_value_after(i: usize, curve: &NodeCurve<Self>) -> Real {
        curve.data[i - 1]
    }

    fn as_curve(curve: &NodeCurve<Self>) -> &Self::Curve {
        curve
    }

    fn curve_value(curve: &NodeCurve<Self>, t: Time) -> Result<Real> {
        curve.interpolated_factor(t)
    }
}
