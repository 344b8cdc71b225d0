//! `DefaultProbabilityTermStructure` — credit / default-probability term
//! structures.
//!
//! Provides the `DefaultProbabilityTermStructure` trait plus
//! `FlatHazardRate`, a constant hazard-rate curve.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::term_structure::{ReferenceDate, TermStructure};
use ql_core::errors::Result;
use ql_core::patterns::observable::{
    register_with, weak_observer, Observable, ObservableImpl, Observer,
};
use ql_core::{Handle, Probability, Rate, Real, Time};
use ql_quotes::{quote_value, Quote, SimpleQuote};
use ql_time::{Date, DayCounter};

/// Small time step used for numerical densities.
const DT: Time = 1.0e-4;

/// A default-probability term structure.
///
/// Implementors provide
/// [`survival_probability_impl`](DefaultProbabilityTermStructure::survival_probability_impl);
/// the density and hazard rate are derived numerically unless overridden.
pub trait DefaultProbabilityTermStructure: TermStructure {
    /// Survival probability up to time `t`, without range checks.
    fn survival_probability_impl(&self, t: Time) -> Result<Probability>;

    /// Default density at time `t`, without range checks.
    fn default_density_impl(&self, t: Time) -> Result<Real> {
        let t1 = (t - DT / 2.0).max(0.0);
        let t2 = t1 + DT;
        let s1 = self.survival_probability_impl(t1)?;
        let s2 = self.survival_probability_impl(t2)?;
        Ok((s1 - s2) / DT)
    }

    /// Hazard rate at time `t`, without range checks.
    fn hazard_rate_impl(&self, t: Time) -> Result<Rate> {
        let s = self.survival_probability_impl(t)?;
        if s == 0.0 {
            return Ok(0.0);
        }
        Ok(self.default_density_impl(t)? / s)
    }

    // ── Public interface ─────────────────────────────────────────────────

    /// Probability of surviving until `date`.
    fn survival_probability(&self, date: Date) -> Result<Probability> {
        self.survival_probability_time(self.time_from_reference(date)?, false)
    }

    /// Probability of surviving until time `t`.
    fn survival_probability_time(&self, t: Time, extrapolate: bool) -> Result<Probability> {
        self.check_range(t, extrapolate)?;
        self.survival_probability_impl(t)
    }

    /// Probability of defaulting before `date`.
    fn default_probability(&self, date: Date) -> Result<Probability> {
        Ok(1.0 - self.survival_probability(date)?)
    }

    /// Probability of defaulting before time `t`.
    fn default_probability_time(&self, t: Time, extrapolate: bool) -> Result<Probability> {
        Ok(1.0 - self.survival_probability_time(t, extrapolate)?)
    }

    /// Probability of defaulting between `d1` and `d2`.
    fn default_probability_between(&self, d1: Date, d2: Date) -> Result<Probability> {
        ql_core::ensure!(d1 <= d2, "initial date ({d1}) later than final date ({d2})");
        let t1 = self.time_from_reference(d1)?;
        let t2 = self.time_from_reference(d2)?;
        self.default_probability_between_times(t1, t2, false)
    }

    /// Probability of defaulting between times `t1` and `t2`.
    fn default_probability_between_times(
        &self,
        t1: Time,
        t2: Time,
        extrapolate: bool,
    ) -> Result<Probability> {
        ql_core::ensure!(t1 <= t2, "initial time ({t1}) later than final time ({t2})");
        let s1 = self.survival_probability_time(t1, extrapolate)?;
        let s2 = self.survival_probability_time(t2, extrapolate)?;
        Ok(s1 - s2)
    }

    /// Hazard rate at `date`.
    fn hazard_rate(&self, date: Date) -> Result<Rate> {
        self.hazard_rate_time(self.time_from_reference(date)?, false)
    }

    /// Hazard rate at time `t`.
    fn hazard_rate_time(&self, t: Time, extrapolate: bool) -> Result<Rate> {
        self.check_range(t, extrapolate)?;
        self.hazard_rate_impl(t)
    }

    /// Default density at `date`.
    fn default_density(&self, date: Date) -> Result<Real> {
        self.default_density_time(self.time_from_reference(date)?, false)
    }

    /// Default density at time `t`.
    fn default_density_time(&self, t: Time, extrapolate: bool) -> Result<Real> {
        self.check_range(t, extrapolate)?;
        self.default_density_impl(t)
    }
}

// ── FlatHazardRate ────────────────────────────────────────────────────────────

/// A flat (constant) hazard-rate default-probability term structure.
///
/// `S(t) = exp(-h * t)`.
pub struct FlatHazardRate {
    reference: ReferenceDate,
    hazard_rate: Handle<dyn Quote>,
    day_counter: Rc<dyn DayCounter>,
    extrapolation: Cell<bool>,
    observable: ObservableImpl,
}

impl FlatHazardRate {
    /// Create a flat hazard-rate curve on a quoted hazard rate.
    pub fn new(
        reference: impl Into<ReferenceDate>,
        hazard_rate: Handle<dyn Quote>,
        day_counter: impl DayCounter + 'static,
    ) -> Rc<Self> {
        let curve = Rc::new(Self {
            reference: reference.into(),
            hazard_rate,
            day_counter: Rc::new(day_counter),
            extrapolation: Cell::new(false),
            observable: ObservableImpl::new(),
        });
        register_with(&curve, &curve.hazard_rate);
        curve.reference.register_observer(weak_observer(&curve));
        curve
    }

    /// Create a flat hazard-rate curve on a fixed hazard rate.
    pub fn with_rate(
        reference: impl Into<ReferenceDate>,
        hazard_rate: Rate,
        day_counter: impl DayCounter + 'static,
    ) -> Rc<Self> {
        Self::new(
            reference,
            Handle::<dyn Quote>::new(SimpleQuote::shared(hazard_rate)),
            day_counter,
        )
    }
}

impl Observer for FlatHazardRate {
    fn update(&self) -> Result<()> {
        self.notify_observers()
    }
}

impl Observable for FlatHazardRate {
    fn observable_impl(&self) -> &ObservableImpl {
        &self.observable
    }
}

impl TermStructure for FlatHazardRate {
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

impl DefaultProbabilityTermStructure for FlatHazardRate {
    fn survival_probability_impl(&self, t: Time) -> Result<Probability> {
        Ok((-quote_value(&self.hazard_rate)? * t).exp())
    }

    fn hazard_rate_impl(&self, _t: Time) -> Result<Rate> {
        quote_value(&self.hazard_rate)
    }

    fn default_density_impl(&self, t: Time) -> Result<Real> {
        let h = quote_value(&self.hazard_rate)?;
        Ok(h * (-h * t).exp())
    }
}

impl fmt::Debug for FlatHazardRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatHazardRate")
            .field("reference", &self.reference)
            .field("hazard_rate", &self.hazard_rate)
            .field("day_counter", &self.day_counter.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ql_time::{Actual365Fixed, TimeUnit};

    #[test]
    fn flat_hazard_rate_consistency() {
        let today = Date::from_ymd(2025, 1, 2).unwrap();
        let h = 0.01;
        let curve = FlatHazardRate::with_rate(today, h, Actual365Fixed);

        let mut previous = today;
        for year in 1..=20 {
            let date = today.advance(year, TimeUnit::Years).unwrap();
            let t = curve.time_from_reference(date).unwrap();
            let pd = curve.default_probability(date).unwrap();
            assert_abs_diff_eq!(pd, 1.0 - (-h * t).exp(), epsilon = 1e-10);

            let between = curve.default_probability_between(previous, date).unwrap();
            let expected = pd - curve.default_probability(previous).unwrap();
            assert_abs_diff_eq!(between, expected, epsilon = 1e-10);
            previous = date;
        }
    }

    #[test]
    fn hazard_and_density() {
        let today = Date::from_ymd(2025, 1, 2).unwrap();
        let curve = FlatHazardRate::with_rate(today, 0.02, Actual365Fixed);
        assert_abs_diff_eq!(curve.hazard_rate_time(3.0, false).unwrap(), 0.02);
        assert_abs_diff_eq!(
            curve.default_density_time(3.0, false).unwrap(),
            0.02 * (-0.06_f64).exp(),
            epsilon = 1e-15
        );
    }

    #[test]
    fn numerical_hazard_rate() {
        // only the survival probability is supplied
        #[derive(Debug, Default)]
        struct Exponential {
            extrapolation: Cell<bool>,
            observable: ObservableImpl,
        }
        impl Observable for Exponential {
            fn observable_impl(&self) -> &ObservableImpl {
                &self.observable
            }
        }
        impl TermStructure for Exponential {
            fn reference_date(&self) -> Result<Date> {
                Date::from_ymd(2025, 1, 2)
            }
            fn day_counter(&self) -> &dyn DayCounter {
                &Actual365Fixed
            }
            fn max_date(&self) -> Result<Date> {
                Ok(Date::MAX)
            }
            fn extrapolation(&self) -> &Cell<bool> {
                &self.extrapolation
            }
        }
        impl DefaultProbabilityTermStructure for Exponential {
            fn survival_probability_impl(&self, t: Time) -> Result<Probability> {
                Ok((-0.03 * t).exp())
            }
        }

        let curve = Exponential::default();
        assert_abs_diff_eq!(curve.hazard_rate_time(2.0, false).unwrap(), 0.03, epsilon = 1e-8);
        assert_abs_diff_eq!(
            curve
                .default_probability_between_times(1.0, 2.0, false)
                .unwrap(),
            (-0.03_f64).exp() - (-0.06_f64).exp(),
            epsilon = 1e-15
        );
    }
}
