//! Sequential (iterative) bootstrap.
//!
//! Pillars are solved one at a time, left to right.  For pillar `i` the
//! nodes `0..i` are held at their solved values, the trial value is written
//! into node `i`, the interpolation is rebuilt over nodes `0..=i` and the
//! helper's residual is driven to zero by a bracketed 1D solver.
//!
//! The bootstrap works on a scratch [`NodeCurve`]; callers commit it only
//! when every pillar converged.

use std::cell::Cell;
use std::rc::Rc;

use crate::bootstrap_helper::BootstrapHelper;
use crate::bootstrap_traits::{CurveTraits, NodeCurve};
use ql_core::errors::{Error, Result};
use ql_core::Real;
use ql_math::{Brent, Solver1D, SolverConfig};

/// Limits and retry policy for the bootstrap.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Accuracy requested from the solver on each node value.
    pub accuracy: Real,
    /// Evaluation budget per solve.
    pub max_evaluations: usize,
    /// Solves attempted per pillar before giving up.
    pub max_attempts: usize,
    /// Factor applied to the upper bracket end on each retry.
    pub max_factor: Real,
    /// Factor applied to the lower bracket end on each retry.
    pub min_factor: Real,
    /// The root finder.
    pub solver: Rc<dyn Solver1D>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            accuracy: 1.0e-12,
            max_evaluations: 100,
            max_attempts: 1,
            max_factor: 2.0,
            min_factor: 2.0,
            solver: Rc::new(Brent::new()),
        }
    }
}

impl BootstrapConfig {
    /// Set the solver accuracy.
    pub fn with_accuracy(mut self, accuracy: Real) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Set the per-solve evaluation budget.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    /// Allow `attempts` solves per pillar, widening the bracket by the given
    /// factors between attempts.
    pub fn with_retries(mut self, attempts: usize, min_factor: Real, max_factor: Real) -> Self {
        self.max_attempts = attempts;
        self.min_factor = min_factor;
        self.max_factor = max_factor;
        self
    }

    /// Use another root finder.
    pub fn with_solver(mut self, solver: impl Solver1D + 'static) -> Self {
        self.solver = Rc::new(solver);
        self
    }
}

/// Whether a failed solve may succeed on a wider bracket.
fn is_retryable(error: &Error) -> bool {
    matches!(
        error,
        Error::RootNotBracketed { .. } | Error::MaxEvaluationsExceeded { .. }
    )
}

/// Solve every node of `curve` against `helpers` (one per pillar, in pillar
/// order).
///
/// # Errors
/// [`Error::BootstrapFailure`] naming the helper whose solve failed, the last
/// search interval and residual.  `curve` is left partially solved.
pub fn bootstrap<T: CurveTraits>(
    curve: &mut NodeCurve<T>,
    helpers: &[Rc<dyn BootstrapHelper<T::Curve>>],
    config: &BootstrapConfig,
) -> Result<()> {
    ql_core::ensure!(
        helpers.len() + 1 == curve.dates().len(),
        "{} helpers for {} pillars",
        helpers.len(),
        curve.dates().len() - 1
    );
    ql_core::ensure!(config.max_attempts >= 1, "at least one attempt per pillar required");
    let solver_config = SolverConfig {
        max_evaluations: config.max_evaluations,
        ..SolverConfig::default()
    };

    for i in 1..curve.dates().len() {
        let helper = &helpers[i - 1];
        let pillar = curve.dates()[i];

        let mut min = T::min_value_after(i, curve);
        let mut max = T::max_value_after(i, curve);
        let mut guess = T::guess(i, curve);
        if guess >= max {
            guess = max - (max - min) / 5.0;
        } else if guess <= min {
            guess = min + (max - min) / 5.0;
        }

        let last_residual = Cell::new(Real::NAN);
        let mut attempt = 1;
        let root = loop {
            let result = {
                let mut residual = |x: Real| -> Result<Real> {
                    T::update_guess(curve.data_mut(), x, i);
                    curve.activate(i + 1)?;
                    let r = helper.residual(T::as_curve(curve))?;
                    last_residual.set(r);
                    Ok(r)
                };
                config.solver.solve_bracketed_with(
                    &solver_config,
                    &mut residual,
                    config.accuracy,
                    guess,
                    min,
                    max,
                )
            };
            match result {
                Ok(root) => break root,
                Err(e) if attempt < config.max_attempts && is_retryable(&e) => {
                    tracing::warn!(
                        helper = i - 1,
                        %pillar,
                        attempt,
                        x_min = min,
                        x_max = max,
                        error = %e,
                        "widening bootstrap bracket"
                    );
                    min = if min < 0.0 { min * config.min_factor } else { min / config.min_factor };
                    max = if max > 0.0 { max * config.max_factor } else { max / config.max_factor };
                    guess = guess.clamp(
                        min + (max - min) / 5.0,
                        max - (max - min) / 5.0,
                    );
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        helper = i - 1,
                        %pillar,
                        last_residual = last_residual.get(),
                        error = %e,
                        "bootstrap failed"
                    );
                    return Err(Error::BootstrapFailure {
                        helper_index: i - 1,
                        pillar: pillar.to_string(),
                        x_min: min,
                        x_max: max,
                        last_residual: last_residual.get(),
                        accuracy: config.accuracy,
                        source: Box::new(e),
                    });
                }
            }
        };

        // the solver's last trial need not be the root
        T::update_guess(curve.data_mut(), root, i);
        curve.activate(i + 1)?;
        tracing::debug!(
            helper = i - 1,
            %pillar,
            value = root,
            evaluations = config.solver.evaluation_number(),
            "pillar solved"
        );
    }
    tracing::debug!(pillars = helpers.len(), "bootstrap pass complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap_traits::{Discount, ZeroYield};
    use crate::rate_helpers::DepositRateHelper;
    use crate::yield_term_structure::YieldTermStructure;
    use approx::assert_abs_diff_eq;
    use ql_core::Handle;
    use ql_math::{Bisection, Linear, LogLinear};
    use ql_quotes::{Quote, SimpleQuote};
    use ql_time::{Actual360, Actual365Fixed, Date, DayCounter, TimeUnit};

    fn today() -> Date {
        Date::from_ymd(2025, 1, 2).unwrap()
    }

    fn deposits(rates: &[Real]) -> Vec<Rc<dyn BootstrapHelper<dyn YieldTermStructure>>> {
        rates
            .iter()
            .enumerate()
            .map(|(k, &r)| {
                let quote = Handle::<dyn Quote>::new(SimpleQuote::shared(r));
                let helper = DepositRateHelper::with_tenor(
                    quote,
                    today(),
                    3 * (k as i32 + 1),
                    TimeUnit::Months,
                    Actual360,
                )
                .unwrap();
                Rc::new(helper) as Rc<dyn BootstrapHelper<dyn YieldTermStructure>>
            })
            .collect()
    }

    fn node_curve<T: CurveTraits>(
        helpers: &[Rc<dyn BootstrapHelper<T::Curve>>],
        interpolator: &dyn ql_math::Interpolator,
    ) -> NodeCurve<T> {
        let dates = std::iter::once(today())
            .chain(helpers.iter().map(|h| h.pillar_date()))
            .collect();
        NodeCurve::new(Rc::new(Actual365Fixed), dates, interpolator).unwrap()
    }

    #[test]
    fn deposits_are_repriced() {
        let helpers = deposits(&[0.030, 0.032, 0.035, 0.036]);
        let mut curve = node_curve::<Discount>(&helpers, &LogLinear);
        bootstrap(&mut curve, &helpers, &BootstrapConfig::default()).unwrap();

        for helper in &helpers {
            assert_abs_diff_eq!(helper.residual(&curve).unwrap(), 0.0, epsilon = 1e-10);
        }
        // first deposit: DF = 1 / (1 + r * tau)
        let tau = Actual360.year_fraction(today(), helpers[0].pillar_date());
        assert_abs_diff_eq!(curve.data()[1], 1.0 / (1.0 + 0.03 * tau), epsilon = 1e-12);
    }

    #[test]
    fn zero_yield_ties_the_reference_node() {
        let helpers = deposits(&[0.03, 0.04]);
        let mut curve = node_curve::<ZeroYield>(&helpers, &Linear);
        bootstrap(&mut curve, &helpers, &BootstrapConfig::default()).unwrap();
        assert_eq!(curve.data()[0], curve.data()[1]);
        for helper in &helpers {
            assert_abs_diff_eq!(helper.residual(&curve).unwrap(), 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn failure_names_the_helper() {
        // a 500% deposit rate is outside the zero-rate bracket
        let helpers = deposits(&[0.03, 5.0]);
        let mut curve = node_curve::<ZeroYield>(&helpers, &Linear);
        let err = bootstrap(&mut curve, &helpers, &BootstrapConfig::default()).unwrap_err();
        match err {
            Error::BootstrapFailure {
                helper_index,
                x_min,
                x_max,
                last_residual,
                source,
                ..
            } => {
                assert_eq!(helper_index, 1);
                assert_eq!((x_min, x_max), (-1.0, 1.0));
                assert!(last_residual.is_finite());
                assert!(matches!(*source, Error::RootNotBracketed { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn retries_widen_the_bracket() {
        let helpers = deposits(&[0.03, 1.5]);
        let mut curve = node_curve::<ZeroYield>(&helpers, &Linear);
        let config = BootstrapConfig::default().with_retries(3, 2.0, 2.0);
        bootstrap(&mut curve, &helpers, &config).unwrap();
        assert!(curve.data()[2] > 1.0);
        assert_abs_diff_eq!(helpers[1].residual(&curve).unwrap(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn exhausted_budget_is_reported() {
        let helpers = deposits(&[0.03]);
        let mut curve = node_curve::<Discount>(&helpers, &LogLinear);
        let config = BootstrapConfig::default()
            .with_solver(Bisection::new())
            .with_max_evaluations(5);
        let err = bootstrap(&mut curve, &helpers, &config).unwrap_err();
        match err {
            Error::BootstrapFailure { helper_index, source, .. } => {
                assert_eq!(helper_index, 0);
                assert!(matches!(*source, Error::MaxEvaluationsExceeded { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn helper_errors_are_wrapped() {
        let quote = Handle::<dyn Quote>::new(Rc::new(SimpleQuote::empty()));
        let helper = DepositRateHelper::with_tenor(quote, today(), 6, TimeUnit::Months, Actual360)
            .unwrap();
        let helpers: Vec<Rc<dyn BootstrapHelper<dyn YieldTermStructure>>> = vec![Rc::new(helper)];
        let mut curve = node_curve::<Discount>(&helpers, &LogLinear);
        let err = bootstrap(&mut curve, &helpers, &BootstrapConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::BootstrapFailure { helper_index: 0, ref source, .. }
                if matches!(**source, Error::InvalidQuote(_))
        ));
    }
}
