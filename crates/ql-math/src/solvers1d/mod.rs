//! 1D root-finding solvers.
//!
//! Every solver implements [`Solver1D`], which provides the two entry points
//! shared by the whole family:
//!
//! * [`Solver1D::solve`] searches for a bracket starting from a guess and a
//!   step, expanding geometrically, then refines inside it;
//! * [`Solver1D::solve_bracketed`] starts from a caller supplied bracket.
//!
//! The concrete types only differ in [`Solver1D::solve_impl`], the refinement
//! step.  All of them stop after [`SolverConfig::max_evaluations`] function
//! evaluations.

use std::cell::Cell;

use ql_core::errors::{Error, Result};
use ql_core::Real;

use crate::comparison::close;

const GROWTH_FACTOR: Real = 1.6;

// ── Objective function ───────────────────────────────────────────────────────

/// A function whose root is sought.
///
/// Any `FnMut(Real) -> Result<Real>` is an objective function; use
/// [`WithDerivative`] to supply the derivative needed by [`Newton`] and
/// [`NewtonSafe`].
pub trait ObjectiveFunction {
    /// `f(x)`.
    fn value(&mut self, x: Real) -> Result<Real>;

    /// `f'(x)`; fails unless overridden.
    fn derivative(&mut self, x: Real) -> Result<Real> {
        let _ = x;
        Err(Error::Runtime(
            "objective function does not provide a derivative".into(),
        ))
    }
}

impl<F> ObjectiveFunction for F
where
    F: FnMut(Real) -> Result<Real>,
{
    fn value(&mut self, x: Real) -> Result<Real> {
        self(x)
    }
}

/// Pairs a function with its derivative.
#[derive(Debug, Clone)]
pub struct WithDerivative<F, D> {
    f: F,
    df: D,
}

impl<F, D> WithDerivative<F, D>
where
    F: FnMut(Real) -> Result<Real>,
    D: FnMut(Real) -> Result<Real>,
{
    /// Combine `f` and `f'`.
    pub fn new(f: F, df: D) -> Self {
        Self { f, df }
    }
}

impl<F, D> ObjectiveFunction for WithDerivative<F, D>
where
    F: FnMut(Real) -> Result<Real>,
    D: FnMut(Real) -> Result<Real>,
{
    fn value(&mut self, x: Real) -> Result<Real> {
        (self.f)(x)
    }

    fn derivative(&mut self, x: Real) -> Result<Real> {
        (self.df)(x)
    }
}

// ── Configuration and state ──────────────────────────────────────────────────

/// Limits shared by every solver.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Maximum number of function evaluations per solve.
    pub max_evaluations: usize,
    /// Lower bound enforced on every trial abscissa, if any.
    pub lower_bound: Option<Real>,
    /// Upper bound enforced on every trial abscissa, if any.
    pub upper_bound: Option<Real>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 100,
            lower_bound: None,
            upper_bound: None,
        }
    }
}

impl SolverConfig {
    /// Clamp `x` into the configured bounds.
    pub fn enforce_bounds(&self, x: Real) -> Real {
        let x = match self.lower_bound {
            Some(lower) if x < lower => lower,
            _ => x,
        };
        match self.upper_bound {
            Some(upper) if x > upper => upper,
            _ => x,
        }
    }
}

/// Working bracket handed to [`Solver1D::solve_impl`].
///
/// On entry `f(x_min)` and `f(x_max)` have opposite signs, `root` holds the
/// initial guess and `evaluation_number` the evaluations already spent.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverState {
    /// Current root estimate.
    pub root: Real,
    /// Lower end of the bracket.
    pub x_min: Real,
    /// Upper end of the bracket.
    pub x_max: Real,
    /// `f(x_min)`.
    pub fx_min: Real,
    /// `f(x_max)`.
    pub fx_max: Real,
    /// Function evaluations spent so far.
    pub evaluation_number: usize,
    /// Evaluation budget.
    pub max_evaluations: usize,
}

impl SolverState {
    fn budget_left(&self) -> bool {
        self.evaluation_number <= self.max_evaluations
    }

    fn exhausted(&self) -> Error {
        Error::MaxEvaluationsExceeded {
            max_evaluations: self.max_evaluations,
            last_root: self.root,
        }
    }

    /// Final evaluation at the returned root, so that stateful objective
    /// functions are left positioned on it.
    fn finish(&mut self, f: &mut dyn ObjectiveFunction) -> Result<Real> {
        f.value(self.root)?;
        self.evaluation_number += 1;
        Ok(self.root)
    }
}

// ── Solver trait ─────────────────────────────────────────────────────────────

/// A 1D root finder.
pub trait Solver1D: std::fmt::Debug {
    /// Limits used by [`solve`](Self::solve) and
    /// [`solve_bracketed`](Self::solve_bracketed).
    fn config(&self) -> &SolverConfig;

    /// Mutable access to the limits.
    fn config_mut(&mut self) -> &mut SolverConfig;

    /// Counter updated at the end of every solve.
    fn evaluation_counter(&self) -> &Cell<usize>;

    /// Refine the root inside a valid bracket.
    fn solve_impl(
        &self,
        f: &mut dyn ObjectiveFunction,
        accuracy: Real,
        state: &mut SolverState,
    ) -> Result<Real>;

    /// Number of function evaluations used by the last solve.
    fn evaluation_number(&self) -> usize {
        self.evaluation_counter().get()
    }

    /// Find a root of `f` to within `accuracy`, first bracketing it by
    /// expanding outwards from `guess` in steps starting at `step`.
    fn solve(
        &self,
        f: &mut dyn ObjectiveFunction,
        accuracy: Real,
        guess: Real,
        step: Real,
    ) -> Result<Real> {
        self.solve_with(self.config(), f, accuracy, guess, step)
    }

    /// As [`solve`](Self::solve), with explicit limits.
    fn solve_with(
        &self,
        config: &SolverConfig,
        f: &mut dyn ObjectiveFunction,
        accuracy: Real,
        guess: Real,
        step: Real,
    ) -> Result<Real> {
        ql_core::ensure!(accuracy > 0.0, "accuracy ({accuracy}) must be positive");
        let accuracy = accuracy.max(Real::EPSILON);
        let counter = self.evaluation_counter();

        let mut state = SolverState {
            root: guess,
            x_min: guess,
            x_max: guess,
            fx_min: 0.0,
            fx_max: 0.0,
            evaluation_number: 1,
            max_evaluations: config.max_evaluations,
        };
        state.fx_max = f.value(state.root)?;
        if close(state.fx_max, 0.0) {
            counter.set(state.evaluation_number);
            return Ok(state.root);
        }
        if state.fx_max > 0.0 {
            state.x_min = config.enforce_bounds(state.root - step);
            state.fx_min = f.value(state.x_min)?;
        } else {
            state.fx_min = state.fx_max;
            state.x_max = config.enforce_bounds(state.root + step);
            state.fx_max = f.value(state.x_max)?;
        }
        state.evaluation_number = 2;

        let mut flip_flop = -1;
        while state.budget_left() {
            if state.fx_min * state.fx_max <= 0.0 {
                counter.set(state.evaluation_number);
                if close(state.fx_min, 0.0) {
                    return Ok(state.x_min);
                }
                if close(state.fx_max, 0.0) {
                    return Ok(state.x_max);
                }
                tracing::trace!(
                    x_min = state.x_min,
                    x_max = state.x_max,
                    evaluations = state.evaluation_number,
                    "root bracketed"
                );
                state.root = 0.5 * (state.x_min + state.x_max);
                let result = self.solve_impl(f, accuracy, &mut state);
                counter.set(state.evaluation_number);
                return result;
            }
            let expand_lower = match state.fx_min.abs().partial_cmp(&state.fx_max.abs()) {
                Some(std::cmp::Ordering::Less) => true,
                Some(std::cmp::Ordering::Greater) => false,
                _ => {
                    flip_flop = -flip_flop;
                    flip_flop == 1
                }
            };
            if expand_lower {
                state.x_min = config
                    .enforce_bounds(state.x_min + GROWTH_FACTOR * (state.x_min - state.x_max));
                state.fx_min = f.value(state.x_min)?;
            } else {
                state.x_max = config
                    .enforce_bounds(state.x_max + GROWTH_FACTOR * (state.x_max - state.x_min));
                state.fx_max = f.value(state.x_max)?;
            }
            state.evaluation_number += 1;
        }

        counter.set(state.evaluation_number);
        Err(Error::RootNotBracketed {
            x_min: state.x_min,
            x_max: state.x_max,
            f_min: state.fx_min,
            f_max: state.fx_max,
        })
    }

    /// Find a root of `f` inside `[x_min, x_max]` to within `accuracy`,
    /// starting from `guess` (which must lie strictly inside the bracket).
    fn solve_bracketed(
        &self,
        f: &mut dyn ObjectiveFunction,
        accuracy: Real,
        guess: Real,
        x_min: Real,
        x_max: Real,
    ) -> Result<Real> {
        self.solve_bracketed_with(self.config(), f, accuracy, guess, x_min, x_max)
    }

    /// Find a root of `f` inside `[x_min, x_max]`, starting from the midpoint.
    fn solve_in_range(
        &self,
        f: &mut dyn ObjectiveFunction,
        accuracy: Real,
        x_min: Real,
        x_max: Real,
    ) -> Result<Real> {
        self.solve_bracketed(f, accuracy, 0.5 * (x_min + x_max), x_min, x_max)
    }

    /// As [`solve_bracketed`](Self::solve_bracketed), with explicit limits.
    fn solve_bracketed_with(
        &self,
        config: &SolverConfig,
        f: &mut dyn ObjectiveFunction,
        accuracy: Real,
        guess: Real,
        x_min: Real,
        x_max: Real,
    ) -> Result<Real> {
        ql_core::ensure!(accuracy > 0.0, "accuracy ({accuracy}) must be positive");
        ql_core::ensure!(x_min < x_max, "invalid range: x_min ({x_min}) >= x_max ({x_max})");
        if let Some(lower) = config.lower_bound {
            ql_core::ensure!(
                x_min >= lower,
                "x_min ({x_min}) < enforced lower bound ({lower})"
            );
        }
        if let Some(upper) = config.upper_bound {
            ql_core::ensure!(
                x_max <= upper,
                "x_max ({x_max}) > enforced upper bound ({upper})"
            );
        }
        let accuracy = accuracy.max(Real::EPSILON);
        let counter = self.evaluation_counter();

        let fx_min = f.value(x_min)?;
        if close(fx_min, 0.0) {
            counter.set(1);
            return Ok(x_min);
        }
        let fx_max = f.value(x_max)?;
        counter.set(2);
        if close(fx_max, 0.0) {
            return Ok(x_max);
        }
        if fx_min * fx_max >= 0.0 {
            return Err(Error::RootNotBracketed {
                x_min,
                x_max,
                f_min: fx_min,
                f_max: fx_max,
            });
        }
        ql_core::ensure!(
            guess > x_min && guess < x_max,
            "guess ({guess}) must lie strictly inside [{x_min}, {x_max}]"
        );

        let mut state = SolverState {
            root: guess,
            x_min,
            x_max,
            fx_min,
            fx_max,
            evaluation_number: 2,
            max_evaluations: config.max_evaluations,
        };
        let result = self.solve_impl(f, accuracy, &mut state);
        counter.set(state.evaluation_number);
        result
    }

    /// Set the evaluation budget.
    fn with_max_evaluations(mut self, max_evaluations: usize) -> Self
    where
        Self: Sized,
    {
        self.config_mut().max_evaluations = max_evaluations;
        self
    }

    /// Enforce a lower bound on every trial abscissa.
    fn with_lower_bound(mut self, lower: Real) -> Self
    where
        Self: Sized,
    {
        self.config_mut().lower_bound = Some(lower);
        self
    }

    /// Enforce an upper bound on every trial abscissa.
    fn with_upper_bound(mut self, upper: Real) -> Self
    where
        Self: Sized,
    {
        self.config_mut().upper_bound = Some(upper);
        self
    }
}

macro_rules! solver_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            config: SolverConfig,
            evaluation_number: Cell<usize>,
        }

        impl $name {
            /// A solver with default limits.
            pub fn new() -> Self {
                Self::default()
            }

            /// A solver with the given limits.
            pub fn with_config(config: SolverConfig) -> Self {
                Self {
                    config,
                    evaluation_number: Cell::new(0),
                }
            }
        }
    };
}

macro_rules! solver_accessors {
    () => {
        fn config(&self) -> &SolverConfig {
            &self.config
        }

        fn config_mut(&mut self) -> &mut SolverConfig {
            &mut self.config
        }

        fn evaluation_counter(&self) -> &Cell<usize> {
            &self.evaluation_number
        }
    };
}

/// `|a|` with the sign of `b`.
fn sign(a: Real, b: Real) -> Real {
    if b >= 0.0 {
        a.abs()
    } else {
        -a.abs()
    }
}

// ── Brent ────────────────────────────────────────────────────────────────────

solver_type!(
    /// Brent's method: inverse quadratic interpolation safeguarded by
    /// bisection.  The bracket is kept at all times.
    Brent
);

impl Solver1D for Brent {
    solver_accessors!();

    fn solve_impl(
        &self,
        f: &mut dyn ObjectiveFunction,
        accuracy: Real,
        s: &mut SolverState,
    ) -> Result<Real> {
        let mut d = 0.0;
        let mut e = 0.0;
        s.root = s.x_max;
        let mut froot = s.fx_max;

        while s.budget_left() {
            if (froot > 0.0 && s.fx_max > 0.0) || (froot < 0.0 && s.fx_max < 0.0) {
                // rename so that root and x_max bracket the root
                s.x_max = s.x_min;
                s.fx_max = s.fx_min;
                d = s.root - s.x_min;
                e = d;
            }
            if s.fx_max.abs() < froot.abs() {
                s.x_min = s.root;
                s.root = s.x_max;
                s.x_max = s.x_min;
                s.fx_min = froot;
                froot = s.fx_max;
                s.fx_max = s.fx_min;
            }
            let x_acc1 = 2.0 * Real::EPSILON * s.root.abs() + 0.5 * accuracy;
            let x_mid = (s.x_max - s.root) / 2.0;
            if x_mid.abs() <= x_acc1 || close(froot, 0.0) {
                return s.finish(f);
            }
            if e.abs() >= x_acc1 && s.fx_min.abs() > froot.abs() {
                // attempt inverse quadratic interpolation
                let ratio = froot / s.fx_min;
                let (mut p, mut q) = if close(s.x_min, s.x_max) {
                    (2.0 * x_mid * ratio, 1.0 - ratio)
                } else {
                    let q = s.fx_min / s.fx_max;
                    let r = froot / s.fx_max;
                    (
                        ratio * (2.0 * x_mid * q * (q - r) - (s.root - s.x_min) * (r - 1.0)),
                        (q - 1.0) * (r - 1.0) * (ratio - 1.0),
                    )
                };
                if p > 0.0 {
                    q = -q;
                }
                p = p.abs();
                let min1 = 3.0 * x_mid * q - (x_acc1 * q).abs();
                let min2 = (e * q).abs();
                if 2.0 * p < min1.min(min2) {
                    e = d;
                    d = p / q;
                } else {
                    d = x_mid;
                    e = d;
                }
            } else {
                d = x_mid;
                e = d;
            }
            s.x_min = s.root;
            s.fx_min = froot;
            if d.abs() > x_acc1 {
                s.root += d;
            } else {
                s.root += sign(x_acc1, x_mid);
            }
            froot = f.value(s.root)?;
            s.evaluation_number += 1;
        }
        Err(s.exhausted())
    }
}

// ── Bisection ────────────────────────────────────────────────────────────────

solver_type!(
    /// Bisection: halves the bracket at every step.
    Bisection
);

impl Solver1D for Bisection {
    solver_accessors!();

    fn solve_impl(
        &self,
        f: &mut dyn ObjectiveFunction,
        accuracy: Real,
        s: &mut SolverState,
    ) -> Result<Real> {
        // orient the search so that f > 0 lies at root + dx
        let mut dx = if s.fx_min < 0.0 {
            s.root = s.x_min;
            s.x_max - s.x_min
        } else {
            s.root = s.x_max;
            s.x_min - s.x_max
        };

        while s.budget_left() {
            dx /= 2.0;
            let x_mid = s.root + dx;
            let f_mid = f.value(x_mid)?;
            s.evaluation_number += 1;
            if f_mid <= 0.0 {
                s.root = x_mid;
            }
            if dx.abs() < accuracy || close(f_mid, 0.0) {
                return s.finish(f);
            }
        }
        Err(s.exhausted())
    }
}

// ── False position ───────────────────────────────────────────────────────────

solver_type!(
    /// False position (regula falsi): secant steps that keep the bracket.
    FalsePosition
);

impl Solver1D for FalsePosition {
    solver_accessors!();

    fn solve_impl(
        &self,
        f: &mut dyn ObjectiveFunction,
        accuracy: Real,
        s: &mut SolverState,
    ) -> Result<Real> {
        // xl is the end where f < 0
        let (mut xl, mut fl, mut xh, mut fh) = if s.fx_min < 0.0 {
            (s.x_min, s.fx_min, s.x_max, s.fx_max)
        } else {
            (s.x_max, s.fx_max, s.x_min, s.fx_min)
        };

        while s.budget_left() {
            s.root = xl + (xh - xl) * fl / (fl - fh);
            let froot = f.value(s.root)?;
            s.evaluation_number += 1;
            let del = if froot < 0.0 {
                let del = xl - s.root;
                xl = s.root;
                fl = froot;
                del
            } else {
                let del = xh - s.root;
                xh = s.root;
                fh = froot;
                del
            };
            if del.abs() < accuracy || close(froot, 0.0) {
                return s.finish(f);
            }
        }
        Err(s.exhausted())
    }
}

// ── Secant ───────────────────────────────────────────────────────────────────

solver_type!(
    /// Secant method.  The bracket is only used to seed the first two points.
    Secant
);

impl Solver1D for Secant {
    solver_accessors!();

    fn solve_impl(
        &self,
        f: &mut dyn ObjectiveFunction,
        accuracy: Real,
        s: &mut SolverState,
    ) -> Result<Real> {
        // start from the point with the smaller residual
        let (mut froot, mut xl, mut fl) = if s.fx_min.abs() < s.fx_max.abs() {
            s.root = s.x_min;
            (s.fx_min, s.x_max, s.fx_max)
        } else {
            s.root = s.x_max;
            (s.fx_max, s.x_min, s.fx_min)
        };

        while s.budget_left() {
            if froot == fl {
                return Err(Error::ZeroDerivative { x: s.root });
            }
            let dx = (xl - s.root) * froot / (froot - fl);
            xl = s.root;
            fl = froot;
            s.root += dx;
            froot = f.value(s.root)?;
            s.evaluation_number += 1;
            if dx.abs() < accuracy || close(froot, 0.0) {
                return s.finish(f);
            }
        }
        Err(s.exhausted())
    }
}

// ── Newton ───────────────────────────────────────────────────────────────────

solver_type!(
    /// Newton-Raphson.  Requires [`ObjectiveFunction::derivative`]; hands
    /// over to [`NewtonSafe`] if a step leaves the bracket.
    Newton
);

impl Solver1D for Newton {
    solver_accessors!();

    fn solve_impl(
        &self,
        f: &mut dyn ObjectiveFunction,
        accuracy: Real,
        s: &mut SolverState,
    ) -> Result<Real> {
        let mut froot = f.value(s.root)?;
        let mut dfroot = f.derivative(s.root)?;
        s.evaluation_number += 1;

        while s.budget_left() {
            if dfroot.abs() < Real::EPSILON {
                return Err(Error::ZeroDerivative { x: s.root });
            }
            let dx = froot / dfroot;
            s.root -= dx;
            if (s.x_min - s.root) * (s.root - s.x_max) < 0.0 {
                // jumped out of the bracket
                let fallback = NewtonSafe::new();
                let config = SolverConfig {
                    max_evaluations: s.max_evaluations.saturating_sub(s.evaluation_number),
                    ..self.config.clone()
                };
                let root = fallback.solve_bracketed_with(
                    &config,
                    f,
                    accuracy,
                    s.root + dx,
                    s.x_min,
                    s.x_max,
                );
                s.evaluation_number += fallback.evaluation_number();
                return root;
            }
            if dx.abs() < accuracy {
                return s.finish(f);
            }
            froot = f.value(s.root)?;
            dfroot = f.derivative(s.root)?;
            s.evaluation_number += 1;
        }
        Err(s.exhausted())
    }
}

// ── Safe Newton ──────────────────────────────────────────────────────────────

solver_type!(
    /// Newton-Raphson safeguarded by bisection: a Newton step is only taken
    /// when it stays in the bracket and shrinks fast enough.
    NewtonSafe
);

impl Solver1D for NewtonSafe {
    solver_accessors!();

    fn solve_impl(
        &self,
        f: &mut dyn ObjectiveFunction,
        accuracy: Real,
        s: &mut SolverState,
    ) -> Result<Real> {
        // orient the search so that f(xl) < 0
        let (mut xl, mut xh) = if s.fx_min < 0.0 {
            (s.x_min, s.x_max)
        } else {
            (s.x_max, s.x_min)
        };
        let mut dx_old = s.x_max - s.x_min;
        let mut dx = dx_old;

        let mut froot = f.value(s.root)?;
        let mut dfroot = f.derivative(s.root)?;
        s.evaluation_number += 1;

        while s.budget_left() {
            let out_of_range =
                ((s.root - xh) * dfroot - froot) * ((s.root - xl) * dfroot - froot) > 0.0;
            let too_slow = (2.0 * froot).abs() > (dx_old * dfroot).abs();
            dx_old = dx;
            if out_of_range || too_slow {
                dx = (xh - xl) / 2.0;
                s.root = xl + dx;
            } else {
                dx = froot / dfroot;
                s.root -= dx;
            }
            if dx.abs() < accuracy {
                return s.finish(f);
            }
            froot = f.value(s.root)?;
            dfroot = f.derivative(s.root)?;
            s.evaluation_number += 1;
            if froot < 0.0 {
                xl = s.root;
            } else {
                xh = s.root;
            }
        }
        Err(s.exhausted())
    }
}

// ── Ridder ───────────────────────────────────────────────────────────────────

solver_type!(
    /// Ridder's method: exponential fit through the bracket ends and
    /// midpoint.
    Ridder
);

impl Solver1D for Ridder {
    solver_accessors!();

    fn solve_impl(
        &self,
        f: &mut dyn ObjectiveFunction,
        accuracy: Real,
        s: &mut SolverState,
    ) -> Result<Real> {
        // the step-size test below is loose, so tighten the tolerance
        let x_accuracy = accuracy / 100.0;
        s.root = Real::MIN;

        while s.budget_left() {
            let x_mid = 0.5 * (s.x_min + s.x_max);
            let fx_mid = f.value(x_mid)?;
            s.evaluation_number += 1;
            let root_term = (fx_mid * fx_mid - s.fx_min * s.fx_max).sqrt();
            if close(root_term, 0.0) {
                s.root = x_mid;
                return s.finish(f);
            }
            let direction = if s.fx_min >= s.fx_max { 1.0 } else { -1.0 };
            let next_root = x_mid + (x_mid - s.x_min) * (direction * fx_mid / root_term);
            if (next_root - s.root).abs() <= x_accuracy {
                return s.finish(f);
            }
            s.root = next_root;
            let froot = f.value(s.root)?;
            s.evaluation_number += 1;
            if close(froot, 0.0) {
                return Ok(s.root);
            }
            // keep the bracket around the root
            if sign(fx_mid, froot) != fx_mid {
                s.x_min = x_mid;
                s.fx_min = fx_mid;
                s.x_max = s.root;
                s.fx_max = froot;
            } else if sign(s.fx_min, froot) != s.fx_min {
                s.x_max = s.root;
                s.fx_max = froot;
            } else if sign(s.fx_max, froot) != s.fx_max {
                s.x_min = s.root;
                s.fx_min = froot;
            } else {
                ql_core::fail!("Ridder: bracket lost at x = {}", s.root);
            }
            if (s.x_max - s.x_min).abs() <= x_accuracy {
                return s.finish(f);
            }
        }
        Err(s.exhausted())
    }
}
