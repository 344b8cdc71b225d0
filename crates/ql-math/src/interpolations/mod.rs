//! 1D interpolation contract and the local schemes used by piecewise curves.
//!
//! An [`Interpolation1D`] is a stateful strategy: the owner pushes the current
//! nodes with [`update`](Interpolation1D::update) every time a node changes
//! (the bootstrapper does so after committing each pillar) and then queries
//! [`value`](Interpolation1D::value) or [`primitive`](Interpolation1D::primitive).
//! An [`Interpolator`] is the factory a curve is parameterised with.
//!
//! All schemes here are *local*: moving node `i` only changes the function on
//! the segments adjacent to it.  Outside `[x_min, x_max]` each scheme extends
//! its first/last segment.

use ql_core::errors::{Error, Result};
use ql_core::Real;

/// A 1D interpolation function `f: R → R` defined by a set of nodes.
pub trait Interpolation1D: std::fmt::Debug {
    /// Replace the nodes.  `xs` must be strictly increasing.
    ///
    /// # Errors
    /// [`Error::InvalidNodeOrdering`] for non-increasing abscissas, or a
    /// precondition error for mismatched lengths / too few points.
    fn update(&mut self, xs: &[Real], ys: &[Real]) -> Result<()>;

    /// Evaluate the interpolation at `x`.
    fn value(&self, x: Real) -> Real;

    /// Integral of the interpolation from `x_min()` to `x`.
    fn primitive(&self, x: Real) -> Real;

    /// Return the lower bound of the interpolation domain.
    fn x_min(&self) -> Real;

    /// Return the upper bound of the interpolation domain.
    fn x_max(&self) -> Real;

    /// Return `true` if `x` is within the interpolation range.
    fn is_in_range(&self, x: Real) -> bool {
        x >= self.x_min() && x <= self.x_max()
    }
}

/// Factory for an interpolation scheme.
pub trait Interpolator: std::fmt::Debug {
    /// A fresh interpolation with no nodes.
    fn interpolation(&self) -> Box<dyn Interpolation1D>;

    /// Minimum number of nodes the scheme needs.
    fn required_points(&self) -> usize {
        2
    }
}

/// Node storage shared by the schemes below.
#[derive(Debug, Clone, Default)]
struct Nodes {
    xs: Vec<Real>,
    ys: Vec<Real>,
}

impl Nodes {
    fn set(&mut self, xs: &[Real], ys: &[Real], required: usize) -> Result<()> {
        ql_core::ensure!(
            xs.len() == ys.len(),
            "xs and ys must have the same length ({} != {})",
            xs.len(),
            ys.len()
        );
        ql_core::ensure!(
            xs.len() >= required,
            "need at least {required} points for interpolation, got {}",
            xs.len()
        );
        if let Some(i) = (1..xs.len()).find(|&i| xs[i] <= xs[i - 1]) {
            return Err(Error::InvalidNodeOrdering {
                index: i,
                previous: xs[i - 1].to_string(),
                current: xs[i].to_string(),
            });
        }
        self.xs.clear();
        self.xs.extend_from_slice(xs);
        self.ys.clear();
        self.ys.extend_from_slice(ys);
        Ok(())
    }

    /// Index `i` of the segment `[x_i, x_{i+1})` containing `x`, clamped to
    /// the first / last segment.
    fn locate(&self, x: Real) -> usize {
        let n = self.xs.len();
        if n < 2 {
            return 0;
        }
        self.xs[1..n - 1].partition_point(|&xi| xi <= x)
    }

    fn x_min(&self) -> Real {
        self.xs.first().copied().unwrap_or(Real::NAN)
    }

    fn x_max(&self) -> Real {
        self.xs.last().copied().unwrap_or(Real::NAN)
    }
}

// ── Linear ────────────────────────────────────────────────────────────────────

/// Linear interpolation.
///
/// `f(x) = y[i] + (y[i+1] - y[i]) * (x - x[i]) / (x[i+1] - x[i])`
#[derive(Debug, Clone, Default)]
pub struct LinearInterpolation {
    nodes: Nodes,
    slopes: Vec<Real>,
    primitives: Vec<Real>,
}

impl LinearInterpolation {
    /// Construct a linear interpolation from sorted `xs` and corresponding `ys`.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        let mut interp = Self::default();
        interp.update(xs, ys)?;
        Ok(interp)
    }
}

impl Interpolation1D for LinearInterpolation {
    fn update(&mut self, xs: &[Real], ys: &[Real]) -> Result<()> {
        self.nodes.set(xs, ys, 2)?;
        self.slopes.clear();
        self.primitives.clear();
        self.primitives.push(0.0);
        for i in 0..xs.len() - 1 {
            let dx = xs[i + 1] - xs[i];
            let slope = (ys[i + 1] - ys[i]) / dx;
            self.slopes.push(slope);
            let last = self.primitives[i];
            self.primitives.push(last + dx * (ys[i] + 0.5 * slope * dx));
        }
        Ok(())
    }

    fn value(&self, x: Real) -> Real {
        if self.slopes.is_empty() {
            return Real::NAN;
        }
        let i = self.nodes.locate(x);
        self.nodes.ys[i] + (x - self.nodes.xs[i]) * self.slopes[i]
    }

    fn primitive(&self, x: Real) -> Real {
        if self.slopes.is_empty() {
            return Real::NAN;
        }
        let i = self.nodes.locate(x);
        let dx = x - self.nodes.xs[i];
        self.primitives[i] + dx * (self.nodes.ys[i] + 0.5 * self.slopes[i] * dx)
    }

    fn x_min(&self) -> Real {
        self.nodes.x_min()
    }

    fn x_max(&self) -> Real {
        self.nodes.x_max()
    }
}

// ── Log-linear ────────────────────────────────────────────────────────────────

/// Log-linear interpolation.
///
/// Interpolates `log(y)` linearly and exponentiates the result.
#[derive(Debug, Clone, Default)]
pub struct LogLinearInterpolation {
    log: LinearInterpolation,
    primitives: Vec<Real>,
}

impl LogLinearInterpolation {
    /// Construct a log-linear interpolation.
    ///
    /// All `ys` values must be strictly positive.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        let mut interp = Self::default();
        interp.update(xs, ys)?;
        Ok(interp)
    }

    /// `∫ exp(a + b·u) du` for `u` in `[0, dx]`.
    fn segment_integral(a: Real, b: Real, dx: Real) -> Real {
        if (b * dx).abs() < 1e-12 {
            a.exp() * dx
        } else {
            a.exp() * ((b * dx).exp() - 1.0) / b
        }
    }
}

impl Interpolation1D for LogLinearInterpolation {
    fn update(&mut self, xs: &[Real], ys: &[Real]) -> Result<()> {
        if let Some(y) = ys.iter().find(|&&y| y <= 0.0) {
            return Err(Error::Precondition(format!(
                "all y values must be positive for log-linear interpolation, got {y}"
            )));
        }
        let log_ys: Vec<Real> = ys.iter().map(|&y| y.ln()).collect();
        self.log.update(xs, &log_ys)?;
        self.primitives.clear();
        self.primitives.push(0.0);
        for i in 0..xs.len() - 1 {
            let last = self.primitives[i];
            self.primitives.push(
                last + Self::segment_integral(log_ys[i], self.log.slopes[i], xs[i + 1] - xs[i]),
            );
        }
        Ok(())
    }

    fn value(&self, x: Real) -> Real {
        self.log.value(x).exp()
    }

    fn primitive(&self, x: Real) -> Real {
        if self.primitives.is_empty() {
            return Real::NAN;
        }
        let nodes = &self.log.nodes;
        let i = nodes.locate(x);
        self.primitives[i]
            + Self::segment_integral(nodes.ys[i], self.log.slopes[i], x - nodes.xs[i])
    }

    fn x_min(&self) -> Real {
        self.log.x_min()
    }

    fn x_max(&self) -> Real {
        self.log.x_max()
    }
}

// ── Backward-flat ─────────────────────────────────────────────────────────────

/// Backward-flat (step) interpolation: on `(x[i], x[i+1]]` the value is
/// `y[i+1]`; flat `y[0]` to the left and `y[n-1]` to the right.
#[derive(Debug, Clone, Default)]
pub struct BackwardFlatInterpolation {
    nodes: Nodes,
    primitives: Vec<Real>,
}

impl BackwardFlatInterpolation {
    /// Construct a backward-flat interpolation.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        let mut interp = Self::default();
        interp.update(xs, ys)?;
        Ok(interp)
    }
}

impl Interpolation1D for BackwardFlatInterpolation {
    fn update(&mut self, xs: &[Real], ys: &[Real]) -> Result<()> {
        self.nodes.set(xs, ys, 2)?;
        self.primitives.clear();
        self.primitives.push(0.0);
        for i in 0..xs.len() - 1 {
            let last = self.primitives[i];
            self.primitives.push(last + (xs[i + 1] - xs[i]) * ys[i + 1]);
        }
        Ok(())
    }

    fn value(&self, x: Real) -> Real {
        let n = self.nodes.xs.len();
        if n == 0 {
            return Real::NAN;
        }
        if x <= self.nodes.xs[0] {
            return self.nodes.ys[0];
        }
        let i = self.nodes.locate(x);
        if x == self.nodes.xs[i] {
            self.nodes.ys[i]
        } else {
            self.nodes.ys[i + 1]
        }
    }

    fn primitive(&self, x: Real) -> Real {
        if self.primitives.is_empty() {
            return Real::NAN;
        }
        if x <= self.nodes.xs[0] {
            return (x - self.nodes.xs[0]) * self.nodes.ys[0];
        }
        let i = self.nodes.locate(x);
        self.primitives[i] + (x - self.nodes.xs[i]) * self.nodes.ys[i + 1]
    }

    fn x_min(&self) -> Real {
        self.nodes.x_min()
    }

    fn x_max(&self) -> Real {
        self.nodes.x_max()
    }
}

// ── Forward-flat ──────────────────────────────────────────────────────────────

/// Forward-flat (step) interpolation: on `[x[i], x[i+1])` the value is
/// `y[i]`; flat `y[n-1]` from the last node on.
#[derive(Debug, Clone, Default)]
pub struct ForwardFlatInterpolation {
    nodes: Nodes,
    primitives: Vec<Real>,
}

impl ForwardFlatInterpolation {
    /// Construct a forward-flat interpolation.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        let mut interp = Self::default();
        interp.update(xs, ys)?;
        Ok(interp)
    }
}

impl Interpolation1D for ForwardFlatInterpolation {
    fn update(&mut self, xs: &[Real], ys: &[Real]) -> Result<()> {
        self.nodes.set(xs, ys, 2)?;
        self.primitives.clear();
        self.primitives.push(0.0);
        for i in 0..xs.len() - 1 {
            let last = self.primitives[i];
            self.primitives.push(last + (xs[i + 1] - xs[i]) * ys[i]);
        }
        Ok(())
    }

    fn value(&self, x: Real) -> Real {
        let n = self.nodes.xs.len();
        if n == 0 {
            return Real::NAN;
        }
        if x >= self.nodes.xs[n - 1] {
            return self.nodes.ys[n - 1];
        }
        self.nodes.ys[self.nodes.locate(x)]
    }

    fn primitive(&self, x: Real) -> Real {
        let n = self.primitives.len();
        if n == 0 {
            return Real::NAN;
        }
        if x >= self.nodes.xs[n - 1] {
            return self.primitives[n - 1] + (x - self.nodes.xs[n - 1]) * self.nodes.ys[n - 1];
        }
        let i = self.nodes.locate(x);
        self.primitives[i] + (x - self.nodes.xs[i]) * self.nodes.ys[i]
    }

    fn x_min(&self) -> Real {
        self.nodes.x_min()
    }

    fn x_max(&self) -> Real {
        self.nodes.x_max()
    }
}

// ── Factories ─────────────────────────────────────────────────────────────────

/// Linear interpolation factory.
#[derive(Debug, Clone, Copy, Default)]
pub struct Linear;

impl Interpolator for Linear {
    fn interpolation(&self) -> Box<dyn Interpolation1D> {
        Box::new(LinearInterpolation::default())
    }
}

/// Log-linear interpolation factory.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLinear;

impl Interpolator for LogLinear {
    fn interpolation(&self) -> Box<dyn Interpolation1D> {
        Box::new(LogLinearInterpolation::default())
    }
}

/// Backward-flat interpolation factory.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackwardFlat;

impl Interpolator for BackwardFlat {
    fn interpolation(&self) -> Box<dyn Interpolation1D> {
        Box::new(BackwardFlatInterpolation::default())
    }
}

/// Forward-flat interpolation factory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardFlat;

impl Interpolator for ForwardFlat {
    fn interpolation(&self) -> Box<dyn Interpolation1D> {
        Box::new(ForwardFlatInterpolation::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn linear_interpolation() {
        let interp = LinearInterpolation::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 4.0]).unwrap();
        assert_abs_diff_eq!(interp.value(0.5), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(interp.value(1.5), 2.5, epsilon = 1e-12);
        // extends the last segment
        assert_abs_diff_eq!(interp.value(3.0), 7.0, epsilon = 1e-12);
        assert_abs_diff_eq!(interp.primitive(2.0), 0.5 + 2.5, epsilon = 1e-12);
    }

    #[test]
    fn log_linear_interpolation() {
        let interp =
            LogLinearInterpolation::new(&[0.0, 1.0], &[1.0, std::f64::consts::E]).unwrap();
        assert_abs_diff_eq!(interp.value(0.5), 0.5_f64.exp(), epsilon = 1e-12);
        assert_abs_diff_eq!(interp.primitive(1.0), std::f64::consts::E - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn log_linear_rejects_non_positive() {
        assert!(LogLinearInterpolation::new(&[0.0, 1.0], &[1.0, 0.0]).is_err());
    }

    #[test]
    fn backward_flat_interpolation() {
        let interp =
            BackwardFlatInterpolation::new(&[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_abs_diff_eq!(interp.value(-1.0), 1.0);
        assert_abs_diff_eq!(interp.value(0.5), 2.0);
        assert_abs_diff_eq!(interp.value(1.0), 2.0);
        assert_abs_diff_eq!(interp.value(1.5), 3.0);
        assert_abs_diff_eq!(interp.value(5.0), 3.0);
        assert_abs_diff_eq!(interp.primitive(1.5), 2.0 + 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(interp.primitive(3.0), 2.0 + 3.0 + 3.0, epsilon = 1e-12);
    }

    #[test]
    fn forward_flat_interpolation() {
        let interp =
            ForwardFlatInterpolation::new(&[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_abs_diff_eq!(interp.value(0.5), 1.0);
        assert_abs_diff_eq!(interp.value(1.5), 2.0);
        assert_abs_diff_eq!(interp.value(2.0), 3.0);
        assert_abs_diff_eq!(interp.primitive(2.5), 1.0 + 2.0 + 1.5, epsilon = 1e-12);
    }

    #[test]
    fn non_increasing_nodes_rejected() {
        let err = LinearInterpolation::new(&[0.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidNodeOrdering { index: 2, .. }));
        assert!(LinearInterpolation::new(&[0.0], &[1.0]).is_err());
        assert!(LinearInterpolation::new(&[0.0, 1.0], &[1.0]).is_err());
    }

    #[test]
    fn update_replaces_nodes() {
        let mut interp = Linear.interpolation();
        interp.update(&[0.0, 1.0], &[0.0, 1.0]).unwrap();
        assert_abs_diff_eq!(interp.value(0.5), 0.5);
        interp.update(&[0.0, 1.0, 2.0], &[0.0, 2.0, 2.0]).unwrap();
        assert_abs_diff_eq!(interp.value(0.5), 1.0);
        assert!(interp.is_in_range(2.0));
        assert!(!interp.is_in_range(2.1));
    }

    fn strictly_increasing() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
        prop::collection::vec((0.01f64..2.0, 0.001f64..0.2), 2..12).prop_map(|steps| {
            let mut x = 0.0;
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for (dx, y) in steps {
                xs.push(x);
                ys.push(y);
                x += dx;
            }
            (xs, ys)
        })
    }

    proptest! {
        #[test]
        fn schemes_reproduce_their_nodes((xs, ys) in strictly_increasing()) {
            for factory in [&Linear as &dyn Interpolator, &LogLinear, &BackwardFlat, &ForwardFlat] {
                let mut interp = factory.interpolation();
                interp.update(&xs, &ys).unwrap();
                for (x, y) in xs.iter().zip(&ys) {
                    prop_assert!((interp.value(*x) - y).abs() < 1e-12);
                }
                prop_assert!(interp.primitive(xs[0]).abs() < 1e-12);
            }
        }

        #[test]
        fn primitive_is_monotone_for_positive_values((xs, ys) in strictly_increasing()) {
            let mut interp = Linear.interpolation();
            interp.update(&xs, &ys).unwrap();
            let last = *xs.last().unwrap();
            let mut prev = interp.primitive(xs[0]);
            for k in 1..=20 {
                let p = interp.primitive(last * k as f64 / 20.0);
                prop_assert!(p >= prev - 1e-14);
                prev = p;
            }
        }
    }
}
