//! # ql-math
//!
//! Mathematical utilities used by the curve machinery: floating-point
//! comparison, the 1D interpolation contract with its local schemes, and the
//! 1D root-finding solver family.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Floating-point comparison utilities.
pub mod comparison;

/// 1D interpolation schemes.
pub mod interpolations;

/// 1D root-finding solvers.
pub mod solvers1d;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use comparison::{close, close_enough};
pub use interpolations::{
    BackwardFlat, ForwardFlat, Interpolation1D, Interpolator, Linear, LogLinear,
};
pub use solvers1d::{
    Bisection, Brent, FalsePosition, Newton, NewtonSafe, ObjectiveFunction, Ridder, Secant,
    Solver1D, SolverConfig, WithDerivative,
};
