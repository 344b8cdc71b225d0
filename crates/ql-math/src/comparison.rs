//! Floating-point comparison utilities.

use ql_core::Real;

/// Default epsilon for absolute comparisons.
pub const EPSILON: Real = 1e-10;

/// Return `true` if `|a - b| <= epsilon`.
#[inline]
pub fn close_abs(a: Real, b: Real, epsilon: Real) -> bool {
    (a - b).abs() <= epsilon
}

/// Return `true` if `a` and `b` agree to within 42 ulps (relative to both).
///
/// Against zero this degenerates to `|a| < (42·ε)²`, i.e. "exactly zero for
/// all practical purposes", which is what the solvers use to stop early.
#[inline]
pub fn close(a: Real, b: Real) -> bool {
    close_n(a, b, 42)
}

/// Return `true` if `|a - b|` is within `n` ulps of *both* `a` and `b`.
#[inline]
pub fn close_n(a: Real, b: Real, n: u32) -> bool {
    if a == b {
        return true;
    }
    let diff = (a - b).abs();
    let tolerance = n as Real * f64::EPSILON;
    if a * b == 0.0 {
        return diff < tolerance * tolerance;
    }
    diff <= tolerance * a.abs() && diff <= tolerance * b.abs()
}

/// Return `true` if `|a - b|` is within `n` ulps of *either* `a` or `b`.
#[inline]
pub fn close_enough(a: Real, b: Real, n: u32) -> bool {
    if a == b {
        return true;
    }
    let diff = (a - b).abs();
    let tolerance = n as Real * f64::EPSILON;
    if a * b == 0.0 {
        return diff < tolerance * tolerance;
    }
    diff <= tolerance * a.abs() || diff <= tolerance * b.abs()
}
