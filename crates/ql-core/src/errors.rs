//! Error types for quantlib-rs.
//!
//! A single `thiserror`-derived enum covers the whole library: the generic
//! precondition / runtime failures raised through the `ensure!`, `ensure_post!`
//! and `fail!` macros, plus the structured failures of the notification graph,
//! the 1-D solvers and the curve bootstrapper.

use thiserror::Error;

/// The top-level error type used throughout quantlib-rs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// General runtime error.
    #[error("{0}")]
    Runtime(String),

    /// Precondition violated.
    #[error("precondition not satisfied: {0}")]
    Precondition(String),

    /// Postcondition violated.
    #[error("postcondition not satisfied: {0}")]
    Postcondition(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Date-related error.
    #[error("date error: {0}")]
    Date(String),

    /// A handle was dereferenced while not linked to any object.
    #[error("empty handle cannot be dereferenced")]
    EmptyHandle,

    /// A quote was read while it held no valid value.
    #[error("invalid quote: {0}")]
    InvalidQuote(String),

    /// A lazy object was asked for its value while it was already
    /// recalculating, i.e. it (indirectly) observes itself.
    #[error("cyclic dependency: {0} requested its own value while recalculating")]
    CyclicDependency(String),

    /// A curve was queried beyond its last node without extrapolation.
    #[error("time ({time}) is past max curve time ({max_time}) and extrapolation is not allowed")]
    ExtrapolationNotAllowed {
        /// The requested time.
        time: f64,
        /// The largest time the curve covers.
        max_time: f64,
    },

    /// Pillar dates (or node abscissas) were not strictly increasing.
    #[error("invalid node ordering at index {index}: {current} does not follow {previous}")]
    InvalidNodeOrdering {
        /// Index of the offending node.
        index: usize,
        /// The node that precedes it.
        previous: String,
        /// The offending node.
        current: String,
    },

    /// A bracketed solver was given an interval that does not bracket a root.
    #[error("root not bracketed: f[{x_min}, {x_max}] -> [{f_min:e}, {f_max:e}]")]
    RootNotBracketed {
        /// Lower end of the interval.
        x_min: f64,
        /// Upper end of the interval.
        x_max: f64,
        /// Function value at `x_min`.
        f_min: f64,
        /// Function value at `x_max`.
        f_max: f64,
    },

    /// A solver ran out of function evaluations.
    #[error("exceeded {max_evaluations} function evaluations, last root estimate {last_root}")]
    MaxEvaluationsExceeded {
        /// The configured evaluation budget.
        max_evaluations: usize,
        /// The root estimate when the budget was exhausted.
        last_root: f64,
    },

    /// A derivative-based step was attempted where the derivative vanishes.
    #[error("derivative vanishes at x = {x}")]
    ZeroDerivative {
        /// The abscissa where the derivative is (numerically) zero.
        x: f64,
    },

    /// Root finding for one pillar of a piecewise curve failed.
    #[error(
        "bootstrap failed for helper {helper_index} (pillar {pillar}): \
         search interval [{x_min}, {x_max}], last residual {last_residual:e}, \
         accuracy {accuracy:e}: {source}"
    )]
    BootstrapFailure {
        /// Index (in pillar order) of the helper whose solve failed.
        helper_index: usize,
        /// Pillar date of that helper.
        pillar: String,
        /// Lower end of the last search interval.
        x_min: f64,
        /// Upper end of the last search interval.
        x_max: f64,
        /// Last residual observed by the solver.
        last_residual: f64,
        /// Requested accuracy.
        accuracy: f64,
        /// The underlying solver or helper error.
        source: Box<Error>,
    },
}

/// Shorthand `Result` type used throughout quantlib-rs.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Returns `Err(Error::Precondition(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use ql_core::{ensure, errors::Error};
/// fn positive(x: f64) -> ql_core::errors::Result<f64> {
///     ensure!(x > 0.0, "x must be positive, got {x}");
///     Ok(x)
/// }
/// assert!(positive(1.0).is_ok());
/// assert!(positive(-1.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::Precondition(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::Postcondition(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use ql_core::{ensure_post, errors::Error};
/// fn compute(x: f64) -> ql_core::errors::Result<f64> {
///     let result = x * 2.0;
///     ensure_post!(result > 0.0, "result must be positive, got {result}");
///     Ok(result)
/// }
/// assert!(compute(1.0).is_ok());
/// assert!(compute(-1.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure_post {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::Postcondition(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::Runtime(...))` immediately.
///
/// # Example
/// ```
/// use ql_core::{fail, errors::Error};
/// fn always_err() -> ql_core::errors::Result<()> {
///     fail!("something went wrong");
/// }
/// assert!(always_err().is_err());
/// ```
#[macro_export]
macro_rules! fail {
    ($($msg:tt)*) => {
        return Err($crate::errors::Error::Runtime(format!($($msg)*)))
    };
}
