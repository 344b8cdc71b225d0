//! `BootstrapHelper` — the calibration residual contract used by the
//! piecewise bootstrapper.
//!
//! A helper couples a market quote with the pricing formula of the
//! instrument it was quoted on.  Given a trial curve `C`, it prices the
//! instrument and reports how far the implied quote is from the market one.
//! Helpers hold no cache: every call re-reads the quote and reprices.

use ql_core::errors::Result;
use ql_core::patterns::observable::Observable;
use ql_core::{Handle, Real};
use ql_quotes::{quote_value, Quote};
use ql_time::Date;

/// A market instrument constraining a curve of type `C` at its pillar date.
pub trait BootstrapHelper<C: ?Sized>: std::fmt::Debug {
    /// Handle to the market quote.
    fn quote(&self) -> &Handle<dyn Quote>;

    /// The date up to which this helper constrains the curve.
    fn pillar_date(&self) -> Date;

    /// The quote implied by `curve`.
    fn implied_quote(&self, curve: &C) -> Result<Real>;

    /// Implied minus market quote.
    fn residual(&self, curve: &C) -> Result<Real> {
        Ok(self.implied_quote(curve)? - quote_value(self.quote())?)
    }

    /// Everything a curve built on this helper must observe.
    fn observables(&self) -> Vec<&dyn Observable> {
        vec![self.quote() as &dyn Observable]
    }
}
