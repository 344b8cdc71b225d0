//! `YieldTermStructure` — yield / interest-rate term structures.
//!
//! This module defines the `YieldTermStructure` trait together with the three
//! fundamental quantities any yield curve must provide:
//!
//! * **discount factor** — `P(0,t)`
//! * **zero rate** — the zero rate for maturity *t* under a compounding
//!   convention
//! * **forward rate** — the forward rate between two times
//!
//! Implementors provide [`discount_impl`](YieldTermStructure::discount_impl);
//! everything else is derived from it.

use crate::term_structure::TermStructure;
use ql_core::errors::Result;
use ql_core::{Compounding, DiscountFactor, Rate, Real, Time};
use ql_time::Date;

/// Small time step used for instantaneous rates.
const DT: Real = 1.0e-4;

/// A yield (interest-rate) term structure.
pub trait YieldTermStructure: TermStructure {
    /// Discount factor for time `t`, without range checks.
    fn discount_impl(&self, t: Time) -> Result<DiscountFactor>;

    // ── Public interface ─────────────────────────────────────────────────

    /// Discount factor for a date.
    fn discount(&self, date: Date) -> Result<DiscountFactor> {
        self.discount_time(self.time_from_reference(date)?, false)
    }

    /// Discount factor for a time.
    fn discount_time(&self, t: Time, extrapolate: bool) -> Result<DiscountFactor> {
        self.check_range(t, extrapolate)?;
        self.discount_impl(t)
    }

    /// Zero rate between the reference date and `date`.
    fn zero_rate(&self, date: Date, compounding: Compounding) -> Result<Rate> {
        self.zero_rate_time(self.time_from_reference(date)?, compounding, false)
    }

    /// Zero rate for time `t`.
    ///
    /// At `t = 0` the rate over a short period `DT` is returned.
    fn zero_rate_time(&self, t: Time, compounding: Compounding, extrapolate: bool) -> Result<Rate> {
        let t = if t == 0.0 { DT } else { t };
        let compound = 1.0 / self.discount_time(t, extrapolate)?;
        compounding.implied_rate(compound, t)
    }

    /// Forward rate between two dates.
    fn forward_rate(&self, d1: Date, d2: Date, compounding: Compounding) -> Result<Rate> {
        ql_core::ensure!(d1 <= d2, "{d2} later than {d1}");
        let t1 = self.time_from_reference(d1)?;
        let t2 = self.time_from_reference(d2)?;
        self.forward_rate_time(t1, t2, compounding, false)
    }

    /// Forward rate between two times; instantaneous if `t1 == t2`.
    fn forward_rate_time(
        &self,
        t1: Time,
        t2: Time,
        compounding: Compounding,
        extrapolate: bool,
    ) -> Result<Rate> {
        ql_core::ensure!(t2 >= t1, "t2 ({t2}) < t1 ({t1})");
        let (t1, t2) = if t2 == t1 {
            let start = (t1 - DT / 2.0).max(0.0);
            (start, start + DT)
        } else {
            (t1, t2)
        };
        self.check_range(t2, extrapolate)?;
        let compound = self.discount_impl(t1)? / self.discount_impl(t2)?;
        compounding.implied_rate(compound, t2 - t1)
    }
}
