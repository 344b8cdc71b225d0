//! Rate helpers for yield-curve bootstrapping.
//!
//! A *rate helper* encapsulates a market quote (a deposit rate, FRA rate,
//! futures price or par swap rate) together with the conventions needed to
//! reprice it off a yield curve.  The bootstrapper adjusts the curve node at
//! each helper's pillar until the implied quote matches the market.

use std::fmt;

use crate::bootstrap_helper::BootstrapHelper;
use crate::yield_term_structure::YieldTermStructure;
use ql_core::errors::Result;
use ql_core::{Handle, Real};
use ql_quotes::Quote;
use ql_time::{Date, DayCounter, TimeUnit};

/// Simple forward rate between two dates off `curve`.
fn simple_forward(
    curve: &dyn YieldTermStructure,
    start: Date,
    end: Date,
    day_counter: &dyn DayCounter,
) -> Result<Real> {
    let tau = day_counter.year_fraction(start, end);
    ql_core::ensure!(tau > 0.0, "non-positive accrual period {start} to {end}");
    let df_start = curve.discount(start)?;
    let df_end = curve.discount(end)?;
    Ok((df_start / df_end - 1.0) / tau)
}

// ── DepositRateHelper ─────────────────────────────────────────────────────────

/// A deposit (money-market) rate helper.
///
/// Constrains the curve at the deposit's maturity date.  The implied quote is
/// the simple rate over the `[start, maturity]` period.
pub struct DepositRateHelper {
    quote: Handle<dyn Quote>,
    start_date: Date,
    maturity_date: Date,
    day_counter: Box<dyn DayCounter>,
}

impl DepositRateHelper {
    /// Create a deposit rate helper from explicit start and maturity dates.
    pub fn new(
        quote: Handle<dyn Quote>,
        start_date: Date,
        maturity_date: Date,
        day_counter: impl DayCounter + 'static,
    ) -> Result<Self> {
        ql_core::ensure!(
            start_date < maturity_date,
            "deposit start ({start_date}) must precede maturity ({maturity_date})"
        );
        Ok(Self {
            quote,
            start_date,
            maturity_date,
            day_counter: Box::new(day_counter),
        })
    }

    /// Create a deposit starting on `start_date` and running for `length`
    /// units.
    pub fn with_tenor(
        quote: Handle<dyn Quote>,
        start_date: Date,
        length: i32,
        unit: TimeUnit,
        day_counter: impl DayCounter + 'static,
    ) -> Result<Self> {
        let maturity = start_date.advance(length, unit)?;
        Self::new(quote, start_date, maturity, day_counter)
    }

    /// The start date of the deposit.
    pub fn start_date(&self) -> Date {
        self.start_date
    }

    /// The maturity date of the deposit.
    pub fn maturity_date(&self) -> Date {
        self.maturity_date
    }
}

impl BootstrapHelper<dyn YieldTermStructure> for DepositRateHelper {
    fn quote(&self) -> &Handle<dyn Quote> {
        &self.quote
    }

    fn pillar_date(&self) -> Date {
        self.maturity_date
    }

    fn implied_quote(&self, curve: &dyn YieldTermStructure) -> Result<Real> {
        simple_forward(
            curve,
            self.start_date,
            self.maturity_date,
            self.day_counter.as_ref(),
        )
    }
}

impl fmt::Debug for DepositRateHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepositRateHelper")
            .field("start_date", &self.start_date)
            .field("maturity_date", &self.maturity_date)
            .field("day_counter", &self.day_counter.name())
            .finish()
    }
}

// ── FraRateHelper ─────────────────────────────────────────────────────────────

/// A forward-rate-agreement (FRA) rate helper.
///
/// Constrains the curve at the FRA maturity date.  The implied quote is the
/// simple forward rate between the FRA's value date and maturity.
pub struct FraRateHelper {
    quote: Handle<dyn Quote>,
    value_date: Date,
    maturity_date: Date,
    day_counter: Box<dyn DayCounter>,
}

impl FraRateHelper {
    /// Create a FRA rate helper from explicit value and maturity dates.
    pub fn new(
        quote: Handle<dyn Quote>,
        value_date: Date,
        maturity_date: Date,
        day_counter: impl DayCounter + 'static,
    ) -> Result<Self> {
        ql_core::ensure!(
            value_date < maturity_date,
            "FRA value date ({value_date}) must precede maturity ({maturity_date})"
        );
        Ok(Self {
            quote,
            value_date,
            maturity_date,
            day_counter: Box::new(day_counter),
        })
    }

    /// Create a FRA from month offsets counted from `spot`.
    pub fn from_months(
        quote: Handle<dyn Quote>,
        spot: Date,
        months_to_start: i32,
        months_to_end: i32,
        day_counter: impl DayCounter + 'static,
    ) -> Result<Self> {
        let value_date = spot.advance(months_to_start, TimeUnit::Months)?;
        let maturity_date = spot.advance(months_to_end, TimeUnit::Months)?;
        Self::new(quote, value_date, maturity_date, day_counter)
    }

    /// The FRA value (start) date.
    pub fn value_date(&self) -> Date {
        self.value_date
    }

    /// The FRA maturity (end) date.
    pub fn maturity_date(&self) -> Date {
        self.maturity_date
    }
}

impl BootstrapHelper<dyn YieldTermStructure> for FraRateHelper {
    fn quote(&self) -> &Handle<dyn Quote> {
        &self.quote
    }

    fn pillar_date(&self) -> Date {
        self.maturity_date
    }

    fn implied_quote(&self, curve: &dyn YieldTermStructure) -> Result<Real> {
        simple_forward(
            curve,
            self.value_date,
            self.maturity_date,
            self.day_counter.as_ref(),
        )
    }
}

impl fmt::Debug for FraRateHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FraRateHelper")
            .field("value_date", &self.value_date)
            .field("maturity_date", &self.maturity_date)
            .field("day_counter", &self.day_counter.name())
            .finish()
    }
}

// ── FuturesRateHelper ─────────────────────────────────────────────────────────

/// An interest-rate-futures helper (e.g. Euribor futures).
///
/// The quote is a price (`100 - rate` in percent).  The implied price is
/// `100 * (1 - (forward + convexity_adjustment))` with `forward` the simple
/// forward rate over `[value_date, maturity_date]`.
pub struct FuturesRateHelper {
    quote: Handle<dyn Quote>,
    value_date: Date,
    maturity_date: Date,
    day_counter: Box<dyn DayCounter>,
    convexity_adjustment: Real,
}

impl FuturesRateHelper {
    /// Create a futures helper.
    pub fn new(
        price: Handle<dyn Quote>,
        value_date: Date,
        maturity_date: Date,
        day_counter: impl DayCounter + 'static,
        convexity_adjustment: Real,
    ) -> Result<Self> {
        ql_core::ensure!(
            value_date < maturity_date,
            "futures value date ({value_date}) must precede maturity ({maturity_date})"
        );
        Ok(Self {
            quote: price,
            value_date,
            maturity_date,
            day_counter: Box::new(day_counter),
            convexity_adjustment,
        })
    }

    /// The convexity adjustment.
    pub fn convexity_adjustment(&self) -> Real {
        self.convexity_adjustment
    }
}

impl BootstrapHelper<dyn YieldTermStructure> for FuturesRateHelper {
    fn quote(&self) -> &Handle<dyn Quote> {
        &self.quote
    }

    fn pillar_date(&self) -> Date {
        self.maturity_date
    }

    fn implied_quote(&self, curve: &dyn YieldTermStructure) -> Result<Real> {
        let forward = simple_forward(
            curve,
            self.value_date,
            self.maturity_date,
            self.day_counter.as_ref(),
        )?;
        Ok(100.0 * (1.0 - (forward + self.convexity_adjustment)))
    }
}

impl fmt::Debug for FuturesRateHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuturesRateHelper")
            .field("value_date", &self.value_date)
            .field("maturity_date", &self.maturity_date)
            .field("convexity_adjustment", &self.convexity_adjustment)
            .finish()
    }
}

// ── SwapRateHelper ────────────────────────────────────────────────────────────

/// A par-swap rate helper.
///
/// Constrains the curve at the swap's maturity date.  The floating leg is
/// valued off the same curve, so the implied quote is the par rate
/// `(P(start) - P(end)) / Σ τ_i P(t_i)` over the fixed-leg payment dates.
pub struct SwapRateHelper {
    quote: Handle<dyn Quote>,
    /// Fixed-leg dates including start and end.
    fixed_dates: Vec<Date>,
    fixed_day_counter: Box<dyn DayCounter>,
}

impl SwapRateHelper {
    /// Create a swap with an annual fixed leg running `years` years from
    /// `start_date`.
    pub fn new(
        quote: Handle<dyn Quote>,
        start_date: Date,
        years: i32,
        fixed_day_counter: impl DayCounter + 'static,
    ) -> Result<Self> {
        Self::with_fixed_period(quote, start_date, 12 * years, 12, fixed_day_counter)
    }

    /// Create a swap running `tenor_months` from `start_date` with a fixed
    /// payment every `period_months`.
    pub fn with_fixed_period(
        quote: Handle<dyn Quote>,
        start_date: Date,
        tenor_months: i32,
        period_months: i32,
        fixed_day_counter: impl DayCounter + 'static,
    ) -> Result<Self> {
        ql_core::ensure!(
            period_months > 0 && tenor_months > 0 && tenor_months % period_months == 0,
            "tenor {tenor_months}M is not a positive multiple of the fixed period {period_months}M"
        );
        let fixed_dates = (0..=tenor_months / period_months)
            .map(|k| start_date.advance(k * period_months, TimeUnit::Months))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            quote,
            fixed_dates,
            fixed_day_counter: Box::new(fixed_day_counter),
        })
    }

    /// The fixed-leg dates, start date first.
    pub fn fixed_dates(&self) -> &[Date] {
        &self.fixed_dates
    }
}

impl BootstrapHelper<dyn YieldTermStructure> for SwapRateHelper {
    fn quote(&self) -> &Handle<dyn Quote> {
        &self.quote
    }

    fn pillar_date(&self) -> Date {
        // at least two dates by construction
        self.fixed_dates[self.fixed_dates.len() - 1]
    }

    fn implied_quote(&self, curve: &dyn YieldTermStructure) -> Result<Real> {
        let start = self.fixed_dates[0];
        let end = self.pillar_date();
        let mut annuity = 0.0;
        for period in self.fixed_dates.windows(2) {
            let delta = self.fixed_day_counter.year_fraction(period[0], period[1]);
            annuity += delta * curve.discount(period[1])?;
        }
        ql_core::ensure!(annuity.abs() > 1e-16, "vanishing annuity for swap ending {end}");
        Ok((curve.discount(start)? - curve.discount(end)?) / annuity)
    }
}

impl fmt::Debug for SwapRateHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapRateHelper")
            .field("fixed_dates", &self.fixed_dates)
            .field("fixed_day_counter", &self.fixed_day_counter.name())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat_forward::FlatForward;
    use approx::assert_abs_diff_eq;
    use ql_quotes::SimpleQuote;
    use ql_time::{Actual360, Actual365Fixed};

    fn quote(value: Real) -> Handle<dyn Quote> {
        Handle::<dyn Quote>::new(SimpleQuote::shared(value))
    }

    fn today() -> Date {
        Date::from_ymd(2025, 1, 2).unwrap()
    }

    #[test]
    fn deposit_on_flat_curve() {
        let curve = FlatForward::continuous(today(), 0.05, Actual365Fixed);
        let helper =
            DepositRateHelper::with_tenor(quote(0.05), today(), 6, TimeUnit::Months, Actual360)
                .unwrap();
        let days = (helper.maturity_date() - today()) as Real;
        let expected = ((0.05 * days / 365.0).exp() - 1.0) / (days / 360.0);
        assert_abs_diff_eq!(helper.implied_quote(&*curve).unwrap(), expected, epsilon = 1e-14);
        assert_abs_diff_eq!(
            helper.residual(&*curve).unwrap(),
            expected - 0.05,
            epsilon = 1e-14
        );
    }

    #[test]
    fn fra_on_flat_curve() {
        let curve = FlatForward::continuous(today(), 0.03, Actual365Fixed);
        let helper =
            FraRateHelper::from_months(quote(0.03), today(), 3, 6, Actual365Fixed).unwrap();
        let tau = Actual365Fixed.year_fraction(helper.value_date(), helper.maturity_date());
        assert_abs_diff_eq!(
            helper.implied_quote(&*curve).unwrap(),
            ((0.03 * tau).exp() - 1.0) / tau,
            epsilon = 1e-14
        );
    }

    #[test]
    fn futures_price() {
        let curve = FlatForward::continuous(today(), 0.0, Actual365Fixed);
        let start = today().advance(3, TimeUnit::Months).unwrap();
        let end = today().advance(6, TimeUnit::Months).unwrap();
        let helper = FuturesRateHelper::new(quote(99.0), start, end, Actual360, 0.001).unwrap();
        assert_abs_diff_eq!(helper.implied_quote(&*curve).unwrap(), 99.9, epsilon = 1e-12);
    }

    #[test]
    fn swap_par_rate_on_flat_curve() {
        let rate: Real = 0.04;
        let curve = FlatForward::continuous(today(), rate, Actual365Fixed);
        let helper = SwapRateHelper::new(quote(0.04), today(), 5, Actual365Fixed).unwrap();
        assert_eq!(helper.fixed_dates().len(), 6);
        assert_eq!(helper.pillar_date(), Date::from_ymd(2030, 1, 2).unwrap());

        let mut annuity = 0.0;
        for w in helper.fixed_dates().windows(2) {
            let tau = Actual365Fixed.year_fraction(w[0], w[1]);
            annuity += tau * curve.discount(w[1]).unwrap();
        }
        let expected = (1.0 - curve.discount(helper.pillar_date()).unwrap()) / annuity;
        assert_abs_diff_eq!(helper.implied_quote(&*curve).unwrap(), expected, epsilon = 1e-14);
        // close to the annually compounded equivalent of the flat rate
        assert!((helper.implied_quote(&*curve).unwrap() - (rate.exp() - 1.0)).abs() < 1e-3);
    }

    #[test]
    fn invalid_dates_are_rejected() {
        assert!(DepositRateHelper::new(quote(0.01), today(), today(), Actual360).is_err());
        let uneven = SwapRateHelper::with_fixed_period(quote(0.01), today(), 18, 12, Actual360);
        assert!(uneven.is_err());
    }

    #[test]
    fn helpers_observe_their_quote() {
        let helper =
            DepositRateHelper::with_tenor(quote(0.05), today(), 1, TimeUnit::Years, Actual360)
                .unwrap();
        assert_eq!(helper.observables().len(), 1);
    }
}
