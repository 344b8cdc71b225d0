//! Credit helpers for default-curve bootstrapping.

use std::fmt;

use crate::bootstrap_helper::BootstrapHelper;
use crate::default_probability_term_structure::DefaultProbabilityTermStructure;
use ql_core::errors::Result;
use ql_core::{Handle, Real};
use ql_quotes::Quote;
use ql_time::{Date, TimeUnit};

/// A credit spread on a risky zero-coupon claim.
///
/// The claim pays 1 at maturity if no default occurred and the recovery
/// rate `R` otherwise, so its value relative to the riskless claim is
/// `S(T) + R (1 - S(T))`.  The implied quote is the continuously-compounded
/// spread `-ln(S(T) + R (1 - S(T))) / T`.
pub struct CreditSpreadHelper {
    quote: Handle<dyn Quote>,
    maturity_date: Date,
    recovery_rate: Real,
}

impl CreditSpreadHelper {
    /// Create a spread helper maturing on `maturity_date`.
    pub fn new(
        quote: Handle<dyn Quote>,
        maturity_date: Date,
        recovery_rate: Real,
    ) -> Result<Self> {
        ql_core::ensure!(
            (0.0..1.0).contains(&recovery_rate),
            "recovery rate ({recovery_rate}) must lie in [0, 1)"
        );
        Ok(Self {
            quote,
            maturity_date,
            recovery_rate,
        })
    }

    /// Create a spread helper maturing `years` years after `start`.
    pub fn with_tenor(
        quote: Handle<dyn Quote>,
        start: Date,
        years: i32,
        recovery_rate: Real,
    ) -> Result<Self> {
        Self::new(quote, start.advance(years, TimeUnit::Years)?, recovery_rate)
    }

    /// The recovery rate.
    pub fn recovery_rate(&self) -> Real {
        self.recovery_rate
    }
}

impl BootstrapHelper<dyn DefaultProbabilityTermStructure> for CreditSpreadHelper {
    fn quote(&self) -> &Handle<dyn Quote> {
        &self.quote
    }

    fn pillar_date(&self) -> Date {
        self.maturity_date
    }

    fn implied_quote(&self, curve: &dyn DefaultProbabilityTermStructure) -> Result<Real> {
        let t = curve.time_from_reference(self.maturity_date)?;
        ql_core::ensure!(t > 0.0, "maturity {} not after the reference date", self.maturity_date);
        let survival = curve.survival_probability(self.maturity_date)?;
        let value = survival + self.recovery_rate * (1.0 - survival);
        Ok(-value.ln() / t)
    }
}

impl fmt::Debug for CreditSpreadHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreditSpreadHelper")
            .field("maturity_date", &self.maturity_date)
            .field("recovery_rate", &self.recovery_rate)
            .finish()
    }
}
