//! Compounding conventions and the conversions between a rate and the
//! compound factor it implies over a time span.
//!
//! Compounded rates use an annual frequency.

use crate::errors::{Error, Result};
use crate::{Rate, Real, Time};

/// How interest is compounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Compounding {
    /// Simple interest: `1 + r·t`
    Simple,
    /// Compounded interest: `(1 + r)^t`
    Compounded,
    /// Continuously compounded: `e^(r·t)`
    Continuous,
    /// Simple interest up to one year, compounded thereafter.
    SimpleThenCompounded,
    /// Compounded up to one year, simple thereafter.
    CompoundedThenSimple,
}

impl Compounding {
    /// Growth factor of one unit invested at `rate` for `t` years.
    pub fn compound_factor(self, rate: Rate, t: Time) -> Result<Real> {
        if t < 0.0 {
            return Err(Error::Precondition(format!(
                "negative time ({t}) not allowed"
            )));
        }
        let simple = || 1.0 + rate * t;
        let compounded = || (1.0 + rate).powf(t);
        Ok(match self {
            Compounding::Simple => simple(),
            Compounding::Compounded => compounded(),
            Compounding::Continuous => (rate * t).exp(),
            Compounding::SimpleThenCompounded if t <= 1.0 => simple(),
            Compounding::SimpleThenCompounded => compounded(),
            Compounding::CompoundedThenSimple if t <= 1.0 => compounded(),
            Compounding::CompoundedThenSimple => simple(),
        })
    }

    /// The rate that turns one unit into `compound` units over `t` years.
    pub fn implied_rate(self, compound: Real, t: Time) -> Result<Rate> {
        if compound <= 0.0 {
            return Err(Error::Precondition(format!(
                "positive compound factor required, got {compound}"
            )));
        }
        if t <= 0.0 {
            return Err(Error::Precondition(format!(
                "positive time required, got {t}"
            )));
        }
        if compound == 1.0 {
            return Ok(0.0);
        }
        let simple = || (compound - 1.0) / t;
        let compounded = || compound.powf(1.0 / t) - 1.0;
        Ok(match self {
            Compounding::Simple => simple(),
            Compounding::Compounded => compounded(),
            Compounding::Continuous => compound.ln() / t,
            Compounding::SimpleThenCompounded if t <= 1.0 => simple(),
            Compounding::SimpleThenCompounded => compounded(),
            Compounding::CompoundedThenSimple if t <= 1.0 => compounded(),
            Compounding::CompoundedThenSimple => simple(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn implied_rate_inverts_compound_factor() {
        for c in [
            Compounding::Simple,
            Compounding::Compounded,
            Compounding::Continuous,
            Compounding::SimpleThenCompounded,
            Compounding::CompoundedThenSimple,
        ] {
            for t in [0.25, 1.0, 3.5] {
                let f = c.compound_factor(0.04, t).unwrap();
                assert_abs_diff_eq!(c.implied_rate(f, t).unwrap(), 0.04, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn continuous_factor() {
        let f = Compounding::Continuous.compound_factor(0.05, 2.0).unwrap();
        assert_abs_diff_eq!(f, 0.1_f64.exp(), epsilon = 1e-15);
    }

    #[test]
    fn negative_time_rejected() {
        assert!(Compounding::Simple.compound_factor(0.05, -1.0).is_err());
    }
}
