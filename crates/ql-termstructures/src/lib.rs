//! # ql-termstructures
//!
//! Yield and default-probability term structures, and the machinery that
//! bootstraps piecewise curves from market helpers.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// `TermStructure` — base trait for all term structures.
pub mod term_structure;

/// `YieldTermStructure` — yield / interest-rate term structures.
pub mod yield_term_structure;

/// `FlatForward` — constant forward-rate yield curve.
pub mod flat_forward;

/// `DefaultProbabilityTermStructure` — credit default-probability curves.
pub mod default_probability_term_structure;

/// `BootstrapHelper` — calibration residual contract.
pub mod bootstrap_helper;

/// Node semantics for piecewise curves (discount, zero, forward, hazard,
/// survival).
pub mod bootstrap_traits;

/// Sequential pillar-by-pillar bootstrap.
pub mod bootstrap;

/// `PiecewiseCurve` — lazily bootstrapped yield and default curves.
pub mod piecewise_curve;

/// Deposit, FRA, futures and swap rate helpers.
pub mod rate_helpers;

/// Credit-spread helpers for default curves.
pub mod credit_helpers;

/// `PiecewiseZeroSpreadedTermStructure` — base curve plus zero-rate spreads.
pub mod zero_spreaded_term_structure;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use bootstrap::{bootstrap, BootstrapConfig};
pub use bootstrap_helper::BootstrapHelper;
pub use bootstrap_traits::{
    CurveTraits, Discount, ForwardRate, HazardRate, NodeCurve, SurvivalProbability, ZeroYield,
};
pub use credit_helpers::CreditSpreadHelper;
pub use default_probability_term_structure::{DefaultProbabilityTermStructure, FlatHazardRate};
pub use flat_forward::FlatForward;
pub use piecewise_curve::{PiecewiseCurve, PiecewiseDefaultCurve, PiecewiseYieldCurve};
pub use rate_helpers::{DepositRateHelper, FraRateHelper, FuturesRateHelper, SwapRateHelper};
pub use term_structure::{ReferenceDate, TermStructure};
pub use yield_term_structure::YieldTermStructure;
pub use zero_spreaded_term_structure::PiecewiseZeroSpreadedTermStructure;
