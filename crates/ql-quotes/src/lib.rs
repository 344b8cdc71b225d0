//! # ql-quotes
//!
//! Observable market quotes: the leaves of the notification graph.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// `Quote` trait and concrete implementations.
pub mod quote;

pub use quote::{quote_value, CompositeQuote, DerivedQuote, Quote, SimpleQuote};
