//! `Quote` trait and its observable implementations.
//!
//! A quote is the leaf of the notification graph: setting a [`SimpleQuote`]
//! notifies every handle linked to it, and through them every curve built on
//! it.  [`DerivedQuote`] and [`CompositeQuote`] are both observers (of the
//! handles they read) and observables.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use ql_core::errors::{Error, Result};
use ql_core::patterns::observable::{register_with, Observable, ObservableImpl, Observer};
use ql_core::{Handle, Real};

/// A market-observable value.
pub trait Quote: Observable + fmt::Debug {
    /// Return the current value.
    ///
    /// Returns `None` if the quote is not currently valid / set.
    fn value(&self) -> Option<Real>;

    /// Return `true` if the quote is currently valid.
    fn is_valid(&self) -> bool {
        self.value().is_some()
    }

    /// The current value, or [`Error::InvalidQuote`] if there is none.
    fn checked_value(&self) -> Result<Real> {
        self.value()
            .ok_or_else(|| Error::InvalidQuote(format!("{self:?} holds no value")))
    }
}

/// Read the value behind a quote handle.
///
/// Fails with [`Error::EmptyHandle`] if the handle is unlinked and
/// [`Error::InvalidQuote`] if the quote has no value.
pub fn quote_value(handle: &Handle<dyn Quote>) -> Result<Real> {
    handle.current_link()?.checked_value()
}

// ── SimpleQuote ──────────────────────────────────────────────────────────────

/// A simple, mutable market quote.
#[derive(Default)]
pub struct SimpleQuote {
    value: Cell<Option<Real>>,
    observable: ObservableImpl,
}

impl SimpleQuote {
    /// Create a new quote with the given value.
    pub fn new(value: Real) -> Self {
        Self {
            value: Cell::new(Some(value)),
            observable: ObservableImpl::new(),
        }
    }

    /// Create an empty (invalid) quote.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a new shared quote, ready to be linked into handles.
    pub fn shared(value: Real) -> Rc<Self> {
        Rc::new(Self::new(value))
    }

    /// Set a new value and notify observers if it changed.
    ///
    /// Returns the difference between the new and the old value (zero if the
    /// quote was empty).
    pub fn set_value(&self, value: Real) -> Result<Real> {
        let old = self.value.get();
        if old == Some(value) {
            return Ok(0.0);
        }
        self.value.set(Some(value));
        self.notify_observers()?;
        Ok(old.map_or(0.0, |o| value - o))
    }

    /// Clear the value, making the quote invalid.
    pub fn reset(&self) -> Result<()> {
        if self.value.take().is_some() {
            self.notify_observers()?;
        }
        Ok(())
    }
}

impl Observable for SimpleQuote {
    fn observable_impl(&self) -> &ObservableImpl {
        &self.observable
    }
}

impl Quote for SimpleQuote {
    fn value(&self) -> Option<Real> {
        self.value.get()
    }
}

impl fmt::Debug for SimpleQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleQuote")
            .field("value", &self.value.get())
            .finish()
    }
}

// ── DerivedQuote ─────────────────────────────────────────────────────────────

/// A quote computed from another quote through a unary function.
pub struct DerivedQuote<F> {
    element: Handle<dyn Quote>,
    func: F,
    observable: ObservableImpl,
}

impl<F> DerivedQuote<F>
where
    F: Fn(Real) -> Real + 'static,
{
    /// Create the quote and register it with `element`.
    pub fn new(element: Handle<dyn Quote>, func: F) -> Rc<Self> {
        let quote = Rc::new(Self {
            element,
            func,
            observable: ObservableImpl::new(),
        });
        register_with(&quote, &quote.element);
        quote
    }
}

impl<F> Observer for DerivedQuote<F> {
    fn update(&self) -> Result<()> {
        self.notify_observers()
    }
}

impl<F> Observable for DerivedQuote<F> {
    fn observable_impl(&self) -> &ObservableImpl {
        &self.observable
    }
}

impl<F> Quote for DerivedQuote<F>
where
    F: Fn(Real) -> Real,
{
    fn value(&self) -> Option<Real> {
        let v = self.element.current_link().ok()?.value()?;
        Some((self.func)(v))
    }
}

impl<F> fmt::Debug for DerivedQuote<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedQuote")
            .field("element", &self.element)
            .finish_non_exhaustive()
    }
}

// ── CompositeQuote ───────────────────────────────────────────────────────────

/// A quote combining two quotes through a binary function.
pub struct CompositeQuote<F> {
    element1: Handle<dyn Quote>,
    element2: Handle<dyn Quote>,
    func: F,
    observable: ObservableImpl,
}

impl<F> CompositeQuote<F>
where
    F: Fn(Real, Real) -> Real + 'static,
{
    /// Create the quote and register it with both elements.
    pub fn new(element1: Handle<dyn Quote>, element2: Handle<dyn Quote>, func: F) -> Rc<Self> {
        let quote = Rc::new(Self {
            element1,
            element2,
            func,
            observable: ObservableImpl::new(),
        });
        register_with(&quote, &quote.element1);
        register_with(&quote, &quote.element2);
        quote
    }
}

impl<F> Observer for CompositeQuote<F> {
    fn update(&self) -> Result<()> {
        self.notify_observers()
    }
}

impl<F> Observable for CompositeQuote<F> {
    fn observable_impl(&self) -> &ObservableImpl {
        &self.observable
    }
}

impl<F> Quote for CompositeQuote<F>
where
    F: Fn(Real, Real) -> Real,
{
    fn value(&self) -> Option<Real> {
        let v1 = self.element1.current_link().ok()?.value()?;
        let v2 = self.element2.current_link().ok()?.value()?;
        Some((self.func)(v1, v2))
    }
}

impl<F> fmt::Debug for CompositeQuote<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeQuote")
            .field("element1", &self.element1)
            .field("element2", &self.element2)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ql_core::patterns::observable::ObserverFn;
    use ql_core::RelinkableHandle;

    fn counter() -> (Rc<Cell<u32>>, Rc<impl Observer>) {
        let hits = Rc::new(Cell::new(0));
        let observer = {
            let hits = Rc::clone(&hits);
            ObserverFn::shared(move || {
                hits.set(hits.get() + 1);
                Ok(())
            })
        };
        (hits, observer)
    }

    #[test]
    fn simple_quote() {
        let q = SimpleQuote::new(1.05);
        assert!(q.is_valid());
        assert_eq!(q.value(), Some(1.05));
        assert_eq!(q.checked_value(), Ok(1.05));
    }

    #[test]
    fn empty_quote() {
        let q = SimpleQuote::empty();
        assert!(!q.is_valid());
        assert_eq!(q.value(), None);
        assert!(matches!(q.checked_value(), Err(Error::InvalidQuote(_))));
    }

    #[test]
    fn set_value_notifies_only_on_change() {
        let q = SimpleQuote::shared(0.01);
        let (hits, observer) = counter();
        register_with(&observer, &*q);

        assert_eq!(q.set_value(0.01), Ok(0.0));
        assert_eq!(hits.get(), 0);
        let diff = q.set_value(0.015).unwrap();
        assert_abs_diff_eq!(diff, 0.005, epsilon = 1e-15);
        assert_eq!(hits.get(), 1);
        q.reset().unwrap();
        assert_eq!(hits.get(), 2);
        q.reset().unwrap();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn derived_quote_follows_its_element() {
        let q = SimpleQuote::shared(2.0);
        let handle = RelinkableHandle::<dyn Quote>::linked_to(q.clone());
        let negative = DerivedQuote::new(handle.handle(), |v| -v);
        let (hits, observer) = counter();
        register_with(&observer, &*negative);

        assert_eq!(negative.value(), Some(-2.0));
        q.set_value(3.0).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(negative.value(), Some(-3.0));

        handle.link_to(SimpleQuote::shared(5.0)).unwrap();
        assert_eq!(hits.get(), 2);
        assert_eq!(negative.value(), Some(-5.0));

        handle.reset().unwrap();
        assert_eq!(negative.value(), None);
    }

    #[test]
    fn composite_quote() {
        let base = SimpleQuote::shared(0.03);
        let spread = SimpleQuote::shared(0.002);
        let sum = CompositeQuote::new(
            Handle::<dyn Quote>::new(base.clone()),
            Handle::<dyn Quote>::new(spread.clone()),
            |a, b| a + b,
        );
        let (hits, observer) = counter();
        register_with(&observer, &*sum);

        assert_abs_diff_eq!(sum.value().unwrap(), 0.032, epsilon = 1e-15);
        spread.set_value(0.004).unwrap();
        assert_eq!(hits.get(), 1);
        assert_abs_diff_eq!(sum.value().unwrap(), 0.034, epsilon = 1e-15);
        base.reset().unwrap();
        assert_eq!(sum.value(), None);
    }

    #[test]
    fn quote_value_reports_empty_handle() {
        let empty: Handle<dyn Quote> = Handle::empty();
        assert_eq!(quote_value(&empty), Err(Error::EmptyHandle));
        let linked = Handle::<dyn Quote>::new(SimpleQuote::shared(0.5));
        assert_eq!(quote_value(&linked), Ok(0.5));
    }
}
