//! LazyObject pattern.
//!
//! A `LazyObject` caches an expensive computation and recalculates only when
//! its value is requested after one of its inputs changed.  It is both an
//! observer (inputs notify it) and an observable (it forwards the change to
//! its own dependents).
//!
//! Dirtying is eager and synchronous, recalculation is lazy and pull-based:
//!
//! ```text
//!   Uncalculated ──calculate()──▶ Fresh ──invalidate()──▶ Dirty
//!                                   ▲                       │
//!                                   └─────calculate()───────┘
//! ```
//!
//! A failed calculation leaves the status untouched (or `Dirty` for a forced
//! recalculation), so the previously cached result stays in place and the
//! next request retries from scratch.
//!
//! The caching uses interior mutability (`Cell`) so that calculation can be
//! triggered through `&self`.

use crate::errors::{Error, Result};
use crate::patterns::observable::ObservableImpl;
use std::cell::Cell;

/// Cache status of a [`LazyObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalculationStatus {
    /// Never calculated.
    Uncalculated,
    /// Calculated once, but an input has changed since.
    Dirty,
    /// The cached result reflects the current inputs.
    Fresh,
}

/// How a [`LazyObject`] reacts to an input change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecalculationMode {
    /// Mark dirty; recalculate on the next request.
    #[default]
    Lazy,
    /// Recalculate immediately on notification (for cheap objects).
    AlwaysRecalculate,
}

/// Trait for objects that lazily compute and cache their results.
///
/// Implementors embed a [`LazyState`] and provide
/// [`perform_calculations`][Self::perform_calculations]; the state machine,
/// freezing and notification forwarding are provided.  The usual wiring is:
///
/// ```ignore
/// impl Observer for MyCurve {
///     fn update(&self) -> Result<()> { self.invalidate() }
/// }
/// impl Observable for MyCurve {
///     fn observable_impl(&self) -> &ObservableImpl { self.lazy_state().observable() }
/// }
/// ```
pub trait LazyObject {
    /// Bookkeeping embedded in the implementor.
    fn lazy_state(&self) -> &LazyState;

    /// Perform the actual (expensive) calculation.
    ///
    /// Called by [`calculate`][Self::calculate] when the cached result is
    /// stale.  Must either fully succeed or leave the previously cached
    /// result untouched.
    fn perform_calculations(&self) -> Result<()>;

    /// Ensure results are up-to-date.
    ///
    /// Recalculates when uncalculated, or when dirty and not frozen.
    ///
    /// # Errors
    /// [`Error::CyclicDependency`] if called while this object is already
    /// recalculating, plus anything `perform_calculations` returns.
    fn calculate(&self) -> Result<()> {
        let state = self.lazy_state();
        if state.calculating.get() {
            return Err(Error::CyclicDependency(
                std::any::type_name::<Self>().to_string(),
            ));
        }
        match state.status.get() {
            CalculationStatus::Fresh => Ok(()),
            CalculationStatus::Dirty if state.is_frozen() => Ok(()),
            _ => state.run_calculation(|| self.perform_calculations()),
        }
    }

    /// Force a synchronous recalculation regardless of status or freezing,
    /// then notify dependents.
    fn recalculate(&self) -> Result<()> {
        let state = self.lazy_state();
        if state.calculating.get() {
            return Err(Error::CyclicDependency(
                std::any::type_name::<Self>().to_string(),
            ));
        }
        state.run_calculation(|| self.perform_calculations())?;
        state.observable.notify()
    }

    /// React to an input change: mark the cache dirty and forward the
    /// notification to dependents.
    ///
    /// Notifications arriving while the object is calculating are absorbed.
    /// Unless [`LazyState::always_forward_notifications`] was requested, only
    /// the first notification after a calculation is forwarded.  While frozen
    /// the cache is marked dirty but nothing is forwarded.
    fn invalidate(&self) -> Result<()> {
        let state = self.lazy_state();
        if state.updating.get() || state.calculating.get() {
            return Ok(());
        }
        let was_fresh = state.status.get() == CalculationStatus::Fresh;
        if !was_fresh && !state.always_forward.get() {
            return Ok(());
        }
        if was_fresh {
            state.status.set(CalculationStatus::Dirty);
        }
        if state.is_frozen() {
            tracing::trace!(
                object = std::any::type_name::<Self>(),
                "change suppressed while frozen"
            );
            state.pending_while_frozen.set(true);
            return Ok(());
        }
        tracing::trace!(object = std::any::type_name::<Self>(), "invalidated");

        state.updating.set(true);
        let result = match state.mode.get() {
            RecalculationMode::AlwaysRecalculate => self
                .calculate()
                .and_then(|()| state.observable.notify()),
            RecalculationMode::Lazy => state.observable.notify(),
        };
        state.updating.set(false);
        result
    }

    /// Pin the cached result: input changes are recorded but not acted upon
    /// until the matching [`unfreeze`][Self::unfreeze].  Calls nest.
    fn freeze(&self) {
        let count = &self.lazy_state().freeze_count;
        count.set(count.get() + 1);
    }

    /// Undo one call to [`freeze`][Self::freeze].
    ///
    /// When the last freeze is released and a change was suppressed,
    /// dependents are notified and the next request recalculates.
    fn unfreeze(&self) -> Result<()> {
        let state = self.lazy_state();
        let count = state.freeze_count.get();
        if count == 0 {
            return Ok(());
        }
        state.freeze_count.set(count - 1);
        if count == 1 && state.pending_while_frozen.replace(false) {
            return state.observable.notify();
        }
        Ok(())
    }

    /// The current cache status.
    fn status(&self) -> CalculationStatus {
        self.lazy_state().status.get()
    }

    /// Return `true` if the cache is currently valid.
    fn is_calculated(&self) -> bool {
        self.status() == CalculationStatus::Fresh
    }

    /// Return `true` if recalculation is currently deferred.
    fn is_frozen(&self) -> bool {
        self.lazy_state().is_frozen()
    }
}

/// Bookkeeping fields required by [`LazyObject`].
///
/// Embed this in your struct and return it from
/// [`LazyObject::lazy_state`].  It also carries the observer list the lazy
/// object forwards notifications to.
///
/// # Example
/// ```
/// use std::cell::Cell;
/// use ql_core::patterns::lazy_object::{LazyObject, LazyState};
///
/// struct MyLazy {
///     state: LazyState,
///     result: Cell<f64>,
/// }
///
/// impl LazyObject for MyLazy {
///     fn lazy_state(&self) -> &LazyState { &self.state }
///     fn perform_calculations(&self) -> ql_core::errors::Result<()> {
///         self.result.set(42.0);
///         Ok(())
///     }
/// }
///
/// let obj = MyLazy { state: LazyState::new(), result: Cell::new(0.0) };
/// obj.calculate().unwrap();
/// assert_eq!(obj.result.get(), 42.0);
/// assert!(obj.is_calculated());
/// ```
#[derive(Debug)]
pub struct LazyState {
    status: Cell<CalculationStatus>,
    calculating: Cell<bool>,
    updating: Cell<bool>,
    freeze_count: Cell<u32>,
    pending_while_frozen: Cell<bool>,
    mode: Cell<RecalculationMode>,
    always_forward: Cell<bool>,
    observable: ObservableImpl,
}

impl LazyState {
    /// Create a new `LazyState` in the `Uncalculated` status.
    pub fn new() -> Self {
        Self {
            status: Cell::new(CalculationStatus::Uncalculated),
            calculating: Cell::new(false),
            updating: Cell::new(false),
            freeze_count: Cell::new(0),
            pending_while_frozen: Cell::new(false),
            mode: Cell::new(RecalculationMode::Lazy),
            always_forward: Cell::new(false),
            observable: ObservableImpl::new(),
        }
    }

    /// Observers of the owning lazy object.
    pub fn observable(&self) -> &ObservableImpl {
        &self.observable
    }

    /// Choose how the owner reacts to input changes.
    pub fn set_recalculation_mode(&self, mode: RecalculationMode) {
        self.mode.set(mode);
    }

    /// The current recalculation mode.
    pub fn recalculation_mode(&self) -> RecalculationMode {
        self.mode.get()
    }

    /// Forward every notification, not just the first after a calculation.
    pub fn always_forward_notifications(&self) {
        self.always_forward.set(true);
    }

    /// Forward only the first notification after a calculation (default).
    pub fn forward_first_notification_only(&self) {
        self.always_forward.set(false);
    }

    /// Return `true` while `perform_calculations` is running.
    pub fn is_calculating(&self) -> bool {
        self.calculating.get()
    }

    fn is_frozen(&self) -> bool {
        self.freeze_count.get() > 0
    }

    fn run_calculation(&self, perform: impl FnOnce() -> Result<()>) -> Result<()> {
        self.calculating.set(true);
        let result = perform();
        self.calculating.set(false);
        match result {
            Ok(()) => {
                self.status.set(CalculationStatus::Fresh);
                Ok(())
            }
            Err(e) => {
                if self.status.get() == CalculationStatus::Fresh {
                    self.status.set(CalculationStatus::Dirty);
                }
                tracing::debug!(error = %e, "lazy calculation failed; previous result kept");
                Err(e)
            }
        }
    }
}

impl Default for LazyState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::observable::{register_with, Observable, Observer, ObserverFn};
    use std::cell::RefCell;
    use std::rc::{Rc, Weak};

    /// Doubles an input cell; counts calculations.
    struct Doubler {
        state: LazyState,
        input: Rc<Cell<f64>>,
        result: Cell<f64>,
        runs: Cell<u32>,
        fail: Cell<bool>,
    }

    impl Doubler {
        fn new(input: Rc<Cell<f64>>) -> Rc<Self> {
            Rc::new(Self {
                state: LazyState::new(),
                input,
                result: Cell::new(0.0),
                runs: Cell::new(0),
                fail: Cell::new(false),
            })
        }

        fn value(&self) -> Result<f64> {
            self.calculate()?;
            Ok(self.result.get())
        }
    }

    impl LazyObject for Doubler {
        fn lazy_state(&self) -> &LazyState {
            &self.state
        }

        fn perform_calculations(&self) -> Result<()> {
            self.runs.set(self.runs.get() + 1);
            if self.fail.get() {
                return Err(Error::Runtime("input rejected".into()));
            }
            self.result.set(2.0 * self.input.get());
            Ok(())
        }
    }

    impl Observer for Doubler {
        fn update(&self) -> Result<()> {
            self.invalidate()
        }
    }

    impl Observable for Doubler {
        fn observable_impl(&self) -> &ObservableImpl {
            self.state.observable()
        }
    }

    #[test]
    fn calculates_once_until_invalidated() {
        let input = Rc::new(Cell::new(1.0));
        let obj = Doubler::new(Rc::clone(&input));
        assert_eq!(obj.status(), CalculationStatus::Uncalculated);
        assert_eq!(obj.value().unwrap(), 2.0);
        assert_eq!(obj.value().unwrap(), 2.0);
        assert_eq!(obj.runs.get(), 1);

        input.set(3.0);
        obj.update().unwrap();
        assert_eq!(obj.status(), CalculationStatus::Dirty);
        assert_eq!(obj.runs.get(), 1);
        assert_eq!(obj.value().unwrap(), 6.0);
        assert_eq!(obj.runs.get(), 2);
    }

    #[test]
    fn failure_keeps_last_good_value_and_retries() {
        let input = Rc::new(Cell::new(1.0));
        let obj = Doubler::new(Rc::clone(&input));
        assert_eq!(obj.value().unwrap(), 2.0);

        input.set(5.0);
        obj.fail.set(true);
        obj.update().unwrap();
        assert!(obj.value().is_err());
        assert_eq!(obj.status(), CalculationStatus::Dirty);
        assert_eq!(obj.result.get(), 2.0);

        obj.fail.set(false);
        assert_eq!(obj.value().unwrap(), 10.0);
        assert_eq!(obj.status(), CalculationStatus::Fresh);
    }

    #[test]
    fn freeze_pins_value_until_unfrozen() {
        let input = Rc::new(Cell::new(1.0));
        let obj = Doubler::new(Rc::clone(&input));
        assert_eq!(obj.value().unwrap(), 2.0);

        let hits = Rc::new(Cell::new(0));
        let downstream = {
            let hits = Rc::clone(&hits);
            ObserverFn::shared(move || {
                hits.set(hits.get() + 1);
                Ok(())
            })
        };
        register_with(&downstream, &*obj);

        obj.freeze();
        obj.freeze();
        input.set(4.0);
        obj.update().unwrap();
        assert_eq!(obj.value().unwrap(), 2.0);
        assert_eq!(hits.get(), 0);

        obj.unfreeze().unwrap();
        assert_eq!(obj.value().unwrap(), 2.0);
        obj.unfreeze().unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(obj.value().unwrap(), 8.0);
    }

    #[test]
    fn forwards_first_notification_only_by_default() {
        let input = Rc::new(Cell::new(1.0));
        let obj = Doubler::new(Rc::clone(&input));
        let hits = Rc::new(Cell::new(0));
        let downstream = {
            let hits = Rc::clone(&hits);
            ObserverFn::shared(move || {
                hits.set(hits.get() + 1);
                Ok(())
            })
        };
        register_with(&downstream, &*obj);

        // uncalculated: nothing cached downstream, nothing forwarded
        obj.update().unwrap();
        assert_eq!(hits.get(), 0);

        obj.value().unwrap();
        obj.update().unwrap();
        obj.update().unwrap();
        assert_eq!(hits.get(), 1);

        obj.state.always_forward_notifications();
        obj.update().unwrap();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn always_recalculate_mode_is_eager() {
        let input = Rc::new(Cell::new(1.0));
        let obj = Doubler::new(Rc::clone(&input));
        obj.state
            .set_recalculation_mode(RecalculationMode::AlwaysRecalculate);
        obj.value().unwrap();
        input.set(2.0);
        obj.update().unwrap();
        assert_eq!(obj.runs.get(), 2);
        assert_eq!(obj.status(), CalculationStatus::Fresh);
        assert_eq!(obj.result.get(), 4.0);
    }

    #[test]
    fn recalculate_forces_even_when_frozen() {
        let input = Rc::new(Cell::new(1.0));
        let obj = Doubler::new(Rc::clone(&input));
        obj.value().unwrap();
        obj.freeze();
        input.set(7.0);
        obj.recalculate().unwrap();
        assert_eq!(obj.result.get(), 14.0);
    }

    /// Asks for its own value while calculating.
    struct SelfReferencing {
        state: LazyState,
        this: RefCell<Weak<SelfReferencing>>,
    }

    impl LazyObject for SelfReferencing {
        fn lazy_state(&self) -> &LazyState {
            &self.state
        }

        fn perform_calculations(&self) -> Result<()> {
            match self.this.borrow().upgrade() {
                Some(me) => me.calculate(),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn self_dependency_is_reported_not_overflowed() {
        let obj = Rc::new(SelfReferencing {
            state: LazyState::new(),
            this: RefCell::new(Weak::new()),
        });
        *obj.this.borrow_mut() = Rc::downgrade(&obj);
        let err = obj.calculate().unwrap_err();
        assert!(matches!(err, Error::CyclicDependency(_)));
        assert_eq!(obj.status(), CalculationStatus::Uncalculated);
    }
}
