//! Observer / Observable notification graph.
//!
//! * An **Observable** notifies registered **Observer**s whenever it changes
//!   state.
//! * Observers react in `update()`.
//!
//! Observers are held as `Weak<dyn Observer>`: the allocation behind the weak
//! pointer is the observer's identity token, so registration is de-duplicated
//! and unregistration needs no inheritance.  Dropping an observer is enough to
//! detach it; dead entries are pruned on the next notification pass.
//!
//! The graph is single-threaded (`Rc` / `RefCell`).  Notification is
//! synchronous and follows the *abort and propagate* policy: the first
//! observer returning an error stops the pass and the error is returned to
//! the caller of [`Observable::notify_observers`].  Observers must not rely on
//! being notified in any particular order.

use crate::errors::Result;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// An object that reacts to changes in the [`Observable`]s it registered with.
pub trait Observer {
    /// Called by every observable this observer is registered with when that
    /// observable changes state.
    fn update(&self) -> Result<()>;
}

/// An object that can notify interested parties when it changes.
///
/// Implementors only expose their embedded [`ObservableImpl`]; registration
/// and notification are provided.
pub trait Observable {
    /// The observer list backing this observable.
    fn observable_impl(&self) -> &ObservableImpl;

    /// Register an observer to receive future change notifications.
    ///
    /// Returns `false` if the observer was already registered.
    fn register_observer(&self, observer: Weak<dyn Observer>) -> bool {
        self.observable_impl().register(observer)
    }

    /// Remove a previously registered observer.
    ///
    /// Returns `false` if the observer was not registered.
    fn unregister_observer(&self, observer: &Weak<dyn Observer>) -> bool {
        self.observable_impl().unregister(observer)
    }

    /// Notify all currently registered observers that this object has changed.
    fn notify_observers(&self) -> Result<()> {
        self.observable_impl().notify()
    }
}

/// Observer list embedded in every observable type.
///
/// Uses interior mutability so that `register`, `unregister`, and `notify`
/// all work through `&self` references.
#[derive(Default)]
pub struct ObservableImpl {
    observers: RefCell<Vec<Weak<dyn Observer>>>,
}

impl ObservableImpl {
    /// Create a new, empty observer list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer unless it is already present.
    pub fn register(&self, observer: Weak<dyn Observer>) -> bool {
        let mut observers = self.observers.borrow_mut();
        if observers.iter().any(|o| Weak::ptr_eq(o, &observer)) {
            return false;
        }
        observers.push(observer);
        true
    }

    /// Remove an observer (by identity of the `Weak`).
    pub fn unregister(&self, observer: &Weak<dyn Observer>) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|o| !Weak::ptr_eq(o, observer));
        observers.len() != before
    }

    /// Notify all live observers, removing dead `Weak` references as we go.
    ///
    /// The list is snapshotted before the first callback, so observers may
    /// register or unregister (themselves or others) while being notified.
    pub fn notify(&self) -> Result<()> {
        let live: Vec<Rc<dyn Observer>> = {
            let mut observers = self.observers.borrow_mut();
            observers.retain(|w| w.strong_count() > 0);
            observers.iter().filter_map(Weak::upgrade).collect()
        };
        for observer in live {
            observer.update()?;
        }
        Ok(())
    }

    /// Number of registered observers that are still alive.
    pub fn observer_count(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

impl fmt::Debug for ObservableImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableImpl")
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Downgrade a strong observer into the weak, type-erased form stored by
/// observables.
pub fn weak_observer<O: Observer + 'static>(observer: &Rc<O>) -> Weak<dyn Observer> {
    let weak: Weak<O> = Rc::downgrade(observer);
    weak
}

/// Register `observer` with `observable`; returns `false` if already registered.
pub fn register_with<O, S>(observer: &Rc<O>, observable: &S) -> bool
where
    O: Observer + 'static,
    S: Observable + ?Sized,
{
    observable.register_observer(weak_observer(observer))
}

/// Unregister `observer` from `observable`; returns `false` if it was not
/// registered.
pub fn unregister_with<O, S>(observer: &Rc<O>, observable: &S) -> bool
where
    O: Observer + 'static,
    S: Observable + ?Sized,
{
    observable.unregister_observer(&weak_observer(observer))
}

/// A closure-backed observer.
///
/// Useful for consumers that only need a callback; keep the returned `Rc`
/// alive for as long as notifications should be received.
///
/// # Example
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use ql_core::patterns::observable::{register_with, ObservableImpl, Observable, ObserverFn};
///
/// struct Source(ObservableImpl);
/// impl Observable for Source {
///     fn observable_impl(&self) -> &ObservableImpl { &self.0 }
/// }
///
/// let hits = Rc::new(Cell::new(0));
/// let counter = {
///     let hits = hits.clone();
///     ObserverFn::shared(move || { hits.set(hits.get() + 1); Ok(()) })
/// };
/// let source = Source(ObservableImpl::new());
/// register_with(&counter, &source);
/// source.notify_observers().unwrap();
/// assert_eq!(hits.get(), 1);
/// ```
pub struct ObserverFn<F> {
    callback: F,
}

impl<F> ObserverFn<F>
where
    F: Fn() -> Result<()>,
{
    /// Wrap a callback.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }

    /// Wrap a callback in an `Rc`, ready for registration.
    pub fn shared(callback: F) -> Rc<Self> {
        Rc::new(Self::new(callback))
    }
}

impl<F> Observer for ObserverFn<F>
where
    F: Fn() -> Result<()>,
{
    fn update(&self) -> Result<()> {
        (self.callback)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use std::cell::Cell;

    struct CountingObserver {
        count: Cell<u32>,
    }

    impl CountingObserver {
        fn shared() -> Rc<Self> {
            Rc::new(Self {
                count: Cell::new(0),
            })
        }
    }

    impl Observer for CountingObserver {
        fn update(&self) -> Result<()> {
            self.count.set(self.count.get() + 1);
            Ok(())
        }
    }

    struct Source {
        observable: ObservableImpl,
    }

    impl Observable for Source {
        fn observable_impl(&self) -> &ObservableImpl {
            &self.observable
        }
    }

    fn source() -> Source {
        Source {
            observable: ObservableImpl::new(),
        }
    }

    #[test]
    fn register_and_notify() {
        let obs = CountingObserver::shared();
        let observable = source();
        assert!(register_with(&obs, &observable));
        observable.notify_observers().unwrap();
        assert_eq!(obs.count.get(), 1);
        observable.notify_observers().unwrap();
        assert_eq!(obs.count.get(), 2);
    }

    #[test]
    fn registration_is_deduplicated() {
        let obs = CountingObserver::shared();
        let observable = source();
        assert!(register_with(&obs, &observable));
        assert!(!register_with(&obs, &observable));
        observable.notify_observers().unwrap();
        assert_eq!(obs.count.get(), 1);
        assert_eq!(observable.observable_impl().observer_count(), 1);
    }

    #[test]
    fn dead_observer_pruned() {
        let observable = source();
        {
            let obs = CountingObserver::shared();
            register_with(&obs, &observable);
        }
        observable.notify_observers().unwrap();
        assert_eq!(observable.observable.observers.borrow().len(), 0);
    }

    #[test]
    fn unregister() {
        let obs = CountingObserver::shared();
        let observable = source();
        register_with(&obs, &observable);
        assert!(unregister_with(&obs, &observable));
        assert!(!unregister_with(&obs, &observable));
        observable.notify_observers().unwrap();
        assert_eq!(obs.count.get(), 0);
    }

    #[test]
    fn failing_observer_aborts_the_pass() {
        let observable = source();
        let failing = ObserverFn::shared(|| Err(Error::Runtime("boom".into())));
        register_with(&failing, &observable);
        let obs = CountingObserver::shared();
        register_with(&obs, &observable);

        let err = observable.notify_observers().unwrap_err();
        assert_eq!(err, Error::Runtime("boom".into()));
        // registered after the failing one, so never reached
        assert_eq!(obs.count.get(), 0);
    }

    #[test]
    fn observer_may_unregister_itself_while_notified() {
        let observable = Rc::new(source());
        let slot: Rc<RefCell<Option<Weak<dyn Observer>>>> = Rc::new(RefCell::new(None));
        let once = {
            let observable = Rc::clone(&observable);
            let slot = Rc::clone(&slot);
            ObserverFn::shared(move || {
                if let Some(me) = slot.borrow().as_ref() {
                    observable.unregister_observer(me);
                }
                Ok(())
            })
        };
        *slot.borrow_mut() = Some(weak_observer(&once));
        register_with(&once, &*observable);

        observable.notify_observers().unwrap();
        assert_eq!(observable.observable_impl().observer_count(), 0);
    }
}
