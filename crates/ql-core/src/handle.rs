//! `Handle<T>` — a shared, observable, optionally relinkable reference.
//!
//! A handle points at a *link*: a shared cell that holds the current target
//! and forwards the target's notifications.  Cloning a handle shares the link,
//! so every clone sees a relink immediately.  Consumers register with the
//! **handle**, never with the target, so that relinking is observable without
//! re-registration.
//!
//! | Type | Target |
//! |------|--------|
//! | [`Handle<T>`] | fixed at construction (read-only view of a link) |
//! | [`RelinkableHandle<T>`] | can be re-pointed with [`RelinkableHandle::link_to`] |
//!
//! Every constructor creates a fresh link: two handles only alias the same
//! cell when one was cloned from the other (see [`Handle::shares_link`]).

use crate::errors::{Error, Result};
use crate::patterns::observable::{Observable, ObservableImpl, Observer};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

/// The shared cell behind a family of handles.
struct Link<T: ?Sized> {
    target: RefCell<Option<Rc<T>>>,
    is_observer: Cell<bool>,
    observable: ObservableImpl,
    this: Weak<Link<T>>,
}

impl<T: Observable + ?Sized + 'static> Link<T> {
    fn as_observer(&self) -> Weak<dyn Observer> {
        let weak: Weak<Link<T>> = self.this.clone();
        weak
    }

    fn relink(&self, target: Option<Rc<T>>, register_as_observer: bool) -> Result<()> {
        let unchanged = match (self.target.borrow().as_ref(), target.as_ref()) {
            (Some(old), Some(new)) => Rc::ptr_eq(old, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged && self.is_observer.get() == register_as_observer {
            return Ok(());
        }

        let previous = self.target.replace(target.clone());
        if let Some(old) = previous.as_ref() {
            if self.is_observer.get() {
                old.unregister_observer(&self.as_observer());
            }
        }
        if let Some(new) = target.as_ref() {
            if register_as_observer {
                new.register_observer(self.as_observer());
            }
        }
        self.is_observer.set(register_as_observer);
        tracing::trace!(linked = target.is_some(), "handle relinked");
        self.observable.notify()
    }

    fn current(&self) -> Option<Rc<T>> {
        self.target.borrow().clone()
    }
}

impl<T: ?Sized> Observer for Link<T> {
    fn update(&self) -> Result<()> {
        if self.target.borrow().is_some() {
            self.observable.notify()?;
        }
        Ok(())
    }
}

/// A shared, optionally-empty, observable reference to a value of type `T`.
///
/// The target is fixed for handles created through [`Handle::new`]; a
/// [`RelinkableHandle`] hands out `Handle`s whose target follows its
/// relinking.
pub struct Handle<T: ?Sized> {
    link: Rc<Link<T>>,
}

impl<T: Observable + ?Sized + 'static> Handle<T> {
    /// Create a handle to `target`, forwarding its notifications.
    pub fn new(target: Rc<T>) -> Self {
        Self::with_observation(target, true)
    }

    /// Create a handle to `target`.
    ///
    /// With `register_as_observer == false` the handle does not forward the
    /// target's own notifications; it still notifies when relinked.
    pub fn with_observation(target: Rc<T>, register_as_observer: bool) -> Self {
        let link = Rc::new_cyclic(|this| Link {
            target: RefCell::new(Some(Rc::clone(&target))),
            is_observer: Cell::new(register_as_observer),
            observable: ObservableImpl::new(),
            this: this.clone(),
        });
        if register_as_observer {
            target.register_observer(link.as_observer());
        }
        Self { link }
    }

    /// Create an explicitly empty handle; dereferencing it fails with
    /// [`Error::EmptyHandle`].
    pub fn empty() -> Self {
        Self {
            link: Rc::new_cyclic(|this| Link {
                target: RefCell::new(None),
                is_observer: Cell::new(false),
                observable: ObservableImpl::new(),
                this: this.clone(),
            }),
        }
    }

    /// The object currently linked.
    pub fn current_link(&self) -> Result<Rc<T>> {
        self.link.current().ok_or(Error::EmptyHandle)
    }

    /// Return `true` if the handle is not linked to any object.
    pub fn is_empty(&self) -> bool {
        self.link.target.borrow().is_none()
    }

    /// Return `true` if both handles share the same link, i.e. relinking one
    /// relinks the other.
    pub fn shares_link(&self, other: &Handle<T>) -> bool {
        Rc::ptr_eq(&self.link, &other.link)
    }

    /// Return `true` if both handles currently point at the same object.
    pub fn same_target(&self, other: &Handle<T>) -> bool {
        match (self.link.current(), other.link.current()) {
            (Some(a), Some(b)) => Rc::ptr_eq(&a, &b),
            _ => false,
        }
    }
}

impl<T: ?Sized> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            link: Rc::clone(&self.link),
        }
    }
}

impl<T: Observable + ?Sized + 'static> Default for Handle<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized> Observable for Handle<T> {
    fn observable_impl(&self) -> &ObservableImpl {
        &self.link.observable
    }
}

impl<T: ?Sized> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.link.target.borrow().is_some() {
            write!(f, "Handle(linked)")
        } else {
            write!(f, "Handle(empty)")
        }
    }
}

/// A [`Handle`] whose target can be re-pointed at runtime.
///
/// Dereferences to the underlying [`Handle`]; pass [`RelinkableHandle::handle`]
/// to consumers that must not relink.
///
/// # Example
/// ```
/// use std::rc::Rc;
/// use ql_core::handle::RelinkableHandle;
/// use ql_core::patterns::observable::{Observable, ObservableImpl};
///
/// #[derive(Default)]
/// struct Value(ObservableImpl);
/// impl Observable for Value {
///     fn observable_impl(&self) -> &ObservableImpl { &self.0 }
/// }
///
/// let relinkable: RelinkableHandle<Value> = RelinkableHandle::new();
/// let consumer_view = relinkable.handle();
/// assert!(consumer_view.current_link().is_err());
///
/// relinkable.link_to(Rc::new(Value::default())).unwrap();
/// assert!(consumer_view.current_link().is_ok());
/// ```
pub struct RelinkableHandle<T: ?Sized> {
    handle: Handle<T>,
}

impl<T: Observable + ?Sized + 'static> RelinkableHandle<T> {
    /// Create a new, empty relinkable handle with its own link.
    pub fn new() -> Self {
        Self {
            handle: Handle::empty(),
        }
    }

    /// Create a relinkable handle initially linked to `target`.
    pub fn linked_to(target: Rc<T>) -> Self {
        Self {
            handle: Handle::new(target),
        }
    }

    /// Point every handle sharing this link at `target` and notify their
    /// observers.
    pub fn link_to(&self, target: Rc<T>) -> Result<()> {
        self.link_to_with(target, true)
    }

    /// As [`link_to`](Self::link_to), choosing whether target notifications
    /// are forwarded.
    pub fn link_to_with(&self, target: Rc<T>, register_as_observer: bool) -> Result<()> {
        self.handle.link.relink(Some(target), register_as_observer)
    }

    /// Detach from the current target; dereferencing then fails with
    /// [`Error::EmptyHandle`].
    pub fn reset(&self) -> Result<()> {
        self.handle.link.relink(None, false)
    }

    /// A read-only handle sharing this link.
    pub fn handle(&self) -> Handle<T> {
        self.handle.clone()
    }
}

impl<T: Observable + ?Sized + 'static> Default for RelinkableHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for RelinkableHandle<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
        }
    }
}

impl<T: ?Sized> Deref for RelinkableHandle<T> {
    type Target = Handle<T>;

    fn deref(&self) -> &Handle<T> {
        &self.handle
    }
}

impl<T: ?Sized> fmt::Debug for RelinkableHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Relinkable{:?}", self.handle)
    }
}
