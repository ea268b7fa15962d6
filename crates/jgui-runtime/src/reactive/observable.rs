#![forbid(unsafe_code)]

//! [`Observable`] values and the subscriber list behind every change feed
//! in this crate.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

struct Callback<T>(Box<dyn Fn(&T)>);

/// Ordered list of weakly-held callbacks.
pub(crate) struct SubscriberList<T> {
    slots: RefCell<Vec<Weak<Callback<T>>>>,
}

impl<T: 'static> SubscriberList<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong = Rc::new(Callback(Box::new(callback)));
        self.slots.borrow_mut().push(Rc::downgrade(&strong));
        Subscription {
            guard: Some(strong),
        }
    }

    /// Invoke every live callback with `value`, in registration order.
    pub(crate) fn notify(&self, value: &T) {
        let live: Vec<Rc<Callback<T>>> = {
            let mut slots = self.slots.borrow_mut();
            slots.retain(|w| w.strong_count() > 0);
            slots.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in live {
            (callback.0)(value);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

/// Keeps a callback registered. Drop it to unsubscribe.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    guard: Option<Rc<dyn Any>>,
}

impl Subscription {
    /// A subscription that holds nothing.
    pub fn empty() -> Self {
        Self { guard: None }
    }

    /// Whether this guard still keeps a callback alive.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.guard.is_some()
    }

    /// Unsubscribe now.
    pub fn cancel(&mut self) {
        self.guard = None;
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

struct ObservableInner<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    subscribers: SubscriberList<T>,
}

/// A shared value that notifies subscribers when it changes.
///
/// Clones share state.
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                value: RefCell::new(value),
                version: Cell::new(0),
                subscribers: SubscriberList::new(),
            }),
        }
    }

    /// Current value (cloned).
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value. No-op when equal to the current value.
    pub fn set(&self, value: T) {
        if *self.inner.value.borrow() == value {
            return;
        }
        *self.inner.value.borrow_mut() = value.clone();
        self.commit(&value);
    }

    /// Mutate in place; subscribers fire only if the result differs.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let next = {
            let mut value = self.inner.value.borrow_mut();
            let before = value.clone();
            f(&mut *value);
            if *value == before {
                return;
            }
            value.clone()
        };
        self.commit(&next);
    }

    fn commit(&self, value: &T) {
        self.inner.version.set(self.inner.version.get() + 1);
        self.inner.subscribers.notify(value);
    }

    /// Number of committed changes.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Register a change callback.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.inner.subscribers.subscribe(callback)
    }

    /// Live subscriber count.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

impl<T: Default + Clone + PartialEq + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}
