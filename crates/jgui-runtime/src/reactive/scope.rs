#![forbid(unsafe_code)]

//! Lifetime grouping for subscriptions.
//!
//! A [`BindingScope`] owns any number of guards (model subscriptions, bus
//! subscriptions, element listener handles) and releases them together.
//!
//! # Invariants
//!
//! 1. Guards are released in reverse registration order on `clear()` and
//!    on drop.
//! 2. After release, no callback owned by the scope fires again.
//! 3. A cleared scope is reusable.

use std::any::Any;
use std::fmt;

use super::observable::{Observable, Subscription};

/// Owns a group of subscription guards.
#[derive(Default)]
pub struct BindingScope {
    guards: Vec<Box<dyn Any>>,
}

impl BindingScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `guard` alive until the scope is cleared or dropped.
    pub fn hold<G: 'static>(&mut self, guard: G) -> &mut Self {
        self.guards.push(Box::new(guard));
        self
    }

    /// Subscribe to an observable for the lifetime of this scope.
    pub fn subscribe<T: Clone + PartialEq + 'static>(
        &mut self,
        source: &Observable<T>,
        callback: impl Fn(&T) + 'static,
    ) -> &mut Self {
        let sub: Subscription = source.subscribe(callback);
        self.hold(sub)
    }

    /// Number of held guards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Release every guard now, newest first.
    pub fn clear(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScope")
            .field("guards", &self.guards.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct Noisy(&'static str, Rc<RefCell<Vec<&'static str>>>);

    impl Drop for Noisy {
        fn drop(&mut self) {
            self.1.borrow_mut().push(self.0);
        }
    }

    #[test]
    fn releases_newest_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let mut scope = BindingScope::new();
            scope.hold(Noisy("first", Rc::clone(&log)));
            scope.hold(Noisy("second", Rc::clone(&log)));
            assert_eq!(scope.len(), 2);
        }
        assert_eq!(*log.borrow(), vec!["second", "first"]);
    }

    #[test]
    fn clear_stops_callbacks_and_scope_is_reusable() {
        let obs = Observable::new(0);
        let seen = Rc::new(Cell::new(0));

        let mut scope = BindingScope::new();
        let s = Rc::clone(&seen);
        scope.subscribe(&obs, move |v| s.set(*v));
        obs.set(1);
        assert_eq!(seen.get(), 1);

        scope.clear();
        assert!(scope.is_empty());
        obs.set(2);
        assert_eq!(seen.get(), 1);

        let s = Rc::clone(&seen);
        scope.subscribe(&obs, move |v| s.set(*v * 10));
        obs.set(3);
        assert_eq!(seen.get(), 30);
    }

    #[test]
    fn debug_shows_count() {
        let mut scope = BindingScope::new();
        scope.hold(1_u8).hold(2_u8);
        assert!(format!("{scope:?}").contains("guards: 2"));
    }
}
