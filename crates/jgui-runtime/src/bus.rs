#![forbid(unsafe_code)]

//! Per-composer message bus for the global event namespace.
//!
//! Each [`Composer`](crate::composer::Composer) owns one bus (or is handed
//! one explicitly). There is no process-wide table, so two composers never
//! observe each other's events unless they share a bus on purpose.
//!
//! # Invariants
//!
//! 1. Listeners run in `(phase, rank, id)` order; ids grow monotonically, so
//!    ties fall back to subscription order.
//! 2. The listener list is snapshotted before dispatch. A listener added
//!    during dispatch does not see the in-flight event; a listener removed
//!    during dispatch still runs if it was already in the snapshot.
//! 3. Dropping a [`BusSubscription`] removes exactly its listener.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use jgui_core::{Event, Phase};

type BusCallback = dyn Fn(&Event);

struct BusListener {
    id: u64,
    event: String,
    phase: Phase,
    rank: u64,
    callback: Rc<BusCallback>,
}

#[derive(Default)]
struct BusInner {
    listeners: RefCell<Vec<BusListener>>,
    next_id: Cell<u64>,
    fired: Cell<u64>,
}

/// Rank used by [`MessageBus::subscribe`]; sorts after every module rank.
pub const EXTERNAL_RANK: u64 = u64::MAX;

/// A shared event bus. Clones refer to the same bus.
#[derive(Clone, Default)]
pub struct MessageBus {
    inner: Rc<BusInner>,
}

impl MessageBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe an external listener in the `On` phase.
    ///
    /// External listeners run after module handlers of the same phase.
    #[must_use = "dropping the subscription unsubscribes"]
    pub fn subscribe(
        &self,
        event: impl Into<String>,
        callback: impl Fn(&Event) + 'static,
    ) -> BusSubscription {
        self.subscribe_with(event, Phase::On, EXTERNAL_RANK, callback)
    }

    /// Subscribe with an explicit phase and rank.
    #[must_use = "dropping the subscription unsubscribes"]
    pub fn subscribe_with(
        &self,
        event: impl Into<String>,
        phase: Phase,
        rank: u64,
        callback: impl Fn(&Event) + 'static,
    ) -> BusSubscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.listeners.borrow_mut().push(BusListener {
            id,
            event: event.into(),
            phase,
            rank,
            callback: Rc::new(callback),
        });
        BusSubscription {
            bus: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Deliver `event` to every matching listener.
    ///
    /// Returns the number of listeners invoked. Stops early when a listener
    /// stops propagation.
    pub fn fire(&self, event: &Event) -> usize {
        let mut snapshot: Vec<(Phase, u64, u64, Rc<BusCallback>)> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.event == event.name())
            .map(|l| (l.phase, l.rank, l.id, Rc::clone(&l.callback)))
            .collect();
        snapshot.sort_by_key(|(phase, rank, id, _)| (*phase, *rank, *id));
        self.inner.fired.set(self.inner.fired.get() + 1);
        tracing::trace!(event = event.name(), listeners = snapshot.len(), "bus fire");

        let mut invoked = 0;
        for (_, _, _, callback) in snapshot {
            callback(event);
            invoked += 1;
            if event.is_propagation_stopped() {
                break;
            }
        }
        invoked
    }

    /// Convenience: fire a bare named event.
    pub fn fire_named(&self, name: &str) -> usize {
        self.fire(&Event::new(name))
    }

    /// Listeners registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.event == event)
            .count()
    }

    /// Total listeners on the bus.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `fire` calls so far.
    #[must_use]
    pub fn fired(&self) -> u64 {
        self.inner.fired.get()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &MessageBus) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakBus {
        WeakBus(Rc::downgrade(&self.inner))
    }
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBus")
            .field("listeners", &self.len())
            .field("fired", &self.fired())
            .finish()
    }
}

/// Non-owning bus reference for closures stored on the bus itself.
#[derive(Clone)]
pub struct WeakBus(Weak<BusInner>);

impl WeakBus {
    #[must_use]
    pub fn upgrade(&self) -> Option<MessageBus> {
        self.0.upgrade().map(|inner| MessageBus { inner })
    }
}

/// RAII guard for one bus listener.
#[must_use = "dropping the subscription unsubscribes"]
pub struct BusSubscription {
    bus: Weak<BusInner>,
    id: u64,
}

impl BusSubscription {
    /// Whether the listener is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.bus
            .upgrade()
            .is_some_and(|b| b.listeners.borrow().iter().any(|l| l.id == self.id))
    }
}

impl Drop for BusSubscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.listeners.borrow_mut().retain(|l| l.id != self.id);
        }
    }
}

impl fmt::Debug for BusSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusSubscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
