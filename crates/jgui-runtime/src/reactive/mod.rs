#![forbid(unsafe_code)]

//! Change-tracking primitives the model and binding layers are built on.
//!
//! - [`Observable`]: a shared, version-tracked value with change callbacks.
//! - [`Subscription`]: RAII guard; dropping it unsubscribes.
//! - [`BindingScope`]: owns a group of guards and releases them together.
//!
//! # Architecture
//!
//! Everything is single-threaded (`Rc<RefCell<..>>`). Subscriber lists hold
//! `Weak` callbacks; the strong reference lives in the [`Subscription`], so
//! a dropped subscription is skipped and pruned on the next notification.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op.
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 5. Callbacks run after all internal borrows are released, so a callback
//!    may read or mutate the value it observes.

pub mod observable;
pub mod scope;

pub use observable::{Observable, Subscription};
pub(crate) use observable::SubscriberList;
pub use scope::BindingScope;
