#![forbid(unsafe_code)]

//! Events delivered through the element tree and the message bus.
//!
//! An [`Event`] is a named occurrence with an optional target element and a
//! small typed payload. Events are passed by shared reference; the
//! propagation and default-action flags use interior mutability so any
//! handler along the dispatch path can halt the event.
//!
//! # Invariants
//!
//! 1. The target is fixed by the first dispatch and never changes afterwards.
//! 2. `halt()` is equivalent to `stop_propagation()` + `prevent_default()`.
//! 3. [`Phase`] ordering is total: `Before < On < After`.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;

use crate::dom::Element;

/// Ordering tier for handlers sharing one binding target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Phase {
    /// Runs before every `On` handler.
    Before,
    /// The default tier.
    #[default]
    On,
    /// Runs after every `On` handler.
    After,
}

impl Phase {
    /// Parse a phase name (`"before"`, `"on"`, `"after"`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "before" => Some(Self::Before),
            "on" => Some(Self::On),
            "after" => Some(Self::After),
            _ => None,
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::On => "on",
            Self::After => "after",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyboard key carried by key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Escape,
    Char(char),
    /// Any other key, by raw key code.
    Other(u32),
}

impl Key {
    /// Map a raw DOM key code.
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        match code {
            13 => Self::Enter,
            27 => Self::Escape,
            c => char::from_u32(c)
                .filter(|ch| ch.is_ascii_graphic())
                .map_or(Self::Other(c), Self::Char),
        }
    }
}

/// Typed payload of an event.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EventDetail {
    #[default]
    None,
    Key(Key),
    Text(String),
    Fields(BTreeMap<String, String>),
}

/// A named event.
pub struct Event {
    name: String,
    target: RefCell<Option<Element>>,
    detail: EventDetail,
    propagation_stopped: Cell<bool>,
    default_prevented: Cell<bool>,
}

impl Event {
    /// Create an event with no target and no payload.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: RefCell::new(None),
            detail: EventDetail::None,
            propagation_stopped: Cell::new(false),
            default_prevented: Cell::new(false),
        }
    }

    /// Set the originating element.
    #[must_use]
    pub fn with_target(self, target: &Element) -> Self {
        *self.target.borrow_mut() = Some(target.clone());
        self
    }

    /// Attach a key payload.
    #[must_use]
    pub fn with_key(mut self, key: Key) -> Self {
        self.detail = EventDetail::Key(key);
        self
    }

    /// Attach a text payload (e.g. a navigation url).
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.detail = EventDetail::Text(text.into());
        self
    }

    /// Attach a field map payload.
    #[must_use]
    pub fn with_fields(mut self, fields: BTreeMap<String, String>) -> Self {
        self.detail = EventDetail::Fields(fields);
        self
    }

    /// A copy with the same name, target and payload. Propagation flags
    /// start cleared.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        Self {
            name: self.name.clone(),
            target: RefCell::new(self.target()),
            detail: self.detail.clone(),
            propagation_stopped: Cell::new(false),
            default_prevented: Cell::new(false),
        }
    }

    /// Event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Originating element, if any.
    #[must_use]
    pub fn target(&self) -> Option<Element> {
        self.target.borrow().clone()
    }

    /// Set the target unless one is already recorded.
    pub(crate) fn ensure_target(&self, target: &Element) {
        let mut slot = self.target.borrow_mut();
        if slot.is_none() {
            *slot = Some(target.clone());
        }
    }

    /// Payload.
    #[must_use]
    pub fn detail(&self) -> &EventDetail {
        &self.detail
    }

    /// Key payload, if this is a key event.
    #[must_use]
    pub fn key(&self) -> Option<Key> {
        match self.detail {
            EventDetail::Key(key) => Some(key),
            _ => None,
        }
    }

    /// Text payload, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.detail {
            EventDetail::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Look up a field of a `Fields` payload.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        match &self.detail {
            EventDetail::Fields(fields) => fields.get(name).map(String::as_str),
            _ => None,
        }
    }

    /// Stop bubbling past the current node.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    /// Mark the default action as cancelled.
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    /// Stop propagation and prevent the default action.
    pub fn halt(&self) {
        self.stop_propagation();
        self.prevent_default();
    }

    #[must_use]
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    #[must_use]
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("target", &self.target.borrow())
            .field("detail", &self.detail)
            .field("stopped", &self.propagation_stopped.get())
            .finish()
    }
}
