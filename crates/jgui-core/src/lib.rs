#![forbid(unsafe_code)]

//! Core types for the jgui composition engine: the element tree modules
//! render into, the selector engine used by event bindings and viewlet
//! targets, events, and the error taxonomy.

pub mod dom;
pub mod error;
pub mod event;
#[cfg(feature = "tracing-json")]
pub mod logging;
pub mod selector;

pub use dom::{Element, ElementState, ListenerHandle, ListenerId, WeakElement};
pub use error::{ComposeError, NameKind};
pub use event::{Event, EventDetail, Key, Phase};
pub use selector::{Selector, SelectorError};
