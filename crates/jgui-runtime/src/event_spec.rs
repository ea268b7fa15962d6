#![forbid(unsafe_code)]

//! Declarative event bindings contributed by modules.
//!
//! An [`EventSpec`] is an ordered list of [`BindingEntry`] values. Entries
//! are built either with the builder methods or from a JSON document:
//!
//! ```json
//! {
//!   "scene":  { ".thing": { "click": "decorateThing" } },
//!   "render": { ".node":  { "click": { "phase": "after", "callback": "pick" } } },
//!   "global": { "cancel": "onCancel" }
//! }
//! ```
//!
//! A binding may also be a JSON array of handlers, which keeps declaration
//! order for several handlers on one event.
//!
//! # Failure Modes
//!
//! | Input | Result |
//! |-------|--------|
//! | unknown namespace key | `ComposeError::Configuration` |
//! | phase outside `before`/`on`/`after` | `ComposeError::Configuration` |
//! | selector that does not parse | `ComposeError::Configuration` |
//! | empty event name | `ComposeError::Configuration` |

use std::fmt;
use std::rc::Rc;

use jgui_core::{ComposeError, Phase, Selector};
use serde_json::Value as Json;

use crate::module::HandlerContext;

/// Binding namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Delegated from the composer's container.
    Scene,
    /// Attached to rendered elements directly.
    Render,
    /// The composer's message bus.
    Global,
}

impl Namespace {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "scene" => Some(Self::Scene),
            "render" => Some(Self::Render),
            "global" => Some(Self::Global),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scene => "scene",
            Self::Render => "render",
            Self::Global => "global",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inline handler callback.
pub type InlineFn = dyn Fn(&HandlerContext<'_>);

/// What a binding invokes.
#[derive(Clone)]
pub enum HandlerRef {
    /// Resolved against the module instance at dispatch time.
    Named(String),
    Inline(Rc<InlineFn>),
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Inline(_) => f.write_str("Inline(..)"),
        }
    }
}

/// A handler with its phase.
#[derive(Debug, Clone)]
pub struct Handler {
    pub phase: Phase,
    pub target: HandlerRef,
}

impl Handler {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            phase: Phase::On,
            target: HandlerRef::Named(name.into()),
        }
    }

    #[must_use]
    pub fn inline(callback: impl Fn(&HandlerContext<'_>) + 'static) -> Self {
        Self {
            phase: Phase::On,
            target: HandlerRef::Inline(Rc::new(callback)),
        }
    }

    #[must_use]
    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    #[must_use]
    pub fn before(self) -> Self {
        self.phase(Phase::Before)
    }

    #[must_use]
    pub fn after(self) -> Self {
        self.phase(Phase::After)
    }

    /// Handler name for logging.
    #[must_use]
    pub fn label(&self) -> &str {
        match &self.target {
            HandlerRef::Named(name) => name,
            HandlerRef::Inline(_) => "<inline>",
        }
    }
}

impl From<&str> for Handler {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for Handler {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}

/// One `(namespace, selector, event, handler)` binding.
#[derive(Debug, Clone)]
pub struct BindingEntry {
    pub namespace: Namespace,
    /// `None` for global entries.
    pub selector: Option<String>,
    pub event: String,
    pub handler: Handler,
}

/// Ordered binding declarations of one module.
#[derive(Debug, Clone, Default)]
pub struct EventSpec {
    entries: Vec<BindingEntry>,
}

impl EventSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delegated binding on the container.
    #[must_use]
    pub fn scene(
        mut self,
        selector: impl Into<String>,
        event: impl Into<String>,
        handler: impl Into<Handler>,
    ) -> Self {
        self.entries.push(BindingEntry {
            namespace: Namespace::Scene,
            selector: Some(selector.into()),
            event: event.into(),
            handler: handler.into(),
        });
        self
    }

    /// Direct binding on rendered elements.
    #[must_use]
    pub fn render(
        mut self,
        selector: impl Into<String>,
        event: impl Into<String>,
        handler: impl Into<Handler>,
    ) -> Self {
        self.entries.push(BindingEntry {
            namespace: Namespace::Render,
            selector: Some(selector.into()),
            event: event.into(),
            handler: handler.into(),
        });
        self
    }

    /// Bus binding.
    #[must_use]
    pub fn global(mut self, event: impl Into<String>, handler: impl Into<Handler>) -> Self {
        self.entries.push(BindingEntry {
            namespace: Namespace::Global,
            selector: None,
            event: event.into(),
            handler: handler.into(),
        });
        self
    }

    /// Append another spec's entries.
    #[must_use]
    pub fn merge(mut self, other: EventSpec) -> Self {
        self.entries.extend(other.entries);
        self
    }

    #[must_use]
    pub fn entries(&self) -> &[BindingEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check every entry and compile its selector.
    ///
    /// # Errors
    ///
    /// `ComposeError::Configuration` naming `owner` on the first bad entry.
    pub fn validate(&self, owner: &str) -> Result<Vec<Option<Selector>>, ComposeError> {
        self.entries
            .iter()
            .map(|entry| {
                if entry.event.trim().is_empty() {
                    return Err(ComposeError::configuration(owner, "empty event name"));
                }
                match (entry.namespace, &entry.selector) {
                    (Namespace::Global, None) => Ok(None),
                    (Namespace::Global, Some(sel)) => Err(ComposeError::configuration(
                        owner,
                        format!("global binding '{}' must not carry selector '{sel}'", entry.event),
                    )),
                    (_, None) => Err(ComposeError::configuration(
                        owner,
                        format!("{} binding '{}' needs a selector", entry.namespace, entry.event),
                    )),
                    (_, Some(sel)) => Selector::parse(sel)
                        .map(Some)
                        .map_err(|e| ComposeError::configuration(owner, e.to_string())),
                }
            })
            .collect()
    }

    /// Build a spec from its JSON form.
    ///
    /// # Errors
    ///
    /// `ComposeError::Configuration` for unknown namespaces, malformed
    /// handler objects or unknown phases.
    pub fn from_json(owner: &str, json: &Json) -> Result<Self, ComposeError> {
        let cfg = |reason: String| ComposeError::configuration(owner, reason);
        let root = json
            .as_object()
            .ok_or_else(|| cfg("event spec must be an object".into()))?;

        let mut spec = Self::new();
        for (ns_name, body) in root {
            let namespace = Namespace::from_name(ns_name)
                .ok_or_else(|| cfg(format!("unknown namespace '{ns_name}'")))?;
            let body = body
                .as_object()
                .ok_or_else(|| cfg(format!("namespace '{ns_name}' must be an object")))?;

            if namespace == Namespace::Global {
                for (event, handlers) in body {
                    for handler in parse_handlers(owner, handlers)? {
                        spec = spec.global(event.clone(), handler);
                    }
                }
                continue;
            }
            for (selector, events) in body {
                let events = events
                    .as_object()
                    .ok_or_else(|| cfg(format!("bindings for '{selector}' must be an object")))?;
                for (event, handlers) in events {
                    for handler in parse_handlers(owner, handlers)? {
                        spec.entries.push(BindingEntry {
                            namespace,
                            selector: Some(selector.clone()),
                            event: event.clone(),
                            handler,
                        });
                    }
                }
            }
        }
        spec.validate(owner)?;
        Ok(spec)
    }
}

fn parse_handlers(owner: &str, json: &Json) -> Result<Vec<Handler>, ComposeError> {
    match json {
        Json::Array(items) => items.iter().map(|h| parse_handler(owner, h)).collect(),
        other => parse_handler(owner, other).map(|h| vec![h]),
    }
}

fn parse_handler(owner: &str, json: &Json) -> Result<Handler, ComposeError> {
    match json {
        Json::String(name) => Ok(Handler::named(name.as_str())),
        Json::Object(map) => {
            let name = map
                .get("callback")
                .or_else(|| map.get("handler"))
                .and_then(Json::as_str)
                .ok_or_else(|| ComposeError::configuration(owner, "handler object needs 'callback'"))?;
            let phase = match map.get("phase") {
                None => Phase::On,
                Some(Json::String(p)) => Phase::from_name(p).ok_or_else(|| {
                    ComposeError::configuration(owner, format!("unknown phase '{p}'"))
                })?,
                Some(_) => return Err(ComposeError::configuration(owner, "phase must be a string")),
            };
            Ok(Handler::named(name).phase(phase))
        }
        _ => Err(ComposeError::configuration(
            owner,
            "handler must be a name or an object",
        )),
    }
}
