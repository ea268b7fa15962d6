#![forbid(unsafe_code)]

//! The [`Module`] trait and the contexts handed to module hooks.
//!
//! A module is a unit of UI behavior: it declares event bindings, may
//! render into the composer's container, and resolves named handlers at
//! dispatch time. Modules never hold a reference to their composer;
//! everything they may touch arrives through [`HandlerContext`] and
//! [`RenderContext`].
//!
//! Named handlers are looked up on every dispatch, so a module that keeps
//! its handlers in a [`HandlerTable`] can have them replaced after it has
//! been registered and the next event picks up the replacement.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use jgui_core::{Element, Event};

use crate::bus::MessageBus;
use crate::event_spec::EventSpec;

/// Everything a handler sees.
pub struct HandlerContext<'a> {
    pub event: &'a Event,
    /// The element the binding matched: the delegate match for scene
    /// bindings, the bound element for render bindings, `None` for bus
    /// events.
    pub current: Option<&'a Element>,
    pub container: Option<&'a Element>,
    pub bus: &'a MessageBus,
}

impl HandlerContext<'_> {
    /// Fire an event on the composer's bus.
    pub fn fire(&self, event: &Event) -> usize {
        self.bus.fire(event)
    }
}

impl fmt::Debug for HandlerContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("event", &self.event.name())
            .field("current", &self.current)
            .finish()
    }
}

/// What a render hook sees.
#[derive(Debug)]
pub struct RenderContext<'a> {
    pub container: &'a Element,
    pub bus: &'a MessageBus,
}

/// Result of resolving a named handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    /// The module has no handler under that name.
    Unhandled,
}

/// A composable UI module.
pub trait Module: 'static {
    /// Unique name within one composer.
    fn name(&self) -> &str;

    /// Event bindings; read when the module is added.
    fn events(&self) -> EventSpec {
        EventSpec::new()
    }

    /// Render into the container. Default: nothing.
    fn render(&mut self, _ctx: &RenderContext<'_>) {}

    /// Run the handler registered under `handler`.
    fn dispatch(&mut self, _handler: &str, _ctx: &HandlerContext<'_>) -> Dispatch {
        Dispatch::Unhandled
    }
}

/// Shared, type-erased module slot.
pub type ModuleRef = Rc<RefCell<dyn Module>>;

/// Typed handle to a module owned by a composer.
pub struct ModuleHandle<M> {
    inner: Rc<RefCell<M>>,
}

impl<M: Module> ModuleHandle<M> {
    pub(crate) fn new(inner: Rc<RefCell<M>>) -> Self {
        Self { inner }
    }

    pub(crate) fn erased(&self) -> ModuleRef {
        self.inner.clone()
    }

    /// Borrow the module.
    ///
    /// # Panics
    ///
    /// If the module is currently mutably borrowed by a running handler.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, M> {
        self.inner.borrow()
    }

    /// Mutably borrow the module.
    ///
    /// # Panics
    ///
    /// If the module is currently borrowed by a running handler.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, M> {
        self.inner.borrow_mut()
    }

    pub fn with<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        f(&self.inner.borrow())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut M) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.inner.borrow().name().to_string()
    }
}

impl<M> Clone for ModuleHandle<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<M> fmt::Debug for ModuleHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("module", &std::any::type_name::<M>())
            .finish()
    }
}

/// Handler function stored in a [`HandlerTable`].
pub type HandlerFn<M> = Rc<dyn Fn(&mut M, &HandlerContext<'_>)>;

/// Name → handler indirection for late binding.
pub struct HandlerTable<M> {
    handlers: AHashMap<String, HandlerFn<M>>,
}

impl<M> Default for HandlerTable<M> {
    fn default() -> Self {
        Self {
            handlers: AHashMap::new(),
        }
    }
}

impl<M> Clone for HandlerTable<M> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<M> HandlerTable<M> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&mut M, &HandlerContext<'_>) + 'static,
    ) -> Self {
        self.set(name, handler);
        self
    }

    /// Register or replace a handler.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&mut M, &HandlerContext<'_>) + 'static,
    ) {
        self.handlers.insert(name.into(), Rc::new(handler));
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    /// Current handler for `name`.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<HandlerFn<M>> {
        self.handlers.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve `name` and run it against `module`.
    ///
    /// The table is read through `table` so the handler may itself replace
    /// entries.
    pub fn dispatch(
        module: &mut M,
        table: impl Fn(&M) -> &HandlerTable<M>,
        name: &str,
        ctx: &HandlerContext<'_>,
    ) -> Dispatch {
        match table(module).resolve(name) {
            Some(handler) => {
                handler(module, ctx);
                Dispatch::Handled
            }
            None => Dispatch::Unhandled,
        }
    }
}

impl<M> fmt::Debug for HandlerTable<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("handlers", &self.names())
            .finish()
    }
}
