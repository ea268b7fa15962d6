#![forbid(unsafe_code)]

//! Component composer: a container plus an ordered collection of modules.
//!
//! # Lifecycle
//!
//! ```text
//! new ──set_container──▶ add_module* ──render──▶ rendered ──unbind──▶ unbound
//!          ▲                  │  ▲                  │
//!          └──────────────────┘  └── add/remove ────┘
//! ```
//!
//! - Global bindings are live from `add_module` until `remove_module`.
//! - `remove_module` only drops subscriptions. Nodes the module rendered
//!   stay in the container and become content no module owns.
//! - Scene and render bindings are live once the module has been through a
//!   `render()` (or is added to an already-rendered composer).
//! - `render()` may be called repeatedly. Each call first detaches the
//!   direct children a module contributed last time, then re-runs its hook.
//!   Container content that no module contributed is left alone.
//! - `unbind()` is terminal: every later call returns
//!   [`ComposeError::Lifecycle`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use jgui_core::{ComposeError, Element, Event};

use crate::bus::MessageBus;
use crate::module::{Module, ModuleHandle, ModuleRef, RenderContext};
use crate::router::EventRouter;

const UNBOUND: &str = "composer has been unbound";
const NO_CONTAINER: &str = "no container to render into";

struct Slot {
    name: String,
    module: ModuleRef,
    // Direct container children produced by the last render call.
    contributed: Vec<Element>,
}

/// Owns a container, a module list, a bus and the router wiring them.
pub struct Composer {
    container: Option<Element>,
    bus: MessageBus,
    router: EventRouter,
    slots: Vec<Slot>,
    rendered: bool,
    unbound: bool,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl Composer {
    /// A composer with a fresh, private bus.
    #[must_use]
    pub fn new() -> Self {
        Self::with_bus(MessageBus::new())
    }

    /// A composer publishing global bindings on `bus`.
    #[must_use]
    pub fn with_bus(bus: MessageBus) -> Self {
        Self {
            container: None,
            router: EventRouter::new(bus.clone()),
            bus,
            slots: Vec::new(),
            rendered: false,
            unbound: false,
        }
    }

    /// Builder form of [`set_container`](Self::set_container).
    #[must_use]
    pub fn with_container(mut self, container: &Element) -> Self {
        self.container = Some(container.clone());
        self.router.set_container(Some(container));
        self
    }

    /// Set or swap the container.
    ///
    /// Swapping after a render drops all scene and render bindings and
    /// returns the composer to the not-rendered state; the next `render()`
    /// renders into the new container.
    ///
    /// # Errors
    ///
    /// `Lifecycle` after `unbind()`.
    pub fn set_container(&mut self, container: &Element) -> Result<(), ComposeError> {
        self.ensure_live()?;
        if self
            .container
            .as_ref()
            .is_some_and(|current| current.ptr_eq(container))
        {
            return Ok(());
        }
        if self.rendered {
            self.router.deactivate_all_dom();
            for slot in &mut self.slots {
                slot.contributed.clear();
            }
            self.rendered = false;
            tracing::debug!("composer: container swapped after render");
        }
        self.router.set_container(Some(container));
        self.container = Some(container.clone());
        Ok(())
    }

    #[must_use]
    pub fn container(&self) -> Option<&Element> {
        self.container.as_ref()
    }

    #[must_use]
    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Add a module, or replace the module with the same name in place.
    ///
    /// # Errors
    ///
    /// `Configuration` if the module's event spec is invalid (a replaced
    /// module stays registered), `Lifecycle` after `unbind()`.
    pub fn add_module<M: Module>(&mut self, module: M) -> Result<ModuleHandle<M>, ComposeError> {
        let handle = ModuleHandle::new(Rc::new(RefCell::new(module)));
        self.add_shared(handle.erased())?;
        Ok(handle)
    }

    /// Type-erased form of [`add_module`](Self::add_module).
    ///
    /// # Errors
    ///
    /// As for `add_module`.
    pub fn add_shared(&mut self, module: ModuleRef) -> Result<(), ComposeError> {
        self.ensure_live()?;
        let (name, spec) = {
            let m = module
                .try_borrow()
                .map_err(|_| ComposeError::Lifecycle("module is busy"))?;
            (m.name().to_string(), m.events())
        };
        self.router.register(&name, Rc::clone(&module), &spec)?;

        match self.slots.iter_mut().find(|s| s.name == name) {
            Some(slot) => {
                slot.module = module;
                tracing::debug!(module = name.as_str(), "composer: module replaced");
            }
            None => {
                self.slots.push(Slot {
                    name: name.clone(),
                    module,
                    contributed: Vec::new(),
                });
                tracing::debug!(module = name.as_str(), "composer: module added");
            }
        }

        self.router.activate_global(&name);
        if self.rendered {
            self.router.activate_dom(&name);
        }
        Ok(())
    }

    /// Remove a module and every subscription it holds.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown names, `Lifecycle` after `unbind()`.
    pub fn remove_module(&mut self, name: &str) -> Result<(), ComposeError> {
        self.ensure_live()?;
        let pos = self
            .slots
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| ComposeError::module_not_found(name))?;
        self.router.unregister(name);
        self.slots.remove(pos);
        tracing::debug!(module = name, "composer: module removed");
        Ok(())
    }

    /// Run every render hook in module order, then bring DOM bindings up
    /// to date.
    ///
    /// # Errors
    ///
    /// `Lifecycle` without a container or after `unbind()`.
    pub fn render(&mut self) -> Result<(), ComposeError> {
        self.ensure_live()?;
        let container = self
            .container
            .clone()
            .ok_or(ComposeError::Lifecycle(NO_CONTAINER))?;
        let _span = tracing::debug_span!("composer_render", modules = self.slots.len()).entered();

        let ctx = RenderContext {
            container: &container,
            bus: &self.bus,
        };
        for slot in &mut self.slots {
            for node in slot.contributed.drain(..) {
                node.detach();
            }
            let before = container.children();
            match slot.module.try_borrow_mut() {
                Ok(mut module) => module.render(&ctx),
                Err(_) => {
                    tracing::warn!(module = slot.name.as_str(), "render skipped: module is busy");
                    continue;
                }
            }
            slot.contributed = container
                .children()
                .into_iter()
                .filter(|child| !before.iter().any(|b| b.ptr_eq(child)))
                .collect();
            // Events the hook fired at its own module.
            self.router.run_deferred();
        }

        for slot in &self.slots {
            self.router.activate_dom(&slot.name);
        }
        self.router.refresh_render_layer();
        self.rendered = true;
        tracing::debug!("composer: rendered");
        Ok(())
    }

    /// Tear down every subscription and release the container. Terminal.
    ///
    /// # Errors
    ///
    /// `Lifecycle` when already unbound.
    pub fn unbind(&mut self) -> Result<(), ComposeError> {
        self.ensure_live()?;
        self.router.clear();
        self.router.set_container(None);
        self.slots.clear();
        self.container = None;
        self.rendered = false;
        self.unbound = true;
        tracing::debug!("composer: unbound");
        Ok(())
    }

    /// Fire an event on this composer's bus.
    ///
    /// # Errors
    ///
    /// `Lifecycle` after `unbind()`.
    pub fn fire(&self, event: &Event) -> Result<usize, ComposeError> {
        self.ensure_live()?;
        let delivered = self.bus.fire(event);
        self.router.run_deferred();
        Ok(delivered)
    }

    /// Dispatch a DOM event at `target`.
    ///
    /// # Errors
    ///
    /// `Lifecycle` after `unbind()`.
    pub fn dispatch(&self, target: &Element, event: &Event) -> Result<usize, ComposeError> {
        self.ensure_live()?;
        Ok(target.dispatch_event(event))
    }

    /// Module names in render order.
    #[must_use]
    pub fn module_names(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.name.clone()).collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.slots.iter().any(|s| s.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    #[must_use]
    pub fn is_unbound(&self) -> bool {
        self.unbound
    }

    /// Whether the module's scene/render bindings are live.
    #[must_use]
    pub fn is_dom_active(&self, name: &str) -> bool {
        self.router.is_dom_active(name)
    }

    /// Live listener count for one module, across namespaces.
    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.router.listener_count(name)
    }

    fn ensure_live(&self) -> Result<(), ComposeError> {
        if self.unbound {
            Err(ComposeError::Lifecycle(UNBOUND))
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for Composer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composer")
            .field("modules", &self.module_names())
            .field("rendered", &self.rendered)
            .field("unbound", &self.unbound)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_spec::EventSpec;
    use crate::module::{Dispatch, HandlerContext};
    use std::cell::Cell;

    struct Appender {
        name: &'static str,
        id: &'static str,
        renders: Rc<Cell<u32>>,
    }

    impl Module for Appender {
        fn name(&self) -> &str {
            self.name
        }

        fn render(&mut self, ctx: &RenderContext<'_>) {
            self.renders.set(self.renders.get() + 1);
            ctx.container.append(&Element::new("div").with_id(self.id));
        }
    }

    fn appender(name: &'static str, id: &'static str) -> (Appender, Rc<Cell<u32>>) {
        let renders = Rc::new(Cell::new(0));
        (
            Appender {
                name,
                id,
                renders: Rc::clone(&renders),
            },
            renders,
        )
    }

    #[test]
    fn render_requires_container() {
        let mut comp = Composer::new();
        let err = comp.render().unwrap_err();
        assert!(err.is_lifecycle());
    }

    #[test]
    fn repeated_render_is_idempotent() {
        let container = Element::new("div").with_child(Element::new("p").with_id("static"));
        let mut comp = Composer::new().with_container(&container);
        let (a, renders) = appender("a", "fromA");
        comp.add_module(a).unwrap();
        comp.render().unwrap();
        comp.render().unwrap();
        comp.render().unwrap();
        assert_eq!(renders.get(), 3);
        assert_eq!(container.query_all("#fromA").len(), 1);
        assert!(container.query("#static").is_some());
    }

    #[test]
    fn remove_leaves_rendered_nodes() {
        let container = Element::new("div");
        let mut comp = Composer::new().with_container(&container);
        let (a, _) = appender("a", "fromA");
        let (b, _) = appender("b", "fromB");
        comp.add_module(a).unwrap();
        comp.add_module(b).unwrap();
        comp.render().unwrap();
        comp.remove_module("a").unwrap();
        assert!(container.query("#fromA").is_some());
        comp.render().unwrap();
        assert_eq!(container.query_all("#fromA").len(), 1);
        assert_eq!(container.query_all("#fromB").len(), 1);
        assert!(comp.remove_module("a").unwrap_err().is_not_found());
    }

    #[test]
    fn replacement_keeps_position() {
        let container = Element::new("div");
        let mut comp = Composer::new().with_container(&container);
        let (a, _) = appender("a", "fromA");
        let (b, _) = appender("b", "fromB");
        let (a2, _) = appender("a", "fromA2");
        comp.add_module(a).unwrap();
        comp.add_module(b).unwrap();
        comp.render().unwrap();
        comp.add_module(a2).unwrap();
        assert_eq!(comp.module_names(), vec!["a", "b"]);
        comp.render().unwrap();
        let ids: Vec<_> = container.children().iter().filter_map(Element::id).collect();
        assert_eq!(ids, vec!["fromA2".to_string(), "fromB".to_string()]);
    }

    #[test]
    fn unbind_is_terminal() {
        let container = Element::new("div");
        let mut comp = Composer::new().with_container(&container);
        let (a, _) = appender("a", "fromA");
        comp.add_module(a).unwrap();
        comp.unbind().unwrap();
        assert!(comp.is_empty());
        assert!(comp.container().is_none());
        assert!(comp.render().unwrap_err().is_lifecycle());
        assert!(comp.unbind().unwrap_err().is_lifecycle());
        assert!(comp.fire(&Event::new("cancel")).unwrap_err().is_lifecycle());
        let (b, _) = appender("b", "fromB");
        assert!(comp.add_module(b).is_err());
    }

    struct Named;

    impl Module for Named {
        fn name(&self) -> &str {
            "Named"
        }

        fn events(&self) -> EventSpec {
            EventSpec::new().scene(".thing", "click", "noop")
        }

        fn dispatch(&mut self, _handler: &str, _ctx: &HandlerContext<'_>) -> Dispatch {
            Dispatch::Handled
        }
    }

    #[test]
    fn container_swap_resets_rendered_state() {
        let first = Element::new("div");
        let second = Element::new("div");
        let mut comp = Composer::new().with_container(&first);
        comp.add_module(Named).unwrap();
        comp.render().unwrap();
        assert!(comp.is_dom_active("Named"));
        assert_eq!(first.listener_count(), 1);

        comp.set_container(&second).unwrap();
        assert!(!comp.is_rendered());
        assert!(!comp.is_dom_active("Named"));
        assert_eq!(first.listener_count(), 0);

        comp.render().unwrap();
        assert_eq!(second.listener_count(), 1);
    }
}
