#![forbid(unsafe_code)]

//! Event router: turns module [`EventSpec`]s into live subscriptions.
//!
//! Each registered module gets a rank (its insertion ordinal, kept when the
//! module is replaced). Every listener the router installs is ordered by
//! `(phase, rank, subscription id)`, which yields the documented execution
//! order: all `Before` handlers, then `On`, then `After`; within one phase
//! by module order, then by declaration order.
//!
//! Three namespaces are supported:
//!
//! - **Scene**: one delegated listener per entry on the container. It fires
//!   when the event target (or its closest ancestor inside the container)
//!   matches the selector.
//! - **Render**: listeners attached directly to the elements matching the
//!   selector when the layer is (re)activated, typically after a render.
//! - **Global**: subscriptions on the composer's [`MessageBus`].
//!
//! # Invariants
//!
//! 1. `deactivate(name)` removes exactly that module's listeners.
//! 2. Registration never activates anything by itself.
//! 3. A rejected spec leaves any previous registration untouched.
//!
//! # Failure Modes
//!
//! - A named handler the module does not know is logged at `warn` and
//!   skipped.
//! - A handler that re-enters its own module (for example by firing a bus
//!   event the same module listens to) is queued with a copy of the event.
//!   The queued call runs once the module is free again, at the latest when
//!   the busy handler returns. The copy's propagation flags do not reach
//!   the original event.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use jgui_core::{ComposeError, Element, Event, ListenerHandle, Selector, WeakElement};

use crate::bus::{BusSubscription, MessageBus};
use crate::event_spec::{BindingEntry, EventSpec, Handler, HandlerRef, Namespace};
use crate::module::{Dispatch, HandlerContext, Module, ModuleRef};

/// Shared, weakly-held container reference.
type ContainerSlot = Rc<RefCell<Option<WeakElement>>>;

type WeakModule = Weak<RefCell<dyn Module>>;

/// A named-handler call that arrived while its module was busy.
struct PendingCall {
    owner: String,
    module: WeakModule,
    handler: Handler,
    event: Event,
    current: Option<Element>,
    container: Option<Element>,
    bus: MessageBus,
}

/// Calls waiting for their module, in arrival order.
#[derive(Clone, Default)]
struct Deferred {
    queue: Rc<RefCell<VecDeque<PendingCall>>>,
}

impl Deferred {
    fn push(&self, owner: &str, module: &WeakModule, handler: &Handler, ctx: &HandlerContext<'_>) {
        self.queue.borrow_mut().push_back(PendingCall {
            owner: owner.to_string(),
            module: module.clone(),
            handler: handler.clone(),
            event: ctx.event.snapshot(),
            current: ctx.current.cloned(),
            container: ctx.container.cloned(),
            bus: ctx.bus.clone(),
        });
    }

    fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Drop queued calls for `module`.
    fn forget(&self, module: &ModuleRef) {
        let target = Rc::downgrade(module);
        self.queue
            .borrow_mut()
            .retain(|call| !Weak::ptr_eq(&call.module, &target));
    }

    fn clear(&self) {
        self.queue.borrow_mut().clear();
    }

    /// Run every queued call whose module is free. Busy ones stay queued.
    fn drain(&self) {
        if self.queue.borrow().is_empty() {
            return;
        }
        let batch: Vec<PendingCall> = self.queue.borrow_mut().drain(..).collect();
        let mut busy = Vec::new();
        for call in batch {
            let Some(module) = call.module.upgrade() else {
                continue;
            };
            let free = module.try_borrow_mut().is_ok();
            if !free {
                busy.push(call);
                continue;
            }
            let ctx = HandlerContext {
                event: &call.event,
                current: call.current.as_ref(),
                container: call.container.as_ref(),
                bus: &call.bus,
            };
            invoke(&call.owner, &call.module, &call.handler, &ctx, self);
        }
        let mut queue = self.queue.borrow_mut();
        for call in busy.into_iter().rev() {
            queue.push_front(call);
        }
    }
}

struct CompiledEntry {
    entry: BindingEntry,
    selector: Option<Selector>,
}

struct Registration {
    name: String,
    rank: u64,
    module: ModuleRef,
    entries: Vec<CompiledEntry>,
    global: Vec<BusSubscription>,
    scene: Vec<ListenerHandle>,
    render: Vec<ListenerHandle>,
    dom_active: bool,
}

impl Registration {
    fn drop_dom(&mut self) {
        self.scene.clear();
        self.render.clear();
        self.dom_active = false;
    }
}

/// Maps module event specs to live listeners.
pub struct EventRouter {
    bus: MessageBus,
    container: ContainerSlot,
    registrations: Vec<Registration>,
    next_rank: u64,
    deferred: Deferred,
}

impl EventRouter {
    #[must_use]
    pub fn new(bus: MessageBus) -> Self {
        Self {
            bus,
            container: Rc::new(RefCell::new(None)),
            registrations: Vec::new(),
            next_rank: 0,
            deferred: Deferred::default(),
        }
    }

    #[must_use]
    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Point the router at a (new) container. Does not touch active
    /// listeners; callers deactivate first.
    pub fn set_container(&mut self, container: Option<&Element>) {
        *self.container.borrow_mut() = container.map(Element::downgrade);
    }

    #[must_use]
    pub fn container(&self) -> Option<Element> {
        self.container.borrow().as_ref().and_then(WeakElement::upgrade)
    }

    /// Validate `spec` and register it under `name`.
    ///
    /// Replacing an existing name drops its listeners and keeps its rank.
    ///
    /// # Errors
    ///
    /// `ComposeError::Configuration` when the event spec does not validate.
    pub fn register(
        &mut self,
        name: &str,
        module: ModuleRef,
        spec: &EventSpec,
    ) -> Result<(), ComposeError> {
        let selectors = spec.validate(name)?;
        let entries = spec
            .entries()
            .iter()
            .cloned()
            .zip(selectors)
            .map(|(entry, selector)| CompiledEntry { entry, selector })
            .collect();

        if let Some(pos) = self.position(name) {
            let rank = self.registrations[pos].rank;
            self.deferred.forget(&self.registrations[pos].module);
            self.registrations[pos] = Registration::new(name, rank, module, entries);
            tracing::debug!(module = name, rank, "router: replaced registration");
        } else {
            let rank = self.next_rank;
            self.next_rank += 1;
            self.registrations
                .push(Registration::new(name, rank, module, entries));
            tracing::debug!(module = name, rank, "router: registered");
        }
        Ok(())
    }

    /// Drop a registration and all of its listeners.
    pub fn unregister(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(pos) => {
                let reg = self.registrations.remove(pos);
                self.deferred.forget(&reg.module);
                tracing::debug!(module = name, "router: unregistered");
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Subscribe the module's global entries on the bus.
    pub fn activate_global(&mut self, name: &str) {
        let Some(pos) = self.position(name) else {
            return;
        };
        let bus = self.bus.clone();
        let slot = Rc::clone(&self.container);
        let deferred = self.deferred.clone();
        let reg = &mut self.registrations[pos];
        if !reg.global.is_empty() {
            return;
        }
        let module = Rc::downgrade(&reg.module);
        for compiled in reg
            .entries
            .iter()
            .filter(|c| c.entry.namespace == Namespace::Global)
        {
            let handler = compiled.entry.handler.clone();
            let owner = reg.name.clone();
            let module = module.clone();
            let weak_bus = bus.downgrade();
            let slot = Rc::clone(&slot);
            let deferred = deferred.clone();
            reg.global.push(bus.subscribe_with(
                compiled.entry.event.clone(),
                handler.phase,
                reg.rank,
                move |event: &Event| {
                    let Some(bus) = weak_bus.upgrade() else {
                        return;
                    };
                    let container = slot.borrow().as_ref().and_then(WeakElement::upgrade);
                    let ctx = HandlerContext {
                        event,
                        current: None,
                        container: container.as_ref(),
                        bus: &bus,
                    };
                    invoke(&owner, &module, &handler, &ctx, &deferred);
                },
            ));
        }
        tracing::debug!(
            module = name,
            listeners = reg.global.len(),
            "router: global bindings active"
        );
    }

    /// Attach the module's scene and render entries to the container.
    ///
    /// No-op without a container or when already active.
    pub fn activate_dom(&mut self, name: &str) {
        let Some(container) = self.container() else {
            return;
        };
        let Some(pos) = self.position(name) else {
            return;
        };
        let bus = self.bus.downgrade();
        let deferred = self.deferred.clone();
        let reg = &mut self.registrations[pos];
        if reg.dom_active {
            return;
        }
        let module = Rc::downgrade(&reg.module);
        for compiled in &reg.entries {
            if compiled.entry.namespace != Namespace::Scene {
                continue;
            }
            let Some(selector) = compiled.selector.clone() else {
                continue;
            };
            let handler = compiled.entry.handler.clone();
            let owner = reg.name.clone();
            let module = module.clone();
            let bus = bus.clone();
            let deferred = deferred.clone();
            reg.scene.push(container.add_listener(
                compiled.entry.event.clone(),
                handler.phase,
                reg.rank,
                move |event: &Event, scope: &Element| {
                    let Some(target) = event.target() else {
                        return;
                    };
                    let Some(matched) = target.closest_within(&selector, scope) else {
                        return;
                    };
                    let Some(bus) = bus.upgrade() else {
                        return;
                    };
                    let ctx = HandlerContext {
                        event,
                        current: Some(&matched),
                        container: Some(scope),
                        bus: &bus,
                    };
                    invoke(&owner, &module, &handler, &ctx, &deferred);
                },
            ));
        }
        reg.render = attach_render(reg, &container, &bus, &deferred);
        reg.dom_active = true;
        tracing::debug!(
            module = name,
            scene = reg.scene.len(),
            render = reg.render.len(),
            "router: dom bindings active"
        );
    }

    /// Re-attach render-layer listeners of every DOM-active module to the
    /// elements currently matching their selectors.
    pub fn refresh_render_layer(&mut self) {
        let Some(container) = self.container() else {
            return;
        };
        let bus = self.bus.downgrade();
        for reg in self.registrations.iter_mut().filter(|r| r.dom_active) {
            reg.render.clear();
            reg.render = attach_render(reg, &container, &bus, &self.deferred);
        }
    }

    /// Remove the module's scene and render listeners.
    pub fn deactivate_dom(&mut self, name: &str) {
        if let Some(pos) = self.position(name) {
            self.registrations[pos].drop_dom();
        }
    }

    /// Remove every listener of the module. No-op when nothing is active.
    pub fn deactivate(&mut self, name: &str) {
        if let Some(pos) = self.position(name) {
            let reg = &mut self.registrations[pos];
            if reg.global.is_empty() && !reg.dom_active {
                return;
            }
            reg.global.clear();
            reg.drop_dom();
            tracing::debug!(module = name, "router: deactivated");
        }
    }

    /// Drop DOM listeners of every module.
    pub fn deactivate_all_dom(&mut self) {
        for reg in &mut self.registrations {
            reg.drop_dom();
        }
    }

    /// Drop every registration.
    pub fn clear(&mut self) {
        self.registrations.clear();
        self.deferred.clear();
    }

    /// Run queued re-entrant calls whose module is free again.
    pub fn run_deferred(&self) {
        self.deferred.drain();
    }

    /// Number of queued re-entrant calls.
    #[must_use]
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    #[must_use]
    pub fn is_global_active(&self, name: &str) -> bool {
        self.position(name)
            .is_some_and(|pos| !self.registrations[pos].global.is_empty())
    }

    #[must_use]
    pub fn is_dom_active(&self, name: &str) -> bool {
        self.position(name)
            .is_some_and(|pos| self.registrations[pos].dom_active)
    }

    /// Registered names in rank order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut regs: Vec<&Registration> = self.registrations.iter().collect();
        regs.sort_by_key(|r| r.rank);
        regs.into_iter().map(|r| r.name.clone()).collect()
    }

    /// Live listener count for one module.
    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.position(name).map_or(0, |pos| {
            let reg = &self.registrations[pos];
            reg.global.len() + reg.scene.len() + reg.render.len()
        })
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.registrations.iter().position(|r| r.name == name)
    }
}

impl Registration {
    fn new(name: &str, rank: u64, module: ModuleRef, entries: Vec<CompiledEntry>) -> Self {
        Self {
            name: name.to_string(),
            rank,
            module,
            entries,
            global: Vec::new(),
            scene: Vec::new(),
            render: Vec::new(),
            dom_active: false,
        }
    }
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter")
            .field("modules", &self.names())
            .finish()
    }
}

fn attach_render(
    reg: &Registration,
    container: &Element,
    bus: &crate::bus::WeakBus,
    deferred: &Deferred,
) -> Vec<ListenerHandle> {
    let module = Rc::downgrade(&reg.module);
    let mut handles = Vec::new();
    for compiled in &reg.entries {
        if compiled.entry.namespace != Namespace::Render {
            continue;
        }
        let Some(selector) = &compiled.selector else {
            continue;
        };
        for element in container.select_all(selector) {
            let handler = compiled.entry.handler.clone();
            let owner = reg.name.clone();
            let module = module.clone();
            let bus = bus.clone();
            let deferred = deferred.clone();
            let scope = container.downgrade();
            handles.push(element.add_listener(
                compiled.entry.event.clone(),
                handler.phase,
                reg.rank,
                move |event: &Event, node: &Element| {
                    let Some(bus) = bus.upgrade() else {
                        return;
                    };
                    let container = scope.upgrade();
                    let ctx = HandlerContext {
                        event,
                        current: Some(node),
                        container: container.as_ref(),
                        bus: &bus,
                    };
                    invoke(&owner, &module, &handler, &ctx, &deferred);
                },
            ));
        }
    }
    handles
}

fn invoke(
    owner: &str,
    module: &WeakModule,
    handler: &Handler,
    ctx: &HandlerContext<'_>,
    deferred: &Deferred,
) {
    tracing::trace!(
        module = owner,
        event = ctx.event.name(),
        handler = handler.label(),
        phase = %handler.phase,
        "dispatch"
    );
    match &handler.target {
        HandlerRef::Inline(callback) => callback(ctx),
        HandlerRef::Named(name) => {
            let Some(strong) = module.upgrade() else {
                return;
            };
            let Ok(mut instance) = strong.try_borrow_mut() else {
                tracing::debug!(
                    module = owner,
                    handler = name.as_str(),
                    "handler deferred: module is busy"
                );
                deferred.push(owner, module, handler, ctx);
                return;
            };
            let outcome = instance.dispatch(name, ctx);
            drop(instance);
            if outcome == Dispatch::Unhandled {
                tracing::warn!(module = owner, handler = name.as_str(), "unknown handler");
            }
            deferred.drain();
        }
    }
}
