#![forbid(unsafe_code)]

//! Binding engine: keeps viewlet fragments in sync with one model.
//!
//! The engine owns a *region* element (the viewlet container) and shows at
//! most one viewlet fragment in it at a time. Fragments of viewlets that
//! were shown before stay alive while detached and keep receiving updates.
//!
//! On `bind` a reverse index `attribute path → viewlets` is built from the
//! viewlets' declared bindings. A model change on path `P` touches only the
//! viewlets whose binding paths are *related* to `P` (equal, ancestor or
//! descendant; see [`paths_related`]) and, inside those, only the bound
//! nodes.
//!
//! Viewlets with a `rebind` derive a value from the model (typically a
//! collection). The derived value is re-evaluated on every change. Plain
//! values call `update` only when they differ. A [`ModelList`] can change
//! in place, so a derived list calls `update` on every change the engine
//! processes, and also whenever the list or one of its member models
//! changes.
//!
//! # Invariants
//!
//! 1. After `rebind(new)`, changes to the previous model never reach a
//!    fragment.
//! 2. Exactly one viewlet is active after a successful `show_viewlet`.
//! 3. A model mutation made from inside an update callback is queued and
//!    processed after the current change completes, in order.
//!
//! # Failure Modes
//!
//! - A binding target missing from its fragment is logged at `warn` and
//!   skipped; other bindings still apply.
//! - `show_viewlet` with an unknown name returns `NotFound` and leaves the
//!   active viewlet unchanged.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use jgui_core::{ComposeError, Element};

use crate::model::{Model, ModelList, Value};
use crate::reactive::{BindingScope, Observable, Subscription};
use crate::viewlet::{Binding, Viewlet};

/// Whether two dotted paths refer to overlapping data.
///
/// `a` and `b` are related when they are equal or one is a dotted prefix of
/// the other (`aggregated_status` and `aggregated_status.running`).
#[must_use]
pub fn paths_related(a: &str, b: &str) -> bool {
    fn is_prefix(short: &str, long: &str) -> bool {
        long.len() > short.len()
            && long.starts_with(short)
            && long.as_bytes()[short.len()] == b'.'
    }
    a == b || is_prefix(a, b) || is_prefix(b, a)
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct ViewletSlot {
    viewlet: Viewlet,
    fragment: Option<Element>,
    stale: bool,
    derived: Option<Value>,
    derived_sub: Option<Subscription>,
    member_subs: Vec<Subscription>,
}

impl ViewletSlot {
    fn new(viewlet: Viewlet) -> Self {
        Self {
            viewlet,
            fragment: None,
            stale: false,
            derived: None,
            derived_sub: None,
            member_subs: Vec::new(),
        }
    }

    fn reset_derived(&mut self) {
        self.derived = None;
        self.derived_sub = None;
        self.member_subs.clear();
    }
}

#[derive(Default)]
struct EngineState {
    model: Option<Model>,
    slots: Vec<ViewletSlot>,
    index: BTreeMap<String, Vec<usize>>,
    scope: BindingScope,
}

impl EngineState {
    fn position(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.viewlet.name() == name)
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, slot) in self.slots.iter().enumerate() {
            for binding in slot.viewlet.bindings() {
                let entry = self.index.entry(binding.path.clone()).or_default();
                if !entry.contains(&i) {
                    entry.push(i);
                }
            }
        }
    }

    /// Viewlet indices with a binding related to `path`, ascending.
    fn affected(&self, path: &str) -> Vec<usize> {
        let mut hits: Vec<usize> = Vec::new();
        // Equal path and ancestors.
        let mut prefix = String::new();
        for (i, seg) in path.split('.').enumerate() {
            if i > 0 {
                prefix.push('.');
            }
            prefix.push_str(seg);
            if let Some(found) = self.index.get(&prefix) {
                hits.extend(found);
            }
        }
        // Descendants: every key in ["path.", "path/"), '/' follows '.'.
        let lo = format!("{path}.");
        let hi = format!("{path}/");
        for found in self.index.range(lo..hi).map(|(_, v)| v) {
            hits.extend(found);
        }
        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

enum Job {
    Change { generation: u64, path: String },
    List { generation: u64, slot: usize },
}

struct EngineInner {
    region: Element,
    state: RefCell<EngineState>,
    active: Observable<Option<String>>,
    queue: RefCell<VecDeque<Job>>,
    flushing: Cell<bool>,
    generation: Cell<u64>,
    renders: Cell<u64>,
}

// ---------------------------------------------------------------------------
// BindingEngine
// ---------------------------------------------------------------------------

/// Synchronizes viewlet fragments with a model. Clones share state.
#[derive(Clone)]
pub struct BindingEngine {
    inner: Rc<EngineInner>,
}

impl BindingEngine {
    /// An unbound engine rendering into `region`.
    #[must_use]
    pub fn new(region: &Element) -> Self {
        Self {
            inner: Rc::new(EngineInner {
                region: region.clone(),
                state: RefCell::new(EngineState::default()),
                active: Observable::new(None),
                queue: RefCell::new(VecDeque::new()),
                flushing: Cell::new(false),
                generation: Cell::new(0),
                renders: Cell::new(0),
            }),
        }
    }

    #[must_use]
    pub fn region(&self) -> &Element {
        &self.inner.region
    }

    /// Track `model` with `viewlets`, replacing any previous binding.
    ///
    /// The previously active viewlet is shown again if it is still part of
    /// the set.
    ///
    /// # Errors
    ///
    /// `Configuration` if any viewlet does not validate; the engine keeps
    /// its previous binding in that case.
    pub fn bind(
        &self,
        model: &Model,
        viewlets: impl IntoIterator<Item = Viewlet>,
    ) -> Result<(), ComposeError> {
        let viewlets: Vec<Viewlet> = viewlets.into_iter().collect();
        for viewlet in &viewlets {
            viewlet.validate()?;
        }
        let previous = self.active_viewlet();
        {
            let mut state = self.inner.state.borrow_mut();
            state.scope.clear();
            for slot in &state.slots {
                if let Some(fragment) = &slot.fragment {
                    fragment.detach();
                }
            }
            let mut slots: Vec<ViewletSlot> = Vec::new();
            for viewlet in viewlets {
                match slots.iter_mut().find(|s| s.viewlet.name() == viewlet.name()) {
                    Some(slot) => *slot = ViewletSlot::new(viewlet),
                    None => slots.push(ViewletSlot::new(viewlet)),
                }
            }
            state.slots = slots;
            state.rebuild_index();
        }
        self.inner.active.set(None);
        tracing::debug!(
            model = model.id(),
            viewlets = self.inner.state.borrow().slots.len(),
            "binding: bind"
        );
        self.attach(model);
        if let Some(name) = previous.filter(|n| self.has_viewlet(n)) {
            self.show_viewlet(&name)?;
        }
        Ok(())
    }

    /// Swap the tracked model, keeping the viewlets.
    ///
    /// The active viewlet re-renders against the new model; other fragments
    /// are marked stale and re-render on their next activation.
    ///
    /// # Errors
    ///
    /// `Lifecycle` when the engine has never been bound.
    pub fn rebind(&self, model: &Model) -> Result<(), ComposeError> {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.model.is_none() {
                return Err(ComposeError::Lifecycle("binding engine is not bound"));
            }
            state.scope.clear();
            for slot in &mut state.slots {
                slot.reset_derived();
                slot.stale = slot.fragment.is_some();
            }
        }
        tracing::debug!(model = model.id(), "binding: rebind");
        self.attach(model);
        if let Some(name) = self.active_viewlet() {
            self.show_viewlet(&name)?;
        }
        Ok(())
    }

    /// Subscribe to `model` under a new generation.
    fn attach(&self, model: &Model) {
        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);
        self.inner.queue.borrow_mut().clear();

        let weak = Rc::downgrade(&self.inner);
        let sub = model.on_change(move |change| {
            if let Some(engine) = upgrade(&weak) {
                engine.enqueue(Job::Change {
                    generation,
                    path: change.path.clone(),
                });
            }
        });
        let derived: Vec<usize> = {
            let mut state = self.inner.state.borrow_mut();
            state.model = Some(model.clone());
            state.scope.hold(sub);
            state
                .slots
                .iter()
                .enumerate()
                .filter(|(_, s)| s.viewlet.has_rebind())
                .map(|(i, _)| i)
                .collect()
        };
        for slot in derived {
            self.refresh_derived(slot, model, false);
        }
    }

    /// Show a viewlet in the region, rendering it if needed.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown names, `Lifecycle` when unbound.
    pub fn show_viewlet(&self, name: &str) -> Result<Element, ComposeError> {
        let (index, model, reuse) = {
            let state = self.inner.state.borrow();
            let index = state
                .position(name)
                .ok_or_else(|| ComposeError::viewlet_not_found(name))?;
            let model = state
                .model
                .clone()
                .ok_or(ComposeError::Lifecycle("binding engine is not bound"))?;
            let slot = &state.slots[index];
            let reuse = slot.fragment.clone().filter(|_| !slot.stale);
            (index, model, reuse)
        };

        let fragment = match reuse {
            Some(fragment) => fragment,
            None => self.render_slot(index, &model),
        };

        let previous: Vec<Element> = {
            let state = self.inner.state.borrow();
            state
                .slots
                .iter()
                .filter_map(|s| s.fragment.clone())
                .filter(|f| !f.ptr_eq(&fragment))
                .collect()
        };
        for other in previous {
            if other.parent().is_some_and(|p| p.ptr_eq(&self.inner.region)) {
                other.detach();
            }
        }
        if !fragment
            .parent()
            .is_some_and(|p| p.ptr_eq(&self.inner.region))
        {
            self.inner.region.append(&fragment);
        }
        self.inner.active.set(Some(name.to_string()));
        tracing::debug!(viewlet = name, "binding: viewlet shown");
        Ok(fragment)
    }

    fn render_slot(&self, index: usize, model: &Model) -> Element {
        let (template, viewlet) = {
            let state = self.inner.state.borrow();
            let viewlet = state.slots[index].viewlet.clone();
            (viewlet.template_fn(), viewlet)
        };
        let fragment = template(model);
        self.inner.renders.set(self.inner.renders.get() + 1);
        {
            let mut state = self.inner.state.borrow_mut();
            let slot = &mut state.slots[index];
            if let Some(old) = slot.fragment.replace(fragment.clone()) {
                if !old.ptr_eq(&fragment) {
                    old.detach();
                }
            }
            slot.stale = false;
        }
        for binding in viewlet.bindings() {
            apply_binding(&viewlet, binding, model, &fragment);
        }
        if viewlet.has_rebind() {
            self.refresh_derived(index, model, true);
        }
        fragment
    }

    /// Stop tracking the model and drop every fragment.
    pub fn unbind(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.scope.clear();
            for slot in &state.slots {
                if let Some(fragment) = &slot.fragment {
                    fragment.detach();
                }
            }
            state.slots.clear();
            state.index.clear();
            state.model = None;
        }
        self.inner.generation.set(self.inner.generation.get() + 1);
        self.inner.queue.borrow_mut().clear();
        self.inner.active.set(None);
        tracing::debug!("binding: unbound");
    }

    // -----------------------------------------------------------------------
    // Change processing
    // -----------------------------------------------------------------------

    fn enqueue(&self, job: Job) {
        self.inner.queue.borrow_mut().push_back(job);
        if self.inner.flushing.get() {
            return;
        }
        self.inner.flushing.set(true);
        let _span = tracing::debug_span!("binding_flush").entered();
        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(job) = next else {
                break;
            };
            match job {
                Job::Change { generation, path } if generation == self.inner.generation.get() => {
                    self.process_change(&path);
                }
                Job::List { generation, slot } if generation == self.inner.generation.get() => {
                    self.process_list(slot);
                }
                _ => tracing::trace!("binding: dropped job from previous model"),
            }
        }
        self.inner.flushing.set(false);
    }

    fn process_change(&self, path: &str) {
        let (model, work, derived) = {
            let state = self.inner.state.borrow();
            let Some(model) = state.model.clone() else {
                return;
            };
            let mut work: Vec<(Viewlet, Binding, Element)> = Vec::new();
            for index in state.affected(path) {
                let slot = &state.slots[index];
                let Some(fragment) = &slot.fragment else {
                    continue;
                };
                for binding in slot
                    .viewlet
                    .bindings()
                    .iter()
                    .filter(|b| paths_related(&b.path, path))
                {
                    work.push((slot.viewlet.clone(), binding.clone(), fragment.clone()));
                }
            }
            let derived: Vec<usize> = state
                .slots
                .iter()
                .enumerate()
                .filter(|(_, s)| s.viewlet.has_rebind())
                .map(|(i, _)| i)
                .collect();
            (model, work, derived)
        };
        tracing::trace!(path, bindings = work.len(), "binding: change");
        for (viewlet, binding, fragment) in &work {
            apply_binding(viewlet, binding, &model, fragment);
        }
        for index in derived {
            self.refresh_derived(index, &model, false);
        }
    }

    fn process_list(&self, index: usize) {
        let target = {
            let mut state = self.inner.state.borrow_mut();
            let Some(slot) = state.slots.get_mut(index) else {
                return;
            };
            let Some(Value::Models(list)) = slot.derived.clone() else {
                return;
            };
            slot.member_subs = self.watch_members(index, &list);
            slot.fragment
                .clone()
                .map(|f| (slot.viewlet.updater(), Value::Models(list), f))
        };
        if let Some((update, value, fragment)) = target {
            update(&value, &fragment);
        }
    }

    fn list_job(&self, index: usize) -> impl Fn() + 'static {
        let weak = Rc::downgrade(&self.inner);
        let generation = self.inner.generation.get();
        move || {
            if let Some(engine) = upgrade(&weak) {
                engine.enqueue(Job::List {
                    generation,
                    slot: index,
                });
            }
        }
    }

    /// One change subscription per member of `list`.
    fn watch_members(&self, index: usize, list: &ModelList) -> Vec<Subscription> {
        list.to_vec()
            .iter()
            .map(|member| {
                let job = self.list_job(index);
                member.on_change(move |_| job())
            })
            .collect()
    }

    /// Re-run a viewlet's `rebind` and call `update` when the result moved
    /// or is a list.
    fn refresh_derived(&self, index: usize, model: &Model, force: bool) {
        let Some(rebind) = self
            .inner
            .state
            .borrow()
            .slots
            .get(index)
            .and_then(|s| s.viewlet.rebind_fn())
        else {
            return;
        };
        let value = rebind(model);

        let target = {
            let mut state = self.inner.state.borrow_mut();
            let slot = &mut state.slots[index];
            let same_list = matches!(
                (&slot.derived, &value),
                (Some(Value::Models(a)), Value::Models(b)) if a.ptr_eq(b)
            );
            let changed = match (&slot.derived, &value) {
                (_, Value::Models(_)) | (None, _) => true,
                (Some(old), new) => old != new,
            };
            if !same_list {
                match &value {
                    Value::Models(list) => {
                        let job = self.list_job(index);
                        slot.derived_sub = Some(list.on_change(move |_| job()));
                        slot.member_subs = self.watch_members(index, list);
                    }
                    _ => {
                        slot.derived_sub = None;
                        slot.member_subs.clear();
                    }
                }
            }
            slot.derived = Some(value.clone());
            if !(changed || force) {
                return;
            }
            slot.fragment
                .clone()
                .map(|f| (slot.viewlet.updater(), f))
        };
        if let Some((update, fragment)) = target {
            update(&value, &fragment);
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Name of the active viewlet.
    #[must_use]
    pub fn active_viewlet(&self) -> Option<String> {
        self.inner.active.get()
    }

    /// Observe active-viewlet changes.
    pub fn on_active_change(&self, callback: impl Fn(&Option<String>) + 'static) -> Subscription {
        self.inner.active.subscribe(callback)
    }

    /// Rendered fragment of a viewlet, if it has been shown.
    #[must_use]
    pub fn fragment(&self, name: &str) -> Option<Element> {
        let state = self.inner.state.borrow();
        state
            .position(name)
            .and_then(|i| state.slots[i].fragment.clone())
    }

    #[must_use]
    pub fn model(&self) -> Option<Model> {
        self.inner.state.borrow().model.clone()
    }

    #[must_use]
    pub fn has_viewlet(&self, name: &str) -> bool {
        self.inner.state.borrow().position(name).is_some()
    }

    #[must_use]
    pub fn viewlet_names(&self) -> Vec<String> {
        self.inner
            .state
            .borrow()
            .slots
            .iter()
            .map(|s| s.viewlet.name().to_string())
            .collect()
    }

    /// Viewlets whose bindings relate to `path`, in bind order.
    #[must_use]
    pub fn affected_viewlets(&self, path: &str) -> Vec<String> {
        let state = self.inner.state.borrow();
        state
            .affected(path)
            .into_iter()
            .map(|i| state.slots[i].viewlet.name().to_string())
            .collect()
    }

    /// Number of template renders so far.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.inner.renders.get()
    }

    /// Whether a viewlet's fragment will re-render on its next activation.
    #[must_use]
    pub fn is_stale(&self, name: &str) -> bool {
        let state = self.inner.state.borrow();
        state.position(name).is_some_and(|i| state.slots[i].stale)
    }
}

impl fmt::Debug for BindingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingEngine")
            .field("viewlets", &self.viewlet_names())
            .field("active", &self.active_viewlet())
            .finish()
    }
}

fn upgrade(weak: &Weak<EngineInner>) -> Option<BindingEngine> {
    weak.upgrade().map(|inner| BindingEngine { inner })
}

fn apply_binding(viewlet: &Viewlet, binding: &Binding, model: &Model, fragment: &Element) {
    let target = if jgui_core::Selector::parse(&binding.target).is_ok_and(|s| s.matches(fragment)) {
        Some(fragment.clone())
    } else {
        fragment.query(&binding.target)
    };
    let Some(target) = target else {
        tracing::warn!(
            viewlet = viewlet.name(),
            target = binding.target.as_str(),
            "binding target not found; skipped"
        );
        return;
    };
    let value = model.get(&binding.path).unwrap_or_default();
    viewlet.apply(&value, &target);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelList;

    fn service(id: &str, name: &str) -> Model {
        Model::new(id)
            .with("displayName", name)
            .with("aggregated_status.running", 2)
            .with("aggregated_status.error", 0)
    }

    fn overview() -> Viewlet {
        Viewlet::new("overview", |m| {
            Element::new("div")
                .with_child(
                    Element::new("h1")
                        .with_attr("data-bind", "displayName")
                        .with_text(m.get_str("displayName").unwrap_or_default()),
                )
                .with_child(Element::new("span").with_attr("data-bind", "running"))
                .with_child(Element::new("span").with_attr("data-bind", "error"))
        })
        .bind("displayName", "[data-bind=displayName]")
        .bind("aggregated_status.running", "[data-bind=running]")
        .bind("aggregated_status.error", "[data-bind=error]")
    }

    fn text(fragment: &Element, sel: &str) -> String {
        fragment.query(sel).map(|e| e.text()).unwrap_or_default()
    }

    #[test]
    fn related_paths() {
        assert!(paths_related("a", "a"));
        assert!(paths_related("a", "a.b"));
        assert!(paths_related("a.b.c", "a"));
        assert!(!paths_related("a", "ab"));
        assert!(!paths_related("a.b", "a.c"));
    }

    #[test]
    fn change_updates_only_bound_node() {
        let region = Element::new("div");
        let engine = BindingEngine::new(&region);
        let model = service("wp", "wordpress");
        engine.bind(&model, [overview()]).unwrap();
        let fragment = engine.show_viewlet("overview").unwrap();
        assert_eq!(text(&fragment, "[data-bind=running]"), "2");

        let heading = fragment.query("h1").unwrap();
        heading.set_attr("marker", "kept");
        model.set("aggregated_status.running", 5);
        assert_eq!(text(&fragment, "[data-bind=running]"), "5");
        assert_eq!(heading.attr("marker").as_deref(), Some("kept"));
        assert_eq!(engine.render_count(), 1);
    }

    #[test]
    fn ancestor_write_reaches_descendant_bindings() {
        let region = Element::new("div");
        let engine = BindingEngine::new(&region);
        let model = service("wp", "wordpress");
        engine.bind(&model, [overview()]).unwrap();
        let fragment = engine.show_viewlet("overview").unwrap();

        let mut status = BTreeMap::new();
        status.insert("running".to_string(), Value::Int(1));
        status.insert("error".to_string(), Value::Int(4));
        model.set("aggregated_status", Value::Map(status));
        assert_eq!(text(&fragment, "[data-bind=running]"), "1");
        assert_eq!(text(&fragment, "[data-bind=error]"), "4");
        assert_eq!(engine.affected_viewlets("aggregated_status"), vec!["overview"]);
        assert!(engine.affected_viewlets("charm").is_empty());
    }

    #[test]
    fn rebind_ignores_old_model() {
        let region = Element::new("div");
        let engine = BindingEngine::new(&region);
        let old = service("wp", "wordpress");
        let new = service("mysql", "mysql");
        engine.bind(&old, [overview()]).unwrap();
        engine.show_viewlet("overview").unwrap();
        engine.rebind(&new).unwrap();

        let fragment = engine.fragment("overview").unwrap();
        assert_eq!(text(&fragment, "h1"), "mysql");
        old.set("displayName", "stale");
        assert_eq!(text(&fragment, "h1"), "mysql");
        new.set("displayName", "mysql-2");
        assert_eq!(text(&fragment, "h1"), "mysql-2");
        assert_eq!(region.child_count(), 1);
    }

    #[test]
    fn unknown_viewlet_keeps_active() {
        let region = Element::new("div");
        let engine = BindingEngine::new(&region);
        engine.bind(&service("wp", "wp"), [overview()]).unwrap();
        engine.show_viewlet("overview").unwrap();
        assert!(engine.show_viewlet("config").unwrap_err().is_not_found());
        assert_eq!(engine.active_viewlet().as_deref(), Some("overview"));
    }

    #[test]
    fn missing_target_is_skipped() {
        let region = Element::new("div");
        let engine = BindingEngine::new(&region);
        let model = service("wp", "wordpress").with("charm", "cs:wordpress");
        let viewlet = overview().bind("charm", "[data-bind=charm]");
        engine.bind(&model, [viewlet]).unwrap();
        let fragment = engine.show_viewlet("overview").unwrap();
        model.batch(|m| {
            m.set("charm", "cs:wordpress-2");
            m.set("aggregated_status.error", 1);
        });
        assert_eq!(text(&fragment, "[data-bind=error]"), "1");
    }

    #[test]
    fn derived_list_updates() {
        let region = Element::new("div");
        let engine = BindingEngine::new(&region);
        let units = ModelList::from_models([Model::new("wp/0")]);
        let model = service("wp", "wordpress").with("units", units.clone());
        let updates = Rc::new(Cell::new(0));
        let u = Rc::clone(&updates);
        let viewlet = Viewlet::new("units", |_| Element::new("ul"))
            .with_rebind(|m| m.get("units").unwrap_or_default())
            .with_update(move |value, root| {
                u.set(u.get() + 1);
                let items = value
                    .as_models()
                    .map(|l| l.to_vec())
                    .unwrap_or_default()
                    .into_iter()
                    .map(|m| Element::new("li").with_text(m.id()));
                root.set_children(items);
            });
        engine.bind(&model, [viewlet]).unwrap();
        let fragment = engine.show_viewlet("units").unwrap();
        assert_eq!(fragment.child_count(), 1);
        let base = updates.get();

        units.add(Model::new("wp/1"));
        assert_eq!(fragment.child_count(), 2);
        assert_eq!(updates.get(), base + 1);

        model.set("displayName", "unrelated");
        assert_eq!(updates.get(), base + 2, "lists refresh on every change");

        let replacement = ModelList::from_models([Model::new("wp/7")]);
        model.set("units", replacement.clone());
        assert_eq!(fragment.child_count(), 1);
        units.add(Model::new("wp/2"));
        assert_eq!(fragment.child_count(), 1, "old list is no longer observed");
        replacement.add(Model::new("wp/8"));
        assert_eq!(fragment.child_count(), 2);
    }

    #[test]
    fn member_change_redraws_derived_list() {
        let region = Element::new("div");
        let engine = BindingEngine::new(&region);
        let unit = Model::new("wp/0").with("agent_state", "pending");
        let units = ModelList::from_models([unit.clone()]);
        let model = service("wp", "wordpress").with("units", units.clone());
        let viewlet = Viewlet::new("units", |_| Element::new("ul"))
            .with_rebind(|m| m.get("units").unwrap_or_default())
            .with_update(|value, root| {
                let items = value
                    .as_models()
                    .map(|l| l.to_vec())
                    .unwrap_or_default()
                    .into_iter()
                    .map(|m| {
                        Element::new("li").with_text(m.get_str("agent_state").unwrap_or_default())
                    });
                root.set_children(items);
            });
        engine.bind(&model, [viewlet]).unwrap();
        let fragment = engine.show_viewlet("units").unwrap();
        assert_eq!(fragment.text_content(), "pending");

        unit.set("agent_state", "started");
        assert_eq!(fragment.text_content(), "started");

        let late = Model::new("wp/1").with("agent_state", "pending");
        units.add(late.clone());
        late.set("agent_state", "error");
        assert_eq!(fragment.text_content(), "startederror");

        units.remove(&unit);
        unit.set("agent_state", "stopped");
        assert_eq!(fragment.text_content(), "error");

        engine.unbind();
        late.set("agent_state", "started");
        assert_eq!(fragment.text_content(), "error");
    }

    #[test]
    fn reentrant_mutation_is_queued() {
        let region = Element::new("div");
        let engine = BindingEngine::new(&region);
        let model = service("wp", "wordpress");
        let writer = model.clone();
        let order = Rc::new(RefCell::new(Vec::new()));
        let o = Rc::clone(&order);
        let viewlet = Viewlet::new("overview", |_| {
            Element::new("div")
                .with_child(Element::new("b").with_class("name"))
                .with_child(Element::new("i").with_class("running"))
        })
        .bind("displayName", ".name")
        .bind("aggregated_status.running", ".running")
        .with_update(move |value, node| {
            o.borrow_mut().push(value.to_string());
            node.set_text(value.to_string());
            if value.as_str() == Some("renamed") {
                writer.set("aggregated_status.running", 9);
            }
        });
        engine.bind(&model, [viewlet]).unwrap();
        let fragment = engine.show_viewlet("overview").unwrap();
        order.borrow_mut().clear();

        model.set("displayName", "renamed");
        assert_eq!(*order.borrow(), vec!["renamed", "9"]);
        assert_eq!(text(&fragment, ".running"), "9");
    }

    #[test]
    fn inactive_fragments_track_changes() {
        let region = Element::new("div");
        let engine = BindingEngine::new(&region);
        let model = service("wp", "wordpress");
        let other = Viewlet::new("other", |_| Element::new("p").with_class("name"))
            .bind("displayName", ".name");
        engine.bind(&model, [overview(), other]).unwrap();
        let overview_fragment = engine.show_viewlet("overview").unwrap();
        engine.show_viewlet("other").unwrap();
        assert!(overview_fragment.parent().is_none());

        model.set("displayName", "while hidden");
        assert_eq!(text(&overview_fragment, "h1"), "while hidden");
        let again = engine.show_viewlet("overview").unwrap();
        assert!(again.ptr_eq(&overview_fragment));
        assert_eq!(engine.render_count(), 2);
    }

    #[test]
    fn rebind_marks_inactive_stale() {
        let region = Element::new("div");
        let engine = BindingEngine::new(&region);
        let other = Viewlet::new("other", |m| {
            Element::new("p")
                .with_class("name")
                .with_text(m.get_str("displayName").unwrap_or_default())
        });
        engine
            .bind(&service("a", "a"), [overview(), other])
            .unwrap();
        engine.show_viewlet("other").unwrap();
        engine.show_viewlet("overview").unwrap();
        engine.rebind(&service("b", "b")).unwrap();
        assert!(engine.is_stale("other"));
        assert!(!engine.is_stale("overview"));
        let fragment = engine.show_viewlet("other").unwrap();
        assert_eq!(fragment.text(), "b");
    }

    #[test]
    fn active_change_is_observable() {
        let region = Element::new("div");
        let engine = BindingEngine::new(&region);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = engine.on_active_change(move |name| s.borrow_mut().push(name.clone()));
        engine.bind(&service("a", "a"), [overview()]).unwrap();
        engine.show_viewlet("overview").unwrap();
        engine.unbind();
        assert_eq!(*seen.borrow(), vec![Some("overview".to_string()), None]);
        assert_eq!(region.child_count(), 0);
        assert!(engine.rebind(&service("b", "b")).unwrap_err().is_lifecycle());
    }
}
