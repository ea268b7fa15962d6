//! Composer and router behavior end to end.
//!
//! Covers:
//! - global bindings live while a module is registered (and only then)
//! - scene bindings after render, render-layer bindings post render
//! - declarative phases, including inline callbacks
//! - render hooks from several modules, in order, once per call
//! - per-composer bus isolation

#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::Rc;

use jgui_core::{Element, Event};
use jgui_runtime::{
    Composer, Dispatch, EventSpec, Handler, HandlerContext, HandlerTable, MessageBus, Module,
    RenderContext,
};

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Default, Debug)]
struct State {
    thing: Option<String>,
    targeted: bool,
    cancelled: bool,
    clicked: bool,
    dbldbl: bool,
    log: Vec<String>,
}

type Shared = Rc<RefCell<State>>;

struct TestModule {
    name: String,
    state: Shared,
    events: EventSpec,
    handlers: HandlerTable<TestModule>,
    renders: u32,
    render_id: Option<&'static str>,
}

impl TestModule {
    fn new(state: &Shared) -> Self {
        Self {
            name: "TestModule".to_string(),
            state: Rc::clone(state),
            events: EventSpec::new()
                .scene(".thing", "click", "decorateThing")
                .render(".target", "click", "targetTarget")
                .global("cancel", "cancelHandler"),
            handlers: HandlerTable::new()
                .with("decorateThing", |m: &mut TestModule, _| {
                    m.state.borrow_mut().thing = Some("decorated".into());
                })
                .with("targetTarget", |m: &mut TestModule, _| {
                    m.state.borrow_mut().targeted = true;
                })
                .with("cancelHandler", |m: &mut TestModule, _| {
                    m.state.borrow_mut().cancelled = true;
                }),
            renders: 0,
            render_id: None,
        }
    }

    fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    fn rendering(mut self, id: &'static str) -> Self {
        self.render_id = Some(id);
        self
    }
}

impl Module for TestModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn events(&self) -> EventSpec {
        self.events.clone()
    }

    fn render(&mut self, ctx: &RenderContext<'_>) {
        self.renders += 1;
        if let Some(id) = self.render_id {
            ctx.container.append(&Element::new("div").with_id(id));
        }
    }

    fn dispatch(&mut self, handler: &str, ctx: &HandlerContext<'_>) -> Dispatch {
        HandlerTable::dispatch(self, |m| &m.handlers, handler, ctx)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("JGUI_LOG"))
        .with_test_writer()
        .try_init();
}

fn container() -> Element {
    init_tracing();
    Element::new("div")
        .with_id("test")
        .with_child(Element::new("button").with_class("thing"))
        .with_child(Element::new("button").with_class("target"))
}

fn click(el: &Element) {
    el.dispatch_event(&Event::new("click"));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn create_and_add_module() {
    let state = Shared::default();
    let mut comp = Composer::new();
    comp.set_container(&container()).unwrap();
    comp.add_module(TestModule::new(&state)).unwrap();
    assert_eq!(comp.module_names(), vec!["TestModule"]);
    comp.remove_module("TestModule").unwrap();
    assert!(comp.is_empty());
}

#[test]
fn global_bindings_follow_registration() {
    let state = Shared::default();
    let root = container();
    let mut comp = Composer::new().with_container(&root);
    comp.add_module(TestModule::new(&state)).unwrap();

    comp.fire(&Event::new("cancel")).unwrap();
    assert!(state.borrow().cancelled, "live before render");

    state.borrow_mut().cancelled = false;
    comp.remove_module("TestModule").unwrap();
    comp.fire(&Event::new("cancel")).unwrap();
    assert!(!state.borrow().cancelled, "gone after removal");

    comp.add_module(TestModule::new(&state)).unwrap();
    comp.fire(&Event::new("cancel")).unwrap();
    assert!(state.borrow().cancelled, "restored after re-adding");

    comp.render().unwrap();
    click(&root.query(".thing").unwrap());
    assert_eq!(state.borrow().thing.as_deref(), Some("decorated"));
}

#[test]
fn global_handler_fires_once_per_event() {
    let state = Shared::default();
    let mut comp = Composer::new();
    comp.add_module(TestModule::new(&state)).unwrap();
    comp.add_module(TestModule::new(&state)).unwrap();
    assert_eq!(comp.fire(&Event::new("cancel")).unwrap(), 1);
}

#[test]
fn scene_bindings_wait_for_render() {
    let state = Shared::default();
    let root = container();
    let mut comp = Composer::new().with_container(&root);
    comp.add_module(TestModule::new(&state)).unwrap();
    click(&root.query(".thing").unwrap());
    assert_eq!(state.borrow().thing, None);
    assert!(!comp.is_dom_active("TestModule"));

    comp.render().unwrap();
    click(&root.query(".thing").unwrap());
    assert_eq!(state.borrow().thing.as_deref(), Some("decorated"));
}

#[test]
fn render_layer_bindings_post_render() {
    let state = Shared::default();
    let root = container();
    let mut comp = Composer::new().with_container(&root);
    comp.add_module(TestModule::new(&state)).unwrap();
    comp.render().unwrap();
    click(&root.query(".target").unwrap());
    assert!(state.borrow().targeted);
}

#[test]
fn module_added_after_render_is_live_immediately() {
    let state = Shared::default();
    let root = container();
    let mut comp = Composer::new().with_container(&root);
    comp.render().unwrap();
    comp.add_module(TestModule::new(&state)).unwrap();
    click(&root.query(".thing").unwrap());
    assert_eq!(state.borrow().thing.as_deref(), Some("decorated"));
}

#[test]
fn removal_stops_dom_bindings() {
    let state = Shared::default();
    let root = container();
    let mut comp = Composer::new().with_container(&root);
    comp.add_module(TestModule::new(&state)).unwrap();
    comp.render().unwrap();
    comp.remove_module("TestModule").unwrap();
    click(&root.query(".thing").unwrap());
    click(&root.query(".target").unwrap());
    let s = state.borrow();
    assert_eq!(s.thing, None);
    assert!(!s.targeted);
    assert_eq!(root.listener_count(), 0);
}

// =============================================================================
// Declarative phases
// =============================================================================

#[test]
fn declarative_phases_and_inline_callbacks() {
    let state = Shared::default();
    let root = container();
    let mut comp = Composer::new().with_container(&root);

    let inline_state = Rc::clone(&state);
    let mut module = TestModule::new(&state);
    module.events = EventSpec::from_json(
        "TestModule",
        &serde_json::json!({"scene": {".thing": {"click": {"phase": "after", "callback": "afterThing"}}}}),
    )
    .unwrap()
    .scene(
        ".thing",
        "dblclick",
        Handler::inline(move |_| inline_state.borrow_mut().dbldbl = true),
    );
    module.handlers.set("afterThing", |m: &mut TestModule, _| {
        m.state.borrow_mut().clicked = true;
    });
    comp.add_module(module).unwrap();
    comp.render().unwrap();

    let thing = root.query(".thing").unwrap();
    click(&thing);
    assert!(state.borrow().clicked);
    thing.dispatch_event(&Event::new("dblclick"));
    assert!(state.borrow().dbldbl);
}

struct Ordered {
    name: &'static str,
    log: Shared,
}

impl Module for Ordered {
    fn name(&self) -> &str {
        self.name
    }

    fn events(&self) -> EventSpec {
        let log = Rc::clone(&self.log);
        let name = self.name;
        EventSpec::new()
            .global("go", Handler::named("after").after())
            .global("go", "on")
            .global(
                "go",
                Handler::inline(move |_| log.borrow_mut().log.push(format!("{name}:inline-on"))),
            )
            .global("go", Handler::named("before").before())
    }

    fn dispatch(&mut self, handler: &str, _ctx: &HandlerContext<'_>) -> Dispatch {
        self.log
            .borrow_mut()
            .log
            .push(format!("{}:{handler}", self.name));
        Dispatch::Handled
    }
}

#[test]
fn phase_then_module_then_declaration_order() {
    let state = Shared::default();
    let mut comp = Composer::new();
    comp.add_module(Ordered { name: "a", log: Rc::clone(&state) }).unwrap();
    comp.add_module(Ordered { name: "b", log: Rc::clone(&state) }).unwrap();
    comp.fire(&Event::new("go")).unwrap();
    assert_eq!(
        state.borrow().log,
        vec![
            "a:before", "b:before", "a:on", "a:inline-on", "b:on", "b:inline-on", "a:after",
            "b:after",
        ]
    );
}

#[test]
fn replacing_a_module_keeps_its_order() {
    let state = Shared::default();
    let mut comp = Composer::new();
    comp.add_module(Ordered { name: "a", log: Rc::clone(&state) }).unwrap();
    comp.add_module(Ordered { name: "b", log: Rc::clone(&state) }).unwrap();
    comp.add_module(Ordered { name: "a", log: Rc::clone(&state) }).unwrap();
    comp.fire(&Event::new("go")).unwrap();
    let log = state.borrow().log.clone();
    assert_eq!(&log[..2], ["a:before", "b:before"]);
    assert_eq!(log.len(), 8, "no duplicate subscriptions after replacement");
}

#[test]
fn handlers_resolve_late() {
    let state = Shared::default();
    let mut comp = Composer::new();
    let handle = comp.add_module(TestModule::new(&state)).unwrap();
    handle.borrow_mut().handlers.set("cancelHandler", |m: &mut TestModule, _| {
        m.state.borrow_mut().log.push("overridden".into());
    });
    comp.fire(&Event::new("cancel")).unwrap();
    assert!(!state.borrow().cancelled);
    assert_eq!(state.borrow().log, vec!["overridden"]);
}

#[test]
fn invalid_spec_is_rejected() {
    let state = Shared::default();
    let mut comp = Composer::new();
    let mut module = TestModule::new(&state);
    module.events = EventSpec::new().scene("ul > li", "click", "x");
    let err = comp.add_module(module).unwrap_err();
    assert!(err.is_configuration());
    assert!(!comp.contains("TestModule"));
}

// =============================================================================
// Rendering
// =============================================================================

#[test]
fn rendering_from_all_modules() {
    let state = Shared::default();
    let root = container();
    let mut comp = Composer::new().with_container(&root);
    let a = comp
        .add_module(TestModule::new(&state).named("moda").rendering("fromA"))
        .unwrap();
    let b = comp
        .add_module(TestModule::new(&state).named("modb").rendering("fromB"))
        .unwrap();
    comp.render().unwrap();
    comp.render().unwrap();

    let ids: Vec<String> = root.children().iter().filter_map(Element::id).collect();
    assert_eq!(ids, vec!["fromA", "fromB"]);
    assert_eq!(a.borrow().renders, 2);
    assert_eq!(b.borrow().renders, 2);
}

// =============================================================================
// Isolation
// =============================================================================

#[test]
fn composers_do_not_share_a_bus() {
    let first = Shared::default();
    let second = Shared::default();
    let mut a = Composer::new();
    let mut b = Composer::new();
    a.add_module(TestModule::new(&first)).unwrap();
    b.add_module(TestModule::new(&second)).unwrap();
    a.fire(&Event::new("cancel")).unwrap();
    assert!(first.borrow().cancelled);
    assert!(!second.borrow().cancelled);
}

#[test]
fn shared_bus_is_opt_in() {
    let state = Shared::default();
    let bus = MessageBus::new();
    let mut comp = Composer::with_bus(bus.clone());
    comp.add_module(TestModule::new(&state)).unwrap();
    bus.fire(&Event::new("cancel"));
    assert!(state.borrow().cancelled);
    comp.unbind().unwrap();
    assert!(bus.is_empty());
}
