#![forbid(unsafe_code)]

//! The service inspector: a floating panel that shows one viewlet of a
//! service at a time.
//!
//! The inspector is a [`Composer`] with a single chrome module (title, tab
//! strip, close button) wrapped around a [`BindingEngine`] whose region is
//! the viewlet container. Two viewlets ship by default:
//!
//! | Name | Shows |
//! |------|-------|
//! | `overview` | display name, charm and running/error unit counts |
//! | `units` | the unit grid, redrawn whenever the `units` list changes |
//!
//! Caller viewlets with the same name replace the defaults.
//!
//! # Invariants
//!
//! 1. Exactly one viewlet fragment is attached to the region at a time.
//! 2. After [`ServiceInspector::destroy`] (or a `.close` click) the panel is
//!    detached and no model change reaches it.
//!
//! # Failure Modes
//!
//! | Condition | Result |
//! |-----------|--------|
//! | Invalid config | `Configuration` error from [`ServiceInspector::new`] |
//! | Invalid caller viewlet | `Configuration` error, first one wins |
//! | Tab names an unknown viewlet | warn log, active viewlet unchanged |

use std::cell::Cell;
use std::rc::Rc;

use jgui_core::{ComposeError, Element, Selector};
use jgui_runtime::{
    BindingEngine, Composer, Dispatch, EventSpec, GridTiers, HandlerContext, HandlerTable,
    InspectorConfig, Model, Module, RenderContext, Subscription, Value, Viewlet, ViewletRegistry,
};

use crate::service::render_unit_grid;

const OWNER: &str = "ServiceInspector";

/// Construction options for [`ServiceInspector`].
#[derive(Debug, Default)]
pub struct InspectorOptions {
    /// Viewlets merged over the defaults.
    pub viewlets: Vec<Viewlet>,
    pub config: InspectorConfig,
}

impl InspectorOptions {
    #[must_use]
    pub fn with_viewlet(mut self, viewlet: Viewlet) -> Self {
        self.viewlets.push(viewlet);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: InspectorConfig) -> Self {
        self.config = config;
        self
    }
}

// ---------------------------------------------------------------------------
// Default viewlets
// ---------------------------------------------------------------------------

fn overview_viewlet() -> Viewlet {
    Viewlet::new("overview", |_model: &Model| {
        let field = |label: &str, bind: &str| {
            Element::new("div")
                .with_class("overview-field")
                .with_child(Element::new("label").with_text(label))
                .with_child(Element::new("span").with_attr("data-bind", bind))
        };
        Element::new("div")
            .with_class("overview")
            .with_child(Element::new("h3").with_attr("data-bind", "displayName"))
            .with_child(field("Charm", "charm"))
            .with_child(field("Running", "running"))
            .with_child(field("Error", "error"))
    })
    .bind("displayName", "[data-bind=displayName]")
    .bind("charm", "[data-bind=charm]")
    .bind("aggregated_status.running", "[data-bind=running]")
    .bind("aggregated_status.error", "[data-bind=error]")
}

fn units_viewlet(tiers: GridTiers) -> Viewlet {
    Viewlet::new("units", |_model: &Model| Element::new("div").with_class("units"))
        .with_rebind(|model: &Model| model.get("units").unwrap_or(Value::Null))
        .with_update(move |value: &Value, node: &Element| {
            let units = value.as_models().map(|list| list.to_vec()).unwrap_or_default();
            node.set_children([render_unit_grid(&units, &tiers)]);
        })
}

/// The built-in viewlets for `config`.
#[must_use]
pub fn default_viewlets(config: &InspectorConfig) -> Vec<Viewlet> {
    vec![overview_viewlet(), units_viewlet(config.grid)]
}

// ---------------------------------------------------------------------------
// Chrome
// ---------------------------------------------------------------------------

struct InspectorChrome {
    engine: BindingEngine,
    region: Element,
    tabs: Element,
    closed: Rc<Cell<bool>>,
    _active: Subscription,
    handlers: HandlerTable<InspectorChrome>,
}

fn mark_active(tabs: &Element, active: Option<&str>) {
    for tab in tabs.query_all("a.tab") {
        let on = tab.attr("data-viewlet").as_deref() == active;
        tab.toggle_class("active", on);
    }
}

impl InspectorChrome {
    const NAME: &'static str = "InspectorChrome";

    fn new(engine: BindingEngine, region: Element, closed: Rc<Cell<bool>>) -> Self {
        let tabs = Element::new("ul").with_class("inspector-tabs");
        let weak_tabs = tabs.downgrade();
        let active = engine.on_active_change(move |name: &Option<String>| {
            if let Some(tabs) = weak_tabs.upgrade() {
                mark_active(&tabs, name.as_deref());
            }
        });
        Self {
            engine,
            region,
            tabs,
            closed,
            _active: active,
            handlers: HandlerTable::new()
                .with("showViewlet", Self::show_viewlet)
                .with("destroy", Self::destroy),
        }
    }

    fn show_viewlet(&mut self, ctx: &HandlerContext<'_>) {
        ctx.event.prevent_default();
        let Some(name) = ctx.current.and_then(|tab| tab.attr("data-viewlet")) else {
            return;
        };
        if let Err(err) = self.engine.show_viewlet(&name) {
            tracing::warn!(viewlet = name.as_str(), %err, "inspector tab");
        }
    }

    fn destroy(&mut self, ctx: &HandlerContext<'_>) {
        ctx.event.prevent_default();
        self.engine.unbind();
        if let Some(container) = ctx.container {
            container.detach();
        }
        self.closed.set(true);
        tracing::debug!("inspector closed");
    }
}

impl Module for InspectorChrome {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn events(&self) -> EventSpec {
        EventSpec::new()
            .scene(".tab", "click", "showViewlet")
            .scene(".close", "click", "destroy")
    }

    fn render(&mut self, ctx: &RenderContext<'_>) {
        let title = self
            .engine
            .model()
            .map(|m| m.get_str("displayName").unwrap_or_else(|| m.id().to_string()))
            .unwrap_or_default();
        let header = Element::new("div")
            .with_class("panel-heading")
            .with_child(Element::new("span").with_class("title").with_text(title))
            .with_child(Element::new("button").with_class("close").with_text("x"));
        self.tabs.set_children(self.engine.viewlet_names().into_iter().map(|name| {
            Element::new("li").with_child(
                Element::new("a")
                    .with_class("tab")
                    .with_attr("data-viewlet", name.clone())
                    .with_text(name),
            )
        }));
        mark_active(&self.tabs, self.engine.active_viewlet().as_deref());
        ctx.container.append(&header);
        ctx.container.append(&self.tabs);
        ctx.container.append(&self.region);
    }

    fn dispatch(&mut self, handler: &str, ctx: &HandlerContext<'_>) -> Dispatch {
        HandlerTable::dispatch(self, |m| &m.handlers, handler, ctx)
    }
}

// ---------------------------------------------------------------------------
// Inspector
// ---------------------------------------------------------------------------

/// A bound, rendered inspector panel.
pub struct ServiceInspector {
    composer: Composer,
    engine: BindingEngine,
    container: Element,
    closed: Rc<Cell<bool>>,
}

impl ServiceInspector {
    /// Build the panel inside `parent`, bind `model` and show the default
    /// viewlet.
    ///
    /// # Errors
    ///
    /// `Configuration` for an invalid config or viewlet, `NotFound` when
    /// the default viewlet is not registered.
    pub fn new(model: &Model, parent: &Element, options: InspectorOptions) -> Result<Self, ComposeError> {
        let InspectorOptions { viewlets, config } = options;
        config
            .validate()
            .map_err(|e| ComposeError::configuration(OWNER, e.to_string()))?;

        let mut registry = ViewletRegistry::new();
        for viewlet in default_viewlets(&config) {
            registry.register(viewlet)?;
        }
        if let Some(err) = registry.merge(viewlets).into_iter().next() {
            return Err(err);
        }

        let region = Element::new("div").with_class("viewlet-container");
        let selector = Selector::parse(&config.viewlet_container)
            .map_err(|e| ComposeError::configuration(OWNER, e.to_string()))?;
        if !selector.matches(&region) {
            return Err(ComposeError::configuration(
                OWNER,
                format!("viewlet container '{}' does not match the region", config.viewlet_container),
            ));
        }

        let engine = BindingEngine::new(&region);
        engine.bind(model, registry)?;

        let container = Element::new("div")
            .with_class("panel")
            .with_class("yui3-juju-inspector");

        let closed = Rc::new(Cell::new(false));
        let mut composer = Composer::new().with_container(&container);
        composer.add_module(InspectorChrome::new(
            engine.clone(),
            region,
            Rc::clone(&closed),
        ))?;
        composer.render()?;
        engine.show_viewlet(&config.default_viewlet)?;
        parent.append(&container);
        tracing::debug!(model = model.id(), viewlet = config.default_viewlet.as_str(), "inspector opened");

        Ok(Self {
            composer,
            engine,
            container,
            closed,
        })
    }

    /// Swap the bound model.
    ///
    /// # Errors
    ///
    /// `Lifecycle` once destroyed.
    pub fn bind(&self, model: &Model) -> Result<(), ComposeError> {
        if self.is_destroyed() {
            return Err(ComposeError::Lifecycle("inspector destroyed"));
        }
        self.engine.rebind(model)
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown viewlet, `Lifecycle` once destroyed.
    pub fn show_viewlet(&self, name: &str) -> Result<Element, ComposeError> {
        if self.is_destroyed() {
            return Err(ComposeError::Lifecycle("inspector destroyed"));
        }
        self.engine.show_viewlet(name)
    }

    #[must_use]
    pub fn active_viewlet(&self) -> Option<String> {
        self.engine.active_viewlet()
    }

    #[must_use]
    pub fn engine(&self) -> &BindingEngine {
        &self.engine
    }

    #[must_use]
    pub fn container(&self) -> &Element {
        &self.container
    }

    #[must_use]
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Tear the panel down. Safe to call more than once, and after a
    /// `.close` click.
    pub fn destroy(&mut self) {
        if !self.composer.is_unbound() {
            if let Err(err) = self.composer.unbind() {
                tracing::warn!(%err, "inspector unbind");
            }
        }
        if !self.closed.replace(true) {
            self.engine.unbind();
            self.container.detach();
        }
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.closed.get()
    }
}

impl std::fmt::Debug for ServiceInspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceInspector")
            .field("active", &self.engine.active_viewlet())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
