#![forbid(unsafe_code)]

//! Helpers every service view composes: the shared context, the tab strip,
//! fit-to-window sizing, loading vs data rendering and the missing-service
//! fallback.
//!
//! # Invariants
//!
//! - [`ServiceBase::render`] contributes exactly one node (its root) to the
//!   container per call, so composer re-renders never duplicate a view.
//! - Fit-to-window runs only when a `.view-container` exists and is always
//!   bracketed by `beforePageSizeRecalculation` /
//!   `afterPageSizeRecalculation` on the bus.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use jgui_core::{Element, Event, WeakElement};
use jgui_runtime::{Debouncer, InspectorConfig, MessageBus, Model};
use web_time::Instant;

use crate::db::Database;
use crate::env::Environment;
use crate::notification::Notification;
use crate::utils::{charm_url, service_url};

/// Attribute holding an element's laid-out height in pixels.
pub const HEIGHT_ATTR: &str = "data-height";

/// What a service module needs from its surroundings. Clones share the
/// environment, store and config.
#[derive(Clone)]
pub struct ServiceContext {
    pub env: Rc<dyn Environment>,
    pub db: Database,
    /// The service shown; `None` while it is still loading.
    pub model: Option<Model>,
    pub config: Rc<InspectorConfig>,
    /// Query parameters of the current route (`state`, `rel_id`).
    pub query: BTreeMap<String, String>,
}

impl ServiceContext {
    #[must_use]
    pub fn new(env: Rc<dyn Environment>, db: Database) -> Self {
        Self {
            env,
            db,
            model: None,
            config: Rc::new(InspectorConfig::default()),
            query: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: &Model) -> Self {
        self.model = Some(model.clone());
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: InspectorConfig) -> Self {
        self.config = Rc::new(config);
        self
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn service_id(&self) -> Option<&str> {
        self.model.as_ref().map(Model::id)
    }

    /// Route of the current service page, or `/` without a service.
    #[must_use]
    pub fn url(&self, intent: Option<&str>) -> String {
        self.service_id()
            .map_or_else(|| "/".to_string(), |id| service_url(id, intent))
    }
}

impl fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContext")
            .field("service", &self.service_id())
            .field("db", &self.db)
            .field("query", &self.query)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tabs
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTab {
    pub href: String,
    pub title: &'static str,
    pub active: bool,
}

/// Units, Relations, Settings, Charm and Constraints tabs; the one whose
/// href equals `current` is active.
#[must_use]
pub fn service_tabs(service: &Model, db: &Database, current: &str) -> Vec<ServiceTab> {
    let id = service.id();
    let charm = service
        .get_str("charm")
        .and_then(|charm| db.charms.get_by_id(&charm))
        .map_or_else(|| "#".to_string(), |charm| charm_url(charm.id()));
    [
        ("Units", service_url(id, None)),
        ("Relations", service_url(id, Some("relations"))),
        ("Settings", service_url(id, Some("config"))),
        ("Charm", charm),
        ("Constraints", service_url(id, Some("constraints"))),
    ]
    .into_iter()
    .map(|(title, href)| ServiceTab {
        active: href == current,
        href,
        title,
    })
    .collect()
}

/// `ul.nav.nav-tabs` with one link per tab.
#[must_use]
pub fn render_tabs(tabs: &[ServiceTab]) -> Element {
    let list = Element::new("ul").with_class("nav").with_class("nav-tabs");
    for tab in tabs {
        let item = Element::new("li").with_child(
            Element::new("a")
                .with_attr("href", tab.href.clone())
                .with_text(tab.title),
        );
        item.toggle_class("active", tab.active);
        list.append(&item);
    }
    list
}

/// Header, tab strip and a `.view-container` for a service page.
///
/// Returns the `.view-container` so the caller can fill it.
pub fn render_page(root: &Element, service: &Model, db: &Database, current: &str) -> Element {
    let title = service
        .get_str("displayName")
        .unwrap_or_else(|| service.id().to_string());
    let body = Element::new("div").with_class("view-container");
    root.set_children([
        Element::new("div")
            .with_class("service-header-partial")
            .with_child(Element::new("h2").with_text(title)),
        render_tabs(&service_tabs(service, db, current)),
        body.clone(),
    ]);
    body
}

// ----------------------------------------------------------------------------
// Sizing
// ----------------------------------------------------------------------------

fn height_of(el: Option<Element>) -> u32 {
    el.and_then(|el| el.attr(HEIGHT_ATTR))
        .and_then(|h| h.parse().ok())
        .unwrap_or(0)
}

fn tree_root(el: &Element) -> Element {
    let mut cursor = el.clone();
    while let Some(parent) = cursor.parent() {
        cursor = parent;
    }
    cursor
}

/// Size the `.view-container` under `container` to the window.
///
/// The height is `max(window, min) - navbar - header - footer - 1`,
/// floored at zero. Returns `None` (and fires nothing) when there is no
/// `.view-container`.
pub fn fit_to_window(
    container: &Element,
    window_height: u32,
    min_height: u32,
    bus: &MessageBus,
) -> Option<u32> {
    let view = container.query(".view-container")?;
    bus.fire_named("beforePageSizeRecalculation");
    let page = tree_root(container);
    let chrome = height_of(page.query(".navbar"))
        + height_of(container.query(".service-header-partial"))
        + height_of(page.query(".bottom-navbar"))
        + 1;
    let size = window_height.max(min_height).saturating_sub(chrome);
    view.set_attr(HEIGHT_ATTR, size.to_string());
    bus.fire_named("afterPageSizeRecalculation");
    tracing::trace!(size, window_height, "view container fitted");
    Some(size)
}

// ----------------------------------------------------------------------------
// Rendering and navigation
// ----------------------------------------------------------------------------

/// Replace `root`'s content with the loading placeholder.
pub fn render_loading(root: &Element) {
    root.set_children([Element::new("div")
        .with_class("alert")
        .with_text("Loading service details...")]);
}

/// Ask the application to route to `url`.
pub fn navigate(bus: &MessageBus, url: &str) -> usize {
    let fields = BTreeMap::from([("url".to_string(), url.to_string())]);
    bus.fire(&Event::new("navigateTo").with_fields(fields))
}

/// Report a missing service and route home.
pub fn no_service_available(db: &Database, bus: &MessageBus) {
    db.notifications.add(Notification::error(
        "Service is not available",
        "The service you are trying to view does not exist",
    ));
    navigate(bus, "/");
}

/// State shared by every service page module: its root node, the context
/// and resize debouncing.
pub struct ServiceBase {
    pub ctx: ServiceContext,
    root: Element,
    container: Option<WeakElement>,
    resize: Debouncer,
    window_height: u32,
}

impl ServiceBase {
    #[must_use]
    pub fn new(ctx: ServiceContext, class: &str) -> Self {
        let resize = Debouncer::new(ctx.config.resize_debounce());
        let window_height = ctx.config.min_window_height;
        Self {
            ctx,
            root: Element::new("div").with_class("service-view").with_class(class),
            container: None,
            resize,
            window_height,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    #[must_use]
    pub fn model(&self) -> Option<&Model> {
        self.ctx.model.as_ref()
    }

    /// Loading placeholder without a model, otherwise `data`; then mount
    /// the root into `container` and fit it.
    pub fn render(
        &mut self,
        container: &Element,
        bus: &MessageBus,
        data: impl FnOnce(&ServiceContext, &Model, &Element),
    ) {
        match &self.ctx.model {
            Some(model) => data(&self.ctx, model, &self.root),
            None => render_loading(&self.root),
        }
        container.append(&self.root);
        self.container = Some(container.downgrade());
        fit_to_window(container, self.window_height, self.ctx.config.min_window_height, bus);
    }

    /// Record a window resize; the refit happens on the next settled
    /// [`ServiceBase::poll_resize`].
    pub fn window_resized(&mut self, height: u32, now: Instant) {
        self.window_height = height;
        self.resize.trigger(now);
    }

    /// Refit once the resize burst has settled.
    pub fn poll_resize(&mut self, now: Instant, bus: &MessageBus) -> Option<u32> {
        if !self.resize.poll(now) {
            return None;
        }
        let container = self.container.as_ref()?.upgrade()?;
        fit_to_window(&container, self.window_height, self.ctx.config.min_window_height, bus)
    }

    #[must_use]
    pub fn resize_pending(&self) -> bool {
        self.resize.is_pending()
    }
}

impl fmt::Debug for ServiceBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceBase")
            .field("ctx", &self.ctx)
            .field("window_height", &self.window_height)
            .finish()
    }
}
