#![forbid(unsafe_code)]

//! The unit grid and the service page that hosts it.
//!
//! [`ServiceView`] renders the service's units page: the unit-count field
//! ([`super::units::ManageUnits`] handles it), expose and destroy controls,
//! state filter tabs and a grid of units sized by how many there are.

use std::fmt;

use jgui_core::Element;
use jgui_runtime::{
    Dispatch, EventSpec, GridTiers, HandlerContext, HandlerTable, MessageBus, Model, Module,
    RenderContext,
};
use web_time::Instant;

use super::base::{ServiceBase, ServiceContext, navigate, render_page};
use crate::utils::{UnitState, simplify_state, unit_url};

/// Grid size class, picked from the unit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridSize {
    Large,
    Medium,
    Small,
    Tiny,
}

impl GridSize {
    #[must_use]
    pub fn for_count(count: usize, tiers: &GridTiers) -> Self {
        if count <= tiers.large {
            Self::Large
        } else if count <= tiers.medium {
            Self::Medium
        } else if count <= tiers.small {
            Self::Small
        } else {
            Self::Tiny
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Large => "large",
            Self::Medium => "medium",
            Self::Small => "small",
            Self::Tiny => "tiny",
        }
    }
}

/// One state filter tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTab {
    pub title: &'static str,
    pub link: String,
    pub count: usize,
    pub active: bool,
}

/// Units whose simplified state is `filter` (all units without a filter).
#[must_use]
pub fn filter_units(units: &[Model], filter: Option<UnitState>) -> Vec<Model> {
    units
        .iter()
        .filter(|unit| filter.is_none_or(|state| simplify_state(unit) == state))
        .cloned()
        .collect()
}

/// All, Running, Pending and Error tabs with per-state counts.
#[must_use]
pub fn state_tabs(units: &[Model], filter: Option<UnitState>) -> Vec<StateTab> {
    let mut tabs = vec![StateTab {
        title: "All",
        link: ".".to_string(),
        count: units.len(),
        active: filter.is_none(),
    }];
    tabs.extend(UnitState::ALL.into_iter().map(|state| StateTab {
        title: state.title(),
        link: format!("?state={}", state.as_str()),
        count: units.iter().filter(|u| simplify_state(u) == state).count(),
        active: filter == Some(state),
    }));
    tabs
}

/// `div.unit-grid.<size>` with one `div.unit` per unit.
#[must_use]
pub fn render_unit_grid(units: &[Model], tiers: &GridTiers) -> Element {
    let size = GridSize::for_count(units.len(), tiers);
    let grid = Element::new("div")
        .with_class("unit-grid")
        .with_class(size.as_str());
    for unit in units {
        grid.append(
            &Element::new("div")
                .with_class("unit")
                .with_class(simplify_state(unit).as_str())
                .with_id(unit.id())
                .with_text(unit.id()),
        );
    }
    grid
}

fn render_state_tabs(tabs: &[StateTab]) -> Element {
    let list = Element::new("ul").with_class("state-filter");
    for tab in tabs {
        let item = Element::new("li").with_child(
            Element::new("a")
                .with_attr("href", tab.link.clone())
                .with_text(format!("{} ({})", tab.title, tab.count)),
        );
        item.toggle_class("active", tab.active);
        list.append(&item);
    }
    list
}

fn render_controls(service: &Model, unit_count: i64) -> Element {
    let exposed = service.get_bool("exposed").unwrap_or(false);
    let expose = if exposed {
        Element::new("button")
            .with_class("unexposeService")
            .with_text("Unexpose")
    } else {
        Element::new("button")
            .with_class("exposeService")
            .with_text("Expose")
    };
    Element::new("div")
        .with_class("service-controls")
        .with_child(
            Element::new("input")
                .with_id("num-service-units")
                .with_attr("value", unit_count.to_string()),
        )
        .with_child(expose)
        .with_child(
            Element::new("button")
                .with_id("destroy-service")
                .with_class("btn")
                .with_text("Destroy"),
        )
}

/// The unit count shown for `service`: its `unit_count`, else the number
/// of units in the store.
#[must_use]
pub fn unit_count(ctx: &ServiceContext, service: &Model) -> i64 {
    service.get_i64("unit_count").unwrap_or_else(|| {
        i64::try_from(ctx.db.units_for_service(service).len()).unwrap_or(i64::MAX)
    })
}

/// The units page of a service.
pub struct ServiceView {
    base: ServiceBase,
    handlers: HandlerTable<ServiceView>,
}

impl ServiceView {
    pub const NAME: &'static str = "ServiceView";

    #[must_use]
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            base: ServiceBase::new(ctx, "service-units"),
            handlers: HandlerTable::new()
                .with("showUnitDetails", |_: &mut ServiceView, ctx| {
                    if let Some(id) = ctx.current.and_then(Element::id) {
                        navigate(ctx.bus, &unit_url(&id));
                    }
                })
                .with("windowResized", |view: &mut ServiceView, ctx| {
                    if let Some(height) = ctx.event.field("height").and_then(|h| h.parse().ok()) {
                        view.base.window_resized(height, Instant::now());
                    }
                }),
        }
    }

    #[must_use]
    pub fn base(&self) -> &ServiceBase {
        &self.base
    }

    /// Refit after a settled resize burst.
    pub fn tick(&mut self, now: Instant, bus: &MessageBus) -> Option<u32> {
        self.base.poll_resize(now, bus)
    }

    fn render_data(ctx: &ServiceContext, service: &Model, root: &Element) {
        let body = render_page(root, service, &ctx.db, &ctx.url(None));
        let units = ctx.db.units_for_service(service);
        let filter = ctx
            .query
            .get("state")
            .and_then(|state| UnitState::from_name(state));
        body.set_children([
            render_controls(service, unit_count(ctx, service)),
            render_state_tabs(&state_tabs(&units, filter)),
            render_unit_grid(&filter_units(&units, filter), &ctx.config.grid),
        ]);
    }
}

impl Module for ServiceView {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn events(&self) -> EventSpec {
        EventSpec::new()
            .scene("div.unit", "click", "showUnitDetails")
            .global("windowresize", "windowResized")
    }

    fn render(&mut self, ctx: &RenderContext<'_>) {
        self.base
            .render(ctx.container, ctx.bus, Self::render_data);
    }

    fn dispatch(&mut self, handler: &str, ctx: &HandlerContext<'_>) -> Dispatch {
        HandlerTable::dispatch(self, |v| &v.handlers, handler, ctx)
    }
}

impl fmt::Debug for ServiceView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceView")
            .field("base", &self.base)
            .finish()
    }
}
