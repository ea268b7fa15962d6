#![forbid(unsafe_code)]

//! Small helpers shared by the service modules.

use std::collections::BTreeMap;

use jgui_core::Element;
use jgui_runtime::Model;

/// Coarse unit state used for filtering and grid colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitState {
    Running,
    Pending,
    Error,
}

impl UnitState {
    pub const ALL: [UnitState; 3] = [Self::Running, Self::Pending, Self::Error];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Pending => "pending",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Tab title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Pending => "Pending",
            Self::Error => "Error",
        }
    }
}

/// Map an agent state to [`UnitState`]: `started` is running, anything
/// ending in `error` is an error, the rest is pending.
#[must_use]
pub fn simplify_state(unit: &Model) -> UnitState {
    let state = unit.get_str("agent_state").unwrap_or_default();
    if state == "started" {
        UnitState::Running
    } else if state.ends_with("error") {
        UnitState::Error
    } else {
        UnitState::Pending
    }
}

/// `name → value` of every element under `root` matching `selector`.
///
/// Elements without a `name` attribute are keyed by id.
#[must_use]
pub fn values_mapping(root: &Element, selector: &str) -> BTreeMap<String, String> {
    root.query_all(selector)
        .into_iter()
        .filter_map(|field| {
            let key = field.attr("name").or_else(|| field.id())?;
            Some((key, field.value()))
        })
        .collect()
}

/// Replace any previous success message under `root` with `message`.
pub fn show_success_message(root: &Element, message: &str) {
    for old in root.query_all(".alert-success") {
        old.detach();
    }
    root.append(
        &Element::new("div")
            .with_class("alert")
            .with_class("alert-success")
            .with_text(message),
    );
}

/// Mark a table row after a relation change: `error` on failure,
/// `highlighted` otherwise.
pub fn highlight_row(row: &Element, failed: bool) {
    row.add_class("highlighted");
    row.toggle_class("error", failed);
}

/// Route of a unit page: the first `/` of the id becomes `-`.
#[must_use]
pub fn unit_url(unit_id: &str) -> String {
    format!("/unit/{}/", unit_id.replacen('/', "-", 1))
}

/// Route of a service page, optionally with a sub-page.
#[must_use]
pub fn service_url(service_id: &str, intent: Option<&str>) -> String {
    match intent {
        Some(intent) => format!("/service/{service_id}/{intent}"),
        None => format!("/service/{service_id}/"),
    }
}

/// Route of a charm page.
#[must_use]
pub fn charm_url(charm_id: &str) -> String {
    format!("/charms/{charm_id}/")
}
