#![forbid(unsafe_code)]

//! The settings page of a service: charm options, validation and saving.
//!
//! The charm model's `options` attribute is the schema: a map from option
//! name to `{type, default, description}` where `type` is one of `int`,
//! `float`, `boolean` or `string`. The service's `config` attribute holds
//! the current values.
//!
//! # Failure Modes
//!
//! | Input | Result |
//! |-------|--------|
//! | empty `int` / `float` | "This field is required." inline |
//! | non-numeric `int` / `float` | "The value "x" is not an integer/float." inline |
//! | unknown option type | treated as `string` |
//! | remote error | notification, button re-enabled |

use std::collections::BTreeMap;

use ahash::AHashMap;
use jgui_core::{Element, ElementState};
use jgui_runtime::{
    Dispatch, EventSpec, HandlerContext, HandlerTable, Model, Module, RenderContext, Value,
};

use super::base::{ServiceBase, ServiceContext, render_page};
use crate::env::{RpcResponse, ServiceResult, Settings};
use crate::notification::RemoteOperationError;
use crate::utils::{show_success_message, values_mapping};

/// Type of a charm option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OptionKind {
    Int,
    Float,
    Boolean,
    #[default]
    String,
}

impl OptionKind {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "int" => Self::Int,
            "float" => Self::Float,
            "boolean" => Self::Boolean,
            _ => Self::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionSchema {
    pub kind: OptionKind,
    pub default: Option<String>,
    pub description: String,
}

/// Option schema of a charm model.
pub type Schema = AHashMap<String, OptionSchema>;

/// Read the `options` attribute of `charm`.
#[must_use]
pub fn charm_schema(charm: &Model) -> Schema {
    let Some(Value::Map(options)) = charm.get("options") else {
        return Schema::default();
    };
    options
        .iter()
        .map(|(name, def)| {
            let field = |key: &str| def.lookup(std::iter::once(key)).filter(|v| !v.is_null());
            let schema = OptionSchema {
                kind: OptionKind::from_name(
                    field("type").and_then(Value::as_str).unwrap_or("string"),
                ),
                default: field("default").map(Value::to_string),
                description: field("description").map(Value::to_string).unwrap_or_default(),
            };
            (name.clone(), schema)
        })
        .collect()
}

/// One row of the settings form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub name: String,
    pub value: String,
    pub kind: OptionKind,
    pub description: String,
}

/// Settings rows in option-name order: the service's value, else the
/// option default, else empty.
#[must_use]
pub fn service_settings(service: &Model, schema: &Schema) -> Vec<Setting> {
    let config = service.get("config");
    let current = config.as_ref().and_then(Value::as_map);
    let mut names: Vec<&String> = schema.keys().collect();
    names.sort();
    names
        .into_iter()
        .map(|name| {
            let option = &schema[name];
            let value = current
                .and_then(|c| c.get(name))
                .filter(|v| !v.is_null())
                .map(Value::to_string)
                .or_else(|| option.default.clone())
                .unwrap_or_default();
            Setting {
                name: name.clone(),
                value,
                kind: option.kind,
                description: option.description.clone(),
            }
        })
        .collect()
}

fn is_int(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_float(text: &str) -> bool {
    let body = text.strip_prefix('-').unwrap_or(text);
    let (whole, frac) = body.split_once('.').unwrap_or((body, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    (!whole.is_empty() || !frac.is_empty()) && all_digits(whole) && all_digits(frac)
}

/// Check `values` against `schema`; returns `name → message` for every
/// invalid field.
#[must_use]
pub fn validate(values: &Settings, schema: &Schema) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();
    for (name, value) in values {
        let Some(option) = schema.get(name) else {
            continue;
        };
        let trimmed = value.trim();
        let message = match option.kind {
            OptionKind::Int | OptionKind::Float if trimmed.is_empty() => {
                Some("This field is required.".to_string())
            }
            OptionKind::Int if !is_int(trimmed) => {
                Some(format!("The value \"{value}\" is not an integer."))
            }
            OptionKind::Float if !is_float(trimmed) => {
                Some(format!("The value \"{value}\" is not a float."))
            }
            _ => None,
        };
        if let Some(message) = message {
            errors.insert(name.clone(), message);
        }
    }
    errors
}

/// Replace inline errors under `root` with `errors`; the first invalid
/// field in document order gets focus.
pub fn show_errors(root: &Element, errors: &BTreeMap<String, String>) {
    for old in root.query_all(".help-inline") {
        old.detach();
    }
    for marked in root.query_all(".error") {
        marked.remove_class("error");
    }
    let fields = root.query_all(".config-field");
    for field in &fields {
        field.set_state(ElementState::FOCUSED, false);
    }
    for (name, message) in errors {
        let Some(field) = fields
            .iter()
            .find(|f| f.attr("name").as_deref() == Some(name.as_str()))
        else {
            continue;
        };
        let Some(controls) = field.parent() else {
            continue;
        };
        controls.append(
            &Element::new("span")
                .with_id(format!("error-{name}"))
                .with_class("help-inline")
                .with_text(message.clone()),
        );
        if let Some(group) = controls.parent() {
            group.add_class("error");
        }
    }
    let first = fields
        .iter()
        .find(|f| f.attr("name").is_some_and(|n| errors.contains_key(&n)));
    if let Some(first) = first {
        first.set_state(ElementState::FOCUSED, true);
    }
}

fn render_form(settings: &[Setting]) -> Element {
    let form = Element::new("div").with_class("service-config");
    for setting in settings {
        let input = Element::new("input")
            .with_class("config-field")
            .with_id(format!("input-{}", setting.name))
            .with_attr("name", setting.name.clone())
            .with_attr("value", setting.value.clone());
        if setting.kind == OptionKind::Boolean {
            input.set_attr("type", "checkbox");
        }
        form.append(
            &Element::new("div")
                .with_class("control-group")
                .with_child(
                    Element::new("label")
                        .with_attr("for", format!("input-{}", setting.name))
                        .with_text(setting.name.clone()),
                )
                .with_child(
                    Element::new("div")
                        .with_class("controls")
                        .with_child(input)
                        .with_child(
                            Element::new("span")
                                .with_class("help-block")
                                .with_text(setting.description.clone()),
                        ),
                ),
        );
    }
    form.append(
        &Element::new("button")
            .with_id("save-service-config")
            .with_class("btn")
            .with_text("Save Changes"),
    );
    form
}

pub struct ServiceConfig {
    base: ServiceBase,
    handlers: HandlerTable<ServiceConfig>,
}

impl ServiceConfig {
    pub const NAME: &'static str = "ServiceConfig";

    #[must_use]
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            base: ServiceBase::new(ctx, "service-config"),
            handlers: HandlerTable::new().with("saveConfig", Self::save_config),
        }
    }

    fn schema(ctx: &ServiceContext, service: &Model) -> Schema {
        service
            .get_str("charm")
            .and_then(|id| ctx.db.charms.get_by_id(&id))
            .map(|charm| charm_schema(&charm))
            .unwrap_or_default()
    }

    fn save_config(&mut self, ctx: &HandlerContext<'_>) {
        let Some(service) = self.base.ctx.model.clone() else {
            return;
        };
        let button = ctx.current.cloned();
        if let Some(button) = &button {
            button.set_disabled(true);
        }
        let root = self.base.root().clone();
        let values = values_mapping(&root, ".config-field");
        let errors = validate(&values, &Self::schema(&self.base.ctx, &service));
        show_errors(&root, &errors);
        if !errors.is_empty() {
            tracing::debug!(service = service.id(), invalid = errors.len(), "config rejected");
            if let Some(button) = &button {
                button.set_disabled(false);
            }
            return;
        }

        let root = root.downgrade();
        let cb_ctx = self.base.ctx.clone();
        let id = service.id().to_string();
        self.base.ctx.env.set_config(
            &id,
            values,
            Box::new(move |resp: RpcResponse<ServiceResult>| {
                match resp.err {
                    Some(err) => cb_ctx.db.notifications.report(
                        RemoteOperationError::new(
                            "Error setting service config",
                            format!("Service name: {}", resp.data.service_name),
                            err,
                        )
                        .link(cb_ctx.url(Some("config")))
                        .model(service.id()),
                    ),
                    None => {
                        if let Some(root) = root.upgrade() {
                            show_success_message(&root, &cb_ctx.config.config_saved_message);
                        }
                    }
                }
                if let Some(button) = button {
                    button.set_disabled(false);
                }
            }),
        );
    }

    fn render_data(ctx: &ServiceContext, service: &Model, root: &Element) {
        let body = render_page(root, service, &ctx.db, &ctx.url(Some("config")));
        let settings = service_settings(service, &Self::schema(ctx, service));
        body.set_children([render_form(&settings)]);
    }
}

impl Module for ServiceConfig {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn events(&self) -> EventSpec {
        EventSpec::new().scene("#save-service-config", "click", "saveConfig")
    }

    fn render(&mut self, ctx: &RenderContext<'_>) {
        self.base.render(ctx.container, ctx.bus, Self::render_data);
    }

    fn dispatch(&mut self, handler: &str, ctx: &HandlerContext<'_>) -> Dispatch {
        HandlerTable::dispatch(self, |m| &m.handlers, handler, ctx)
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("base", &self.base)
            .finish()
    }
}
