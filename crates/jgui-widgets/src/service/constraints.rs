#![forbid(unsafe_code)]

//! The constraints page of a service.

use jgui_core::Element;
use jgui_runtime::{
    Dispatch, EventSpec, HandlerContext, HandlerTable, Model, Module, RenderContext, Value,
};

use super::base::{ServiceBase, ServiceContext, render_page};
use crate::env::{RpcResponse, ServiceResult, Settings};
use crate::notification::RemoteOperationError;
use crate::utils::{show_success_message, values_mapping};

/// Constraints the environment reports but the user cannot change.
pub const READ_ONLY_CONSTRAINTS: [&str; 2] = ["provider-type", "ubuntu-series"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub name: String,
    pub value: String,
}

/// Editable and read-only constraints of `service`.
///
/// Generic constraints the service does not set are appended to the
/// editable list with an empty value.
#[must_use]
pub fn gather_constraints(service: &Model, generic: &[String]) -> (Vec<Constraint>, Vec<Constraint>) {
    let set = service.get("constraints");
    let entries = set.as_ref().and_then(Value::as_map);
    let mut editable = Vec::new();
    let mut read_only = Vec::new();
    for (name, value) in entries.into_iter().flatten() {
        let constraint = Constraint {
            name: name.clone(),
            value: value.to_string(),
        };
        if READ_ONLY_CONSTRAINTS.contains(&name.as_str()) {
            read_only.push(constraint);
        } else {
            editable.push(constraint);
        }
    }
    for name in generic {
        if !editable.iter().any(|c| &c.name == name) {
            editable.push(Constraint {
                name: name.clone(),
                value: String::new(),
            });
        }
    }
    (editable, read_only)
}

fn render_form(editable: &[Constraint], read_only: &[Constraint]) -> Element {
    let form = Element::new("div").with_class("constraints");
    if !read_only.is_empty() {
        let list = Element::new("dl").with_class("readonly-constraints");
        for c in read_only {
            list.append(&Element::new("dt").with_text(c.name.clone()));
            list.append(&Element::new("dd").with_text(c.value.clone()));
        }
        form.append(&list);
    }
    for c in editable {
        form.append(
            &Element::new("div")
                .with_class("control-group")
                .with_child(Element::new("label").with_text(c.name.clone()))
                .with_child(
                    Element::new("div").with_class("controls").with_child(
                        Element::new("input")
                            .with_class("constraint-field")
                            .with_id(format!("input-{}", c.name))
                            .with_attr("name", c.name.clone())
                            .with_attr("value", c.value.clone()),
                    ),
                ),
        );
    }
    form.append(
        &Element::new("button")
            .with_id("save-service-constraints")
            .with_class("btn")
            .with_text("Update constraints"),
    );
    form
}

pub struct ServiceConstraints {
    base: ServiceBase,
    handlers: HandlerTable<ServiceConstraints>,
}

impl ServiceConstraints {
    pub const NAME: &'static str = "ServiceConstraints";

    #[must_use]
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            base: ServiceBase::new(ctx, "service-constraints"),
            handlers: HandlerTable::new().with("updateConstraints", Self::update_constraints),
        }
    }

    fn update_constraints(&mut self, ctx: &HandlerContext<'_>) {
        let Some(service) = self.base.ctx.model.clone() else {
            return;
        };
        let values: Settings = values_mapping(self.base.root(), ".constraint-field");
        let button = ctx.current.cloned();
        if let Some(button) = &button {
            button.set_disabled(true);
        }
        let root = self.base.root().downgrade();
        let cb_ctx = self.base.ctx.clone();
        let id = service.id().to_string();
        self.base.ctx.env.set_constraints(
            &id,
            values,
            Box::new(move |resp: RpcResponse<ServiceResult>| {
                match resp.err {
                    Some(err) => cb_ctx.db.notifications.report(
                        RemoteOperationError::new(
                            "Error setting service constraints",
                            format!("Service name: {}", resp.data.service_name),
                            err,
                        )
                        .link(cb_ctx.url(Some("constraints")))
                        .model(service.id()),
                    ),
                    None => {
                        if let Some(root) = root.upgrade() {
                            show_success_message(&root, &cb_ctx.config.constraints_saved_message);
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
        let body = render_page(root, service, &ctx.db, &ctx.url(Some("constraints")));
        let (editable, read_only) = gather_constraints(service, &ctx.config.generic_constraints);
        body.set_children([render_form(&editable, &read_only)]);
    }
}

impl Module for ServiceConstraints {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn events(&self) -> EventSpec {
        EventSpec::new().scene("#save-service-constraints", "click", "updateConstraints")
    }

    fn render(&mut self, ctx: &RenderContext<'_>) {
        self.base.render(ctx.container, ctx.bus, Self::render_data);
    }

    fn dispatch(&mut self, handler: &str, ctx: &HandlerContext<'_>) -> Dispatch {
        HandlerTable::dispatch(self, |m| &m.handlers, handler, ctx)
    }
}

impl std::fmt::Debug for ServiceConstraints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConstraints")
            .field("base", &self.base)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::test_support::RecordingEnv;
    use jgui_core::Event;
    use jgui_runtime::Composer;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    fn service() -> Model {
        let constraints: BTreeMap<String, Value> = [
            ("cpu", "2"),
            ("provider-type", "ec2"),
            ("ubuntu-series", "precise"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::from(v)))
        .collect();
        Model::new("mysql").with("constraints", constraints)
    }

    #[test]
    fn read_only_and_generic_constraints() {
        let generic = vec!["cpu".to_string(), "mem".to_string(), "arch".to_string()];
        let (editable, read_only) = gather_constraints(&service(), &generic);
        let names: Vec<&str> = editable.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["cpu", "mem", "arch"]);
        assert_eq!(editable[0].value, "2");
        assert_eq!(editable[1].value, "");
        let ro: Vec<&str> = read_only.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(ro, ["provider-type", "ubuntu-series"]);
    }

    fn save(env: RecordingEnv) -> (Element, Database) {
        let db = Database::new();
        let ctx = ServiceContext::new(Rc::new(env), db.clone()).with_model(&service());
        let root = Element::new("div");
        let mut comp = Composer::new().with_container(&root);
        comp.add_module(ServiceConstraints::new(ctx)).unwrap();
        comp.render().unwrap();
        root.query("#input-mem").unwrap().set_value("4G");
        root.query("#save-service-constraints")
            .unwrap()
            .dispatch_event(&Event::new("click"));
        (root, db)
    }

    #[test]
    fn success_shows_message() {
        let (root, db) = save(RecordingEnv::default());
        let alert = root.query(".alert-success").unwrap();
        assert_eq!(alert.text(), "Constraints updated");
        assert!(db.notifications.is_empty());
        assert!(!root.query("#save-service-constraints").unwrap().is_disabled());
    }

    #[test]
    fn failure_notifies_and_reenables() {
        let (root, db) = save(RecordingEnv::failing());
        assert!(root.query(".alert-success").is_none());
        let note = db.notifications.last().unwrap();
        assert_eq!(note.title, "Error setting service constraints");
        assert_eq!(note.link.as_deref(), Some("/service/mysql/constraints"));
        assert!(!root.query("#save-service-constraints").unwrap().is_disabled());
    }
}
