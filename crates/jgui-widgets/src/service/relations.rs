#![forbid(unsafe_code)]

//! The relations page of a service and relation removal.
//!
//! Each relation row carries a remove button whose `value` is the relation
//! id. Clicking it opens a confirmation panel; confirming calls
//! `remove_relation` with both endpoints (a peer relation passes its single
//! endpoint twice). The row is highlighted with the outcome either way.

use std::cell::RefCell;
use std::rc::Rc;

use jgui_core::Element;
use jgui_runtime::{Dispatch, EventSpec, HandlerContext, HandlerTable, Model, Module, RenderContext};

use super::base::{ServiceBase, ServiceContext, render_page};
use crate::confirm::ConfirmPanel;
use crate::db::relation_endpoints;
use crate::env::{Endpoint, RelationResult, RpcResponse};
use crate::notification::RemoteOperationError;
use crate::utils::highlight_row;

pub const PANEL_ID: &str = "remove-modal-panel";

/// Display data of one relation row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationRow {
    pub id: String,
    /// The other side, or this service for a peer relation.
    pub far: Endpoint,
    pub near: Endpoint,
    pub highlight: bool,
}

/// Rows for every relation of `service_id`; `highlight` marks the row
/// named by the `rel_id` query parameter.
#[must_use]
pub fn relation_rows(relations: &[Model], service_id: &str, highlight: Option<&str>) -> Vec<RelationRow> {
    relations
        .iter()
        .filter_map(|rel| {
            let endpoints = relation_endpoints(rel);
            let near = endpoints.iter().find(|ep| ep.service == service_id)?.clone();
            let far = endpoints
                .iter()
                .find(|ep| ep.service != service_id)
                .unwrap_or(&near)
                .clone();
            Some(RelationRow {
                id: rel.id().to_string(),
                far,
                near,
                highlight: highlight == Some(rel.id()),
            })
        })
        .collect()
}

fn render_rows(rows: &[RelationRow]) -> Element {
    let table = Element::new("table").with_class("table");
    for row in rows {
        let tr = Element::new("tr")
            .with_class("relation")
            .with_attr("data-relation", row.id.clone())
            .with_child(Element::new("td").with_text(row.far.service.clone()))
            .with_child(Element::new("td").with_text(row.near.name.clone()))
            .with_child(
                Element::new("td").with_child(
                    Element::new("button")
                        .with_class("btn")
                        .with_id(row.id.clone())
                        .with_attr("value", row.id.clone())
                        .with_text("Remove"),
                ),
            );
        tr.toggle_class("highlighted", row.highlight);
        table.append(&tr);
    }
    Element::new("div")
        .with_id("service-relations")
        .with_child(table)
}

fn enclosing_row(el: &Element) -> Option<Element> {
    let mut cursor = el.parent();
    while let Some(node) = cursor {
        if node.tag() == "tr" {
            return Some(node);
        }
        cursor = node.parent();
    }
    None
}

/// Relations page with removal.
pub struct ServiceRelations {
    base: ServiceBase,
    panel: Rc<RefCell<Option<ConfirmPanel>>>,
    /// Remove button of the row awaiting confirmation.
    pending: Option<Element>,
    handlers: HandlerTable<ServiceRelations>,
}

impl ServiceRelations {
    pub const NAME: &'static str = "ServiceRelations";

    #[must_use]
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            base: ServiceBase::new(ctx, "service-relations"),
            panel: Rc::default(),
            pending: None,
            handlers: HandlerTable::new()
                .with("confirmRemoved", Self::confirm_removed)
                .with("doRemoveRelation", Self::do_remove_relation),
        }
    }

    fn confirm_removed(&mut self, ctx: &HandlerContext<'_>) {
        ctx.event.prevent_default();
        self.pending = ctx.current.cloned();
        let mut slot = self.panel.borrow_mut();
        let panel = slot.get_or_insert_with(|| {
            ConfirmPanel::new(
                PANEL_ID,
                "Are you sure you want to remove this service relation?  This action cannot be undone, though you can recreate it later.",
                "Remove Service Relation",
            )
        });
        if panel.element().parent().is_none() {
            if let Some(container) = ctx.container {
                container.append(panel.element());
            }
        }
        panel.set_action("Remove Service Relation");
        panel.show();
    }

    fn do_remove_relation(&mut self, ctx: &HandlerContext<'_>) {
        let Some(button) = self.pending.take() else {
            return;
        };
        let rel_id = button.value();
        let Some(relation) = self.base.ctx.db.relations.get_by_id(&rel_id) else {
            tracing::warn!(relation = rel_id.as_str(), "relation to remove is gone");
            if let Some(panel) = self.panel.borrow().as_ref() {
                panel.hide();
            }
            return;
        };
        let (endpoint_a, endpoint_b) = match relation_endpoints(&relation).as_slice() {
            [a, b, ..] => (a.clone(), b.clone()),
            [peer] => (peer.clone(), peer.clone()),
            [] => return,
        };
        let confirm = ctx.current.cloned();
        if let Some(confirm) = &confirm {
            confirm.set_disabled(true);
        }

        let cb_ctx = self.base.ctx.clone();
        let panel = Rc::clone(&self.panel);
        self.base.ctx.env.remove_relation(
            endpoint_a,
            endpoint_b,
            Box::new(move |resp: RpcResponse<RelationResult>| {
                if let Some(row) = enclosing_row(&button) {
                    highlight_row(&row, resp.is_err());
                }
                match resp.err {
                    Some(err) => {
                        let intent =
                            format!("relations?rel_id={}", button.id().unwrap_or_default());
                        let link = cb_ctx.url(Some(intent.as_str()));
                        cb_ctx.db.notifications.report(
                            RemoteOperationError::new(
                                "Error deleting relation",
                                format!(
                                    "Relation {} to {}",
                                    resp.data.endpoint_a, resp.data.endpoint_b
                                ),
                                err,
                            )
                            .link(link)
                            .model(relation.id()),
                        );
                    }
                    None => {
                        cb_ctx.db.relations.remove(&relation);
                        cb_ctx.db.fire_update();
                    }
                }
                if let Some(confirm) = confirm {
                    confirm.set_disabled(false);
                }
                if let Some(panel) = panel.borrow().as_ref() {
                    panel.hide();
                }
            }),
        );
    }

    fn render_data(ctx: &ServiceContext, service: &Model, root: &Element) {
        let body = render_page(root, service, &ctx.db, &ctx.url(Some("relations")));
        let rows = relation_rows(
            &ctx.db.relations_for_service(service.id()),
            service.id(),
            ctx.query.get("rel_id").map(String::as_str),
        );
        body.set_children([render_rows(&rows)]);
    }
}

impl Module for ServiceRelations {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn events(&self) -> EventSpec {
        EventSpec::new()
            .scene("#service-relations .btn", "click", "confirmRemoved")
            .scene("#remove-modal-panel .confirm", "click", "doRemoveRelation")
    }

    fn render(&mut self, ctx: &RenderContext<'_>) {
        self.base.render(ctx.container, ctx.bus, Self::render_data);
    }

    fn dispatch(&mut self, handler: &str, ctx: &HandlerContext<'_>) -> Dispatch {
        HandlerTable::dispatch(self, |m| &m.handlers, handler, ctx)
    }
}

impl std::fmt::Debug for ServiceRelations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRelations")
            .field("base", &self.base)
            .field("pending", &self.pending.as_ref().map(Element::value))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, relation_model};
    use crate::test_support::RecordingEnv;
    use jgui_core::Event;
    use jgui_runtime::Composer;

    fn page(env: RecordingEnv) -> (Rc<RecordingEnv>, Composer, Element, Database) {
        let env = Rc::new(env);
        let db = Database::new();
        let service = Model::new("mysql");
        db.services.add(service.clone());
        db.relations.add(relation_model(
            "relation-0",
            &[Endpoint::new("wordpress", "db"), Endpoint::new("mysql", "db")],
        ));
        db.relations.add(relation_model("relation-1", &[Endpoint::new("mysql", "cluster")]));
        let ctx = ServiceContext::new(env.clone(), db.clone()).with_model(&service);
        let root = Element::new("div");
        let mut comp = Composer::new().with_container(&root);
        comp.add_module(ServiceRelations::new(ctx)).unwrap();
        comp.render().unwrap();
        (env, comp, root, db)
    }

    fn remove(root: &Element, rel: &str) {
        root.query(&format!("#service-relations #{rel}"))
            .unwrap()
            .dispatch_event(&Event::new("click"));
        root.query("#remove-modal-panel .confirm")
            .unwrap()
            .dispatch_event(&Event::new("click"));
    }

    #[test]
    fn rows_name_the_far_side() {
        let rels = vec![
            relation_model("r0", &[Endpoint::new("wordpress", "db"), Endpoint::new("mysql", "server")]),
            relation_model("r1", &[Endpoint::new("mysql", "cluster")]),
            relation_model("r2", &[Endpoint::new("a", "x"), Endpoint::new("b", "y")]),
        ];
        let rows = relation_rows(&rels, "mysql", Some("r1"));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].far.service, "wordpress");
        assert_eq!(rows[0].near.name, "server");
        assert_eq!(rows[1].far, rows[1].near);
        assert!(rows[1].highlight);
    }

    #[test]
    fn remove_calls_env_and_store() {
        let (env, _comp, root, db) = page(RecordingEnv::default());
        remove(&root, "relation-0");
        assert_eq!(*env.calls.borrow(), ["remove_relation(wordpress:db,mysql:db)"]);
        assert_eq!(db.relations.ids(), ["relation-1"]);
        let panel = root.query("#remove-modal-panel").unwrap();
        assert!(panel.is_hidden());
        assert!(!panel.query(".confirm").unwrap().is_disabled());
    }

    #[test]
    fn peer_relation_sends_endpoint_twice() {
        let (env, _comp, root, _) = page(RecordingEnv::default());
        remove(&root, "relation-1");
        assert_eq!(*env.calls.borrow(), ["remove_relation(mysql:cluster,mysql:cluster)"]);
    }

    #[test]
    fn failure_highlights_and_links() {
        let (_, _comp, root, db) = page(RecordingEnv::failing());
        remove(&root, "relation-0");
        assert_eq!(db.relations.len(), 2);
        let row = root.query("tr[data-relation=relation-0]").unwrap();
        assert!(row.has_class("error"));
        let note = db.notifications.last().unwrap();
        assert_eq!(note.title, "Error deleting relation");
        assert_eq!(note.message, "Relation wordpress:db to mysql:db");
        assert_eq!(note.link.as_deref(), Some("/service/mysql/relations?rel_id=relation-0"));
    }
}
