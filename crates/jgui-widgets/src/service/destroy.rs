#![forbid(unsafe_code)]

//! Destroying a service behind a confirmation panel.
//!
//! `#destroy-service` opens the panel (created on first use and appended to
//! the container); its action button runs the destroy. On success the
//! service and every relation naming it leave the store, the panel goes
//! away and the application is routed home.

use std::cell::RefCell;
use std::rc::Rc;

use jgui_core::Element;
use jgui_runtime::{Dispatch, EventSpec, HandlerContext, HandlerTable, MessageBus, Model, Module};

use super::base::{ServiceContext, navigate};
use crate::confirm::ConfirmPanel;
use crate::db::relation_endpoints;
use crate::env::{RpcResponse, ServiceResult};
use crate::notification::RemoteOperationError;

pub const PANEL_ID: &str = "destroy-modal-panel";

const PANEL_MESSAGE: &str =
    "Are you sure you want to destroy the service?  This cannot be undone.";

type PanelSlot = Rc<RefCell<Option<ConfirmPanel>>>;

pub struct DestroyService {
    ctx: ServiceContext,
    panel: PanelSlot,
    handlers: HandlerTable<DestroyService>,
}

impl DestroyService {
    pub const NAME: &'static str = "DestroyService";

    #[must_use]
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx,
            panel: Rc::default(),
            handlers: HandlerTable::new()
                .with("confirmDestroy", Self::confirm_destroy)
                .with("destroyService", Self::destroy_service),
        }
    }

    /// Whether the confirmation panel exists and is open.
    #[must_use]
    pub fn is_confirming(&self) -> bool {
        self.panel.borrow().as_ref().is_some_and(ConfirmPanel::is_open)
    }

    fn confirm_destroy(&mut self, ctx: &HandlerContext<'_>) {
        ctx.event.prevent_default();
        let mut slot = self.panel.borrow_mut();
        let panel = slot.get_or_insert_with(|| {
            ConfirmPanel::new(PANEL_ID, PANEL_MESSAGE, "Destroy Service")
        });
        if panel.element().parent().is_none() {
            if let Some(container) = ctx.container {
                container.append(panel.element());
            }
        }
        panel.show();
    }

    fn destroy_service(&mut self, ctx: &HandlerContext<'_>) {
        let Some(service) = self.ctx.model.clone() else {
            return;
        };
        if let Some(button) = ctx.current {
            button.set_disabled(true);
        }
        let button = ctx.current.map(Element::downgrade);
        let cb_ctx = self.ctx.clone();
        let panel = Rc::clone(&self.panel);
        let bus = ctx.bus.clone();
        tracing::debug!(service = service.id(), "destroying service");
        let id = service.id().to_string();
        self.ctx.env.destroy_service(
            &id,
            Box::new(move |resp: RpcResponse<ServiceResult>| {
                if let Some(err) = resp.err {
                    cb_ctx.db.notifications.report(
                        RemoteOperationError::new(
                            "Error destroying service",
                            format!("Service name: {}", resp.data.service_name),
                            err,
                        )
                        .link(cb_ctx.url(None))
                        .model(service.id()),
                    );
                    if let Some(button) = button.and_then(|b| b.upgrade()) {
                        button.set_disabled(false);
                    }
                    return;
                }
                destroyed(&cb_ctx, &service, &panel, &bus);
            }),
        );
    }
}

fn destroyed(ctx: &ServiceContext, service: &Model, panel: &PanelSlot, bus: &MessageBus) {
    let id = service.id();
    ctx.db.services.remove(service);
    let doomed: Vec<Model> = ctx.db.relations.filter(|rel| {
        relation_endpoints(rel).iter().any(|ep| ep.service == id)
    });
    ctx.db.relations.remove_all(&doomed);
    if let Some(panel) = panel.borrow_mut().take() {
        panel.hide();
        panel.destroy();
    }
    navigate(bus, "/");
    ctx.db.fire_update();
}

impl Module for DestroyService {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn events(&self) -> EventSpec {
        EventSpec::new()
            .scene("#destroy-service", "click", "confirmDestroy")
            .scene("#destroy-modal-panel .confirm", "click", "destroyService")
    }

    fn dispatch(&mut self, handler: &str, ctx: &HandlerContext<'_>) -> Dispatch {
        HandlerTable::dispatch(self, |m| &m.handlers, handler, ctx)
    }
}

impl std::fmt::Debug for DestroyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestroyService")
            .field("service", &self.ctx.service_id())
            .field("confirming", &self.is_confirming())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, relation_model};
    use crate::env::Endpoint;
    use crate::test_support::RecordingEnv;
    use jgui_core::Event;
    use jgui_runtime::Composer;

    fn page(env: RecordingEnv) -> (Composer, Element, Database, Model) {
        let db = Database::new();
        let service = Model::new("mysql");
        db.services.add(service.clone());
        db.relations.add(relation_model(
            "relation-0",
            &[Endpoint::new("wordpress", "db"), Endpoint::new("mysql", "db")],
        ));
        db.relations.add(relation_model("relation-1", &[Endpoint::new("haproxy", "peer")]));
        let ctx = ServiceContext::new(Rc::new(env), db.clone()).with_model(&service);
        let root = Element::new("div")
            .with_child(Element::new("button").with_id("destroy-service"));
        let mut comp = Composer::new().with_container(&root);
        comp.add_module(DestroyService::new(ctx)).unwrap();
        comp.render().unwrap();
        (comp, root, db, service)
    }

    #[test]
    fn confirm_then_destroy() {
        let (comp, root, db, _) = page(RecordingEnv::default());
        let urls = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&urls);
        let _sub = comp.bus().subscribe("navigateTo", move |e: &Event| {
            seen.borrow_mut().push(e.field("url").unwrap_or_default().to_string());
        });

        let click = Event::new("click");
        root.query("#destroy-service").unwrap().dispatch_event(&click);
        assert!(click.is_default_prevented());
        let panel = root.query("#destroy-modal-panel").unwrap();
        assert!(!panel.is_hidden());

        panel.query(".confirm").unwrap().dispatch_event(&Event::new("click"));
        assert!(db.services.is_empty());
        assert_eq!(db.relations.ids(), ["relation-1"]);
        assert!(root.query("#destroy-modal-panel").is_none());
        assert_eq!(*urls.borrow(), ["/"]);
        assert_eq!(db.update_count(), 1);
    }

    #[test]
    fn failure_keeps_service() {
        let (_comp, root, db, _) = page(RecordingEnv::failing());
        root.query("#destroy-service").unwrap().dispatch_event(&Event::new("click"));
        let confirm = root.query("#destroy-modal-panel .confirm").unwrap();
        confirm.dispatch_event(&Event::new("click"));
        assert_eq!(db.services.len(), 1);
        assert_eq!(db.notifications.last().unwrap().title, "Error destroying service");
        assert!(!confirm.is_disabled());
    }

    #[test]
    fn panel_is_created_once() {
        let (_comp, root, _, _) = page(RecordingEnv::failing());
        let open = root.query("#destroy-service").unwrap();
        open.dispatch_event(&Event::new("click"));
        open.dispatch_event(&Event::new("click"));
        assert_eq!(root.query_all("#destroy-modal-panel").len(), 1);
    }
}
