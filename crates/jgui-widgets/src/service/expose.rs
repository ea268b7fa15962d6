#![forbid(unsafe_code)]

//! Expose and unexpose buttons.

use jgui_runtime::{Dispatch, EventSpec, HandlerContext, HandlerTable, Model, Module};

use super::base::ServiceContext;
use crate::env::{RpcResponse, ServiceResult};
use crate::notification::RemoteOperationError;

pub struct ExposeButtons {
    ctx: ServiceContext,
    handlers: HandlerTable<ExposeButtons>,
}

impl ExposeButtons {
    pub const NAME: &'static str = "ExposeButtons";

    #[must_use]
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx,
            handlers: HandlerTable::new()
                .with("exposeService", |m: &mut ExposeButtons, _| m.set_exposed(true))
                .with("unexposeService", |m: &mut ExposeButtons, _| m.set_exposed(false)),
        }
    }

    /// Ask the environment to (un)expose the service.
    pub fn set_exposed(&mut self, exposed: bool) {
        let Some(service) = self.ctx.model.clone() else {
            return;
        };
        let ctx = self.ctx.clone();
        let callback = Box::new(move |resp: RpcResponse<ServiceResult>| {
            exposure_done(&ctx, &service, exposed, resp);
        });
        let id = self.ctx.service_id().unwrap_or_default();
        if exposed {
            self.ctx.env.expose(id, callback);
        } else {
            self.ctx.env.unexpose(id, callback);
        }
    }
}

fn exposure_done(
    ctx: &ServiceContext,
    service: &Model,
    exposed: bool,
    resp: RpcResponse<ServiceResult>,
) {
    match resp.err {
        Some(err) => {
            let title = if exposed {
                "Error exposing service"
            } else {
                "Error un-exposing service"
            };
            ctx.db.notifications.report(
                RemoteOperationError::new(title, format!("Service name: {}", resp.data.service_name), err)
                    .link(ctx.url(None))
                    .model(service.id()),
            );
        }
        None => {
            service.set("exposed", exposed);
            ctx.db.fire_update();
        }
    }
}

impl Module for ExposeButtons {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn events(&self) -> EventSpec {
        EventSpec::new()
            .scene(".exposeService", "mousedown", "exposeService")
            .scene(".unexposeService", "mousedown", "unexposeService")
    }

    fn dispatch(&mut self, handler: &str, ctx: &HandlerContext<'_>) -> Dispatch {
        HandlerTable::dispatch(self, |m| &m.handlers, handler, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::test_support::RecordingEnv;
    use std::rc::Rc;

    fn module(env: RecordingEnv) -> (Rc<RecordingEnv>, ExposeButtons, Model, Database) {
        let env = Rc::new(env);
        let db = Database::new();
        let service = Model::new("wordpress").with("exposed", false);
        let ctx = ServiceContext::new(env.clone(), db.clone()).with_model(&service);
        (env, ExposeButtons::new(ctx), service, db)
    }

    #[test]
    fn expose_then_unexpose() {
        let (env, mut m, service, db) = module(RecordingEnv::default());
        m.set_exposed(true);
        assert_eq!(service.get_bool("exposed"), Some(true));
        m.set_exposed(false);
        assert_eq!(service.get_bool("exposed"), Some(false));
        assert_eq!(*env.calls.borrow(), ["expose(wordpress)", "unexpose(wordpress)"]);
        assert_eq!(db.update_count(), 2);
    }

    #[test]
    fn failures_notify() {
        let (_, mut m, service, db) = module(RecordingEnv::failing());
        m.set_exposed(false);
        let note = db.notifications.last().unwrap();
        assert_eq!(note.title, "Error un-exposing service");
        assert_eq!(note.message, "Service name: wordpress");
        assert_eq!(service.get_bool("exposed"), Some(false));
        assert_eq!(db.update_count(), 0);
    }
}
