#![forbid(unsafe_code)]

//! Scaling a service by editing its unit count.
//!
//! `#num-service-units` reacts to Escape (reset), Enter (request the typed
//! count) and blur (reset). A larger count adds units, a smaller one
//! removes the newest units.
//!
//! # Failure Modes
//!
//! | Input | Result |
//! |-------|--------|
//! | not a decimal number | field reset, no call |
//! | `0` | warning logged, field reset, no call |
//! | same as current | field reset, no call |
//! | remote error | notification, store untouched |

use jgui_core::{Element, Key};
use jgui_runtime::{Dispatch, EventSpec, HandlerContext, HandlerTable, Model, Module};

use super::base::ServiceContext;
use super::grid::unit_count;
use crate::env::{AddUnitResult, RemoveUnitsResult, RpcResponse};
use crate::notification::RemoteOperationError;

/// Selector of the unit-count field.
pub const UNIT_FIELD: &str = "#num-service-units";

/// Unit-count editing for a service page.
pub struct ManageUnits {
    ctx: ServiceContext,
    handlers: HandlerTable<ManageUnits>,
}

impl ManageUnits {
    pub const NAME: &'static str = "ManageUnits";

    #[must_use]
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx,
            handlers: HandlerTable::new()
                .with("modifyUnits", Self::on_key)
                .with("resetUnits", Self::on_blur),
        }
    }

    fn on_key(&mut self, ctx: &HandlerContext<'_>) {
        let Some(field) = ctx.current else { return };
        match ctx.event.key() {
            Some(Key::Escape) => self.reset_field(field),
            Some(Key::Enter) => {
                let typed = field.value();
                let typed = typed.trim();
                match typed.parse::<i64>() {
                    Ok(requested) if typed.bytes().all(|b| b.is_ascii_digit()) => {
                        self.modify_units(requested, field);
                    }
                    _ => self.reset_field(field),
                }
            }
            _ => {}
        }
    }

    fn on_blur(&mut self, ctx: &HandlerContext<'_>) {
        if let Some(field) = ctx.current {
            self.reset_field(field);
        }
    }

    fn reset_field(&self, field: &Element) {
        if let Some(service) = &self.ctx.model {
            field.set_value(unit_count(&self.ctx, service).to_string());
        }
        field.set_disabled(false);
    }

    /// Move the service to `requested` units.
    pub fn modify_units(&mut self, requested: i64, field: &Element) {
        let Some(service) = self.ctx.model.clone() else {
            return;
        };
        if requested < 1 {
            tracing::warn!(service = service.id(), "You must have at least one unit");
            self.reset_field(field);
            return;
        }
        let delta = requested - unit_count(&self.ctx, &service);
        if delta == 0 {
            self.reset_field(field);
            return;
        }
        field.set_disabled(true);
        let done = field.downgrade();
        let ctx = self.ctx.clone();
        let after = move || {
            if let Some(field) = done.upgrade() {
                if let Some(service) = &ctx.model {
                    field.set_value(unit_count(&ctx, service).to_string());
                }
                field.set_disabled(false);
            }
        };

        if delta > 0 {
            let num_units = u32::try_from(delta).unwrap_or(u32::MAX);
            tracing::debug!(service = service.id(), num_units, "adding units");
            let cb_ctx = self.ctx.clone();
            let id = service.id().to_string();
            self.ctx.env.add_unit(
                &id,
                num_units,
                Box::new(move |resp| {
                    add_unit_done(&cb_ctx, &service, resp);
                    after();
                }),
            );
        } else {
            let units = self.ctx.db.units_for_service(&service);
            let doomed = usize::try_from(-delta).unwrap_or(usize::MAX).min(units.len());
            let unit_names: Vec<String> = units[units.len() - doomed..]
                .iter()
                .map(|u| u.id().to_string())
                .collect();
            tracing::debug!(service = service.id(), units = ?unit_names, "removing units");
            let cb_ctx = self.ctx.clone();
            self.ctx.env.remove_units(
                unit_names,
                Box::new(move |resp| {
                    remove_units_done(&cb_ctx, &service, resp);
                    after();
                }),
            );
        }
    }
}

fn add_unit_done(ctx: &ServiceContext, service: &Model, resp: RpcResponse<AddUnitResult>) {
    let RpcResponse { err, data } = resp;
    if let Some(err) = err {
        ctx.db.notifications.report(
            RemoteOperationError::new("Error adding unit", format!("{} units", data.num_units), err)
                .link(ctx.url(None))
                .model(service.id()),
        );
    } else {
        let units = data
            .unit_names
            .iter()
            .map(|name| {
                Model::new(name.as_str())
                    .with("service", service.id())
                    .with("agent_state", "pending")
            })
            .collect();
        ctx.db.add_units(service, units);
        let count = service.get_i64("unit_count").unwrap_or(0);
        service.set("unit_count", count + i64::from(data.num_units));
    }
    ctx.db.fire_update();
}

fn remove_units_done(ctx: &ServiceContext, service: &Model, resp: RpcResponse<RemoveUnitsResult>) {
    let RpcResponse { err, data } = resp;
    let names = &data.unit_names;
    if let Some(err) = err {
        let (title, message) = match names.len() {
            0 => ("Error removing unit", String::new()),
            1 => ("Error removing unit", format!("Unit name: {}", names[0])),
            _ => ("Error removing units", format!("Unit names: {}", names.join(", "))),
        };
        ctx.db.notifications.report(
            RemoteOperationError::new(title, message, err)
                .link(ctx.url(None))
                .model(service.id()),
        );
    } else {
        ctx.db.remove_units(service, names);
        let count = service.get_i64("unit_count").unwrap_or(0);
        let removed = i64::try_from(names.len()).unwrap_or(i64::MAX);
        service.set("unit_count", (count - removed).max(0));
    }
    ctx.db.fire_update();
}

impl Module for ManageUnits {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn events(&self) -> EventSpec {
        EventSpec::new()
            .scene(UNIT_FIELD, "keydown", "modifyUnits")
            .scene(UNIT_FIELD, "blur", "resetUnits")
    }

    fn dispatch(&mut self, handler: &str, ctx: &HandlerContext<'_>) -> Dispatch {
        HandlerTable::dispatch(self, |m| &m.handlers, handler, ctx)
    }
}

impl std::fmt::Debug for ManageUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManageUnits")
            .field("service", &self.ctx.service_id())
            .finish()
    }
}
