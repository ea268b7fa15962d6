//! Synchronous recording environment for unit tests.

use std::cell::{Cell, RefCell};

use crate::env::{
    AddUnitResult, Callback, Endpoint, Environment, RelationResult, RemoveUnitsResult,
    RpcResponse, ServiceResult, Settings,
};

#[derive(Default)]
pub(crate) struct RecordingEnv {
    pub calls: RefCell<Vec<String>>,
    pub fail: Cell<bool>,
}

impl RecordingEnv {
    pub fn failing() -> Self {
        let env = Self::default();
        env.fail.set(true);
        env
    }

    fn respond<T>(&self, call: String, data: T, callback: Callback<T>) {
        self.calls.borrow_mut().push(call);
        let err = self.fail.get().then(|| "failed".to_string());
        callback(RpcResponse { err, data });
    }

    fn service(&self, call: &str, service: &str, callback: Callback<ServiceResult>) {
        let data = ServiceResult {
            service_name: service.to_string(),
        };
        self.respond(format!("{call}({service})"), data, callback);
    }
}

impl Environment for RecordingEnv {
    fn add_unit(&self, service: &str, num_units: u32, callback: Callback<AddUnitResult>) {
        let data = AddUnitResult {
            service_name: service.to_string(),
            num_units,
            unit_names: (0..num_units).map(|i| format!("{service}/{}", 100 + i)).collect(),
        };
        self.respond(format!("add_unit({service},{num_units})"), data, callback);
    }

    fn remove_units(&self, unit_names: Vec<String>, callback: Callback<RemoveUnitsResult>) {
        let call = format!("remove_units({})", unit_names.join(","));
        self.respond(call, RemoveUnitsResult { unit_names }, callback);
    }

    fn destroy_service(&self, service: &str, callback: Callback<ServiceResult>) {
        self.service("destroy_service", service, callback);
    }

    fn expose(&self, service: &str, callback: Callback<ServiceResult>) {
        self.service("expose", service, callback);
    }

    fn unexpose(&self, service: &str, callback: Callback<ServiceResult>) {
        self.service("unexpose", service, callback);
    }

    fn set_constraints(&self, service: &str, _: Settings, callback: Callback<ServiceResult>) {
        self.service("set_constraints", service, callback);
    }

    fn set_config(&self, service: &str, _: Settings, callback: Callback<ServiceResult>) {
        self.service("set_config", service, callback);
    }

    fn remove_relation(&self, a: Endpoint, b: Endpoint, callback: Callback<RelationResult>) {
        let call = format!("remove_relation({a},{b})");
        let data = RelationResult {
            endpoint_a: a,
            endpoint_b: b,
        };
        self.respond(call, data, callback);
    }
}
