#![forbid(unsafe_code)]

//! A scriptable [`Environment`] double.
//!
//! Every call is recorded as a [`Call`]. Responses are delivered either
//! immediately (inside the call, the default) or held until the test
//! releases them with [`FakeEnvironment::complete_next`], which is how a
//! test observes the "request in flight" state of a module.
//!
//! Failures are scripted per operation with [`FakeEnvironment::fail_next`]
//! (one-shot) or for everything with [`FakeEnvironment::fail_all`].

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;

use ahash::AHashMap;
use jgui_widgets::env::{
    AddUnitResult, Callback, Endpoint, Environment, RelationResult, RemoveUnitsResult,
    RpcResponse, ServiceResult, Settings,
};

/// One recorded environment call with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AddUnit { service: String, num_units: u32 },
    RemoveUnits { unit_names: Vec<String> },
    DestroyService { service: String },
    Expose { service: String },
    Unexpose { service: String },
    SetConstraints { service: String, constraints: Settings },
    SetConfig { service: String, config: Settings },
    RemoveRelation { endpoint_a: Endpoint, endpoint_b: Endpoint },
}

impl Call {
    /// Operation name, as used by [`FakeEnvironment::fail_next`].
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::AddUnit { .. } => "add_unit",
            Self::RemoveUnits { .. } => "remove_units",
            Self::DestroyService { .. } => "destroy_service",
            Self::Expose { .. } => "expose",
            Self::Unexpose { .. } => "unexpose",
            Self::SetConstraints { .. } => "set_constraints",
            Self::SetConfig { .. } => "set_config",
            Self::RemoveRelation { .. } => "remove_relation",
        }
    }
}

type Completion = Box<dyn FnOnce()>;

/// Recording, scriptable environment.
pub struct FakeEnvironment {
    calls: RefCell<Vec<Call>>,
    deferred: Cell<bool>,
    pending: RefCell<VecDeque<Completion>>,
    fail_once: RefCell<AHashMap<&'static str, String>>,
    fail_always: RefCell<Option<String>>,
    next_unit: Cell<u32>,
}

impl Default for FakeEnvironment {
    fn default() -> Self {
        Self {
            calls: RefCell::default(),
            deferred: Cell::new(false),
            pending: RefCell::default(),
            fail_once: RefCell::default(),
            fail_always: RefCell::default(),
            next_unit: Cell::new(100),
        }
    }
}

impl FakeEnvironment {
    /// Responds inside each call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds every response until released.
    #[must_use]
    pub fn deferred() -> Self {
        let env = Self::default();
        env.deferred.set(true);
        env
    }

    /// Make the next `op` call fail with `message`.
    pub fn fail_next(&self, op: &'static str, message: impl Into<String>) {
        self.fail_once.borrow_mut().insert(op, message.into());
    }

    /// Make every call fail with `message` until [`Self::recover`].
    pub fn fail_all(&self, message: impl Into<String>) {
        *self.fail_always.borrow_mut() = Some(message.into());
    }

    pub fn recover(&self) {
        self.fail_once.borrow_mut().clear();
        *self.fail_always.borrow_mut() = None;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Recorded calls of one operation.
    #[must_use]
    pub fn calls_to(&self, op: &str) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.op() == op)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn last_call(&self) -> Option<Call> {
        self.calls.borrow().last().cloned()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Responses held back in deferred mode.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Deliver the oldest held response. Returns `false` when none is
    /// pending.
    pub fn complete_next(&self) -> bool {
        let next = self.pending.borrow_mut().pop_front();
        match next {
            Some(completion) => {
                completion();
                true
            }
            None => false,
        }
    }

    /// Deliver every held response, including ones queued while
    /// delivering. Returns how many ran.
    pub fn complete_all(&self) -> usize {
        let mut ran = 0;
        while self.complete_next() {
            ran += 1;
        }
        ran
    }

    fn outcome(&self, op: &'static str) -> Option<String> {
        if let Some(message) = self.fail_once.borrow_mut().remove(op) {
            return Some(message);
        }
        self.fail_always.borrow().clone()
    }

    fn respond<T: 'static>(&self, call: Call, data: T, callback: Callback<T>) {
        let err = self.outcome(call.op());
        tracing::trace!(op = call.op(), failed = err.is_some(), "fake env call");
        self.calls.borrow_mut().push(call);
        let completion = move || callback(RpcResponse { err, data });
        if self.deferred.get() {
            self.pending.borrow_mut().push_back(Box::new(completion));
        } else {
            completion();
        }
    }

    fn service_result(service: &str) -> ServiceResult {
        ServiceResult {
            service_name: service.to_string(),
        }
    }
}

impl Environment for FakeEnvironment {
    fn add_unit(&self, service: &str, num_units: u32, callback: Callback<AddUnitResult>) {
        let first = self.next_unit.get();
        self.next_unit.set(first + num_units);
        let data = AddUnitResult {
            service_name: service.to_string(),
            num_units,
            unit_names: (first..first + num_units)
                .map(|n| format!("{service}/{n}"))
                .collect(),
        };
        let call = Call::AddUnit {
            service: service.to_string(),
            num_units,
        };
        self.respond(call, data, callback);
    }

    fn remove_units(&self, unit_names: Vec<String>, callback: Callback<RemoveUnitsResult>) {
        let call = Call::RemoveUnits {
            unit_names: unit_names.clone(),
        };
        self.respond(call, RemoveUnitsResult { unit_names }, callback);
    }

    fn destroy_service(&self, service: &str, callback: Callback<ServiceResult>) {
        let call = Call::DestroyService {
            service: service.to_string(),
        };
        self.respond(call, Self::service_result(service), callback);
    }

    fn expose(&self, service: &str, callback: Callback<ServiceResult>) {
        let call = Call::Expose {
            service: service.to_string(),
        };
        self.respond(call, Self::service_result(service), callback);
    }

    fn unexpose(&self, service: &str, callback: Callback<ServiceResult>) {
        let call = Call::Unexpose {
            service: service.to_string(),
        };
        self.respond(call, Self::service_result(service), callback);
    }

    fn set_constraints(&self, service: &str, constraints: Settings, callback: Callback<ServiceResult>) {
        let call = Call::SetConstraints {
            service: service.to_string(),
            constraints,
        };
        self.respond(call, Self::service_result(service), callback);
    }

    fn set_config(&self, service: &str, config: Settings, callback: Callback<ServiceResult>) {
        let call = Call::SetConfig {
            service: service.to_string(),
            config,
        };
        self.respond(call, Self::service_result(service), callback);
    }

    fn remove_relation(&self, endpoint_a: Endpoint, endpoint_b: Endpoint, callback: Callback<RelationResult>) {
        let call = Call::RemoveRelation {
            endpoint_a: endpoint_a.clone(),
            endpoint_b: endpoint_b.clone(),
        };
        let data = RelationResult {
            endpoint_a,
            endpoint_b,
        };
        self.respond(call, data, callback);
    }
}

impl fmt::Debug for FakeEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeEnvironment")
            .field("calls", &self.calls.borrow().len())
            .field("deferred", &self.deferred.get())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn capture<T: 'static>() -> (Rc<RefCell<Option<RpcResponse<T>>>>, Callback<T>) {
        let slot = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&slot);
        (slot, Box::new(move |resp| *sink.borrow_mut() = Some(resp)))
    }

    #[test]
    fn immediate_mode_answers_inside_the_call() {
        let env = FakeEnvironment::new();
        let (slot, cb) = capture();
        env.add_unit("mysql", 2, cb);
        let resp = slot.borrow_mut().take().unwrap();
        assert!(!resp.is_err());
        assert_eq!(resp.data.unit_names, ["mysql/100", "mysql/101"]);
        assert_eq!(
            env.last_call(),
            Some(Call::AddUnit {
                service: "mysql".into(),
                num_units: 2
            })
        );
    }

    #[test]
    fn deferred_mode_holds_responses() {
        let env = FakeEnvironment::deferred();
        let (slot, cb) = capture();
        env.expose("wordpress", cb);
        assert!(slot.borrow().is_none());
        assert_eq!(env.pending(), 1);
        assert!(env.complete_next());
        assert_eq!(slot.borrow().as_ref().unwrap().data.service_name, "wordpress");
        assert!(!env.complete_next());
    }

    #[test]
    fn one_shot_failure() {
        let env = FakeEnvironment::new();
        env.fail_next("expose", "boom");
        let (first, cb) = capture();
        env.expose("a", cb);
        let (second, cb) = capture();
        env.expose("a", cb);
        assert_eq!(first.borrow().as_ref().unwrap().err.as_deref(), Some("boom"));
        assert!(second.borrow().as_ref().unwrap().err.is_none());
        assert_eq!(env.calls_to("expose").len(), 2);
    }
}
