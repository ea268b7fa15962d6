#![forbid(unsafe_code)]

//! Contract for the orchestration RPC client.
//!
//! Every call takes the identifiers and payload of the operation plus a
//! completion callback. Implementations must invoke the callback exactly
//! once, either synchronously or later; service modules make no assumption
//! about which.
//!
//! # Failure Modes
//!
//! Remote failures arrive as `RpcResponse::err`. They are never returned
//! as `Err`; the service modules turn them into notifications.

use std::collections::BTreeMap;
use std::fmt;

/// Completion payload of an RPC call.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RpcResponse<T> {
    /// Remote error text; `None` on success.
    pub err: Option<String>,
    pub data: T,
}

impl<T> RpcResponse<T> {
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self { err: None, data }
    }

    #[must_use]
    pub fn failed(err: impl Into<String>, data: T) -> Self {
        Self {
            err: Some(err.into()),
            data,
        }
    }

    #[must_use]
    pub fn is_err(&self) -> bool {
        self.err.is_some()
    }
}

/// Result data of `add_unit`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AddUnitResult {
    pub service_name: String,
    pub num_units: u32,
    /// Ids of the created units, `service/N`.
    pub unit_names: Vec<String>,
}

/// Result data of `remove_units`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RemoveUnitsResult {
    pub unit_names: Vec<String>,
}

/// Result data of the per-service calls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceResult {
    pub service_name: String,
}

/// One side of a relation: service plus relation name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Endpoint {
    pub service: String,
    pub name: String,
}

impl Endpoint {
    #[must_use]
    pub fn new(service: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.name)
    }
}

/// Result data of `remove_relation`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelationResult {
    pub endpoint_a: Endpoint,
    pub endpoint_b: Endpoint,
}

/// One-shot completion callback.
pub type Callback<T> = Box<dyn FnOnce(RpcResponse<T>)>;

/// Key/value settings sent to the environment.
pub type Settings = BTreeMap<String, String>;

/// The RPC surface the service modules drive.
pub trait Environment {
    fn add_unit(&self, service: &str, num_units: u32, callback: Callback<AddUnitResult>);

    fn remove_units(&self, unit_names: Vec<String>, callback: Callback<RemoveUnitsResult>);

    fn destroy_service(&self, service: &str, callback: Callback<ServiceResult>);

    fn expose(&self, service: &str, callback: Callback<ServiceResult>);

    fn unexpose(&self, service: &str, callback: Callback<ServiceResult>);

    fn set_constraints(
        &self,
        service: &str,
        constraints: Settings,
        callback: Callback<ServiceResult>,
    );

    fn set_config(&self, service: &str, config: Settings, callback: Callback<ServiceResult>);

    fn remove_relation(
        &self,
        endpoint_a: Endpoint,
        endpoint_b: Endpoint,
        callback: Callback<RelationResult>,
    );
}
