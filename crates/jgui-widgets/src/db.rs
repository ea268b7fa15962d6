#![forbid(unsafe_code)]

//! Small observable in-memory domain store.
//!
//! Holds the service, unit, relation and charm collections the service
//! modules read and mutate, the notification log, and the `update` signal
//! views re-render on.
//!
//! # Invariants
//!
//! - A unit belongs to the service named by its `service` attribute.
//! - When a service model carries a `units` collection, unit additions and
//!   removals made through [`Database`] are mirrored into it.

use std::fmt;

use jgui_runtime::{Model, ModelList, Observable, Subscription, Value};

use crate::env::Endpoint;
use crate::notification::Notifications;

/// Shared store. Clones share state.
#[derive(Clone, Default)]
pub struct Database {
    pub services: ModelList,
    pub units: ModelList,
    pub relations: ModelList,
    pub charms: ModelList,
    pub notifications: Notifications,
    updates: Observable<u64>,
}

impl Database {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that the store changed; bumps the update counter.
    pub fn fire_update(&self) {
        self.updates.update(|n| *n += 1);
    }

    /// Times [`Database::fire_update`] ran.
    #[must_use]
    pub fn update_count(&self) -> u64 {
        self.updates.get()
    }

    pub fn on_update(&self, callback: impl Fn(&u64) + 'static) -> Subscription {
        self.updates.subscribe(callback)
    }

    /// Units of `service`, in store order.
    #[must_use]
    pub fn units_for_service(&self, service: &Model) -> Vec<Model> {
        let id = service.id();
        self.units
            .filter(|unit| unit.get_str("service").as_deref() == Some(id))
    }

    /// Add units to the store and to the service's own collection.
    pub fn add_units(&self, service: &Model, units: Vec<Model>) {
        if let Some(list) = service.get_models("units") {
            list.add_all(units.iter().cloned());
        }
        self.units.add_all(units);
    }

    /// Remove units by id from the store and the service's collection.
    ///
    /// Returns how many were found in the store.
    pub fn remove_units(&self, service: &Model, ids: &[String]) -> usize {
        let doomed: Vec<Model> = ids.iter().filter_map(|id| self.units.get_by_id(id)).collect();
        if let Some(list) = service.get_models("units") {
            let local: Vec<Model> = ids.iter().filter_map(|id| list.get_by_id(id)).collect();
            list.remove_all(&local);
        }
        self.units.remove_all(&doomed)
    }

    /// Relations with an endpoint on `service_id`.
    #[must_use]
    pub fn relations_for_service(&self, service_id: &str) -> Vec<Model> {
        self.relations.filter(|rel| {
            relation_endpoints(rel)
                .iter()
                .any(|ep| ep.service == service_id)
        })
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("services", &self.services.len())
            .field("units", &self.units.len())
            .field("relations", &self.relations.len())
            .field("notifications", &self.notifications.len())
            .finish()
    }
}

/// Build a relation model with `endpoints = [[service, name], ...]`.
#[must_use]
pub fn relation_model(id: impl Into<String>, endpoints: &[Endpoint]) -> Model {
    let list: Vec<Value> = endpoints
        .iter()
        .map(|ep| Value::List(vec![ep.service.as_str().into(), ep.name.as_str().into()]))
        .collect();
    Model::new(id).with("endpoints", list)
}

/// Decode a relation's `endpoints` attribute. Malformed entries are
/// skipped.
#[must_use]
pub fn relation_endpoints(relation: &Model) -> Vec<Endpoint> {
    let Some(Value::List(items)) = relation.get("endpoints") else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item.as_list()? {
            [service, name, ..] => Some(Endpoint::new(service.as_str()?, name.as_str()?)),
            [service] => Some(Endpoint::new(service.as_str()?, "")),
            _ => None,
        })
        .collect()
}
