#![forbid(unsafe_code)]

//! Service pages and the service inspector for jgui.
//!
//! Everything here is a [`jgui_runtime::Module`] or a helper used by one.
//! Remote calls go through the [`env::Environment`] trait; their outcomes
//! land in the shared [`db::Database`] and, on failure, in its
//! [`notification::Notifications`].

pub mod confirm;
pub mod db;
pub mod env;
pub mod inspector;
pub mod notification;
pub mod service;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use confirm::{ConfirmPanel, ConfirmResult};
pub use db::Database;
pub use env::{
    AddUnitResult, Callback, Endpoint, Environment, RelationResult, RemoveUnitsResult,
    RpcResponse, ServiceResult, Settings,
};
pub use inspector::{InspectorOptions, ServiceInspector, default_viewlets};
pub use notification::{Level, Notification, Notifications, RemoteOperationError};
pub use service::{ServiceContext, ServicePage, compose_page, units_page};
pub use utils::{UnitState, simplify_state};
