#![forbid(unsafe_code)]

//! Composition runtime for jgui.
//!
//! - [`composer::Composer`] owns a container and an ordered set of
//!   [`module::Module`]s, and drives their render hooks.
//! - [`router::EventRouter`] turns each module's declarative
//!   [`event_spec::EventSpec`] into scene, render and bus listeners with
//!   before/on/after ordering.
//! - [`bus::MessageBus`] is the per-composer global event namespace.
//! - [`binding::BindingEngine`] keeps [`viewlet::Viewlet`] fragments in step
//!   with a [`model::Model`].
//! - [`reactive`] holds the observable primitives everything above is
//!   built on.

pub mod binding;
pub mod bus;
pub mod composer;
pub mod config;
pub mod debounce;
pub mod event_spec;
pub mod model;
pub mod module;
pub mod reactive;
pub mod router;
pub mod viewlet;

pub use binding::{BindingEngine, paths_related};
pub use bus::{BusSubscription, MessageBus, WeakBus};
pub use composer::Composer;
pub use config::{ConfigError, GridTiers, InspectorConfig};
pub use debounce::Debouncer;
pub use event_spec::{BindingEntry, EventSpec, Handler, HandlerRef, Namespace};
pub use model::{Change, ListChange, Model, ModelList, Update, Value};
pub use module::{
    Dispatch, HandlerContext, HandlerTable, Module, ModuleHandle, ModuleRef, RenderContext,
};
pub use reactive::{BindingScope, Observable, Subscription};
pub use router::EventRouter;
pub use viewlet::{Viewlet, ViewletRegistry};
