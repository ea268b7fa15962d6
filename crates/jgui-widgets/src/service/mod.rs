#![forbid(unsafe_code)]

//! Service management modules.
//!
//! Each page is a [`Composer`] over a few independent modules sharing one
//! [`ServiceContext`]:
//!
//! | Page | Modules |
//! |------|---------|
//! | units | [`ServiceView`], [`ManageUnits`], [`ExposeButtons`], [`DestroyService`] |
//! | relations | [`ServiceRelations`] |
//! | constraints | [`ServiceConstraints`] |
//! | settings | [`ServiceConfig`] |
//!
//! Without a model every page renders the loading placeholder.

pub mod base;
pub mod config;
pub mod constraints;
pub mod destroy;
pub mod expose;
pub mod grid;
pub mod relations;
pub mod units;

pub use base::{ServiceBase, ServiceContext, ServiceTab, fit_to_window, service_tabs};
pub use config::ServiceConfig;
pub use constraints::ServiceConstraints;
pub use destroy::DestroyService;
pub use expose::ExposeButtons;
pub use grid::{GridSize, ServiceView, render_unit_grid};
pub use relations::ServiceRelations;
pub use units::ManageUnits;

use jgui_core::{ComposeError, Element};
use jgui_runtime::{Composer, ModuleHandle};

/// Which service page to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServicePage {
    Units,
    Relations,
    Constraints,
    Config,
}

impl ServicePage {
    /// Page for a route intent (`None` is the units page).
    #[must_use]
    pub fn from_intent(intent: Option<&str>) -> Option<Self> {
        match intent {
            None | Some("") => Some(Self::Units),
            Some("relations") => Some(Self::Relations),
            Some("constraints") => Some(Self::Constraints),
            Some("config") => Some(Self::Config),
            Some(_) => None,
        }
    }
}

/// Build the composer for `page` inside `container`, unrendered.
///
/// # Errors
///
/// Propagates module registration failures.
pub fn compose_page(
    page: ServicePage,
    ctx: &ServiceContext,
    container: &Element,
) -> Result<Composer, ComposeError> {
    let mut composer = Composer::new().with_container(container);
    match page {
        ServicePage::Units => {
            add_units_modules(&mut composer, ctx)?;
        }
        ServicePage::Relations => {
            composer.add_module(ServiceRelations::new(ctx.clone()))?;
        }
        ServicePage::Constraints => {
            composer.add_module(ServiceConstraints::new(ctx.clone()))?;
        }
        ServicePage::Config => {
            composer.add_module(ServiceConfig::new(ctx.clone()))?;
        }
    }
    Ok(composer)
}

fn add_units_modules(
    composer: &mut Composer,
    ctx: &ServiceContext,
) -> Result<ModuleHandle<ServiceView>, ComposeError> {
    let view = composer.add_module(ServiceView::new(ctx.clone()))?;
    composer.add_module(ManageUnits::new(ctx.clone()))?;
    composer.add_module(ExposeButtons::new(ctx.clone()))?;
    composer.add_module(DestroyService::new(ctx.clone()))?;
    Ok(view)
}

/// The units page, rendered, plus a handle on its view for resize ticks.
///
/// # Errors
///
/// Propagates registration and render failures.
pub fn units_page(
    ctx: &ServiceContext,
    container: &Element,
) -> Result<(Composer, ModuleHandle<ServiceView>), ComposeError> {
    let mut composer = Composer::new().with_container(container);
    let view = add_units_modules(&mut composer, ctx)?;
    composer.render()?;
    Ok((composer, view))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents() {
        assert_eq!(ServicePage::from_intent(None), Some(ServicePage::Units));
        assert_eq!(ServicePage::from_intent(Some("config")), Some(ServicePage::Config));
        assert_eq!(ServicePage::from_intent(Some("charm")), None);
    }
}
