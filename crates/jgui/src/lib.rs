#![forbid(unsafe_code)]

//! jgui public facade.
//!
//! ```ignore
//! use jgui::prelude::*;
//!
//! let container = Element::new("div");
//! let mut composer = Composer::new().with_container(&container);
//! composer.add_module(MyModule::default())?;
//! composer.render()?;
//! ```

pub use jgui_core as core;
pub use jgui_runtime as runtime;
#[cfg(feature = "widgets")]
pub use jgui_widgets as widgets;

pub mod prelude {
    pub use jgui_core::{ComposeError, Element, Event, Key, Phase, Selector};
    pub use jgui_runtime::{
        BindingEngine, Composer, Dispatch, EventSpec, HandlerContext, HandlerTable,
        InspectorConfig, MessageBus, Model, ModelList, Module, ModuleHandle, Observable,
        RenderContext, Value, Viewlet, ViewletRegistry,
    };

    #[cfg(feature = "widgets")]
    pub use jgui_widgets::{
        Database, Environment, InspectorOptions, ServiceContext, ServiceInspector, ServicePage,
        compose_page,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    struct Counter {
        clicks: u32,
        handlers: HandlerTable<Counter>,
    }

    impl Counter {
        fn new() -> Self {
            Self {
                clicks: 0,
                handlers: HandlerTable::new().with("count", |c: &mut Counter, _| c.clicks += 1),
            }
        }
    }

    impl Module for Counter {
        fn name(&self) -> &str {
            "Counter"
        }

        fn events(&self) -> EventSpec {
            EventSpec::new().scene("button", "click", "count")
        }

        fn render(&mut self, ctx: &RenderContext<'_>) {
            ctx.container.append(&Element::new("button"));
        }

        fn dispatch(&mut self, handler: &str, ctx: &HandlerContext<'_>) -> Dispatch {
            HandlerTable::dispatch(self, |m| &m.handlers, handler, ctx)
        }
    }

    #[test]
    fn prelude_composes_a_module() {
        let root = Element::new("div");
        let mut composer = Composer::new().with_container(&root);
        let counter = composer.add_module(Counter::new()).unwrap();
        composer.render().unwrap();
        root.query("button").unwrap().dispatch_event(&Event::new("click"));
        assert_eq!(counter.with(|c| c.clicks), 1);
    }

    #[cfg(feature = "widgets")]
    #[test]
    fn prelude_opens_an_inspector() {
        let fx = jgui_harness::sample();
        let body = Element::new("body");
        let inspector = ServiceInspector::new(&fx.mysql, &body, InspectorOptions::default()).unwrap();
        assert_eq!(inspector.active_viewlet().as_deref(), Some("overview"));
    }
}
