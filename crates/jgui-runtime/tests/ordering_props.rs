//! Property tests for handler ordering and binding path matching.

#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::Rc;

use jgui_core::{Element, Event, Phase};
use jgui_runtime::{
    BindingEngine, Composer, Dispatch, EventSpec, Handler, HandlerContext, Model, Module, Viewlet,
    paths_related,
};
use proptest::prelude::*;

type Log = Rc<RefCell<Vec<(Phase, usize, usize)>>>;

struct Declared {
    name: String,
    ordinal: usize,
    phases: Vec<Phase>,
    log: Log,
}

impl Module for Declared {
    fn name(&self) -> &str {
        &self.name
    }

    fn events(&self) -> EventSpec {
        self.phases
            .iter()
            .enumerate()
            .fold(EventSpec::new(), |spec, (i, phase)| {
                spec.global("tick", Handler::named(i.to_string()).phase(*phase))
            })
    }

    fn dispatch(&mut self, handler: &str, _ctx: &HandlerContext<'_>) -> Dispatch {
        let Ok(i) = handler.parse::<usize>() else {
            return Dispatch::Unhandled;
        };
        self.log
            .borrow_mut()
            .push((self.phases[i], self.ordinal, i));
        Dispatch::Handled
    }
}

fn phase() -> impl Strategy<Value = Phase> {
    prop_oneof![Just(Phase::Before), Just(Phase::On), Just(Phase::After)]
}

proptest! {
    #[test]
    fn bus_order_is_phase_module_declaration(
        modules in prop::collection::vec(prop::collection::vec(phase(), 0..5), 1..5)
    ) {
        let log: Log = Rc::default();
        let mut comp = Composer::new();
        for (ordinal, phases) in modules.iter().enumerate() {
            comp.add_module(Declared {
                name: format!("m{ordinal}"),
                ordinal,
                phases: phases.clone(),
                log: Rc::clone(&log),
            })
            .unwrap();
        }
        let invoked = comp.fire(&Event::new("tick")).unwrap();
        let total: usize = modules.iter().map(Vec::len).sum();
        prop_assert_eq!(invoked, total);

        let seen = log.borrow().clone();
        let mut expected = seen.clone();
        expected.sort();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn scene_order_matches_bus_order(
        phases in prop::collection::vec(phase(), 1..6)
    ) {
        let log: Log = Rc::default();
        let root = Element::new("div").with_child(Element::new("a").with_class("x"));
        let mut comp = Composer::new().with_container(&root);

        struct Scene(Declared);
        impl Module for Scene {
            fn name(&self) -> &str { self.0.name() }
            fn events(&self) -> EventSpec {
                self.0.phases.iter().enumerate().fold(EventSpec::new(), |spec, (i, phase)| {
                    spec.scene(".x", "click", Handler::named(i.to_string()).phase(*phase))
                })
            }
            fn dispatch(&mut self, handler: &str, ctx: &HandlerContext<'_>) -> Dispatch {
                self.0.dispatch(handler, ctx)
            }
        }

        comp.add_module(Scene(Declared {
            name: "scene".into(),
            ordinal: 0,
            phases,
            log: Rc::clone(&log),
        }))
        .unwrap();
        comp.render().unwrap();
        let target = root.query(".x").unwrap();
        target.dispatch_event(&Event::new("click"));

        let seen = log.borrow().clone();
        let mut expected = seen.clone();
        expected.sort();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn related_is_symmetric_and_prefix_based(
        a in "[a-c]{1,2}(\\.[a-c]{1,2}){0,2}",
        b in "[a-c]{1,2}(\\.[a-c]{1,2}){0,2}",
    ) {
        prop_assert_eq!(paths_related(&a, &b), paths_related(&b, &a));
        let expected = a == b
            || b.starts_with(&format!("{a}."))
            || a.starts_with(&format!("{b}."));
        prop_assert_eq!(paths_related(&a, &b), expected);
    }

    #[test]
    fn affected_viewlets_match_related_paths(
        bound in prop::collection::vec("[a-c](\\.[a-c]){0,2}", 1..6),
        changed in "[a-c](\\.[a-c]){0,2}",
    ) {
        let region = Element::new("div");
        let engine = BindingEngine::new(&region);
        let viewlets: Vec<Viewlet> = bound
            .iter()
            .enumerate()
            .map(|(i, path)| {
                Viewlet::new(format!("v{i}"), |_| Element::new("div")).bind(path.clone(), ".x")
            })
            .collect();
        engine.bind(&Model::new("m"), viewlets).unwrap();

        let expected: Vec<String> = bound
            .iter()
            .enumerate()
            .filter(|(_, path)| paths_related(path, &changed))
            .map(|(i, _)| format!("v{i}"))
            .collect();
        prop_assert_eq!(engine.affected_viewlets(&changed), expected);
    }
}
