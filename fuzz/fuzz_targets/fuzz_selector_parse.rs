#![no_main]

use jgui_core::{Element, Selector};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: &str| {
    let Ok(selector) = Selector::parse(input) else {
        return;
    };
    let root = Element::new("div").with_id("root").with_child(
        Element::new("span")
            .with_class("a")
            .with_attr("data-bind", "x")
            .with_child(Element::new("b")),
    );
    for el in root.descendants() {
        let _ = selector.matches(&el);
        let _ = selector.matches_in(&el, &root);
    }
    let _ = root.select_all(&selector);
});
