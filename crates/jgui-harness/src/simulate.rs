#![forbid(unsafe_code)]

//! User-input simulation on the element tree.
//!
//! Each helper builds the event, dispatches it at `target` (so it bubbles
//! through delegated listeners) and returns it for default-prevented
//! checks.

use std::collections::BTreeMap;

use jgui_core::{Element, Event, Key};
use jgui_runtime::MessageBus;

fn fire_at(target: &Element, event: Event) -> Event {
    let invoked = target.dispatch_event(&event);
    tracing::trace!(event = event.name(), invoked, "simulated");
    event
}

pub fn click(target: &Element) -> Event {
    fire_at(target, Event::new("click"))
}

pub fn mousedown(target: &Element) -> Event {
    fire_at(target, Event::new("mousedown"))
}

pub fn blur(target: &Element) -> Event {
    fire_at(target, Event::new("blur"))
}

pub fn key(target: &Element, key: Key) -> Event {
    fire_at(target, Event::new("keydown").with_key(key))
}

/// Replace a field's value and fire `change`.
pub fn type_value(target: &Element, value: &str) -> Event {
    target.set_value(value);
    fire_at(target, Event::new("change").with_text(value))
}

/// Type a value and press Enter.
pub fn submit_value(target: &Element, value: &str) -> Event {
    type_value(target, value);
    key(target, Key::Enter)
}

/// Query `selector` under `root` and click the match.
///
/// # Panics
///
/// When nothing matches.
pub fn click_on(root: &Element, selector: &str) -> Event {
    let Some(target) = root.query(selector) else {
        panic!("no element matches '{selector}' in {}", root.outer_html());
    };
    click(&target)
}

/// Announce a window resize on the bus.
pub fn resize(bus: &MessageBus, height: u32) -> usize {
    let fields = BTreeMap::from([("height".to_string(), height.to_string())]);
    bus.fire(&Event::new("windowresize").with_fields(fields))
}
