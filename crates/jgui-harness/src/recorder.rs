#![forbid(unsafe_code)]

//! Capture bus traffic for assertions.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use jgui_core::{Event, EventDetail};
use jgui_runtime::{BusSubscription, MessageBus};

/// One captured bus event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub name: String,
    pub fields: BTreeMap<String, String>,
}

/// Records every firing of the watched event names, in order.
///
/// Recording stops when the recorder is dropped.
#[derive(Debug)]
pub struct BusRecorder {
    log: Rc<RefCell<Vec<Recorded>>>,
    _subs: Vec<BusSubscription>,
}

impl BusRecorder {
    #[must_use]
    pub fn watch<'a>(bus: &MessageBus, names: impl IntoIterator<Item = &'a str>) -> Self {
        let log: Rc<RefCell<Vec<Recorded>>> = Rc::default();
        let subs = names
            .into_iter()
            .map(|name| {
                let sink = Rc::clone(&log);
                bus.subscribe(name, move |event: &Event| {
                    let fields = match event.detail() {
                        EventDetail::Fields(fields) => fields.clone(),
                        _ => BTreeMap::new(),
                    };
                    sink.borrow_mut().push(Recorded {
                        name: event.name().to_string(),
                        fields,
                    });
                })
            })
            .collect();
        Self { log, _subs: subs }
    }

    #[must_use]
    pub fn events(&self) -> Vec<Recorded> {
        self.log.borrow().clone()
    }

    /// Names in firing order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.log.borrow().iter().map(|r| r.name.clone()).collect()
    }

    /// Values of `field` across firings of `name`.
    #[must_use]
    pub fn field_values(&self, name: &str, field: &str) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter(|r| r.name == name)
            .filter_map(|r| r.fields.get(field).cloned())
            .collect()
    }

    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.log.borrow().iter().filter(|r| r.name == name).count()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}
