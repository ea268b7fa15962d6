#![forbid(unsafe_code)]

//! Confirmation panel for destructive service actions.
//!
//! The panel is an element subtree with a message, a primary action button
//! (`.confirm`) and a cancel button (`.cancel`). Cancel and Escape close it
//! on their own; the action button is left to the owning module, which
//! binds `#<panel id> .confirm` in its scene spec so the confirmation runs
//! as one of its handlers.
//!
//! # Example
//!
//! ```ignore
//! let panel = ConfirmPanel::new("destroy-modal-panel", "Are you sure?", "Destroy Service");
//! container.append(panel.element());
//! panel.show();
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use jgui_core::{Element, Key, ListenerHandle, Phase};

/// How the panel was last closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmResult {
    /// Closed by Escape.
    Dismissed,
    Cancel,
    /// Closed by the owner after running the action.
    Confirm,
}

#[derive(Debug, Default)]
struct ConfirmState {
    open: bool,
    result: Option<ConfirmResult>,
}

impl ConfirmState {
    fn close(&mut self, result: ConfirmResult) {
        self.open = false;
        self.result = Some(result);
    }
}

/// A lazily created confirmation panel.
pub struct ConfirmPanel {
    root: Element,
    message: Element,
    action: Element,
    state: Rc<RefCell<ConfirmState>>,
    _listeners: Vec<ListenerHandle>,
}

impl ConfirmPanel {
    /// Build a hidden panel with id `id`.
    #[must_use]
    pub fn new(id: &str, message: &str, action_label: &str) -> Self {
        let message_el = Element::new("p").with_class("message").with_text(message);
        let action = Element::new("button")
            .with_class("btn")
            .with_class("btn-danger")
            .with_class("confirm")
            .with_text(action_label);
        let cancel = Element::new("button")
            .with_class("btn")
            .with_class("cancel")
            .with_text("Cancel");
        let root = Element::new("div")
            .with_id(id)
            .with_class("modal-panel")
            .with_child(Element::new("div").with_class("modal-body").with_child(message_el.clone()))
            .with_child(
                Element::new("div")
                    .with_class("modal-footer")
                    .with_child(action.clone())
                    .with_child(cancel.clone()),
            );
        root.set_hidden(true);

        let state = Rc::new(RefCell::new(ConfirmState::default()));
        let on_cancel = {
            let state = Rc::downgrade(&state);
            let root = root.downgrade();
            cancel.add_listener("click", Phase::On, 0, move |event, _| {
                event.prevent_default();
                if let (Some(state), Some(root)) = (state.upgrade(), root.upgrade()) {
                    state.borrow_mut().close(ConfirmResult::Cancel);
                    root.set_hidden(true);
                }
            })
        };
        let on_escape = {
            let state = Rc::downgrade(&state);
            let weak_root = root.downgrade();
            root.add_listener("keydown", Phase::On, 0, move |event, _| {
                if event.key() != Some(Key::Escape) {
                    return;
                }
                if let (Some(state), Some(root)) = (state.upgrade(), weak_root.upgrade()) {
                    if state.borrow().open {
                        state.borrow_mut().close(ConfirmResult::Dismissed);
                        root.set_hidden(true);
                    }
                }
            })
        };

        Self {
            root,
            message: message_el,
            action,
            state,
            _listeners: vec![on_cancel, on_escape],
        }
    }

    /// The panel's root element.
    #[must_use]
    pub fn element(&self) -> &Element {
        &self.root
    }

    #[must_use]
    pub fn confirm_button(&self) -> &Element {
        &self.action
    }

    #[must_use]
    pub fn message(&self) -> String {
        self.message.text()
    }

    /// Relabel the action button.
    pub fn set_action(&self, label: &str) {
        self.action.set_text(label);
    }

    /// Open the panel; the action button is re-enabled.
    pub fn show(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.open = true;
            state.result = None;
        }
        self.action.set_disabled(false);
        self.root.set_hidden(false);
    }

    /// Close after the owner ran the action.
    pub fn hide(&self) {
        self.state.borrow_mut().close(ConfirmResult::Confirm);
        self.root.set_hidden(true);
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    #[must_use]
    pub fn result(&self) -> Option<ConfirmResult> {
        self.state.borrow().result
    }

    /// Remove the panel from the tree.
    pub fn destroy(self) {
        self.root.detach();
    }
}

impl fmt::Debug for ConfirmPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmPanel")
            .field("id", &self.root.id())
            .field("open", &self.is_open())
            .field("result", &self.result())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jgui_core::Event;

    fn panel() -> ConfirmPanel {
        ConfirmPanel::new("p", "Are you sure?", "Destroy")
    }

    #[test]
    fn starts_hidden() {
        let p = panel();
        assert!(p.element().is_hidden());
        assert!(!p.is_open());
        assert_eq!(p.message(), "Are you sure?");
    }

    #[test]
    fn cancel_closes() {
        let p = panel();
        p.show();
        let cancel = p.element().query(".cancel").unwrap();
        cancel.dispatch_event(&Event::new("click"));
        assert!(!p.is_open());
        assert!(p.element().is_hidden());
        assert_eq!(p.result(), Some(ConfirmResult::Cancel));
    }

    #[test]
    fn escape_dismisses() {
        let p = panel();
        p.show();
        p.confirm_button()
            .dispatch_event(&Event::new("keydown").with_key(Key::Escape));
        assert_eq!(p.result(), Some(ConfirmResult::Dismissed));
        assert!(p.element().is_hidden());
    }

    #[test]
    fn show_reenables_action() {
        let p = panel();
        p.confirm_button().set_disabled(true);
        p.show();
        assert!(!p.confirm_button().is_disabled());
        p.set_action("Remove");
        assert_eq!(p.confirm_button().text(), "Remove");
        p.hide();
        assert_eq!(p.result(), Some(ConfirmResult::Confirm));
    }
}
