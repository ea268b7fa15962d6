#![forbid(unsafe_code)]

//! In-memory element tree.
//!
//! [`Element`] is a cheap, clonable handle (`Rc`) to a node carrying a tag,
//! an optional id, classes, attributes, text and children. It is the surface
//! containers, rendered fragments and binding targets live on.
//!
//! Listeners are attached with [`Element::add_listener`] and are removed when
//! the returned [`ListenerHandle`] is dropped.
//!
//! # Dispatch
//!
//! [`Element::dispatch_event`] bubbles from the target to the root. At each
//! node the listeners registered for the event name are snapshotted and run
//! in `(phase, rank, registration)` order, so listeners added or removed by a
//! handler take effect on the next dispatch only.
//!
//! # Invariants
//!
//! 1. A node has at most one parent; appending a node elsewhere detaches it.
//! 2. Parent links are weak: a subtree is freed when its root handle drops.
//! 3. Appending an ancestor into its own descendant is a no-op.
//! 4. Dropping a [`ListenerHandle`] removes the listener before the next
//!    dispatch.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

use crate::event::{Event, Phase};
use crate::selector::Selector;

/// Global counter for listener ids.
static LISTENER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

bitflags! {
    /// Interactive state of an element.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ElementState: u8 {
        const DISABLED = 0b0001;
        const HIDDEN   = 0b0010;
        const FOCUSED  = 0b0100;
    }
}

/// Callback type for element listeners: `(event, current_target)`.
pub type ListenerFn = dyn Fn(&Event, &Element);

/// Unique identifier of an element listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(LISTENER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

struct Listener {
    id: ListenerId,
    event: String,
    phase: Phase,
    rank: u64,
    callback: Rc<ListenerFn>,
}

#[derive(Default)]
struct NodeData {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    state: ElementState,
    children: Vec<Element>,
    parent: Weak<RefCell<NodeData>>,
    listeners: Vec<Listener>,
}

/// Handle to a node in the element tree.
#[derive(Clone)]
pub struct Element {
    node: Rc<RefCell<NodeData>>,
}

/// Non-owning element handle.
#[derive(Clone, Default)]
pub struct WeakElement {
    node: Weak<RefCell<NodeData>>,
}

impl WeakElement {
    /// Upgrade to a strong handle if the node is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Element> {
        self.node.upgrade().map(|node| Element { node })
    }
}

impl fmt::Debug for WeakElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(el) => write!(f, "WeakElement({el:?})"),
            None => f.write_str("WeakElement(<dropped>)"),
        }
    }
}

impl Element {
    /// Create a detached element.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            node: Rc::new(RefCell::new(NodeData {
                tag: tag.into(),
                ..NodeData::default()
            })),
        }
    }

    // --- Builders ---

    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.node.borrow_mut().id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_class(self, class: impl Into<String>) -> Self {
        self.add_class(&class.into());
        self
    }

    #[must_use]
    pub fn with_attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.node.borrow_mut().text = text.into();
        self
    }

    #[must_use]
    pub fn with_child(self, child: Element) -> Self {
        self.append(&child);
        self
    }

    // --- Identity ---

    /// Whether both handles point at the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakElement {
        WeakElement {
            node: Rc::downgrade(&self.node),
        }
    }

    // --- Properties ---

    #[must_use]
    pub fn tag(&self) -> String {
        self.node.borrow().tag.clone()
    }

    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.node.borrow().id.clone()
    }

    pub fn set_id(&self, id: impl Into<String>) {
        self.node.borrow_mut().id = Some(id.into());
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.node.borrow().classes.iter().any(|c| c == class)
    }

    #[must_use]
    pub fn classes(&self) -> Vec<String> {
        self.node.borrow().classes.clone()
    }

    pub fn add_class(&self, class: &str) {
        let mut node = self.node.borrow_mut();
        if !node.classes.iter().any(|c| c == class) {
            node.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&self, class: &str) {
        self.node.borrow_mut().classes.retain(|c| c != class);
    }

    /// Add or remove `class` depending on `on`.
    pub fn toggle_class(&self, class: &str, on: bool) {
        if on {
            self.add_class(class);
        } else {
            self.remove_class(class);
        }
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<String> {
        self.node.borrow().attrs.get(name).cloned()
    }

    pub fn set_attr(&self, name: impl Into<String>, value: impl Into<String>) {
        self.node
            .borrow_mut()
            .attrs
            .insert(name.into(), value.into());
    }

    pub fn remove_attr(&self, name: &str) {
        self.node.borrow_mut().attrs.remove(name);
    }

    /// Form value (the `value` attribute), empty when unset.
    #[must_use]
    pub fn value(&self) -> String {
        self.attr("value").unwrap_or_default()
    }

    pub fn set_value(&self, value: impl Into<String>) {
        self.set_attr("value", value);
    }

    #[must_use]
    pub fn state(&self) -> ElementState {
        self.node.borrow().state
    }

    pub fn set_state(&self, flag: ElementState, on: bool) {
        self.node.borrow_mut().state.set(flag, on);
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.state().contains(ElementState::DISABLED)
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.set_state(ElementState::DISABLED, disabled);
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.state().contains(ElementState::HIDDEN)
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.set_state(ElementState::HIDDEN, hidden);
    }

    /// Own text, excluding descendants.
    #[must_use]
    pub fn text(&self) -> String {
        self.node.borrow().text.clone()
    }

    /// Concatenated text of this node and all descendants, depth first.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = self.text();
        for child in self.children() {
            out.push_str(&child.text_content());
        }
        out
    }

    /// Replace this node's content with `text` (children are removed).
    pub fn set_text(&self, text: impl Into<String>) {
        self.clear();
        self.node.borrow_mut().text = text.into();
    }

    // --- Tree ---

    #[must_use]
    pub fn parent(&self) -> Option<Element> {
        self.node.borrow().parent.upgrade().map(|node| Element { node })
    }

    #[must_use]
    pub fn children(&self) -> Vec<Element> {
        self.node.borrow().children.clone()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.node.borrow().children.len()
    }

    /// Whether `other` is this node or one of its descendants.
    #[must_use]
    pub fn contains(&self, other: &Element) -> bool {
        let mut cursor = Some(other.clone());
        while let Some(node) = cursor {
            if node.ptr_eq(self) {
                return true;
            }
            cursor = node.parent();
        }
        false
    }

    /// Append `child` as the last child, detaching it from any previous
    /// parent.
    pub fn append(&self, child: &Element) {
        if child.contains(self) {
            return;
        }
        child.detach();
        child.node.borrow_mut().parent = Rc::downgrade(&self.node);
        self.node.borrow_mut().children.push(child.clone());
    }

    /// Remove `child` if it is a direct child. Returns whether it was.
    pub fn remove_child(&self, child: &Element) -> bool {
        let removed = {
            let mut node = self.node.borrow_mut();
            let before = node.children.len();
            node.children.retain(|c| !c.ptr_eq(child));
            before != node.children.len()
        };
        if removed {
            child.node.borrow_mut().parent = Weak::new();
        }
        removed
    }

    /// Detach from the parent, if any.
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
    }

    /// Remove all children and own text.
    pub fn clear(&self) {
        let children = std::mem::take(&mut self.node.borrow_mut().children);
        for child in children {
            child.node.borrow_mut().parent = Weak::new();
        }
        self.node.borrow_mut().text.clear();
    }

    /// Replace all content with `children`.
    pub fn set_children(&self, children: impl IntoIterator<Item = Element>) {
        self.clear();
        for child in children {
            self.append(&child);
        }
    }

    /// Descendants in document order (excluding `self`).
    #[must_use]
    pub fn descendants(&self) -> Vec<Element> {
        let mut out = Vec::new();
        let mut stack: Vec<Element> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            out.push(node);
        }
        out
    }

    /// First descendant matching `selector`.
    #[must_use]
    pub fn select(&self, selector: &Selector) -> Option<Element> {
        self.descendants()
            .into_iter()
            .find(|el| selector.matches_in(el, self))
    }

    /// All descendants matching `selector`, in document order.
    #[must_use]
    pub fn select_all(&self, selector: &Selector) -> Vec<Element> {
        self.descendants()
            .into_iter()
            .filter(|el| selector.matches_in(el, self))
            .collect()
    }

    /// First descendant matching the selector string. Invalid selectors
    /// match nothing.
    #[must_use]
    pub fn query(&self, selector: &str) -> Option<Element> {
        Selector::parse(selector)
            .ok()
            .and_then(|sel| self.select(&sel))
    }

    /// All descendants matching the selector string.
    #[must_use]
    pub fn query_all(&self, selector: &str) -> Vec<Element> {
        Selector::parse(selector)
            .map(|sel| self.select_all(&sel))
            .unwrap_or_default()
    }

    /// Nearest node from `self` upwards that matches `selector`, stopping
    /// below `scope`. `scope` itself is never returned.
    #[must_use]
    pub fn closest_within(&self, selector: &Selector, scope: &Element) -> Option<Element> {
        let mut cursor = Some(self.clone());
        while let Some(node) = cursor {
            if node.ptr_eq(scope) {
                return None;
            }
            if selector.matches_in(&node, scope) {
                return Some(node);
            }
            cursor = node.parent();
        }
        None
    }

    // --- Listeners ---

    /// Register a listener for `event`. It stays active until the returned
    /// handle is dropped.
    #[must_use = "dropping the handle removes the listener"]
    pub fn add_listener(
        &self,
        event: impl Into<String>,
        phase: Phase,
        rank: u64,
        callback: impl Fn(&Event, &Element) + 'static,
    ) -> ListenerHandle {
        let id = ListenerId::next();
        self.node.borrow_mut().listeners.push(Listener {
            id,
            event: event.into(),
            phase,
            rank,
            callback: Rc::new(callback),
        });
        ListenerHandle {
            node: Rc::downgrade(&self.node),
            id,
        }
    }

    /// Number of listeners attached to this node.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.node.borrow().listeners.len()
    }

    fn remove_listener(&self, id: ListenerId) {
        self.node.borrow_mut().listeners.retain(|l| l.id != id);
    }

    /// Dispatch `event` at this node and bubble to the root.
    ///
    /// Returns the number of listeners invoked.
    pub fn dispatch_event(&self, event: &Event) -> usize {
        event.ensure_target(self);
        let mut invoked = 0;
        let mut cursor = Some(self.clone());
        while let Some(node) = cursor {
            let mut matching: Vec<(Phase, u64, ListenerId, Rc<ListenerFn>)> = node
                .node
                .borrow()
                .listeners
                .iter()
                .filter(|l| l.event == event.name())
                .map(|l| (l.phase, l.rank, l.id, Rc::clone(&l.callback)))
                .collect();
            matching.sort_by_key(|(phase, rank, id, _)| (*phase, *rank, *id));
            for (_, _, _, callback) in matching {
                callback(event, &node);
                invoked += 1;
            }
            if event.is_propagation_stopped() {
                break;
            }
            cursor = node.parent();
        }
        invoked
    }

    /// Serialize the subtree as markup, for tests and debugging.
    #[must_use]
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let node = self.node.borrow();
        out.push('<');
        out.push_str(&node.tag);
        if let Some(id) = &node.id {
            out.push_str(&format!(" id=\"{id}\""));
        }
        if !node.classes.is_empty() {
            out.push_str(&format!(" class=\"{}\"", node.classes.join(" ")));
        }
        for (k, v) in &node.attrs {
            out.push_str(&format!(" {k}=\"{v}\""));
        }
        if node.state.contains(ElementState::DISABLED) {
            out.push_str(" disabled");
        }
        if node.state.contains(ElementState::HIDDEN) {
            out.push_str(" hidden");
        }
        out.push('>');
        out.push_str(&node.text);
        for child in &node.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(&node.tag);
        out.push('>');
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node.borrow();
        let mut s = String::from(node.tag.as_str());
        if let Some(id) = &node.id {
            s.push('#');
            s.push_str(id);
        }
        for class in &node.classes {
            s.push('.');
            s.push_str(class);
        }
        write!(f, "Element({s})")
    }
}

/// RAII guard for an element listener.
pub struct ListenerHandle {
    node: Weak<RefCell<NodeData>>,
    id: ListenerId,
}

impl ListenerHandle {
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Whether the listener's element is still alive.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.node
            .upgrade()
            .is_some_and(|n| n.borrow().listeners.iter().any(|l| l.id == self.id))
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(node) = self.node.upgrade() {
            Element { node }.remove_listener(self.id);
        }
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("id", &self.id)
            .field("attached", &self.is_attached())
            .finish()
    }
}
