#![forbid(unsafe_code)]

//! Observable domain models.
//!
//! A [`Model`] is a bag of named attributes holding [`Value`]s. Nested maps
//! are addressed with dotted paths (`aggregated_status.running`). Every
//! committed mutation emits a [`Change`] for the path that was written,
//! followed by one `update` notification per committed batch.
//!
//! A [`ModelList`] is an observable, ordered collection of models with
//! reference identity. It is the value type of derived collections (a
//! service's units).
//!
//! # Invariants
//!
//! 1. Writing a value equal to the current one emits nothing.
//! 2. Inside [`Model::batch`], values change immediately but notifications
//!    are deferred until the outermost batch returns; repeated writes to one
//!    path coalesce to the last value.
//! 3. `ModelList::version()` increases on every mutation, so an in-place
//!    change is observable even when the list identity is unchanged.
//! 4. Two `ModelList` values are equal only if they are the same list.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::reactive::{SubscriberList, Subscription};

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Models(ModelList),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_models(&self) -> Option<&ModelList> {
        match self {
            Self::Models(list) => Some(list),
            _ => None,
        }
    }

    /// Walk nested maps along `segments`.
    #[must_use]
    pub fn lookup<'a>(&self, mut segments: impl Iterator<Item = &'a str>) -> Option<&Value> {
        match segments.next() {
            None => Some(self),
            Some(seg) => self.as_map()?.get(seg)?.lookup(segments),
        }
    }

    /// Convert a JSON document.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        use serde_json::Value as J;
        match json {
            J::Null => Self::Null,
            J::Bool(b) => Self::Bool(*b),
            J::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            J::String(s) => Self::Str(s.clone()),
            J::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            J::Object(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    /// Text form used when a value is rendered into an element.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Self::Models(list) => write!(f, "{}", list.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

impl From<ModelList> for Value {
    fn from(list: ModelList) -> Self {
        Self::Models(list)
    }
}

/// One committed attribute write.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Dotted path that was written.
    pub path: String,
    /// The value now stored at `path`.
    pub value: Value,
}

/// Paths committed by one batch, in first-write order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Update {
    pub paths: Vec<String>,
}

struct ModelInner {
    id: String,
    attrs: RefCell<BTreeMap<String, Value>>,
    batch_depth: Cell<u32>,
    pending: RefCell<Vec<Change>>,
    changes: SubscriberList<Change>,
    updates: SubscriberList<Update>,
}

/// A shared, observable attribute bag.
#[derive(Clone)]
pub struct Model {
    inner: Rc<ModelInner>,
}

impl Model {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(ModelInner {
                id: id.into(),
                attrs: RefCell::new(BTreeMap::new()),
                batch_depth: Cell::new(0),
                pending: RefCell::new(Vec::new()),
                changes: SubscriberList::new(),
                updates: SubscriberList::new(),
            }),
        }
    }

    /// Builder-style initial attribute; emits nothing.
    #[must_use]
    pub fn with(self, path: &str, value: impl Into<Value>) -> Self {
        write_path(&mut self.inner.attrs.borrow_mut(), path, value.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Model) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Value at a dotted path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        let attrs = self.inner.attrs.borrow();
        let mut segments = path.split('.');
        let first = segments.next()?;
        attrs.get(first)?.lookup(segments).cloned()
    }

    /// Text at `path`, if it holds a string.
    #[must_use]
    pub fn get_str(&self, path: &str) -> Option<String> {
        self.get(path).and_then(|v| v.as_str().map(str::to_string))
    }

    /// Integer at `path` (numeric strings included).
    #[must_use]
    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(|v| v.as_i64())
    }

    #[must_use]
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(|v| v.as_bool())
    }

    /// Derived collection stored at `path`.
    #[must_use]
    pub fn get_models(&self, path: &str) -> Option<ModelList> {
        self.get(path).and_then(|v| v.as_models().cloned())
    }

    /// Snapshot of the top-level attributes.
    #[must_use]
    pub fn attrs(&self) -> BTreeMap<String, Value> {
        self.inner.attrs.borrow().clone()
    }

    /// Write `value` at a dotted path, creating intermediate maps.
    ///
    /// Returns `false` when the value was already equal (nothing emitted).
    pub fn set(&self, path: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        if self.get(path).as_ref() == Some(&value) {
            return false;
        }
        write_path(&mut self.inner.attrs.borrow_mut(), path, value.clone());
        let change = Change {
            path: path.to_string(),
            value,
        };
        if self.inner.batch_depth.get() > 0 {
            self.inner.pending.borrow_mut().push(change);
        } else {
            let paths = vec![change.path.clone()];
            self.inner.changes.notify(&change);
            self.inner.updates.notify(&Update { paths });
        }
        true
    }

    /// Run `f` with notifications deferred until the outermost batch ends.
    pub fn batch<R>(&self, f: impl FnOnce(&Model) -> R) -> R {
        self.inner.batch_depth.set(self.inner.batch_depth.get() + 1);
        let out = f(self);
        let depth = self.inner.batch_depth.get() - 1;
        self.inner.batch_depth.set(depth);
        if depth == 0 {
            self.flush();
        }
        out
    }

    fn flush(&self) {
        let pending = std::mem::take(&mut *self.inner.pending.borrow_mut());
        if pending.is_empty() {
            return;
        }
        let mut order: Vec<String> = Vec::new();
        let mut last: BTreeMap<String, Value> = BTreeMap::new();
        for change in pending {
            if !last.contains_key(&change.path) {
                order.push(change.path.clone());
            }
            last.insert(change.path, change.value);
        }
        for path in &order {
            if let Some(value) = last.remove(path) {
                self.inner.changes.notify(&Change {
                    path: path.clone(),
                    value,
                });
            }
        }
        self.inner.updates.notify(&Update { paths: order });
    }

    /// Subscribe to per-path change notifications.
    pub fn on_change(&self, callback: impl Fn(&Change) + 'static) -> Subscription {
        self.inner.changes.subscribe(callback)
    }

    /// Subscribe to the post-batch `update` notification.
    pub fn on_update(&self, callback: impl Fn(&Update) + 'static) -> Subscription {
        self.inner.updates.subscribe(callback)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.changes.len() + self.inner.updates.len()
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.inner.id)
            .field("attrs", &self.inner.attrs.borrow().len())
            .finish()
    }
}

fn write_path(attrs: &mut BTreeMap<String, Value>, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };
    let mut map = attrs;
    for seg in segments {
        let slot = map
            .entry(seg.to_string())
            .or_insert_with(|| Value::Map(BTreeMap::new()));
        if !matches!(slot, Value::Map(_)) {
            *slot = Value::Map(BTreeMap::new());
        }
        let Value::Map(next) = slot else {
            return;
        };
        map = next;
    }
    map.insert(leaf.to_string(), value);
}

/// What happened to a [`ModelList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange {
    /// Ids of appended models.
    Added(Vec<String>),
    /// Ids of removed models.
    Removed(Vec<String>),
    /// Contents replaced wholesale.
    Reset,
}

struct ListInner {
    items: RefCell<Vec<Model>>,
    version: Cell<u64>,
    changes: SubscriberList<ListChange>,
}

/// An observable, ordered collection of models.
#[derive(Clone)]
pub struct ModelList {
    inner: Rc<ListInner>,
}

impl Default for ModelList {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelList {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ListInner {
                items: RefCell::new(Vec::new()),
                version: Cell::new(0),
                changes: SubscriberList::new(),
            }),
        }
    }

    #[must_use]
    pub fn from_models(models: impl IntoIterator<Item = Model>) -> Self {
        let list = Self::new();
        list.inner.items.borrow_mut().extend(models);
        list
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &ModelList) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    /// Mutation counter.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Model> {
        self.inner.items.borrow().clone()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.inner
            .items
            .borrow()
            .iter()
            .map(|m| m.id().to_string())
            .collect()
    }

    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<Model> {
        self.inner
            .items
            .borrow()
            .iter()
            .find(|m| m.id() == id)
            .cloned()
    }

    #[must_use]
    pub fn filter(&self, predicate: impl Fn(&Model) -> bool) -> Vec<Model> {
        self.inner
            .items
            .borrow()
            .iter()
            .filter(|m| predicate(m))
            .cloned()
            .collect()
    }

    pub fn add(&self, model: Model) {
        self.add_all([model]);
    }

    /// Append models; one notification for the whole group.
    pub fn add_all(&self, models: impl IntoIterator<Item = Model>) {
        let added: Vec<Model> = models.into_iter().collect();
        if added.is_empty() {
            return;
        }
        let ids = added.iter().map(|m| m.id().to_string()).collect();
        self.inner.items.borrow_mut().extend(added);
        self.commit(ListChange::Added(ids));
    }

    /// Remove one model by identity.
    pub fn remove(&self, model: &Model) -> bool {
        self.remove_all(std::slice::from_ref(model)) == 1
    }

    /// Remove every listed model present in the collection.
    pub fn remove_all(&self, models: &[Model]) -> usize {
        let removed: Vec<String> = {
            let mut items = self.inner.items.borrow_mut();
            let mut removed = Vec::new();
            items.retain(|m| {
                let hit = models.iter().any(|r| r.ptr_eq(m));
                if hit {
                    removed.push(m.id().to_string());
                }
                !hit
            });
            removed
        };
        let count = removed.len();
        if count > 0 {
            self.commit(ListChange::Removed(removed));
        }
        count
    }

    /// Remove by id; returns the removed model.
    pub fn remove_by_id(&self, id: &str) -> Option<Model> {
        let model = self.get_by_id(id)?;
        self.remove(&model);
        Some(model)
    }

    /// Replace the contents.
    pub fn reset(&self, models: impl IntoIterator<Item = Model>) {
        *self.inner.items.borrow_mut() = models.into_iter().collect();
        self.commit(ListChange::Reset);
    }

    fn commit(&self, change: ListChange) {
        self.inner.version.set(self.inner.version.get() + 1);
        self.inner.changes.notify(&change);
    }

    pub fn on_change(&self, callback: impl Fn(&ListChange) + 'static) -> Subscription {
        self.inner.changes.subscribe(callback)
    }
}

impl PartialEq for ModelList {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ModelList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelList")
            .field("ids", &self.ids())
            .field("version", &self.version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> Model {
        Model::new("wordpress")
            .with("displayName", "wordpress")
            .with("unit_count", 2)
            .with("aggregated_status.running", 2)
            .with("aggregated_status.error", 0)
    }

    #[test]
    fn dotted_get_and_set() {
        let m = service();
        assert_eq!(m.get_i64("aggregated_status.running"), Some(2));
        assert!(m.get("aggregated_status.missing").is_none());
        assert!(m.set("aggregated_status.error", 1));
        assert_eq!(m.get_i64("aggregated_status.error"), Some(1));
        assert_eq!(m.get_i64("aggregated_status.running"), Some(2));
    }

    #[test]
    fn set_replaces_scalar_parent_with_map() {
        let m = Model::new("x").with("a", 1);
        m.set("a.b", "deep");
        assert_eq!(m.get_str("a.b").as_deref(), Some("deep"));
    }

    #[test]
    fn equal_write_emits_nothing() {
        let m = service();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = m.on_change(move |_| h.set(h.get() + 1));
        assert!(!m.set("unit_count", 2));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn change_then_update() {
        let m = service();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let _c = m.on_change(move |c| l.borrow_mut().push(format!("change {}", c.path)));
        let l = Rc::clone(&log);
        let _u = m.on_update(move |u| l.borrow_mut().push(format!("update {}", u.paths.len())));
        m.set("unit_count", 5);
        assert_eq!(*log.borrow(), vec!["change unit_count", "update 1"]);
    }

    #[test]
    fn batch_defers_and_coalesces() {
        let m = service();
        let changes = Rc::new(RefCell::new(Vec::new()));
        let updates = Rc::new(Cell::new(0));
        let c = Rc::clone(&changes);
        let _c = m.on_change(move |ch| c.borrow_mut().push((ch.path.clone(), ch.value.clone())));
        let u = Rc::clone(&updates);
        let _u = m.on_update(move |_| u.set(u.get() + 1));

        m.batch(|m| {
            m.set("unit_count", 3);
            m.set("exposed", true);
            m.batch(|m| {
                m.set("unit_count", 4);
            });
            assert!(changes.borrow().is_empty(), "deferred inside batch");
            assert_eq!(m.get_i64("unit_count"), Some(4), "values apply immediately");
        });

        assert_eq!(
            *changes.borrow(),
            vec![
                ("unit_count".to_string(), Value::Int(4)),
                ("exposed".to_string(), Value::Bool(true)),
            ]
        );
        assert_eq!(updates.get(), 1);
    }

    #[test]
    fn list_add_remove_filter() {
        let units = ModelList::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = units.on_change(move |c| s.borrow_mut().push(c.clone()));

        units.add_all([
            Model::new("wordpress/0").with("agent_state", "started"),
            Model::new("wordpress/1").with("agent_state", "pending"),
        ]);
        assert_eq!(units.len(), 2);
        assert_eq!(units.version(), 1);
        let pending = units.filter(|m| m.get_str("agent_state").as_deref() == Some("pending"));
        assert_eq!(pending.len(), 1);

        let removed = units.remove_by_id("wordpress/0");
        assert!(removed.is_some());
        assert!(units.get_by_id("wordpress/0").is_none());
        assert_eq!(
            *seen.borrow(),
            vec![
                ListChange::Added(vec!["wordpress/0".into(), "wordpress/1".into()]),
                ListChange::Removed(vec!["wordpress/0".into()]),
            ]
        );
    }

    #[test]
    fn list_identity_equality() {
        let a = ModelList::new();
        let b = ModelList::new();
        assert_eq!(Value::Models(a.clone()), Value::Models(a.clone()));
        assert_ne!(Value::Models(a), Value::Models(b));
    }

    #[test]
    fn value_display_and_json() {
        let json = serde_json::json!({"running": 3, "name": "wp", "tags": ["a", "b"], "ok": true});
        let v = Value::from_json(&json);
        assert_eq!(v.lookup(["running"].into_iter()), Some(&Value::Int(3)));
        assert_eq!(v.lookup(["tags"].into_iter()).map(ToString::to_string).as_deref(), Some("a, b"));
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::from("x").to_string(), "x");
    }
}
