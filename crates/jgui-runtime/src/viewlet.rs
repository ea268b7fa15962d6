#![forbid(unsafe_code)]

//! Viewlets: named view fragments bound to model attributes.
//!
//! A [`Viewlet`] pairs a template (model → element fragment) with a list of
//! attribute bindings. A binding names a dotted attribute path and a
//! selector for the node inside the fragment that displays it. A viewlet
//! may instead (or additionally) derive one value from the model through
//! `rebind`, typically a related collection, and render it with `update`.
//!
//! [`ViewletRegistry`] is the ordered, name-keyed catalog the binding
//! engine is fed from. Registering a name twice replaces the earlier entry
//! in place.

use std::fmt;
use std::rc::Rc;

use jgui_core::{ComposeError, Element, Selector};

use crate::model::{Model, Value};

pub type TemplateFn = dyn Fn(&Model) -> Element;
pub type RebindFn = dyn Fn(&Model) -> Value;
pub type UpdateFn = dyn Fn(&Value, &Element);

/// One attribute → node binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Dotted attribute path.
    pub path: String,
    /// Selector of the node inside the fragment.
    pub target: String,
}

/// A named view fragment.
#[derive(Clone)]
pub struct Viewlet {
    name: String,
    template: Rc<TemplateFn>,
    bindings: Vec<Binding>,
    rebind: Option<Rc<RebindFn>>,
    update: Option<Rc<UpdateFn>>,
}

impl Viewlet {
    pub fn new(name: impl Into<String>, template: impl Fn(&Model) -> Element + 'static) -> Self {
        Self {
            name: name.into(),
            template: Rc::new(template),
            bindings: Vec::new(),
            rebind: None,
            update: None,
        }
    }

    /// Bind attribute `path` to the node matching `target`.
    #[must_use]
    pub fn bind(mut self, path: impl Into<String>, target: impl Into<String>) -> Self {
        self.bindings.push(Binding {
            path: path.into(),
            target: target.into(),
        });
        self
    }

    /// Derive a value (usually a related collection) from the model.
    #[must_use]
    pub fn with_rebind(mut self, rebind: impl Fn(&Model) -> Value + 'static) -> Self {
        self.rebind = Some(Rc::new(rebind));
        self
    }

    /// Custom update. Receives the bound node for attribute bindings and the
    /// fragment root for derived values.
    #[must_use]
    pub fn with_update(mut self, update: impl Fn(&Value, &Element) + 'static) -> Self {
        self.update = Some(Rc::new(update));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    #[must_use]
    pub fn has_rebind(&self) -> bool {
        self.rebind.is_some()
    }

    /// Render a fresh fragment.
    #[must_use]
    pub fn render(&self, model: &Model) -> Element {
        (self.template)(model)
    }

    /// Run `rebind`, if any.
    #[must_use]
    pub fn derive(&self, model: &Model) -> Option<Value> {
        self.rebind.as_ref().map(|rebind| rebind(model))
    }

    /// Write `value` into `node` with the custom update or, by default, as
    /// the node's text.
    pub fn apply(&self, value: &Value, node: &Element) {
        match &self.update {
            Some(update) => update(value, node),
            None => node.set_text(value.to_string()),
        }
    }

    pub(crate) fn updater(&self) -> Rc<UpdateFn> {
        match &self.update {
            Some(update) => Rc::clone(update),
            None => {
                let text: Rc<UpdateFn> =
                    Rc::new(|value: &Value, node: &Element| node.set_text(value.to_string()));
                text
            }
        }
    }

    pub(crate) fn rebind_fn(&self) -> Option<Rc<RebindFn>> {
        self.rebind.clone()
    }

    pub(crate) fn template_fn(&self) -> Rc<TemplateFn> {
        Rc::clone(&self.template)
    }

    /// Check the descriptor.
    ///
    /// # Errors
    ///
    /// `Configuration` for an empty name, an empty binding path or a target
    /// selector that does not parse.
    pub fn validate(&self) -> Result<(), ComposeError> {
        if self.name.trim().is_empty() {
            return Err(ComposeError::configuration("<viewlet>", "empty viewlet name"));
        }
        for binding in &self.bindings {
            if binding.path.is_empty() || binding.path.split('.').any(str::is_empty) {
                return Err(ComposeError::configuration(
                    &self.name,
                    format!("invalid binding path '{}'", binding.path),
                ));
            }
            Selector::parse(&binding.target)
                .map_err(|e| ComposeError::configuration(&self.name, e.to_string()))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Viewlet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewlet")
            .field("name", &self.name)
            .field("bindings", &self.bindings)
            .field("rebind", &self.rebind.is_some())
            .field("update", &self.update.is_some())
            .finish()
    }
}

/// Ordered catalog of viewlets.
#[derive(Debug, Clone, Default)]
pub struct ViewletRegistry {
    viewlets: Vec<Viewlet>,
}

impl ViewletRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a viewlet. Returns the replaced entry.
    ///
    /// # Errors
    ///
    /// `Configuration` when the viewlet does not validate; the registry is
    /// left unchanged.
    pub fn register(&mut self, viewlet: Viewlet) -> Result<Option<Viewlet>, ComposeError> {
        viewlet.validate()?;
        match self.viewlets.iter_mut().find(|v| v.name == viewlet.name) {
            Some(slot) => Ok(Some(std::mem::replace(slot, viewlet))),
            None => {
                self.viewlets.push(viewlet);
                Ok(None)
            }
        }
    }

    /// Register every viewlet, collecting rejections instead of stopping.
    pub fn merge(&mut self, viewlets: impl IntoIterator<Item = Viewlet>) -> Vec<ComposeError> {
        viewlets
            .into_iter()
            .filter_map(|v| self.register(v).err())
            .collect()
    }

    /// # Errors
    ///
    /// `NotFound` for unknown names.
    pub fn get(&self, name: &str) -> Result<&Viewlet, ComposeError> {
        self.viewlets
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| ComposeError::viewlet_not_found(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<Viewlet> {
        let pos = self.viewlets.iter().position(|v| v.name == name)?;
        Some(self.viewlets.remove(pos))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.viewlets.iter().any(|v| v.name == name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.viewlets.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Viewlet> {
        self.viewlets.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.viewlets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.viewlets.is_empty()
    }
}

impl IntoIterator for ViewletRegistry {
    type Item = Viewlet;
    type IntoIter = std::vec::IntoIter<Viewlet>;

    fn into_iter(self) -> Self::IntoIter {
        self.viewlets.into_iter()
    }
}
