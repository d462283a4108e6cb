//! Override-with-fallback composition of capabilities.
//!
//! An [`ExtendedCapability`] wraps a base capability plus a stack of
//! [`OverrideTable`] layers. Constructing it constructs the base behavior
//! first, then answers calls by searching the layers top-down before falling
//! back to the base. Calls made from inside an override through
//! [`Dispatch::call`] start again at the top layer, so an override always sees
//! the most-derived version of its siblings; [`Dispatch::call_parent`] reaches
//! the implementation below the current layer.
//!
//! Extending an extended capability flattens into one base with one more
//! layer. Parent definitions are never modified.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::dom::Element;
use crate::error::{PluginError, Result};

use super::capability::{Behavior, Capability, PluginContext};
use super::types::Options;

static MEMBER_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Member names that cannot be overridden.
const RESERVED_MEMBERS: &[&str] = &["constructor"];

/// A single override entry.
pub type OverrideFn = Rc<dyn Fn(&mut Dispatch<'_>, &Value) -> Result<Value>>;

/// Named replacement members layered over a parent behavior.
#[derive(Clone, Default)]
pub struct OverrideTable {
    methods: BTreeMap<String, OverrideFn>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the override for `name`.
    pub fn method<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&mut Dispatch<'_>, &Value) -> Result<Value> + 'static,
    {
        self.methods.insert(name.to_string(), Rc::new(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<&OverrideFn> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Every member must be an identifier and not reserved.
    pub fn validate(&self) -> Result<()> {
        for name in self.methods.keys() {
            if !MEMBER_NAME_RE.is_match(name) {
                return Err(PluginError::InvalidCapability(format!(
                    "override member '{}' is not a valid method name",
                    name
                )));
            }
            if RESERVED_MEMBERS.contains(&name.as_str()) {
                return Err(PluginError::InvalidCapability(format!(
                    "override member '{}' is reserved",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for OverrideTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.methods.keys()).finish()
    }
}

/// The view an override gets of the instance it runs on.
pub struct Dispatch<'a> {
    base: &'a mut dyn Behavior,
    layers: &'a [Rc<OverrideTable>],
    depth: usize,
}

impl<'a> Dispatch<'a> {
    pub fn context(&self) -> &PluginContext {
        self.base.context()
    }

    pub fn element(&self) -> Result<Element> {
        self.base.context().element()
    }

    pub fn options(&self) -> &Options {
        self.base.context().options()
    }

    pub fn name(&self) -> &str {
        self.base.context().name()
    }

    /// Call `method` on the most-derived implementation.
    pub fn call(&mut self, method: &str, args: &Value) -> Result<Value> {
        let top = self.layers.len();
        self.dispatch_below(top, method, args)
    }

    /// Call the implementation of `method` below the current override layer.
    pub fn call_parent(&mut self, method: &str, args: &Value) -> Result<Value> {
        let depth = self.depth;
        self.dispatch_below(depth, method, args)
    }

    /// Downcast the base behavior.
    pub fn base<T: 'static>(&self) -> Option<&T> {
        self.base.as_any().downcast_ref::<T>()
    }

    fn dispatch_below(&mut self, top: usize, method: &str, args: &Value) -> Result<Value> {
        let layers = self.layers;
        for depth in (0..top).rev() {
            if let Some(f) = layers[depth].get(method) {
                let f = Rc::clone(f);
                let mut scope = Dispatch {
                    base: &mut *self.base,
                    layers,
                    depth,
                };
                return f(&mut scope, args);
            }
        }
        self.base.call(method, args)
    }
}

/// Capability derived from a base capability plus override layers.
pub struct ExtendedCapability {
    base: Rc<dyn Capability>,
    layers: Rc<Vec<Rc<OverrideTable>>>,
}

impl ExtendedCapability {
    /// Layer `overrides` over `parent`. The parent is left untouched.
    pub fn new(parent: Rc<dyn Capability>, overrides: OverrideTable) -> Self {
        let overrides = Rc::new(overrides);
        match parent.as_any().downcast_ref::<ExtendedCapability>() {
            Some(extended) => {
                let mut layers = extended.layers.as_ref().clone();
                layers.push(overrides);
                Self {
                    base: Rc::clone(&extended.base),
                    layers: Rc::new(layers),
                }
            }
            None => Self {
                base: parent,
                layers: Rc::new(vec![overrides]),
            },
        }
    }

    /// Number of override layers over the base.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn base(&self) -> &Rc<dyn Capability> {
        &self.base
    }
}

impl Capability for ExtendedCapability {
    fn kind(&self) -> &str {
        self.base.kind()
    }

    fn default_options(&self) -> Options {
        self.base.default_options()
    }

    fn validate(&self) -> Result<()> {
        self.base.validate()?;
        self.layers.iter().try_for_each(|layer| layer.validate())
    }

    fn instantiate(&self, context: PluginContext) -> Result<Box<dyn Behavior>> {
        let base = self.base.instantiate(context)?;
        Ok(Box::new(ExtendedBehavior {
            base,
            layers: Rc::clone(&self.layers),
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct ExtendedBehavior {
    base: Box<dyn Behavior>,
    layers: Rc<Vec<Rc<OverrideTable>>>,
}

impl Behavior for ExtendedBehavior {
    fn context(&self) -> &PluginContext {
        self.base.context()
    }

    fn responds_to(&self, method: &str) -> bool {
        self.layers.iter().any(|layer| layer.contains(method)) || self.base.responds_to(method)
    }

    fn call(&mut self, method: &str, args: &Value) -> Result<Value> {
        let layers = Rc::clone(&self.layers);
        let mut scope = Dispatch {
            base: self.base.as_mut(),
            layers: layers.as_slice(),
            depth: layers.len(),
        };
        scope.call(method, args)
    }

    fn as_any(&self) -> &dyn Any {
        self.base.as_any()
    }
}
