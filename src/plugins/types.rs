//! Plugin types
//!
//! Definitions stored in the registry and the target specifiers they are bound
//! to. Targets are resolved against the document at execution time, never at
//! registration time, since the elements may not exist yet.

use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::dom::{Document, Element};
use crate::error::Result;

use super::capability::Capability;

/// Arbitrarily nested plugin configuration. Always a JSON object in practice.
pub type Options = Value;

/// An empty options object.
pub fn empty_options() -> Options {
    Value::Object(Map::new())
}

/// Normalize caller-supplied options; `None` and `null` both mean "no options".
pub(crate) fn options_or_empty(options: Option<Options>) -> Options {
    match options {
        None | Some(Value::Null) => empty_options(),
        Some(options) => options,
    }
}

/// Where a plugin should be instantiated.
#[derive(Debug, Clone)]
pub enum Target {
    /// A single element.
    Element(Element),
    /// An explicit element collection, used as-is.
    Elements(Vec<Element>),
    /// Every element matching the selector at execution time.
    Selector(String),
}

impl Target {
    /// Resolve to a concrete element collection.
    ///
    /// Selector targets are matched in document order.
    pub fn resolve(&self, document: &Document) -> Result<Vec<Element>> {
        match self {
            Target::Element(el) => Ok(vec![el.clone()]),
            Target::Elements(elements) => Ok(elements.clone()),
            Target::Selector(selector) => document.query_selector_all(selector),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Element(el) => write!(f, "{}", el),
            Target::Elements(elements) => write!(f, "[{} elements]", elements.len()),
            Target::Selector(selector) => write!(f, "\"{}\"", selector),
        }
    }
}

impl From<&str> for Target {
    fn from(selector: &str) -> Self {
        Target::Selector(selector.to_string())
    }
}

impl From<String> for Target {
    fn from(selector: String) -> Self {
        Target::Selector(selector)
    }
}

impl From<Element> for Target {
    fn from(el: Element) -> Self {
        Target::Element(el)
    }
}

impl From<&Element> for Target {
    fn from(el: &Element) -> Self {
        Target::Element(el.clone())
    }
}

impl From<Vec<Element>> for Target {
    fn from(elements: Vec<Element>) -> Self {
        Target::Elements(elements)
    }
}

/// A registered plugin: its name, capability, default target and options.
#[derive(Clone)]
pub struct PluginDefinition {
    pub name: String,
    pub capability: Rc<dyn Capability>,
    pub target: Target,
    pub options: Options,
}

impl PluginDefinition {
    pub fn new(
        name: impl Into<String>,
        capability: Rc<dyn Capability>,
        target: Target,
        options: Options,
    ) -> Self {
        Self {
            name: name.into(),
            capability,
            target,
            options,
        }
    }
}

impl fmt::Debug for PluginDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDefinition")
            .field("name", &self.name)
            .field("capability", &self.capability.kind())
            .field("target", &self.target)
            .field("options", &self.options)
            .finish()
    }
}
