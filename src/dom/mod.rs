//! Document tree that plugin targets are resolved against.
//!
//! - **element**: reference-counted element handles with identity equality
//! - **selector**: the selector engine behind string targets
//!
//! Documents are usually built from a JSON [`ElementSpec`] tree:
//!
//! ```json
//! {
//!   "tag": "html",
//!   "children": [
//!     { "tag": "body", "children": [
//!       { "tag": "span", "class": "tip", "attributes": { "title": "Hello" } }
//!     ]}
//!   ]
//! }
//! ```

pub mod element;
pub mod selector;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, Result};

pub use element::{Element, WeakElement};
pub use selector::Selector;

/// Serializable description of an element subtree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Space separated class list.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    /// Materialize this spec into a detached element subtree.
    pub fn build(&self) -> Element {
        let el = Element::new(&self.tag).with_class(&self.class);
        for (name, value) in &self.attributes {
            el.set_attribute(name, value);
        }
        if let Some(id) = &self.id {
            el.set_attribute("id", id);
        }
        for child in &self.children {
            el.append_child(&child.build());
        }
        el
    }
}

/// A rendered document: a root element plus query helpers.
#[derive(Debug, Clone)]
pub struct Document {
    root: Element,
}

impl Document {
    /// An empty `<html><body></body></html>` document.
    pub fn new() -> Self {
        let root = Element::new("html");
        root.append_child(&Element::new("body"));
        Self { root }
    }

    /// Wrap an existing element as the document root.
    pub fn from_root(root: Element) -> Self {
        Self { root }
    }

    pub fn from_spec(spec: &ElementSpec) -> Self {
        Self::from_root(spec.build())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let spec: ElementSpec = serde_json::from_str(json)?;
        Ok(Self::from_spec(&spec))
    }

    /// Load a document from a JSON `ElementSpec` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PluginError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// The document element (`<html>` for documents built with [`Document::new`]).
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The first `<body>` element, if any.
    pub fn body(&self) -> Option<Element> {
        self.root
            .descendants_inclusive()
            .into_iter()
            .find(|el| el.tag() == "body")
    }

    /// All elements in document order.
    pub fn elements(&self) -> Vec<Element> {
        self.root.descendants_inclusive()
    }

    /// All elements matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>> {
        let selector = Selector::parse(selector)?;
        Ok(self.select(&selector))
    }

    /// First element matching `selector`.
    pub fn query_selector(&self, selector: &str) -> Result<Option<Element>> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .root
            .descendants_inclusive()
            .into_iter()
            .find(|el| selector.matches(el)))
    }

    /// All elements matching an already parsed selector.
    pub fn select(&self, selector: &Selector) -> Vec<Element> {
        self.root
            .descendants_inclusive()
            .into_iter()
            .filter(|el| selector.matches(el))
            .collect()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SHOP: &str = r#"{
        "tag": "html",
        "children": [
            { "tag": "body", "children": [
                { "tag": "nav", "id": "main-nav", "class": "nav", "children": [
                    { "tag": "a", "class": "nav-link tip", "attributes": { "title": "Home" } },
                    { "tag": "a", "class": "nav-link tip", "attributes": { "title": "Cart" } }
                ]},
                { "tag": "span", "class": "tip" }
            ]}
        ]
    }"#;

    #[test]
    fn test_new_document_has_body() {
        let doc = Document::new();
        assert_eq!(doc.root().tag(), "html");
        assert!(doc.body().is_some());
    }

    #[test]
    fn test_from_json_builds_tree() {
        let doc = Document::from_json_str(SHOP).unwrap();
        assert_eq!(doc.elements().len(), 6);
        let nav = doc.query_selector("#main-nav").unwrap().unwrap();
        assert!(nav.has_class("nav"));
        assert_eq!(nav.children().len(), 2);
    }

    #[test]
    fn test_query_selector_all_document_order() {
        let doc = Document::from_json_str(SHOP).unwrap();
        let tips = doc.query_selector_all(".tip").unwrap();
        assert_eq!(tips.len(), 3);
        assert_eq!(tips[0].attribute("title").as_deref(), Some("Home"));
        assert_eq!(tips[1].attribute("title").as_deref(), Some("Cart"));
        assert_eq!(tips[2].tag(), "span");
    }

    #[test]
    fn test_query_selector_invalid() {
        let doc = Document::new();
        assert!(doc.query_selector_all("..").is_err());
    }

    #[test]
    fn test_from_json_malformed() {
        let err = Document::from_json_str("{\"children\": []}").unwrap_err();
        assert!(matches!(err, PluginError::Json(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SHOP.as_bytes()).unwrap();
        let doc = Document::load(file.path()).unwrap();
        assert_eq!(doc.query_selector_all("a").unwrap().len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Document::load(Path::new("/nonexistent/doc.json")).unwrap_err();
        assert!(matches!(err, PluginError::Config(_)));
    }

    #[test]
    fn test_spec_roundtrip_keeps_structure() {
        let doc = Document::from_json_str(SHOP).unwrap();
        let spec: ElementSpec = serde_json::from_str(SHOP).unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        let again = Document::from_json_str(&json).unwrap();
        assert_eq!(doc.elements().len(), again.elements().len());
    }
}
