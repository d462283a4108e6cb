//! Element handles for the document tree.
//!
//! An [`Element`] is a cheap, clonable handle around a reference-counted node.
//! Two handles are equal only when they point at the same node, so elements
//! can be used as identity keys. Children are owned by their parent; the parent
//! link is weak, so detaching a subtree drops it (and the instance maps its
//! elements carry) once the last handle goes away.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use once_cell::unsync::OnceCell;

use crate::plugins::instances::InstanceMap;

struct ElementNode {
    tag: String,
    classes: RefCell<Vec<String>>,
    attributes: RefCell<BTreeMap<String, String>>,
    children: RefCell<Vec<Element>>,
    parent: RefCell<Weak<ElementNode>>,
    /// Plugin instances attached to this element, created on first access.
    plugins: OnceCell<InstanceMap>,
}

/// Handle to a node in the document tree.
#[derive(Clone)]
pub struct Element(Rc<ElementNode>);

impl Element {
    /// Create a detached element. Tag names are stored lowercase.
    pub fn new(tag: &str) -> Self {
        Self(Rc::new(ElementNode {
            tag: tag.to_ascii_lowercase(),
            classes: RefCell::new(Vec::new()),
            attributes: RefCell::new(BTreeMap::new()),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
            plugins: OnceCell::new(),
        }))
    }

    /// Builder-style id setter.
    pub fn with_id(self, id: &str) -> Self {
        self.set_attribute("id", id);
        self
    }

    /// Builder-style class setter; accepts a space separated list.
    pub fn with_class(self, classes: &str) -> Self {
        for class in classes.split_whitespace() {
            self.add_class(class);
        }
        self
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn tag(&self) -> &str {
        &self.0.tag
    }

    pub fn id(&self) -> Option<String> {
        self.0.attributes.borrow().get("id").cloned()
    }

    pub fn classes(&self) -> Vec<String> {
        self.0.classes.borrow().clone()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.0.classes.borrow().iter().any(|c| c == class)
    }

    /// Add a class if it is not already present.
    pub fn add_class(&self, class: &str) {
        let mut classes = self.0.classes.borrow_mut();
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }

    pub fn remove_class(&self, class: &str) {
        self.0.classes.borrow_mut().retain(|c| c != class);
    }

    /// Toggle a class, returning whether it is present afterwards.
    pub fn toggle_class(&self, class: &str) -> bool {
        if self.has_class(class) {
            self.remove_class(class);
            false
        } else {
            self.add_class(class);
            true
        }
    }

    /// Read an attribute. `class` is served from the class list.
    pub fn attribute(&self, name: &str) -> Option<String> {
        if name == "class" {
            let classes = self.0.classes.borrow();
            if classes.is_empty() {
                return None;
            }
            return Some(classes.join(" "));
        }
        self.0.attributes.borrow().get(name).cloned()
    }

    /// Set an attribute. Setting `class` replaces the class list.
    pub fn set_attribute(&self, name: &str, value: &str) {
        if name == "class" {
            *self.0.classes.borrow_mut() =
                value.split_whitespace().map(str::to_string).collect();
            return;
        }
        self.0
            .attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    pub fn remove_attribute(&self, name: &str) {
        if name == "class" {
            self.0.classes.borrow_mut().clear();
            return;
        }
        self.0.attributes.borrow_mut().remove(name);
    }

    pub fn children(&self) -> Vec<Element> {
        self.0.children.borrow().clone()
    }

    pub fn parent(&self) -> Option<Element> {
        self.0.parent.borrow().upgrade().map(Element)
    }

    /// Append `child` as the last child, detaching it from any previous parent.
    pub fn append_child(&self, child: &Element) {
        child.remove();
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
    }

    /// Detach this element from its parent. No-op for detached elements.
    pub fn remove(&self) {
        let Some(parent) = self.parent() else {
            return;
        };
        parent
            .0
            .children
            .borrow_mut()
            .retain(|c| !Rc::ptr_eq(&c.0, &self.0));
        *self.0.parent.borrow_mut() = Weak::new();
    }

    /// The last child, if any.
    pub fn last_child(&self) -> Option<Element> {
        self.0.children.borrow().last().cloned()
    }

    /// This element followed by all of its descendants in document order.
    pub fn descendants_inclusive(&self) -> Vec<Element> {
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(el) = stack.pop() {
            let children = el.0.children.borrow();
            stack.extend(children.iter().rev().cloned());
            drop(children);
            out.push(el);
        }
        out
    }

    /// The element's plugin instance map, attaching an empty one on first use.
    ///
    /// Every call returns a handle to the same map.
    pub fn plugin_instances(&self) -> InstanceMap {
        self.0.plugins.get_or_init(InstanceMap::new).clone()
    }

    /// Whether an instance map has been attached yet.
    pub fn has_plugin_instances(&self) -> bool {
        self.0.plugins.get().is_some()
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// A handle that does not keep the element alive.
    pub fn downgrade(&self) -> WeakElement {
        WeakElement(Rc::downgrade(&self.0))
    }
}

/// Non-owning element handle. Plugin instances live in their element's map,
/// so they refer back to it through this.
#[derive(Clone)]
pub struct WeakElement(Weak<ElementNode>);

impl WeakElement {
    /// The element, if it is still alive.
    pub fn upgrade(&self) -> Option<Element> {
        self.0.upgrade().map(Element)
    }
}

impl fmt::Debug for WeakElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(el) => write!(f, "{:?}", el),
            None => write!(f, "<dropped>"),
        }
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
        write!(f, "{}", self.tag())?;
        if let Some(id) = self.id() {
            write!(f, "#{}", id)?;
        }
        for class in self.0.classes.borrow().iter() {
            write!(f, ".{}", class)?;
        }
        Ok(())
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_equality() {
        let a = Element::new("div");
        let b = Element::new("div");
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_tag_is_lowercased() {
        assert_eq!(Element::new("DIV").tag(), "div");
    }

    #[test]
    fn test_class_manipulation() {
        let el = Element::new("div").with_class("a b");
        el.add_class("a");
        assert_eq!(el.classes(), vec!["a", "b"]);
        assert!(!el.toggle_class("a"));
        assert!(el.toggle_class("c"));
        assert_eq!(el.attribute("class").as_deref(), Some("b c"));
        el.set_attribute("class", "x  y");
        assert_eq!(el.classes(), vec!["x", "y"]);
        el.remove_attribute("class");
        assert!(el.attribute("class").is_none());
    }

    #[test]
    fn test_append_and_remove() {
        let parent = Element::new("ul");
        let child = Element::new("li").with_id("first");
        parent.append_child(&child);
        assert_eq!(child.parent(), Some(parent.clone()));
        assert_eq!(parent.last_child(), Some(child.clone()));

        child.remove();
        assert!(child.parent().is_none());
        assert!(parent.children().is_empty());
    }

    #[test]
    fn test_append_moves_between_parents() {
        let a = Element::new("div");
        let b = Element::new("div");
        let child = Element::new("span");
        a.append_child(&child);
        b.append_child(&child);
        assert!(a.children().is_empty());
        assert_eq!(b.children(), vec![child.clone()]);
        assert_eq!(child.parent(), Some(b));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let root = Element::new("div").with_id("root");
        let a = Element::new("p").with_id("a");
        let a1 = Element::new("span").with_id("a1");
        let b = Element::new("p").with_id("b");
        root.append_child(&a);
        a.append_child(&a1);
        root.append_child(&b);

        let ids: Vec<String> = root
            .descendants_inclusive()
            .iter()
            .filter_map(Element::id)
            .collect();
        assert_eq!(ids, vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn test_instance_map_is_lazy() {
        let el = Element::new("div");
        assert!(!el.has_plugin_instances());
        let _ = el.plugin_instances();
        assert!(el.has_plugin_instances());
    }

    #[test]
    fn test_weak_handle_does_not_keep_element_alive() {
        let el = Element::new("div").with_id("panel");
        let weak = el.downgrade();
        assert_eq!(weak.upgrade(), Some(el.clone()));
        assert_eq!(format!("{:?}", weak), "div#panel");

        drop(el);
        assert!(weak.upgrade().is_none());
        assert_eq!(format!("{:?}", weak), "<dropped>");
    }

    #[test]
    fn test_detached_subtree_is_freed() {
        let parent = Element::new("ul");
        let child = Element::new("li");
        parent.append_child(&child);
        let weak = child.downgrade();
        drop(child);
        assert!(weak.upgrade().is_some());

        drop(parent);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_debug_format() {
        let el = Element::new("a").with_id("link").with_class("btn primary");
        assert_eq!(format!("{:?}", el), "a#link.btn.primary");
    }
}
