//! Plugin definition store
//!
//! This module provides the [`DefinitionStore`] trait and its default
//! implementation [`PluginRegistry`]. The store is a plain keyed map of plugin
//! definitions: it does not check for duplicates or missing names before
//! mutating. Those rules are enforced by the `PluginManager`, so the store can
//! be swapped for another implementation.

use std::collections::HashMap;

use crate::error::{PluginError, Result};

use super::types::PluginDefinition;

/// Key/value storage for plugin definitions.
pub trait DefinitionStore {
    /// Check whether a definition is stored under `name`.
    fn has(&self, name: &str) -> bool;

    /// Get the definition stored under `name`.
    ///
    /// # Returns
    /// The definition, or `PluginError::NotFound` if nothing is stored.
    fn get(&self, name: &str) -> Result<&PluginDefinition>;

    /// Store `definition` under `name`, replacing any previous entry.
    fn set(&mut self, name: &str, definition: PluginDefinition);

    /// Remove the entry for `name`, returning it if present.
    fn delete(&mut self, name: &str) -> Option<PluginDefinition>;

    /// All stored names. Each name appears once.
    fn keys(&self) -> Vec<String>;

    /// Number of stored definitions.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The default in-memory definition store.
///
/// Keys are reported in the order they were first stored, so bulk activation
/// runs plugins in registration order.
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
/// use storefront_plugins::behaviors::TooltipCapability;
/// use storefront_plugins::plugins::{DefinitionStore, PluginDefinition, PluginRegistry, Target};
/// use serde_json::json;
///
/// let mut registry = PluginRegistry::new();
/// let definition = PluginDefinition::new(
///     "tooltip",
///     Rc::new(TooltipCapability),
///     Target::from(".tip"),
///     json!({"delay": 100}),
/// );
/// registry.set("tooltip", definition);
///
/// assert!(registry.has("tooltip"));
/// assert_eq!(registry.keys(), vec!["tooltip"]);
/// ```
#[derive(Debug, Default)]
pub struct PluginRegistry {
    /// Map from plugin name to definition.
    definitions: HashMap<String, PluginDefinition>,

    /// Names in first-insertion order.
    order: Vec<String>,
}

impl PluginRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DefinitionStore for PluginRegistry {
    fn has(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    fn get(&self, name: &str) -> Result<&PluginDefinition> {
        self.definitions
            .get(name)
            .ok_or_else(|| PluginError::NotFound(format!("plugin definition '{}'", name)))
    }

    fn set(&mut self, name: &str, definition: PluginDefinition) {
        if self
            .definitions
            .insert(name.to_string(), definition)
            .is_none()
        {
            self.order.push(name.to_string());
        }
    }

    fn delete(&mut self, name: &str) -> Option<PluginDefinition> {
        let removed = self.definitions.remove(name)?;
        self.order.retain(|n| n != name);
        Some(removed)
    }

    fn keys(&self) -> Vec<String> {
        self.order.clone()
    }

    fn len(&self) -> usize {
        self.definitions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::{CollapseCapability, TooltipCapability};
    use crate::plugins::types::Target;
    use serde_json::json;
    use std::rc::Rc;

    /// Helper to create a definition bound to `.{name}`.
    fn make_definition(name: &str) -> PluginDefinition {
        PluginDefinition::new(
            name,
            Rc::new(TooltipCapability),
            Target::from(format!(".{}", name)),
            json!({}),
        )
    }

    #[test]
    fn test_registry_new_is_empty() {
        let registry = PluginRegistry::new();
        assert_eq!(registry.len(), 0);
        assert!(registry.is_empty());
        assert!(registry.keys().is_empty());
    }

    #[test]
    fn test_set_and_get() {
        let mut registry = PluginRegistry::new();
        registry.set("tooltip", make_definition("tooltip"));

        assert!(registry.has("tooltip"));
        let found = registry.get("tooltip").unwrap();
        assert_eq!(found.name, "tooltip");
        assert_eq!(found.capability.kind(), "tooltip");
    }

    #[test]
    fn test_get_not_found() {
        let registry = PluginRegistry::new();
        let err = registry.get("nonexistent").unwrap_err();
        assert!(matches!(err, PluginError::NotFound(_)));
        assert!(err.to_string().contains("nonexistent"));
    }

    #[test]
    fn test_set_replaces_without_duplicating_key() {
        let mut registry = PluginRegistry::new();
        registry.set("widget", make_definition("widget"));
        registry.set(
            "widget",
            PluginDefinition::new(
                "widget",
                Rc::new(CollapseCapability),
                Target::from(".widget"),
                json!({}),
            ),
        );

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.keys(), vec!["widget"]);
        assert_eq!(registry.get("widget").unwrap().capability.kind(), "collapse");
    }

    #[test]
    fn test_keys_keep_insertion_order() {
        let mut registry = PluginRegistry::new();
        for name in ["gamma", "alpha", "beta"] {
            registry.set(name, make_definition(name));
        }
        assert_eq!(registry.keys(), vec!["gamma", "alpha", "beta"]);
    }

    #[test]
    fn test_delete() {
        let mut registry = PluginRegistry::new();
        registry.set("a", make_definition("a"));
        registry.set("b", make_definition("b"));

        let removed = registry.delete("a").unwrap();
        assert_eq!(removed.name, "a");
        assert!(!registry.has("a"));
        assert_eq!(registry.keys(), vec!["b"]);
        assert!(registry.delete("a").is_none());
    }

    #[test]
    fn test_reinsert_after_delete_moves_to_end() {
        let mut registry = PluginRegistry::new();
        registry.set("a", make_definition("a"));
        registry.set("b", make_definition("b"));
        registry.delete("a");
        registry.set("a", make_definition("a"));
        assert_eq!(registry.keys(), vec!["b", "a"]);
    }
}
