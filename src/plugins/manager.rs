//! Plugin manager
//!
//! The `PluginManager` is the public surface of the runtime. It owns the
//! definition store and the document targets are resolved against, and it
//! enforces the registry rules: a name is registered at most once, and every
//! operation on a name requires it to be registered.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use serde_json::json;
//! use storefront_plugins::behaviors::TooltipCapability;
//! use storefront_plugins::dom::Document;
//! use storefront_plugins::plugins::PluginManager;
//!
//! let doc = Document::from_json_str(r#"{
//!     "tag": "html",
//!     "children": [{ "tag": "body", "children": [
//!         { "tag": "span", "class": "tip" },
//!         { "tag": "span", "class": "tip" }
//!     ]}]
//! }"#).unwrap();
//!
//! let mut manager = PluginManager::new(doc.clone());
//! manager
//!     .register("tooltip", Rc::new(TooltipCapability), ".tip", Some(json!({"delay": 100})))
//!     .unwrap();
//! manager.execute_plugins().unwrap();
//!
//! for el in doc.query_selector_all(".tip").unwrap() {
//!     assert!(manager.get_plugin_instance(&el, "tooltip").is_some());
//! }
//! ```

use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::dom::{Document, Element};
use crate::error::{PluginError, Result};

use super::capability::{Capability, PluginInstance};
use super::extend::{ExtendedCapability, OverrideTable};
use super::instances::InstanceMap;
use super::merge::deep_merge;
use super::registry::{DefinitionStore, PluginRegistry};
use super::types::{options_or_empty, Options, PluginDefinition, Target};

/// What `extend` layers onto (or swaps in for) an existing plugin.
#[derive(Clone)]
pub enum Extension {
    /// Override individual members of the parent behavior.
    Overrides(OverrideTable),
    /// A complete capability. Only valid when replacing a plugin under its own
    /// name.
    Replace(Rc<dyn Capability>),
}

impl From<OverrideTable> for Extension {
    fn from(table: OverrideTable) -> Self {
        Extension::Overrides(table)
    }
}

impl From<Rc<dyn Capability>> for Extension {
    fn from(capability: Rc<dyn Capability>) -> Self {
        Extension::Replace(capability)
    }
}

/// Registers, extends and executes plugins against one document.
pub struct PluginManager<S: DefinitionStore = PluginRegistry> {
    document: Document,
    registry: S,
}

impl PluginManager<PluginRegistry> {
    /// Create a manager with an empty in-memory registry.
    pub fn new(document: Document) -> Self {
        Self::with_store(document, PluginRegistry::new())
    }
}

impl<S: DefinitionStore> PluginManager<S> {
    /// Create a manager on top of an existing store.
    pub fn with_store(document: Document, registry: S) -> Self {
        Self { document, registry }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Register a plugin under a unique name.
    ///
    /// The target is stored as given and resolved only when the plugin is
    /// executed.
    ///
    /// # Errors
    /// - `PluginError::AlreadyRegistered` if `name` is taken
    /// - `PluginError::InvalidCapability` if the capability fails validation
    pub fn register(
        &mut self,
        name: &str,
        capability: Rc<dyn Capability>,
        target: impl Into<Target>,
        options: Option<Options>,
    ) -> Result<PluginDefinition> {
        if self.registry.has(name) {
            warn!(plugin = %name, "Rejected duplicate plugin registration");
            return Err(PluginError::AlreadyRegistered(name.to_string()));
        }
        capability.validate()?;

        let definition =
            PluginDefinition::new(name, capability, target.into(), options_or_empty(options));
        info!(
            plugin = %name,
            kind = %definition.capability.kind(),
            target = %definition.target,
            "Registered plugin"
        );
        self.registry.set(name, definition.clone());
        Ok(definition)
    }

    /// Remove a plugin, returning its definition.
    ///
    /// Instances already attached to elements are left in place.
    ///
    /// # Errors
    /// `PluginError::NotRegistered` if `name` is not registered.
    pub fn deregister(&mut self, name: &str) -> Result<PluginDefinition> {
        let removed = self
            .registry
            .delete(name)
            .ok_or_else(|| PluginError::NotRegistered(name.to_string()))?;
        info!(plugin = %name, "Deregistered plugin");
        Ok(removed)
    }

    /// Extend an existing plugin.
    ///
    /// When `from == new` the plugin is replaced: `extension` must be a
    /// complete capability, and the previous options are discarded. Otherwise
    /// a derived capability layering the override table over the parent is
    /// registered under `new` with `options` merged over the parent
    /// definition's options. The parent capability's defaults still apply when
    /// the derived plugin is constructed.
    ///
    /// # Errors
    /// - `PluginError::NotRegistered` if `from` is not registered
    /// - `PluginError::AlreadyRegistered` if `new` differs from `from` and is taken
    /// - `PluginError::InvalidCapability` if `extension` has the wrong shape
    ///   for the requested operation or fails validation
    pub fn extend(
        &mut self,
        from: &str,
        new: &str,
        extension: impl Into<Extension>,
        target: impl Into<Target>,
        options: Option<Options>,
    ) -> Result<PluginDefinition> {
        let extension = extension.into();

        if from == new {
            if !self.registry.has(from) {
                return Err(PluginError::NotRegistered(from.to_string()));
            }
            let capability = match extension {
                Extension::Replace(capability) => capability,
                Extension::Overrides(_) => {
                    return Err(PluginError::InvalidCapability(format!(
                        "replacing \"{}\" requires a complete capability, not an override table",
                        from
                    )))
                }
            };
            capability.validate()?;
            self.deregister(from)?;
            return self.register(new, capability, target, options);
        }

        let parent = self
            .registry
            .get(from)
            .map_err(|_| PluginError::NotRegistered(from.to_string()))?
            .clone();
        if self.registry.has(new) {
            warn!(from = %from, plugin = %new, "Rejected extension onto an existing name");
            return Err(PluginError::AlreadyRegistered(new.to_string()));
        }

        let overrides = match extension {
            Extension::Overrides(table) => table,
            Extension::Replace(_) => {
                return Err(PluginError::InvalidCapability(format!(
                    "extending \"{}\" as \"{}\" requires an override table",
                    from, new
                )))
            }
        };
        overrides.validate()?;

        // Capability defaults are layered in by `construct`, not stored here.
        let merged = deep_merge(&parent.options, &options_or_empty(options));
        let derived: Rc<dyn Capability> =
            Rc::new(ExtendedCapability::new(parent.capability, overrides));

        debug!(from = %from, plugin = %new, "Extending plugin");
        self.register(new, derived, target, Some(merged))
    }

    /// All registered plugin names, in registration order.
    pub fn get_plugins(&self) -> Vec<String> {
        self.registry.keys()
    }

    /// The registered definition for `name`.
    pub fn get_definition(&self, name: &str) -> Result<&PluginDefinition> {
        self.registry
            .get(name)
            .map_err(|_| PluginError::NotRegistered(name.to_string()))
    }

    /// The instance of plugin `name` attached to `element`, if any.
    ///
    /// Never instantiates anything.
    pub fn get_plugin_instance(&self, element: &Element, name: &str) -> Option<PluginInstance> {
        element.plugin_instances().get(name)
    }

    /// The instance map of `element`, created empty on first access.
    pub fn get_plugin_instances(&self, element: &Element) -> InstanceMap {
        element.plugin_instances()
    }

    /// Execute every registered plugin against its own target and options.
    ///
    /// Stops at the first failing plugin.
    ///
    /// # Returns
    /// The total number of constructed instances.
    pub fn execute_plugins(&self) -> Result<usize> {
        let mut constructed = 0;
        for name in self.registry.keys() {
            constructed += self.execute_plugin(&name, None, None)?;
        }
        info!(instances = constructed, "Executed all plugins");
        Ok(constructed)
    }

    /// Execute one plugin.
    ///
    /// `target` defaults to the registered target. `options` is deep-merged
    /// over the registered options. One instance is constructed per resolved
    /// element; the first construction failure aborts the remaining elements.
    ///
    /// # Returns
    /// The number of constructed instances.
    ///
    /// # Errors
    /// - `PluginError::NotRegistered` if `name` is not registered, before the
    ///   target is resolved
    /// - `PluginError::Selector` if a selector target cannot be parsed
    /// - any error raised by the capability while constructing
    pub fn execute_plugin(
        &self,
        name: &str,
        target: Option<Target>,
        options: Option<Options>,
    ) -> Result<usize> {
        let definition = self
            .registry
            .get(name)
            .map_err(|_| PluginError::NotRegistered(name.to_string()))?;

        let target = target.unwrap_or_else(|| definition.target.clone());
        let elements = target.resolve(&self.document)?;
        let merged = deep_merge(&definition.options, &options_or_empty(options));
        let capability = Rc::clone(&definition.capability);

        for element in &elements {
            debug!(plugin = %name, element = %element, "Constructing plugin instance");
            capability.construct(element, merged.clone(), name)?;
        }

        info!(
            plugin = %name,
            target = %target,
            instances = elements.len(),
            "Executed plugin"
        );
        Ok(elements.len())
    }
}
