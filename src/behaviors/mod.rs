//! Built-in behaviors and the catalog that maps behavior kinds to capabilities.
//!
//! Configuration refers to behaviors by kind (`"tooltip"`, `"collapse"`); the
//! [`BehaviorCatalog`] resolves those strings to capabilities.

mod collapse;
mod tooltip;

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use crate::error::{PluginError, Result};
use crate::plugins::Capability;

pub use collapse::{Collapse, CollapseCapability};
pub use tooltip::{Tooltip, TooltipCapability};

/// Behavior kinds available for configuration.
#[derive(Default)]
pub struct BehaviorCatalog {
    kinds: BTreeMap<String, Rc<dyn Capability>>,
}

impl BehaviorCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding the built-in behaviors.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.add(Rc::new(TooltipCapability));
        catalog.add(Rc::new(CollapseCapability));
        catalog
    }

    /// Add a capability under its own kind, replacing any previous entry.
    pub fn add(&mut self, capability: Rc<dyn Capability>) {
        let kind = capability.kind().to_string();
        debug!(kind = %kind, "Added behavior to catalog");
        self.kinds.insert(kind, capability);
    }

    /// Look up a capability by kind.
    ///
    /// # Errors
    /// `PluginError::InvalidCapability` if the kind is unknown.
    pub fn get(&self, kind: &str) -> Result<Rc<dyn Capability>> {
        self.kinds.get(kind).cloned().ok_or_else(|| {
            PluginError::InvalidCapability(format!("unknown behavior kind '{}'", kind))
        })
    }

    /// Known kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        self.kinds.keys().map(String::as_str).collect()
    }
}
