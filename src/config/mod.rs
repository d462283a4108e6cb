//! Runtime configuration for storefront-plugins
//!
//! Declares which plugins to register, what they bind to, and backdrop
//! settings. Stored as JSON, by default at
//! `<config_dir>/storefront-plugins/plugins.json`.
//!
//! ```json
//! {
//!     "plugins": [
//!         { "name": "tooltip", "behavior": "tooltip", "selector": ".tip", "options": { "delay": 100 } },
//!         { "name": "faq", "behavior": "collapse", "selector": ".faq > dd" }
//!     ],
//!     "blocked_plugins": ["faq"],
//!     "backdrop": { "remove_delay_ms": 350 }
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::backdrop::{Backdrop, TimerQueue};
use crate::behaviors::BehaviorCatalog;
use crate::dom::Document;
use crate::error::{PluginError, Result};
use crate::plugins::{DefinitionStore, PluginManager};

static PLUGIN_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_\-]{0,63}$").unwrap());

/// One plugin to register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginBinding {
    /// Registry name. 1-64 characters: letters, digits, `_` and `-`,
    /// starting with a letter.
    pub name: String,

    /// Behavior kind from the catalog (e.g. "tooltip").
    pub behavior: String,

    /// Selector the plugin is bound to.
    pub selector: String,

    /// Options stored with the definition.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

/// Backdrop overlay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackdropConfig {
    /// Delay before a closed backdrop is removed from the document.
    pub remove_delay_ms: u64,
}

impl Default for BackdropConfig {
    fn default() -> Self {
        Self {
            remove_delay_ms: crate::backdrop::REMOVE_BACKDROP_DELAY,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Plugins to register, in order.
    pub plugins: Vec<PluginBinding>,

    /// Allowlist of plugin names. If empty, all plugins are allowed.
    pub allowed_plugins: Vec<String>,

    /// Blocklist of plugin names. Takes precedence over the allowlist.
    pub blocked_plugins: Vec<String>,

    pub backdrop: BackdropConfig,
}

impl RuntimeConfig {
    /// Default config file location, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("storefront-plugins").join("plugins.json"))
    }

    /// Parse and validate a config from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RuntimeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    ///
    /// # Errors
    /// - `PluginError::Config` if the file cannot be read or fails validation
    /// - `PluginError::Json` if the JSON is malformed
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PluginError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_json_str(&content)?;
        info!(path = %path.display(), plugins = config.plugins.len(), "Loaded plugin config");
        Ok(config)
    }

    /// Check names, selectors and options of every binding.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for binding in &self.plugins {
            if !PLUGIN_NAME_RE.is_match(&binding.name) {
                return Err(PluginError::Config(format!(
                    "Invalid plugin name '{}': must be 1-64 letters, digits, '_' or '-', starting with a letter",
                    binding.name
                )));
            }
            if !seen.insert(binding.name.as_str()) {
                return Err(PluginError::Config(format!(
                    "Plugin '{}' is declared more than once",
                    binding.name
                )));
            }
            if binding.selector.trim().is_empty() {
                return Err(PluginError::Config(format!(
                    "Plugin '{}' has an empty selector",
                    binding.name
                )));
            }
            if !(binding.options.is_null() || binding.options.is_object()) {
                return Err(PluginError::Config(format!(
                    "Plugin '{}' options must be an object",
                    binding.name
                )));
            }
        }
        Ok(())
    }

    /// Check whether a plugin name is permitted by the allow/block lists.
    pub fn is_plugin_permitted(&self, name: &str) -> bool {
        if self.blocked_plugins.iter().any(|b| b == name) {
            return false;
        }
        self.allowed_plugins.is_empty() || self.allowed_plugins.iter().any(|a| a == name)
    }

    /// A backdrop over `document` using the configured removal delay.
    pub fn backdrop(&self, document: Document, timers: TimerQueue) -> Backdrop {
        Backdrop::new(document, timers).with_remove_delay(self.backdrop.remove_delay_ms)
    }

    /// Register every permitted binding with `manager`.
    ///
    /// # Returns
    /// The number of registered plugins.
    pub fn apply<S: DefinitionStore>(
        &self,
        manager: &mut PluginManager<S>,
        catalog: &BehaviorCatalog,
    ) -> Result<usize> {
        let mut registered = 0;
        for binding in &self.plugins {
            if !self.is_plugin_permitted(&binding.name) {
                warn!(plugin = %binding.name, "Plugin not permitted by config, skipping");
                continue;
            }
            let capability = catalog.get(&binding.behavior)?;
            manager.register(
                &binding.name,
                capability,
                binding.selector.as_str(),
                Some(binding.options.clone()),
            )?;
            registered += 1;
        }
        Ok(registered)
    }
}
