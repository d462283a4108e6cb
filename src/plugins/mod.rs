//! Behavior-plugin runtime
//!
//! Plugins are behaviors declared once under a unique name, bound to a target
//! (an element, a collection of elements, or a selector), and instantiated per
//! element when executed. Registered plugins can be extended under a new name
//! by layering an override table over them, without modifying the original.
//!
//! # Architecture
//!
//! - **types**: `PluginDefinition`, `Target`, `Options`
//! - **registry**: the `DefinitionStore` key/value primitive and `PluginRegistry`
//! - **capability**: the `Capability` / `Behavior` contract and `PluginInstance`
//! - **extend**: `OverrideTable` and `ExtendedCapability` composition
//! - **instances**: per-element `InstanceMap`
//! - **merge**: deep merge of options
//! - **manager**: the `PluginManager` facade
//!
//! # Usage
//!
//! ```rust
//! use std::rc::Rc;
//! use serde_json::{json, Value};
//! use storefront_plugins::behaviors::CollapseCapability;
//! use storefront_plugins::dom::Document;
//! use storefront_plugins::plugins::{OverrideTable, PluginManager};
//!
//! let doc = Document::from_json_str(r#"{"tag": "html", "children": [
//!     {"tag": "div", "class": "collapse"}
//! ]}"#).unwrap();
//!
//! let mut manager = PluginManager::new(doc.clone());
//! manager.register("collapse", Rc::new(CollapseCapability), ".collapse", None).unwrap();
//!
//! // Derive a variant that reports every toggle.
//! let table = OverrideTable::new().method("toggle", |this, args| {
//!     let open = this.call_parent("toggle", args)?;
//!     Ok(json!({ "open": open, "by": this.name() }))
//! });
//! manager.extend("collapse", "loud-collapse", table, ".collapse", None).unwrap();
//! manager.execute_plugin("loud-collapse", None, None).unwrap();
//!
//! let el = doc.query_selector(".collapse").unwrap().unwrap();
//! let instance = manager.get_plugin_instance(&el, "loud-collapse").unwrap();
//! assert_eq!(
//!     instance.call("toggle", &Value::Null).unwrap(),
//!     json!({ "open": true, "by": "loud-collapse" })
//! );
//! ```

pub mod capability;
pub mod extend;
pub mod instances;
pub mod manager;
pub mod merge;
pub mod registry;
pub mod types;

pub use capability::{Behavior, Capability, PluginContext, PluginInstance};
pub use extend::{Dispatch, ExtendedCapability, OverrideFn, OverrideTable};
pub use instances::InstanceMap;
pub use manager::{Extension, PluginManager};
pub use merge::{deep_merge, deep_merge_all};
pub use registry::{DefinitionStore, PluginRegistry};
pub use types::{empty_options, Options, PluginDefinition, Target};
