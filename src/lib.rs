//! storefront-plugins - behavior-plugin runtime for storefront documents
//!
//! Behaviors are registered once under a unique name, bound to elements of a
//! document by selector or by reference, instantiated per element, and
//! extended by layering override tables over existing plugins.

pub mod backdrop;
pub mod behaviors;
pub mod config;
pub mod dom;
pub mod error;
pub mod plugins;

pub use config::RuntimeConfig;
pub use error::{PluginError, Result};
pub use plugins::PluginManager;
