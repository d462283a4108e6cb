//! Error types for storefront-plugins
//!
//! This module defines all error types used by the plugin runtime. Uses
//! `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use thiserror::Error;

/// The primary error type for plugin runtime operations.
#[derive(Error, Debug)]
pub enum PluginError {
    /// A plugin with this name is already present in the registry.
    #[error("Plugin \"{0}\" is already registered.")]
    AlreadyRegistered(String),

    /// The named plugin is not present in the registry.
    #[error("The plugin \"{0}\" is not registered.")]
    NotRegistered(String),

    /// The value passed as a capability cannot be constructed.
    #[error("Invalid capability: {0}")]
    InvalidCapability(String),

    /// Store-level lookup miss.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A selector string could not be parsed.
    #[error("Invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    /// A behavior failed during construction or while handling a call.
    #[error("Behavior error: {0}")]
    Behavior(String),

    /// A method was invoked that no layer of the behavior answers.
    #[error("Plugin \"{plugin}\" has no method '{method}'")]
    UnknownMethod { plugin: String, method: String },

    /// Configuration-related errors (invalid names, malformed files, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for plugin runtime operations.
pub type Result<T> = std::result::Result<T, PluginError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PluginError::AlreadyRegistered("tooltip".to_string());
        assert_eq!(err.to_string(), "Plugin \"tooltip\" is already registered.");

        let err = PluginError::NotRegistered("bar".to_string());
        assert_eq!(err.to_string(), "The plugin \"bar\" is not registered.");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PluginError = io_err.into();
        assert!(matches!(err, PluginError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PluginError = json_err.into();
        assert!(matches!(err, PluginError::Json(_)));
    }

    #[test]
    fn test_selector_error_display() {
        let err = PluginError::Selector {
            selector: ".a >".to_string(),
            reason: "dangling combinator".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid selector '.a >': dangling combinator"
        );
    }

    #[test]
    fn test_unknown_method_display() {
        let err = PluginError::UnknownMethod {
            plugin: "collapse".into(),
            method: "explode".into(),
        };
        assert_eq!(err.to_string(), "Plugin \"collapse\" has no method 'explode'");
    }
}
