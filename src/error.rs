//! Error types for the configuration adaptor.
//!
//! Every outcome that must stop the calling operation is an [`AdaptorError`].
//! Advisory findings (naming convention, unknown property names, duplicate
//! branches) are never errors; they go to the diagnostics sink instead, see
//! [`crate::diagnostics`].

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AdaptorError>;

#[derive(Error, Debug)]
pub enum AdaptorError {
    /// A query or mutation was attempted before a configuration was opened.
    #[error("Configuration is not loaded")]
    ConfigurationNotLoaded,

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Object already exists: {0}")]
    DuplicateObject(String),

    /// The wrapped native object was destroyed (deleted, renamed away or unloaded).
    #[error("Stale reference to {0}: the native object no longer exists")]
    StaleObject(String),

    /// A native reference of the wrong kind was wrapped.
    #[error("Expected a {expected} but found a {found}")]
    StructuralType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("'{owner}' has no accessor for attribute '{attribute}'")]
    UnsupportedAttribute { owner: String, attribute: String },

    #[error("Invalid value for '{attribute}': {reason}")]
    InvalidValue { attribute: String, reason: String },

    #[error("Branch '{name}' ({id}) is not registered in the tree")]
    BranchNotFound { name: String, id: String },

    #[error("Linking '{parent}' -> '{child}' would create a cycle")]
    TreeCycle { parent: String, child: String },

    #[error("Class '{0}' is its own superclass")]
    InheritanceCycle(String),

    #[error("Failed to access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration file '{path}': {reason}")]
    Format { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),
}

impl AdaptorError {
    pub fn class_not_found(class_name: &str) -> Self {
        Self::ObjectNotFound(format!("class '{}'", class_name))
    }

    pub fn object_not_found(class_name: &str, object_name: &str) -> Self {
        Self::ObjectNotFound(format!("'{}@{}'", object_name, class_name))
    }

    pub fn invalid_value(attribute: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }
}
