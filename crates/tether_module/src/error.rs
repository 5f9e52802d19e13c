//! Error types for module registration and native execution

use std::collections::BTreeMap;
use tether_value::NativeValue;
use thiserror::Error;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors raised while building or querying the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two modules share a name
    #[error("module '{0}' is already registered")]
    DuplicateModule(String),

    /// A module declares the same method twice
    #[error("module '{module}' declares method '{method}' more than once")]
    DuplicateMethod { module: String, method: String },

    /// Module or method could not be resolved
    #[error("{}", not_found_message(.module, .method))]
    NotFound {
        module: String,
        method: Option<String>,
    },

    /// A module was built without an implementation or provider
    #[error("module '{0}' has no implementation")]
    MissingImplementation(String),

    /// Re-registration changed the method table
    #[error("module '{0}' was re-registered with different method descriptors")]
    DescriptorMismatch(String),
}

fn not_found_message(module: &str, method: &Option<String>) -> String {
    match method {
        Some(method) => format!("method '{}' not found on module '{}'", method, module),
        None => format!("module '{}' not found", module),
    }
}

/// An error produced by a native implementation.
///
/// Marshalled back to the scripting layer as a value, never as a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct NativeError {
    pub code: String,
    pub message: String,
}

impl NativeError {
    /// Generic error code
    pub const GENERIC: &'static str = "E_NATIVE";
    /// Code used when a native implementation panicked
    pub const PANIC: &'static str = "E_PANIC";
    /// Code used when a promise method could not obtain its promise
    pub const NO_PROMISE: &'static str = "E_NO_PROMISE";

    /// Create an error with a specific code
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create an error with the generic code
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(Self::GENERIC, message)
    }

    /// Wrap a contained panic
    pub fn panicked(message: impl Into<String>) -> Self {
        Self::new(Self::PANIC, message)
    }

    /// The error as a `{ code, message }` map
    pub fn to_value(&self) -> NativeValue {
        let mut map = BTreeMap::new();
        map.insert("code".to_string(), NativeValue::from(self.code.as_str()));
        map.insert("message".to_string(), NativeValue::from(self.message.as_str()));
        NativeValue::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_messages() {
        let module_only = RegistryError::NotFound {
            module: "Geo".into(),
            method: None,
        };
        let with_method = RegistryError::NotFound {
            module: "Geo".into(),
            method: Some("watch".into()),
        };
        assert_eq!(module_only.to_string(), "module 'Geo' not found");
        assert_eq!(with_method.to_string(), "method 'watch' not found on module 'Geo'");
    }

    #[test]
    fn test_native_error_value() {
        let err = NativeError::new("E_DENIED", "permission denied");
        assert_eq!(err.to_string(), "[E_DENIED] permission denied");
        assert_eq!(
            err.to_value().get("code").and_then(NativeValue::as_str),
            Some("E_DENIED")
        );
    }
}
