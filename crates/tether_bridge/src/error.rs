//! Bridge error types

use tether_module::{NativeError, RegistryError};
use tether_value::{InvocationError, MarshalError, ValueTag};
use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Everything that can go wrong crossing the bridge
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// Module or method lookup failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An argument is missing or has the wrong type
    #[error("argument {index}: expected {expected}, found {}", found_name(.found))]
    Argument {
        index: usize,
        expected: ValueTag,
        /// `None` when the argument was not supplied
        found: Option<ValueTag>,
    },

    /// More arguments than the method declares
    #[error("expected at most {expected} arguments, got {found}")]
    Arity { expected: usize, found: usize },

    /// An argument failed to marshal below the top level
    #[error("argument {index}: {source}")]
    Marshal {
        index: usize,
        #[source]
        source: MarshalError,
    },

    /// The native implementation returned an error or panicked
    #[error("native call failed: {0}")]
    Native(NativeError),

    /// A completion mechanism was misused
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// A worker thread could not be started
    #[error("failed to start bridge worker: {0}")]
    WorkerSpawn(String),

    /// The bridge has been torn down
    #[error("bridge has been torn down")]
    TornDown,
}

fn found_name(found: &Option<ValueTag>) -> String {
    match found {
        Some(tag) => tag.to_string(),
        None => "nothing".to_string(),
    }
}

impl BridgeError {
    /// Build an argument error from a marshalling failure at `index`
    pub(crate) fn from_marshal(index: usize, error: MarshalError) -> Self {
        match error {
            MarshalError::TypeMismatch {
                expected,
                found,
                ref path,
            } if path.is_empty() => Self::Argument {
                index,
                expected,
                found: Some(found),
            },
            source => Self::Marshal { index, source },
        }
    }

    /// Whether this error was raised before any native code ran
    pub fn is_pre_native(&self) -> bool {
        matches!(
            self,
            Self::Registry(_) | Self::Argument { .. } | Self::Arity { .. } | Self::Marshal { .. }
        )
    }
}
