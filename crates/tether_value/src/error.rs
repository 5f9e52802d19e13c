//! Error types for value marshalling and token use

use crate::native::ValueTag;
use crate::script::FunctionRef;
use crate::token::{Correlation, TokenId};
use thiserror::Error;

/// Result type for marshalling operations
pub type Result<T> = std::result::Result<T, MarshalError>;

/// A value could not be converted to the requested native type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    /// The dynamic value carries a different tag than expected
    #[error("expected {expected}, found {found}{}", path_suffix(.path))]
    TypeMismatch {
        expected: ValueTag,
        found: ValueTag,
        /// Location inside the value, empty at top level
        path: String,
    },

    /// Nesting went deeper than the configured bound
    #[error("value nesting exceeds depth limit of {limit}")]
    DepthExceeded { limit: usize },
}

fn path_suffix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" at {}", path)
    }
}

/// Misuse of a completion mechanism.
///
/// These never fail the bridge; they are reported to an error sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    /// A single-use callback token was invoked again
    #[error("callback token {token} for function {function} was already consumed")]
    TokenConsumed { token: TokenId, function: FunctionRef },

    /// A promise was resolved or rejected after already being settled
    #[error("promise for call {correlation} was already settled")]
    PromiseAlreadySettled { correlation: Correlation },

    /// A promise was dropped by native code without being settled
    #[error("promise for call {correlation} was dropped without being settled")]
    PromiseAbandoned { correlation: Correlation },

    /// The receiving side of a completion is gone
    #[error("completion for call {correlation} could not be delivered: {reason}")]
    Undeliverable { correlation: Correlation, reason: String },
}
