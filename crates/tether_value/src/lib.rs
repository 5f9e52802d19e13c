//! # Tether Value - Marshalling across the scripting boundary
//!
//! Two value worlds meet here:
//!
//! ```text
//! ScriptValue (dynamic, owned by the scripting layer)
//!        │  to_native(value, expected tag)
//!        ▼
//! NativeValue (typed, handed to native modules)
//!        │  to_dynamic(value)
//!        ▼
//! ScriptValue
//! ```
//!
//! ## Key Concepts
//!
//! - **ValueTag**: the type tag a parameter expects
//! - **Marshaller**: depth-bounded, element-wise conversion
//! - **CallbackToken**: what a scripting function becomes on the native side.
//!   Invoking a token never runs script code directly; it hands the call to a
//!   [`CallbackDispatch`] which queues it for the scripting thread.

pub mod error;
pub mod marshal;
pub mod native;
pub mod script;
pub mod token;

pub use error::{InvocationError, MarshalError, Result};
pub use marshal::{to_dynamic, MarshalConfig, Marshaller};
pub use native::{NativeValue, ParamSpec, ValueTag};
pub use script::{FunctionRef, ScriptValue};
pub use token::{
    CallbackDispatch, CallbackToken, Correlation, DetachedDispatch, TokenId, TokenInvocation,
    TokenPolicy,
};
