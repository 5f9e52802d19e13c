//! # Tether Bridge - Invocation bridge
//!
//! The bridge is the one door between the scripting thread and native
//! modules. A call flows through four stages:
//!
//! ```text
//! invoke(module, method, args)
//!     │ 1. resolve          → BridgeError::Registry(NotFound)
//!     │ 2. validate         → BridgeError::Argument { index, expected }
//!     │ 3. marshal          → BridgeError::Marshal
//!     │ 4. call native
//!     ▼
//! sync:     Invocation::Value on the calling thread
//! callback: Invocation::Pending, completion → ScriptQueue (Callback)
//! promise:  Invocation::Pending, settlement → ScriptQueue (Settle)
//! ```
//!
//! Steps 1-3 never run native code, so a rejected call has no side effects.
//! Native code never calls back into the scripting layer directly; every
//! completion is a [`ScriptMessage`] drained by the scripting thread.

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod pool;
pub mod queue;
pub mod sink;

pub use bridge::{Bridge, Invocation, PendingCall};
pub use config::BridgeConfig;
pub use dispatch::BridgeStats;
pub use error::{BridgeError, Result};
pub use pool::WorkerPool;
pub use queue::{ScriptMessage, ScriptQueue, ScriptSender};
pub use sink::{ErrorSink, LogErrorSink, RecordingErrorSink};

/// Prelude for common imports
pub mod prelude {
    pub use crate::bridge::{Bridge, Invocation, PendingCall};
    pub use crate::config::BridgeConfig;
    pub use crate::error::BridgeError;
    pub use crate::queue::ScriptMessage;
}
