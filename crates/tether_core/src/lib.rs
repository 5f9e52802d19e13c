//! # tether_core - Tether Core Primitives
//!
//! Foundational pieces shared by every other crate in the workspace:
//! - **Identifiers**: monotonic id generation for calls, tokens and nodes
//! - **Fault containment**: turning panics inside native code into values
//!
//! Nothing here knows about modules, values or shadow trees.

pub mod id;
pub mod panic;

pub use id::{IdGenerator, RawId};
pub use panic::{catch_panic_mut, panic_message};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::id::{IdGenerator, RawId};
    pub use crate::panic::catch_panic_mut;
}
