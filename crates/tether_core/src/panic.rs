//! Panic containment
//!
//! Native implementations are untrusted from the bridge's point of view: a
//! panic inside one must come back as an error value, never unwind through
//! the scripting boundary.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Run a closure, turning a panic into `Err` with its message.
///
/// The caller is responsible for not observing state left half-updated by
/// the panic.
pub fn catch_panic_mut<F, R>(f: F) -> Result<R, String>
where
    F: FnOnce() -> R,
{
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}
