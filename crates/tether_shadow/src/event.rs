//! Event emitters
//!
//! Every node family owns one emitter, shared by all revisions of the node
//! and by the platform view mirroring it. Dispatch is fire-and-forget: the
//! event is handed to an [`EventPipe`] which queues it for the scripting
//! thread.

use crate::node::Tag;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tether_value::NativeValue;

/// Carries events towards the scripting layer.
///
/// Implementations must preserve the order of calls made from one thread.
pub trait EventPipe: Send + Sync {
    fn emit(&self, target: Tag, name: &str, payload: NativeValue);
}

/// Pipe that drops every event
#[derive(Debug, Default)]
pub struct NullEventPipe;

impl EventPipe for NullEventPipe {
    fn emit(&self, target: Tag, name: &str, _payload: NativeValue) {
        log::trace!("Dropping event '{}' for {}: no pipe attached", name, target);
    }
}

/// Sends events on behalf of one node
pub struct EventEmitter {
    target: Tag,
    pipe: Arc<dyn EventPipe>,
    enabled: AtomicBool,
    dispatched: AtomicU64,
}

impl EventEmitter {
    /// Create an enabled emitter
    pub fn new(target: Tag, pipe: Arc<dyn EventPipe>) -> Self {
        Self {
            target,
            pipe,
            enabled: AtomicBool::new(true),
            dispatched: AtomicU64::new(0),
        }
    }

    /// Create an emitter that goes nowhere
    pub fn detached(target: Tag) -> Self {
        Self::new(target, Arc::new(NullEventPipe))
    }

    /// Tag of the node this emitter belongs to
    pub fn target(&self) -> Tag {
        self.target
    }

    /// Send an event. Returns `false` if the emitter is disabled.
    pub fn dispatch(&self, name: &str, payload: impl Into<NativeValue>) -> bool {
        if !self.is_enabled() {
            log::debug!("Emitter for {} is disabled, dropping '{}'", self.target, name);
            return false;
        }
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        self.pipe.emit(self.target, name, payload.into());
        true
    }

    /// Enable or disable dispatch
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Number of events sent
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("target", &self.target)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
