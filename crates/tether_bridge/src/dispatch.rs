//! Completion routing
//!
//! [`BridgeShared`] is the state every completion path touches: the
//! scripting queue producer, the error sink, the set of cancelled calls and
//! the statistics. It implements both completion traits so callback tokens
//! and promises created by the bridge route back through it.

use crate::error::BridgeError;
use crate::queue::{ScriptMessage, ScriptSender};
use crate::sink::ErrorSink;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tether_module::{NativeError, Settlement};
use tether_value::{
    to_dynamic, CallbackDispatch, Correlation, InvocationError, NativeValue, TokenInvocation,
};

/// Statistics about bridge usage
#[derive(Debug, Clone, Default)]
pub struct BridgeStats {
    /// Calls accepted by `invoke`
    pub invocations: u64,
    /// Calls rejected before native code ran
    pub rejected: u64,
    /// Sync calls completed
    pub sync_calls: u64,
    /// Callback and promise calls started
    pub async_calls: u64,
    /// Callback messages posted
    pub callbacks_posted: u64,
    /// Settle messages posted
    pub settlements_posted: u64,
    /// Completions dropped because their call was cancelled
    pub discarded: u64,
    /// Reports sent to the error sink
    pub errors_reported: u64,
}

/// Bookkeeping for one call that can still complete
#[derive(Debug, Default)]
struct CallEntry {
    /// Running native call, live tokens and an unsettled promise
    holds: usize,
    /// Completions waiting on the scripting queue
    queued: usize,
    cancelled: bool,
}

impl CallEntry {
    fn is_finished(&self) -> bool {
        self.holds == 0 && self.queued == 0
    }
}

pub(crate) struct BridgeShared {
    sender: ScriptSender,
    sink: Arc<dyn ErrorSink>,
    calls: Mutex<HashMap<Correlation, CallEntry>>,
    pub(crate) stats: RwLock<BridgeStats>,
}

impl BridgeShared {
    pub(crate) fn new(sender: ScriptSender, sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            sender,
            sink,
            calls: Mutex::new(HashMap::new()),
            stats: RwLock::new(BridgeStats::default()),
        }
    }

    pub(crate) fn report_error(&self, error: BridgeError) {
        self.stats.write().errors_reported += 1;
        self.sink.report(error);
    }

    /// Keep `call` in flight until the matching [`BridgeShared::release`]
    pub(crate) fn hold(&self, call: Correlation) {
        if call == Correlation::NONE {
            return;
        }
        self.calls.lock().entry(call).or_default().holds += 1;
    }

    /// Drop one hold on `call`. Returns whether the call was cancelled.
    pub(crate) fn release(&self, call: Correlation) -> bool {
        let mut calls = self.calls.lock();
        let Some(entry) = calls.get_mut(&call) else {
            return false;
        };
        entry.holds = entry.holds.saturating_sub(1);
        let cancelled = entry.cancelled;
        if entry.is_finished() {
            calls.remove(&call);
        }
        cancelled
    }

    /// Take one queued completion of `call` off the books. Returns whether
    /// the call was cancelled, in which case the completion must be dropped.
    pub(crate) fn dequeue(&self, call: Correlation) -> bool {
        let mut calls = self.calls.lock();
        let Some(entry) = calls.get_mut(&call) else {
            return false;
        };
        entry.queued = entry.queued.saturating_sub(1);
        let cancelled = entry.cancelled;
        if entry.is_finished() {
            calls.remove(&call);
        }
        cancelled
    }

    /// Mark an in-flight call cancelled.
    ///
    /// Returns `false` for unknown or finished calls and for calls that were
    /// already cancelled.
    pub(crate) fn cancel(&self, call: Correlation) -> bool {
        match self.calls.lock().get_mut(&call) {
            Some(entry) if !entry.cancelled => {
                entry.cancelled = true;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn is_cancelled(&self, call: Correlation) -> bool {
        self.calls
            .lock()
            .get(&call)
            .map_or(false, |entry| entry.cancelled)
    }

    /// Number of calls that can still complete
    pub(crate) fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    /// Forget every call except those with completions still queued
    pub(crate) fn reset(&self) {
        let mut calls = self.calls.lock();
        calls.retain(|_, entry| entry.queued > 0);
        for entry in calls.values_mut() {
            entry.holds = 0;
        }
    }

    pub(crate) fn note_discarded(&self, call: Correlation) {
        log::debug!("Discarding completion for cancelled call {}", call);
        self.stats.write().discarded += 1;
    }

    fn post(&self, call: Correlation, message: ScriptMessage) -> bool {
        if call != Correlation::NONE {
            self.calls.lock().entry(call).or_default().queued += 1;
        }
        if self.sender.post(message) {
            return true;
        }
        self.dequeue(call);
        self.report_error(BridgeError::Invocation(InvocationError::Undeliverable {
            correlation: call,
            reason: "scripting queue closed".to_string(),
        }));
        false
    }
}

impl CallbackDispatch for BridgeShared {
    fn dispatch(&self, invocation: TokenInvocation) {
        let call = invocation.correlation;
        if self.is_cancelled(call) {
            self.note_discarded(call);
            return;
        }

        let message = ScriptMessage::Callback {
            call,
            token: invocation.token,
            function: invocation.function,
            args: invocation.args.iter().map(to_dynamic).collect(),
        };
        if self.post(call, message) {
            self.stats.write().callbacks_posted += 1;
        }
    }

    fn report(&self, error: InvocationError) {
        self.report_error(error.into());
    }

    fn token_created(&self, correlation: Correlation) {
        self.hold(correlation);
    }

    fn token_dropped(&self, correlation: Correlation) {
        self.release(correlation);
    }
}

impl Settlement for BridgeShared {
    fn settle(&self, call: Correlation, outcome: Result<NativeValue, NativeError>) {
        if self.is_cancelled(call) {
            self.release(call);
            self.note_discarded(call);
            return;
        }

        let message = ScriptMessage::Settle {
            call,
            outcome: outcome.map(|value| to_dynamic(&value)),
        };
        if self.post(call, message) {
            self.stats.write().settlements_posted += 1;
        }
        self.release(call);
    }

    fn report(&self, error: InvocationError) {
        if let InvocationError::PromiseAbandoned { correlation } = error {
            if self.release(correlation) {
                return;
            }
        }
        self.report_error(error.into());
    }
}
