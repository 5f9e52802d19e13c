//! Promise completion handles
//!
//! A promise-style method receives a [`Promise`] and settles it exactly once,
//! from any thread, at any time. The settlement is forwarded to a
//! [`Settlement`] sink (the bridge) which queues it for the scripting thread.

use crate::error::NativeError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tether_value::{Correlation, InvocationError, NativeValue};

/// Receives promise outcomes
pub trait Settlement: Send + Sync {
    /// Deliver the outcome of the promise owned by `correlation`
    fn settle(&self, correlation: Correlation, outcome: Result<NativeValue, NativeError>);

    /// Report promise misuse
    fn report(&self, error: InvocationError);
}

struct PromiseInner {
    correlation: Correlation,
    settled: AtomicBool,
    sink: Arc<dyn Settlement>,
}

impl Drop for PromiseInner {
    fn drop(&mut self) {
        if !self.settled.load(Ordering::Acquire) {
            self.sink.report(InvocationError::PromiseAbandoned {
                correlation: self.correlation,
            });
        }
    }
}

/// A resolve/reject pair for one promise-style invocation.
///
/// Clones share state: whichever clone settles first wins and every later
/// attempt is reported as [`InvocationError::PromiseAlreadySettled`]. If the
/// last clone is dropped unsettled, [`InvocationError::PromiseAbandoned`] is
/// reported.
#[derive(Clone)]
pub struct Promise {
    inner: Arc<PromiseInner>,
}

impl Promise {
    /// Create a promise bound to an invocation
    pub fn new(correlation: Correlation, sink: Arc<dyn Settlement>) -> Self {
        Self {
            inner: Arc::new(PromiseInner {
                correlation,
                settled: AtomicBool::new(false),
                sink,
            }),
        }
    }

    /// Invocation this promise belongs to
    pub fn correlation(&self) -> Correlation {
        self.inner.correlation
    }

    /// Whether resolve or reject has already been called
    pub fn is_settled(&self) -> bool {
        self.inner.settled.load(Ordering::Acquire)
    }

    /// Fulfil the promise. Returns `false` if it was already settled.
    pub fn resolve(&self, value: impl Into<NativeValue>) -> bool {
        self.settle(Ok(value.into()))
    }

    /// Reject the promise. Returns `false` if it was already settled.
    pub fn reject(&self, error: NativeError) -> bool {
        self.settle(Err(error))
    }

    /// Settle with an explicit outcome
    pub fn settle(&self, outcome: Result<NativeValue, NativeError>) -> bool {
        if self.inner.settled.swap(true, Ordering::AcqRel) {
            self.inner.sink.report(InvocationError::PromiseAlreadySettled {
                correlation: self.inner.correlation,
            });
            return false;
        }
        self.inner.sink.settle(self.inner.correlation, outcome);
        true
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("correlation", &self.inner.correlation)
            .field("settled", &self.is_settled())
            .finish()
    }
}
