//! Scripting task queue
//!
//! Multi-producer, single-consumer FIFO of work for the scripting thread.
//! Producers are worker threads, platform threads and event emitters; the
//! consumer is whoever owns the scripting runtime.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tether_module::NativeError;
use tether_value::{Correlation, FunctionRef, ScriptValue, TokenId};

/// A unit of work for the scripting thread
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptMessage {
    /// Invoke a scripting function with arguments
    Callback {
        call: Correlation,
        token: TokenId,
        function: FunctionRef,
        args: Vec<ScriptValue>,
    },
    /// Settle the promise returned for `call`
    Settle {
        call: Correlation,
        outcome: Result<ScriptValue, NativeError>,
    },
    /// Deliver a UI event emitted by a shadow node
    Event {
        target: u64,
        name: String,
        payload: ScriptValue,
    },
}

impl ScriptMessage {
    /// The invocation this message completes, if any
    pub fn call(&self) -> Option<Correlation> {
        match self {
            Self::Callback { call, .. } | Self::Settle { call, .. } => Some(*call),
            Self::Event { .. } => None,
        }
    }
}

/// Producer handle for the scripting queue.
///
/// Cheap to clone and safe to use from any thread.
#[derive(Debug, Clone)]
pub struct ScriptSender {
    sender: Sender<ScriptMessage>,
}

impl ScriptSender {
    /// Post a message. Returns `false` if the queue is gone.
    pub fn post(&self, message: ScriptMessage) -> bool {
        match self.sender.send(message) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Scripting queue closed, dropping {:?}", err.into_inner().call());
                false
            }
        }
    }
}

/// The scripting thread's queue
#[derive(Debug)]
pub struct ScriptQueue {
    sender: Sender<ScriptMessage>,
    receiver: Receiver<ScriptMessage>,
}

impl ScriptQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Get a producer handle
    pub fn sender(&self) -> ScriptSender {
        ScriptSender {
            sender: self.sender.clone(),
        }
    }

    /// Take the next message without blocking
    pub fn try_recv(&self) -> Option<ScriptMessage> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next message
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ScriptMessage> {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Take everything currently queued, in FIFO order
    pub fn drain(&self) -> Vec<ScriptMessage> {
        self.receiver.try_iter().collect()
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for ScriptQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(n: u64) -> ScriptMessage {
        ScriptMessage::Event {
            target: n,
            name: "press".into(),
            payload: ScriptValue::Null,
        }
    }

    #[test]
    fn test_fifo_across_senders() {
        let queue = ScriptQueue::new();
        let a = queue.sender();
        let b = queue.sender();

        assert!(a.post(event(1)));
        assert!(b.post(event(2)));
        assert!(a.post(event(3)));

        let targets: Vec<u64> = queue
            .drain()
            .into_iter()
            .map(|m| match m {
                ScriptMessage::Event { target, .. } => target,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(targets, vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_post_after_queue_dropped() {
        let queue = ScriptQueue::new();
        let sender = queue.sender();
        drop(queue);
        assert!(!sender.post(event(1)));
    }

    #[test]
    fn test_recv_timeout_empty() {
        let queue = ScriptQueue::new();
        assert_eq!(queue.recv_timeout(Duration::from_millis(1)), None);
    }
}
