//! Error sinks
//!
//! Failures that have no caller to return to (token misuse, abandoned
//! promises, errors from callback-style methods) end up here.

use crate::error::BridgeError;
use parking_lot::Mutex;

/// Receives errors that cannot be returned to a caller
pub trait ErrorSink: Send + Sync {
    /// Record one error
    fn report(&self, error: BridgeError);
}

/// Sink that writes to the log
#[derive(Debug, Default)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, error: BridgeError) {
        log::error!("Bridge error: {}", error);
    }
}

/// Sink that keeps every report for later inspection
#[derive(Debug, Default)]
pub struct RecordingErrorSink {
    errors: Mutex<Vec<BridgeError>>,
}

impl RecordingErrorSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every report so far
    pub fn errors(&self) -> Vec<BridgeError> {
        self.errors.lock().clone()
    }

    /// Take and clear the reports
    pub fn take(&self) -> Vec<BridgeError> {
        std::mem::take(&mut *self.errors.lock())
    }

    /// Number of reports
    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    /// Whether nothing was reported
    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }
}

impl ErrorSink for RecordingErrorSink {
    fn report(&self, error: BridgeError) {
        log::debug!("Recorded bridge error: {}", error);
        self.errors.lock().push(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink() {
        let sink = RecordingErrorSink::new();
        assert!(sink.is_empty());

        sink.report(BridgeError::TornDown);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.errors(), vec![BridgeError::TornDown]);
        assert_eq!(sink.take(), vec![BridgeError::TornDown]);
        assert!(sink.is_empty());
    }
}
