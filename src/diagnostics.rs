//! Out-of-band reporting of listener failures.
//!
//! A publish never returns listener errors to the publisher. Each failure is
//! turned into a [`ListenerFailure`] and handed to the bus's
//! [`DiagnosticsSink`]. The default sink, [`TracingSink`], logs it at
//! `error` level; hosts can plug their own (e.g. a crash reporter).

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::domain::ChannelKey;
use crate::error::BusError;

/// One listener invocation that returned an error or panicked.
#[derive(Debug, Clone, Serialize)]
pub struct ListenerFailure {
    /// Channel the publish was addressed to.
    pub key: ChannelKey,
    /// Payload shape of the channel.
    pub shape: &'static str,
    /// Position of the listener in the channel's active list.
    pub index: usize,
    /// Rendered error or panic message.
    pub message: String,
    /// When the failure was observed.
    pub occurred_at: DateTime<Utc>,
}

impl ListenerFailure {
    /// Creates a failure record stamped with the current time.
    #[must_use]
    pub fn new(key: ChannelKey, shape: &'static str, index: usize, message: String) -> Self {
        Self {
            key,
            shape,
            index,
            message,
            occurred_at: Utc::now(),
        }
    }
}

impl From<&ListenerFailure> for BusError {
    fn from(failure: &ListenerFailure) -> Self {
        Self::ListenerInvocation {
            key: failure.key,
            shape: failure.shape,
            index: failure.index,
            message: failure.message.clone(),
        }
    }
}

/// Receiver for listener failures.
pub trait DiagnosticsSink: fmt::Debug + Send + Sync {
    /// Called once per failed listener invocation, after the listener has
    /// returned and before the next listener runs.
    fn listener_failed(&self, failure: &ListenerFailure);
}

/// Sink that logs failures through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn listener_failed(&self, failure: &ListenerFailure) {
        let err = BusError::from(failure);
        tracing::error!(
            key = %failure.key,
            shape = failure.shape,
            index = failure.index,
            code = err.error_code(),
            "{err}"
        );
    }
}

/// Sink that keeps every failure in memory, for hosts that surface them
/// later (and for tests).
#[derive(Debug, Default)]
pub struct MemorySink {
    failures: Mutex<Vec<ListenerFailure>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all failures recorded so far, oldest first.
    #[must_use]
    pub fn failures(&self) -> Vec<ListenerFailure> {
        self.failures.lock().clone()
    }

    /// Returns the number of recorded failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.lock().len()
    }

    /// Returns `true` if nothing has failed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.lock().is_empty()
    }
}

impl DiagnosticsSink for MemorySink {
    fn listener_failed(&self, failure: &ListenerFailure) {
        self.failures.lock().push(failure.clone());
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn failure_converts_to_invocation_error() {
        let failure = ListenerFailure::new(ChannelKey::new(9), "(i32,)", 2, "boom".to_string());
        let err = BusError::from(&failure);
        assert!(matches!(
            err,
            BusError::ListenerInvocation { index: 2, ref message, .. } if message == "boom"
        ));
        assert_eq!(err.to_string(), "listener 2 on channel 9 (i32,) failed: boom");
    }

    #[test]
    fn failure_serializes_with_key_and_timestamp() {
        let failure = ListenerFailure::new(ChannelKey::new(9), "()", 0, "boom".to_string());
        let Ok(json) = serde_json::to_value(&failure) else {
            panic!("serialization failed");
        };
        assert_eq!(json["key"], 9);
        assert_eq!(json["message"], "boom");
        assert!(json["occurred_at"].is_string());
    }

    #[test]
    fn memory_sink_keeps_failures_in_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        sink.listener_failed(&ListenerFailure::new(ChannelKey::new(1), "()", 0, "a".into()));
        sink.listener_failed(&ListenerFailure::new(ChannelKey::new(1), "()", 1, "b".into()));
        let messages: Vec<String> = sink.failures().into_iter().map(|f| f.message).collect();
        assert_eq!(messages, ["a", "b"]);
        assert_eq!(sink.len(), 2);
    }
}
