//! Bus error types with numeric codes.
//!
//! [`BusError`] is the central error type of the crate. Subscribe and
//! unsubscribe return it directly; listener failures are never returned to
//! the publisher and only appear here as the rendered form of a
//! [`crate::diagnostics::ListenerFailure`].

use crate::domain::ChannelKey;

/// Error enum for channel and registry operations.
///
/// # Error Code Ranges
///
/// | Range     | Category             | Recoverable |
/// |-----------|----------------------|-------------|
/// | 1000–1999 | Listener bookkeeping | yes (no-op) |
/// | 2000–2999 | Programming error    | no          |
/// | 3000–3999 | Listener runtime     | isolated    |
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// The listener is already subscribed (or pending addition).
    #[error("listener already subscribed to channel {key} {shape}")]
    DuplicateListener {
        /// Channel the subscribe was addressed to.
        key: ChannelKey,
        /// Payload shape of the channel.
        shape: &'static str,
    },

    /// The listener is not subscribed to the channel.
    #[error("listener not subscribed to channel {key} {shape}")]
    NotSubscribed {
        /// Channel the unsubscribe was addressed to.
        key: ChannelKey,
        /// Payload shape requested by the caller.
        shape: &'static str,
    },

    /// The key is already bound to a channel of another payload shape.
    #[error("channel {key} carries {found}, not {expected}")]
    ShapeMismatch {
        /// Channel key reused with the wrong shape.
        key: ChannelKey,
        /// Shape requested by the caller.
        expected: &'static str,
        /// Shape the channel was created with.
        found: &'static str,
    },

    /// A listener re-published on a channel too many levels deep.
    #[error("nested publish on channel {key} exceeds depth {depth}")]
    PublishDepthExceeded {
        /// Channel the nested publish was addressed to.
        key: ChannelKey,
        /// Configured maximum nesting depth.
        depth: usize,
    },

    /// A listener returned an error or panicked during a publish.
    #[error("listener {index} on channel {key} {shape} failed: {message}")]
    ListenerInvocation {
        /// Channel being published.
        key: ChannelKey,
        /// Payload shape of the channel.
        shape: &'static str,
        /// Position of the listener in the active list.
        index: usize,
        /// Rendered error or panic message.
        message: String,
    },
}

impl BusError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::DuplicateListener { .. } => 1001,
            Self::NotSubscribed { .. } => 1002,
            Self::ShapeMismatch { .. } => 2001,
            Self::PublishDepthExceeded { .. } => 2002,
            Self::ListenerInvocation { .. } => 3001,
        }
    }

    /// Returns `true` for misuse that should be fixed in the calling code
    /// rather than tolerated at runtime.
    #[must_use]
    pub const fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::ShapeMismatch { .. } | Self::PublishDepthExceeded { .. }
        )
    }

    /// Returns the channel key the error refers to.
    #[must_use]
    pub const fn key(&self) -> ChannelKey {
        match self {
            Self::DuplicateListener { key, .. }
            | Self::NotSubscribed { key, .. }
            | Self::ShapeMismatch { key, .. }
            | Self::PublishDepthExceeded { key, .. }
            | Self::ListenerInvocation { key, .. } => *key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_ranges() {
        let key = ChannelKey::new(1);
        let dup = BusError::DuplicateListener { key, shape: "()" };
        let mismatch = BusError::ShapeMismatch {
            key,
            expected: "(i32,)",
            found: "()",
        };
        assert_eq!(dup.error_code(), 1001);
        assert_eq!(mismatch.error_code(), 2001);
        assert!(!dup.is_programming_error());
        assert!(mismatch.is_programming_error());
    }

    #[test]
    fn shape_mismatch_message_names_both_shapes() {
        let err = BusError::ShapeMismatch {
            key: ChannelKey::new(7),
            expected: "(i32,)",
            found: "()",
        };
        assert_eq!(err.to_string(), "channel 7 carries (), not (i32,)");
        assert_eq!(err.key(), ChannelKey::new(7));
    }
}
