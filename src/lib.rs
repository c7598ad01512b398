//! # keyed-bus
//!
//! In-process publish/subscribe event bus keyed by integer channel ids.
//!
//! Each key owns a channel bound to one payload shape (a tuple of zero to
//! four values). Listeners are plain closures; a publish calls every live
//! listener of the key synchronously, in subscription order. Listeners may
//! subscribe, unsubscribe or publish from inside a callback: membership
//! changes made mid-publish take effect once the outermost publish on that
//! channel finishes, except that removed listeners are skipped right away.
//!
//! Listener errors and panics never reach the publisher. They are reported
//! to a [`diagnostics::DiagnosticsSink`] and delivery continues.
//!
//! ## Architecture
//!
//! ```text
//! Callers (publishers, listeners)
//!     │
//!     ├── EventService (service/)
//!     │
//!     ├── ChannelRegistry (domain/)   key -> channel
//!     ├── ChannelPool (domain/)       retired channels per shape
//!     │
//!     ├── Channel<P> (domain/)        ordered listeners, deferred mutation
//!     └── DiagnosticsSink             listener failures
//! ```

pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod service;
