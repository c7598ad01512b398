//! Key-to-channel map with one coarse lock.
//!
//! [`ChannelRegistry`] stores every live channel in a `HashMap` keyed by
//! [`ChannelKey`]. Channels of different payload shapes share the map
//! behind a shape-erased handle and are downcast on access; reusing a key
//! with another shape is reported as [`BusError::ShapeMismatch`].
//!
//! # Locking
//!
//! Subscribe and unsubscribe run the channel operation while holding the
//! map lock, so "channel became empty, detach it" is atomic with respect
//! to a concurrent subscribe. Publishing only holds the lock long enough to
//! clone the channel handle; listeners never run under it.
//!
//! Channel mutations take the channel's dispatch lock, so callers that
//! mutate through the registry while other threads publish must take that
//! lock before the map lock. [`crate::service::EventService`] does.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use super::ChannelKey;
use super::channel::{Channel, ErasedChannel};
use super::listener::Listener;
use super::payload::{Payload, Shape};
use crate::error::BusError;

/// Lightweight description of one registered channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSummary {
    /// Channel key.
    pub key: ChannelKey,
    /// Payload tuple type name.
    pub shape: &'static str,
    /// Number of payload values.
    pub arity: usize,
    /// Listeners the next publish would reach.
    pub listener_count: usize,
}

/// Central store for all live channels.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: Mutex<HashMap<ChannelKey, Arc<dyn ErasedChannel>>>,
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.len())
            .finish()
    }
}

impl ChannelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `listener` to the channel under `key`, registering the
    /// channel returned by `make` first if the key is unused.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::ShapeMismatch`] if `key` holds a channel of
    /// another shape, or [`BusError::DuplicateListener`] if the listener is
    /// already subscribed.
    pub fn subscribe<P, F>(
        &self,
        key: ChannelKey,
        listener: &Listener<P>,
        make: F,
    ) -> Result<(), BusError>
    where
        P: Payload,
        F: FnOnce() -> Arc<Channel<P>>,
    {
        let mut map = self.channels.lock();
        let existing = map.get(&key).map(Arc::clone);
        let channel = match existing {
            Some(entry) => downcast::<P>(key, &entry)?,
            None => {
                let channel = make();
                map.insert(key, Arc::clone(&channel) as Arc<dyn ErasedChannel>);
                tracing::debug!(key = %key, shape = channel.shape().name(), "channel created");
                channel
            }
        };
        channel.subscribe(listener)
    }

    /// Unsubscribes `listener` from the channel under `key`.
    ///
    /// Returns the channel if it was left without listeners and has
    /// therefore been detached from the registry. A channel found empty is
    /// detached even when the unsubscribe itself fails; it is dropped
    /// rather than returned in that case.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::NotSubscribed`] if `key` has no channel or the
    /// listener is not on it, and [`BusError::ShapeMismatch`] if `key` holds
    /// a channel of another shape.
    pub(crate) fn unsubscribe<P: Payload>(
        &self,
        key: ChannelKey,
        listener: &Listener<P>,
    ) -> Result<Option<Arc<dyn ErasedChannel>>, BusError> {
        let mut map = self.channels.lock();
        let Some(entry) = map.get(&key).map(Arc::clone) else {
            drop(map);
            let shape = Shape::of::<P>().name();
            tracing::warn!(key = %key, shape, "unsubscribe from unknown channel");
            return Err(BusError::NotSubscribed { key, shape });
        };

        let channel = downcast::<P>(key, &entry)?;
        let outcome = channel.unsubscribe(listener);
        if channel.has_listeners() {
            return outcome.map(|()| None);
        }
        let detached = map.remove(&key);
        drop(map);
        tracing::debug!(key = %key, "channel detached");
        outcome.map(|()| detached)
    }

    /// Returns the typed channel under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::ShapeMismatch`] if `key` holds a channel of
    /// another shape.
    pub fn get<P: Payload>(&self, key: ChannelKey) -> Result<Option<Arc<Channel<P>>>, BusError> {
        let map = self.channels.lock();
        map.get(&key).map(|entry| downcast::<P>(key, entry)).transpose()
    }

    /// Returns `true` if a channel is registered under `key`.
    #[must_use]
    pub fn contains(&self, key: ChannelKey) -> bool {
        self.channels.lock().contains_key(&key)
    }

    /// Listener count of the channel under `key` (0 if unregistered).
    #[must_use]
    pub fn listener_count(&self, key: ChannelKey) -> usize {
        self.channels
            .lock()
            .get(&key)
            .map_or(0, |c| c.listener_count())
    }

    /// Detaches every channel, returning them.
    pub(crate) fn drain(&self) -> Vec<Arc<dyn ErasedChannel>> {
        self.channels.lock().drain().map(|(_, c)| c).collect()
    }

    /// Returns summaries of all channels, ordered by key.
    #[must_use]
    pub fn list(&self) -> Vec<ChannelSummary> {
        let map = self.channels.lock();
        let mut summaries: Vec<ChannelSummary> = map
            .iter()
            .map(|(key, channel)| {
                let shape = channel.shape();
                ChannelSummary {
                    key: *key,
                    shape: shape.name(),
                    arity: shape.arity(),
                    listener_count: channel.listener_count(),
                }
            })
            .collect();
        drop(map);
        summaries.sort_by_key(|s| s.key);
        summaries
    }

    /// Returns the number of registered channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.lock().len()
    }

    /// Returns `true` if no channel is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.lock().is_empty()
    }
}

fn downcast<P: Payload>(
    key: ChannelKey,
    entry: &Arc<dyn ErasedChannel>,
) -> Result<Arc<Channel<P>>, BusError> {
    let found = entry.shape();
    Arc::clone(entry)
        .into_any()
        .downcast::<Channel<P>>()
        .map_err(|_| {
            let err = BusError::ShapeMismatch {
                key,
                expected: Shape::of::<P>().name(),
                found: found.name(),
            };
            tracing::error!(key = %key, code = err.error_code(), "{err}");
            err
        })
}
