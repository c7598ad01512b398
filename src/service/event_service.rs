//! Event service: routes subscribe, unsubscribe and publish calls by key.

use std::sync::Arc;

use serde::Serialize;

use crate::config::BusConfig;
use crate::diagnostics::{DiagnosticsSink, TracingSink};
use crate::domain::channel::ErasedChannel;
use crate::domain::{
    ChannelKey, ChannelPool, ChannelRegistry, ChannelSummary, DispatchPolicy, Listener, Payload,
    PublishReport,
};
use crate::error::BusError;

/// Aggregate counters for the whole bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    /// Registered channels.
    pub channels: usize,
    /// Listeners across all registered channels.
    pub listeners: usize,
    /// Idle channels waiting in the pool.
    pub pooled: usize,
}

/// Front door of the bus.
///
/// Owns the [`ChannelRegistry`] for live channels and the [`ChannelPool`]
/// for retired ones. Channels are created on the first subscribe to a key
/// and detached (then pooled) by the unsubscribe that empties them.
///
/// Cloning is cheap and every clone addresses the same bus, so listeners
/// that need to publish or subscribe can capture one.
///
/// The bus is `Send + Sync`. Subscribe, unsubscribe, publish and
/// [`Self::clear_all`] are serialized by one reentrant dispatch lock, held
/// for the length of a publish: a subscribe made on another thread while a
/// publish runs waits for it and is then visible to every later publish.
///
/// ```
/// use keyed_bus::config::BusConfig;
/// use keyed_bus::domain::Listener;
/// use keyed_bus::service::EventService;
///
/// let bus = EventService::new(&BusConfig::default());
/// let greet: Listener<(String,)> = Listener::new(|name: &String| println!("hi {name}"));
///
/// bus.subscribe(101, &greet)?;
/// let report = bus.publish1(101, "ada".to_string());
/// assert_eq!(report.delivered, 1);
/// # Ok::<(), keyed_bus::error::BusError>(())
/// ```
#[derive(Debug, Clone)]
pub struct EventService {
    registry: Arc<ChannelRegistry>,
    pool: Arc<ChannelPool>,
    policy: Arc<DispatchPolicy>,
}

impl EventService {
    /// Creates a bus reporting listener failures through `tracing`.
    #[must_use]
    pub fn new(config: &BusConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// Creates a bus reporting listener failures to `sink`.
    #[must_use]
    pub fn with_sink(config: &BusConfig, sink: Arc<dyn DiagnosticsSink>) -> Self {
        let policy = Arc::new(DispatchPolicy::new(config.max_publish_depth, sink));
        let pool = if config.pool_enabled {
            ChannelPool::new(true, config.pool_max_per_shape, Arc::clone(&policy))
        } else {
            ChannelPool::disabled(Arc::clone(&policy))
        };
        Self {
            registry: Arc::new(ChannelRegistry::new()),
            pool: Arc::new(pool),
            policy,
        }
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Returns a reference to the inner [`ChannelPool`].
    #[must_use]
    pub fn pool(&self) -> &Arc<ChannelPool> {
        &self.pool
    }

    /// Subscribes `listener` to `key`, creating the channel if needed.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::DuplicateListener`] if the listener is already
    /// subscribed to `key`, or [`BusError::ShapeMismatch`] if `key` carries
    /// another payload shape. Neither changes any state.
    pub fn subscribe<P: Payload>(
        &self,
        key: impl Into<ChannelKey>,
        listener: &Listener<P>,
    ) -> Result<(), BusError> {
        let key = key.into();
        let _dispatch = self.policy.dispatch_lock();
        self.registry
            .subscribe(key, listener, || self.pool.acquire::<P>(key))
    }

    /// Unsubscribes `listener` from `key`; the channel is retired once it
    /// has no listeners left.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::NotSubscribed`] if the listener is not on `key`,
    /// or [`BusError::ShapeMismatch`] if `key` carries another payload
    /// shape. Neither changes any state.
    pub fn unsubscribe<P: Payload>(
        &self,
        key: impl Into<ChannelKey>,
        listener: &Listener<P>,
    ) -> Result<(), BusError> {
        let _dispatch = self.policy.dispatch_lock();
        if let Some(channel) = self.registry.unsubscribe(key.into(), listener)? {
            self.retire(channel);
        }
        Ok(())
    }

    /// Delivers `payload` to every listener of `key`.
    ///
    /// Publishing to a key without a channel is a silent no-op. A key bound
    /// to another payload shape delivers nothing and logs the mismatch.
    pub fn publish<P: Payload>(&self, key: impl Into<ChannelKey>, payload: &P) -> PublishReport {
        match self.registry.get::<P>(key.into()) {
            Ok(Some(channel)) => channel.publish(payload),
            Ok(None) | Err(_) => PublishReport::default(),
        }
    }

    /// Publishes on a channel without payload.
    pub fn publish0(&self, key: impl Into<ChannelKey>) -> PublishReport {
        self.publish(key, &())
    }

    /// Publishes a one-value payload.
    pub fn publish1<A: 'static>(&self, key: impl Into<ChannelKey>, a: A) -> PublishReport {
        self.publish(key, &(a,))
    }

    /// Publishes a two-value payload.
    pub fn publish2<A: 'static, B: 'static>(
        &self,
        key: impl Into<ChannelKey>,
        a: A,
        b: B,
    ) -> PublishReport {
        self.publish(key, &(a, b))
    }

    /// Publishes a three-value payload.
    pub fn publish3<A: 'static, B: 'static, C: 'static>(
        &self,
        key: impl Into<ChannelKey>,
        a: A,
        b: B,
        c: C,
    ) -> PublishReport {
        self.publish(key, &(a, b, c))
    }

    /// Publishes a four-value payload.
    pub fn publish4<A: 'static, B: 'static, C: 'static, D: 'static>(
        &self,
        key: impl Into<ChannelKey>,
        a: A,
        b: B,
        c: C,
        d: D,
    ) -> PublishReport {
        self.publish(key, &(a, b, c, d))
    }

    /// Number of listeners the next publish on `key` would reach.
    #[must_use]
    pub fn listener_count(&self, key: impl Into<ChannelKey>) -> usize {
        self.registry.listener_count(key.into())
    }

    /// Returns `true` if `key` has at least one listener.
    #[must_use]
    pub fn has_listeners(&self, key: impl Into<ChannelKey>) -> bool {
        self.listener_count(key) > 0
    }

    /// Number of registered channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.registry.len()
    }

    /// Detaches every channel and drops all listeners.
    ///
    /// Retired channels go back to the pool unless `drain_pool` is set, in
    /// which case the pool is emptied as well.
    pub fn clear_all(&self, drain_pool: bool) {
        let _dispatch = self.policy.dispatch_lock();
        let channels = self.registry.drain();
        let count = channels.len();
        for channel in channels {
            channel.remove_all_listeners();
            if !drain_pool {
                self.retire(channel);
            }
        }
        if drain_pool {
            self.pool.clear();
        }
        tracing::info!(channels = count, drain_pool, "event bus cleared");
    }

    /// Returns summaries of all registered channels, ordered by key.
    #[must_use]
    pub fn channels(&self) -> Vec<ChannelSummary> {
        self.registry.list()
    }

    /// Returns aggregate counters.
    #[must_use]
    pub fn stats(&self) -> BusStats {
        let channels = self.registry.list();
        BusStats {
            channels: channels.len(),
            listeners: channels.iter().map(|c| c.listener_count).sum(),
            pooled: self.pool.len(),
        }
    }

    fn retire(&self, channel: Arc<dyn ErasedChannel>) {
        let key = channel.key();
        if !self.pool.release_erased(channel) {
            tracing::debug!(key = %key, "retired channel dropped");
        }
    }
}
