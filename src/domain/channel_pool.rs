//! Recycling of retired channels, keyed by payload shape.
//!
//! Pooling is a pure allocation optimization: a pooled channel is only
//! accepted when it is empty, settled and no longer referenced anywhere
//! else, so a recycled channel is indistinguishable from a fresh one.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::ChannelKey;
use super::channel::{Channel, DispatchPolicy, ErasedChannel};
use super::payload::Payload;

/// Stack of idle channels per payload shape.
pub struct ChannelPool {
    enabled: bool,
    max_per_shape: usize,
    policy: Arc<DispatchPolicy>,
    idle: Mutex<HashMap<TypeId, Vec<Arc<dyn ErasedChannel>>>>,
}

impl std::fmt::Debug for ChannelPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelPool")
            .field("enabled", &self.enabled)
            .field("max_per_shape", &self.max_per_shape)
            .field("idle", &self.len())
            .finish()
    }
}

impl ChannelPool {
    /// Creates a pool. Channels it constructs share `policy`.
    #[must_use]
    pub fn new(enabled: bool, max_per_shape: usize, policy: Arc<DispatchPolicy>) -> Self {
        Self {
            enabled,
            max_per_shape,
            policy,
            idle: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a pool that never retains anything.
    #[must_use]
    pub fn disabled(policy: Arc<DispatchPolicy>) -> Self {
        Self::new(false, 0, policy)
    }

    /// Returns `true` if released channels may be retained.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns an empty channel of shape `P` bound to `key`, recycled if one
    /// is idle, freshly allocated otherwise.
    #[must_use]
    pub fn acquire<P: Payload>(&self, key: ChannelKey) -> Arc<Channel<P>> {
        let recycled = self
            .idle
            .lock()
            .get_mut(&TypeId::of::<P>())
            .and_then(Vec::pop);

        if let Some(erased) = recycled
            && let Ok(channel) = erased.into_any().downcast::<Channel<P>>()
        {
            channel.rebind(key);
            tracing::debug!(key = %key, shape = channel.shape().name(), "channel reused from pool");
            return channel;
        }
        Arc::new(Channel::with_policy(key, Arc::clone(&self.policy)))
    }

    /// Offers a retired channel back to the pool.
    ///
    /// Returns `true` if it was retained. Channels that still have
    /// listeners, are mid-publish, or are referenced elsewhere are refused.
    pub fn release<P: Payload>(&self, channel: Arc<Channel<P>>) -> bool {
        self.release_erased(channel)
    }

    pub(crate) fn release_erased(&self, channel: Arc<dyn ErasedChannel>) -> bool {
        if !self.enabled {
            return false;
        }
        let key = channel.key();
        if !channel.is_reset() || Arc::strong_count(&channel) > 1 {
            tracing::debug!(key = %key, "channel not reset or still shared; not pooled");
            return false;
        }

        let shape = channel.shape();
        let mut idle = self.idle.lock();
        let stack = idle.entry(shape.id()).or_default();
        if stack.len() >= self.max_per_shape {
            return false;
        }
        stack.push(channel);
        drop(idle);
        tracing::debug!(key = %key, shape = shape.name(), "channel returned to pool");
        true
    }

    /// Number of idle channels across all shapes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.idle.lock().values().map(Vec::len).sum()
    }

    /// Returns `true` if no channel is idle.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of idle channels of shape `P`.
    #[must_use]
    pub fn len_for<P: Payload>(&self) -> usize {
        self.idle
            .lock()
            .get(&TypeId::of::<P>())
            .map_or(0, Vec::len)
    }

    /// Drops every idle channel.
    pub fn clear(&self) {
        self.idle.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Listener;

    fn pool(max_per_shape: usize) -> ChannelPool {
        ChannelPool::new(true, max_per_shape, Arc::new(DispatchPolicy::default()))
    }

    #[test]
    fn acquire_allocates_when_empty() {
        let pool = pool(4);
        let channel = pool.acquire::<(i32,)>(ChannelKey::new(3));
        assert_eq!(channel.key(), ChannelKey::new(3));
        assert!(!channel.has_listeners());
        assert!(pool.is_empty());
    }

    #[test]
    fn released_channel_is_reused_and_rebound() {
        let pool = pool(4);
        let channel = pool.acquire::<(i32,)>(ChannelKey::new(3));
        let addr = Arc::as_ptr(&channel);

        assert!(pool.release(channel));
        assert_eq!(pool.len_for::<(i32,)>(), 1);

        let reused = pool.acquire::<(i32,)>(ChannelKey::new(9));
        assert!(std::ptr::eq(Arc::as_ptr(&reused), addr));
        assert_eq!(reused.key(), ChannelKey::new(9));
        assert!(pool.is_empty());
    }

    #[test]
    fn shapes_do_not_mix() {
        let pool = pool(4);
        assert!(pool.release(pool.acquire::<(i32,)>(ChannelKey::new(1))));

        let other = pool.acquire::<(String,)>(ChannelKey::new(2));
        assert_eq!(other.key(), ChannelKey::new(2));
        assert_eq!(pool.len_for::<(i32,)>(), 1);
        assert_eq!(pool.len_for::<(String,)>(), 0);
    }

    #[test]
    fn refuses_channels_with_listeners() {
        let pool = pool(4);
        let channel = pool.acquire::<()>(ChannelKey::new(1));
        let listener: Listener<()> = Listener::new(|| {});
        assert!(channel.subscribe(&listener).is_ok());

        assert!(!pool.release(channel));
        assert!(pool.is_empty());
    }

    #[test]
    fn refuses_shared_channels() {
        let pool = pool(4);
        let channel = pool.acquire::<()>(ChannelKey::new(1));
        let _held = Arc::clone(&channel);

        assert!(!pool.release(channel));
        assert!(pool.is_empty());
    }

    #[test]
    fn respects_capacity_per_shape() {
        let pool = pool(1);
        let first = pool.acquire::<()>(ChannelKey::new(1));
        let second = pool.acquire::<()>(ChannelKey::new(2));
        assert!(pool.release(first));
        assert!(!pool.release(second));
        assert_eq!(pool.len(), 1);

        pool.clear();
        assert!(pool.is_empty());
    }

    #[test]
    fn disabled_pool_retains_nothing() {
        let pool = ChannelPool::disabled(Arc::new(DispatchPolicy::default()));
        assert!(!pool.is_enabled());
        assert!(!pool.release(pool.acquire::<()>(ChannelKey::new(1))));
        assert!(pool.is_empty());
    }
}
