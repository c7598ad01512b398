//! Listener registry for a single channel.
//!
//! [`Channel`] owns the ordered listener list of one key and one payload
//! shape and fans a payload out to it synchronously.
//!
//! # Reentrancy
//!
//! Listeners run without the channel's state lock held, so they may
//! subscribe, unsubscribe or publish on the same channel. While at least one publish is in flight the
//! active list is frozen:
//!
//! ```text
//! subscribe   ──► pending_add     (not invoked by the in-flight publish)
//! unsubscribe ──► pending_remove  (skipped by the in-flight publish)
//!
//! outermost publish returns ──► apply pending_remove, then pending_add
//! ```
//!
//! Nested publishes on the same channel walk the same frozen list and are
//! bounded by [`DispatchPolicy::max_publish_depth`].
//!
//! # Threads
//!
//! Subscribe, unsubscribe, publish and `remove_all_listeners` run under the
//! policy's dispatch lock, a reentrant mutex shared by every channel built
//! from the same [`DispatchPolicy`]. The lock is held for the whole publish,
//! listeners included, so publishes from different threads are serialized
//! and the depth counter only ever counts publishes nested on one thread.
//! A listener re-entering the bus on its own thread takes the lock again
//! without blocking.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use serde::Serialize;

use super::ChannelKey;
use super::listener::Listener;
use super::payload::{Payload, Shape};
use crate::config::DEFAULT_MAX_PUBLISH_DEPTH;
use crate::diagnostics::{DiagnosticsSink, ListenerFailure, TracingSink};
use crate::error::BusError;

/// Settings and dispatch lock shared by every channel of one bus.
#[derive(Debug)]
pub struct DispatchPolicy {
    /// Maximum number of publishes on one channel nested inside each
    /// other's listeners, counting the outermost one.
    pub max_publish_depth: usize,
    /// Destination of listener failures.
    pub sink: Arc<dyn DiagnosticsSink>,
    dispatch: ReentrantMutex<()>,
}

impl DispatchPolicy {
    /// Creates a policy with the given nesting limit (at least 1) and sink.
    #[must_use]
    pub fn new(max_publish_depth: usize, sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            max_publish_depth: max_publish_depth.max(1),
            sink,
            dispatch: ReentrantMutex::new(()),
        }
    }

    /// Serializes listener-set mutation and delivery across threads.
    ///
    /// Reentrant: a listener may call back into the bus on the thread that
    /// is publishing.
    pub(crate) fn dispatch_lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.dispatch.lock()
    }
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PUBLISH_DEPTH, Arc::new(TracingSink))
    }
}

/// Outcome of one publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Listeners that ran to completion.
    pub delivered: usize,
    /// Listeners that returned an error or panicked.
    pub failed: usize,
    /// Listeners skipped because they were unsubscribed mid-publish.
    pub skipped: usize,
}

impl PublishReport {
    /// Number of listeners that were invoked, successfully or not.
    #[must_use]
    pub const fn invoked(&self) -> usize {
        self.delivered + self.failed
    }
}

struct ChannelState<P> {
    key: ChannelKey,
    active: Vec<Listener<P>>,
    pending_add: Vec<Listener<P>>,
    pending_remove: Vec<Listener<P>>,
    depth: usize,
}

impl<P: Payload> ChannelState<P> {
    fn new(key: ChannelKey) -> Self {
        Self {
            key,
            active: Vec::new(),
            pending_add: Vec::new(),
            pending_remove: Vec::new(),
            depth: 0,
        }
    }

    fn is_publishing(&self) -> bool {
        self.depth > 0
    }

    fn is_live(&self, listener: &Listener<P>) -> bool {
        !self.pending_remove.iter().any(|l| l.same_as(listener))
    }

    fn is_active(&self, listener: &Listener<P>) -> bool {
        self.active.iter().any(|l| l.same_as(listener)) && self.is_live(listener)
    }

    fn pending_add_position(&self, listener: &Listener<P>) -> Option<usize> {
        self.pending_add.iter().position(|l| l.same_as(listener))
    }

    fn listener_count(&self) -> usize {
        self.active.len().saturating_sub(self.pending_remove.len()) + self.pending_add.len()
    }

    /// Two-phase commit of the mutations deferred during a publish.
    fn settle(&mut self) {
        let removals = std::mem::take(&mut self.pending_remove);
        if !removals.is_empty() {
            self.active.retain(|l| !removals.iter().any(|r| r.same_as(l)));
        }
        self.active.append(&mut self.pending_add);
    }

    fn clear(&mut self) {
        self.active.clear();
        self.pending_add.clear();
        self.pending_remove.clear();
    }
}

/// Ordered listener set for one key and one payload shape.
pub struct Channel<P> {
    shape: Shape,
    policy: Arc<DispatchPolicy>,
    state: Mutex<ChannelState<P>>,
}

impl<P: Payload> fmt::Debug for Channel<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Channel")
            .field("key", &state.key)
            .field("shape", &self.shape.name())
            .field("listeners", &state.listener_count())
            .field("depth", &state.depth)
            .finish()
    }
}

impl<P: Payload> Channel<P> {
    /// Creates an empty channel with the default policy.
    #[must_use]
    pub fn new(key: ChannelKey) -> Self {
        Self::with_policy(key, Arc::new(DispatchPolicy::default()))
    }

    /// Creates an empty channel sharing an existing policy.
    #[must_use]
    pub fn with_policy(key: ChannelKey, policy: Arc<DispatchPolicy>) -> Self {
        Self {
            shape: Shape::of::<P>(),
            policy,
            state: Mutex::new(ChannelState::new(key)),
        }
    }

    /// Key the channel is currently registered under.
    #[must_use]
    pub fn key(&self) -> ChannelKey {
        self.state.lock().key
    }

    /// Payload shape of the channel.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        self.shape
    }

    /// Adds a listener at the end of the list.
    ///
    /// During a publish the listener is queued and first invoked by the
    /// next publish.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::DuplicateListener`] if the listener is already
    /// subscribed or queued for addition; the channel is left unchanged.
    pub fn subscribe(&self, listener: &Listener<P>) -> Result<(), BusError> {
        let _dispatch = self.policy.dispatch_lock();
        let mut state = self.state.lock();
        let key = state.key;
        if state.is_active(listener) || state.pending_add_position(listener).is_some() {
            drop(state);
            tracing::warn!(key = %key, shape = self.shape.name(), "listener already subscribed");
            return Err(BusError::DuplicateListener {
                key,
                shape: self.shape.name(),
            });
        }

        if state.is_publishing() {
            state.pending_add.push(listener.clone());
            drop(state);
            tracing::debug!(key = %key, "subscribe deferred until publish completes");
        } else {
            state.active.push(listener.clone());
        }
        Ok(())
    }

    /// Removes a listener.
    ///
    /// During a publish the listener stays in place until the publish
    /// completes but is no longer invoked.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::NotSubscribed`] if the listener is neither
    /// subscribed nor queued for addition; the channel is left unchanged.
    pub fn unsubscribe(&self, listener: &Listener<P>) -> Result<(), BusError> {
        let _dispatch = self.policy.dispatch_lock();
        let mut state = self.state.lock();
        let key = state.key;
        if let Some(pos) = state.pending_add_position(listener) {
            state.pending_add.remove(pos);
            return Ok(());
        }

        if !state.is_active(listener) {
            drop(state);
            tracing::warn!(key = %key, shape = self.shape.name(), "listener not subscribed");
            return Err(BusError::NotSubscribed {
                key,
                shape: self.shape.name(),
            });
        }

        if state.is_publishing() {
            state.pending_remove.push(listener.clone());
            drop(state);
            tracing::debug!(key = %key, "unsubscribe deferred until publish completes");
        } else {
            state.active.retain(|l| !l.same_as(listener));
        }
        Ok(())
    }

    /// Invokes every live listener, in subscription order.
    ///
    /// Listener errors and panics are reported to the policy's sink and do
    /// not stop delivery. A publish nested deeper than
    /// [`DispatchPolicy::max_publish_depth`] delivers nothing.
    ///
    /// Blocks while another thread is publishing on a channel of the same
    /// policy.
    pub fn publish(&self, payload: &P) -> PublishReport {
        let _dispatch = self.policy.dispatch_lock();
        let key = {
            let mut state = self.state.lock();
            if state.depth >= self.policy.max_publish_depth {
                let err = BusError::PublishDepthExceeded {
                    key: state.key,
                    depth: self.policy.max_publish_depth,
                };
                drop(state);
                tracing::error!(key = %err.key(), code = err.error_code(), "{err}");
                return PublishReport::default();
            }
            state.depth += 1;
            state.key
        };

        let mut report = PublishReport::default();
        let mut index = 0;
        while let Some((listener, live)) = self.listener_at(index) {
            if live {
                match invoke_isolated(&listener, payload) {
                    Ok(()) => report.delivered += 1,
                    Err(message) => {
                        report.failed += 1;
                        let failure = ListenerFailure::new(key, self.shape.name(), index, message);
                        self.policy.sink.listener_failed(&failure);
                    }
                }
            } else {
                report.skipped += 1;
            }
            index += 1;
        }

        let mut state = self.state.lock();
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.settle();
        }
        report
    }

    /// Number of listeners the next publish would reach.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state.lock().listener_count()
    }

    /// Returns `true` if [`Self::listener_count`] is non-zero.
    #[must_use]
    pub fn has_listeners(&self) -> bool {
        self.listener_count() > 0
    }

    /// Returns `true` while a publish is running on this channel.
    #[must_use]
    pub fn is_publishing(&self) -> bool {
        self.state.lock().is_publishing()
    }

    /// Drops every listener and every deferred mutation.
    ///
    /// Legal mid-publish: the in-flight publish invokes nothing further.
    pub fn remove_all_listeners(&self) {
        let _dispatch = self.policy.dispatch_lock();
        self.state.lock().clear();
    }

    fn listener_at(&self, index: usize) -> Option<(Listener<P>, bool)> {
        let state = self.state.lock();
        state
            .active
            .get(index)
            .map(|l| (l.clone(), state.is_live(l)))
    }
}

fn invoke_isolated<P: Payload>(listener: &Listener<P>, payload: &P) -> Result<(), String> {
    match panic::catch_unwind(AssertUnwindSafe(|| listener.invoke(payload))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(panic) => Err(panic_message(panic.as_ref())),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}

/// Shape-independent view of a channel, used by the registry and pool.
pub(crate) trait ErasedChannel: Send + Sync {
    fn key(&self) -> ChannelKey;
    fn shape(&self) -> Shape;
    fn listener_count(&self) -> usize;
    fn is_publishing(&self) -> bool;
    fn remove_all_listeners(&self);
    /// Empty, not publishing, no deferred mutations.
    fn is_reset(&self) -> bool;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<P: Payload> ErasedChannel for Channel<P> {
    fn key(&self) -> ChannelKey {
        Channel::key(self)
    }

    fn shape(&self) -> Shape {
        self.shape
    }

    fn listener_count(&self) -> usize {
        Channel::listener_count(self)
    }

    fn is_publishing(&self) -> bool {
        Channel::is_publishing(self)
    }

    fn remove_all_listeners(&self) {
        Channel::remove_all_listeners(self);
    }

    fn is_reset(&self) -> bool {
        let state = self.state.lock();
        !state.is_publishing()
            && state.active.is_empty()
            && state.pending_add.is_empty()
            && state.pending_remove.is_empty()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl<P: Payload> Channel<P> {
    /// Re-targets a reset channel at a new key.
    pub(crate) fn rebind(&self, key: ChannelKey) {
        self.state.lock().key = key;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use std::sync::OnceLock;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn recorder(log: &Log, name: &'static str) -> Listener<()> {
        let log = Arc::clone(log);
        Listener::new(move || log.lock().push(name))
    }

    fn with_sink(key: i32) -> (Arc<Channel<()>>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let policy = DispatchPolicy::new(4, Arc::clone(&sink) as Arc<dyn DiagnosticsSink>);
        let channel = Arc::new(Channel::with_policy(ChannelKey::new(key), Arc::new(policy)));
        (channel, sink)
    }

    #[test]
    fn publish_follows_subscription_order() {
        let log = Log::default();
        let channel = Channel::new(ChannelKey::new(1));
        for name in ["l1", "l2", "l3", "l4"] {
            assert!(channel.subscribe(&recorder(&log, name)).is_ok());
        }

        let report = channel.publish(&());
        assert_eq!(report.delivered, 4);
        assert_eq!(*log.lock(), ["l1", "l2", "l3", "l4"]);
    }

    #[test]
    fn duplicate_subscribe_is_rejected() {
        let log = Log::default();
        let channel = Channel::new(ChannelKey::new(1));
        let a = recorder(&log, "a");

        assert!(channel.subscribe(&a).is_ok());
        let second = channel.subscribe(&a.clone());
        assert!(matches!(second, Err(BusError::DuplicateListener { .. })));
        assert_eq!(channel.listener_count(), 1);

        channel.publish(&());
        assert_eq!(*log.lock(), ["a"]);
    }

    #[test]
    fn unknown_unsubscribe_leaves_others_alone() {
        let log = Log::default();
        let channel = Channel::new(ChannelKey::new(1));
        let a = recorder(&log, "a");
        let stranger = recorder(&log, "stranger");
        assert!(channel.subscribe(&a).is_ok());

        let result = channel.unsubscribe(&stranger);
        assert!(matches!(result, Err(BusError::NotSubscribed { .. })));
        assert_eq!(channel.listener_count(), 1);

        channel.publish(&());
        assert_eq!(*log.lock(), ["a"]);
    }

    #[test]
    fn subscribe_then_unsubscribe_round_trip() {
        let log = Log::default();
        let channel = Channel::new(ChannelKey::new(1));
        let a = recorder(&log, "a");

        assert!(channel.subscribe(&a).is_ok());
        assert!(channel.unsubscribe(&a).is_ok());
        assert_eq!(channel.listener_count(), 0);
        assert!(!channel.has_listeners());

        let report = channel.publish(&());
        assert_eq!(report, PublishReport::default());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn self_unsubscribe_still_receives_current_publish() {
        let log = Log::default();
        let channel = Arc::new(Channel::new(ChannelKey::new(1)));
        let slot: Arc<OnceLock<Listener<()>>> = Arc::new(OnceLock::new());

        let me = {
            let log = Arc::clone(&log);
            let channel = Arc::clone(&channel);
            let slot = Arc::clone(&slot);
            Listener::new(move || {
                log.lock().push("once");
                if let Some(me) = slot.get() {
                    let _ = channel.unsubscribe(me);
                }
            })
        };
        let _ = slot.set(me.clone());
        let tail = recorder(&log, "tail");
        assert!(channel.subscribe(&me).is_ok());
        assert!(channel.subscribe(&tail).is_ok());

        channel.publish(&());
        assert_eq!(*log.lock(), ["once", "tail"]);
        assert_eq!(channel.listener_count(), 1);

        channel.publish(&());
        assert_eq!(*log.lock(), ["once", "tail", "tail"]);
    }

    #[test]
    fn listener_removed_mid_publish_is_skipped() {
        let log = Log::default();
        let channel = Arc::new(Channel::new(ChannelKey::new(1)));
        let victim = recorder(&log, "victim");

        let killer = {
            let log = Arc::clone(&log);
            let channel = Arc::clone(&channel);
            let victim = victim.clone();
            Listener::new(move || {
                log.lock().push("killer");
                let _ = channel.unsubscribe(&victim);
            })
        };
        assert!(channel.subscribe(&killer).is_ok());
        assert!(channel.subscribe(&victim).is_ok());

        let report = channel.publish(&());
        assert_eq!(report.delivered, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(*log.lock(), ["killer"]);
        assert_eq!(channel.listener_count(), 1);
    }

    #[test]
    fn listener_added_mid_publish_waits_for_next_publish() {
        let log = Log::default();
        let channel = Arc::new(Channel::new(ChannelKey::new(1)));
        let late = recorder(&log, "late");

        let adder = {
            let log = Arc::clone(&log);
            let channel = Arc::clone(&channel);
            let late = late.clone();
            Listener::new(move || {
                log.lock().push("adder");
                let _ = channel.subscribe(&late);
            })
        };
        assert!(channel.subscribe(&adder).is_ok());

        channel.publish(&());
        assert_eq!(*log.lock(), ["adder"]);
        assert_eq!(channel.listener_count(), 2);

        channel.publish(&());
        assert_eq!(*log.lock(), ["adder", "adder", "late"]);
    }

    #[test]
    fn listener_count_reflects_pending_mutations() {
        let log = Log::default();
        let channel = Arc::new(Channel::new(ChannelKey::new(1)));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let b = recorder(&log, "b");
        let c = recorder(&log, "c");
        assert!(channel.subscribe(&b).is_ok());

        let probe = {
            let channel = Arc::clone(&channel);
            let seen = Arc::clone(&seen);
            let (b, c) = (b.clone(), c.clone());
            Listener::new(move || {
                let _ = channel.unsubscribe(&b);
                seen.lock().push(channel.listener_count());
                let _ = channel.subscribe(&c);
                seen.lock().push(channel.listener_count());
                seen.lock().push(usize::from(channel.is_publishing()));
            })
        };
        assert!(channel.subscribe(&probe).is_ok());

        channel.publish(&());
        assert_eq!(*seen.lock(), [1, 2, 1]);
        assert!(!channel.is_publishing());
        assert_eq!(channel.listener_count(), 2);
    }

    #[test]
    fn resubscribe_while_pending_removal_moves_to_end() {
        let log = Log::default();
        let channel = Arc::new(Channel::new(ChannelKey::new(1)));
        let a = recorder(&log, "a");
        let b = recorder(&log, "b");

        let churn = {
            let channel = Arc::clone(&channel);
            let a = a.clone();
            Listener::new(move || {
                let _ = channel.unsubscribe(&a);
                let _ = channel.subscribe(&a);
            })
        };
        assert!(channel.subscribe(&a).is_ok());
        assert!(channel.subscribe(&churn).is_ok());
        assert!(channel.subscribe(&b).is_ok());

        channel.publish(&());
        assert_eq!(*log.lock(), ["a", "b"]);
        assert_eq!(channel.listener_count(), 3);

        log.lock().clear();
        assert!(channel.unsubscribe(&churn).is_ok());
        channel.publish(&());
        assert_eq!(*log.lock(), ["b", "a"]);
    }

    #[test]
    fn remove_all_mid_publish_stops_delivery_and_clears_pending() {
        let log = Log::default();
        let channel = Arc::new(Channel::new(ChannelKey::new(1)));
        let late = recorder(&log, "late");

        let wiper = {
            let channel = Arc::clone(&channel);
            let late = late.clone();
            Listener::new(move || {
                let _ = channel.subscribe(&late);
                channel.remove_all_listeners();
            })
        };
        assert!(channel.subscribe(&wiper).is_ok());
        assert!(channel.subscribe(&recorder(&log, "never")).is_ok());

        let report = channel.publish(&());
        assert_eq!(report.delivered, 1);
        assert!(log.lock().is_empty());
        assert_eq!(channel.listener_count(), 0);

        channel.publish(&());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn failing_listener_does_not_stop_delivery() {
        let log = Log::default();
        let (channel, sink) = with_sink(3);
        let failing: Listener<()> =
            Listener::new(|| -> anyhow::Result<()> { anyhow::bail!("disk full") });
        assert!(channel.subscribe(&failing).is_ok());
        assert!(channel.subscribe(&recorder(&log, "after")).is_ok());

        let report = channel.publish(&());
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(*log.lock(), ["after"]);

        let failures = sink.failures();
        let [failure] = failures.as_slice() else {
            panic!("expected exactly one failure, got {failures:?}");
        };
        assert_eq!(failure.key, ChannelKey::new(3));
        assert_eq!(failure.index, 0);
        assert_eq!(failure.message, "disk full");
    }

    #[test]
    fn panicking_listener_is_isolated() {
        let log = Log::default();
        let (channel, sink) = with_sink(5);
        let boom: Listener<()> =
            Listener::new(|| -> anyhow::Result<()> { panic!("listener blew up") });
        assert!(channel.subscribe(&boom).is_ok());
        assert!(channel.subscribe(&recorder(&log, "survivor")).is_ok());

        let report = channel.publish(&());
        assert_eq!(report.failed, 1);
        assert_eq!(*log.lock(), ["survivor"]);
        assert!(!channel.is_publishing());

        let failures = sink.failures();
        let [failure] = failures.as_slice() else {
            panic!("expected exactly one failure");
        };
        assert_eq!(failure.message, "panicked: listener blew up");
    }

    #[test]
    fn nested_publish_reuses_frozen_list() {
        let log = Log::default();
        let inner_seen: Arc<Mutex<Option<(PublishReport, bool)>>> = Arc::default();
        let channel: Arc<Channel<(u32,)>> = Arc::new(Channel::new(ChannelKey::new(1)));
        let late: Listener<(u32,)> = {
            let log = Arc::clone(&log);
            Listener::new(move |_: &u32| log.lock().push("late"))
        };

        let echo: Listener<(u32,)> = {
            let log = Arc::clone(&log);
            let channel = Arc::clone(&channel);
            let inner_seen = Arc::clone(&inner_seen);
            let late = late.clone();
            Listener::new(move |round: &u32| {
                log.lock().push(if *round == 0 { "outer" } else { "inner" });
                if *round == 0 {
                    let _ = channel.subscribe(&late);
                    let inner = channel.publish(&(1,));
                    *inner_seen.lock() = Some((inner, channel.is_publishing()));
                }
            })
        };
        assert!(channel.subscribe(&echo).is_ok());

        channel.publish(&(0,));
        assert_eq!(*log.lock(), ["outer", "inner"]);
        let Some((inner, still_publishing)) = *inner_seen.lock() else {
            panic!("inner publish did not run");
        };
        assert_eq!(inner.delivered, 1);
        assert!(still_publishing);
        assert!(!channel.is_publishing());
        assert_eq!(channel.listener_count(), 2);
    }

    #[test]
    fn publish_beyond_depth_limit_delivers_nothing() {
        let (channel, _sink) = with_sink(8);
        let calls = Arc::new(Mutex::new(0usize));
        let recursive = {
            let channel = Arc::clone(&channel);
            let calls = Arc::clone(&calls);
            Listener::new(move || {
                *calls.lock() += 1;
                channel.publish(&());
            })
        };
        assert!(channel.subscribe(&recursive).is_ok());

        let report = channel.publish(&());
        assert_eq!(report.delivered, 1);
        assert_eq!(*calls.lock(), 4);
        assert!(!channel.is_publishing());
    }

    #[test]
    fn erased_view_reports_reset_state() {
        let log = Log::default();
        let channel = Channel::new(ChannelKey::new(11));
        let erased: &dyn ErasedChannel = &channel;
        assert!(erased.is_reset());

        assert!(channel.subscribe(&recorder(&log, "a")).is_ok());
        assert!(!erased.is_reset());
        assert_eq!(erased.listener_count(), 1);

        erased.remove_all_listeners();
        assert!(erased.is_reset());
        channel.rebind(ChannelKey::new(12));
        assert_eq!(erased.key(), ChannelKey::new(12));
    }
}
