//! Domain layer: channel keys, payload shapes, listeners, channels, the
//! channel registry and the channel pool.
//!
//! Everything here is synchronous and lock-based. Listeners run under the
//! reentrant dispatch lock of their [`DispatchPolicy`] only; registry, pool
//! and channel state locks are never held across a listener call.

pub mod channel;
pub mod channel_key;
pub mod channel_pool;
pub mod channel_registry;
pub mod listener;
pub mod payload;

pub use channel::{Channel, DispatchPolicy, PublishReport};
pub use channel_key::ChannelKey;
pub use channel_pool::ChannelPool;
pub use channel_registry::{ChannelRegistry, ChannelSummary};
pub use listener::Listener;
pub use payload::{Handler, ListenerOutcome, Payload, Shape};
