//! Service layer: the public face of the bus.
//!
//! [`EventService`] routes subscribe, unsubscribe and publish calls to the
//! right channel, creating channels on demand and retiring them into the
//! [`super::domain::ChannelPool`] once their last listener leaves.

pub mod event_service;

pub use event_service::{BusStats, EventService};
