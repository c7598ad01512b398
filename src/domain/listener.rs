//! Identity-comparable listener handles.

use std::fmt;
use std::sync::Arc;

use super::payload::{Handler, Payload};

/// Shared handle to a subscribed callable of payload `P`.
///
/// A `Listener` is built once (this is the only allocation on the
/// subscribe path) and then passed by reference to subscribe and
/// unsubscribe. Identity is the shared allocation: clones of one
/// `Listener` compare equal, two separately built listeners never do,
/// even when they wrap the same function.
///
/// ```
/// use keyed_bus::domain::Listener;
///
/// let on_login: Listener<(String,)> = Listener::new(|user: &String| {
///     println!("welcome {user}");
/// });
/// assert_eq!(on_login, on_login.clone());
/// ```
pub struct Listener<P> {
    handler: Arc<dyn Handler<P>>,
}

impl<P: Payload> Listener<P> {
    /// Wraps a callable of the matching arity.
    #[must_use]
    pub fn new<H: Handler<P>>(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Runs the listener against a payload.
    ///
    /// # Errors
    ///
    /// Returns the error reported by the wrapped callable.
    pub fn invoke(&self, payload: &P) -> anyhow::Result<()> {
        self.handler.call(payload)
    }

    /// Returns `true` if both handles refer to the same listener.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.handler), Arc::as_ptr(&other.handler))
    }
}

impl<P> Clone for Listener<P> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<P: Payload> PartialEq for Listener<P> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<P: Payload> Eq for Listener<P> {}

impl<P> fmt::Debug for Listener<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&Arc::as_ptr(&self.handler).cast::<()>())
            .finish()
    }
}
