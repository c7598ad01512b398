//! Payload shapes and the typed dispatch shim.
//!
//! A channel's payload is always a tuple: `()`, `(A,)`, `(A, B)`,
//! `(A, B, C)` or `(A, B, C, D)`. [`Payload`] is sealed to that closed set.
//!
//! [`Handler`] is the uniform invocation signature stored inside a channel:
//! every handler is called with `&P`. It is implemented for plain closures
//! of the matching arity, which receive the tuple fields by reference:
//!
//! ```text
//! Fn()                      -> Handler<()>
//! Fn(&A)                    -> Handler<(A,)>
//! Fn(&A, &B)                -> Handler<(A, B)>
//! Fn(&A, &B, &C)            -> Handler<(A, B, C)>
//! Fn(&A, &B, &C, &D)        -> Handler<(A, B, C, D)>
//! ```
//!
//! The unpacking is monomorphized per listener type, so dispatch needs no
//! runtime casts and no allocation.

use std::any::{TypeId, type_name};
use std::fmt;

mod sealed {
    pub trait Sealed {}

    impl Sealed for () {}
    impl<A> Sealed for (A,) {}
    impl<A, B> Sealed for (A, B) {}
    impl<A, B, C> Sealed for (A, B, C) {}
    impl<A, B, C, D> Sealed for (A, B, C, D) {}
}

/// Payload tuple carried by a channel.
pub trait Payload: sealed::Sealed + 'static {
    /// Number of values in the payload.
    const ARITY: usize;
}

impl Payload for () {
    const ARITY: usize = 0;
}

impl<A: 'static> Payload for (A,) {
    const ARITY: usize = 1;
}

impl<A: 'static, B: 'static> Payload for (A, B) {
    const ARITY: usize = 2;
}

impl<A: 'static, B: 'static, C: 'static> Payload for (A, B, C) {
    const ARITY: usize = 3;
}

impl<A: 'static, B: 'static, C: 'static, D: 'static> Payload for (A, B, C, D) {
    const ARITY: usize = 4;
}

/// Runtime identity of a payload shape.
///
/// Two shapes are equal iff their payload tuples are the same Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    id: TypeId,
    name: &'static str,
    arity: usize,
}

impl Shape {
    /// Returns the shape of payload `P`.
    #[must_use]
    pub fn of<P: Payload>() -> Self {
        Self {
            id: TypeId::of::<P>(),
            name: type_name::<P>(),
            arity: P::ARITY,
        }
    }

    /// Type identity used to key the channel pool.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Human-readable tuple type name, for logs and snapshots.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Number of values in the payload.
    #[must_use]
    pub const fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Conversion of a listener's return value into a delivery outcome.
///
/// Listeners may return `()` (always succeeds) or `Result<(), E>` for any
/// error convertible into [`anyhow::Error`].
pub trait ListenerOutcome {
    /// Converts the value into a delivery result.
    ///
    /// # Errors
    ///
    /// Returns the listener's own error when it reported a failure.
    fn into_result(self) -> anyhow::Result<()>;
}

impl ListenerOutcome for () {
    fn into_result(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<E> ListenerOutcome for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_result(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}

/// Uniform invocation signature for listeners of payload `P`.
pub trait Handler<P>: Send + Sync + 'static {
    /// Invokes the listener with the payload fields.
    ///
    /// # Errors
    ///
    /// Returns whatever error the underlying listener reported.
    fn call(&self, payload: &P) -> anyhow::Result<()>;
}

impl<F, R> Handler<()> for F
where
    F: Fn() -> R + Send + Sync + 'static,
    R: ListenerOutcome,
{
    fn call(&self, _payload: &()) -> anyhow::Result<()> {
        self().into_result()
    }
}

impl<A, F, R> Handler<(A,)> for F
where
    F: Fn(&A) -> R + Send + Sync + 'static,
    R: ListenerOutcome,
{
    fn call(&self, (a,): &(A,)) -> anyhow::Result<()> {
        self(a).into_result()
    }
}

impl<A, B, F, R> Handler<(A, B)> for F
where
    F: Fn(&A, &B) -> R + Send + Sync + 'static,
    R: ListenerOutcome,
{
    fn call(&self, (a, b): &(A, B)) -> anyhow::Result<()> {
        self(a, b).into_result()
    }
}

impl<A, B, C, F, R> Handler<(A, B, C)> for F
where
    F: Fn(&A, &B, &C) -> R + Send + Sync + 'static,
    R: ListenerOutcome,
{
    fn call(&self, (a, b, c): &(A, B, C)) -> anyhow::Result<()> {
        self(a, b, c).into_result()
    }
}

impl<A, B, C, D, F, R> Handler<(A, B, C, D)> for F
where
    F: Fn(&A, &B, &C, &D) -> R + Send + Sync + 'static,
    R: ListenerOutcome,
{
    fn call(&self, (a, b, c, d): &(A, B, C, D)) -> anyhow::Result<()> {
        self(a, b, c, d).into_result()
    }
}
