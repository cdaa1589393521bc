use super::{Deferred, DeferredId};
use crate::error::Reason;

/// Anything exposing a `then`-shaped capability.
///
/// A thenable is treated as "another pending computation": resolving a
/// [`Deferred`] with one blocks the deferred until the thenable calls exactly
/// one of the two continuations. Calls after the first are ignored.
///
/// [`Deferred`] itself implements this trait, but deferreds are normally
/// passed as [`Resolution::Deferred`] so they are subscribed without an
/// extra queue hop. Either way, a deferred resolved with itself is rejected.
pub trait ThenCapable<T> {
    /// Registers the continuations that receive the thenable's outcome.
    fn then_with(
        self: Box<Self>,
        on_fulfilled: Box<dyn FnOnce(T)>,
        on_rejected: Box<dyn FnOnce(Reason)>,
    );

    /// Identity of the deferred behind this thenable, if it is one.
    ///
    /// Used to detect a deferred being resolved with itself.
    fn deferred_id(&self) -> Option<DeferredId> {
        None
    }
}

/// What a deferred is resolved with.
///
/// Plain values settle immediately; deferreds and foreign thenables are
/// adopted, one queue hop per level of nesting.
pub enum Resolution<T> {
    /// A plain value. Fulfills directly.
    Value(T),

    /// Another deferred of the same type.
    Deferred(Deferred<T>),

    /// A foreign thenable.
    Thenable(Box<dyn ThenCapable<T>>),
}

impl<T> Resolution<T> {
    /// Wraps a foreign thenable.
    pub fn thenable<C>(thenable: C) -> Self
    where
        C: ThenCapable<T> + 'static,
    {
        Resolution::Thenable(Box::new(thenable))
    }
}

impl<T> From<T> for Resolution<T> {
    fn from(value: T) -> Self {
        Resolution::Value(value)
    }
}

impl<T> From<Deferred<T>> for Resolution<T> {
    fn from(deferred: Deferred<T>) -> Self {
        Resolution::Deferred(deferred)
    }
}

impl<T> From<Box<dyn ThenCapable<T>>> for Resolution<T> {
    fn from(thenable: Box<dyn ThenCapable<T>>) -> Self {
        Resolution::Thenable(thenable)
    }
}
