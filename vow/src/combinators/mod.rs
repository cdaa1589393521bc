//! Combinators over groups of deferreds.
//!
//! Every combinator is built on the public [`Deferred`] contract: it attaches
//! `then_or_else` to each input and settles one aggregate deferred. Redundant
//! settle attempts on the aggregate (a second rejection in [`all`], a slower
//! input in [`race`]) are harmless no-ops.
//!
//! - [`resolve`] / [`reject`] — settled constructors
//! - [`all`] — every input fulfills, or the first rejection wins
//! - [`race`] — the first input to settle wins
//! - [`all_settled`] — every outcome, never rejects
//! - [`any`] — the first fulfillment wins
//! - [`zip`] — `all` for two inputs of different types

mod all;
mod race;

pub use all::{all, all_settled, zip};
pub use race::{any, race};

use crate::deferred::{Deferred, Resolution};
use crate::error::Reason;

/// Returns a deferred resolved with `resolution`.
///
/// A [`Deferred`] argument is returned as-is rather than wrapped; a foreign
/// thenable is adopted by a new deferred.
///
/// # Examples
///
/// ```rust,ignore
/// let ready: Deferred<i32> = vow::resolve(1);
///
/// let same: Deferred<i32> = vow::resolve(ready.clone());
/// assert_eq!(same.id(), ready.id());
/// ```
pub fn resolve<T, R>(resolution: R) -> Deferred<T>
where
    T: Clone + 'static,
    R: Into<Resolution<T>>,
{
    match resolution.into() {
        Resolution::Value(value) => Deferred::resolved(value),
        Resolution::Deferred(deferred) => deferred,
        thenable @ Resolution::Thenable(_) => {
            let (deferred, resolver) = Deferred::with_resolvers();
            resolver.resolve(thenable);
            deferred
        }
    }
}

/// Returns a deferred rejected with `reason`.
pub fn reject<T>(reason: impl Into<Reason>) -> Deferred<T>
where
    T: Clone + 'static,
{
    Deferred::rejected(reason)
}

/// Attaches plain callbacks to `input`, discarding the chained deferred.
///
/// The chained deferred always fulfills, so observing an input also counts
/// as handling its rejection.
fn observe<T, F, E>(input: &Deferred<T>, on_fulfilled: F, on_rejected: E)
where
    T: Clone + 'static,
    F: FnOnce(T) + 'static,
    E: FnOnce(Reason) + 'static,
{
    let _: Deferred<()> = input.then_or_else(
        move |value| {
            on_fulfilled(value);
            Ok(())
        },
        move |reason| {
            on_rejected(reason);
            Ok(())
        },
    );
}
