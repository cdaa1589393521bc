use super::{Resolution, Resolver, Settled};
use crate::error::{Error, Reason, panic_message};
use crate::runtime::context;

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// Type-erased handle to the deferred an entry settles.
///
/// Only used to tear down pending chains without recursion: a deferred's
/// `Drop` walks these links with an explicit worklist instead of letting
/// each child drop its own children.
pub(crate) trait Link {
    /// Takes every pending entry, pushing their child links onto `links`.
    ///
    /// The entries themselves are dropped before this returns.
    fn detach(&self, links: &mut Vec<Rc<dyn Link>>);
}

/// A pair of continuations waiting on a deferred.
///
/// The boxed closures capture the [`Resolver`] of the child deferred the
/// entry settles, and `child` names that same deferred. Parents point to
/// children only, so there are no back-pointers and no reference cycles.
///
/// An entry is consumed exactly once, by the queued job that runs it.
pub(crate) struct CallbackEntry<T> {
    on_fulfilled: Box<dyn FnOnce(T)>,
    on_rejected: Box<dyn FnOnce(Reason)>,
    child: Option<Rc<dyn Link>>,
}

impl<T> CallbackEntry<T> {
    /// Drops the continuations and returns the child link.
    ///
    /// The continuations go first, so a returned link that is the last
    /// strong handle can be detached without recursing into the child.
    pub(crate) fn into_child(self) -> Option<Rc<dyn Link>> {
        let CallbackEntry {
            on_fulfilled,
            on_rejected,
            child,
        } = self;

        drop(on_fulfilled);
        drop(on_rejected);
        child
    }
}

impl<T: 'static> CallbackEntry<T> {
    pub(crate) fn new(
        on_fulfilled: Box<dyn FnOnce(T)>,
        on_rejected: Box<dyn FnOnce(Reason)>,
        child: Option<Rc<dyn Link>>,
    ) -> Self {
        Self {
            on_fulfilled,
            on_rejected,
            child,
        }
    }

    /// Pushes a job that feeds `settled` to the matching continuation.
    ///
    /// The continuations keep the child alive on their own, so the link is
    /// released here.
    pub(crate) fn schedule(self, settled: Settled<T>) {
        let CallbackEntry {
            on_fulfilled,
            on_rejected,
            child,
        } = self;
        drop(child);

        context::enqueue(Box::new(move || match settled {
            Settled::Fulfilled(value) => on_fulfilled(value),
            Settled::Rejected(reason) => on_rejected(reason),
        }));
    }
}

/// Drops the entries of a dying deferred and everything they uniquely own.
///
/// Each link popped from the worklist is either shared (dropping it just
/// decrements a count) or the last handle to its deferred, whose entries are
/// detached first so its own `Drop` finds nothing left to walk.
pub(crate) fn release<T>(entries: Vec<CallbackEntry<T>>) {
    let mut links: Vec<Rc<dyn Link>> = entries
        .into_iter()
        .filter_map(CallbackEntry::into_child)
        .collect();

    while let Some(link) = links.pop() {
        if Rc::strong_count(&link) == 1 {
            link.detach(&mut links);
        }
    }
}

/// Wraps a user continuation so its result settles `child`.
///
/// `Ok` resolves the child (thenables are adopted), `Err` rejects it, and a
/// panic rejects it with [`Error::Panicked`].
pub(crate) fn continuation<A, U, R, F>(callback: F, child: Resolver<U>) -> Box<dyn FnOnce(A)>
where
    A: 'static,
    U: Clone + 'static,
    R: Into<Resolution<U>>,
    F: FnOnce(A) -> Result<R, Reason> + 'static,
{
    Box::new(move |argument| {
        match panic::catch_unwind(AssertUnwindSafe(move || callback(argument))) {
            Ok(Ok(resolution)) => child.resolve(resolution),
            Ok(Err(reason)) => child.reject(reason),
            Err(payload) => child.reject(Error::Panicked(panic_message(&*payload))),
        }
    })
}

/// Forwards a fulfillment to `child` unchanged.
pub(crate) fn forward_fulfillment<T: Clone + 'static>(child: Resolver<T>) -> Box<dyn FnOnce(T)> {
    Box::new(move |value| child.fulfill(value))
}

/// Forwards a rejection to `child` unchanged.
pub(crate) fn forward_rejection<T: Clone + 'static>(
    child: Resolver<T>,
) -> Box<dyn FnOnce(Reason)> {
    Box::new(move |reason| child.reject(reason))
}
