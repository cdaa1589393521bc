//! The deferred value and its settlement machinery.
//!
//! A [`Deferred`] moves through a small state machine:
//!
//! ```text
//! Pending ──► Blocked ──► Fulfilled | Rejected
//!    └──────────────────► Fulfilled | Rejected
//! ```
//!
//! `Blocked` is entered only when a deferred is resolved with another
//! thenable; it is left only when that thenable delivers its outcome.
//! Terminal states never change again.
//!
//! Continuations attached with [`Deferred::then`] and friends are stored as
//! callback entries and pushed onto the thread's task queue when the deferred
//! settles, in attachment order. They never run inside the call that attaches
//! them, even when the deferred has already settled.

mod entry;
mod resolution;
mod state;

pub(crate) mod tracker;

pub(crate) use entry::CallbackEntry;

use entry::Link;

pub use resolution::{Resolution, ThenCapable};
pub use state::{Settled, StateKind};

use state::State;

use crate::error::{Error, Reason, panic_message};
use crate::runtime::context;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

/// Process-unique identity of a deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeferredId(u64);

impl DeferredId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        DeferredId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DeferredId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Inner<T> {
    id: DeferredId,

    state: State<T>,

    /// Entries attached while pending, in attachment order.
    callbacks: Vec<CallbackEntry<T>>,

    /// Set once `callbacks` has been flushed onto the task queue; entries
    /// attached afterwards are pushed directly.
    scheduled: bool,

    /// Set when rejected with nothing attached; cleared by the first
    /// attachment or by the tracker's report.
    unhandled: bool,
}

impl<T> Link for RefCell<Inner<T>> {
    fn detach(&self, links: &mut Vec<Rc<dyn Link>>) {
        let Ok(mut inner) = self.try_borrow_mut() else {
            return;
        };
        let entries = mem::take(&mut inner.callbacks);
        drop(inner);

        links.extend(entries.into_iter().filter_map(CallbackEntry::into_child));
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        if !self.callbacks.is_empty() {
            entry::release(mem::take(&mut self.callbacks));
        }
    }
}

/// A single-threaded deferred value.
///
/// `Deferred` is a cheap, clonable handle; clones observe the same state.
/// A deferred settles at most once, either fulfilled with a `T` or rejected
/// with a [`Reason`].
///
/// # Examples
///
/// ```rust,ignore
/// let doubled = Deferred::resolved(21).map(|n| n * 2);
///
/// let driver = DriverBuilder::new().build();
/// assert_eq!(driver.block_on(&doubled).unwrap(), 42);
/// ```
pub struct Deferred<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Deferred")
            .field("id", &inner.id)
            .field("state", &inner.state.kind())
            .field("callbacks", &inner.callbacks.len())
            .finish()
    }
}

impl<T: Clone + 'static> Deferred<T> {
    /// Creates a deferred and runs `resolver` synchronously.
    ///
    /// The resolver receives a [`Resolver`] handle carrying both settle
    /// continuations. If it returns `Err` or panics, the deferred is
    /// rejected with that reason, unless the resolver already settled it.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let deferred = Deferred::new(|resolver| {
    ///     resolver.fulfill(5);
    ///     Ok(())
    /// });
    /// ```
    pub fn new<F>(resolver: F) -> Self
    where
        F: FnOnce(Resolver<T>) -> Result<(), Reason>,
    {
        let (deferred, handle) = Self::with_resolvers();

        match panic::catch_unwind(AssertUnwindSafe(move || resolver(handle))) {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => deferred.reject_with(reason),
            Err(payload) => {
                deferred.reject_with(Error::Panicked(panic_message(&*payload)).into())
            }
        }

        deferred
    }

    /// Creates a pending deferred together with its resolver.
    pub fn with_resolvers() -> (Self, Resolver<T>) {
        let id = DeferredId::next();
        trace!(deferred.id = %id, "deferred created");

        let deferred = Self {
            inner: Rc::new(RefCell::new(Inner {
                id,
                state: State::Pending,
                callbacks: Vec::new(),
                scheduled: false,
                unhandled: false,
            })),
        };

        let resolver = Resolver {
            deferred: deferred.clone(),
        };

        (deferred, resolver)
    }

    /// Creates a deferred already fulfilled with `value`.
    pub fn resolved(value: T) -> Self {
        let (deferred, resolver) = Self::with_resolvers();
        resolver.fulfill(value);
        deferred
    }

    /// Creates a deferred already rejected with `reason`.
    pub fn rejected(reason: impl Into<Reason>) -> Self {
        let (deferred, resolver) = Self::with_resolvers();
        resolver.reject(reason);
        deferred
    }

    pub fn id(&self) -> DeferredId {
        self.inner.borrow().id
    }

    /// Returns the current lifecycle stage.
    pub fn state(&self) -> StateKind {
        self.inner.borrow().state.kind()
    }

    pub fn is_pending(&self) -> bool {
        !self.state().is_settled()
    }

    pub fn is_settled(&self) -> bool {
        self.state().is_settled()
    }

    /// Returns a copy of the outcome if the deferred has settled.
    ///
    /// Peeking does not count as handling a rejection.
    pub fn peek(&self) -> Option<Settled<T>> {
        self.inner.borrow().state.settled()
    }

    /// Attaches a fulfillment continuation.
    ///
    /// The returned deferred is resolved with whatever `on_fulfilled` returns
    /// (a returned deferred or thenable is adopted), or rejected with its
    /// `Err`. A rejection of `self` passes through unchanged.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let parsed: Deferred<u32> = Deferred::resolved("42")
    ///     .then(|text| text.parse::<u32>().map_err(|e| Reason::new(e)));
    /// ```
    pub fn then<U, R, F>(&self, on_fulfilled: F) -> Deferred<U>
    where
        U: Clone + 'static,
        R: Into<Resolution<U>>,
        F: FnOnce(T) -> Result<R, Reason> + 'static,
    {
        let (child, resolver) = Deferred::with_resolvers();

        self.subscribe(CallbackEntry::new(
            entry::continuation(on_fulfilled, resolver.clone()),
            entry::forward_rejection(resolver),
            Some(child.link()),
        ));

        child
    }

    /// Attaches both a fulfillment and a rejection continuation.
    pub fn then_or_else<U, R, S, F, E>(&self, on_fulfilled: F, on_rejected: E) -> Deferred<U>
    where
        U: Clone + 'static,
        R: Into<Resolution<U>>,
        S: Into<Resolution<U>>,
        F: FnOnce(T) -> Result<R, Reason> + 'static,
        E: FnOnce(Reason) -> Result<S, Reason> + 'static,
    {
        let (child, resolver) = Deferred::with_resolvers();

        self.subscribe(CallbackEntry::new(
            entry::continuation(on_fulfilled, resolver.clone()),
            entry::continuation(on_rejected, resolver),
            Some(child.link()),
        ));

        child
    }

    /// Attaches a rejection continuation; a fulfillment passes through.
    pub fn catch<R, E>(&self, on_rejected: E) -> Deferred<T>
    where
        R: Into<Resolution<T>>,
        E: FnOnce(Reason) -> Result<R, Reason> + 'static,
    {
        let (child, resolver) = Deferred::with_resolvers();

        self.subscribe(CallbackEntry::new(
            entry::forward_fulfillment(resolver.clone()),
            entry::continuation(on_rejected, resolver),
            Some(child.link()),
        ));

        child
    }

    /// Maps the fulfillment value.
    pub fn map<U, F>(&self, f: F) -> Deferred<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> U + 'static,
    {
        self.then(move |value| Ok(Resolution::Value(f(value))))
    }

    /// Chains a computation that itself produces a deferred.
    pub fn and_then<U, F>(&self, f: F) -> Deferred<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Deferred<U> + 'static,
    {
        self.then(move |value| Ok(Resolution::Deferred(f(value))))
    }

    /// Runs `on_settled` on either outcome and passes the outcome through.
    ///
    /// If `on_settled` panics, the returned deferred is rejected with
    /// [`Error::Panicked`] instead.
    pub fn finally<F>(&self, on_settled: F) -> Deferred<T>
    where
        F: FnOnce() + 'static,
    {
        let callback = Rc::new(Cell::new(Some(on_settled)));
        let on_rejection = callback.clone();

        self.then_or_else(
            move |value| {
                if let Some(f) = callback.take() {
                    f();
                }
                Ok(Resolution::Value(value))
            },
            move |reason| {
                if let Some(f) = on_rejection.take() {
                    f();
                }
                Err::<Resolution<T>, _>(reason)
            },
        )
    }

    /// Attaches an entry, scheduling it right away if already settled.
    pub(crate) fn subscribe(&self, entry: CallbackEntry<T>) {
        let mut inner = self.inner.borrow_mut();

        let Some(settled) = inner.state.settled() else {
            inner.callbacks.push(entry);
            return;
        };

        debug_assert!(inner.scheduled);

        if settled.is_rejected() && inner.unhandled {
            trace!(deferred.id = %inner.id, "rejection handled late");
            inner.unhandled = false;
        }

        drop(inner);
        entry.schedule(settled);
    }

    /// Type-erased handle used by entries that settle this deferred.
    fn link(&self) -> Rc<dyn Link> {
        self.inner.clone()
    }

    /// Clears the unhandled flag, returning the reason if it was set.
    pub(crate) fn take_unhandled(&self) -> Option<Reason> {
        let mut inner = self.inner.borrow_mut();

        if !mem::take(&mut inner.unhandled) {
            return None;
        }

        match &inner.state {
            State::Rejected(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Resolves from outside: a no-op unless still `Pending`.
    fn resolve_with(&self, resolution: Resolution<T>) {
        if !self.is_unresolved() {
            trace!(deferred.id = %self.id(), "redundant resolve ignored");
            return;
        }

        match resolution {
            Resolution::Value(value) => self.complete(Settled::Fulfilled(value)),
            Resolution::Deferred(other) => self.adopt_deferred(other),
            Resolution::Thenable(thenable) => self.adopt_thenable(thenable),
        }
    }

    /// Rejects from outside: a no-op unless still `Pending`.
    fn reject_with(&self, reason: Reason) {
        if !self.is_unresolved() {
            trace!(deferred.id = %self.id(), "redundant reject ignored");
            return;
        }

        self.complete(Settled::Rejected(reason));
    }

    fn is_unresolved(&self) -> bool {
        matches!(self.inner.borrow().state, State::Pending)
    }

    fn adopt_deferred(&self, other: Deferred<T>) {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            debug!(deferred.id = %self.id(), "deferred resolved with itself");
            self.complete(Settled::Rejected(Error::SelfResolution.into()));
            return;
        }

        debug!(deferred.id = %self.id(), adopted.id = %other.id(), "blocked on deferred");
        self.inner.borrow_mut().state = State::Blocked;

        let (on_fulfilled, on_rejected) = self.unblockers();
        other.subscribe(CallbackEntry::new(on_fulfilled, on_rejected, Some(self.link())));
    }

    /// Foreign thenables are invoked from a queued job, so adopting one never
    /// runs foreign code inside the resolving call.
    fn adopt_thenable(&self, thenable: Box<dyn ThenCapable<T>>) {
        if thenable.deferred_id() == Some(self.id()) {
            debug!(deferred.id = %self.id(), "deferred resolved with itself as a thenable");
            self.complete(Settled::Rejected(Error::SelfResolution.into()));
            return;
        }

        debug!(deferred.id = %self.id(), "blocked on foreign thenable");
        self.inner.borrow_mut().state = State::Blocked;

        let (on_fulfilled, on_rejected) = self.unblockers();
        let this = self.clone();

        context::enqueue(Box::new(move || {
            let invoke = AssertUnwindSafe(move || thenable.then_with(on_fulfilled, on_rejected));

            if let Err(payload) = panic::catch_unwind(invoke) {
                this.unblock(Settled::Rejected(
                    Error::Panicked(panic_message(&*payload)).into(),
                ));
            }
        }));
    }

    fn unblockers(&self) -> (Box<dyn FnOnce(T)>, Box<dyn FnOnce(Reason)>) {
        let fulfilled = self.clone();
        let rejected = self.clone();

        (
            Box::new(move |value| fulfilled.unblock(Settled::Fulfilled(value))),
            Box::new(move |reason| rejected.unblock(Settled::Rejected(reason))),
        )
    }

    /// Completes a `Blocked` deferred with the adopted outcome.
    fn unblock(&self, settled: Settled<T>) {
        if !matches!(self.inner.borrow().state, State::Blocked) {
            trace!(deferred.id = %self.id(), "late thenable delivery ignored");
            return;
        }

        self.complete(settled);
    }

    /// Moves to a terminal state and flushes the pending entries.
    fn complete(&self, settled: Settled<T>) {
        let (id, entries, unhandled) = {
            let mut inner = self.inner.borrow_mut();

            let entries = mem::take(&mut inner.callbacks);
            let unhandled = settled.is_rejected() && entries.is_empty();

            inner.state = State::from(settled.clone());
            inner.scheduled = true;
            inner.unhandled = unhandled;

            (inner.id, entries, unhandled)
        };

        trace!(
            deferred.id = %id,
            fulfilled = settled.is_fulfilled(),
            callbacks = entries.len(),
            "deferred settled"
        );

        for entry in entries {
            entry.schedule(settled.clone());
        }

        if unhandled {
            tracker::watch(self.clone());
        }
    }
}

impl<T: Clone + 'static> ThenCapable<T> for Deferred<T> {
    fn then_with(
        self: Box<Self>,
        on_fulfilled: Box<dyn FnOnce(T)>,
        on_rejected: Box<dyn FnOnce(Reason)>,
    ) {
        self.subscribe(CallbackEntry::new(on_fulfilled, on_rejected, None));
    }

    fn deferred_id(&self) -> Option<DeferredId> {
        Some(self.id())
    }
}

/// The settle continuations of a [`Deferred`].
///
/// Only the first call that reaches a pending deferred has any effect;
/// later calls, including those made after the deferred adopted a thenable,
/// are silently ignored.
pub struct Resolver<T> {
    deferred: Deferred<T>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            deferred: self.deferred.clone(),
        }
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("deferred", &self.deferred)
            .finish()
    }
}

impl<T: Clone + 'static> Resolver<T> {
    /// Fulfills the deferred with a plain value.
    pub fn fulfill(&self, value: T) {
        self.deferred.resolve_with(Resolution::Value(value));
    }

    /// Resolves the deferred, adopting deferreds and thenables.
    pub fn resolve(&self, resolution: impl Into<Resolution<T>>) {
        self.deferred.resolve_with(resolution.into());
    }

    /// Rejects the deferred.
    pub fn reject(&self, reason: impl Into<Reason>) {
        self.deferred.reject_with(reason.into());
    }

    /// Returns the identity of the deferred this resolver settles.
    pub fn id(&self) -> DeferredId {
        self.deferred.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime;

    #[test]
    fn resolver_settles_exactly_once() {
        let (deferred, resolver) = Deferred::with_resolvers();

        resolver.fulfill(1);
        resolver.fulfill(2);
        resolver.reject("late");

        assert_eq!(deferred.state(), StateKind::Fulfilled);
        assert!(matches!(deferred.peek(), Some(Settled::Fulfilled(1))));
    }

    #[test]
    fn blocked_deferred_ignores_external_settlement() {
        let (inner, inner_resolver) = Deferred::<i32>::with_resolvers();
        let (outer, outer_resolver) = Deferred::<i32>::with_resolvers();

        outer_resolver.resolve(inner.clone());
        assert_eq!(outer.state(), StateKind::Blocked);

        outer_resolver.fulfill(99);
        assert_eq!(outer.state(), StateKind::Blocked);

        inner_resolver.fulfill(7);
        runtime::run_until_idle();

        assert!(matches!(outer.peek(), Some(Settled::Fulfilled(7))));
    }

    #[test]
    fn entries_flush_at_settlement() {
        let (deferred, resolver) = Deferred::<u8>::with_resolvers();
        let _a = deferred.map(|v| v);
        let _b = deferred.map(|v| v);

        assert_eq!(deferred.inner.borrow().callbacks.len(), 2);
        assert!(!deferred.inner.borrow().scheduled);

        resolver.fulfill(3);

        assert!(deferred.inner.borrow().callbacks.is_empty());
        assert!(deferred.inner.borrow().scheduled);
        assert_eq!(runtime::pending_tasks(), 2);

        runtime::run_until_idle();
    }

    #[test]
    fn ids_are_unique() {
        let a = Deferred::resolved(());
        let b = a.clone();
        let c = Deferred::resolved(());

        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }
}
