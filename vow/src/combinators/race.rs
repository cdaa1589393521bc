use super::all::Slots;
use super::observe;
use crate::deferred::Deferred;
use crate::error::{Error, Reason};

use tracing::{debug, trace};

/// Settles like whichever input settles first.
///
/// Inputs that settle later are ignored by the aggregate.
///
/// An empty input leaves the aggregate pending forever. This is not an
/// error, but anything waiting on the aggregate will never run.
///
/// # Examples
///
/// ```rust,ignore
/// let (slow, _slow_resolver) = Deferred::<&str>::with_resolvers();
/// let winner = vow::race([slow, Deferred::resolved("fast")]);
/// ```
pub fn race<T, I>(deferreds: I) -> Deferred<T>
where
    T: Clone + 'static,
    I: IntoIterator<Item = Deferred<T>>,
{
    let (aggregate, resolver) = Deferred::with_resolvers();
    let mut inputs = 0usize;

    for input in deferreds {
        inputs += 1;

        let on_fulfilled = resolver.clone();
        let on_rejected = resolver.clone();

        observe(
            &input,
            move |value| on_fulfilled.fulfill(value),
            move |reason| on_rejected.reject(reason),
        );
    }

    if inputs == 0 {
        debug!(aggregate.id = %aggregate.id(), "race over no inputs will never settle");
    } else {
        trace!(aggregate.id = %aggregate.id(), inputs, "race");
    }

    aggregate
}

/// Fulfills with the first input to fulfill.
///
/// If every input rejects, the aggregate rejects with
/// [`Error::AllRejected`] carrying the reasons in input order. An empty input
/// rejects immediately with an empty list.
pub fn any<T, I>(deferreds: I) -> Deferred<T>
where
    T: Clone + 'static,
    I: IntoIterator<Item = Deferred<T>>,
{
    let inputs: Vec<Deferred<T>> = deferreds.into_iter().collect();
    let (aggregate, resolver) = Deferred::with_resolvers();

    if inputs.is_empty() {
        resolver.reject(Error::AllRejected(Vec::new()));
        return aggregate;
    }

    let reasons = Slots::<Reason>::new(inputs.len());

    for (index, input) in inputs.iter().enumerate() {
        let reasons = reasons.clone();
        let on_fulfilled = resolver.clone();
        let on_rejected = resolver.clone();

        observe(
            input,
            move |value| on_fulfilled.fulfill(value),
            move |reason| {
                let collected = reasons.borrow_mut().fill(index, reason);
                if let Some(collected) = collected {
                    on_rejected.reject(Error::AllRejected(collected));
                }
            },
        );
    }

    aggregate
}
