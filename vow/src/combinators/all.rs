use super::observe;
use crate::deferred::{Deferred, Settled};

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

/// Index-addressed result slots shared by the callbacks of one aggregate.
pub(super) struct Slots<T> {
    values: Vec<Option<T>>,
    remaining: usize,
}

impl<T> Slots<T> {
    pub(super) fn new(len: usize) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            values: (0..len).map(|_| None).collect(),
            remaining: len,
        }))
    }

    /// Stores `value` at `index`, returning every value once all slots are
    /// filled.
    pub(super) fn fill(&mut self, index: usize, value: T) -> Option<Vec<T>> {
        if self.values[index].replace(value).is_none() {
            self.remaining -= 1;
        }

        if self.remaining > 0 {
            return None;
        }

        Some(self.values.drain(..).flatten().collect())
    }
}

/// Waits for every input to fulfill.
///
/// The aggregate fulfills with the values in input order, regardless of the
/// order the inputs settled in. The first rejection rejects the aggregate
/// immediately; later rejections are ignored by it. An empty input fulfills
/// with an empty vector.
///
/// # Examples
///
/// ```rust,ignore
/// let total = vow::all([Deferred::resolved(1), Deferred::resolved(2)])
///     .map(|values| values.iter().sum::<i32>());
/// ```
pub fn all<T, I>(deferreds: I) -> Deferred<Vec<T>>
where
    T: Clone + 'static,
    I: IntoIterator<Item = Deferred<T>>,
{
    let inputs: Vec<Deferred<T>> = deferreds.into_iter().collect();
    let (aggregate, resolver) = Deferred::with_resolvers();

    if inputs.is_empty() {
        resolver.fulfill(Vec::new());
        return aggregate;
    }

    trace!(aggregate.id = %aggregate.id(), inputs = inputs.len(), "all");

    let slots = Slots::new(inputs.len());

    for (index, input) in inputs.iter().enumerate() {
        let slots = slots.clone();
        let on_fulfilled = resolver.clone();
        let on_rejected = resolver.clone();

        observe(
            input,
            move |value| {
                let done = slots.borrow_mut().fill(index, value);
                if let Some(values) = done {
                    on_fulfilled.fulfill(values);
                }
            },
            move |reason| on_rejected.reject(reason),
        );
    }

    aggregate
}

/// Waits for every input to settle and reports each outcome in input order.
///
/// The aggregate never rejects. An empty input fulfills with an empty vector.
pub fn all_settled<T, I>(deferreds: I) -> Deferred<Vec<Settled<T>>>
where
    T: Clone + 'static,
    I: IntoIterator<Item = Deferred<T>>,
{
    let inputs: Vec<Deferred<T>> = deferreds.into_iter().collect();
    let (aggregate, resolver) = Deferred::with_resolvers();

    if inputs.is_empty() {
        resolver.fulfill(Vec::new());
        return aggregate;
    }

    let slots = Slots::new(inputs.len());

    for (index, input) in inputs.iter().enumerate() {
        let fulfilled_slots = slots.clone();
        let rejected_slots = slots.clone();
        let on_fulfilled = resolver.clone();
        let on_rejected = resolver.clone();

        observe(
            input,
            move |value| {
                let done = fulfilled_slots
                    .borrow_mut()
                    .fill(index, Settled::Fulfilled(value));
                if let Some(outcomes) = done {
                    on_fulfilled.fulfill(outcomes);
                }
            },
            move |reason| {
                let done = rejected_slots
                    .borrow_mut()
                    .fill(index, Settled::Rejected(reason));
                if let Some(outcomes) = done {
                    on_rejected.fulfill(outcomes);
                }
            },
        );
    }

    aggregate
}

/// Waits for two deferreds of possibly different types.
///
/// Behaves like [`all`]: fulfills with both values once both fulfill, or
/// rejects with the first rejection. The `all!` macro nests `zip` to join
/// more inputs into a flat tuple.
pub fn zip<A, B>(first: Deferred<A>, second: Deferred<B>) -> Deferred<(A, B)>
where
    A: Clone + 'static,
    B: Clone + 'static,
{
    let (aggregate, resolver) = Deferred::with_resolvers();
    let pair: Rc<RefCell<(Option<A>, Option<B>)>> = Rc::new(RefCell::new((None, None)));

    let first_pair = pair.clone();
    let first_resolver = resolver.clone();
    let first_rejected = resolver.clone();

    observe(
        &first,
        move |a| {
            let mut pair = first_pair.borrow_mut();
            match pair.1.take() {
                Some(b) => first_resolver.fulfill((a, b)),
                None => pair.0 = Some(a),
            }
        },
        move |reason| first_rejected.reject(reason),
    );

    let second_rejected = resolver.clone();

    observe(
        &second,
        move |b| {
            let mut pair = pair.borrow_mut();
            match pair.0.take() {
                Some(a) => resolver.fulfill((a, b)),
                None => pair.1 = Some(b),
            }
        },
        move |reason| second_rejected.reject(reason),
    );

    aggregate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_fill_in_index_order() {
        let slots = Slots::new(3);
        let mut slots = slots.borrow_mut();

        assert!(slots.fill(2, 'c').is_none());
        assert!(slots.fill(0, 'a').is_none());
        assert_eq!(slots.fill(1, 'b'), Some(vec!['a', 'b', 'c']));
    }

    #[test]
    fn refilling_a_slot_does_not_count_twice() {
        let slots = Slots::new(2);
        let mut slots = slots.borrow_mut();

        assert!(slots.fill(0, 1).is_none());
        assert!(slots.fill(0, 2).is_none());
        assert_eq!(slots.fill(1, 3), Some(vec![2, 3]));
    }
}
