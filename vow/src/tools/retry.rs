use crate::deferred::Deferred;

use tracing::debug;

/// Retries a deferred operation on rejection.
///
/// `factory` is called once up front and again after each rejection, up to
/// `times` extra attempts. The returned deferred adopts the first attempt
/// that fulfills, or rejects with the reason of the last attempt.
///
/// Each retry starts from a rejection continuation, so attempts never run
/// inside the call that observed the previous failure.
///
/// # Examples
///
/// ```rust,ignore
/// let fetched = retry(3, move || fetch_config());
/// ```
pub fn retry<T, G>(times: usize, factory: G) -> Deferred<T>
where
    T: Clone + 'static,
    G: FnMut() -> Deferred<T> + 'static,
{
    attempt(factory, times, 1)
}

fn attempt<T, G>(mut factory: G, remaining: usize, number: usize) -> Deferred<T>
where
    T: Clone + 'static,
    G: FnMut() -> Deferred<T> + 'static,
{
    let current = factory();

    current.catch(move |reason| {
        if remaining == 0 {
            debug!(attempts = number, %reason, "retries exhausted");
            return Err(reason);
        }

        debug!(attempt = number, remaining, %reason, "attempt rejected, retrying");
        Ok(attempt(factory, remaining - 1, number + 1))
    })
}
