//! Unhandled-rejection tracking.
//!
//! A deferred rejected with nothing attached is marked and re-checked on the
//! task queue's next-turn lane, which only runs once every job queued before
//! it (and every job those jobs queue) has finished. Handlers attached in the
//! same turn as the rejection therefore never trigger a report.
//!
//! If the mark survives until the check, the thread's reporting hook is
//! called exactly once with the reason. The default hook logs the reason and
//! panics, so the failure surfaces from the driver call to the host.

use super::Deferred;
use crate::error::{Error, Reason};
use crate::runtime::context::{self, UNHANDLED_REJECTION_HANDLER};

use std::rc::Rc;

use tracing::{error, trace};

/// Hook invoked with the reason of every unhandled rejection.
pub type UnhandledRejectionHandler = Rc<dyn Fn(&Reason)>;

/// Schedules the next-turn check for a freshly rejected deferred.
pub(crate) fn watch<T: Clone + 'static>(deferred: Deferred<T>) {
    trace!(deferred.id = %deferred.id(), "rejection marked unhandled");

    context::enqueue_next_turn(Box::new(move || {
        if let Some(reason) = deferred.take_unhandled() {
            report(deferred.id(), &reason);
        }
    }));
}

fn report(id: super::DeferredId, reason: &Reason) {
    let handler = UNHANDLED_REJECTION_HANDLER.with(|cell| cell.borrow().clone());

    match handler {
        Some(handler) => {
            trace!(deferred.id = %id, %reason, "reporting unhandled rejection");
            handler(reason);
        }
        None => default_handler(id, reason),
    }
}

fn default_handler(id: super::DeferredId, reason: &Reason) {
    error!(deferred.id = %id, %reason, "unhandled rejection");
    panic!("{}", Error::UnhandledRejection(reason.to_string()));
}

/// Replaces the current thread's unhandled-rejection hook.
///
/// Returns the previously installed hook, if any.
///
/// # Examples
///
/// ```rust,ignore
/// vow::set_unhandled_rejection_handler(|reason| {
///     tracing::warn!(%reason, "ignored rejection");
/// });
/// ```
pub fn set_unhandled_rejection_handler<F>(handler: F) -> Option<UnhandledRejectionHandler>
where
    F: Fn(&Reason) + 'static,
{
    replace_handler(Some(Rc::new(handler)))
}

/// Removes the current thread's hook, restoring the default
/// log-and-panic behavior.
pub fn take_unhandled_rejection_handler() -> Option<UnhandledRejectionHandler> {
    replace_handler(None)
}

pub(crate) fn replace_handler(
    handler: Option<UnhandledRejectionHandler>,
) -> Option<UnhandledRejectionHandler> {
    UNHANDLED_REJECTION_HANDLER.with(|cell| cell.replace(handler))
}
