use crate::deferred::tracker::UnhandledRejectionHandler;
use crate::runtime::queue::{Job, TaskQueue};

use std::cell::RefCell;

use tracing::trace;

thread_local! {
    /// The current thread's task queue.
    ///
    /// Deferreds are `!Send`, so every deferred created on a thread settles
    /// through that thread's queue; there is no cross-thread scheduling.
    pub(crate) static CURRENT_QUEUE: RefCell<TaskQueue> =
        const { RefCell::new(TaskQueue::new()) };

    /// Hook for rejections nobody handled. `None` means the default
    /// log-and-panic hook.
    pub(crate) static UNHANDLED_REJECTION_HANDLER: RefCell<Option<UnhandledRejectionHandler>> =
        const { RefCell::new(None) };
}

/// Pushes a job onto the microtask lane.
pub(crate) fn enqueue(job: Job) {
    CURRENT_QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        queue.push(job);
        trace!(pending = queue.len(), "job queued");
    });
}

/// Pushes a job that runs only after the current turn has drained.
pub(crate) fn enqueue_next_turn(job: Job) {
    CURRENT_QUEUE.with(|queue| queue.borrow_mut().push_next_turn(job));
}

/// Pops and runs one job.
///
/// The queue is not borrowed while the job runs, so the job is free to
/// queue more work. A panic in the job propagates to the caller.
pub(crate) fn run_next() -> bool {
    let job = CURRENT_QUEUE.with(|queue| queue.borrow_mut().pop());

    match job {
        Some(job) => {
            job();
            true
        }
        None => false,
    }
}

pub(crate) fn pending() -> usize {
    CURRENT_QUEUE.with(|queue| queue.borrow().len())
}

pub(crate) fn turn() -> u64 {
    CURRENT_QUEUE.with(|queue| queue.borrow().turn())
}
