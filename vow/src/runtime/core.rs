use super::context;
use crate::deferred::tracker::{self, UnhandledRejectionHandler};
use crate::deferred::{Deferred, Settled};
use crate::error::{Error, Reason};

use tracing::warn;

/// Host-side handle that drives the current thread's task queue.
///
/// The scheduler never runs jobs on its own: the host calls [`tick`] from
/// its event loop, or uses [`run_until_idle`] / [`block_on`] to drain the
/// queue in one go.
///
/// Dropping the driver restores the unhandled-rejection hook that was active
/// before it was built.
///
/// [`tick`]: Self::tick
/// [`run_until_idle`]: Self::run_until_idle
/// [`block_on`]: Self::block_on
pub struct Driver {
    budget: Option<usize>,

    /// Hook displaced by the builder's hook, restored on drop.
    displaced: Option<Option<UnhandledRejectionHandler>>,
}

impl Driver {
    pub(crate) fn new(
        budget: Option<usize>,
        handler: Option<UnhandledRejectionHandler>,
    ) -> Self {
        let displaced = handler.map(|handler| tracker::replace_handler(Some(handler)));

        Self { budget, displaced }
    }

    /// Pops and runs one queued job.
    ///
    /// Returns `false` if the queue was empty.
    ///
    /// # Panics
    ///
    /// Propagates panics from the job, including the default
    /// unhandled-rejection hook.
    pub fn tick(&self) -> bool {
        context::run_next()
    }

    /// Runs jobs until both queue lanes are empty.
    ///
    /// Returns the number of jobs run, or [`Error::BudgetExhausted`] if the
    /// configured budget ran out first.
    pub fn run_until_idle(&self) -> Result<usize, Error> {
        let mut ran = 0;

        loop {
            if let Some(budget) = self.budget {
                if ran >= budget && context::pending() > 0 {
                    warn!(budget, pending = context::pending(), "task budget exhausted");
                    return Err(Error::BudgetExhausted { budget });
                }
            }

            if !context::run_next() {
                return Ok(ran);
            }

            ran += 1;
        }
    }

    /// Runs jobs until `deferred` settles and returns its outcome.
    ///
    /// Observing a rejection here counts as handling it. If the queue goes
    /// idle first, the result is a rejection carrying [`Error::Stalled`].
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let driver = DriverBuilder::new().build();
    /// let value = driver.block_on(&Deferred::resolved(1).map(|n| n + 1));
    /// assert_eq!(value.unwrap(), 2);
    /// ```
    pub fn block_on<T: Clone + 'static>(&self, deferred: &Deferred<T>) -> Result<T, Reason> {
        let mut ran = 0;

        loop {
            if let Some(settled) = deferred.peek() {
                if let Settled::Rejected(_) = settled {
                    deferred.take_unhandled();
                }
                return settled.into_result();
            }

            if let Some(budget) = self.budget {
                if ran >= budget && context::pending() > 0 {
                    warn!(budget, deferred.id = %deferred.id(), "task budget exhausted while blocking");
                    return Err(Error::BudgetExhausted { budget }.into());
                }
            }

            if !context::run_next() {
                warn!(deferred.id = %deferred.id(), "queue idle with deferred still pending");
                return Err(Error::Stalled.into());
            }

            ran += 1;
        }
    }

    /// Number of jobs waiting in the queue.
    pub fn pending_tasks(&self) -> usize {
        context::pending()
    }

    /// Number of completed turns on this thread.
    pub fn turn(&self) -> u64 {
        context::turn()
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        if let Some(previous) = self.displaced.take() {
            tracker::replace_handler(previous);
        }
    }
}
