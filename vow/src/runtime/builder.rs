use super::Driver;
use crate::deferred::tracker::UnhandledRejectionHandler;
use crate::error::Reason;

use std::rc::Rc;

/// Builder for configuring and creating a [`Driver`].
///
/// # Examples
///
/// ```rust,ignore
/// let driver = DriverBuilder::new()
///     .max_tasks_per_drain(10_000)
///     .unhandled_rejection_handler(|reason| eprintln!("unhandled: {reason}"))
///     .build();
/// ```
pub struct DriverBuilder {
    /// Upper bound on jobs run by a single `run_until_idle` call.
    max_tasks_per_drain: Option<usize>,

    /// Hook installed for the driver's lifetime.
    unhandled_rejection_handler: Option<UnhandledRejectionHandler>,
}

impl DriverBuilder {
    /// Creates a builder with no task budget and the default
    /// unhandled-rejection hook.
    pub fn new() -> Self {
        Self {
            max_tasks_per_drain: None,
            unhandled_rejection_handler: None,
        }
    }

    /// Caps the number of jobs a single drain may run.
    ///
    /// Useful to turn a runaway chain of self-rescheduling callbacks into
    /// an error instead of a hang.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn max_tasks_per_drain(mut self, n: usize) -> Self {
        assert!(n > 0, "max_tasks_per_drain must be > 0");

        self.max_tasks_per_drain = Some(n);
        self
    }

    /// Installs `handler` as the unhandled-rejection hook while the driver
    /// is alive. The previous hook is restored when the driver is dropped.
    pub fn unhandled_rejection_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Reason) + 'static,
    {
        self.unhandled_rejection_handler = Some(Rc::new(handler));
        self
    }

    pub fn build(self) -> Driver {
        Driver::new(self.max_tasks_per_drain, self.unhandled_rejection_handler)
    }
}

impl Default for DriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}
