//! Task queue and host-side driving.
//!
//! This module owns the per-thread task queue every deferred schedules its
//! callbacks on, and the entry points a host uses to drain it:
//!
//! - [`tick`] runs a single job, for hosts that interleave the queue with
//!   their own event loop,
//! - [`run_until_idle`] drains everything,
//! - [`Driver`] (built with [`DriverBuilder`]) adds a task budget, a scoped
//!   unhandled-rejection hook and [`Driver::block_on`].
//!
//! It also exposes the process-wide [`install`] / [`uninstall`] binding used
//! by test harnesses.

mod core;
mod global;
mod queue;

pub(crate) mod builder;
pub(crate) mod context;

pub use builder::DriverBuilder;
pub use self::core::Driver;
pub use global::{InstallGuard, install, is_installed, uninstall};

/// Pops and runs one job from the current thread's queue.
///
/// Returns `false` if there was nothing to run.
pub fn tick() -> bool {
    context::run_next()
}

/// Runs jobs until the current thread's queue is empty.
///
/// Returns the number of jobs run. Unlike [`Driver::run_until_idle`], there
/// is no budget.
pub fn run_until_idle() -> usize {
    let mut ran = 0;
    while context::run_next() {
        ran += 1;
    }
    ran
}

/// Number of jobs waiting in the current thread's queue.
pub fn pending_tasks() -> usize {
    context::pending()
}

/// Returns `true` if the current thread's queue is empty.
pub fn is_idle() -> bool {
    context::CURRENT_QUEUE.with(|queue| queue.borrow().is_empty())
}

/// Number of completed turns on the current thread.
pub fn current_turn() -> u64 {
    context::turn()
}
