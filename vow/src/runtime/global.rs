use crate::error::Error;

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

/// Process-wide "this implementation is the active deferred type" binding.
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Registers this implementation as the process's active deferred type.
///
/// Intended for test harnesses that swap a host's native future type for
/// this one. The binding is bookkeeping only; nothing in the scheduler
/// consults it.
///
/// # Errors
///
/// Returns [`Error::AlreadyInstalled`] if the binding is already held.
pub fn install() -> Result<InstallGuard, Error> {
    INSTALLED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .map_err(|_| Error::AlreadyInstalled)?;

    debug!("deferred implementation installed");
    Ok(InstallGuard { _private: () })
}

/// Releases the binding taken by [`install`].
///
/// # Errors
///
/// Returns [`Error::NotInstalled`] if nothing is installed.
pub fn uninstall() -> Result<(), Error> {
    INSTALLED
        .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
        .map_err(|_| Error::NotInstalled)?;

    debug!("deferred implementation uninstalled");
    Ok(())
}

pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::Acquire)
}

/// Keeps the binding installed until dropped.
///
/// Calling [`uninstall`] explicitly first is allowed; the guard then does
/// nothing on drop.
#[must_use = "dropping the guard uninstalls immediately"]
pub struct InstallGuard {
    _private: (),
}

impl InstallGuard {
    /// Releases the binding and reports whether it was still held.
    pub fn release(self) -> bool {
        let released = uninstall().is_ok();
        std::mem::forget(self);
        released
    }
}

impl Drop for InstallGuard {
    fn drop(&mut self) {
        let _ = uninstall();
    }
}
