//! Error and rejection types.
//!
//! Two kinds of failure flow through the scheduler:
//!
//! - [`Reason`]: the opaque payload a [`Deferred`](crate::Deferred) is
//!   rejected with. Callers may reject with any `Debug` value; the core never
//!   inspects it.
//! - [`Error`]: failures produced by the scheduler itself (self-resolution,
//!   panicking callbacks, driver misuse). An `Error` converts into a `Reason`
//!   so it can travel down a chain like any other rejection.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// Errors raised by the scheduler itself.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A deferred was resolved with itself.
    #[error("chaining cycle detected: a deferred cannot be resolved with itself")]
    SelfResolution,

    /// A resolver, continuation or foreign thenable panicked.
    #[error("callback panicked: {0}")]
    Panicked(String),

    /// A rejection nobody handled within one full drain of the task queue.
    #[error("unhandled rejection: {0}")]
    UnhandledRejection(String),

    /// Every input of [`any`](crate::any) was rejected.
    #[error("all {} inputs were rejected", .0.len())]
    AllRejected(Vec<Reason>),

    /// The deferred passed to [`Driver::block_on`](crate::Driver::block_on)
    /// was still pending when the task queue went idle.
    #[error("deferred is still pending but the task queue is idle")]
    Stalled,

    /// The driver ran its configured number of tasks without going idle.
    #[error("task budget of {budget} exhausted before the queue went idle")]
    BudgetExhausted { budget: usize },

    #[error("a deferred implementation is already installed")]
    AlreadyInstalled,

    #[error("no deferred implementation is installed")]
    NotInstalled,
}

trait Payload: Any + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
}

impl<R: Any + fmt::Debug> Payload for R {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The reason a [`Deferred`](crate::Deferred) was rejected.
///
/// A `Reason` wraps an arbitrary `Debug` value behind a reference-counted
/// pointer, so a single rejection can fan out to every attached callback
/// without cloning the payload itself.
///
/// # Examples
///
/// ```rust,ignore
/// let reason = Reason::new(404u16);
/// assert_eq!(reason.downcast_ref::<u16>(), Some(&404));
/// ```
#[derive(Clone)]
pub struct Reason {
    payload: Rc<dyn Payload>,
}

impl Reason {
    /// Wraps `reason` as a rejection payload.
    pub fn new<R: Any + fmt::Debug>(reason: R) -> Self {
        Self {
            payload: Rc::new(reason),
        }
    }

    /// Returns a reference to the payload if it is of type `R`.
    pub fn downcast_ref<R: Any>(&self) -> Option<&R> {
        Payload::as_any(&*self.payload).downcast_ref::<R>()
    }

    /// Returns `true` if the payload is of type `R`.
    pub fn is<R: Any>(&self) -> bool {
        Payload::as_any(&*self.payload).is::<R>()
    }

    /// Returns the payload as a scheduler [`Error`], if it is one.
    pub fn as_error(&self) -> Option<&Error> {
        self.downcast_ref::<Error>()
    }

    /// Returns `true` if both reasons share the same payload allocation.
    pub fn ptr_eq(&self, other: &Reason) -> bool {
        Rc::ptr_eq(&self.payload, &other.payload)
    }
}

impl fmt::Debug for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.payload, f)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = self.as_error() {
            fmt::Display::fmt(error, f)
        } else if let Some(message) = self.downcast_ref::<&'static str>() {
            f.write_str(message)
        } else if let Some(message) = self.downcast_ref::<String>() {
            f.write_str(message)
        } else {
            fmt::Debug::fmt(&*self.payload, f)
        }
    }
}

impl From<Error> for Reason {
    fn from(error: Error) -> Self {
        Reason::new(error)
    }
}

impl From<&'static str> for Reason {
    fn from(message: &'static str) -> Self {
        Reason::new(message)
    }
}

impl From<String> for Reason {
    fn from(message: String) -> Self {
        Reason::new(message)
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("opaque panic payload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_downcasts_to_payload() {
        let reason = Reason::new(7u32);

        assert!(reason.is::<u32>());
        assert_eq!(reason.downcast_ref::<u32>(), Some(&7));
        assert!(reason.downcast_ref::<i64>().is_none());
    }

    #[test]
    fn reason_displays_messages_and_errors() {
        assert_eq!(Reason::from("boom").to_string(), "boom");
        assert_eq!(Reason::from(String::from("bang")).to_string(), "bang");
        assert_eq!(
            Reason::from(Error::SelfResolution).to_string(),
            Error::SelfResolution.to_string()
        );
        assert_eq!(Reason::new(3u8).to_string(), "3");
    }

    #[test]
    fn clones_share_payload() {
        let reason = Reason::new(vec![1, 2, 3]);
        let clone = reason.clone();

        assert!(reason.ptr_eq(&clone));
        assert!(!reason.ptr_eq(&Reason::new(vec![1, 2, 3])));
    }

    #[test]
    fn panic_message_reads_str_and_string() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*boxed), "static");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*boxed), "owned");

        let boxed: Box<dyn Any + Send> = Box::new(5);
        assert_eq!(panic_message(&*boxed), "opaque panic payload");
    }
}
