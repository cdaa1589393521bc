//! Retry utilities for deferred operations.
//!
//! The main entry point is [`retry`], which re-invokes a factory closure
//! each time the deferred it produced rejects, until one attempt fulfills or
//! the retry limit is reached.

mod retry;

#[doc(inline)]
pub use retry::retry;
