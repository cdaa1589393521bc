//! # vow
//!
//! **vow** is a single-threaded deferred-value scheduler: a from-scratch take
//! on promise semantics for Rust hosts that run their own event loop.
//!
//! A [`Deferred`] is created with a resolver, settles exactly once (fulfilled
//! with a value or rejected with a [`Reason`]), and hands its outcome to the
//! continuations attached with [`then`](Deferred::then),
//! [`catch`](Deferred::catch) and friends. Continuations never run in the
//! attaching call: they are pushed onto a per-thread task queue that the host
//! drains between turns of its own loop.
//!
//! The crate provides:
//!
//! - An explicit **settlement state machine** (`Pending`, `Blocked`,
//!   `Fulfilled`, `Rejected`) with self-resolution detection and transparent
//!   adoption of nested deferreds and foreign thenables
//! - A **task queue** standing in for a microtask queue, driven by the host
//!   through [`runtime::tick`] or a configured [`Driver`]
//! - **Combinators**: [`all`], [`race`], [`all_settled`], [`any`], [`zip`]
//!   and the [`all!`] macro
//! - **Unhandled-rejection diagnostics**: a rejection nobody handles within
//!   one full drain is reported to a configurable hook, which fails loudly
//!   by default
//! - **Ergonomic macros** like `#[vow::main]`, `#[vow::test]` and `all!`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vow::{Deferred, DriverBuilder};
//!
//! let driver = DriverBuilder::new().build();
//!
//! let (pending, resolver) = Deferred::<u32>::with_resolvers();
//! let doubled = pending.map(|n| n * 2);
//!
//! resolver.fulfill(21);
//!
//! assert_eq!(driver.block_on(&doubled).unwrap(), 42);
//! ```
//!
//! ## Modules
//!
//! - [`runtime`] — Task queue driving, driver configuration, install/uninstall
//! - [`tools`] — Utilities like retry
//!
//! ## Threading
//!
//! Deferreds are `!Send`: each thread has its own task queue and
//! unhandled-rejection hook, and a deferred always settles through the queue
//! of the thread that created it.

mod combinators;
mod deferred;
mod error;

pub mod runtime;
pub mod tools;

pub use combinators::{all, all_settled, any, race, reject, resolve, zip};
pub use deferred::tracker::{
    UnhandledRejectionHandler, set_unhandled_rejection_handler, take_unhandled_rejection_handler,
};
pub use deferred::{Deferred, DeferredId, Resolution, Resolver, Settled, StateKind, ThenCapable};
pub use error::{Error, Reason};
pub use runtime::{Driver, DriverBuilder};

pub use vow_macros::*;
