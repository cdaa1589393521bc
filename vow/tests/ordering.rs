use vow::Deferred;
use vow::runtime;

use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<&'static str>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn push(log: &Log, entry: &'static str) -> impl FnOnce(u8) + 'static {
    let log = log.clone();
    move |_| log.borrow_mut().push(entry)
}

#[test]
fn callbacks_run_in_attachment_order() {
    let log = log();
    let (deferred, resolver) = Deferred::<u8>::with_resolvers();

    let _first = deferred.map(push(&log, "first"));
    let _second = deferred.map(push(&log, "second"));
    let _third = deferred.map(push(&log, "third"));

    resolver.fulfill(0);
    runtime::run_until_idle();

    assert_eq!(*log.borrow(), ["first", "second", "third"]);
}

#[test]
fn callbacks_attached_after_settlement_keep_their_order() {
    let log = log();
    let deferred = Deferred::resolved(0u8);

    let _early = deferred.map(push(&log, "early"));
    runtime::run_until_idle();

    let _late = deferred.map(push(&log, "late"));
    let _later = deferred.map(push(&log, "later"));
    runtime::run_until_idle();

    assert_eq!(*log.borrow(), ["early", "late", "later"]);
}

#[test]
fn callbacks_never_run_inside_then() {
    let log = log();
    let deferred = Deferred::resolved(1u8);

    let _child = deferred.map(push(&log, "callback"));
    log.borrow_mut().push("after then");

    assert_eq!(runtime::pending_tasks(), 1);
    runtime::run_until_idle();

    assert_eq!(*log.borrow(), ["after then", "callback"]);
}

#[test]
fn callbacks_never_run_inside_settlement() {
    let log = log();
    let (deferred, resolver) = Deferred::<u8>::with_resolvers();

    let _child = deferred.map(push(&log, "callback"));
    resolver.fulfill(1);
    log.borrow_mut().push("after fulfill");

    runtime::run_until_idle();

    assert_eq!(*log.borrow(), ["after fulfill", "callback"]);
}

#[test]
fn attachments_across_deferreds_interleave_in_queue_order() {
    let log = log();
    let a = Deferred::resolved(0u8);
    let b = Deferred::resolved(0u8);

    let _a1 = a.map(push(&log, "a1"));
    let _b1 = b.map(push(&log, "b1"));
    let _a2 = a.map(push(&log, "a2"));

    runtime::run_until_idle();

    assert_eq!(*log.borrow(), ["a1", "b1", "a2"]);
}

#[test]
fn work_queued_by_a_callback_runs_after_already_queued_work() {
    let log = log();
    let outer = Deferred::resolved(0u8);
    let inner = Deferred::resolved(0u8);

    let nested = log.clone();
    let _first = outer.map(move |_| {
        nested.borrow_mut().push("first");
        let _third = inner.map(push(&nested, "third"));
    });
    let _second = outer.map(push(&log, "second"));

    runtime::run_until_idle();

    assert_eq!(*log.borrow(), ["first", "second", "third"]);
}

#[test]
fn each_chain_link_is_a_separate_job() {
    let deferred = Deferred::resolved(1u32)
        .map(|n| n + 1)
        .map(|n| n * 10)
        .map(|n| n - 2);

    assert!(runtime::tick());
    assert!(deferred.is_pending());
    assert!(runtime::tick());
    assert!(deferred.is_pending());
    assert!(runtime::tick());

    assert_eq!(deferred.peek().and_then(|s| s.value().copied()), Some(18));
    assert!(!runtime::tick());
    assert!(runtime::is_idle());
}
