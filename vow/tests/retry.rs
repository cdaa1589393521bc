use vow::tools::retry;
use vow::{Deferred, DriverBuilder};

use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_retry_succeeds_before_limit() {
    let driver = DriverBuilder::new().build();
    let attempts = Rc::new(Cell::new(0));

    let result = driver.block_on(&retry(5, {
        let attempts = attempts.clone();
        move || {
            let n = attempts.get();
            attempts.set(n + 1);

            if n < 2 {
                Deferred::rejected("fail")
            } else {
                Deferred::resolved(42)
            }
        }
    }));

    assert!(
        matches!(result, Ok(42)),
        "Retry should succeed before limit"
    );
    assert_eq!(attempts.get(), 3, "Should have retried 3 times");
}

#[test]
fn test_retry_fails_after_limit() {
    let driver = DriverBuilder::new().build();
    let attempts = Rc::new(Cell::new(0));

    let result = driver.block_on(&retry(3, {
        let attempts = attempts.clone();
        move || {
            attempts.set(attempts.get() + 1);
            Deferred::<usize>::rejected("fail")
        }
    }));

    assert!(result.is_err(), "Retry should fail after limit");
    assert_eq!(result.unwrap_err().to_string(), "fail");
    assert_eq!(attempts.get(), 4, "Should have retried 4 times");
}

#[test]
fn test_retry_waits_for_the_queue() {
    let driver = DriverBuilder::new().build();
    let attempts = Rc::new(Cell::new(0));

    let retried = retry(2, {
        let attempts = attempts.clone();
        move || {
            attempts.set(attempts.get() + 1);
            Deferred::<()>::rejected("fail")
        }
    });

    assert_eq!(attempts.get(), 1, "Only the first attempt runs up front");

    assert!(driver.tick());
    assert_eq!(attempts.get(), 2, "Each retry runs from a queued job");

    assert!(driver.block_on(&retried).is_err());
    assert_eq!(attempts.get(), 3);
}

#[test]
fn test_retry_with_pending_attempts() {
    let driver = DriverBuilder::new().build();
    let resolvers = Rc::new(std::cell::RefCell::new(Vec::new()));

    let retried = retry(1, {
        let resolvers = resolvers.clone();
        move || {
            let (attempt, resolver) = Deferred::<u32>::with_resolvers();
            resolvers.borrow_mut().push(resolver);
            attempt
        }
    });

    resolvers.borrow()[0].reject("first attempt failed");
    driver.run_until_idle().unwrap();
    assert_eq!(resolvers.borrow().len(), 2);
    assert!(retried.is_pending());

    resolvers.borrow()[1].fulfill(77);
    assert_eq!(driver.block_on(&retried).unwrap(), 77);
}
