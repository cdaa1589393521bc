use vow::runtime::{self, InstallGuard};
use vow::{Deferred, DriverBuilder, Error};

fn spin(round: u64) -> Deferred<()> {
    Deferred::resolved(()).and_then(move |_| spin(round + 1))
}

#[test]
fn tick_runs_one_job_at_a_time() {
    let driver = DriverBuilder::new().build();
    assert!(!driver.tick());

    let _a = Deferred::resolved(1u8).map(|n| n + 1);
    let _b = Deferred::resolved(2u8).map(|n| n + 1);
    assert_eq!(driver.pending_tasks(), 2);

    assert!(driver.tick());
    assert_eq!(driver.pending_tasks(), 1);
    assert!(driver.tick());
    assert!(!driver.tick());
}

#[test]
fn run_until_idle_reports_jobs_run() {
    let driver = DriverBuilder::new().build();

    let chained = Deferred::resolved(1u8).map(|n| n + 1).map(|n| n * 3);

    assert_eq!(driver.run_until_idle().unwrap(), 2);
    assert_eq!(chained.peek().and_then(|s| s.value().copied()), Some(6));
    assert!(runtime::is_idle());
}

#[test]
fn budget_turns_runaway_chains_into_an_error() {
    let driver = DriverBuilder::new().max_tasks_per_drain(100).build();
    let _runaway = spin(0);

    let err = driver.run_until_idle().unwrap_err();

    assert!(matches!(err, Error::BudgetExhausted { budget: 100 }));
    assert!(driver.pending_tasks() > 0);
}

#[test]
fn block_on_respects_the_budget() {
    let driver = DriverBuilder::new().max_tasks_per_drain(10).build();
    let runaway = spin(0);

    let reason = driver.block_on(&runaway).unwrap_err();
    assert!(matches!(reason.as_error(), Some(Error::BudgetExhausted { budget: 10 })));
}

#[test]
fn budget_is_per_drain() {
    let driver = DriverBuilder::new().max_tasks_per_drain(3).build();

    let _first = Deferred::resolved(0u8).map(|n| n + 1).map(|n| n + 1);
    assert_eq!(driver.run_until_idle().unwrap(), 2);

    let _second = Deferred::resolved(0u8).map(|n| n + 1).map(|n| n + 1).map(|n| n + 1);
    assert_eq!(driver.run_until_idle().unwrap(), 3);
}

#[test]
#[should_panic(expected = "max_tasks_per_drain must be > 0")]
fn zero_budget_is_rejected() {
    let _ = DriverBuilder::new().max_tasks_per_drain(0);
}

#[test]
fn block_on_reports_stalled_deferreds() {
    let driver = DriverBuilder::new().build();
    let (pending, _resolver) = Deferred::<u8>::with_resolvers();

    let reason = driver.block_on(&pending).unwrap_err();
    assert!(matches!(reason.as_error(), Some(Error::Stalled)));
}

#[test]
fn block_on_reports_stalled_when_the_queue_empties_on_the_last_budgeted_job() {
    let driver = DriverBuilder::new().max_tasks_per_drain(2).build();
    let (pending, _resolver) = Deferred::<u8>::with_resolvers();
    let _busy = Deferred::resolved(0u8).map(|n| n + 1).map(|n| n + 1);

    let reason = driver.block_on(&pending).unwrap_err();
    assert!(matches!(reason.as_error(), Some(Error::Stalled)));
    assert!(runtime::is_idle());
}

#[test]
fn block_on_returns_already_settled_values_without_running_jobs() {
    let driver = DriverBuilder::new().build();
    let _queued = Deferred::resolved(0u8).map(|n| n);

    assert_eq!(driver.block_on(&Deferred::resolved("ready")).unwrap(), "ready");
    assert_eq!(driver.pending_tasks(), 1);

    driver.run_until_idle().unwrap();
}

#[test]
fn turns_advance_only_through_the_next_turn_lane() {
    let driver = DriverBuilder::new().unhandled_rejection_handler(|_| {}).build();
    let start = driver.turn();

    let _chained = Deferred::resolved(0u8).map(|n| n + 1).map(|n| n + 1);
    driver.run_until_idle().unwrap();
    assert_eq!(driver.turn(), start);

    let _rejected = Deferred::<u8>::rejected("ignored");
    driver.run_until_idle().unwrap();
    assert_eq!(driver.turn(), start + 1);
    assert_eq!(runtime::current_turn(), driver.turn());
}

#[test]
fn install_is_exclusive_and_reversible() {
    assert!(!runtime::is_installed());

    let guard: InstallGuard = runtime::install().unwrap();
    assert!(runtime::is_installed());
    assert!(matches!(runtime::install(), Err(Error::AlreadyInstalled)));

    drop(guard);
    assert!(!runtime::is_installed());
    assert!(matches!(runtime::uninstall(), Err(Error::NotInstalled)));

    let guard = runtime::install().unwrap();
    runtime::uninstall().unwrap();
    assert!(!guard.release());

    let guard = runtime::install().unwrap();
    assert!(guard.release());
    assert!(!runtime::is_installed());
}

#[vow::main(max_tasks_per_drain = 1_000)]
fn doubled() -> Deferred<u32> {
    Deferred::resolved(21).map(|n| n * 2)
}

#[test]
fn main_attribute_drains_before_returning() {
    let result = doubled();

    assert_eq!(result.peek().and_then(|s| s.value().copied()), Some(42));
    assert!(runtime::is_idle());
}
