//! A refused or failed measurement must not log the invariants a good one enforces.
//! Kept to a single test so the global invariant log is not shared between threads.

#![cfg(feature = "ppt")]

mod common;

use common::ParallelSort;
use std::panic::{catch_unwind, AssertUnwindSafe};
use taskbench::invariant_ppt::{
    clear_invariant_log, contract_test, PERF_ATTRS_VALID, PERF_FAILURE_SURFACED,
    PERF_RESULTS_POPULATED, PERF_SEQUENTIAL,
};
use taskbench::{
    ContractBuilder, FakeClock, Mode, PerfAnalyzer, PerfAttributes, PerfError, PerfResults, Task,
};

fn logged(id: u32) -> bool {
    catch_unwind(AssertUnwindSafe(|| contract_test("logged", &[id]))).is_ok()
}

#[test]
fn refused_measurement_logs_nothing_enforced() {
    clear_invariant_log();
    let clock = FakeClock::ticking(0.1);
    let mut data = ContractBuilder::new()
        .input(&[2, 1])
        .output::<i32>(2)
        .build();
    let mut task = Task::new(ParallelSort::default(), &mut data);

    let mut results = PerfResults::new();
    let err = PerfAnalyzer::new(&mut task)
        .measure(Mode::Pipeline, &PerfAttributes::new(0, clock.timer()), &mut results)
        .unwrap_err();
    assert!(matches!(err, PerfError::InvalidAttributes { .. }));
    assert!(!logged(PERF_ATTRS_VALID));
    assert!(!logged(PERF_SEQUENTIAL));
    assert!(!logged(PERF_RESULTS_POPULATED));
    assert!(logged(PERF_FAILURE_SURFACED));

    PerfAnalyzer::new(&mut task)
        .measure(Mode::TaskRun, &PerfAttributes::new(3, clock.timer()), &mut results)
        .unwrap();
    assert!(logged(PERF_ATTRS_VALID));
    assert!(logged(PERF_SEQUENTIAL));
    assert!(logged(PERF_RESULTS_POPULATED));
    assert_eq!(results.samples().len(), 3);
}
