//! Lifecycle harness: one correctness pass over a bound task.

use crate::invariant_ppt::{assert_invariant, REJECTION_UNTOUCHED};
use crate::task::{Phase, Task, TaskDef};

/// How a single lifecycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// All four phases succeeded.
    Completed,
    /// Validation refused the contract; nothing else ran.
    Rejected,
    /// A phase after validation reported a fault.
    Failed(Phase),
}

/// Runs validation, pre-processing, run and post-processing once, stopping
/// at the first phase that returns false.
pub struct LifecycleHarness;

impl LifecycleHarness {
    /// Drive one lifecycle and classify the outcome.
    ///
    /// A rejected contract must come back with its output regions unchanged.
    pub fn check<T: TaskDef>(task: &mut Task<'_, T>) -> LifecycleOutcome {
        let before = task.contract().snapshot_outputs();
        if !task.validation() {
            assert_invariant(
                REJECTION_UNTOUCHED,
                task.contract().outputs == before,
                "rejected contract had its outputs modified",
                Some(task.name()),
            );
            return LifecycleOutcome::Rejected;
        }
        if !task.pre_processing() {
            return LifecycleOutcome::Failed(Phase::PreProcessing);
        }
        if !task.run() {
            return LifecycleOutcome::Failed(Phase::Run);
        }
        if !task.post_processing() {
            return LifecycleOutcome::Failed(Phase::PostProcessing);
        }
        LifecycleOutcome::Completed
    }
}
