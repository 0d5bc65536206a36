//! Task lifecycle: the algorithm-side trait and the caller-side driver.
//!
//! An algorithm implements [`TaskDef`]. A caller binds it to a
//! [`BufferContract`] through [`Task`] and drives the four phases in order:
//! validation, pre-processing, run (possibly repeated), post-processing.
//!
//! # Implementor obligations
//!
//! - `validation` is a predicate over the contract; it cannot mutate anything.
//! - `pre_processing` must derive a fresh working copy from the contract every
//!   time it is called. Pipeline measurements re-run the whole lifecycle on
//!   the same contract, so a task that consumes its inputs in place is not
//!   measurable in that mode.
//! - `run` should leave the externally visible result unchanged when called
//!   again on the same pre-processed state.
//! - `post_processing` writes results into the output regions and may shrink
//!   `outputs_count` to the produced size.

#![forbid(unsafe_code)]

use crate::buffer::{BufferContract, TestingState};
use crate::invariant_ppt::{
    assert_invariant, FUNCTIONAL_TIME_LIMIT, LIFECYCLE_ORDER, VALIDATION_GATE,
};
use std::fmt;
use std::time::{Duration, Instant};

/// Time allowed for one functional lifecycle before it counts as a failure.
pub const DEFAULT_FUNCTIONAL_TIME_LIMIT: Duration = Duration::from_secs(1);

/// One algorithm body behind the uniform lifecycle.
pub trait TaskDef {
    /// Human-readable task name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Check that the contract's shapes and values are usable.
    fn validation(&self, data: &BufferContract) -> bool;

    /// Copy inputs out of the contract into the working representation.
    fn pre_processing(&mut self, data: &BufferContract) -> bool;

    /// Execute the algorithm body on the working representation.
    fn run(&mut self) -> bool;

    /// Copy results into the contract's output regions.
    fn post_processing(&mut self, data: &mut BufferContract) -> bool;
}

impl<T: TaskDef + ?Sized> TaskDef for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn validation(&self, data: &BufferContract) -> bool {
        (**self).validation(data)
    }

    fn pre_processing(&mut self, data: &BufferContract) -> bool {
        (**self).pre_processing(data)
    }

    fn run(&mut self) -> bool {
        (**self).run()
    }

    fn post_processing(&mut self, data: &mut BufferContract) -> bool {
        (**self).post_processing(data)
    }
}

/// A lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Contract validation.
    Validation,
    /// One-time setup.
    PreProcessing,
    /// Algorithm body.
    Run,
    /// Result hand-back.
    PostProcessing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Validation => "validation",
            Phase::PreProcessing => "pre_processing",
            Phase::Run => "run",
            Phase::PostProcessing => "post_processing",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of a bound task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Bound, nothing run yet (or last validation rejected the contract).
    Created,
    /// Validation accepted the contract.
    Validated,
    /// Working data is ready.
    PreProcessed,
    /// At least one run completed.
    Ran,
    /// Outputs finalized. A new lifecycle may start with validation.
    PostProcessed,
}

/// Caller-side driver binding one [`TaskDef`] to one [`BufferContract`].
///
/// The contract is borrowed for the lifetime of the task, so its regions
/// cannot be freed or shared with another task while this one exists.
pub struct Task<'a, T: TaskDef> {
    def: T,
    contract: &'a mut BufferContract,
    stage: Stage,
    history: Vec<Phase>,
    functional_time_limit: Duration,
    lifecycle_start: Option<Instant>,
}

impl<'a, T: TaskDef> Task<'a, T> {
    /// Bind `def` to `contract`.
    pub fn new(def: T, contract: &'a mut BufferContract) -> Self {
        Self {
            def,
            contract,
            stage: Stage::Created,
            history: Vec::with_capacity(4),
            functional_time_limit: DEFAULT_FUNCTIONAL_TIME_LIMIT,
            lifecycle_start: None,
        }
    }

    /// Override the time allowed for one functional lifecycle.
    pub fn with_functional_time_limit(mut self, limit: Duration) -> Self {
        self.functional_time_limit = limit;
        self
    }

    /// Task name as reported by the definition.
    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Current lifecycle state.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Phases executed so far in the current lifecycle, in call order.
    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    /// The bound contract.
    pub fn contract(&self) -> &BufferContract {
        &*self.contract
    }

    /// The bound definition.
    pub fn def(&self) -> &T {
        &self.def
    }

    /// Switch the contract's testing state; any running functional clock is dropped.
    pub(crate) fn set_testing_state(&mut self, state: TestingState) {
        self.contract.state_of_testing = state;
        if state == TestingState::Performance {
            self.lifecycle_start = None;
        }
    }

    /// Run the validation predicate.
    pub fn validation(&mut self) -> bool {
        self.enter(Phase::Validation);
        self.history.clear();
        self.lifecycle_start = match self.contract.state_of_testing {
            TestingState::Functional => Some(Instant::now()),
            TestingState::Performance => None,
        };
        let ok = self.def.validation(&*self.contract);
        self.history.push(Phase::Validation);
        if ok {
            self.stage = Stage::Validated;
        } else {
            tracing::debug!(task = self.def.name(), "contract rejected by validation");
            self.stage = Stage::Created;
        }
        ok
    }

    /// Run one-time setup. Only legal after a successful validation.
    pub fn pre_processing(&mut self) -> bool {
        self.enter(Phase::PreProcessing);
        assert_invariant(
            VALIDATION_GATE,
            self.stage == Stage::Validated,
            "pre_processing requires an accepted contract",
            None,
        );
        let ok = self.def.pre_processing(&*self.contract);
        self.finish(Phase::PreProcessing, ok, Stage::PreProcessed)
    }

    /// Run the algorithm body. May be repeated before post-processing.
    pub fn run(&mut self) -> bool {
        self.enter(Phase::Run);
        let ok = self.def.run();
        self.finish(Phase::Run, ok, Stage::Ran)
    }

    /// Hand results back to the contract.
    ///
    /// In functional testing the whole lifecycle must also fit in the
    /// functional time limit; an overrun finalizes the outputs but returns false.
    pub fn post_processing(&mut self) -> bool {
        self.enter(Phase::PostProcessing);
        let ok = self.def.post_processing(&mut *self.contract);
        if !self.finish(Phase::PostProcessing, ok, Stage::PostProcessed) {
            return false;
        }
        match self.lifecycle_start.take() {
            Some(start) => {
                let elapsed = start.elapsed();
                if elapsed > self.functional_time_limit {
                    tracing::warn!(
                        task = self.def.name(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        limit_ms = self.functional_time_limit.as_millis() as u64,
                        "functional lifecycle exceeded its time limit"
                    );
                    return false;
                }
                assert_invariant(
                    FUNCTIONAL_TIME_LIMIT,
                    elapsed <= self.functional_time_limit,
                    "functional lifecycle reported success past its time limit",
                    Some(self.def.name()),
                );
                true
            }
            None => true,
        }
    }

    fn enter(&self, phase: Phase) {
        let legal = matches!(
            (phase, self.stage),
            (Phase::Validation, Stage::Created | Stage::PostProcessed)
                | (Phase::PreProcessing, Stage::Validated)
                | (Phase::Run, Stage::PreProcessed | Stage::Ran)
                | (Phase::PostProcessing, Stage::Ran)
        );
        if legal {
            assert_invariant(LIFECYCLE_ORDER, true, "phase order", None);
        } else {
            let context = format!("{} called in stage {:?}", phase, self.stage);
            assert_invariant(
                LIFECYCLE_ORDER,
                false,
                "phase called out of lifecycle order",
                Some(&context),
            );
        }
    }

    fn finish(&mut self, phase: Phase, ok: bool, next: Stage) -> bool {
        self.history.push(phase);
        if ok {
            self.stage = next;
        } else {
            tracing::warn!(task = self.def.name(), %phase, "phase reported failure");
        }
        ok
    }
}

impl<T: TaskDef> fmt::Debug for Task<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.def.name())
            .field("stage", &self.stage)
            .field("history", &self.history)
            .finish()
    }
}
