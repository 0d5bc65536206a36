//! Pipeline measurements re-run pre-processing on the same contract, so a
//! task must rebuild its working data from the contract every time.

mod common;

use common::ParallelSort;
use taskbench::{
    BufferContract, ContractBuilder, FakeClock, LifecycleHarness, LifecycleOutcome, Mode,
    PerfAnalyzer, PerfAttributes, PerfResults, Task, TaskDef,
};

fn sort_contract() -> BufferContract {
    let input = vec![12, -4, 8, 8, 0, 3, -99, 57, 1];
    ContractBuilder::new()
        .input(&input)
        .output::<i32>(input.len())
        .performance()
        .build()
}

fn single_lifecycle<T: TaskDef>(def: T, mut data: BufferContract) -> BufferContract {
    let mut task = Task::new(def, &mut data);
    assert_eq!(LifecycleHarness::check(&mut task), LifecycleOutcome::Completed);
    drop(task);
    data
}

fn pipeline<T: TaskDef>(def: T, mut data: BufferContract, runs: u64) -> BufferContract {
    let clock = FakeClock::ticking(0.01);
    let mut task = Task::new(def, &mut data);
    let mut results = PerfResults::new();
    PerfAnalyzer::new(&mut task)
        .measure(Mode::Pipeline, &PerfAttributes::new(runs, clock.timer()), &mut results)
        .unwrap();
    drop(task);
    data
}

#[test]
fn pipeline_matches_single_lifecycle_for_idempotent_task() {
    let once = single_lifecycle(ParallelSort::default(), sort_contract());
    let many = pipeline(ParallelSort::default(), sort_contract(), 7);
    assert_eq!(once, many);
}

#[test]
fn repeated_run_matches_single_run() {
    let once = single_lifecycle(ParallelSort::default(), sort_contract());

    let mut data = sort_contract();
    let mut task = Task::new(ParallelSort::default(), &mut data);
    assert!(task.validation());
    assert!(task.pre_processing());
    assert!(task.run());
    assert!(task.run());
    assert!(task.post_processing());
    drop(task);

    assert_eq!(once, data);
}

/// Negates its input in place during post-processing, so every lifecycle
/// starts from different data.
#[derive(Default)]
struct ConsumesInput {
    work: Vec<i32>,
}

impl TaskDef for ConsumesInput {
    fn validation(&self, data: &BufferContract) -> bool {
        data.inputs.len() == 1 && data.outputs.len() == 1
    }

    fn pre_processing(&mut self, data: &BufferContract) -> bool {
        data.read_input::<i32>(0).map(|v| self.work = v).is_ok()
    }

    fn run(&mut self) -> bool {
        self.work.sort_unstable();
        true
    }

    fn post_processing(&mut self, data: &mut BufferContract) -> bool {
        let negated: Vec<i32> = self.work.iter().map(|v| -v).collect();
        data.inputs[0].write(&negated).is_ok() && data.write_output(0, &self.work).is_ok()
    }
}

#[test]
fn pipeline_exposes_non_idempotent_task() {
    let once = single_lifecycle(ConsumesInput::default(), sort_contract());
    let twice = pipeline(ConsumesInput::default(), sort_contract(), 2);
    assert_ne!(
        once.read_output::<i32>(0).unwrap(),
        twice.read_output::<i32>(0).unwrap()
    );
}
