//! Reference tasks shared by the integration tests.
#![allow(dead_code)]

use rayon::prelude::*;
use std::time::Duration;
use taskbench::{BufferContract, TaskDef};

/// Sorts one input of `i32` into one output of the same count.
#[derive(Debug, Default)]
pub struct ParallelSort {
    work: Vec<i32>,
}

impl TaskDef for ParallelSort {
    fn name(&self) -> &str {
        "parallel_sort"
    }

    fn validation(&self, data: &BufferContract) -> bool {
        data.inputs.len() == 1
            && data.outputs.len() == 1
            && data.inputs_count.len() == 1
            && data.outputs_count.len() == 1
            && data.inputs_count[0] == data.outputs_count[0]
            && data.inputs[0].capacity_of::<i32>() >= data.inputs_count[0]
            && data.outputs[0].capacity_of::<i32>() >= data.outputs_count[0]
    }

    fn pre_processing(&mut self, data: &BufferContract) -> bool {
        match data.read_input::<i32>(0) {
            Ok(mut values) => {
                values.truncate(data.inputs_count[0]);
                self.work = values;
                true
            }
            Err(_) => false,
        }
    }

    fn run(&mut self) -> bool {
        self.work.par_sort_unstable();
        true
    }

    fn post_processing(&mut self, data: &mut BufferContract) -> bool {
        data.write_output(0, &self.work).is_ok()
    }
}

/// Writes the sorted distinct values of its input; the produced count is data dependent.
#[derive(Debug, Default)]
pub struct Distinct {
    work: Vec<u64>,
}

impl TaskDef for Distinct {
    fn validation(&self, data: &BufferContract) -> bool {
        data.inputs.len() == 1
            && data.outputs.len() == 1
            && data.outputs_count.len() == 1
            && data.outputs[0].capacity_of::<u64>() >= data.inputs[0].capacity_of::<u64>()
    }

    fn pre_processing(&mut self, data: &BufferContract) -> bool {
        match data.read_input::<u64>(0) {
            Ok(values) => {
                self.work = values;
                true
            }
            Err(_) => false,
        }
    }

    fn run(&mut self) -> bool {
        self.work.sort_unstable();
        self.work.dedup();
        true
    }

    fn post_processing(&mut self, data: &mut BufferContract) -> bool {
        data.write_output(0, &self.work).is_ok()
    }
}

/// Sleeps a fixed time in each phase.
#[derive(Debug, Clone, Copy)]
pub struct Sleeper {
    pub pre: Duration,
    pub run: Duration,
    pub post: Duration,
}

impl Sleeper {
    pub fn run_only(run: Duration) -> Self {
        Self {
            pre: Duration::ZERO,
            run,
            post: Duration::ZERO,
        }
    }
}

impl TaskDef for Sleeper {
    fn name(&self) -> &str {
        "sleeper"
    }

    fn validation(&self, _: &BufferContract) -> bool {
        true
    }

    fn pre_processing(&mut self, _: &BufferContract) -> bool {
        std::thread::sleep(self.pre);
        true
    }

    fn run(&mut self) -> bool {
        std::thread::sleep(self.run);
        true
    }

    fn post_processing(&mut self, _: &mut BufferContract) -> bool {
        std::thread::sleep(self.post);
        true
    }
}
