//! DSL module: builder API for buffer contracts.

use crate::buffer::{BufferContract, Region, TestingState};
use bytemuck::Pod;

/// Builds a [`BufferContract`] region by region, keeping each region and its
/// count in step.
#[derive(Debug, Default)]
pub struct ContractBuilder {
    contract: BufferContract,
}

impl ContractBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a typed input; its count is the element count.
    pub fn input<T: Pod>(self, data: &[T]) -> Self {
        let count = data.len();
        self.input_region(Region::from_slice(data), count)
    }

    /// Add an input region with a task-defined count.
    pub fn input_region(mut self, region: Region, count: usize) -> Self {
        self.contract.inputs.push(region);
        self.contract.inputs_count.push(count);
        self
    }

    /// Reserve a zeroed output for `count` values of `T`.
    pub fn output<T: Pod>(self, count: usize) -> Self {
        self.output_region(Region::zeroed_for::<T>(count), count)
    }

    /// Add a pre-allocated output region with a task-defined count.
    pub fn output_region(mut self, region: Region, count: usize) -> Self {
        self.contract.outputs.push(region);
        self.contract.outputs_count.push(count);
        self
    }

    /// Mark the contract for benchmarking rather than functional testing.
    pub fn performance(self) -> Self {
        self.testing_state(TestingState::Performance)
    }

    /// Set the testing state explicitly.
    pub fn testing_state(mut self, state: TestingState) -> Self {
        self.contract.state_of_testing = state;
        self
    }

    /// Build the contract.
    pub fn build(self) -> BufferContract {
        self.contract
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dsl_equivalence() {
        let built = ContractBuilder::new()
            .input(&[5u32, 1, 4])
            .input_region(Region::from_bytes(vec![7; 8]), 2)
            .output::<u32>(3)
            .build();

        let mut manual = BufferContract::new();
        manual.inputs.push(Region::from_slice(&[5u32, 1, 4]));
        manual.inputs_count.push(3);
        manual.inputs.push(Region::from_bytes(vec![7; 8]));
        manual.inputs_count.push(2);
        manual.outputs.push(Region::zeroed(12));
        manual.outputs_count.push(3);

        assert_eq!(built, manual);
        assert!(built.is_shape_consistent());
        assert_eq!(built.state_of_testing, TestingState::Functional);
    }

    #[test]
    fn performance_flag() {
        let built = ContractBuilder::new().performance().build();
        assert_eq!(built.state_of_testing, TestingState::Performance);
    }
}
