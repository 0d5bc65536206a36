//! Buffer contract: untyped input/output regions exchanged between caller and task.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use crate::error::RegionError;
use bytemuck::Pod;

/// Whether a contract is driven by a correctness check or a benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestingState {
    /// Correctness check: one lifecycle, bounded by a per-task time limit.
    #[default]
    Functional,
    /// Benchmark: repeated lifecycles or runs under a `PerfAnalyzer`.
    Performance,
}

/// An opaque memory region owned by the caller.
///
/// The harness never interprets the bytes. Tasks recover typed data by copy
/// through [`Region::read`] and hand results back through [`Region::write`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Region {
    bytes: Vec<u8>,
}

impl Region {
    /// A region of `len` zero bytes.
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: vec![0; len],
        }
    }

    /// A zeroed region large enough for `count` values of `T`.
    pub fn zeroed_for<T: Pod>(count: usize) -> Self {
        Self::zeroed(count * std::mem::size_of::<T>())
    }

    /// Wrap raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Copy a typed slice into a new region.
    pub fn from_slice<T: Pod>(data: &[T]) -> Self {
        Self {
            bytes: bytemuck::cast_slice(data).to_vec(),
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the region holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw view of the region.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable raw view of the region. The length is fixed.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Number of whole `T` values the region can hold.
    pub fn capacity_of<T: Pod>(&self) -> usize {
        match std::mem::size_of::<T>() {
            0 => 0,
            elem => self.bytes.len() / elem,
        }
    }

    /// Reinterpret the whole region as `T` values, copying out.
    pub fn read<T: Pod>(&self) -> Result<Vec<T>, RegionError> {
        let elem = std::mem::size_of::<T>();
        if elem == 0 || self.bytes.len() % elem != 0 {
            return Err(RegionError::Misaligned {
                len: self.bytes.len(),
                elem,
            });
        }
        let mut out = vec![<T as bytemuck::Zeroable>::zeroed(); self.bytes.len() / elem];
        bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(&self.bytes);
        Ok(out)
    }

    /// Copy `data` into the start of the region. Trailing bytes are left as they were.
    pub fn write<T: Pod>(&mut self, data: &[T]) -> Result<(), RegionError> {
        let src: &[u8] = bytemuck::cast_slice(data);
        if src.len() > self.bytes.len() {
            return Err(RegionError::Overflow {
                needed: src.len(),
                len: self.bytes.len(),
            });
        }
        self.bytes[..src.len()].copy_from_slice(src);
        Ok(())
    }
}

/// Caller-owned description of a task's inputs and outputs.
///
/// Counts are in whatever unit the consuming task defines. `inputs` and
/// `inputs_count` are expected to have equal length, as are `outputs` and
/// `outputs_count`; the contract does not enforce it, a task's validation does.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BufferContract {
    /// Input regions, read during validation and pre-processing.
    pub inputs: Vec<Region>,
    /// Per-input element counts.
    pub inputs_count: Vec<usize>,
    /// Pre-allocated output regions the task fills in post-processing.
    pub outputs: Vec<Region>,
    /// Per-output counts; a task may shrink them to the produced size.
    pub outputs_count: Vec<usize>,
    /// How the contract is being exercised.
    pub state_of_testing: TestingState,
}

impl BufferContract {
    /// Create an empty contract.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when each region sequence matches its count sequence in length.
    pub fn is_shape_consistent(&self) -> bool {
        self.inputs.len() == self.inputs_count.len()
            && self.outputs.len() == self.outputs_count.len()
    }

    /// Input region by index.
    pub fn input(&self, index: usize) -> Result<&Region, RegionError> {
        self.inputs.get(index).ok_or(RegionError::OutOfBounds {
            index,
            count: self.inputs.len(),
        })
    }

    /// Output region by index.
    pub fn output(&self, index: usize) -> Result<&Region, RegionError> {
        self.outputs.get(index).ok_or(RegionError::OutOfBounds {
            index,
            count: self.outputs.len(),
        })
    }

    /// Typed copy of an input region.
    pub fn read_input<T: Pod>(&self, index: usize) -> Result<Vec<T>, RegionError> {
        self.input(index)?.read()
    }

    /// Typed copy of an output region.
    pub fn read_output<T: Pod>(&self, index: usize) -> Result<Vec<T>, RegionError> {
        self.output(index)?.read()
    }

    /// Write typed data into an output region and record its length in
    /// `outputs_count` when that slot exists.
    pub fn write_output<T: Pod>(&mut self, index: usize, data: &[T]) -> Result<(), RegionError> {
        let count = self.outputs.len();
        self.outputs
            .get_mut(index)
            .ok_or(RegionError::OutOfBounds { index, count })?
            .write(data)?;
        if let Some(slot) = self.outputs_count.get_mut(index) {
            *slot = data.len();
        }
        Ok(())
    }

    /// Copy of every output region, for before/after comparisons.
    pub fn snapshot_outputs(&self) -> Vec<Region> {
        self.outputs.clone()
    }
}
