//! Error types for taskbench

use crate::task::Phase;
use thiserror::Error;

/// Result type alias using taskbench's Error
pub type Result<T> = std::result::Result<T, PerfError>;

/// Errors surfaced by the performance analyzer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PerfError {
    /// The attributes cannot drive a measurement
    #[error("Invalid perf attributes: {reason}")]
    InvalidAttributes {
        /// Why the attributes were refused
        reason: &'static str,
    },

    /// Validate returned false; the measurement never started
    #[error("Task '{task}' rejected its buffer contract")]
    ValidationRejected {
        /// Name of the rejecting task
        task: String,
    },

    /// A lifecycle phase reported an internal fault
    #[error("Task '{task}' failed in {phase} on iteration {iteration}")]
    PhaseFailed {
        /// Name of the failing task
        task: String,
        /// The phase that returned false
        phase: Phase,
        /// Zero-based iteration index (0 for one-off phases)
        iteration: u64,
    },

    /// Mean time per iteration is above the configured limit
    #[error("Task execute time need to be: time < {limit} secs, got {measured} secs")]
    TimeLimitExceeded {
        /// Configured limit in seconds
        limit: f64,
        /// Measured mean in seconds
        measured: f64,
    },
}

/// Errors reinterpreting an opaque region as typed data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegionError {
    /// Region length is not a whole number of elements
    #[error("Region of {len} bytes is not a multiple of element size {elem}")]
    Misaligned {
        /// Region length in bytes
        len: usize,
        /// Element size in bytes
        elem: usize,
    },

    /// Typed data is larger than the caller's reservation
    #[error("Writing {needed} bytes overflows region of {len} bytes")]
    Overflow {
        /// Bytes required
        needed: usize,
        /// Region length in bytes
        len: usize,
    },

    /// Region index is out of range for the contract
    #[error("Region index {index} out of bounds for {count} regions")]
    OutOfBounds {
        /// Requested index
        index: usize,
        /// Number of regions
        count: usize,
    },
}
