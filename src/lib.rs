//! taskbench: a uniform lifecycle and timing harness for independently
//! written computational tasks.
//!
//! A caller describes inputs and outputs as opaque regions in a
//! [`BufferContract`], binds an algorithm implementing [`TaskDef`] to it
//! through [`Task`], and either drives the lifecycle directly for a
//! correctness check or hands the task to a [`PerfAnalyzer`].

pub mod buffer;
pub mod dsl;
pub mod error;
pub mod harness;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod perf;
pub mod task;
pub mod timer;

pub use buffer::{BufferContract, Region, TestingState};
pub use dsl::ContractBuilder;
pub use error::{PerfError, RegionError, Result};
pub use harness::{LifecycleHarness, LifecycleOutcome};
pub use perf::{Mode, PerfAnalyzer, PerfAttributes, PerfReport, PerfResults, Statistic};
pub use task::{Phase, Stage, Task, TaskDef};
pub use timer::{wall_clock, FakeClock};
