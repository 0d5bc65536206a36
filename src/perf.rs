//! Perf module: repeated, timed execution of a bound task.
//!
//! Two measurement policies are offered:
//!
//! - [`Mode::Pipeline`] times the whole lifecycle (validation through
//!   post-processing) once per iteration.
//! - [`Mode::TaskRun`] validates and pre-processes once, untimed, then times
//!   each of `num_running` calls to `run`, then post-processes once, untimed.
//!
//! Iterations run strictly one after another on the calling thread. A phase
//! that fails aborts the whole measurement and `PerfResults` is left as it was.

use crate::buffer::TestingState;
use crate::error::{PerfError, Result};
use crate::invariant_ppt::{
    assert_invariant, PERF_ATTRS_VALID, PERF_FAILURE_SURFACED, PERF_RESULTS_POPULATED,
    PERF_SEQUENTIAL,
};
use crate::task::{Phase, Task, TaskDef};
use crate::timer::{wall_clock, Timer};
use std::collections::BTreeMap;
use std::fmt;

/// Default repetition count.
pub const DEFAULT_NUM_RUNNING: u64 = 5;

/// Default ceiling on the mean time per iteration, in seconds.
pub const DEFAULT_MAX_TIME: f64 = 10.0;

const MAX_SAMPLE_RESERVATION: u64 = 1 << 16;

/// Measurement policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Time the full lifecycle per iteration.
    Pipeline,
    /// Time only `run`, with setup and teardown done once outside the timer.
    TaskRun,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Pipeline => f.write_str("pipeline"),
            Mode::TaskRun => f.write_str("task_run"),
        }
    }
}

/// Configuration for one measurement.
pub struct PerfAttributes {
    /// Number of timed iterations; must be at least one.
    pub num_running: u64,
    /// Elapsed seconds since an epoch fixed by the caller.
    pub current_timer: Timer,
    /// Mean seconds per iteration above which [`PerfResults::check_time_limit`] fails.
    pub max_time: Option<f64>,
}

impl PerfAttributes {
    /// Attributes with the given repetition count and timer.
    pub fn new(num_running: u64, current_timer: impl Fn() -> f64 + 'static) -> Self {
        Self {
            num_running,
            current_timer: Box::new(current_timer),
            max_time: Some(DEFAULT_MAX_TIME),
        }
    }

    /// Replace the time ceiling; `None` disables the check.
    pub fn with_max_time(mut self, max_time: Option<f64>) -> Self {
        self.max_time = max_time;
        self
    }

    /// Refuse attributes that cannot drive a measurement.
    pub fn validate(&self) -> Result<()> {
        if self.num_running == 0 {
            return Err(PerfError::InvalidAttributes {
                reason: "num_running must be at least 1",
            });
        }
        if let Some(limit) = self.max_time {
            if limit.is_nan() || limit <= 0.0 {
                return Err(PerfError::InvalidAttributes {
                    reason: "max_time must be positive",
                });
            }
        }
        Ok(())
    }

    fn now(&self) -> f64 {
        (self.current_timer)()
    }
}

impl Default for PerfAttributes {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_RUNNING, wall_clock())
    }
}

impl fmt::Debug for PerfAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerfAttributes")
            .field("num_running", &self.num_running)
            .field("max_time", &self.max_time)
            .finish_non_exhaustive()
    }
}

/// Aggregate computed over the timed samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Statistic {
    /// Sum of all samples.
    Total,
    /// Arithmetic mean.
    Mean,
    /// Fastest sample.
    Min,
    /// Slowest sample.
    Max,
    /// Middle sample (mean of the two middles for even counts).
    Median,
}

/// Output record of a measurement. Written only by [`PerfAnalyzer`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerfResults {
    mode: Option<Mode>,
    samples: Vec<f64>,
    stats: BTreeMap<Statistic, f64>,
}

impl PerfResults {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mode of the measurement that populated this record.
    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// True once a measurement has completed into this record.
    pub fn is_populated(&self) -> bool {
        self.mode.is_some()
    }

    /// Per-iteration elapsed seconds, in execution order.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// One aggregate, if populated.
    pub fn statistic(&self, stat: Statistic) -> Option<f64> {
        self.stats.get(&stat).copied()
    }

    /// Mean seconds per iteration (0 when unpopulated).
    pub fn time_sec(&self) -> f64 {
        self.statistic(Statistic::Mean).unwrap_or(0.0)
    }

    /// Total seconds across all iterations (0 when unpopulated).
    pub fn total_sec(&self) -> f64 {
        self.statistic(Statistic::Total).unwrap_or(0.0)
    }

    /// Fail when the mean exceeds the attributes' ceiling.
    pub fn check_time_limit(&self, attrs: &PerfAttributes) -> Result<()> {
        match attrs.max_time {
            Some(limit) if self.time_sec() > limit => Err(PerfError::TimeLimitExceeded {
                limit,
                measured: self.time_sec(),
            }),
            _ => Ok(()),
        }
    }

    /// Human-readable one-line report.
    pub fn report<'r>(&'r self, test_id: &'r str) -> PerfReport<'r> {
        PerfReport {
            test_id,
            results: self,
        }
    }

    fn populate(&mut self, mode: Mode, samples: Vec<f64>) {
        let mut sorted = samples.clone();
        sorted.sort_by(f64::total_cmp);
        let total: f64 = samples.iter().sum();
        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };

        self.stats.clear();
        self.stats.insert(Statistic::Total, total);
        self.stats.insert(Statistic::Mean, total / n as f64);
        self.stats.insert(Statistic::Min, sorted[0]);
        self.stats.insert(Statistic::Max, sorted[n - 1]);
        self.stats.insert(Statistic::Median, median);
        self.samples = samples;
        self.mode = Some(mode);
    }
}

/// `<test_id>:<mode>:<mean seconds>` line for a populated record.
#[derive(Debug, Clone, Copy)]
pub struct PerfReport<'r> {
    test_id: &'r str,
    results: &'r PerfResults,
}

impl fmt::Display for PerfReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.results.mode() {
            Some(mode) => write!(
                f,
                "{}:{}:{:.10}",
                self.test_id,
                mode,
                self.results.time_sec()
            ),
            None => write!(f, "{}:none:-", self.test_id),
        }
    }
}

/// Drives timed measurements of one bound task.
pub struct PerfAnalyzer<'t, 'a, T: TaskDef> {
    task: &'t mut Task<'a, T>,
}

impl<'t, 'a, T: TaskDef> PerfAnalyzer<'t, 'a, T> {
    /// Wrap a task that is fresh or has completed a lifecycle.
    ///
    /// The bound contract is switched to [`TestingState::Performance`], so the
    /// functional time limit never applies to a measurement.
    pub fn new(task: &'t mut Task<'a, T>) -> Self {
        task.set_testing_state(TestingState::Performance);
        Self { task }
    }

    /// Measure in the given mode.
    pub fn measure(
        &mut self,
        mode: Mode,
        attrs: &PerfAttributes,
        results: &mut PerfResults,
    ) -> Result<()> {
        match mode {
            Mode::Pipeline => self.pipeline_run(attrs, results),
            Mode::TaskRun => self.task_run(attrs, results),
        }
    }

    /// Time the full lifecycle `num_running` times.
    pub fn pipeline_run(&mut self, attrs: &PerfAttributes, results: &mut PerfResults) -> Result<()> {
        let before = results.clone();
        let sampled = self.pipeline_samples(attrs);
        self.settle(Mode::Pipeline, sampled, attrs.num_running, &before, results)
    }

    /// Prepare once, time `run` `num_running` times, finalize once.
    pub fn task_run(&mut self, attrs: &PerfAttributes, results: &mut PerfResults) -> Result<()> {
        let before = results.clone();
        let sampled = self.task_run_samples(attrs);
        self.settle(Mode::TaskRun, sampled, attrs.num_running, &before, results)
    }

    fn pipeline_samples(&mut self, attrs: &PerfAttributes) -> Result<Vec<f64>> {
        self.check_attrs(attrs)?;
        let mut samples = sample_buffer(attrs.num_running);
        for iteration in 0..attrs.num_running {
            let begin = attrs.now();
            self.lifecycle(iteration)?;
            let end = attrs.now();
            self.record(&mut samples, iteration, begin, end);
        }
        Ok(samples)
    }

    fn task_run_samples(&mut self, attrs: &PerfAttributes) -> Result<Vec<f64>> {
        self.check_attrs(attrs)?;
        self.prepare(0)?;
        let mut samples = sample_buffer(attrs.num_running);
        for iteration in 0..attrs.num_running {
            let begin = attrs.now();
            if !self.task.run() {
                return Err(self.fail(Phase::Run, iteration));
            }
            let end = attrs.now();
            self.record(&mut samples, iteration, begin, end);
        }
        if !self.task.post_processing() {
            return Err(self.fail(Phase::PostProcessing, attrs.num_running - 1));
        }
        Ok(samples)
    }

    fn settle(
        &self,
        mode: Mode,
        sampled: Result<Vec<f64>>,
        expected: u64,
        before: &PerfResults,
        results: &mut PerfResults,
    ) -> Result<()> {
        match sampled {
            Ok(samples) => {
                self.commit(mode, samples, expected, results);
                Ok(())
            }
            Err(err) => {
                assert_invariant(
                    PERF_FAILURE_SURFACED,
                    *results == *before,
                    "failed measurement modified its results",
                    Some(self.task.name()),
                );
                Err(err)
            }
        }
    }

    fn check_attrs(&self, attrs: &PerfAttributes) -> Result<()> {
        match attrs.validate() {
            Ok(()) => {
                assert_invariant(
                    PERF_ATTRS_VALID,
                    attrs.num_running >= 1,
                    "timing requires at least one iteration",
                    None,
                );
                Ok(())
            }
            Err(err) => {
                tracing::warn!(task = self.task.name(), %err, "refusing perf attributes");
                Err(err)
            }
        }
    }

    fn prepare(&mut self, iteration: u64) -> Result<()> {
        if !self.task.validation() {
            tracing::warn!(task = self.task.name(), iteration, "validation rejected contract");
            return Err(PerfError::ValidationRejected {
                task: self.task.name().to_string(),
            });
        }
        if !self.task.pre_processing() {
            return Err(self.fail(Phase::PreProcessing, iteration));
        }
        Ok(())
    }

    fn lifecycle(&mut self, iteration: u64) -> Result<()> {
        self.prepare(iteration)?;
        if !self.task.run() {
            return Err(self.fail(Phase::Run, iteration));
        }
        if !self.task.post_processing() {
            return Err(self.fail(Phase::PostProcessing, iteration));
        }
        Ok(())
    }

    fn record(&self, samples: &mut Vec<f64>, iteration: u64, begin: f64, end: f64) {
        assert_invariant(
            PERF_SEQUENTIAL,
            samples.len() as u64 == iteration,
            "iteration timed before its predecessor was recorded",
            Some(self.task.name()),
        );
        let elapsed = end - begin;
        if elapsed < 0.0 {
            tracing::warn!(
                task = self.task.name(),
                iteration,
                begin,
                end,
                "timer went backwards; clamping sample to zero"
            );
        }
        let elapsed = elapsed.max(0.0);
        tracing::debug!(task = self.task.name(), iteration, elapsed, "iteration timed");
        samples.push(elapsed);
    }

    fn fail(&self, phase: Phase, iteration: u64) -> PerfError {
        tracing::warn!(
            task = self.task.name(),
            %phase,
            iteration,
            "phase failed; aborting measurement"
        );
        PerfError::PhaseFailed {
            task: self.task.name().to_string(),
            phase,
            iteration,
        }
    }

    fn commit(&self, mode: Mode, samples: Vec<f64>, expected: u64, results: &mut PerfResults) {
        assert_invariant(
            PERF_RESULTS_POPULATED,
            samples.len() as u64 == expected,
            "results hold one sample per iteration",
            None,
        );
        results.populate(mode, samples);
        tracing::info!(
            task = self.task.name(),
            %mode,
            iterations = results.samples().len(),
            mean = results.time_sec(),
            total = results.total_sec(),
            "measurement complete"
        );
    }
}

/// Reservation for the sample vector; very large counts grow on demand.
fn sample_buffer(num_running: u64) -> Vec<f64> {
    Vec::with_capacity(num_running.min(MAX_SAMPLE_RESERVATION) as usize)
}
