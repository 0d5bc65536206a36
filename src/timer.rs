//! Elapsed-time sources for the perf analyzer.
//!
//! A timer is any `Fn() -> f64` returning seconds since an epoch fixed when
//! the timer was made. [`wall_clock`] is the real one; [`FakeClock`] is a
//! deterministic stand-in for tests.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Boxed timer as stored in `PerfAttributes`.
pub type Timer = Box<dyn Fn() -> f64>;

/// Monotonic wall-clock seconds since the call to `wall_clock`.
pub fn wall_clock() -> impl Fn() -> f64 {
    let epoch = Instant::now();
    move || epoch.elapsed().as_secs_f64()
}

/// Manually driven clock. Clones share the same time.
///
/// A ticking clock also advances by `tick` seconds each time it is read,
/// so every timed region measures at least one tick.
#[derive(Debug, Clone, Default)]
pub struct FakeClock {
    now: Rc<Cell<f64>>,
    tick: f64,
}

impl FakeClock {
    /// A clock frozen at zero until advanced.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock that advances by `tick` seconds after every read.
    pub fn ticking(tick: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(0.0)),
            tick,
        }
    }

    /// Current time without ticking.
    pub fn now(&self) -> f64 {
        self.now.get()
    }

    /// Move time forward by `secs`.
    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }

    /// A timer reading this clock.
    pub fn timer(&self) -> impl Fn() -> f64 {
        let now = Rc::clone(&self.now);
        let tick = self.tick;
        move || {
            let t = now.get();
            now.set(t + tick);
            t
        }
    }
}
