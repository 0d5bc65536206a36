//! PPT Invariant System: Runtime invariant enforcement with contract tracking.

#[cfg(feature = "ppt")]
use lazy_static::lazy_static;
#[cfg(feature = "ppt")]
use std::collections::HashSet;
#[cfg(feature = "ppt")]
use std::sync::Mutex;

// Invariant constants for contract tracking
pub const LIFECYCLE_ORDER: u32 = 1;
pub const VALIDATION_GATE: u32 = 2;
pub const REJECTION_UNTOUCHED: u32 = 3;
pub const PERF_ATTRS_VALID: u32 = 4;
pub const PERF_SEQUENTIAL: u32 = 5;
pub const PERF_RESULTS_POPULATED: u32 = 6;
pub const PERF_FAILURE_SURFACED: u32 = 7;
pub const FUNCTIONAL_TIME_LIMIT: u32 = 8;

#[cfg(feature = "ppt")]
lazy_static! {
    static ref INVARIANT_LOG: Mutex<HashSet<u32>> = Mutex::new(HashSet::new());
}

#[cfg(feature = "ppt")]
/// Assert an invariant: logs it and panics on failure.
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, context: Option<&str>) {
    if !condition {
        let full_message = if let Some(ctx) = context {
            format!(
                "Invariant {} ({}) failed: {} (context: {})",
                id,
                invariant_name(id),
                message,
                ctx
            )
        } else {
            format!("Invariant {} ({}) failed: {}", id, invariant_name(id), message)
        };
        tracing::error!(invariant = id, "{}", full_message);
        panic!("{}", full_message);
    }
    // A poisoned log only means another thread panicked on an invariant.
    INVARIANT_LOG
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(id);
}

#[cfg(not(feature = "ppt"))]
/// Assert an invariant: checks condition and panics on failure.
pub fn assert_invariant(id: u32, condition: bool, message: &str, _context: Option<&str>) {
    if !condition {
        panic!("Invariant ({}) failed: {}", invariant_name(id), message);
    }
}

#[cfg(feature = "ppt")]
/// Contract test: checks that specified invariants were asserted.
pub fn contract_test(test_name: &str, required_invariants: &[u32]) {
    let log = INVARIANT_LOG
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let missing: Vec<u32> = required_invariants
        .iter()
        .copied()
        .filter(|inv| !log.contains(inv))
        .collect();
    drop(log); // Drop the lock before panicking
    if !missing.is_empty() {
        panic!(
            "Contract test '{}' failed: invariants not enforced: {:?}",
            test_name, missing
        );
    }
}

#[cfg(not(feature = "ppt"))]
/// Contract test: no-op when PPT feature is disabled.
pub fn contract_test(_test_name: &str, _required_invariants: &[u32]) {}

#[cfg(feature = "ppt")]
/// Clear invariant log (for between test runs).
pub fn clear_invariant_log() {
    INVARIANT_LOG
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clear();
}

#[cfg(not(feature = "ppt"))]
/// Clear invariant log: no-op when PPT feature is disabled.
pub fn clear_invariant_log() {}

/// Maps invariant ID to human-readable name (for diagnostics only).
pub const fn invariant_name(id: u32) -> &'static str {
    match id {
        LIFECYCLE_ORDER => "LIFECYCLE_ORDER",
        VALIDATION_GATE => "VALIDATION_GATE",
        REJECTION_UNTOUCHED => "REJECTION_UNTOUCHED",
        PERF_ATTRS_VALID => "PERF_ATTRS_VALID",
        PERF_SEQUENTIAL => "PERF_SEQUENTIAL",
        PERF_RESULTS_POPULATED => "PERF_RESULTS_POPULATED",
        PERF_FAILURE_SURFACED => "PERF_FAILURE_SURFACED",
        FUNCTIONAL_TIME_LIMIT => "FUNCTIONAL_TIME_LIMIT",
        _ => "UNKNOWN",
    }
}
