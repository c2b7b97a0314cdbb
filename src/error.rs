//! Error handling policy (spec.md §7): the core never unwinds. Recoverable
//! conditions resolve to sentinels or warnings logged through a
//! [`FaultSink`]; only the two genuinely fatal conditions below ever
//! surface as an `Err`/process fault.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// More than 10 seconds elapsed between consecutive IMU samples or
    /// observations — a sensor disconnect or clock glitch, not something
    /// the filter can integrate through (spec.md §4.5 step 6, §7).
    #[error("clock glitch on tracker {codename}: {dt_secs:.3}s gap, exceeds the 10s fatal threshold")]
    ClockGlitch { codename: String, dt_secs: f64 },

    /// The crate was built with a `FLT` width that does not match what the
    /// caller expected at the ABI boundary. Must be checked before any
    /// tracker is created (spec.md §7).
    #[error("FLT width mismatch: tracker built for {built_for}-bit floats, caller expected {expected}-bit")]
    FltWidthMismatch { built_for: u8, expected: u8 },
}

/// Where a tracker reports warnings and fatal faults, supplied by the
/// owning collaborator (spec.md §3's "back-reference... provides... a
/// logging sink"). The default [`TracingFaultSink`] logs via `tracing` and
/// terminates the process on fatal faults, matching the source's
/// `SV_WARN`/`SV_INFO` plus process-level abort posture.
pub trait FaultSink {
    fn warn(&self, message: &str);
    fn fatal(&self, error: TrackerError) -> !;
}

/// Default [`FaultSink`]: structured logging via `tracing`, panicking on
/// fatal faults so the owning collaborator can restart the tracker.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFaultSink;

impl FaultSink for TracingFaultSink {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn fatal(&self, error: TrackerError) -> ! {
        tracing::error!("{}", error);
        panic!("{}", error);
    }
}

/// Test double that records warnings instead of emitting them through
/// `tracing`, so a test can assert one was raised without scraping logs.
/// Panics on a fatal fault — no test in this crate expects one.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct RecordingFaultSink {
    pub warnings: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
}

#[cfg(test)]
impl RecordingFaultSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl FaultSink for RecordingFaultSink {
    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn fatal(&self, error: TrackerError) -> ! {
        panic!("unexpected fatal fault in test: {}", error);
    }
}
