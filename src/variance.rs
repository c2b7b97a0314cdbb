//! Scalar variance model: time-decay and the single Kalman-style blend step
//! shared by every signal in [`crate::state`].
//!
//! All per-signal covariances are treated as independent scalars (spec.md
//! §1's "no full covariance matrix" non-goal) — this is the entirety of the
//! "Kalman filter" in this tracker: one scalar weight per update.

use crate::flt::FLT;
use serde::{Deserialize, Serialize};

/// Monotonic device clock counter. Wraps at `u32::MAX`; differences must
/// always go through [`timecode_diff`].
pub type Timecode = u32;

/// Signed tick delta between two timecodes across at most one wraparound.
/// `timecode_diff(a.wrapping_add(k), a) == k` for every `|k| < 2^31`.
pub fn timecode_diff(a: Timecode, b: Timecode) -> i32 {
    a.wrapping_sub(b) as i32
}

/// Convert a signed tick delta to seconds at the given device timebase.
pub fn ticks_to_seconds(ticks: i32, timebase_hz: FLT) -> FLT {
    ticks as FLT / timebase_hz
}

/// Per-signal Kalman bookkeeping: current uncertainty, its growth rate, and
/// the timecode it was last touched at.
///
/// `variance: None` is the only valid "uninitialized" state (spec.md §3
/// invariant 2); every `Some` value is expected finite and non-negative
/// (invariant 4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KalmanInfo {
    pub variance: Option<FLT>,
    pub variance_per_second: FLT,
    pub last_update: Timecode,
}

impl KalmanInfo {
    pub fn new(variance_per_second: FLT) -> Self {
        Self {
            variance: None,
            variance_per_second,
            last_update: 0,
        }
    }

    /// The divergence threshold above which the predictor (C7) stops
    /// trusting a velocity signal and falls back to the stored value
    /// (spec.md §3 invariant 4, §4.7).
    pub fn is_untrusted(&self) -> bool {
        matches!(self.variance, Some(v) if v > 10.0)
    }

    /// Decay-only prediction: what would `variance` be at `timecode` without
    /// mutating this `KalmanInfo`. Used by predictors, which must be free of
    /// side effects (spec.md §4.7).
    pub fn decayed_variance(&self, timecode: Timecode, timebase_hz: FLT) -> Option<FLT> {
        self.variance.map(|v| {
            let dt = ticks_to_seconds(timecode_diff(timecode, self.last_update), timebase_hz);
            v + self.variance_per_second * dt
        })
    }

    /// Advance `last_update` to `timecode`, decaying the stored variance in
    /// place. This is the `predict_fn` for the two "root" random-walk
    /// signals (velocity-position, velocity-rotation) per spec.md §4.3.
    pub fn decay_to(&mut self, timecode: Timecode, timebase_hz: FLT) {
        self.variance = self.decayed_variance(timecode, timebase_hz);
        self.last_update = timecode;
    }

    /// The Kalman blend step (spec.md §4.2). Callers must already have
    /// brought `self.variance` to `timecode` (via `decay_to` or a
    /// richer `predict_fn`) before calling this; it computes the incoming
    /// weight, updates `variance` to the posterior, and advances
    /// `last_update`. The caller is responsible for blending `value` itself
    /// (linear interpolation for positions, SLERP for rotations) using the
    /// returned weight.
    pub fn blend(&mut self, timecode: Timecode, new_variance: FLT) -> FLT {
        let weight = match self.variance {
            None => 1.0,
            Some(v_prior) => {
                let combined = v_prior + new_variance;
                if combined == 0.0 {
                    1.0
                } else {
                    v_prior / combined
                }
            }
        };
        self.variance = Some(match self.variance {
            None => new_variance,
            Some(v_prior) => (1.0 - weight) * v_prior,
        });
        self.last_update = timecode;
        weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timecode_diff_round_trips() {
        let a: Timecode = 123_456;
        for k in [0i32, 1, -1, 1_000_000, -1_000_000, i32::MAX / 2, i32::MIN / 2] {
            let b = a.wrapping_add(k as u32);
            assert_eq!(timecode_diff(b, a), k);
        }
    }

    #[test]
    fn timecode_diff_wraps_correctly() {
        let a: Timecode = u32::MAX - 10;
        let b: Timecode = 5; // wrapped past u32::MAX
        assert_eq!(timecode_diff(b, a), 16);
    }

    #[test]
    fn blend_weight_is_one_when_uninitialized() {
        let mut info = KalmanInfo::new(0.1);
        let w = info.blend(0, 5.0);
        assert_eq!(w, 1.0);
        assert_eq!(info.variance, Some(5.0));
    }

    #[test]
    fn blend_weight_is_bounded() {
        let mut info = KalmanInfo::new(0.1);
        info.variance = Some(4.0);
        info.last_update = 0;
        let w = info.blend(48_000_000, 1.0);
        assert!((0.0..=1.0).contains(&w));
    }

    #[test]
    fn blend_weight_one_when_combined_variance_zero() {
        let mut info = KalmanInfo::new(0.1);
        info.variance = Some(0.0);
        let w = info.blend(0, 0.0);
        assert_eq!(w, 1.0);
    }

    #[test]
    fn decay_grows_variance_monotonically() {
        let mut info = KalmanInfo::new(1.0);
        info.variance = Some(1.0);
        info.last_update = 0;
        let v1 = info.decayed_variance(48_000_000, 48_000_000.0).unwrap();
        let v2 = info.decayed_variance(96_000_000, 48_000_000.0).unwrap();
        assert!(v2 >= v1);
    }
}
