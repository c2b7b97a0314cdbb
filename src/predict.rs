//! C7: extrapolate the tracked pose to an arbitrary future timecode using
//! stored velocity, without mutating tracker state (spec.md §4.7).
//!
//! This implements per-axis prediction exactly as spec.md describes it:
//! position and rotation each fall back independently to their stored value
//! (with decayed variance only) once their own velocity signal's variance
//! exceeds the divergence threshold. The source (`survive_imu_tracker_predict`
//! in `examples/original_source/src/survive_imu.c`) additionally freezes
//! *both* axes whenever *either* velocity diverges; spec.md's Predictor
//! section describes only the per-axis guard, so that's what's implemented
//! here (see DESIGN.md).

use crate::flt::FLT;
use crate::math::{Quat, Vec3};
use crate::state::TrackerState;
use crate::variance::Timecode;

/// A pose prediction. A negative `*_variance` is the sentinel for "this
/// signal has never been initialized" (spec.md §3 invariant 2).
#[derive(Debug, Clone, Copy)]
pub struct PredictedPose {
    pub position: Vec3,
    pub position_variance: FLT,
    pub orientation: Quat,
    pub orientation_variance: FLT,
}

impl PredictedPose {
    pub fn position_initialized(&self) -> bool {
        self.position_variance >= 0.0
    }

    pub fn orientation_initialized(&self) -> bool {
        self.orientation_variance >= 0.0
    }
}

/// Predict pose at `timecode` without side effects.
pub fn predict_pose(state: &TrackerState, timecode: Timecode) -> PredictedPose {
    let (position, position_variance) = match state.predict_position(timecode) {
        Some((p, v)) => (p, v),
        None => (Vec3::zero(), -1.0),
    };
    let (orientation, orientation_variance) = match state.predict_rotation(timecode) {
        Some((q, v)) => (q, v),
        None => (Quat::zero(), -1.0),
    };
    PredictedPose {
        position,
        position_variance,
        orientation,
        orientation_variance,
    }
}
