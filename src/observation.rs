//! C6: integrate an absolute pose observation (derived externally from
//! lighthouse sweeps by the poser) into the tracker state, and derive an
//! implicit velocity estimate from consecutive observations (spec.md §4.6).

use crate::error::FaultSink;
use crate::flt::FLT;
use crate::math::{Quat, Vec3};
use crate::predict::predict_pose;
use crate::state::{PoseSignals, TrackerState};
use crate::variance::{ticks_to_seconds, timecode_diff, Timecode};

/// An absolute pose observation, typically produced by the poser from
/// disambiguated lighthouse angles.
#[derive(Debug, Clone, Copy)]
pub struct PoseObservation {
    pub timecode: Timecode,
    pub position: Vec3,
    pub orientation: Quat,
    /// Measurement variance: (position, rotation).
    pub position_variance: FLT,
    pub rotation_variance: FLT,
}

/// Integrate one pose observation into `state`.
pub fn integrate_observation(state: &mut TrackerState, obs: PoseObservation, sink: &dyn FaultSink) {
    let pos_variance = obs.position_variance;
    let rot_variance = obs.rotation_variance;

    // Predicted pose at this timecode, for diagnostic deltas only — the
    // source logs the before/after prediction error; we don't have a log
    // target for it, but the computation matters for parity with the
    // upstream algorithm's control flow (and its side-effect-free contract).
    let _predicted = predict_pose(state, obs.timecode);

    state.update_pose(obs.timecode, obs.position, pos_variance, obs.orientation, rot_variance);

    // The canonical implementation uses the raw observation — not the
    // blended posterior — as `last_pose`, so implicit velocity is a direct
    // finite difference of observations, decoupled from how heavily the
    // filter trusted them (spec.md §4.6 "Choice").
    let comparison_pose = PoseSignals {
        pos: crate::state::SignalPos {
            info: {
                let mut info = crate::variance::KalmanInfo::new(0.0);
                info.variance = Some(pos_variance);
                info.last_update = obs.timecode;
                info
            },
            value: obs.position,
        },
        rot: crate::state::SignalRot {
            info: {
                let mut info = crate::variance::KalmanInfo::new(0.0);
                info.variance = Some(rot_variance);
                info.last_update = obs.timecode;
                info
            },
            value: obs.orientation,
        },
    };

    if let Some(last_pose) = state.last_pose {
        let dt = ticks_to_seconds(
            timecode_diff(obs.timecode, last_pose.pos.info.last_update),
            state.timebase_hz,
        );

        if state.tuning.use_obs_velocity && !last_pose.rot.value.is_zero() && dt != 0.0 {
            if dt > 1.0 {
                sink.warn(&format!("detected {:.3}s gap between observations for {}", dt, state.codename));
            }

            let v_ang = crate::math::find_ang_velocity(dt, last_pose.rot.value, comparison_pose.rot.value);
            let v_lin = comparison_pose.pos.value.sub(last_pose.pos.value).scale(1.0 / dt);

            let pos_var =
                comparison_pose.pos.info.variance.unwrap_or(0.0) + last_pose.pos.info.variance.unwrap_or(0.0) + state.tuning.obs_variance;
            let rot_var =
                comparison_pose.rot.info.variance.unwrap_or(0.0) + last_pose.rot.info.variance.unwrap_or(0.0) + state.tuning.obs_rot_variance;

            state.update_velocity_position(obs.timecode, v_lin, pos_var);
            state.update_velocity_angular(obs.timecode, v_ang, rot_var);
        }
    }

    state.last_pose = Some(comparison_pose);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TracingFaultSink;
    use crate::state::Tuning;

    fn tuning() -> Tuning {
        Tuning {
            acc_bias: 1.0,
            acc_var: 0.1,
            gyro_var: 0.01,
            mahony_variance: -1.0,
            obs_variance: 1.0,
            obs_rot_variance: 0.001,
            use_obs_velocity: true,
        }
    }

    #[test]
    fn cold_start_first_observation_sets_pose_exactly() {
        let mut state = TrackerState::new(48_000_000.0, 1000.0, "t", tuning(), 0.1, 0.1, 1.0, 0.5);
        let sink = TracingFaultSink;
        integrate_observation(
            &mut state,
            PoseObservation {
                timecode: 0,
                position: Vec3::zero(),
                orientation: Quat::identity(),
                position_variance: 0.01,
                rotation_variance: 0.01,
            },
            &sink,
        );
        assert_eq!(state.pose.pos.value, Vec3::zero());
        assert_eq!(state.pose.rot.value, Quat::identity());
        assert_eq!(state.pose.pos.info.variance, Some(0.01));
    }

    #[test]
    fn implicit_velocity_converges_to_finite_difference() {
        // Repeated 1 m/s-consistent observations should pull the blended
        // velocity estimate toward 1.0 m/s (spec.md §8 scenario S4 speaks of
        // the estimate "approaching" 1.0, not snapping there in one step —
        // each update is a weighted blend, not a direct assignment).
        let mut state = TrackerState::new(48_000_000.0, 1000.0, "t", tuning(), 0.1, 0.1, 1.0, 0.5);
        let sink = TracingFaultSink;
        for i in 0..20u32 {
            integrate_observation(
                &mut state,
                PoseObservation {
                    timecode: i * 48_000_000,
                    position: Vec3::new(i as FLT, 0.0, 0.0),
                    orientation: Quat::identity(),
                    position_variance: 0.01,
                    rotation_variance: 0.01,
                },
                &sink,
            );
        }
        assert!((state.velocity.pos.value.x - 1.0).abs() < 0.05);
    }
}
