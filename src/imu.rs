//! C5: per-IMU-sample integration. Runs Mahony orientation correction,
//! rotates and bias-corrects the accelerometer into world frame, trapezoidal-
//! integrates it into linear velocity, and feeds both back into the state
//! store (spec.md §4.5).

use crate::error::{FaultSink, TrackerError};
use crate::flt::{FLT, GRAVITY};
use crate::mahony::mahony_ahrs;
use crate::math::Vec3;
use crate::state::{CachedImuSample, TrackerState};
use crate::variance::{ticks_to_seconds, timecode_diff, Timecode};

/// One raw IMU reading as delivered by the device collaborator.
#[derive(Debug, Clone, Copy)]
pub struct ImuSample {
    pub timecode: Timecode,
    /// Angular velocity, rad/s, body frame.
    pub gyro: Vec3,
    /// Specific force, g, body frame.
    pub accel: Vec3,
    /// Nonzero iff this reading carries valid data. A zero datamask (or no
    /// prior sample at all) makes this call a pure cache-and-return.
    pub datamask: u8,
}

/// Integrate one IMU sample into `state`.
pub fn integrate_imu(state: &mut TrackerState, sample: ImuSample, sink: &dyn FaultSink) {
    // Mirrors the source's `last_data.datamask == 0` precondition check: no
    // usable previous sample (either none cached yet, or the previous one
    // was itself invalid) means there's nothing to form a `dt` against, so
    // this sample is cached and integration is deferred to the next call.
    // A collaborator marking the *current* sample invalid (datamask == 0)
    // is handled the same way — cached, not integrated.
    let no_prior_sample = state.last_imu.map_or(true, |c| c.datamask == 0);
    let should_bootstrap = no_prior_sample
        || sample.datamask == 0
        || state.pose.pos.info.variance.is_none()
        || state.pose.rot.info.variance.is_none();

    if should_bootstrap {
        state.last_imu = Some(CachedImuSample {
            timecode: sample.timecode,
            gyro: sample.gyro,
            accel: sample.accel,
            datamask: sample.datamask,
        });
        return;
    }

    // Step 1: orientation update via Mahony, if enabled.
    if state.tuning.mahony_variance >= 0.0 {
        let corrected = mahony_ahrs(
            state.pose.rot.value,
            sample.gyro,
            sample.accel,
            state.imu_freq,
            &mut state.integral_fb,
        );
        state.update_pose_rotation(sample.timecode, corrected, state.tuning.mahony_variance);
    }

    // Step 2: predicted angular velocity in world frame.
    let omega_world = state.pose.rot.value.rotate_vector(sample.gyro);

    // Step 3: measurement variances for the velocity update. The rotation
    // variance couples into both, which is why orientation is updated first.
    let rot_variance = state.pose.rot.info.variance.unwrap_or(FLT::INFINITY);
    let r_pos = rot_variance + state.velocity.pos.info.variance.unwrap_or(FLT::INFINITY) + state.tuning.acc_var;
    let r_rot = rot_variance + state.tuning.gyro_var;

    let last = state.last_imu.expect("bootstrap check above guarantees Some");
    let dt = ticks_to_seconds(timecode_diff(sample.timecode, last.timecode), state.timebase_hz);

    if dt > 1.0 {
        sink.warn(&format!(
            "{} is probably dropping IMU packets; {:.3}s reported between samples",
            state.codename, dt
        ));
    }
    if dt > 10.0 {
        sink.fatal(TrackerError::ClockGlitch {
            codename: state.codename.clone(),
            dt_secs: dt as f64,
        });
    }

    if r_pos.is_finite() && state.tuning.acc_var > 0.0 {
        // Step 4: trapezoidal acceleration integration.
        let a_biased = sample.accel.scale(state.tuning.acc_bias);
        let a_world = state
            .pose
            .rot
            .value
            .rotate_vector(a_biased)
            .add(Vec3::new(0.0, 0.0, -1.0))
            .scale(GRAVITY);

        let delta_v = a_world.add(state.last_acc).scale(0.5 * dt);
        let new_vel_pos = state.velocity.pos.value.add(delta_v);
        state.last_acc = a_world;

        state.update_velocity_position(sample.timecode, new_vel_pos, r_pos);
        state.update_velocity_angular(sample.timecode, omega_world, r_rot);
    } else if r_rot.is_finite() && state.tuning.gyro_var > 0.0 {
        // Step 5: fallback, angular velocity only.
        state.update_velocity_angular(sample.timecode, omega_world, r_rot);
    }

    // Step 7: cache this sample for the next call's dt.
    state.last_imu = Some(CachedImuSample {
        timecode: sample.timecode,
        gyro: sample.gyro,
        accel: sample.accel,
        datamask: sample.datamask,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TracingFaultSink;
    use crate::math::Quat;
    use crate::state::Tuning;

    fn tuning() -> Tuning {
        Tuning {
            acc_bias: 1.0,
            acc_var: 0.1,
            gyro_var: 0.01,
            mahony_variance: 0.01,
            obs_variance: 1.0,
            obs_rot_variance: 0.001,
            use_obs_velocity: true,
        }
    }

    fn ready_state() -> TrackerState {
        let mut state = TrackerState::new(48_000_000.0, 1000.0, "t", tuning(), 0.1, 0.1, 1.0, 0.5);
        state.update_pose_position(0, Vec3::zero(), 0.01);
        state.update_pose_rotation(0, Quat::identity(), 0.01);
        state
    }

    #[test]
    fn first_sample_only_caches() {
        let mut state = TrackerState::new(48_000_000.0, 1000.0, "t", tuning(), 0.1, 0.1, 1.0, 0.5);
        let sink = TracingFaultSink;
        integrate_imu(
            &mut state,
            ImuSample { timecode: 0, gyro: Vec3::zero(), accel: Vec3::new(0.0, 0.0, 1.0), datamask: 1 },
            &sink,
        );
        assert!(state.last_imu.is_some());
        assert_eq!(state.velocity.pos.info.variance, Some(1e-3));
    }

    #[test]
    fn invalid_datamask_is_cached_but_not_integrated() {
        let mut state = ready_state();
        let sink = TracingFaultSink;
        integrate_imu(
            &mut state,
            ImuSample { timecode: 0, gyro: Vec3::zero(), accel: Vec3::new(0.0, 0.0, 1.0), datamask: 1 },
            &sink,
        );
        let vel_before = state.velocity.pos.value;

        // A mid-stream sample the collaborator marks invalid must not move
        // velocity, even though gyro/accel carry plausible-looking values.
        integrate_imu(
            &mut state,
            ImuSample { timecode: 48_000, gyro: Vec3::new(1.0, 1.0, 1.0), accel: Vec3::new(5.0, 5.0, 5.0), datamask: 0 },
            &sink,
        );
        assert_eq!(state.velocity.pos.value, vel_before);
        assert_eq!(state.last_imu.unwrap().datamask, 0);

        // The following valid sample also only caches, since there is no
        // valid previous sample to form a dt against (the invalid one
        // poisoned it, same as the source's last_data.datamask == 0 check).
        integrate_imu(
            &mut state,
            ImuSample { timecode: 96_000, gyro: Vec3::zero(), accel: Vec3::new(0.0, 0.0, 1.0), datamask: 1 },
            &sink,
        );
        assert_eq!(state.velocity.pos.value, vel_before);
    }

    #[test]
    fn gravity_only_accel_keeps_velocity_near_zero() {
        let mut state = ready_state();
        let sink = TracingFaultSink;
        // Seed last_imu so the very next call actually integrates.
        integrate_imu(
            &mut state,
            ImuSample { timecode: 0, gyro: Vec3::zero(), accel: Vec3::new(0.0, 0.0, 1.0), datamask: 1 },
            &sink,
        );
        for i in 1..=1000u32 {
            integrate_imu(
                &mut state,
                ImuSample {
                    timecode: i * 48_000,
                    gyro: Vec3::zero(),
                    accel: Vec3::new(0.0, 0.0, 1.0),
                    datamask: 1,
                },
                &sink,
            );
        }
        assert!(state.velocity.pos.value.norm() < 1e-2);
    }

    #[test]
    fn orientation_stays_unit_norm_through_integration() {
        let mut state = ready_state();
        let sink = TracingFaultSink;
        for i in 0..=2000u32 {
            integrate_imu(
                &mut state,
                ImuSample {
                    timecode: i * 48_000,
                    gyro: Vec3::new(0.01, -0.02, 0.03),
                    accel: Vec3::new(0.02, 0.01, 1.0),
                    datamask: 1,
                },
                &sink,
            );
            let n = state.pose.rot.value.norm();
            assert!((n - 1.0).abs() < 1e-6);
        }
    }
}
