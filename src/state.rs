//! The tracked object's state store: the four Kalman-style signals (pose
//! position/rotation, velocity linear/angular) plus the bookkeeping needed
//! to integrate asynchronous IMU samples and pose observations.
//!
//! The original C implementation wires each signal's "predict forward"
//! behavior through a function pointer stashed in a reinterpret-cast base
//! struct. Here that capability is four concrete predict/update method
//! pairs — one per signal — rather than a dispatched vtable; the value
//! types differ per signal (`Vec3` vs `Quat`) so a single dispatch point
//! would need to erase that distinction right back out again.

use crate::flt::FLT;
use crate::math::{Quat, Vec3};
use crate::variance::{ticks_to_seconds, timecode_diff, KalmanInfo, Timecode};
use serde::{Deserialize, Serialize};

/// A scalar-grouped position signal: pose-position or velocity-position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalPos {
    pub info: KalmanInfo,
    pub value: Vec3,
}

impl SignalPos {
    pub fn new(variance_per_second: FLT) -> Self {
        Self {
            info: KalmanInfo::new(variance_per_second),
            value: Vec3::zero(),
        }
    }
}

/// A unit-quaternion rotation signal: pose-rotation. `value == Quat::zero()`
/// is the "never set" sentinel (spec.md §3 invariant 1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalRot {
    pub info: KalmanInfo,
    pub value: Quat,
}

impl SignalRot {
    pub fn new(variance_per_second: FLT) -> Self {
        Self {
            info: KalmanInfo::new(variance_per_second),
            value: Quat::zero(),
        }
    }
}

/// Axis-angle angular velocity signal (direction = axis, magnitude = rad/s).
/// Distinct from [`SignalRot`] so the two are never confused by layout, per
/// the redesign flag about reinterpreting a rotation signal as a position
/// signal (spec.md §9 item 3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalAngVel {
    pub info: KalmanInfo,
    pub value: Vec3,
}

impl SignalAngVel {
    pub fn new(variance_per_second: FLT) -> Self {
        Self {
            info: KalmanInfo::new(variance_per_second),
            value: Vec3::zero(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoseSignals {
    pub pos: SignalPos,
    pub rot: SignalRot,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VelocitySignals {
    pub pos: SignalPos,
    pub ang: SignalAngVel,
}

/// Tuning parameters resolved from [`crate::config::TrackerConfig`] at init
/// and read thereafter by value — the "periodic snapshotting" replacement
/// for the source's live-bound config pointers (spec.md §9).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tuning {
    pub acc_bias: FLT,
    pub acc_var: FLT,
    pub gyro_var: FLT,
    /// Variance of the Mahony-filtered orientation measurement. Negative
    /// disables Mahony fusion entirely (spec.md §6).
    pub mahony_variance: FLT,
    pub obs_variance: FLT,
    pub obs_rot_variance: FLT,
    pub use_obs_velocity: bool,
}

/// One IMU sample as last seen by the integrator, cached to compute the
/// next sample's `dt` and to gate "no previous sample yet" bootstrapping.
/// `datamask == 0` is the same "never had a valid sample" sentinel the
/// source uses on its `last_data` struct (spec.md §4.5 preconditions).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CachedImuSample {
    pub timecode: Timecode,
    pub gyro: Vec3,
    pub accel: Vec3,
    pub datamask: u8,
}

/// The full per-tracked-object state. Single-writer: only the IMU
/// integrator (C5) and observation integrator (C6) ever mutate it, and both
/// must be called from the same thread for a given tracker (spec.md §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerState {
    pub pose: PoseSignals,
    pub velocity: VelocitySignals,
    /// Snapshot of the most recently integrated observation, used to
    /// derive implicit velocity on the next one (spec.md §3, §4.6).
    pub last_pose: Option<PoseSignals>,
    pub last_imu: Option<CachedImuSample>,
    /// Most recent world-frame, gravity-subtracted acceleration, for
    /// trapezoidal integration (spec.md §4.5 step 4).
    pub last_acc: Vec3,
    pub integral_fb: Vec3,
    pub tuning: Tuning,
    pub timebase_hz: FLT,
    pub imu_freq: FLT,
    pub codename: String,
}

impl TrackerState {
    pub fn new(
        timebase_hz: FLT,
        imu_freq: FLT,
        codename: impl Into<String>,
        tuning: Tuning,
        pose_var_per_sec: FLT,
        pose_rot_var_per_sec: FLT,
        vel_var_per_sec: FLT,
        vel_rot_var_per_sec: FLT,
    ) -> Self {
        // Velocity signals are seeded with a small initial variance rather
        // than the sentinel — they are the "root" random-walk signals and
        // start at rest with modest confidence (matches
        // `survive_imu_tracker_init`'s 1e-3 seed).
        let mut velocity_pos = SignalPos::new(vel_var_per_sec);
        velocity_pos.info.variance = Some(1e-3);
        let mut velocity_ang = SignalAngVel::new(vel_rot_var_per_sec);
        velocity_ang.info.variance = Some(1e-3);

        Self {
            pose: PoseSignals {
                pos: SignalPos::new(pose_var_per_sec),
                rot: SignalRot::new(pose_rot_var_per_sec),
            },
            velocity: VelocitySignals {
                pos: velocity_pos,
                ang: velocity_ang,
            },
            last_pose: None,
            last_imu: None,
            last_acc: Vec3::zero(),
            integral_fb: Vec3::zero(),
            tuning,
            timebase_hz,
            imu_freq,
            codename: codename.into(),
        }
    }

    fn seconds_since(&self, timecode: Timecode, last_update: Timecode) -> FLT {
        ticks_to_seconds(timecode_diff(timecode, last_update), self.timebase_hz)
    }

    // ---- C7 predictors (read-only; see crate::predict for the public API) ----

    /// Root signal: identity value, variance decayed only.
    pub fn predict_velocity_position(&self, timecode: Timecode) -> (Vec3, FLT) {
        let variance = self
            .velocity
            .pos
            .info
            .decayed_variance(timecode, self.timebase_hz)
            .unwrap_or(self.velocity.pos.info.variance_per_second);
        (self.velocity.pos.value, variance)
    }

    /// Root signal: identity value, variance decayed only.
    pub fn predict_velocity_rotation(&self, timecode: Timecode) -> (Vec3, FLT) {
        let variance = self
            .velocity
            .ang
            .info
            .decayed_variance(timecode, self.timebase_hz)
            .unwrap_or(self.velocity.ang.info.variance_per_second);
        (self.velocity.ang.value, variance)
    }

    /// Extrapolate pose-position to `timecode` using stored velocity, with
    /// the variance-divergence fallback (spec.md §4.7). `None` if the
    /// position signal has never been initialized.
    pub fn predict_position(&self, timecode: Timecode) -> Option<(Vec3, FLT)> {
        let pos_variance = self.pose.pos.info.variance?;
        let pose_dt = self
            .seconds_since(timecode, self.pose.pos.info.last_update)
            .clamp(0.0, 0.5);
        let (vel, vel_var) = self.predict_velocity_position(timecode);

        if vel_var > 10.0 {
            let variance = pos_variance + pose_dt * self.pose.pos.info.variance_per_second;
            return Some((self.pose.pos.value, variance));
        }

        let value = self.pose.pos.value.add(vel.scale(pose_dt));
        let variance =
            pos_variance + pose_dt * (vel_var * vel_var + self.pose.pos.info.variance_per_second);
        Some((value, variance))
    }

    /// Extrapolate pose-rotation to `timecode` using stored angular
    /// velocity, mirroring [`Self::predict_position`]. `None` if the
    /// rotation signal is still the zero sentinel.
    pub fn predict_rotation(&self, timecode: Timecode) -> Option<(Quat, FLT)> {
        if self.pose.rot.value.is_zero() {
            return self.pose.rot.info.variance.map(|v| (Quat::zero(), v));
        }
        let rot_variance = self.pose.rot.info.variance?;
        let rot_dt = self
            .seconds_since(timecode, self.pose.rot.info.last_update)
            .clamp(0.0, 0.5);
        let (vel, vel_var) = self.predict_velocity_rotation(timecode);

        if vel_var > 10.0 {
            let variance = rot_variance + rot_dt * self.pose.rot.info.variance_per_second;
            return Some((self.pose.rot.value, variance));
        }

        let value = crate::math::apply_ang_velocity(vel, rot_dt, self.pose.rot.value);
        let variance = rot_variance + rot_dt * (vel_var + self.pose.rot.info.variance_per_second);
        Some((value, variance))
    }

    /// Decay-only advance of the pose signals to `timecode`, with no
    /// incoming measurement to blend. This is what the public `update()`
    /// query does (spec.md §6): bring every signal's value and variance
    /// current, but don't fuse anything new in.
    pub fn advance_pose_to(&mut self, timecode: Timecode) {
        if let Some((value, variance)) = self.predict_position(timecode) {
            self.pose.pos.value = value;
            self.pose.pos.info.variance = Some(variance);
        }
        self.pose.pos.info.last_update = timecode;

        if let Some((value, variance)) = self.predict_rotation(timecode) {
            self.pose.rot.value = value;
            self.pose.rot.info.variance = Some(variance);
        }
        self.pose.rot.info.last_update = timecode;
    }

    // ---- C3 updates (mutating) ----

    /// Blend a new position measurement into pose-position.
    pub fn update_pose_position(&mut self, timecode: Timecode, new_value: Vec3, new_variance: FLT) -> FLT {
        if let Some((value, variance)) = self.predict_position(timecode) {
            self.pose.pos.value = value;
            self.pose.pos.info.variance = Some(variance);
        }
        self.pose.pos.info.last_update = timecode;
        let w = self.pose.pos.info.blend(timecode, new_variance);
        self.pose.pos.value = self.pose.pos.value.add(new_value.sub(self.pose.pos.value).scale(w));
        w
    }

    /// Blend a new rotation measurement into pose-rotation. Bootstraps
    /// unconditionally (skipping the blend) while the signal is still the
    /// zero sentinel (spec.md §4.3).
    pub fn update_pose_rotation(&mut self, timecode: Timecode, new_value: Quat, new_variance: FLT) -> FLT {
        if self.pose.rot.value.is_zero() {
            self.pose.rot.value = new_value;
            self.pose.rot.info.variance = Some(new_variance);
            self.pose.rot.info.last_update = timecode;
            return 1.0;
        }

        if let Some((value, variance)) = self.predict_rotation(timecode) {
            self.pose.rot.value = value;
            self.pose.rot.info.variance = Some(variance);
        }
        self.pose.rot.info.last_update = timecode;
        let w = self.pose.rot.info.blend(timecode, new_variance);
        self.pose.rot.value = self.pose.rot.value.slerp(new_value, w);
        w
    }

    /// Blend position and rotation observations together (spec.md §4.3).
    pub fn update_pose(
        &mut self,
        timecode: Timecode,
        new_pos: Vec3,
        pos_variance: FLT,
        new_rot: Quat,
        rot_variance: FLT,
    ) {
        self.update_pose_position(timecode, new_pos, pos_variance);
        self.update_pose_rotation(timecode, new_rot, rot_variance);
    }

    /// Blend a new linear-velocity measurement (root random-walk signal:
    /// predict_fn is decay-only).
    pub fn update_velocity_position(&mut self, timecode: Timecode, new_value: Vec3, new_variance: FLT) -> FLT {
        self.velocity.pos.info.decay_to(timecode, self.timebase_hz);
        let w = self.velocity.pos.info.blend(timecode, new_variance);
        self.velocity.pos.value = self
            .velocity
            .pos
            .value
            .add(new_value.sub(self.velocity.pos.value).scale(w));
        w
    }

    /// Blend a new angular-velocity measurement (root random-walk signal).
    pub fn update_velocity_angular(&mut self, timecode: Timecode, new_value: Vec3, new_variance: FLT) -> FLT {
        self.velocity.ang.info.decay_to(timecode, self.timebase_hz);
        let w = self.velocity.ang.info.blend(timecode, new_variance);
        self.velocity.ang.value = self
            .velocity
            .ang
            .value
            .add(new_value.sub(self.velocity.ang.value).scale(w));
        w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn fresh_state() -> TrackerState {
        TrackerState::new(48_000_000.0, 1000.0, "test", tuning(), 0.1, 0.1, 1.0, 0.5)
    }

    #[test]
    fn sentinel_position_predicts_none() {
        let state = fresh_state();
        assert!(state.predict_position(0).is_none());
    }

    #[test]
    fn first_position_observation_is_trusted_fully() {
        let mut state = fresh_state();
        let w = state.update_pose_position(0, Vec3::new(1.0, 2.0, 3.0), 0.01);
        assert_eq!(w, 1.0);
        assert_eq!(state.pose.pos.value, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(state.pose.pos.info.variance, Some(0.01));
    }

    #[test]
    fn rotation_bootstraps_from_zero_sentinel() {
        let mut state = fresh_state();
        let q = Quat::new(0.7071, 0.7071, 0.0, 0.0);
        let w = state.update_pose_rotation(0, q, 0.01);
        assert_eq!(w, 1.0);
        assert_eq!(state.pose.rot.value, q);
    }

    #[test]
    fn zero_observation_variance_is_exact_posterior() {
        let mut state = fresh_state();
        state.update_pose_position(0, Vec3::new(1.0, 1.0, 1.0), 0.01);
        state.update_pose_position(48_000_000, Vec3::new(5.0, 5.0, 5.0), 0.0);
        assert_eq!(state.pose.pos.value, Vec3::new(5.0, 5.0, 5.0));
        assert_eq!(state.pose.pos.info.variance, Some(0.0));
    }
}
