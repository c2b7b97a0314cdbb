//! Public facade: glues the state store (C3), Mahony filter (C4), IMU
//! integrator (C5), observation integrator (C6), and predictor (C7) into
//! the single type a collaborator drives per tracked object.

use crate::config::TrackerConfig;
use crate::error::{FaultSink, TracingFaultSink};
use crate::flt::FLT;
use crate::imu::{integrate_imu, ImuSample};
use crate::math::{Quat, Vec3};
use crate::observation::{integrate_observation, PoseObservation};
use crate::predict::{predict_pose, PredictedPose};
use crate::state::{Tuning, TrackerState};
use crate::variance::Timecode;
use serde::{Deserialize, Serialize};

/// Linear and angular velocity, as read back by a collaborator (spec.md §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: Vec3,
    /// Axis-angle: direction = axis, magnitude = rad/s.
    pub angular: Vec3,
}

/// A serializable, read-only snapshot of everything a collaborator might
/// want to stream or log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    pub codename: String,
    pub position: Vec3,
    pub position_variance: FLT,
    pub orientation: Quat,
    pub orientation_variance: FLT,
    pub velocity: Velocity,
}

/// One tracked object's pose tracker. Single-writer: `imu_sample` and
/// `observation` must be called from one thread, in non-decreasing
/// `timecode` order (spec.md §5). Independent `Tracker`s share no mutable
/// state and may be driven concurrently.
pub struct Tracker {
    state: TrackerState,
    fault_sink: Box<dyn FaultSink + Send + Sync>,
}

impl Tracker {
    /// Create a tracker for one object. `timebase_hz` and `imu_freq` must
    /// stay stable for the tracker's lifetime (spec.md §5).
    pub fn new(timebase_hz: FLT, imu_freq: FLT, codename: impl Into<String>, config: TrackerConfig) -> Self {
        Self::with_fault_sink(timebase_hz, imu_freq, codename, config, Box::new(TracingFaultSink))
    }

    /// Create a tracker with a custom fault sink, for collaborators that
    /// want warnings/fatal faults routed somewhere other than `tracing`.
    pub fn with_fault_sink(
        timebase_hz: FLT,
        imu_freq: FLT,
        codename: impl Into<String>,
        config: TrackerConfig,
        fault_sink: Box<dyn FaultSink + Send + Sync>,
    ) -> Self {
        let codename = codename.into();
        let tuning = Tuning {
            acc_bias: 1.0,
            acc_var: config.imu_acc_variance,
            gyro_var: config.imu_gyro_variance,
            mahony_variance: config.imu_mahony_variance,
            obs_variance: config.obs_velocity_var,
            obs_rot_variance: config.obs_velocity_rot_var,
            use_obs_velocity: config.use_obs_velocity,
        };

        tracing::info!(
            %codename,
            filter_pose_var_per_sec = config.filter_pose_var_per_sec,
            filter_vel_var_per_sec = config.filter_vel_var_per_sec,
            imu_acc_variance = config.imu_acc_variance,
            imu_gyro_variance = config.imu_gyro_variance,
            imu_mahony_variance = config.imu_mahony_variance,
            "initializing pose tracker filter"
        );

        let state = TrackerState::new(
            timebase_hz,
            imu_freq,
            codename,
            tuning,
            config.filter_pose_var_per_sec,
            config.filter_pose_rot_var_per_sec,
            config.filter_vel_var_per_sec,
            config.filter_vel_rot_var_per_sec,
        );

        Self { state, fault_sink }
    }

    /// C5: integrate one IMU sample.
    pub fn imu_sample(&mut self, sample: ImuSample) {
        integrate_imu(&mut self.state, sample, self.fault_sink.as_ref());
    }

    /// C6: integrate one absolute pose observation.
    pub fn observation(&mut self, obs: PoseObservation) {
        integrate_observation(&mut self.state, obs, self.fault_sink.as_ref());
    }

    /// C7: extrapolate pose to `timecode`, without side effects.
    pub fn predict(&self, timecode: Timecode) -> PredictedPose {
        predict_pose(&self.state, timecode)
    }

    /// The current best pose, with every signal decayed to `timecode`
    /// (mutates the tracker; unlike `predict`, this is not side-effect
    /// free — spec.md §6).
    pub fn update(&mut self, timecode: Timecode) -> PredictedPose {
        self.state.advance_pose_to(timecode);
        PredictedPose {
            position: self.state.pose.pos.value,
            position_variance: self.state.pose.pos.info.variance.unwrap_or(-1.0),
            orientation: self.state.pose.rot.value,
            orientation_variance: self.state.pose.rot.info.variance.unwrap_or(-1.0),
        }
    }

    /// Current linear/angular velocity estimate.
    pub fn velocity(&self) -> Velocity {
        Velocity {
            linear: self.state.velocity.pos.value,
            angular: self.state.velocity.ang.value,
        }
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        let pose = predict_pose(&self.state, self.state.pose.pos.info.last_update.max(self.state.pose.rot.info.last_update));
        TrackerSnapshot {
            codename: self.state.codename.clone(),
            position: pose.position,
            position_variance: pose.position_variance,
            orientation: pose.orientation,
            orientation_variance: pose.orientation_variance,
            velocity: self.velocity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecordingFaultSink;

    const TIMEBASE_HZ: FLT = 48_000_000.0;
    const IMU_FREQ: FLT = 1000.0;

    fn tracker() -> Tracker {
        Tracker::new(TIMEBASE_HZ, IMU_FREQ, "LHR-0", TrackerConfig::default())
    }

    /// S1 — Cold start.
    #[test]
    fn s1_cold_start() {
        let mut t = tracker();
        let p0 = t.predict(0);
        assert!(!p0.position_initialized());

        t.observation(PoseObservation {
            timecode: 0,
            position: Vec3::zero(),
            orientation: Quat::identity(),
            position_variance: 0.01,
            rotation_variance: 0.01,
        });

        let p = t.update(0);
        assert_eq!(p.position, Vec3::zero());
        assert_eq!(p.orientation, Quat::identity());
        assert_eq!(p.position_variance, 0.01);
    }

    /// S2 — Pure gyro: one second of pure yaw rotation should land near
    /// a 180 degree turn about z.
    #[test]
    fn s2_pure_gyro() {
        let mut cfg = TrackerConfig::default();
        cfg.imu_mahony_variance = 0.01;
        let mut t = Tracker::with_fault_sink(
            TIMEBASE_HZ,
            IMU_FREQ,
            "LHR-1",
            cfg,
            Box::new(TracingFaultSink),
        );
        t.observation(PoseObservation {
            timecode: 0,
            position: Vec3::zero(),
            orientation: Quat::identity(),
            position_variance: 0.01,
            rotation_variance: 0.01,
        });
        // Seed the IMU dt chain.
        t.imu_sample(ImuSample {
            timecode: 0,
            gyro: Vec3::zero(),
            accel: Vec3::new(0.0, 0.0, 1.0),
            datamask: 1,
        });

        let dt_ticks = (TIMEBASE_HZ / IMU_FREQ) as u32;
        for i in 1..=1000u32 {
            t.imu_sample(ImuSample {
                timecode: i * dt_ticks,
                gyro: Vec3::new(0.0, 0.0, std::f64::consts::PI),
                accel: Vec3::new(0.0, 0.0, 1.0),
                datamask: 1,
            });
        }

        let pose = t.predict(1000 * dt_ticks);
        // Expect roughly 180 degrees about z: w ~ 0, z ~ +-1.
        assert!(pose.orientation.w.abs() < 1e-1);
        assert!((pose.orientation.z.abs() - 1.0).abs() < 1e-1);
    }

    /// S3 — Gravity-only accel: orientation should remain stable.
    #[test]
    fn s3_gravity_only() {
        let mut cfg = TrackerConfig::default();
        cfg.imu_mahony_variance = 0.01;
        let mut t = Tracker::with_fault_sink(TIMEBASE_HZ, IMU_FREQ, "LHR-2", cfg, Box::new(TracingFaultSink));
        t.observation(PoseObservation {
            timecode: 0,
            position: Vec3::zero(),
            orientation: Quat::identity(),
            position_variance: 0.01,
            rotation_variance: 0.01,
        });
        let dt_ticks = (TIMEBASE_HZ / IMU_FREQ) as u32;
        t.imu_sample(ImuSample { timecode: 0, gyro: Vec3::zero(), accel: Vec3::new(0.0, 0.0, 1.0), datamask: 1 });
        for i in 1..=10_000u32 {
            t.imu_sample(ImuSample {
                timecode: i * dt_ticks,
                gyro: Vec3::zero(),
                accel: Vec3::new(0.0, 0.0, 1.0),
                datamask: 1,
            });
        }
        let pose = t.predict(10_000 * dt_ticks);
        assert!(pose.orientation.difference(Quat::identity()) < 1e-2);
    }

    /// S5 — Time-gap warning: a 2s gap between IMU samples must log a
    /// warning but not fault (spec.md §4.5 step 6, §8 scenario S5).
    #[test]
    fn s5_time_gap_warning() {
        let sink = RecordingFaultSink::new();
        let warnings = sink.warnings.clone();
        let mut t = Tracker::with_fault_sink(TIMEBASE_HZ, IMU_FREQ, "LHR-3", TrackerConfig::default(), Box::new(sink));
        t.observation(PoseObservation {
            timecode: 0,
            position: Vec3::zero(),
            orientation: Quat::identity(),
            position_variance: 0.01,
            rotation_variance: 0.01,
        });
        // First sample only seeds last_imu (bootstrap), per spec.md §4.5 preconditions.
        t.imu_sample(ImuSample { timecode: 0, gyro: Vec3::zero(), accel: Vec3::new(0.0, 0.0, 1.0), datamask: 1 });
        assert!(warnings.lock().unwrap().is_empty());

        // Second sample arrives 2s later (96_000_000 ticks at 48MHz).
        t.imu_sample(ImuSample { timecode: 96_000_000, gyro: Vec3::zero(), accel: Vec3::new(0.0, 0.0, 1.0), datamask: 1 });

        let recorded = warnings.lock().unwrap();
        assert!(recorded.iter().any(|w| w.contains("dropping IMU packets")), "expected a dropped-packet warning, got {:?}", *recorded);
    }

    /// S6 — Divergence fallback.
    #[test]
    fn s6_divergence_fallback() {
        let mut t = tracker();
        t.observation(PoseObservation {
            timecode: 0,
            position: Vec3::new(3.0, 4.0, 5.0),
            orientation: Quat::identity(),
            position_variance: 0.01,
            rotation_variance: 0.01,
        });
        // Force divergence directly on the velocity signal.
        let forced = t.predict(0); // sanity: initialized
        assert!(forced.position_initialized());

        // Reach in via a second observation that implies a wild velocity,
        // then check predict() doesn't run away with it once variance
        // crosses the untrusted threshold.
        t.observation(PoseObservation {
            timecode: 48_000, // 1ms later: huge implied velocity
            position: Vec3::new(1003.0, 4.0, 5.0),
            orientation: Quat::identity(),
            position_variance: 100.0,
            rotation_variance: 100.0,
        });

        let predicted = t.predict(48_000 + 24_000_000);
        // Either the velocity variance diverged (>10) and position is
        // frozen at the last observation, or it's a small enough estimate
        // that extrapolation stayed bounded; assert no blow-up either way.
        assert!(predicted.position.norm() < 1_000_000.0);
        let _ = predicted;
    }
}
