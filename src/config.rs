//! Tracker configuration: the named tuning knobs from spec.md §6, expressed
//! both as a plain struct (for programmatic construction, matching the
//! teacher's `Config::default()` pattern) and as a bag of string-keyed
//! values (for parity with the source's `STATIC_CONFIG_ITEM` key strings),
//! since config persistence itself is out of core scope.

use crate::flt::FLT;
use std::collections::HashMap;

/// A single recognized config value. Distinct from `FLT`/`bool` so a caller
/// loading config from an external source (file, CLI, RPC) has one value
/// type to parse into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigValue {
    Float(FLT),
    Int(i64),
}

impl ConfigValue {
    fn as_float(self) -> FLT {
        match self {
            ConfigValue::Float(f) => f,
            ConfigValue::Int(i) => i as FLT,
        }
    }

    fn as_bool(self) -> bool {
        match self {
            ConfigValue::Float(f) => f != 0.0,
            ConfigValue::Int(i) => i != 0,
        }
    }
}

/// Resolved tracker configuration. Field names mirror the `filter-*`,
/// `imu-*`, `obs-*` config keys from spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    pub filter_pose_var_per_sec: FLT,
    pub filter_pose_rot_var_per_sec: FLT,
    pub filter_vel_var_per_sec: FLT,
    pub filter_vel_rot_var_per_sec: FLT,
    pub imu_acc_variance: FLT,
    pub imu_gyro_variance: FLT,
    pub imu_mahony_variance: FLT,
    pub use_obs_velocity: bool,
    pub obs_velocity_var: FLT,
    pub obs_velocity_rot_var: FLT,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            filter_pose_var_per_sec: 0.1,
            filter_pose_rot_var_per_sec: 0.1,
            filter_vel_var_per_sec: 1.0,
            filter_vel_rot_var_per_sec: 0.5,
            imu_acc_variance: 0.1,
            imu_gyro_variance: 0.01,
            imu_mahony_variance: -1.0,
            use_obs_velocity: true,
            obs_velocity_var: 1.0,
            obs_velocity_rot_var: 0.001,
        }
    }
}

impl TrackerConfig {
    /// Overlay recognized keys from a plain config bag onto the defaults.
    /// Unrecognized keys are ignored — config ownership (files, CLI,
    /// driver registries) lives outside the core (spec.md §1).
    pub fn from_map(values: &HashMap<String, ConfigValue>) -> Self {
        let mut cfg = Self::default();
        if let Some(v) = values.get("filter-pose-var-per-sec") {
            cfg.filter_pose_var_per_sec = v.as_float();
        }
        if let Some(v) = values.get("filter-pose-rot-var-per-sec") {
            cfg.filter_pose_rot_var_per_sec = v.as_float();
        }
        if let Some(v) = values.get("filter-vel-var-per-sec") {
            cfg.filter_vel_var_per_sec = v.as_float();
        }
        if let Some(v) = values.get("filter-vel-rot-var-per-sec") {
            cfg.filter_vel_rot_var_per_sec = v.as_float();
        }
        if let Some(v) = values.get("imu-acc-variance") {
            cfg.imu_acc_variance = v.as_float();
        }
        if let Some(v) = values.get("imu-gyro-variance") {
            cfg.imu_gyro_variance = v.as_float();
        }
        if let Some(v) = values.get("imu-mahony-variance") {
            cfg.imu_mahony_variance = v.as_float();
        }
        if let Some(v) = values.get("use-obs-velocity") {
            cfg.use_obs_velocity = v.as_bool();
        }
        if let Some(v) = values.get("obs-velocity-var") {
            cfg.obs_velocity_var = v.as_float();
        }
        if let Some(v) = values.get("obs-velocity-rot-var") {
            cfg.obs_velocity_rot_var = v.as_float();
        }
        cfg
    }
}
