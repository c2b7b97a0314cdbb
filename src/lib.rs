//! IMU pose tracker core: a Mahony-filtered orientation estimate fused with
//! a diagonal (per-signal) Kalman-style position/velocity store, driven by
//! asynchronous IMU samples and absolute pose observations.
//!
//! [`tracker::Tracker`] is the crate's public entry point.

pub mod config;
pub mod error;
pub mod flt;
pub mod imu;
pub mod mahony;
pub mod math;
pub mod observation;
pub mod predict;
pub mod sim;
pub mod state;
pub mod telemetry;
pub mod tracker;
pub mod variance;
pub mod websocket;

pub use config::TrackerConfig;
pub use error::{FaultSink, TrackerError};
pub use flt::FLT;
pub use imu::ImuSample;
pub use observation::PoseObservation;
pub use predict::PredictedPose;
pub use tracker::{Tracker, TrackerSnapshot, Velocity};
