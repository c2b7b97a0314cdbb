//! Synthetic signal generators for the demo harness in [`crate::main`]. Not
//! part of the tracker core — a collaborator normally supplies real IMU
//! samples and poser observations instead (spec.md §1 "External
//! Collaborators").

pub mod imu_source;
pub mod pose_source;

pub use imu_source::ImuSampleSource;
pub use pose_source::PoseObservationSource;
