//! Synthetic pose-observation stream: a circular ground-truth trajectory
//! (same motif as the teacher's `GpsSimulator`) sampled at a low rate and
//! perturbed by Gaussian measurement noise, standing in for a poser's
//! disambiguated lighthouse solve.

use crate::flt::FLT;
use crate::math::{Quat, Vec3};
use crate::observation::PoseObservation;
use crate::variance::Timecode;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Generates one [`PoseObservation`] per call to [`Self::next`].
pub struct PoseObservationSource {
    period_ticks: u32,
    timecode: Timecode,
    update_count: u64,
    position_noise: Normal<f64>,
    /// Degrades and recovers over time, the way the teacher's HDOP does —
    /// feeds directly into the reported measurement variance.
    quality: f64,
    rng: StdRng,
}

impl PoseObservationSource {
    pub fn new(timebase_hz: FLT, update_hz: FLT, seed: u64) -> Self {
        Self {
            period_ticks: (timebase_hz / update_hz).round() as u32,
            timecode: 0,
            update_count: 0,
            position_noise: Normal::new(0.0, 0.02).expect("fixed finite stddev"),
            quality: 1.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next(&mut self) -> PoseObservation {
        let t = self.update_count as f64;

        if self.update_count % 20 == 0 {
            let delta: f64 = self.rng.gen_range(-0.2..0.2);
            self.quality = (self.quality + delta).clamp(0.3, 1.0);
        } else if self.quality < 1.0 {
            self.quality += 0.01;
        }

        let radius = 2.0;
        let angular_speed = 0.05;
        let angle = angular_speed * t;

        let true_position_f64 = (radius * angle.cos(), radius * angle.sin(), 1.0f64);
        let true_orientation = Quat::new(
            (angle / 2.0).cos() as FLT,
            0.0,
            0.0,
            (angle / 2.0).sin() as FLT,
        );

        let noise_scale = self.position_noise.std_dev() / self.quality;
        let noise = Normal::new(0.0, noise_scale).expect("finite positive stddev");
        let observed_position = Vec3::new(
            (true_position_f64.0 + noise.sample(&mut self.rng)) as FLT,
            (true_position_f64.1 + noise.sample(&mut self.rng)) as FLT,
            (true_position_f64.2 + noise.sample(&mut self.rng)) as FLT,
        );

        let observation = PoseObservation {
            timecode: self.timecode,
            position: observed_position,
            orientation: true_orientation,
            position_variance: noise_scale * noise_scale,
            rotation_variance: 0.001 / self.quality,
        };

        self.timecode = self.timecode.wrapping_add(self.period_ticks);
        self.update_count += 1;
        observation
    }
}
