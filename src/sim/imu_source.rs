//! Synthetic IMU stream: a tumbling body with sinusoidal angular rate and
//! a gently oscillating linear acceleration on top of gravity, plus
//! Gaussian sensor noise.

use crate::flt::{FLT, GRAVITY};
use crate::imu::ImuSample;
use crate::math::Vec3;
use crate::variance::Timecode;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Generates one [`ImuSample`] per call to [`Self::next`], advancing an
/// internal tick counter by a fixed period.
pub struct ImuSampleSource {
    timebase_hz: FLT,
    period_ticks: u32,
    timecode: Timecode,
    tick_count: u64,
    accel_noise: Normal<f64>,
    gyro_noise: Normal<f64>,
    rng: StdRng,
}

impl ImuSampleSource {
    /// `timebase_hz` is the tracker's tick rate; `sample_hz` the IMU's own
    /// output rate (must divide evenly enough to round to whole ticks).
    pub fn new(timebase_hz: FLT, sample_hz: FLT, seed: u64) -> Self {
        Self {
            timebase_hz,
            period_ticks: (timebase_hz / sample_hz).round() as u32,
            timecode: 0,
            tick_count: 0,
            accel_noise: Normal::new(0.0, 0.05).expect("fixed finite stddev"),
            gyro_noise: Normal::new(0.0, 0.005).expect("fixed finite stddev"),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Produce the next sample and advance internal time.
    pub fn next(&mut self) -> ImuSample {
        let t = self.tick_count as f64 * (self.period_ticks as f64 / self.timebase_hz as f64);

        let gravity_g = GRAVITY as f64;
        let gyro = Vec3::new(
            (0.1 * (0.3 * t).sin() + self.gyro_noise.sample(&mut self.rng)) as FLT,
            (0.08 * (0.2 * t).cos() + self.gyro_noise.sample(&mut self.rng)) as FLT,
            (0.05 * (0.15 * t).sin() + self.gyro_noise.sample(&mut self.rng)) as FLT,
        );

        // Specific force in g: gravity (body assumed near-level) plus a
        // gentle oscillating maneuver, plus noise.
        let accel = Vec3::new(
            (0.05 * (0.1 * t).sin() + self.accel_noise.sample(&mut self.rng) / gravity_g) as FLT,
            (0.03 * (0.15 * t).cos() + self.accel_noise.sample(&mut self.rng) / gravity_g) as FLT,
            (1.0 + 0.02 * (0.05 * t).sin() + self.accel_noise.sample(&mut self.rng) / gravity_g) as FLT,
        );

        let sample = ImuSample {
            timecode: self.timecode,
            gyro,
            accel,
            datamask: 1,
        };

        self.timecode = self.timecode.wrapping_add(self.period_ticks);
        self.tick_count += 1;
        sample
    }
}
