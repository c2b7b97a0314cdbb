//! Mahony AHRS: orientation-only complementary filter fusing gyro with the
//! gravity direction implied by the accelerometer. Yaw is unconstrained by
//! design — gravity alone can't observe it (spec.md §4.4).
//!
//! Ported from the Mahony formulation in
//! `examples/original_source/src/survive_imu.c`'s `mahony_ahrs`, itself
//! citing Mahony et al. (https://hal.archives-ouvertes.fr/hal-00488376).

use crate::flt::FLT;
use crate::math::{Quat, Vec3};

/// Proportional gain: how aggressively the accelerometer pulls pitch/roll
/// toward vertical. Canonical value from spec.md §4.4.
pub const PROP_GAIN: FLT = 0.5;

/// Integral gain. Kept for completeness; disabled (0) in the canonical
/// configuration, matching the source's `int_gain = 0`.
pub const INT_GAIN: FLT = 0.0;

/// Run one Mahony correction step.
///
/// `q` is the current orientation estimate, `gyro` and `accel` are body-frame
/// readings (accel need not be normalized), `sample_freq` is the IMU sample
/// rate in Hz, and `integral_fb` is the persistent integral-feedback
/// accumulator carried across calls.
///
/// Returns the corrected, normalized orientation. If `accel` is exactly
/// zero, no correction is applied and the gyro-only integration is
/// returned (step 1 of spec.md §4.4).
pub fn mahony_ahrs(q: Quat, gyro: Vec3, accel: Vec3, sample_freq: FLT, integral_fb: &mut Vec3) -> Quat {
    let mag_accel = accel.norm();
    let mut gyro = gyro;

    if mag_accel != 0.0 {
        let accel = accel.scale(1.0 / mag_accel);

        // Predicted gravity direction in body frame: q^-1 * (0,0,1),
        // expanded in closed form.
        let v = Vec3::new(
            2.0 * (q.x * q.z - q.w * q.y),
            2.0 * (q.w * q.x + q.y * q.z),
            q.w * q.w - 0.5 + q.z * q.z,
        );

        let error = accel.cross(v);

        if INT_GAIN > 0.0 {
            let fb_correction = error.scale(INT_GAIN * 2.0 / sample_freq);
            *integral_fb = integral_fb.add(fb_correction);
            gyro = gyro.add(*integral_fb);
        }

        gyro = gyro.add(error.scale(PROP_GAIN * 2.0));
    }

    gyro = gyro.scale(0.5 / sample_freq);

    let correction = Quat::new(
        -q.x * gyro.x - q.y * gyro.y - q.z * gyro.z,
        q.w * gyro.x + q.y * gyro.z - q.z * gyro.y,
        q.w * gyro.y - q.x * gyro.z + q.z * gyro.x,
        q.w * gyro.z + q.x * gyro.y - q.y * gyro.x,
    );

    q.add(correction).normalized()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_accel_skips_correction_but_still_integrates_gyro() {
        let q = Quat::identity();
        let mut fb = Vec3::zero();
        let out = mahony_ahrs(q, Vec3::new(0.0, 0.0, 1.0), Vec3::zero(), 1000.0, &mut fb);
        assert!(out.norm() > 0.999 && out.norm() < 1.001);
        assert_ne!(out, q);
    }

    #[test]
    fn gravity_aligned_orientation_stays_stable() {
        let mut q = Quat::identity();
        let mut fb = Vec3::zero();
        for _ in 0..10_000 {
            q = mahony_ahrs(q, Vec3::zero(), Vec3::new(0.0, 0.0, 1.0), 1000.0, &mut fb);
        }
        assert!(q.difference(Quat::identity()) < 1e-2);
    }

    #[test]
    fn output_is_always_unit_norm() {
        let mut q = Quat::identity();
        let mut fb = Vec3::zero();
        for i in 0..1000 {
            let t = i as FLT * 0.001;
            q = mahony_ahrs(
                q,
                Vec3::new(0.05 * t.sin(), 0.03 * t.cos(), 0.01),
                Vec3::new(0.1 * t.cos(), 0.0, 1.0),
                1000.0,
                &mut fb,
            );
            assert!((q.norm() - 1.0).abs() < 1e-6);
        }
    }
}
