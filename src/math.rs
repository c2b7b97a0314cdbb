//! 3-vector and unit-quaternion algebra.
//!
//! Everything the rest of the tracker needs from linear algebra lives here:
//! componentwise vector ops, Hamilton quaternion products, SLERP, and the
//! two angular-velocity/quaternion conversion primitives the filter relies
//! on to move between "rotation" and "rate of rotation" representations.

use crate::flt::{FLT, EPSILON};
use serde::{Deserialize, Serialize};

/// Ordered triple of scalars: a position, velocity, or axis-angle direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: FLT,
    pub y: FLT,
    pub z: FLT,
}

impl Vec3 {
    pub fn new(x: FLT, y: FLT, z: FLT) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, s: FLT) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn dot(self, other: Self) -> FLT {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn norm(self) -> FLT {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Self) -> FLT {
        self.sub(other).norm()
    }

    /// Unit-length copy, or the zero vector if too small to normalize.
    pub fn normalized(self) -> Self {
        let n = self.norm();
        if n > EPSILON {
            self.scale(1.0 / n)
        } else {
            Self::zero()
        }
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::zero()
    }
}

/// Unit quaternion in (w, x, y, z) order. The all-zero value is the
/// in-band sentinel for "a rotation signal that has never been set" used
/// by [`crate::state`]; every other value stored as a rotation is expected
/// to be unit-norm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub w: FLT,
    pub x: FLT,
    pub y: FLT,
    pub z: FLT,
}

impl Quat {
    pub fn new(w: FLT, x: FLT, y: FLT, z: FLT) -> Self {
        Self { w, x, y, z }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// The sentinel "never set" quaternion, distinct from identity.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn is_zero(self) -> bool {
        self.w == 0.0 && self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn vec_part(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.w + other.w, self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn scale(self, s: FLT) -> Self {
        Self::new(self.w * s, self.x * s, self.y * s, self.z * s)
    }

    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Hamilton product `self * other`.
    pub fn mul(self, other: Self) -> Self {
        Self::new(
            self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        )
    }

    pub fn norm(self) -> FLT {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit-length copy, or identity if the input underflows to zero.
    ///
    /// Quaternion underflow during normalization is not a reported error
    /// (spec.md §7); the caller never sees a NaN.
    pub fn normalized(self) -> Self {
        let n = self.norm();
        if n > EPSILON {
            self.scale(1.0 / n)
        } else {
            Self::identity()
        }
    }

    /// Rotate `v` by this (assumed unit) quaternion.
    pub fn rotate_vector(self, v: Vec3) -> Vec3 {
        let u = self.vec_part();
        let t = u.cross(v).scale(2.0);
        v.add(t.scale(self.w)).add(u.cross(t))
    }

    /// Scalar difference between two rotations in `[0, pi]`:
    /// `2 * acos(|w(a * b^-1)|)`.
    pub fn difference(self, other: Self) -> FLT {
        let d = self.mul(other.conjugate());
        2.0 * d.w.abs().min(1.0).acos()
    }

    /// Spherical linear interpolation from `self` toward `other` by `t`.
    ///
    /// `t = 0` returns `self`, `t = 1` returns `other`. Takes the shorter
    /// arc on the hypersphere and falls back to linear interpolation (then
    /// renormalizes) when the two quaternions are nearly coincident.
    pub fn slerp(self, other: Self, t: FLT) -> Self {
        let mut dot = self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z;
        let other = if dot < 0.0 {
            dot = -dot;
            other.scale(-1.0)
        } else {
            other
        };

        if dot > 0.9995 {
            return self.add(other.sub(self).scale(t)).normalized();
        }

        let theta = dot.min(1.0).acos();
        let sin_theta = theta.sin();
        let w1 = ((1.0 - t) * theta).sin() / sin_theta;
        let w2 = (t * theta).sin() / sin_theta;
        self.scale(w1).add(other.scale(w2))
    }

    fn sub(self, other: Self) -> Self {
        Self::new(self.w - other.w, self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::identity()
    }
}

/// Produce the unit quaternion representing rotation by `omega` (axis-angle,
/// rad/s) applied over `dt` seconds, composed with `q_in` as the incremental
/// (left-hand) update `q_delta * q_in` — the convention matched to
/// `velocity.AngRot` being expressed in world frame (spec.md §4.5 step 2),
/// so advancing `q_in` by a world-frame angular rate left-multiplies.
///
/// Uses the exact half-angle form with a Taylor fallback near `theta = 0`
/// so a zero or near-zero angular velocity doesn't divide by zero.
pub fn apply_ang_velocity(omega: Vec3, dt: FLT, q_in: Quat) -> Quat {
    let mag = omega.norm();
    let theta = mag * dt;

    let (cos_half, sinc_half) = if theta.abs() < 1e-4 {
        // sin(theta/2)/theta ~= 1/2 - theta^2/48, cos(theta/2) ~= 1 - theta^2/8
        (1.0 - theta * theta / 8.0, 0.5 - theta * theta / 48.0)
    } else {
        ((theta / 2.0).cos(), (theta / 2.0).sin() / theta)
    };

    let axis_term = if mag > EPSILON {
        omega.scale(sinc_half * dt)
    } else {
        Vec3::zero()
    };

    let q_delta = Quat::new(cos_half, axis_term.x, axis_term.y, axis_term.z);
    q_delta.mul(q_in).normalized()
}

/// Inverse of [`apply_ang_velocity`]: the axis-angle angular velocity (rad/s,
/// magnitude = rate, direction = axis) that rotates `q_from` into `q_to`
/// over `dt` seconds under the same left-multiplication convention.
pub fn find_ang_velocity(dt: FLT, q_from: Quat, q_to: Quat) -> Vec3 {
    if dt == 0.0 {
        return Vec3::zero();
    }
    let mut delta = q_to.mul(q_from.conjugate()).normalized();
    if delta.w < 0.0 {
        // Shorter-arc representative; (q, -q) represent the same rotation.
        delta = delta.scale(-1.0);
    }
    let w = delta.w.clamp(-1.0, 1.0);
    let angle = 2.0 * w.acos();
    let sin_half = (1.0 - w * w).max(0.0).sqrt();
    let axis = if sin_half > EPSILON {
        delta.vec_part().scale(1.0 / sin_half)
    } else {
        Vec3::zero()
    };
    axis.scale(angle / dt)
}
