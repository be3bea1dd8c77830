//! Unit Quaternion
//!
//! Rotations for player orientation and the harpoon/gun offset chain.
//! Convention: (w, x, y, z), forward is local -Z (camera convention carried
//! over from the level data).

use std::fmt;
use std::ops::Mul;

use serde::{Deserialize, Serialize};

use crate::core::vec3::Vec3;

/// Unit quaternion with f32 components.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    /// Scalar component
    pub w: f32,
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Quat {
    /// Identity rotation
    pub const IDENTITY: Self = Self { w: 1.0, x: 0.0, y: 0.0, z: 0.0 };

    /// Create from raw components. Callers are expected to pass a unit
    /// quaternion; use `normalize` when in doubt.
    #[inline]
    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// Rotation of `angle` radians about a (unit) axis.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let (s, c) = (angle * 0.5).sin_cos();
        Self {
            w: c,
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
        }
    }

    /// Squared norm.
    #[inline]
    pub fn norm_squared(self) -> f32 {
        self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Renormalize to unit length. Returns IDENTITY for degenerate input
    /// (e.g. a zeroed quaternion off the wire).
    pub fn normalize(self) -> Self {
        let n = self.norm_squared().sqrt();
        if n <= f32::EPSILON {
            return Self::IDENTITY;
        }
        let inv = 1.0 / n;
        Self { w: self.w * inv, x: self.x * inv, y: self.y * inv, z: self.z * inv }
    }

    /// Conjugate; for a unit quaternion this is the inverse rotation.
    #[inline]
    pub fn conjugate(self) -> Self {
        Self { w: self.w, x: -self.x, y: -self.y, z: -self.z }
    }

    /// Rotate a vector by this quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // v' = v + 2w(q×v) + 2(q×(q×v)) with q = vector part
        let q = Vec3::new(self.x, self.y, self.z);
        let t = q.cross(v).scale(2.0);
        v + t.scale(self.w) + q.cross(t)
    }

    /// Forward direction (local -Z rotated into world space).
    #[inline]
    pub fn forward(self) -> Vec3 {
        self.rotate(Vec3::new(0.0, 0.0, -1.0))
    }

    /// Shortest-arc rotation taking unit vector `from` onto unit vector `to`.
    pub fn from_rotation_arc(from: Vec3, to: Vec3) -> Self {
        let d = from.dot(to);
        if d < -0.999_999 {
            // Antiparallel: rotate half a turn about any perpendicular axis.
            let axis = if from.x.abs() < 0.9 {
                from.cross(Vec3::new(1.0, 0.0, 0.0))
            } else {
                from.cross(Vec3::new(0.0, 1.0, 0.0))
            }
            .normalize();
            return Self::from_axis_angle(axis, std::f32::consts::PI);
        }
        let c = from.cross(to);
        Self { w: 1.0 + d, x: c.x, y: c.y, z: c.z }.normalize()
    }

    /// Rotation whose forward (-Z) axis points along `dir` (need not be unit).
    pub fn looking_along(dir: Vec3) -> Self {
        let dir = dir.normalize();
        if dir == Vec3::ZERO {
            return Self::IDENTITY;
        }
        Self::from_rotation_arc(Vec3::new(0.0, 0.0, -1.0), dir)
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Quat {
    type Output = Self;

    /// Hamilton product: `a * b` applies `b` first, then `a`.
    fn mul(self, rhs: Self) -> Self {
        Self {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }
}

impl fmt::Debug for Quat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quat({:.3}, {:.3}, {:.3}, {:.3})", self.w, self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < 1e-5
    }

    #[test]
    fn test_identity_rotation() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert!(approx(Quat::IDENTITY.rotate(v), v));
    }

    #[test]
    fn test_axis_angle_quarter_turn() {
        // 90 degrees about +Z takes +X to +Y
        let q = Quat::from_axis_angle(Vec3::UP, std::f32::consts::FRAC_PI_2);
        let rotated = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert!(approx(rotated, Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_conjugate_inverts() {
        let q = Quat::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), 0.7);
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert!(approx(q.conjugate().rotate(q.rotate(v)), v));
    }

    #[test]
    fn test_mul_composes() {
        let a = Quat::from_axis_angle(Vec3::UP, 0.3);
        let b = Quat::from_axis_angle(Vec3::UP, 0.5);
        let v = Vec3::new(1.0, 0.0, 0.0);
        assert!(approx((a * b).rotate(v), a.rotate(b.rotate(v))));
    }

    #[test]
    fn test_normalize_degenerate() {
        let zeroed = Quat::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(zeroed.normalize(), Quat::IDENTITY);
    }

    #[test]
    fn test_forward_identity() {
        assert!(approx(Quat::IDENTITY.forward(), Vec3::new(0.0, 0.0, -1.0)));
    }
}
