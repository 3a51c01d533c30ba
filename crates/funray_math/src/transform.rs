// Rotation utilities for axis-aligned transform wrappers.
//
// glam::Mat3 already provides mul_vec3() and transpose(); these helpers add
// the bounding-box and single-axis conveniences the primitives need.

use crate::{Aabb, Axis};
use glam::{Mat3, Vec3};

/// Extension trait for Mat3 with ray tracing helpers.
pub trait Mat3Ext {
    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;
}

impl Mat3Ext for Mat3 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return *aabb;
        }

        let corners = aabb.corners();
        let first = self.mul_vec3(corners[0]);
        let (min, max) = corners[1..]
            .iter()
            .map(|&corner| self.mul_vec3(corner))
            .fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));

        Aabb::from_points(min, max)
    }
}

/// A rotation by a fixed angle around one world axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRotation {
    axis: Axis,
    degrees: f32,
    forward: Mat3,
    inverse: Mat3,
}

impl AxisRotation {
    /// Create a rotation of `degrees` around `axis` (right-handed).
    pub fn new(axis: Axis, degrees: f32) -> Self {
        let radians = degrees.to_radians();
        let forward = match axis {
            Axis::X => Mat3::from_rotation_x(radians),
            Axis::Y => Mat3::from_rotation_y(radians),
            Axis::Z => Mat3::from_rotation_z(radians),
        };

        Self {
            axis,
            degrees,
            forward,
            // Rotation matrices are orthonormal
            inverse: forward.transpose(),
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn degrees(&self) -> f32 {
        self.degrees
    }

    /// Object space to world space.
    #[inline]
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        self.forward.mul_vec3(v)
    }

    /// World space to object space.
    #[inline]
    pub fn unrotate(&self, v: Vec3) -> Vec3 {
        self.inverse.mul_vec3(v)
    }

    /// World-space bounds of an object-space box.
    pub fn rotate_aabb(&self, aabb: &Aabb) -> Aabb {
        self.forward.transform_aabb(aabb)
    }
}
