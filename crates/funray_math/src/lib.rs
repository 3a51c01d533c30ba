//! FunRay math types.
//!
//! Vector algebra comes from glam; this crate adds the ray-tracing
//! vocabulary on top of it: rays, parameter intervals, bounding boxes,
//! axis-aligned rotations and the reflect/refract formulas.

pub use glam::*;

mod aabb;
mod interval;
mod ray;
mod transform;
mod vector;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;
pub use transform::{AxisRotation, Mat3Ext};
pub use vector::{near_zero, reflect, refract, Axis};

/// RGB color, linear, components typically in [0, 1].
pub type Color = Vec3;
