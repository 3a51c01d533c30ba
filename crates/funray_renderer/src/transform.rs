//! Instance wrappers that move a primitive without rebuilding it.
//!
//! Rays are carried into the wrapped object's space, intersected there,
//! and the hit point and normal are carried back out.

use crate::hittable::{HitRecord, Hittable};
use funray_math::{Aabb, Axis, AxisRotation, Interval, Ray, Vec3};

/// Rotation of a wrapped object around one world axis through the origin.
pub struct Rotate {
    object: Box<dyn Hittable>,
    rotation: AxisRotation,
    bbox: Aabb,
}

impl Rotate {
    pub fn new(object: Box<dyn Hittable>, axis: Axis, degrees: f32) -> Self {
        let rotation = AxisRotation::new(axis, degrees);
        let bbox = rotation.rotate_aabb(&object.bounding_box());
        Self {
            object,
            rotation,
            bbox,
        }
    }

    pub fn x(object: Box<dyn Hittable>, degrees: f32) -> Self {
        Self::new(object, Axis::X, degrees)
    }

    pub fn y(object: Box<dyn Hittable>, degrees: f32) -> Self {
        Self::new(object, Axis::Y, degrees)
    }

    pub fn z(object: Box<dyn Hittable>, degrees: f32) -> Self {
        Self::new(object, Axis::Z, degrees)
    }

    pub fn rotation(&self) -> &AxisRotation {
        &self.rotation
    }
}

impl Hittable for Rotate {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord> {
        let local = Ray::new(
            self.rotation.unrotate(ray.origin()),
            self.rotation.unrotate(ray.direction()),
            ray.time(),
        );

        // Rotation preserves distances along the ray and the sign of
        // direction·normal, so t and front_face carry over unchanged.
        let mut rec = self.object.hit(&local, ray_t)?;
        rec.p = self.rotation.rotate(rec.p);
        rec.normal = self.rotation.rotate(rec.normal);
        Some(rec)
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

/// Translation of a wrapped object by a fixed offset.
pub struct Translate {
    object: Box<dyn Hittable>,
    offset: Vec3,
    bbox: Aabb,
}

impl Translate {
    pub fn new(object: Box<dyn Hittable>, offset: Vec3) -> Self {
        let bbox = object.bounding_box().translate(offset);
        Self {
            object,
            offset,
            bbox,
        }
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }
}

impl Hittable for Translate {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord> {
        let local = Ray::new(ray.origin() - self.offset, ray.direction(), ray.time());
        let mut rec = self.object.hit(&local, ray_t)?;
        rec.p += self.offset;
        Some(rec)
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}
