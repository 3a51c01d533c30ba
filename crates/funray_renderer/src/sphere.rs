//! Sphere primitive for ray tracing.

use crate::hittable::{HitRecord, Hittable, MaterialId};
use funray_math::{Aabb, Interval, Ray, Vec3};
use std::f32::consts::PI;

/// A sphere primitive.
pub struct Sphere {
    center: Vec3,
    radius: f32,
    material: MaterialId,
    bbox: Aabb,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, material: MaterialId) -> Self {
        let radius = radius.max(0.0);
        let rvec = Vec3::splat(radius);
        let bbox = Aabb::from_points(center - rvec, center + rvec);

        Self {
            center,
            radius,
            material,
            bbox,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// UV coordinates for a point on the unit sphere.
    ///
    /// u runs around the Y axis starting at -X, v runs from the -Y pole
    /// to the +Y pole.
    fn sphere_uv(p: Vec3) -> (f32, f32) {
        let theta = (-p.y).acos();
        let phi = (-p.z).atan2(p.x) + PI;
        (phi / (2.0 * PI), theta / PI)
    }
}

impl Hittable for Sphere {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord> {
        if self.radius <= 0.0 {
            return None;
        }

        let oc = self.center - ray.origin();
        let a = ray.direction().length_squared();
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();

        // Nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !ray_t.accepts(root) {
            root = (h + sqrtd) / a;
            if !ray_t.accepts(root) {
                return None;
            }
        }

        let outward_normal = (ray.at(root) - self.center) / self.radius;
        Some(HitRecord::new(
            ray,
            root,
            outward_normal,
            self.material,
            Self::sphere_uv(outward_normal),
        ))
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> Interval {
        Interval::new(0.001, f32::INFINITY)
    }

    #[test]
    fn test_sphere_hit() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0, MaterialId(0));
        let ray = Ray::new_simple(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));

        let rec = sphere.hit(&ray, range()).unwrap();
        assert!((rec.t - 4.0).abs() < 1e-4);
        assert!((rec.normal - Vec3::Z).length() < 1e-4);
        assert!(rec.front_face);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.5, MaterialId(0));
        let ray = Ray::new_simple(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0));
        assert!(sphere.hit(&ray, range()).is_none());
    }

    #[test]
    fn test_sphere_hit_from_inside() {
        let sphere = Sphere::new(Vec3::ZERO, 2.0, MaterialId(0));
        let ray = Ray::new_simple(Vec3::ZERO, Vec3::X);

        let rec = sphere.hit(&ray, range()).unwrap();
        assert!((rec.t - 2.0).abs() < 1e-4);
        assert!(!rec.front_face);
        assert!((rec.normal + Vec3::X).length() < 1e-4);
    }

    #[test]
    fn test_sphere_behind_ray() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0, MaterialId(0));
        let ray = Ray::new_simple(Vec3::ZERO, -Vec3::Z);
        assert!(sphere.hit(&ray, range()).is_none());
    }

    #[test]
    fn test_zero_radius_never_hits() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.0, MaterialId(0));
        let ray = Ray::new_simple(Vec3::ZERO, -Vec3::Z);
        assert!(sphere.hit(&ray, range()).is_none());
    }

    #[test]
    fn test_sphere_uv_range() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0, MaterialId(0));
        let ray = Ray::new_simple(Vec3::new(0.3, 0.2, 5.0), -Vec3::Z);
        let rec = sphere.hit(&ray, range()).unwrap();
        assert!((0.0..=1.0).contains(&rec.u));
        assert!((0.0..=1.0).contains(&rec.v));
    }

    #[test]
    fn test_sphere_bbox() {
        let sphere = Sphere::new(Vec3::new(1.0, 2.0, 3.0), 0.5, MaterialId(0));
        let bbox = sphere.bounding_box();
        assert_eq!(bbox.min(), Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(bbox.max(), Vec3::new(1.5, 2.5, 3.5));
    }
}
