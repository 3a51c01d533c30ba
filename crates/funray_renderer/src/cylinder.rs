//! Capped cylinder aligned with the Y axis.

use crate::hittable::{HitRecord, Hittable, MaterialId};
use funray_math::{Aabb, Interval, Ray, Vec3};
use std::f32::consts::PI;

/// Side hits closer than this are treated as self-intersections.
const SIDE_EPSILON: f32 = 1e-4;

/// A closed cylinder around the vertical line through `center`.
///
/// `top` and `bottom` are offsets from `center.y` to the two caps.
pub struct Cylinder {
    center: Vec3,
    top: f32,
    bottom: f32,
    radius: f32,
    material: MaterialId,
    bbox: Aabb,
}

impl Cylinder {
    pub fn new(center: Vec3, top: f32, bottom: f32, radius: f32, material: MaterialId) -> Self {
        let (bottom, top) = (top.min(bottom), top.max(bottom));
        let radius = radius.max(0.0);
        let bbox = Aabb::from_points(
            center + Vec3::new(-radius, bottom, -radius),
            center + Vec3::new(radius, top, radius),
        );

        Self {
            center,
            top,
            bottom,
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

    fn angle_u(local: Vec3) -> f32 {
        (local.z.atan2(local.x) + PI) / (2.0 * PI)
    }

    /// Nearest cap crossing inside the radius.
    ///
    /// Returns the distance and the local outward normal.
    fn hit_caps(&self, o: Vec3, d: Vec3, ray_t: Interval) -> Option<(f32, Vec3, (f32, f32))> {
        if d.y == 0.0 {
            return None;
        }

        let r2 = self.radius * self.radius;
        let mut best = None;
        let mut range = ray_t;

        for (plane, normal, v) in [(self.top, Vec3::Y, 1.0), (self.bottom, -Vec3::Y, 0.0)] {
            let t = (plane - o.y) / d.y;
            if !range.accepts(t) {
                continue;
            }
            let p = o + t * d;
            if p.x * p.x + p.z * p.z < r2 {
                range = range.with_max(t);
                best = Some((t, normal, (Self::angle_u(p), v)));
            }
        }

        best
    }

    /// Nearest crossing of the curved side between the caps.
    fn hit_side(&self, o: Vec3, d: Vec3, ray_t: Interval) -> Option<(f32, Vec3, (f32, f32))> {
        let a = d.x * d.x + d.z * d.z;
        if a == 0.0 {
            return None;
        }

        let half_b = o.x * d.x + o.z * d.z;
        let c = o.x * o.x + o.z * o.z - self.radius * self.radius;
        let discriminant = half_b * half_b - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();
        for t in [(-half_b - sqrtd) / a, (-half_b + sqrtd) / a] {
            if t <= SIDE_EPSILON || !ray_t.accepts(t) {
                continue;
            }
            let p = o + t * d;
            if p.y > self.bottom && p.y < self.top {
                let normal = Vec3::new(p.x / self.radius, 0.0, p.z / self.radius);
                let v = (p.y - self.bottom) / (self.top - self.bottom);
                return Some((t, normal, (Self::angle_u(p), v)));
            }
        }

        None
    }
}

impl Hittable for Cylinder {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord> {
        if self.radius <= 0.0 || self.top <= self.bottom {
            return None;
        }

        // Work relative to the axis; directions are unchanged.
        let o = ray.origin() - self.center;
        let d = ray.direction();

        let cap = self.hit_caps(o, d, ray_t);
        let side_range = cap.map_or(ray_t, |(t, _, _)| ray_t.with_max(t));
        let (t, normal, uv) = self.hit_side(o, d, side_range).or(cap)?;

        Some(HitRecord::new(ray, t, normal, self.material, uv))
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

    fn unit_cylinder() -> Cylinder {
        Cylinder::new(Vec3::ZERO, 1.0, -1.0, 1.0, MaterialId(0))
    }

    #[test]
    fn test_side_hit() {
        let cyl = unit_cylinder();
        let ray = Ray::new_simple(Vec3::new(5.0, 0.0, 0.0), -Vec3::X);

        let rec = cyl.hit(&ray, range()).unwrap();
        assert!((rec.t - 4.0).abs() < 1e-4);
        assert!((rec.normal - Vec3::X).length() < 1e-4);
        assert!(rec.front_face);
    }

    #[test]
    fn test_top_cap_hit() {
        let cyl = unit_cylinder();
        let ray = Ray::new_simple(Vec3::new(0.2, 5.0, 0.1), -Vec3::Y);

        let rec = cyl.hit(&ray, range()).unwrap();
        assert!((rec.t - 4.0).abs() < 1e-4);
        assert_eq!(rec.normal, Vec3::Y);
        assert!(rec.front_face);
    }

    #[test]
    fn test_bottom_cap_hit() {
        let cyl = unit_cylinder();
        let ray = Ray::new_simple(Vec3::new(0.0, -3.0, 0.0), Vec3::Y);

        let rec = cyl.hit(&ray, range()).unwrap();
        assert!((rec.t - 2.0).abs() < 1e-4);
        assert_eq!(rec.normal, -Vec3::Y);
    }

    #[test]
    fn test_ray_above_cylinder_misses() {
        let cyl = unit_cylinder();
        let ray = Ray::new_simple(Vec3::new(5.0, 2.0, 0.0), -Vec3::X);
        assert!(cyl.hit(&ray, range()).is_none());
    }

    #[test]
    fn test_caps_behind_origin_miss() {
        let cyl = unit_cylinder();
        let ray = Ray::new_simple(Vec3::new(0.0, 5.0, 0.0), Vec3::Y);
        assert!(cyl.hit(&ray, range()).is_none());
    }

    #[test]
    fn test_exit_through_cap_from_inside() {
        let cyl = unit_cylinder();
        let ray = Ray::new_simple(Vec3::ZERO, Vec3::Y);

        let rec = cyl.hit(&ray, range()).unwrap();
        assert!((rec.t - 1.0).abs() < 1e-4);
        assert!(!rec.front_face);
        assert_eq!(rec.normal, -Vec3::Y);
    }

    #[test]
    fn test_oblique_ray_enters_through_cap() {
        let cyl = unit_cylinder();
        // Enters the top cap at (0.5, 1, 0) then would leave through the side
        let ray = Ray::new_simple(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.5, -1.0, 0.0));

        let rec = cyl.hit(&ray, range()).unwrap();
        assert!((rec.t - 1.0).abs() < 1e-4);
        assert_eq!(rec.normal, Vec3::Y);
    }

    #[test]
    fn test_offset_center() {
        let cyl = Cylinder::new(Vec3::new(10.0, 0.0, 0.0), 2.0, 0.0, 0.5, MaterialId(0));
        let ray = Ray::new_simple(Vec3::new(10.0, 1.0, 5.0), -Vec3::Z);

        let rec = cyl.hit(&ray, range()).unwrap();
        assert!((rec.t - 4.5).abs() < 1e-4);
        assert!((rec.p - Vec3::new(10.0, 1.0, 0.5)).length() < 1e-4);
    }

    #[test]
    fn test_bbox_relative_to_center() {
        let cyl = Cylinder::new(Vec3::new(1.0, 2.0, 3.0), 1.0, -0.5, 0.5, MaterialId(0));
        let bbox = cyl.bounding_box();
        assert_eq!(bbox.min(), Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(bbox.max(), Vec3::new(1.5, 3.0, 3.5));
    }
}
