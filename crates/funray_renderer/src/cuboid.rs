//! Axis-aligned box built from six rectangles.

use crate::aarect::AxisRect;
use crate::hittable::{HitRecord, Hittable, HittableList, MaterialId};
use funray_math::{Aabb, Interval, Ray, Vec3};

/// An axis-aligned box between two corners.
///
/// Each face is an [`AxisRect`] whose outward normal points away from the
/// box interior, so refractive boxes see correct front/back faces.
pub struct Cuboid {
    min: Vec3,
    max: Vec3,
    sides: HittableList,
}

impl Cuboid {
    /// Create a box from two corners given in any order.
    pub fn new(a: Vec3, b: Vec3, material: MaterialId) -> Self {
        let min = a.min(b);
        let max = a.max(b);

        let mut sides = HittableList::new();
        let (x, y, z) = ((min.x, max.x), (min.y, max.y), (min.z, max.z));

        sides.add(Box::new(AxisRect::xy(x, y, max.z, material)));
        sides.add(Box::new(AxisRect::xy(x, y, min.z, material).flipped()));
        sides.add(Box::new(AxisRect::xz(x, z, max.y, material)));
        sides.add(Box::new(AxisRect::xz(x, z, min.y, material).flipped()));
        sides.add(Box::new(AxisRect::yz(y, z, max.x, material)));
        sides.add(Box::new(AxisRect::yz(y, z, min.x, material).flipped()));

        Self { min, max, sides }
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }
}

impl Hittable for Cuboid {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord> {
        self.sides.hit(ray, ray_t)
    }

    fn bounding_box(&self) -> Aabb {
        Aabb::from_points(self.min, self.max)
    }
}
