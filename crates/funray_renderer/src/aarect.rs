//! Axis-aligned rectangles.

use crate::hittable::{HitRecord, Hittable, MaterialId};
use funray_math::{Aabb, Axis, Interval, Ray, Vec3};

/// A rectangle lying in the plane `normal = k`.
///
/// The in-plane bounds `a` and `b` follow the two remaining axes in X, Y, Z
/// order (see [`AxisRect::plane_axes`]). The outward normal is the positive
/// normal axis unless the rectangle has been [`flipped`](AxisRect::flipped).
pub struct AxisRect {
    normal_axis: Axis,
    a: (f32, f32),
    b: (f32, f32),
    k: f32,
    outward: Vec3,
    material: MaterialId,
    bbox: Aabb,
}

impl AxisRect {
    pub fn new(normal: Axis, a: (f32, f32), b: (f32, f32), k: f32, material: MaterialId) -> Self {
        let a = (a.0.min(a.1), a.0.max(a.1));
        let b = (b.0.min(b.1), b.0.max(b.1));
        let (a_axis, b_axis) = Self::plane_axes(normal);

        let mut lo = Vec3::ZERO;
        let mut hi = Vec3::ZERO;
        lo[normal.index()] = k;
        hi[normal.index()] = k;
        lo[a_axis.index()] = a.0;
        hi[a_axis.index()] = a.1;
        lo[b_axis.index()] = b.0;
        hi[b_axis.index()] = b.1;

        Self {
            normal_axis: normal,
            a,
            b,
            k,
            outward: normal.unit(),
            material,
            bbox: Aabb::from_points(lo, hi),
        }
    }

    /// Rectangle in the plane z = k spanning x and y.
    pub fn xy(x: (f32, f32), y: (f32, f32), k: f32, material: MaterialId) -> Self {
        Self::new(Axis::Z, x, y, k, material)
    }

    /// Rectangle in the plane y = k spanning x and z.
    pub fn xz(x: (f32, f32), z: (f32, f32), k: f32, material: MaterialId) -> Self {
        Self::new(Axis::Y, x, z, k, material)
    }

    /// Rectangle in the plane x = k spanning y and z.
    pub fn yz(y: (f32, f32), z: (f32, f32), k: f32, material: MaterialId) -> Self {
        Self::new(Axis::X, y, z, k, material)
    }

    /// Point the outward normal along the negative normal axis.
    pub fn flipped(mut self) -> Self {
        self.outward = -self.outward;
        self
    }

    /// The two in-plane axes for a rectangle facing `normal`.
    pub fn plane_axes(normal: Axis) -> (Axis, Axis) {
        match normal {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::X, Axis::Z),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }

    pub fn normal_axis(&self) -> Axis {
        self.normal_axis
    }

    pub fn outward_normal(&self) -> Vec3 {
        self.outward
    }
}

/// Position of `value` across `(lo, hi)`; 0 for a zero-width span.
fn span_fraction(value: f32, (lo, hi): (f32, f32)) -> f32 {
    let span = hi - lo;
    if span > 0.0 {
        (value - lo) / span
    } else {
        0.0
    }
}

impl Hittable for AxisRect {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord> {
        let n = self.normal_axis.index();
        let (a_axis, b_axis) = Self::plane_axes(self.normal_axis);

        let dn = ray.direction()[n];
        if dn == 0.0 {
            return None;
        }

        let t = (self.k - ray.origin()[n]) / dn;
        if !ray_t.accepts(t) {
            return None;
        }

        let p = ray.at(t);
        let pa = p[a_axis.index()];
        let pb = p[b_axis.index()];
        if pa < self.a.0 || pa > self.a.1 || pb < self.b.0 || pb > self.b.1 {
            return None;
        }

        let u = span_fraction(pa, self.a);
        let v = span_fraction(pb, self.b);
        Some(HitRecord::new(ray, t, self.outward, self.material, (u, v)))
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}
