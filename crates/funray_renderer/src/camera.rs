//! Thin-lens camera for ray generation.

use crate::error::{RenderError, RenderResult};
use crate::sampling::{gen_range_f32, random_in_unit_disk};
use funray_core::CameraSettings;
use funray_math::{Ray, Vec3};
use rand::RngCore;

const DEGENERATE_EPSILON: f32 = 1e-12;

/// Ray generator derived from [`CameraSettings`] and an aspect ratio.
///
/// `(s, t) = (0, 0)` maps to the lower-left corner of the viewport and
/// `(1, 1)` to the upper-right.
#[derive(Debug, Clone)]
pub struct Camera {
    origin: Vec3,
    lower_left_corner: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
    u: Vec3,
    v: Vec3,
    w: Vec3,
    lens_radius: f32,
    time0: f32,
    time1: f32,
}

impl Camera {
    pub fn new(settings: &CameraSettings, aspect_ratio: f32) -> RenderResult<Self> {
        if !(aspect_ratio.is_finite() && aspect_ratio > 0.0) {
            return Err(RenderError::DegenerateCamera("aspect ratio must be positive"));
        }
        if !(settings.vfov_degrees > 0.0 && settings.vfov_degrees < 180.0) {
            return Err(RenderError::DegenerateCamera(
                "vertical field of view must be between 0 and 180 degrees",
            ));
        }
        if settings.focus_distance <= 0.0 {
            return Err(RenderError::DegenerateCamera("focus distance must be positive"));
        }

        let forward = settings.look_from - settings.look_at;
        if forward.length_squared() < DEGENERATE_EPSILON {
            return Err(RenderError::DegenerateCamera("look_from equals look_at"));
        }
        let w = forward.normalize();

        let side = settings.vup.cross(w);
        if side.length_squared() < DEGENERATE_EPSILON {
            return Err(RenderError::DegenerateCamera(
                "up vector is zero or parallel to the view direction",
            ));
        }
        let u = side.normalize();
        let v = w.cross(u);

        let h = (settings.vfov_degrees.to_radians() / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = aspect_ratio * viewport_height;

        let focus = settings.focus_distance;
        let origin = settings.look_from;
        let horizontal = focus * viewport_width * u;
        let vertical = focus * viewport_height * v;
        let lower_left_corner = origin - horizontal / 2.0 - vertical / 2.0 - focus * w;

        Ok(Self {
            origin,
            lower_left_corner,
            horizontal,
            vertical,
            u,
            v,
            w,
            lens_radius: settings.aperture.max(0.0) / 2.0,
            time0: settings.time0,
            time1: settings.time1,
        })
    }

    /// Generate a ray through viewport coordinates `(s, t)`.
    ///
    /// The origin is jittered across the lens disk and the time is drawn
    /// uniformly from the shutter interval.
    pub fn get_ray(&self, s: f32, t: f32, rng: &mut dyn RngCore) -> Ray {
        let offset = if self.lens_radius > 0.0 {
            let rd = self.lens_radius * random_in_unit_disk(rng);
            self.u * rd.x + self.v * rd.y
        } else {
            Vec3::ZERO
        };

        let time = if self.time1 > self.time0 {
            gen_range_f32(rng, self.time0, self.time1)
        } else {
            self.time0
        };

        let origin = self.origin + offset;
        let target = self.lower_left_corner + s * self.horizontal + t * self.vertical;
        Ray::new(origin, target - origin, time)
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Orthonormal camera basis (right, up, backward).
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        (self.u, self.v, self.w)
    }

    pub fn lens_radius(&self) -> f32 {
        self.lens_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pinhole(look_from: Vec3, look_at: Vec3) -> CameraSettings {
        CameraSettings::new(look_from, look_at, Vec3::Y).with_lens(90.0, 0.0, 1.0)
    }

    #[test]
    fn test_center_ray_hits_look_at() {
        let camera = Camera::new(&pinhole(Vec3::ZERO, -Vec3::Z), 2.0).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let ray = camera.get_ray(0.5, 0.5, &mut rng);
        assert_eq!(ray.origin(), Vec3::ZERO);
        assert!((ray.direction().normalize() - (-Vec3::Z)).length() < 1e-5);
    }

    #[test]
    fn test_corners_follow_aspect() {
        let camera = Camera::new(&pinhole(Vec3::ZERO, -Vec3::Z), 2.0).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        // 90 degree vfov at focus distance 1: viewport is 4 x 2
        let ll = camera.get_ray(0.0, 0.0, &mut rng).direction();
        assert!((ll - Vec3::new(-2.0, -1.0, -1.0)).length() < 1e-5);
        let ur = camera.get_ray(1.0, 1.0, &mut rng).direction();
        assert!((ur - Vec3::new(2.0, 1.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let settings = CameraSettings::new(Vec3::new(13.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y);
        let camera = Camera::new(&settings, 16.0 / 9.0).unwrap();
        let (u, v, w) = camera.basis();
        assert!(u.dot(v).abs() < 1e-5);
        assert!(v.dot(w).abs() < 1e-5);
        assert!((u.length() - 1.0).abs() < 1e-5);
        assert!(v.y > 0.0);
    }

    #[test]
    fn test_lens_jitters_origin() {
        let settings = CameraSettings::new(Vec3::ZERO, -Vec3::Z, Vec3::Y).with_lens(40.0, 2.0, 5.0);
        let camera = Camera::new(&settings, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(4);

        let mut moved = false;
        for _ in 0..20 {
            let ray = camera.get_ray(0.5, 0.5, &mut rng);
            assert!(ray.origin().length() < 1.0 + 1e-5);
            assert_eq!(ray.origin().z, 0.0);
            moved |= ray.origin() != Vec3::ZERO;
            // Every lens sample converges on the focus plane
            let t = -5.0 / ray.direction().z;
            assert!((ray.at(t) - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-3);
        }
        assert!(moved);
    }

    #[test]
    fn test_shutter_time_range() {
        let settings = pinhole(Vec3::ZERO, -Vec3::Z).with_shutter(1.0, 2.0);
        let camera = Camera::new(&settings, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..50 {
            let time = camera.get_ray(0.5, 0.5, &mut rng).time();
            assert!((1.0..=2.0).contains(&time));
        }
    }

    #[test]
    fn test_same_position_is_degenerate() {
        let settings = pinhole(Vec3::ONE, Vec3::ONE);
        assert!(matches!(
            Camera::new(&settings, 1.0),
            Err(RenderError::DegenerateCamera(_))
        ));
    }

    #[test]
    fn test_up_parallel_to_view_is_degenerate() {
        let settings = pinhole(Vec3::ZERO, Vec3::new(0.0, -3.0, 0.0));
        assert!(Camera::new(&settings, 1.0).is_err());
    }

    #[test]
    fn test_bad_aspect_is_degenerate() {
        let settings = pinhole(Vec3::ZERO, -Vec3::Z);
        assert!(Camera::new(&settings, 0.0).is_err());
        assert!(Camera::new(&settings, f32::NAN).is_err());
    }
}
