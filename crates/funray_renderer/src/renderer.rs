//! Core path tracing integrator.
//!
//! Implements Monte Carlo path tracing with:
//! - Recursive ray tracing with configurable depth
//! - Per-sample jitter for anti-aliasing
//! - Gamma 2 resolve of accumulated radiance

use crate::camera::Camera;
use crate::hittable::Hittable;
use crate::sampling::gen_f32;
use crate::world::World;
use funray_core::{Background, RenderSettings};
use funray_math::{Color, Interval, Ray};
use rand::RngCore;

/// Hits closer than this are self-intersections of the surface a ray
/// just left.
const HIT_EPSILON: f32 = 0.001;

/// Compute the color seen by a ray.
///
/// Traces the ray through the world, bouncing off surfaces until it is
/// absorbed, escapes, or `depth` runs out.
pub fn ray_color(
    ray: &Ray,
    world: &World,
    depth: u32,
    background: &Background,
    rng: &mut dyn RngCore,
) -> Color {
    if depth == 0 {
        return Color::ZERO;
    }

    let Some(rec) = world.hit(ray, Interval::new(HIT_EPSILON, f32::INFINITY)) else {
        return background_color(ray, background);
    };

    let Some(material) = world.material(rec.material) else {
        return Color::ZERO;
    };

    let emission = material.emitted(rec.u, rec.v, rec.p);
    match material.scatter(ray, &rec, rng) {
        Some(result) => {
            let scattered_color = ray_color(&result.scattered, world, depth - 1, background, rng);
            emission + result.attenuation * scattered_color
        }
        None => emission,
    }
}

fn background_color(ray: &Ray, background: &Background) -> Color {
    match background {
        Background::Dome => sky_gradient(ray),
        Background::Solid(color) => *color,
    }
}

/// White at the horizon blending to sky blue overhead.
fn sky_gradient(ray: &Ray) -> Color {
    let unit_direction = ray.direction().normalize();
    let a = 0.5 * (unit_direction.y + 1.0);
    let white = Color::new(1.0, 1.0, 1.0);
    let blue = Color::new(0.5, 0.7, 1.0);
    white * (1.0 - a) + blue * a
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Display value of a pixel from its radiance sum over `samples` samples.
///
/// NaN channels (from degenerate geometry) are dropped to zero before
/// averaging so one bad sample cannot poison a pixel.
pub fn resolve_pixel(sum: Color, samples: u32) -> Color {
    if samples == 0 {
        return Color::ZERO;
    }

    let clean = |c: f32| if c.is_nan() { 0.0 } else { c };
    let scale = 1.0 / samples as f32;
    Color::new(
        linear_to_gamma(clean(sum.x) * scale),
        linear_to_gamma(clean(sum.y) * scale),
        linear_to_gamma(clean(sum.z) * scale),
    )
}

/// Convert an already gamma-encoded color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let to_byte = |c: f32| (255.0 * c.clamp(0.0, 1.0)) as u8;
    [to_byte(color.x), to_byte(color.y), to_byte(color.z), 255]
}

/// Everything needed to trace samples for one frame.
///
/// Pixel `(x, y)` uses raster coordinates (row 0 at the top); the camera's
/// viewport `t` runs bottom to top, so rows are flipped on the way in.
pub struct Tracer<'a> {
    world: &'a World,
    camera: &'a Camera,
    background: Background,
    max_depth: u32,
    width: u32,
    height: u32,
}

impl<'a> Tracer<'a> {
    pub fn new(world: &'a World, camera: &'a Camera, settings: &RenderSettings) -> Self {
        Self {
            world,
            camera,
            background: settings.background,
            max_depth: settings.max_depth,
            width: settings.width,
            height: settings.height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Radiance of one jittered sample through pixel `(x, y)`.
    pub fn sample(&self, x: u32, y: u32, rng: &mut dyn RngCore) -> Color {
        let row = self.height - 1 - y;
        let s = (x as f32 + gen_f32(rng)) / (self.width.max(2) - 1) as f32;
        let t = (row as f32 + gen_f32(rng)) / (self.height.max(2) - 1) as f32;

        let ray = self.camera.get_ray(s, t, rng);
        ray_color(&ray, self.world, self.max_depth, &self.background, rng)
    }

    /// Radiance sum of `samples` samples through pixel `(x, y)`.
    ///
    /// Stops early (returning the partial sum and the number of samples
    /// taken) when `should_stop` reports true between samples.
    pub fn sample_sum(
        &self,
        x: u32,
        y: u32,
        samples: u32,
        rng: &mut dyn RngCore,
        should_stop: &dyn Fn() -> bool,
    ) -> (Color, u32) {
        let mut sum = Color::ZERO;
        for taken in 0..samples {
            if should_stop() {
                return (sum, taken);
            }
            sum += self.sample(x, y, rng);
        }
        (sum, samples)
    }
}
