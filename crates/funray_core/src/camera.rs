//! Camera snapshot supplied by the host.

use funray_math::Vec3;

/// Camera pose and lens parameters.
///
/// This is the raw description; the renderer derives its ray generator
/// (basis vectors, viewport, lens radius) from it whenever the camera
/// version changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub look_from: Vec3,
    pub look_at: Vec3,
    pub vup: Vec3,
    /// Vertical field of view in degrees
    pub vfov_degrees: f32,
    /// Lens diameter; 0 disables depth of field
    pub aperture: f32,
    /// Distance from the lens to the plane in perfect focus
    pub focus_distance: f32,
    /// Shutter open time
    pub time0: f32,
    /// Shutter close time
    pub time1: f32,
}

impl CameraSettings {
    /// Create a pinhole camera looking from `look_from` towards `look_at`.
    pub fn new(look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        Self {
            look_from,
            look_at,
            vup,
            ..Default::default()
        }
    }

    /// Set lens settings.
    pub fn with_lens(mut self, vfov_degrees: f32, aperture: f32, focus_distance: f32) -> Self {
        self.vfov_degrees = vfov_degrees;
        self.aperture = aperture;
        self.focus_distance = focus_distance;
        self
    }

    /// Set the shutter interval.
    pub fn with_shutter(mut self, time0: f32, time1: f32) -> Self {
        self.time0 = time0;
        self.time1 = time1;
        self
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            look_from: Vec3::new(13.0, 2.0, 3.0),
            look_at: Vec3::ZERO,
            vup: Vec3::Y,
            vfov_degrees: 20.0,
            aperture: 0.1,
            focus_distance: 10.0,
            time0: 0.0,
            time1: 0.0,
        }
    }
}
