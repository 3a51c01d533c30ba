//! Versioned scene and camera providers.
//!
//! The host owns the scene; the renderer only ever sees immutable
//! snapshots. Every structural change bumps a monotonic version counter so
//! the scheduler can detect changes by comparing two integers between
//! passes instead of diffing scenes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::{CameraSettings, SceneSnapshot};

/// A value tagged with the version it was published under.
#[derive(Clone, Debug, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

/// Something the scheduler can poll for the current scene and camera.
pub trait SceneSource: Send + Sync {
    /// Current scene version. Cheap; polled between passes.
    fn scene_version(&self) -> u64;

    /// Current camera version. Cheap; polled between scan lines.
    fn camera_version(&self) -> u64;

    /// Latest scene snapshot with its version.
    fn scene(&self) -> Versioned<Arc<SceneSnapshot>>;

    /// Latest camera snapshot with its version.
    fn camera(&self) -> Versioned<CameraSettings>;
}

/// In-process `SceneSource` that a host updates directly.
pub struct SharedSceneSource {
    scene: RwLock<Versioned<Arc<SceneSnapshot>>>,
    camera: RwLock<Versioned<CameraSettings>>,
    scene_version: AtomicU64,
    camera_version: AtomicU64,
}

impl SharedSceneSource {
    pub fn new(scene: SceneSnapshot, camera: CameraSettings) -> Self {
        Self {
            scene: RwLock::new(Versioned {
                version: 0,
                value: Arc::new(scene),
            }),
            camera: RwLock::new(Versioned {
                version: 0,
                value: camera,
            }),
            scene_version: AtomicU64::new(0),
            camera_version: AtomicU64::new(0),
        }
    }

    /// Replace the whole scene. Returns the new version.
    pub fn set_scene(&self, scene: SceneSnapshot) -> u64 {
        let mut guard = self.scene.write().unwrap_or_else(PoisonError::into_inner);
        guard.version += 1;
        guard.value = Arc::new(scene);
        self.scene_version.store(guard.version, Ordering::Release);
        log::debug!("Scene updated to version {}", guard.version);
        guard.version
    }

    /// Replace the camera. Returns the new version.
    pub fn set_camera(&self, camera: CameraSettings) -> u64 {
        self.update_camera(|cam| *cam = camera)
    }

    /// Edit the camera in place. Returns the new version.
    pub fn update_camera(&self, edit: impl FnOnce(&mut CameraSettings)) -> u64 {
        let mut guard = self.camera.write().unwrap_or_else(PoisonError::into_inner);
        edit(&mut guard.value);
        guard.version += 1;
        self.camera_version.store(guard.version, Ordering::Release);
        log::debug!("Camera updated to version {}", guard.version);
        guard.version
    }
}

impl SceneSource for SharedSceneSource {
    fn scene_version(&self) -> u64 {
        self.scene_version.load(Ordering::Acquire)
    }

    fn camera_version(&self) -> u64 {
        self.camera_version.load(Ordering::Acquire)
    }

    fn scene(&self) -> Versioned<Arc<SceneSnapshot>> {
        self.scene
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn camera(&self) -> Versioned<CameraSettings> {
        self.camera
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MaterialDesc, ShapeDesc};
    use funray_math::{Color, Vec3};

    #[test]
    fn test_versions_start_at_zero() {
        let source = SharedSceneSource::new(SceneSnapshot::new(), CameraSettings::default());
        assert_eq!(source.scene_version(), 0);
        assert_eq!(source.camera_version(), 0);
    }

    #[test]
    fn test_camera_update_bumps_only_camera() {
        let source = SharedSceneSource::new(SceneSnapshot::new(), CameraSettings::default());

        let v = source.update_camera(|cam| cam.vfov_degrees = 45.0);

        assert_eq!(v, 1);
        assert_eq!(source.camera_version(), 1);
        assert_eq!(source.scene_version(), 0);
        assert_eq!(source.camera().value.vfov_degrees, 45.0);
        assert_eq!(source.camera().version, 1);
    }

    #[test]
    fn test_scene_replace_is_visible_with_version() {
        let source = SharedSceneSource::new(SceneSnapshot::new(), CameraSettings::default());

        let mut scene = SceneSnapshot::new();
        let mat = scene.add_material(MaterialDesc::lambertian(Color::splat(0.5)));
        scene.add_shape(
            ShapeDesc::Sphere {
                center: Vec3::ZERO,
                radius: 1.0,
            },
            mat,
        );
        source.set_scene(scene);
        source.set_scene(SceneSnapshot::new());

        let snapshot = source.scene();
        assert_eq!(snapshot.version, 2);
        assert!(snapshot.value.is_empty());
        assert_eq!(source.scene_version(), 2);
    }
}
