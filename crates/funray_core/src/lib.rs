//! FunRay Core - the renderer's inputs.
//!
//! This crate holds everything an outside collaborator hands to the
//! path tracer:
//!
//! - **Scene snapshots**: primitive and material descriptions (`SceneSnapshot`)
//! - **Camera snapshots**: pose and lens parameters (`CameraSettings`)
//! - **Render settings**: resolution, sampling, mode, background (`RenderSettings`)
//! - **Scene sources**: versioned providers the scheduler polls for changes
//! - **Textures**: image loading and caching
//!
//! # Example
//!
//! ```ignore
//! use funray_core::{RenderSettings, SceneSnapshot, CameraSettings, SharedSceneSource};
//!
//! let settings = RenderSettings::from_json_file("render.json")?;
//! let source = SharedSceneSource::new(SceneSnapshot::new(), CameraSettings::default());
//! source.update_camera(|cam| cam.vfov_degrees = 35.0);
//! ```

pub mod camera;
pub mod scene;
pub mod settings;
pub mod source;
pub mod texture;

pub use camera::CameraSettings;
pub use scene::{AlbedoDesc, MaterialDesc, ObjectDesc, SceneSnapshot, ShapeDesc};
pub use settings::{Background, ConfigError, RenderMode, RenderSettings};
pub use source::{SceneSource, SharedSceneSource, Versioned};
pub use texture::{Texture, TextureCache, TextureError};
