//! FunRay Renderer - CPU Path Tracing
//!
//! A Monte Carlo path tracer with four scheduling modes: single-threaded or
//! tiled, one-shot or progressive. Progressive modes keep refining until
//! cancelled and restart from zero samples whenever the scene source
//! publishes a new scene or camera.

mod accumulation;
mod aarect;
mod bucket;
mod camera;
mod cuboid;
mod cylinder;
mod error;
mod hittable;
mod material;
mod renderer;
mod sampling;
mod scheduler;
mod sphere;
mod tiled_image;
mod transform;
mod world;

pub use accumulation::{AccumulationBuffer, TileAccumulator};
pub use aarect::AxisRect;
pub use bucket::{generate_buckets, spiral_order, Bucket, DEFAULT_BUCKET_SIZE};
pub use camera::Camera;
pub use cuboid::Cuboid;
pub use cylinder::Cylinder;
pub use error::{RenderError, RenderResult};
pub use hittable::{HitRecord, Hittable, HittableList, MaterialId};
pub use material::{
    Albedo, Dielectric, DiffuseLight, Isotropic, Lambertian, Material, Metal, ScatterResult,
};
pub use renderer::{color_to_rgba, linear_to_gamma, ray_color, resolve_pixel, Tracer};
pub use sampling::{gen_f32, random_in_unit_disk, random_in_unit_sphere, random_unit_vector};
pub use scheduler::{
    CancelToken, Progress, RenderHandle, RenderOutcome, RenderState, Renderer,
};
pub use sphere::Sphere;
pub use tiled_image::{Tile, TiledImage};
pub use transform::{Rotate, Translate};
pub use world::World;

/// Re-export the math and input types the public API is expressed in.
pub use funray_core::{
    Background, CameraSettings, RenderMode, RenderSettings, SceneSnapshot, SceneSource,
};
pub use funray_math::{Aabb, Axis, Color, Interval, Ray, Vec3};
