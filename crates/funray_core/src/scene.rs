//! Scene snapshot types.
//!
//! A snapshot is the renderer-agnostic description a host extracts from its
//! own document: an arena of material descriptions and a flat list of
//! objects that reference materials by index. The renderer turns a snapshot
//! into intersectable geometry in one pass and never mutates it.

use std::path::PathBuf;

use funray_math::{Axis, Color, Vec3};

/// Surface color source for materials that support textures.
#[derive(Clone, Debug, PartialEq)]
pub enum AlbedoDesc {
    Solid(Color),
    /// Image file, sampled at the hit's UV coordinates
    Texture(PathBuf),
}

impl From<Color> for AlbedoDesc {
    fn from(color: Color) -> Self {
        AlbedoDesc::Solid(color)
    }
}

/// A material description.
#[derive(Clone, Debug, PartialEq)]
pub enum MaterialDesc {
    /// Diffuse surface
    Lambertian { albedo: AlbedoDesc },
    /// Reflective surface; `fuzz` 0 is a perfect mirror
    Metal { albedo: Color, fuzz: f32 },
    /// Glass-like surface with the given index of refraction
    Dielectric { ior: f32 },
    /// Uniform scattering, for participating media
    Isotropic { albedo: AlbedoDesc },
    /// Emitter; never scatters
    DiffuseLight { emit: AlbedoDesc },
}

impl MaterialDesc {
    pub fn lambertian(albedo: impl Into<AlbedoDesc>) -> Self {
        MaterialDesc::Lambertian {
            albedo: albedo.into(),
        }
    }

    pub fn metal(albedo: Color, fuzz: f32) -> Self {
        MaterialDesc::Metal { albedo, fuzz }
    }

    pub fn dielectric(ior: f32) -> Self {
        MaterialDesc::Dielectric { ior }
    }

    pub fn isotropic(albedo: impl Into<AlbedoDesc>) -> Self {
        MaterialDesc::Isotropic {
            albedo: albedo.into(),
        }
    }

    pub fn diffuse_light(emit: impl Into<AlbedoDesc>) -> Self {
        MaterialDesc::DiffuseLight { emit: emit.into() }
    }

    /// Short human-readable kind name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            MaterialDesc::Lambertian { .. } => "lambertian",
            MaterialDesc::Metal { .. } => "metal",
            MaterialDesc::Dielectric { .. } => "dielectric",
            MaterialDesc::Isotropic { .. } => "isotropic",
            MaterialDesc::DiffuseLight { .. } => "diffuse_light",
        }
    }
}

/// Geometric parameters of one primitive.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeDesc {
    Sphere {
        center: Vec3,
        radius: f32,
    },
    /// Axis-aligned box between two corners
    Box { min: Vec3, max: Vec3 },
    /// Y-aligned cylinder; `top` and `bottom` are offsets from `center.y`
    Cylinder {
        center: Vec3,
        top: f32,
        bottom: f32,
        radius: f32,
    },
    /// Axis-aligned rectangle perpendicular to `normal` at coordinate `k`.
    ///
    /// The in-plane bounds follow the remaining axes in X, Y, Z order:
    /// a Z-facing rect spans (x, y), a Y-facing rect spans (x, z) and an
    /// X-facing rect spans (y, z).
    Rect {
        normal: Axis,
        a: (f32, f32),
        b: (f32, f32),
        k: f32,
    },
}

impl ShapeDesc {
    /// Pivot used for rotations: the shape's own center.
    pub fn center(&self) -> Vec3 {
        match *self {
            ShapeDesc::Sphere { center, .. } => center,
            ShapeDesc::Box { min, max } => (min + max) * 0.5,
            ShapeDesc::Cylinder {
                center, top, bottom, ..
            } => center + Vec3::new(0.0, (top + bottom) * 0.5, 0.0),
            ShapeDesc::Rect { normal, a, b, k } => {
                let (ca, cb) = ((a.0 + a.1) * 0.5, (b.0 + b.1) * 0.5);
                match normal {
                    Axis::X => Vec3::new(k, ca, cb),
                    Axis::Y => Vec3::new(ca, k, cb),
                    Axis::Z => Vec3::new(ca, cb, k),
                }
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ShapeDesc::Sphere { .. } => "sphere",
            ShapeDesc::Box { .. } => "box",
            ShapeDesc::Cylinder { .. } => "cylinder",
            ShapeDesc::Rect { .. } => "rect",
        }
    }
}

/// One object in the scene: a shape, an optional rotation and a material.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectDesc {
    pub shape: ShapeDesc,
    /// Rotation in degrees around X, then Y, then Z, about the shape's center
    pub rotation_degrees: Vec3,
    /// Index into `SceneSnapshot::materials`
    pub material: usize,
}

impl ObjectDesc {
    pub fn new(shape: ShapeDesc, material: usize) -> Self {
        Self {
            shape,
            rotation_degrees: Vec3::ZERO,
            material,
        }
    }

    pub fn with_rotation(mut self, degrees: Vec3) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    pub fn is_rotated(&self) -> bool {
        self.rotation_degrees != Vec3::ZERO
    }
}

/// Everything the renderer needs to build its world.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneSnapshot {
    pub materials: Vec<MaterialDesc>,
    pub objects: Vec<ObjectDesc>,
}

impl SceneSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material and return its index.
    pub fn add_material(&mut self, material: MaterialDesc) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn add_object(&mut self, object: ObjectDesc) {
        self.objects.push(object);
    }

    /// Convenience for `add_object(ObjectDesc::new(shape, material))`.
    pub fn add_shape(&mut self, shape: ShapeDesc, material: usize) {
        self.add_object(ObjectDesc::new(shape, material));
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Check if the scene has no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_material_returns_index() {
        let mut scene = SceneSnapshot::new();
        let a = scene.add_material(MaterialDesc::lambertian(Color::splat(0.5)));
        let b = scene.add_material(MaterialDesc::dielectric(1.5));

        assert_eq!((a, b), (0, 1));
        assert_eq!(scene.material_count(), 2);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_shape_centers() {
        let sphere = ShapeDesc::Sphere {
            center: Vec3::new(1.0, 2.0, 3.0),
            radius: 1.0,
        };
        let boxed = ShapeDesc::Box {
            min: Vec3::ZERO,
            max: Vec3::new(2.0, 4.0, 6.0),
        };
        let cylinder = ShapeDesc::Cylinder {
            center: Vec3::ZERO,
            top: 2.0,
            bottom: 0.0,
            radius: 1.0,
        };
        let rect = ShapeDesc::Rect {
            normal: Axis::Y,
            a: (0.0, 2.0),
            b: (-2.0, 0.0),
            k: 5.0,
        };

        assert_eq!(sphere.center(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(boxed.center(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(cylinder.center(), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(rect.center(), Vec3::new(1.0, 5.0, -1.0));
    }

    #[test]
    fn test_object_rotation_flag() {
        let shape = ShapeDesc::Sphere {
            center: Vec3::ZERO,
            radius: 1.0,
        };
        let plain = ObjectDesc::new(shape.clone(), 0);
        let rotated = ObjectDesc::new(shape, 0).with_rotation(Vec3::new(0.0, 45.0, 0.0));

        assert!(!plain.is_rotated());
        assert!(rotated.is_rotated());
    }

    #[test]
    fn test_material_kinds() {
        assert_eq!(MaterialDesc::metal(Color::ONE, 0.1).kind(), "metal");
        assert_eq!(MaterialDesc::diffuse_light(Color::ONE).kind(), "diffuse_light");
        assert_eq!(
            MaterialDesc::isotropic(AlbedoDesc::Texture("wood.png".into())).kind(),
            "isotropic"
        );
    }
}
