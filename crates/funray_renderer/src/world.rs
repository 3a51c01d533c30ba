//! Renderable world: a material arena plus the objects that reference it.

use crate::aarect::AxisRect;
use crate::cuboid::Cuboid;
use crate::cylinder::Cylinder;
use crate::error::{RenderError, RenderResult};
use crate::hittable::{HitRecord, Hittable, HittableList, MaterialId};
use crate::material::{Albedo, Dielectric, DiffuseLight, Isotropic, Lambertian, Material, Metal};
use crate::sphere::Sphere;
use crate::transform::{Rotate, Translate};
use funray_core::{AlbedoDesc, MaterialDesc, ObjectDesc, SceneSnapshot, ShapeDesc, TextureCache};
use funray_math::{Aabb, Axis, Interval, Ray, Vec3};

/// Objects own a [`MaterialId`]; the materials themselves live here.
#[derive(Default)]
pub struct World {
    materials: Vec<Box<dyn Material>>,
    objects: HittableList,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&mut self, material: impl Material + 'static) -> MaterialId {
        self.materials.push(Box::new(material));
        MaterialId(self.materials.len() - 1)
    }

    pub fn add(&mut self, object: impl Hittable + 'static) {
        self.objects.add(Box::new(object));
    }

    pub fn add_boxed(&mut self, object: Box<dyn Hittable>) {
        self.objects.add(object);
    }

    /// Material behind `id`, if the id came from this world.
    pub fn material(&self, id: MaterialId) -> Option<&dyn Material> {
        self.materials.get(id.index()).map(|m| m.as_ref())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Build a world from a host snapshot.
    ///
    /// Every material is converted up front (loading textures through
    /// `textures`), then every object is checked against the arena before
    /// its geometry is built.
    pub fn from_snapshot(snapshot: &SceneSnapshot, textures: &mut TextureCache) -> RenderResult<Self> {
        let mut world = World::new();

        for desc in &snapshot.materials {
            let material = build_material(desc, textures)?;
            world.materials.push(material);
        }

        let count = world.materials.len();
        for (index, object) in snapshot.objects.iter().enumerate() {
            if object.material >= count {
                return Err(RenderError::UnknownMaterial {
                    object: index,
                    material: object.material,
                    count,
                });
            }
            world.add_boxed(build_object(object, MaterialId(object.material)));
        }

        log::debug!(
            "Built world: {} objects, {} materials",
            world.len(),
            world.material_count()
        );

        Ok(world)
    }
}

impl Hittable for World {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord> {
        self.objects.hit(ray, ray_t)
    }

    fn bounding_box(&self) -> Aabb {
        self.objects.bounding_box()
    }
}

fn build_albedo(desc: &AlbedoDesc, textures: &mut TextureCache) -> RenderResult<Albedo> {
    Ok(match desc {
        AlbedoDesc::Solid(color) => Albedo::Solid(*color),
        AlbedoDesc::Texture(path) => Albedo::Image(textures.load(path)?),
    })
}

fn build_material(desc: &MaterialDesc, textures: &mut TextureCache) -> RenderResult<Box<dyn Material>> {
    let material: Box<dyn Material> = match desc {
        MaterialDesc::Lambertian { albedo } => Box::new(Lambertian::new(build_albedo(albedo, textures)?)),
        MaterialDesc::Metal { albedo, fuzz } => Box::new(Metal::new(*albedo, *fuzz)),
        MaterialDesc::Dielectric { ior } => Box::new(Dielectric::new(*ior)),
        MaterialDesc::Isotropic { albedo } => Box::new(Isotropic::new(build_albedo(albedo, textures)?)),
        MaterialDesc::DiffuseLight { emit } => Box::new(DiffuseLight::new(build_albedo(emit, textures)?)),
    };
    Ok(material)
}

/// Rotated objects are built around the origin, rotated X then Y then Z,
/// and moved back to their center.
fn build_object(object: &ObjectDesc, material: MaterialId) -> Box<dyn Hittable> {
    if !object.is_rotated() {
        return build_shape(&object.shape, Vec3::ZERO, material);
    }

    let pivot = object.shape.center();
    let mut hittable = build_shape(&object.shape, pivot, material);
    let degrees = object.rotation_degrees;
    for (axis, angle) in [(Axis::X, degrees.x), (Axis::Y, degrees.y), (Axis::Z, degrees.z)] {
        if angle != 0.0 {
            hittable = Box::new(Rotate::new(hittable, axis, angle));
        }
    }

    Box::new(Translate::new(hittable, pivot))
}

/// Build `shape` displaced by `-shift`.
fn build_shape(shape: &ShapeDesc, shift: Vec3, material: MaterialId) -> Box<dyn Hittable> {
    match *shape {
        ShapeDesc::Sphere { center, radius } => Box::new(Sphere::new(center - shift, radius, material)),
        ShapeDesc::Box { min, max } => Box::new(Cuboid::new(min - shift, max - shift, material)),
        ShapeDesc::Cylinder {
            center,
            top,
            bottom,
            radius,
        } => Box::new(Cylinder::new(center - shift, top, bottom, radius, material)),
        ShapeDesc::Rect { normal, a, b, k } => {
            let (a_axis, b_axis) = AxisRect::plane_axes(normal);
            let (sa, sb) = (shift[a_axis.index()], shift[b_axis.index()]);
            Box::new(AxisRect::new(
                normal,
                (a.0 - sa, a.1 - sa),
                (b.0 - sb, b.1 - sb),
                k - shift[normal.index()],
                material,
            ))
        }
    }
}
