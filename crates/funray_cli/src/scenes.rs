//! Built-in demo scenes.

use std::path::Path;

use funray_core::{AlbedoDesc, Background, CameraSettings, MaterialDesc, ObjectDesc, SceneSnapshot, ShapeDesc};
use funray_math::{Axis, Color, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cli::SceneChoice;

/// A scene with the camera and background it was composed for.
pub struct DemoScene {
    pub snapshot: SceneSnapshot,
    pub camera: CameraSettings,
    pub background: Background,
}

pub fn build(choice: SceneChoice, seed: u64, ground_texture: Option<&Path>) -> DemoScene {
    match choice {
        SceneChoice::Spheres => spheres(seed, ground_texture),
        SceneChoice::Room => room(),
    }
}

fn random_color(rng: &mut StdRng, min: f32, max: f32) -> Color {
    Color::new(rng.gen_range(min..max), rng.gen_range(min..max), rng.gen_range(min..max))
}

/// The random sphere field from the cover of the first book.
fn spheres(seed: u64, ground_texture: Option<&Path>) -> DemoScene {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scene = SceneSnapshot::new();

    let ground_albedo = match ground_texture {
        Some(path) => AlbedoDesc::Texture(path.to_path_buf()),
        None => AlbedoDesc::Solid(Color::splat(0.5)),
    };
    let ground = scene.add_material(MaterialDesc::lambertian(ground_albedo));
    scene.add_shape(
        ShapeDesc::Sphere {
            center: Vec3::new(0.0, -1000.0, 0.0),
            radius: 1000.0,
        },
        ground,
    );

    let glass = scene.add_material(MaterialDesc::dielectric(1.5));

    for a in -11..11 {
        for b in -11..11 {
            let choose_mat: f32 = rng.gen();
            let center = Vec3::new(
                a as f32 + 0.9 * rng.gen::<f32>(),
                0.2,
                b as f32 + 0.9 * rng.gen::<f32>(),
            );

            if (center - Vec3::new(4.0, 0.2, 0.0)).length() <= 0.9 {
                continue;
            }

            let material = if choose_mat < 0.8 {
                let albedo = random_color(&mut rng, 0.0, 1.0) * random_color(&mut rng, 0.0, 1.0);
                scene.add_material(MaterialDesc::lambertian(albedo))
            } else if choose_mat < 0.95 {
                let albedo = random_color(&mut rng, 0.5, 1.0);
                let fuzz = rng.gen_range(0.0..0.5);
                scene.add_material(MaterialDesc::metal(albedo, fuzz))
            } else {
                glass
            };
            scene.add_shape(ShapeDesc::Sphere { center, radius: 0.2 }, material);
        }
    }

    scene.add_shape(
        ShapeDesc::Sphere {
            center: Vec3::new(0.0, 1.0, 0.0),
            radius: 1.0,
        },
        glass,
    );
    let brown = scene.add_material(MaterialDesc::lambertian(Color::new(0.4, 0.2, 0.1)));
    scene.add_shape(
        ShapeDesc::Sphere {
            center: Vec3::new(-4.0, 1.0, 0.0),
            radius: 1.0,
        },
        brown,
    );
    let mirror = scene.add_material(MaterialDesc::metal(Color::new(0.7, 0.6, 0.5), 0.0));
    scene.add_shape(
        ShapeDesc::Sphere {
            center: Vec3::new(4.0, 1.0, 0.0),
            radius: 1.0,
        },
        mirror,
    );

    DemoScene {
        snapshot: scene,
        camera: CameraSettings::default(),
        background: Background::Dome,
    }
}

/// A closed 555-unit room lit only by a ceiling panel.
fn room() -> DemoScene {
    let mut scene = SceneSnapshot::new();

    let red = scene.add_material(MaterialDesc::lambertian(Color::new(0.65, 0.05, 0.05)));
    let white = scene.add_material(MaterialDesc::lambertian(Color::splat(0.73)));
    let green = scene.add_material(MaterialDesc::lambertian(Color::new(0.12, 0.45, 0.15)));
    let light = scene.add_material(MaterialDesc::diffuse_light(Color::splat(15.0)));
    let glass = scene.add_material(MaterialDesc::dielectric(1.5));
    let steel = scene.add_material(MaterialDesc::metal(Color::new(0.8, 0.85, 0.88), 0.05));

    let full = (0.0, 555.0);
    let wall = |normal, k| ShapeDesc::Rect { normal, a: full, b: full, k };

    scene.add_shape(wall(Axis::X, 555.0), green);
    scene.add_shape(wall(Axis::X, 0.0), red);
    scene.add_shape(wall(Axis::Y, 0.0), white);
    scene.add_shape(wall(Axis::Y, 555.0), white);
    scene.add_shape(wall(Axis::Z, 555.0), white);
    scene.add_shape(
        ShapeDesc::Rect {
            normal: Axis::Y,
            a: (213.0, 343.0),
            b: (227.0, 332.0),
            k: 554.0,
        },
        light,
    );

    scene.add_object(
        ObjectDesc::new(
            ShapeDesc::Box {
                min: Vec3::new(130.0, 0.0, 65.0),
                max: Vec3::new(295.0, 165.0, 230.0),
            },
            white,
        )
        .with_rotation(Vec3::new(0.0, -18.0, 0.0)),
    );
    scene.add_object(
        ObjectDesc::new(
            ShapeDesc::Box {
                min: Vec3::new(265.0, 0.0, 295.0),
                max: Vec3::new(430.0, 330.0, 460.0),
            },
            steel,
        )
        .with_rotation(Vec3::new(0.0, 15.0, 0.0)),
    );
    scene.add_shape(
        ShapeDesc::Sphere {
            center: Vec3::new(212.0, 215.0, 147.0),
            radius: 50.0,
        },
        glass,
    );
    scene.add_shape(
        ShapeDesc::Cylinder {
            center: Vec3::new(410.0, 0.0, 120.0),
            top: 120.0,
            bottom: 0.0,
            radius: 50.0,
        },
        white,
    );

    DemoScene {
        snapshot: scene,
        camera: CameraSettings::new(
            Vec3::new(278.0, 278.0, -800.0),
            Vec3::new(278.0, 278.0, 0.0),
            Vec3::Y,
        )
        .with_lens(40.0, 0.0, 10.0),
        background: Background::Solid(Color::ZERO),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn materials_resolve(scene: &SceneSnapshot) -> bool {
        scene.objects.iter().all(|o| o.material < scene.material_count())
    }

    #[test]
    fn test_spheres_scene_is_seeded() {
        let a = build(SceneChoice::Spheres, 3, None);
        let b = build(SceneChoice::Spheres, 3, None);
        assert_eq!(a.snapshot, b.snapshot);
        assert!(a.snapshot.object_count() > 100);
        assert!(materials_resolve(&a.snapshot));
        assert_eq!(a.background, Background::Dome);
    }

    #[test]
    fn test_spheres_ground_texture() {
        let scene = build(SceneChoice::Spheres, 3, Some(Path::new("ground.png")));
        assert_eq!(
            scene.snapshot.materials[0],
            MaterialDesc::lambertian(AlbedoDesc::Texture("ground.png".into()))
        );
    }

    #[test]
    fn test_room_scene() {
        let scene = build(SceneChoice::Room, 0, None);
        assert!(materials_resolve(&scene.snapshot));
        assert_eq!(scene.background, Background::Solid(Color::ZERO));
        assert_eq!(scene.snapshot.objects.iter().filter(|o| o.is_rotated()).count(), 2);
    }
}
