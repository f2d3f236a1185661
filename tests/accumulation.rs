use glowtrace::camera::OrbitCamera;
use glowtrace::context::Context;
use glowtrace::tracer::packer::{pack, PackedScene};
use glowtrace::tracer::scene::{Material, PrimitiveKind, Scene, MAX_OBJECTS};
use glowtrace::tracer::uniforms::{FrameUniform, PresentUniform, SceneUniform};
use glowtrace::tracer::{RenderBackend, Settings, Tracer};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use winit::dpi::PhysicalSize;

// 마지막으로 올라온 장면과 그린 프레임들만 들고 있는 가짜 GPU
#[derive(Default)]
struct FakeGpu {
    scene: Option<SceneUniform>,
    divisors: Vec<f32>,
    clears: usize,
}

impl RenderBackend for FakeGpu {
    type Error = ();

    fn clear_accumulation(&mut self) {
        self.clears += 1;
    }

    fn upload_scene(&mut self, scene: &PackedScene) {
        self.scene = Some(SceneUniform::from(scene));
    }

    fn resize(&mut self, _new_size: PhysicalSize<u32>) {}

    fn draw(&mut self, frame: &FrameUniform, present: &PresentUniform) -> Result<(), ()> {
        assert_eq!(frame.iteration, present.sample_count);
        self.divisors.push(present.sample_count);
        Ok(())
    }
}

fn context(scene: Scene) -> Context<FakeGpu> {
    let tracer = Tracer::with_rng(
        FakeGpu::default(),
        PhysicalSize::new(320, 240),
        Settings::default(),
        StdRng::seed_from_u64(7),
    );
    Context::new(tracer, scene)
}

#[test]
fn twenty_spheres_fill_every_slot() {
    let mut scene = Scene::new();
    for i in 0..MAX_OBJECTS {
        assert!(scene.add_sphere(
            Point3::new(i as f32, 0.0, -3.0),
            0.25,
            Vector3::new(1.0, 0.5, 0.25),
            Material::Diffuse,
        ));
    }
    assert!(!scene.add_sphere(Point3::origin(), 1.0, Vector3::zeros(), Material::Light));

    let packed = pack(&scene);
    assert_eq!(packed.sphere_count, MAX_OBJECTS as u32);
    assert_eq!(packed.sphere_centers[packed.sphere_centers.len() - 3], (MAX_OBJECTS - 1) as f32);
    assert!(packed.sphere_radii.iter().all(|&r| r == 0.25));

    let context = context(scene);
    let uploaded = context.tracer().backend().scene.expect("장면이 올라가야 함");
    assert_eq!(uploaded.sphere_count, MAX_OBJECTS as u32);
    assert_eq!(uploaded.spheres[MAX_OBJECTS - 1].center, [(MAX_OBJECTS - 1) as f32, 0.0, -3.0]);
    assert_eq!(uploaded.cuboid_count, 0);
}

#[test]
fn stationary_frames_accumulate_and_edits_restart() {
    let mut context = context(Scene::with_default_layout());

    for _ in 0..3 {
        context.frame(16.0).unwrap();
    }
    assert_eq!(context.tracer().backend().divisors, vec![1.0, 2.0, 3.0]);

    assert!(context.add_cuboid(
        Point3::new(0.0, 0.0, -2.0),
        Vector3::new(0.5, 1.0, 0.5),
        Vector3::new(0.9, 0.9, 0.9),
        Material::Metal,
    ));
    context.frame(16.0).unwrap();
    context.frame(16.0).unwrap();
    assert_eq!(context.tracer().backend().divisors, vec![1.0, 2.0, 3.0, 1.0, 2.0]);

    let uploaded = context.tracer().backend().scene.unwrap();
    assert_eq!(uploaded.cuboid_count, 1);
    assert_eq!(uploaded.cuboids[0].material, Material::Metal.as_index());
    assert_eq!(uploaded.cuboids[1].size, [0.0; 3]);
}

#[test]
fn removing_shifts_later_objects_forward() {
    let mut context = context(Scene::new());
    for i in 0..3 {
        context.add_sphere(Point3::new(i as f32, 0.0, 0.0), 1.0, Vector3::zeros(), Material::Glass);
    }

    assert!(context.remove(PrimitiveKind::Sphere, 0));
    let uploaded = context.tracer().backend().scene.unwrap();
    assert_eq!(uploaded.sphere_count, 2);
    assert_eq!(uploaded.spheres[0].center, [1.0, 0.0, 0.0]);
    assert_eq!(uploaded.spheres[1].center, [2.0, 0.0, 0.0]);
    assert_eq!(uploaded.spheres[2].radius, 0.0);
}

#[test]
fn counter_never_decreases_without_reset() {
    let mut tracer = Tracer::with_rng(
        FakeGpu::default(),
        PhysicalSize::new(64, 64),
        Settings::default(),
        StdRng::seed_from_u64(3),
    );
    let camera = OrbitCamera::default();

    for _ in 0..50 {
        tracer.update(&camera).unwrap();
    }

    let divisors = &tracer.backend().divisors;
    assert!(divisors.windows(2).all(|pair| pair[1] == pair[0] + 1.0));
    assert_eq!(tracer.backend().clears, 1);
}
